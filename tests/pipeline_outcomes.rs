// tests/pipeline_outcomes.rs
//
// End-to-end pipeline runs against in-memory collaborators: static sources,
// mock rewriter, mock delivery. Covers the terminal statuses and the
// fallback-across-topics policy.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use feed_autoposter::delivery::MockDelivery;
use feed_autoposter::fingerprint::fingerprint;
use feed_autoposter::pipeline::{Pipeline, PublishOutcome};
use feed_autoposter::rewrite::MockRewriter;
use feed_autoposter::scheduler;
use feed_autoposter::sources::{CandidateItem, SourceRegistry, StaticSource};
use feed_autoposter::store::{PublishedPost, Store};

fn item(title: &str, url: &str) -> CandidateItem {
    CandidateItem {
        title: title.to_string(),
        body: None,
        url: Some(url.to_string()),
        provenance: "Test".to_string(),
    }
}

fn store_with_destination(topics: &[&str]) -> Arc<Store> {
    let store = Arc::new(Store::in_memory());
    store.upsert_destination(1, "Chat");
    store.update_settings(1, |s| {
        s.topics = topics.iter().map(|t| t.to_string()).collect();
    });
    store
}

fn accepting_rewriter() -> Arc<MockRewriter> {
    Arc::new(MockRewriter::Fixed("a fine post".to_string()))
}

#[tokio::test]
async fn due_destination_publishes_and_stamps_timestamp() {
    // Interval 3600, never published, one subscribed topic with a fresh
    // candidate: a tick at t=3700 publishes exactly once.
    let store = store_with_destination(&["programming"]);
    let delivery = Arc::new(MockDelivery::new());
    let registry = SourceRegistry::new().register(
        "programming",
        Box::new(StaticSource::yielding(item("Fresh", "https://example.com/1"))),
    );
    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(registry),
        accepting_rewriter(),
        delivery.clone(),
    );

    assert_eq!(scheduler::take_due(&store, 3700), vec![1]);
    assert_eq!(store.settings(1).unwrap().last_publish_ts, 3700);

    let outcome = pipeline.publish_once(1, 3700).await;
    assert_eq!(outcome, PublishOutcome::Success { topic: "programming" });

    let posts = store.posts(None);
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].created_ts, 3700);
    assert_eq!(posts[0].destination_id, 1);
    assert_eq!(delivery.sent(), vec![(1, "a fine post".to_string())]);
}

#[tokio::test]
async fn empty_source_falls_back_to_next_topic() {
    // "programming" yields nothing, "ai" yields a valid item: the run
    // succeeds with topic "ai".
    let store = store_with_destination(&["programming", "ai"]);
    let registry = SourceRegistry::new()
        .register("programming", Box::new(StaticSource::empty()))
        .register(
            "ai",
            Box::new(StaticSource::yielding(item("Model news", "https://example.com/ai"))),
        );
    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(registry),
        accepting_rewriter(),
        Arc::new(MockDelivery::new()),
    );

    let outcome = pipeline.publish_once(1, 100).await;
    assert_eq!(outcome, PublishOutcome::Success { topic: "ai" });
}

#[tokio::test]
async fn all_duplicates_exhaust_to_all_failed() {
    let prog_item = item("Seen before", "https://example.com/p");
    let ai_item = item("Also seen", "https://example.com/a");

    let store = store_with_destination(&["programming", "ai"]);
    for (i, it) in [&prog_item, &ai_item].iter().enumerate() {
        store.commit_published(PublishedPost {
            destination_id: 99,
            message_id: i as i64,
            provenance: it.provenance.clone(),
            title: it.title.clone(),
            fingerprint: fingerprint(it),
            positive: 0,
            negative: 0,
            created_ts: 1,
        });
    }

    let delivery = Arc::new(MockDelivery::new());
    let registry = SourceRegistry::new()
        .register("programming", Box::new(StaticSource::yielding(prog_item)))
        .register("ai", Box::new(StaticSource::yielding(ai_item)));
    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(registry),
        accepting_rewriter(),
        delivery.clone(),
    );

    let outcome = pipeline.publish_once(1, 100).await;
    assert_eq!(outcome, PublishOutcome::AllFailed);
    assert_eq!(delivery.attempts(), 0);
    assert_eq!(store.posts(None).len(), 2); // only the pre-seeded rows
}

#[tokio::test]
async fn sentinel_rejection_everywhere_creates_no_posts() {
    let store = store_with_destination(&["programming", "ai"]);
    let delivery = Arc::new(MockDelivery::new());
    let registry = SourceRegistry::new()
        .register(
            "programming",
            Box::new(StaticSource::yielding(item("Spam", "https://example.com/s"))),
        )
        .register(
            "ai",
            Box::new(StaticSource::yielding(item("More spam", "https://example.com/t"))),
        );
    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(registry),
        Arc::new(MockRewriter::RejectAll),
        delivery.clone(),
    );

    let outcome = pipeline.publish_once(1, 100).await;
    assert_eq!(outcome, PublishOutcome::AllFailed);
    assert!(store.posts(None).is_empty());
    assert_eq!(delivery.attempts(), 0);
}

#[tokio::test]
async fn generation_failure_everywhere_exhausts_to_all_failed() {
    let store = store_with_destination(&["programming"]);
    let registry = SourceRegistry::new().register(
        "programming",
        Box::new(StaticSource::yielding(item("Fine", "https://example.com/f"))),
    );
    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(registry),
        Arc::new(MockRewriter::FailAll),
        Arc::new(MockDelivery::new()),
    );

    assert_eq!(pipeline.publish_once(1, 100).await, PublishOutcome::AllFailed);
    assert!(store.posts(None).is_empty());
}

#[tokio::test]
async fn delivery_failure_ends_the_run_without_trying_remaining_topics() {
    let store = store_with_destination(&["programming", "ai"]);

    let prog = StaticSource::yielding(item("One", "https://example.com/1"));
    let ai = StaticSource::yielding(item("Two", "https://example.com/2"));
    let prog_fetches = prog.fetch_counter();
    let ai_fetches = ai.fetch_counter();

    let delivery = Arc::new(MockDelivery::failing());
    let registry = SourceRegistry::new()
        .register("programming", Box::new(prog))
        .register("ai", Box::new(ai));
    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(registry),
        accepting_rewriter(),
        delivery.clone(),
    );

    let outcome = pipeline.publish_once(1, 100).await;
    assert_eq!(outcome, PublishOutcome::SendError);
    assert_eq!(delivery.attempts(), 1);
    // Only the first topic in the permutation was fetched.
    let total = prog_fetches.load(Ordering::SeqCst) + ai_fetches.load(Ordering::SeqCst);
    assert_eq!(total, 1);
    assert!(store.posts(None).is_empty());
}

#[tokio::test]
async fn disabled_destination_has_no_side_effects() {
    let store = store_with_destination(&["programming"]);
    store.update_settings(1, |s| s.enabled = false);

    let src = StaticSource::yielding(item("Never", "https://example.com/n"));
    let fetches = src.fetch_counter();
    let delivery = Arc::new(MockDelivery::new());
    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(SourceRegistry::new().register("programming", Box::new(src))),
        accepting_rewriter(),
        delivery.clone(),
    );

    assert_eq!(pipeline.publish_once(1, 100).await, PublishOutcome::Disabled);
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
    assert_eq!(delivery.attempts(), 0);
    assert!(store.posts(None).is_empty());
}

#[tokio::test]
async fn fingerprint_published_anywhere_blocks_every_destination() {
    // Global dedup scope: destination 2 cannot republish what destination 1
    // already posted, even from its own source.
    let store = Arc::new(Store::in_memory());
    store.upsert_destination(1, "First");
    store.upsert_destination(2, "Second");
    for id in [1, 2] {
        store.update_settings(id, |s| {
            s.topics = ["programming".to_string()].into();
        });
    }

    let shared = item("Shared scoop", "https://example.com/scoop");
    let delivery = Arc::new(MockDelivery::new());
    let registry = SourceRegistry::new().register(
        "programming",
        Box::new(StaticSource::yielding(shared)),
    );
    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(registry),
        accepting_rewriter(),
        delivery.clone(),
    );

    assert_eq!(
        pipeline.publish_once(1, 100).await,
        PublishOutcome::Success { topic: "programming" }
    );
    assert_eq!(pipeline.publish_once(2, 200).await, PublishOutcome::AllFailed);
    assert_eq!(store.posts(None).len(), 1);
    assert_eq!(delivery.sent().len(), 1);
}

#[tokio::test]
async fn unknown_destination_is_treated_as_disabled() {
    let store = Arc::new(Store::in_memory());
    let pipeline = Pipeline::new(
        store.clone(),
        Arc::new(SourceRegistry::new()),
        accepting_rewriter(),
        Arc::new(MockDelivery::new()),
    );
    assert_eq!(pipeline.publish_once(42, 100).await, PublishOutcome::Disabled);
}
