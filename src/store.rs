// src/store.rs
//! Shared state behind the pipeline: destination registry, published-post
//! ledger and the global fingerprint index, guarded by one mutex so the
//! dedup commit and counter increments are serialized across concurrent
//! pipeline runs.
//!
//! Persistence is a JSON snapshot (temp file + rename), written through on
//! every mutation and loaded at boot. The storage layer is deliberately
//! behind this one type; nothing else in the crate touches the disk format.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::topics::DEFAULT_TOPIC;

/// Typed per-destination configuration with explicit defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationSettings {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Subscribed topic keys; never empty (falls back to the default topic).
    pub topics: BTreeSet<String>,
    /// Unix seconds of the last dispatch; 0 means "never".
    pub last_publish_ts: u64,
}

impl Default for DestinationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            topics: BTreeSet::from([DEFAULT_TOPIC.to_string()]),
            last_publish_ts: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: i64,
    pub title: String,
    pub settings: DestinationSettings,
}

/// One successfully delivered post. Counters only ever grow, and only via
/// reaction events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub destination_id: i64,
    pub message_id: i64,
    pub provenance: String,
    pub title: String,
    pub fingerprint: String,
    #[serde(default)]
    pub positive: u32,
    #[serde(default)]
    pub negative: u32,
    pub created_ts: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDestination {
    title: String,
    settings: DestinationSettings,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Inner {
    destinations: BTreeMap<i64, StoredDestination>,
    posts: Vec<PublishedPost>,
    /// Derived from `posts`; rebuilt on load, not serialized.
    #[serde(skip)]
    fingerprints: HashSet<String>,
}

impl Inner {
    fn rebuild_fingerprints(&mut self) {
        self.fingerprints = self.posts.iter().map(|p| p.fingerprint.clone()).collect();
    }
}

pub struct Store {
    inner: Mutex<Inner>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) a snapshot-backed store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut inner = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading store snapshot {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing store snapshot {}", path.display()))?
        } else {
            Inner::default()
        };
        inner.rebuild_fingerprints();
        Ok(Self {
            inner: Mutex::new(inner),
            path: Some(path),
        })
    }

    /// Volatile store for tests.
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            path: None,
        }
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }

    /// Best-effort write-through; a failed save is logged, not fatal.
    fn persist(&self, inner: &Inner) {
        let Some(path) = &self.path else { return };
        if let Err(e) = write_snapshot(path, inner) {
            warn!(error = ?e, path = %path.display(), "store snapshot write failed");
        }
    }

    // ------------------------------------------------------------
    // Destination registry
    // ------------------------------------------------------------

    /// Insert or refresh a destination; settings of an existing destination
    /// are left untouched.
    pub fn upsert_destination(&self, id: i64, title: &str) {
        let mut g = self.locked();
        g.destinations
            .entry(id)
            .and_modify(|d| d.title = title.to_string())
            .or_insert_with(|| StoredDestination {
                title: title.to_string(),
                settings: DestinationSettings::default(),
            });
        self.persist(&g);
    }

    /// Remove a destination, cascading to its settings and post rows. The
    /// removed posts' fingerprints leave the dedup index with them.
    pub fn remove_destination(&self, id: i64) {
        let mut g = self.locked();
        if g.destinations.remove(&id).is_none() {
            return;
        }
        g.posts.retain(|p| p.destination_id != id);
        g.rebuild_fingerprints();
        self.persist(&g);
    }

    pub fn destinations(&self) -> Vec<Destination> {
        self.locked()
            .destinations
            .iter()
            .map(|(id, d)| Destination {
                id: *id,
                title: d.title.clone(),
                settings: d.settings.clone(),
            })
            .collect()
    }

    pub fn destination_count(&self) -> usize {
        self.locked().destinations.len()
    }

    pub fn settings(&self, id: i64) -> Option<DestinationSettings> {
        self.locked().destinations.get(&id).map(|d| d.settings.clone())
    }

    /// Mutate a destination's settings. An empty topic set after the
    /// mutation falls back to the default topic, keeping the set non-empty.
    pub fn update_settings(&self, id: i64, f: impl FnOnce(&mut DestinationSettings)) -> bool {
        let mut g = self.locked();
        let Some(dest) = g.destinations.get_mut(&id) else {
            return false;
        };
        f(&mut dest.settings);
        if dest.settings.topics.is_empty() {
            dest.settings.topics.insert(DEFAULT_TOPIC.to_string());
        }
        self.persist(&g);
        true
    }

    pub fn set_last_publish(&self, id: i64, ts: u64) {
        let mut g = self.locked();
        if let Some(dest) = g.destinations.get_mut(&id) {
            dest.settings.last_publish_ts = ts;
            self.persist(&g);
        }
    }

    // ------------------------------------------------------------
    // Deduplication index + published-post ledger
    // ------------------------------------------------------------

    pub fn fingerprint_exists(&self, fingerprint: &str) -> bool {
        self.locked().fingerprints.contains(fingerprint)
    }

    /// Atomic insert-if-absent on the fingerprint plus the post row, as one
    /// logical commit. Returns false when the fingerprint was already taken
    /// (the caller lost a concurrent race and must treat the run as a
    /// duplicate); no row is written in that case.
    pub fn commit_published(&self, post: PublishedPost) -> bool {
        let mut g = self.locked();
        if !g.fingerprints.insert(post.fingerprint.clone()) {
            return false;
        }
        g.posts.push(post);
        self.persist(&g);
        true
    }

    /// Apply one reaction event's deltas to a post, atomically. Unknown
    /// (destination, message) pairs are a no-op returning false.
    pub fn record_feedback(
        &self,
        destination_id: i64,
        message_id: i64,
        positive_delta: u32,
        negative_delta: u32,
    ) -> bool {
        let mut g = self.locked();
        let Some(post) = g
            .posts
            .iter_mut()
            .find(|p| p.destination_id == destination_id && p.message_id == message_id)
        else {
            return false;
        };
        post.positive = post.positive.saturating_add(positive_delta);
        post.negative = post.negative.saturating_add(negative_delta);
        self.persist(&g);
        true
    }

    /// Post rows, optionally filtered to one destination. Debug surface.
    pub fn posts(&self, destination_id: Option<i64>) -> Vec<PublishedPost> {
        let g = self.locked();
        g.posts
            .iter()
            .filter(|p| destination_id.map_or(true, |id| p.destination_id == id))
            .cloned()
            .collect()
    }
}

fn write_snapshot(path: &Path, inner: &Inner) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(inner).context("serializing store snapshot")?;
    let mut f = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(json.as_bytes()).context("writing store snapshot")?;
    fs::rename(&tmp, path).context("committing store snapshot")?;
    Ok(())
}
