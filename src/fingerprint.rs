// src/fingerprint.rs
use sha2::{Digest, Sha256};

use crate::sources::CandidateItem;

/// Deterministic content identity used as the dedup key: SHA-256 over the
/// canonical URL when present, else over the title.
pub fn fingerprint(item: &CandidateItem) -> String {
    let key = item.url.as_deref().unwrap_or(&item.title);
    let digest = Sha256::digest(key.as_bytes());
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::CandidateItem;

    fn item(title: &str, url: Option<&str>) -> CandidateItem {
        CandidateItem {
            title: title.to_string(),
            body: None,
            url: url.map(str::to_string),
            provenance: "Test".to_string(),
        }
    }

    #[test]
    fn url_wins_over_title() {
        let a = item("one title", Some("https://example.com/x"));
        let b = item("another title", Some("https://example.com/x"));
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn title_is_the_fallback_key() {
        let a = item("same", None);
        let b = item("same", None);
        let c = item("different", None);
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn digest_is_lowercase_hex_sha256() {
        let fp = fingerprint(&item("x", None));
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
