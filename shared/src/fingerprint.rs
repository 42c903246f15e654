//! Content-addressed fingerprints for evaluation records.
//!
//! The cache key covers the document text, both prompt versions and the
//! model identity; changing any of them yields a different fingerprint and
//! thereby invalidates stale cache entries without explicit migration.

use sha2::{Digest, Sha256};

/// SHA-256 digest of a text, hex encoded.
pub fn hash_text(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Cache key for one (document, prompts, model) combination.
pub fn fingerprint(
    document_text: &str,
    stage1_prompt: &str,
    stage2_prompt: &str,
    model_id: &str,
) -> String {
    let joined = format!(
        "{}::{}::{}::{}",
        hash_text(document_text),
        hash_text(stage1_prompt),
        hash_text(stage2_prompt),
        model_id
    );
    hash_text(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let a = fingerprint("doc", "p1", "p2", "gpt-4o");
        let b = fingerprint("doc", "p1", "p2", "gpt-4o");
        assert_eq!(a, b);
    }

    #[test]
    fn every_input_participates() {
        let base = fingerprint("doc", "p1", "p2", "gpt-4o");
        assert_ne!(base, fingerprint("doc!", "p1", "p2", "gpt-4o"));
        assert_ne!(base, fingerprint("doc", "p1!", "p2", "gpt-4o"));
        assert_ne!(base, fingerprint("doc", "p1", "p2!", "gpt-4o"));
        assert_ne!(base, fingerprint("doc", "p1", "p2", "gpt-4o-mini"));
    }

    #[test]
    fn hex_sha256_shape() {
        let fp = fingerprint("doc", "p1", "p2", "m");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
