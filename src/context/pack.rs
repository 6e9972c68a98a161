//! Context packs and their fingerprints

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::budget::Budget;
use crate::types::{DocumentId, FactKey, Result, SectionKind};

/// Immutable, budgeted prompt material for one (document, section, attempt)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPack {
    pub document_id: DocumentId,
    pub section: SectionKind,
    pub attempt: u32,
    pub template_id: String,
    pub template_version: u32,
    pub system_prompt: String,
    pub user_prompt: String,
    /// Selection order: mandatory facts first, then by rank
    pub selected_keys: Vec<FactKey>,
    pub budget: Budget,
    pub estimated_tokens: usize,
    pub fingerprint: String,
}

impl ContextPack {
    pub fn contains(&self, key: &FactKey) -> bool {
        self.selected_keys.contains(key)
    }

    /// Recompute the fingerprint from the pack's own content
    pub fn verify_fingerprint(&self) -> Result<bool> {
        Ok(fingerprint(&self.template_id, &self.user_prompt, &self.selected_keys, &self.budget)?
            == self.fingerprint)
    }
}

/// Canonical hash input; fields are declared in sorted order so the JSON
/// object keys are sorted too.
#[derive(Serialize)]
struct FingerprintPayload<'a> {
    budget: &'a Budget,
    selected_keys: Vec<&'a str>,
    template_id: &'a str,
    user_prompt: &'a str,
}

/// SHA-256 hex over (template id, rendered user prompt, sorted keys, budget)
pub fn fingerprint(
    template_id: &str,
    user_prompt: &str,
    keys: &[FactKey],
    budget: &Budget,
) -> Result<String> {
    let mut selected_keys: Vec<&str> = keys.iter().map(FactKey::as_str).collect();
    selected_keys.sort_unstable();
    let payload = FingerprintPayload {
        budget,
        selected_keys,
        template_id,
        user_prompt,
    };
    let canonical = serde_json::to_vec(&payload)?;
    Ok(format!("{:x}", Sha256::digest(&canonical)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn keys(raw: &[&str]) -> Vec<FactKey> {
        raw.iter().map(|k| FactKey::from(*k)).collect()
    }

    #[test]
    fn test_fingerprint_ignores_key_order() {
        let budget = Budget::new(100, 50, 5);
        let a = fingerprint("theory.v1", "p", &keys(&["b", "a"]), &budget).unwrap();
        let b = fingerprint("theory.v1", "p", &keys(&["a", "b"]), &budget).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_each_input() {
        let budget = Budget::new(100, 50, 5);
        let base = fingerprint("theory.v1", "p", &keys(&["a"]), &budget).unwrap();
        assert_ne!(base, fingerprint("outline.v1", "p", &keys(&["a"]), &budget).unwrap());
        assert_ne!(base, fingerprint("theory.v1", "q", &keys(&["a"]), &budget).unwrap());
        assert_ne!(base, fingerprint("theory.v1", "p", &keys(&["a", "b"]), &budget).unwrap());
        assert_ne!(
            base,
            fingerprint("theory.v1", "p", &keys(&["a"]), &Budget::new(100, 50, 6)).unwrap()
        );
    }

    proptest! {
        #[test]
        fn prop_fingerprint_is_pure(
            template in "[a-z]{1,8}\\.v[0-9]",
            prompt in ".{0,200}",
            raw_keys in proptest::collection::vec("[a-z._]{1,12}", 0..10),
            max_in in 1usize..10_000,
        ) {
            let keys: Vec<FactKey> = raw_keys.iter().map(|k| FactKey::from(k.as_str())).collect();
            let mut reversed = keys.clone();
            reversed.reverse();
            let budget = Budget::new(max_in, 100, 10);
            let first = fingerprint(&template, &prompt, &keys, &budget).unwrap();
            let second = fingerprint(&template, &prompt, &reversed, &budget).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
