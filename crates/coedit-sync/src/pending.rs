//! Buffer of revisions received but not yet applied
//!
//! Entries are raw payloads keyed by revision id. The buffer imposes no
//! order of its own; the drain in [`RevisionLog`](crate::RevisionLog) pulls
//! entries out strictly by id, so arrival order never matters.

use std::collections::HashMap;

use serde_json::Value;

use crate::revision_id::{RevisionId, try_decode};

#[derive(Debug, Default)]
pub struct PendingRevisions {
    entries: HashMap<String, Value>,
}

impl PendingRevisions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `raw` under `id`, replacing any earlier delivery of the same id.
    ///
    /// Returns true if an entry was replaced.
    pub fn insert(&mut self, id: impl Into<String>, raw: Value) -> bool {
        self.entries.insert(id.into(), raw).is_some()
    }

    /// Remove and return the entry for `id`
    pub fn take(&mut self, id: &RevisionId) -> Option<Value> {
        self.entries.remove(id.as_str())
    }

    /// Drop every entry whose id does not decode to at least `index`
    pub fn prune_below(&mut self, index: u64) {
        self.entries
            .retain(|id, _| try_decode(id).is_ok_and(|entry| entry >= index));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_take() {
        let mut pending = PendingRevisions::new();
        assert!(pending.is_empty());

        assert!(!pending.insert("A1", json!({ "a": "x" })));
        assert!(pending.contains("A1"));
        assert_eq!(pending.len(), 1);

        assert!(pending.take(&RevisionId::from_index(0)).is_none());
        assert_eq!(
            pending.take(&RevisionId::from_index(1)),
            Some(json!({ "a": "x" }))
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_redelivery_overwrites() {
        let mut pending = PendingRevisions::new();
        pending.insert("A0", json!(1));
        assert!(pending.insert("A0", json!(2)));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.take(&RevisionId::from_index(0)), Some(json!(2)));
    }

    #[test]
    fn test_prune_below() {
        let mut pending = PendingRevisions::new();
        for id in ["A0", "A4", "A5", "B10", "junk"] {
            pending.insert(id, json!(null));
        }

        pending.prune_below(5);
        assert_eq!(pending.len(), 2);
        assert!(pending.contains("A5"));
        assert!(pending.contains("B10"));
    }
}
