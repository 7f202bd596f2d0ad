// src/dedup.rs
// Per-source dedup ledger: the set of external ids already ingested, loaded
// with one query per run. The storage uniqueness constraint on
// (source_id, external_id) backs this up against racing cycles.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::StoreError;
use crate::store::Store;

pub struct DedupLedger {
    known: HashSet<String>,
}

impl DedupLedger {
    pub async fn load(store: &Arc<dyn Store>, source_id: Uuid) -> Result<Self, StoreError> {
        let known = store.external_ids_for_source(source_id).await?;
        Ok(Self { known })
    }

    #[cfg(test)]
    pub fn from_ids<I: IntoIterator<Item = String>>(ids: I) -> Self {
        Self {
            known: ids.into_iter().collect(),
        }
    }

    pub fn is_new(&self, external_id: &str) -> bool {
        !self.known.contains(external_id)
    }

    /// Also covers duplicates surfaced within a single run.
    pub fn mark_seen(&mut self, external_id: String) {
        self.known.insert(external_id);
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_run_duplicates_are_caught_after_mark() {
        let mut ledger = DedupLedger::from_ids(vec!["a".to_string()]);
        assert!(!ledger.is_empty());
        assert!(!ledger.is_new("a"));
        assert!(ledger.is_new("b"));
        ledger.mark_seen("b".to_string());
        assert!(!ledger.is_new("b"));
        assert_eq!(ledger.len(), 2);
    }
}
