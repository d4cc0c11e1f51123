// Batched enrichment fanout — bounded concurrency per batch, per-item merge
// into a shared collection as each lookup settles.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;

use parking_lot::RwLock;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Lifecycle of one item's secondary lookup. An entry leaves `Pending`
/// exactly once and never transitions again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment<V> {
    Pending,
    Resolved(V),
    Failed,
}

impl<V> Enrichment<V> {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Enrichment::Pending)
    }
}

/// Shared, incrementally updated view over a primary collection, keyed by a
/// stable per-item id.
pub struct EnrichedCollection<K, V> {
    entries: RwLock<HashMap<K, Enrichment<V>>>,
    changed: Notify,
}

impl<K, V> EnrichedCollection<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Seed the collection with every key pending.
    pub fn new(keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            entries: RwLock::new(
                keys.into_iter()
                    .map(|key| (key, Enrichment::Pending))
                    .collect(),
            ),
            changed: Notify::new(),
        }
    }

    /// Merge a settled outcome for `key`. Monotonic: the first settled
    /// outcome wins and a late or duplicate resolution never regresses it.
    /// Returns whether the outcome was applied.
    pub fn merge(&self, key: &K, outcome: Enrichment<V>) -> bool {
        if !outcome.is_settled() {
            return false;
        }
        let applied = {
            let mut entries = self.entries.write();
            match entries.get_mut(key) {
                Some(slot) if !slot.is_settled() => {
                    *slot = outcome;
                    true
                }
                _ => false,
            }
        };
        if applied {
            self.changed.notify_waiters();
        }
        applied
    }

    pub fn get(&self, key: &K) -> Option<Enrichment<V>> {
        self.entries.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of entries still awaiting a lookup result.
    pub fn pending(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.is_settled())
            .count()
    }

    pub fn is_settled(&self) -> bool {
        self.pending() == 0
    }

    pub fn snapshot(&self) -> Vec<(K, Enrichment<V>)> {
        self.entries
            .read()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Wait until every entry has settled.
    pub async fn wait_settled(&self) {
        loop {
            let changed = self.changed.notified();
            if self.is_settled() {
                return;
            }
            changed.await;
        }
    }
}

/// Run secondary lookups over `items` in contiguous batches of `batch_size`.
///
/// Within a batch every lookup runs concurrently; each outcome merges into
/// `collection` the moment it settles. The next batch starts only after the
/// whole previous batch has settled, which caps in-flight lookups at
/// `batch_size`. A failed lookup marks its item `Failed` and never aborts
/// the batch or the run.
pub async fn enrich_in_batches<I, K, V, F, Fut>(
    items: &[I],
    batch_size: usize,
    collection: &EnrichedCollection<K, V>,
    key_of: impl Fn(&I) -> K,
    lookup: F,
) where
    I: Clone,
    K: Clone + Eq + Hash + Debug + Send + 'static,
    V: Clone + Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
{
    let batch_size = batch_size.max(1);
    for batch in items.chunks(batch_size) {
        let mut lookups = JoinSet::new();
        for item in batch {
            let key = key_of(item);
            let fut = lookup(item.clone());
            lookups.spawn(async move { (key, fut.await) });
        }

        // Merge each lookup as it settles; draining the whole set is the
        // barrier before the next batch.
        while let Some(joined) = lookups.join_next().await {
            let (key, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("enrichment lookup task failed: {}", e);
                    continue;
                }
            };
            match outcome {
                Ok(value) => {
                    collection.merge(&key, Enrichment::Resolved(value));
                }
                Err(e) => {
                    warn!("enrichment lookup failed key={:?}: {:#}", key, e);
                    collection.merge(&key, Enrichment::Failed);
                }
            }
        }
        debug!("enrichment batch settled size={}", batch.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_monotonic() {
        let collection = EnrichedCollection::new([1u64, 2, 3]);

        assert!(collection.merge(&1, Enrichment::Resolved(7)));
        assert_eq!(collection.get(&1), Some(Enrichment::Resolved(7)));

        // A duplicate or late resolution never regresses the first value.
        assert!(!collection.merge(&1, Enrichment::Resolved(9)));
        assert_eq!(collection.get(&1), Some(Enrichment::Resolved(7)));

        assert!(!collection.merge(&1, Enrichment::Failed));
        assert_eq!(collection.get(&1), Some(Enrichment::Resolved(7)));
    }

    #[test]
    fn test_merge_failure_marker_is_terminal() {
        let collection: EnrichedCollection<u64, u64> = EnrichedCollection::new([1]);

        assert!(collection.merge(&1, Enrichment::Failed));
        assert!(!collection.merge(&1, Enrichment::Resolved(4)));
        assert_eq!(collection.get(&1), Some(Enrichment::Failed));
    }

    #[test]
    fn test_merge_ignores_unknown_keys_and_pending() {
        let collection: EnrichedCollection<u64, u64> = EnrichedCollection::new([1]);

        assert!(!collection.merge(&99, Enrichment::Resolved(4)));
        assert!(!collection.merge(&1, Enrichment::Pending));
        assert_eq!(collection.pending(), 1);
        assert!(!collection.is_settled());
    }
}
