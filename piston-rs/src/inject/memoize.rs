//! Single-flight memoization of injected values.

use super::{AnyValue, InjectedValueAccess, MapBackedValueStore, RawKey, Resolution};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Slot = Arc<OnceCell<Option<AnyValue>>>;

/// Caches every value resolved through it, computing each key at most once.
///
/// Each key owns its own slot, so unrelated keys resolve in parallel and a
/// provider may resolve *other* keys through this same wrapper while its own
/// slot is being filled. Concurrent requests for a key that is still being
/// computed wait for that computation instead of starting another one.
///
/// A resolved "absent" is cached like any other result. A provider failure is
/// not: the slot stays empty and the next request retries.
///
/// A provider that requests its own key through the wrapper never completes.
pub struct MemoizingValueAccess<A> {
    delegate: A,
    memory: RwLock<HashMap<RawKey, Slot>>,
}

impl<A: InjectedValueAccess> MemoizingValueAccess<A> {
    pub fn wrap(delegate: A) -> Self {
        Self {
            delegate,
            memory: RwLock::new(HashMap::new()),
        }
    }

    pub fn delegate(&self) -> &A {
        &self.delegate
    }

    /// Whether `key` has already been resolved (to a value or to absent).
    pub fn is_resolved(&self, key: &RawKey) -> bool {
        self.memory
            .read()
            .get(key)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Immutable point-in-time view of every key resolved so far.
    ///
    /// Taking a snapshot never triggers a resolution. Keys first requested
    /// after the snapshot started are not included.
    pub fn snapshot_memory(&self) -> MapBackedValueStore {
        let memory = self.memory.read();
        MapBackedValueStore::from_resolved(
            memory
                .iter()
                .filter_map(|(key, slot)| slot.get().map(|value| (key.clone(), value.clone()))),
        )
    }

    fn slot(&self, key: &RawKey) -> Slot {
        if let Some(slot) = self.memory.read().get(key) {
            return Arc::clone(slot);
        }
        Arc::clone(self.memory.write().entry(key.clone()).or_default())
    }
}

impl<A: InjectedValueAccess> InjectedValueAccess for MemoizingValueAccess<A> {
    fn resolve(&self, key: &RawKey, context: &dyn InjectedValueAccess) -> Resolution {
        let slot = self.slot(key);
        slot.get_or_try_init(|| {
            tracing::trace!(key = %key, "Resolving value");
            self.delegate.resolve(key, context)
        })
        .cloned()
    }
}

impl<A> fmt::Debug for MemoizingValueAccess<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let memory = self.memory.read();
        let resolved: Vec<&RawKey> = memory
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(key, _)| key)
            .collect();
        f.debug_struct("MemoizingValueAccess")
            .field("resolved", &resolved)
            .finish()
    }
}
