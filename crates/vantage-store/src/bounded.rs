use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{GuardedStore, StoreDiagnostic};

/// Persisted values above this size are discarded on load.
pub const MAX_PERSISTED_BYTES: usize = 1024 * 1024;

/// Ordered, append-only log capped at `capacity` with oldest-first eviction.
///
/// The in-memory mirror is authoritative for this process and is written
/// through to the store on every mutation. The mirror is hydrated once from
/// the store when the log is opened; concurrent writers in other processes
/// are last-writer-wins.
#[derive(Debug)]
pub struct BoundedLog<T> {
    key: String,
    capacity: usize,
    store: GuardedStore,
    mirror: Mutex<VecDeque<T>>,
}

impl<T> BoundedLog<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn open(store: GuardedStore, key: impl Into<String>, capacity: usize) -> Self {
        let key = key.into();
        let capacity = capacity.max(1);
        let hydrated = load(&store, &key, capacity);
        Self {
            key,
            capacity,
            store,
            mirror: Mutex::new(hydrated),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends `item`, evicting the oldest entries once over capacity.
    /// Returns how many entries were evicted.
    pub fn append(&self, item: T) -> usize {
        let mut mirror = self.lock();
        mirror.push_back(item);
        let mut evicted = 0;
        while mirror.len() > self.capacity {
            mirror.pop_front();
            evicted += 1;
        }
        self.flush(&mirror);
        evicted
    }

    /// Entries oldest-first.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().iter().cloned().collect()
    }

    /// Entries most-recent-first.
    pub fn snapshot_newest_first(&self) -> Vec<T> {
        self.lock().iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops the in-memory mirror and the durable copy.
    pub fn clear(&self) {
        let mut mirror = self.lock();
        mirror.clear();
        self.store.remove(&self.key);
    }

    fn flush(&self, mirror: &VecDeque<T>) {
        match serde_json::to_string(mirror) {
            Ok(encoded) => {
                self.store.write(&self.key, &encoded);
            }
            Err(err) => self.store.report(StoreDiagnostic::WriteFailed {
                key: self.key.clone(),
                reason: err.to_string(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        // A panic while holding the lock cannot leave the deque over capacity.
        self.mirror.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn load<T: DeserializeOwned>(store: &GuardedStore, key: &str, capacity: usize) -> VecDeque<T> {
    let Some(raw) = store.read(key) else {
        return VecDeque::new();
    };
    if raw.len() > MAX_PERSISTED_BYTES {
        store.report(StoreDiagnostic::Malformed {
            key: key.to_string(),
            reason: format!("{} bytes exceeds {MAX_PERSISTED_BYTES}", raw.len()),
        });
        return VecDeque::new();
    }
    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(items) => {
            let skip = items.len().saturating_sub(capacity);
            items.into_iter().skip(skip).collect()
        }
        Err(err) => {
            store.report(StoreDiagnostic::Malformed {
                key: key.to_string(),
                reason: err.to_string(),
            });
            VecDeque::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyValueStore, MemoryStore, UnavailableStore};
    use std::sync::Arc;

    fn memory() -> (Arc<MemoryStore>, GuardedStore) {
        let backing = Arc::new(MemoryStore::new());
        let guarded = GuardedStore::new(backing.clone());
        (backing, guarded)
    }

    #[test]
    fn evicts_oldest_first_at_capacity() {
        let (_, store) = memory();
        let log: BoundedLog<u32> = BoundedLog::open(store, "log", 100);
        for value in 0..100 {
            assert_eq!(log.append(value), 0);
        }
        assert_eq!(log.len(), 100);
        for value in 100..250 {
            assert_eq!(log.append(value), 1, "exactly one eviction per append");
            assert_eq!(log.len(), 100);
            assert_eq!(log.snapshot().first().copied(), Some(value - 99));
        }
        let entries = log.snapshot();
        assert_eq!(entries, (150..250).collect::<Vec<_>>());
        assert_eq!(log.snapshot_newest_first()[0], 249);
    }

    #[test]
    fn writes_through_and_rehydrates() {
        let (backing, store) = memory();
        let log: BoundedLog<String> = BoundedLog::open(store.clone(), "log", 3);
        for word in ["a", "b", "c", "d"] {
            log.append(word.to_string());
        }
        assert_eq!(
            backing.get("log").unwrap().as_deref(),
            Some(r#"["b","c","d"]"#)
        );

        let reopened: BoundedLog<String> = BoundedLog::open(store, "log", 3);
        assert_eq!(reopened.snapshot(), vec!["b", "c", "d"]);
    }

    #[test]
    fn malformed_and_oversized_values_degrade_to_empty() {
        let (backing, store) = memory();
        backing.set("garbage", "{not json").unwrap();
        let log: BoundedLog<u32> = BoundedLog::open(store.clone(), "garbage", 10);
        assert!(log.is_empty());

        backing.set("wrong-shape", r#"{"a":1}"#).unwrap();
        let log: BoundedLog<u32> = BoundedLog::open(store.clone(), "wrong-shape", 10);
        assert!(log.is_empty());

        let huge = format!("[{}]", vec!["1"; MAX_PERSISTED_BYTES / 2 + 1].join(","));
        backing.set("huge", &huge).unwrap();
        let log: BoundedLog<u32> = BoundedLog::open(store, "huge", 10);
        assert!(log.is_empty());
    }

    #[test]
    fn long_persisted_sequence_keeps_newest_entries() {
        let (backing, store) = memory();
        let encoded = serde_json::to_string(&(0..150).collect::<Vec<u32>>()).unwrap();
        backing.set("log", &encoded).unwrap();
        let log: BoundedLog<u32> = BoundedLog::open(store, "log", 100);
        assert_eq!(log.len(), 100);
        assert_eq!(log.snapshot()[0], 50);
    }

    #[test]
    fn clear_drops_mirror_and_durable_copy() {
        let (backing, store) = memory();
        let log: BoundedLog<u32> = BoundedLog::open(store, "log", 5);
        log.append(1);
        log.clear();
        log.clear();
        assert!(log.is_empty());
        assert!(backing.get("log").unwrap().is_none());
    }

    #[test]
    fn keeps_working_in_memory_when_store_is_down() {
        let store = GuardedStore::new(Arc::new(UnavailableStore::new("down")));
        let log: BoundedLog<u32> = BoundedLog::open(store, "log", 2);
        log.append(1);
        log.append(2);
        log.append(3);
        assert_eq!(log.snapshot(), vec![2, 3]);
    }

    #[test]
    fn quota_failures_are_swallowed() {
        let backing = Arc::new(MemoryStore::with_quota(8));
        let log: BoundedLog<u32> = BoundedLog::open(GuardedStore::new(backing.clone()), "log", 10);
        for value in 0..10 {
            log.append(value);
        }
        assert_eq!(log.len(), 10);
        assert_eq!(backing.get("log").unwrap().as_deref(), Some("[0,1,2]"));
    }

    #[test]
    fn concurrent_appends_respect_capacity() {
        let (_, store) = memory();
        let log = Arc::new(BoundedLog::<u64>::open(store, "log", 100));
        let handles: Vec<_> = (0..8u64)
            .map(|worker| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..200u64 {
                        log.append(worker * 1000 + i);
                        assert!(log.len() <= 100);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.len(), 100);
    }
}
