use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use watchlist_api::{
    DeleteOutcome, OwnerId, Payload, RecordId, RecordStore, StoreError, StoreFuture, Version,
    VersionedRecord, WriteOutcome,
};

// ═══════════════════════════════════════════════════════════════
//  MemoryStoreConfig
// ═══════════════════════════════════════════════════════════════

fn default_max_records() -> usize {
    100_000
}

#[derive(Debug, serde::Deserialize)]
pub struct MemoryStoreConfig {
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryStore
// ═══════════════════════════════════════════════════════════════

struct Slot<P> {
    record: VersionedRecord<P>,
    /// Insertion order, breaks `created_at` ties when listing.
    seq: u64,
}

struct Inner<P> {
    slots: HashMap<RecordId, Slot<P>>,
    next_seq: u64,
}

/// In-process record store.
///
/// Every compare-and-write runs under the map's write lock, so the version
/// check and the swap are one indivisible step for all callers. The lock
/// is held only inside a single store call, never across engine steps.
pub struct MemoryStore<P> {
    inner: RwLock<Inner<P>>,
    max_records: usize,
}

impl<P: Payload> MemoryStore<P> {
    pub fn new(max_records: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                slots: HashMap::with_capacity(max_records.min(65536)),
                next_seq: 0,
            }),
            max_records,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<P: Payload> Default for MemoryStore<P> {
    fn default() -> Self {
        Self::new(default_max_records())
    }
}

impl<P: Payload> RecordStore<P> for MemoryStore<P> {
    fn insert(&self, owner: OwnerId, payload: P) -> StoreFuture<'_, VersionedRecord<P>> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            if inner.slots.len() >= self.max_records {
                return Err(StoreError::capacity(format!(
                    "memory store is full ({} records)",
                    self.max_records
                )));
            }

            let mut id = RecordId::generate();
            while inner.slots.contains_key(&id) {
                id = RecordId::generate();
            }

            let record = VersionedRecord::created(id.clone(), owner, payload, Utc::now());
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.slots.insert(
                id,
                Slot {
                    record: record.clone(),
                    seq,
                },
            );
            Ok(record)
        })
    }

    fn get(&self, id: &RecordId) -> StoreFuture<'_, Option<VersionedRecord<P>>> {
        let id = id.clone();
        Box::pin(async move {
            let inner = self.inner.read().await;
            Ok(inner.slots.get(&id).map(|slot| slot.record.clone()))
        })
    }

    fn conditional_write(
        &self,
        id: &RecordId,
        expected: Version,
        payload: P,
    ) -> StoreFuture<'_, WriteOutcome<P>> {
        let id = id.clone();
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            let Some(slot) = inner.slots.get_mut(&id) else {
                return Ok(WriteOutcome::NotFound);
            };

            let current = slot.record.version;
            if current != expected {
                return Ok(WriteOutcome::VersionMismatch { current });
            }

            let next = current.checked_add(1).ok_or_else(|| {
                StoreError::corrupt(format!("version counter of record {id} exhausted"))
            })?;

            let record = &mut slot.record;
            record.version = next;
            record.payload = payload;
            // Clock may step backwards; updated_at never precedes created_at.
            record.updated_at = Utc::now().max(record.created_at);
            Ok(WriteOutcome::Written(record.clone()))
        })
    }

    fn delete(&self, id: &RecordId, expected: Option<Version>) -> StoreFuture<'_, DeleteOutcome<P>> {
        let id = id.clone();
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            let Some(slot) = inner.slots.get(&id) else {
                return Ok(DeleteOutcome::NotFound);
            };

            if let Some(expected) = expected {
                let current = slot.record.version;
                if current != expected {
                    return Ok(DeleteOutcome::VersionMismatch { current });
                }
            }

            match inner.slots.remove(&id) {
                Some(slot) => Ok(DeleteOutcome::Deleted(slot.record)),
                None => Ok(DeleteOutcome::NotFound),
            }
        })
    }

    fn list_by_owner(&self, owner: &OwnerId) -> StoreFuture<'_, Vec<VersionedRecord<P>>> {
        let owner = owner.clone();
        Box::pin(async move {
            let inner = self.inner.read().await;
            let mut owned: Vec<&Slot<P>> = inner
                .slots
                .values()
                .filter(|slot| slot.record.owner == owner)
                .collect();
            owned.sort_by(|a, b| {
                b.record
                    .created_at
                    .cmp(&a.record.created_at)
                    .then(b.seq.cmp(&a.seq))
            });
            Ok(owned.into_iter().map(|slot| slot.record.clone()).collect())
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryStoreFactory
// ═══════════════════════════════════════════════════════════════

pub struct MemoryStoreFactory;

impl MemoryStoreFactory {
    /// Build a store from its JSON config (`"{}"` selects the defaults).
    pub fn create<P: Payload>(&self, config_json: &str) -> Result<Arc<MemoryStore<P>>, StoreError> {
        let config: MemoryStoreConfig = if config_json.trim() == "{}" {
            MemoryStoreConfig::default()
        } else {
            serde_json::from_str(config_json)?
        };
        if config.max_records == 0 {
            return Err(StoreError::capacity("max_records must be greater than zero"));
        }
        tracing::debug!(max_records = config.max_records, "created memory store");
        Ok(Arc::new(MemoryStore::new(config.max_records)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;
    use watchlist_api::StoreErrorKind;

    use super::*;

    fn owner() -> OwnerId {
        OwnerId::new("user-1")
    }

    #[tokio::test]
    async fn insert_starts_at_version_zero() {
        let store = MemoryStore::<String>::default();
        let rec = store.insert(owner(), "a".to_string()).await.unwrap();
        assert_eq!(rec.version, 0);
        assert_eq!(rec.created_at, rec.updated_at);
        assert_eq!(store.get(&rec.id).await.unwrap(), Some(rec));
    }

    #[tokio::test]
    async fn conditional_write_increments_by_one() {
        let store = MemoryStore::<String>::default();
        let rec = store.insert(owner(), "a".to_string()).await.unwrap();

        let WriteOutcome::Written(next) = store
            .conditional_write(&rec.id, 0, "b".to_string())
            .await
            .unwrap()
        else {
            panic!("expected write to succeed");
        };
        assert_eq!(next.version, 1);
        assert_eq!(next.payload, "b");
        assert_eq!(next.created_at, rec.created_at);
        assert!(next.updated_at >= rec.updated_at);
        assert_eq!(store.get(&rec.id).await.unwrap(), Some(next));
    }

    #[tokio::test]
    async fn stale_write_is_rejected_without_effect() {
        let store = MemoryStore::<String>::default();
        let rec = store.insert(owner(), "a".to_string()).await.unwrap();
        store.conditional_write(&rec.id, 0, "b".to_string()).await.unwrap();

        let outcome = store
            .conditional_write(&rec.id, 0, "c".to_string())
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::VersionMismatch { current: 1 });

        let stored = store.get(&rec.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.payload, "b");
    }

    #[tokio::test]
    async fn write_to_missing_record_is_not_found() {
        let store = MemoryStore::<String>::default();
        let outcome = store
            .conditional_write(&RecordId::new("nope"), 0, "x".to_string())
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::NotFound);
    }

    #[rstest]
    #[case::unconditional(None)]
    #[case::matching(Some(0))]
    #[tokio::test]
    async fn delete_removes_identity(#[case] expected: Option<Version>) {
        let store = MemoryStore::<String>::default();
        let rec = store.insert(owner(), "a".to_string()).await.unwrap();

        let outcome = store.delete(&rec.id, expected).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted(rec.clone()));
        assert_eq!(store.get(&rec.id).await.unwrap(), None);
        assert_eq!(
            store.conditional_write(&rec.id, 0, "b".to_string()).await.unwrap(),
            WriteOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn stale_delete_keeps_record() {
        let store = MemoryStore::<String>::default();
        let rec = store.insert(owner(), "a".to_string()).await.unwrap();
        store.conditional_write(&rec.id, 0, "b".to_string()).await.unwrap();

        let outcome = store.delete(&rec.id, Some(0)).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::VersionMismatch { current: 1 });
        assert!(store.get(&rec.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner_and_newest_first() {
        let store = MemoryStore::<String>::default();
        let first = store.insert(owner(), "first".to_string()).await.unwrap();
        store
            .insert(OwnerId::new("someone-else"), "other".to_string())
            .await
            .unwrap();
        let second = store.insert(owner(), "second".to_string()).await.unwrap();

        let listed = store.list_by_owner(&owner()).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn insert_beyond_capacity_fails() {
        let store = MemoryStore::<u8>::new(1);
        store.insert(owner(), 1).await.unwrap();
        let err = store.insert(owner(), 2).await.unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::Capacity);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_writers_on_same_version_have_one_winner() {
        let store = Arc::new(MemoryStore::<u32>::default());
        let rec = store.insert(owner(), 0).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..64u32 {
            let store = store.clone();
            let id = rec.id.clone();
            tasks.spawn(async move { store.conditional_write(&id, 0, i).await });
        }

        let mut written = 0;
        let mut mismatched = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap().unwrap() {
                WriteOutcome::Written(r) => {
                    assert_eq!(r.version, 1);
                    written += 1;
                }
                WriteOutcome::VersionMismatch { current } => {
                    assert_eq!(current, 1);
                    mismatched += 1;
                }
                WriteOutcome::NotFound => panic!("record vanished"),
            }
        }
        assert_eq!(written, 1);
        assert_eq!(mismatched, 63);
        assert_eq!(store.get(&rec.id).await.unwrap().unwrap().version, 1);
    }

    #[test]
    fn factory_reads_json_config() {
        let store = MemoryStoreFactory.create::<String>(r#"{"max_records": 10}"#).unwrap();
        assert_eq!(store.max_records, 10);

        let store = MemoryStoreFactory.create::<String>("{}").unwrap();
        assert_eq!(store.max_records, 100_000);

        let err = MemoryStoreFactory.create::<String>(r#"{"max_records": 0}"#).err().unwrap();
        assert_eq!(err.kind(), StoreErrorKind::Capacity);

        let err = MemoryStoreFactory.create::<String>("not json").err().unwrap();
        assert_eq!(err.kind(), StoreErrorKind::Corrupt);
    }
}
