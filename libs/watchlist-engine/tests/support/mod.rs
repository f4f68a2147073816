//! Store doubles wrapping `MemoryStore` to force specific interleavings.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Barrier, Notify};

use storage_memory::MemoryStore;
use watchlist_api::{
    DeleteOutcome, MovieEntry, OwnerId, Payload, RecordId, RecordStore, StoreError, StoreFuture,
    Version, VersionedRecord, WriteOutcome,
};
use watchlist_engine::{EngineConfig, Watchlist};

pub fn owner() -> OwnerId {
    OwnerId::new("owner-1")
}

pub fn intruder() -> OwnerId {
    OwnerId::new("intruder")
}

pub fn movie(title: &str) -> MovieEntry {
    MovieEntry::new(title, 2023)
}

pub fn watchlist(store: Arc<dyn RecordStore<MovieEntry>>) -> Watchlist<MovieEntry> {
    Watchlist::movies(store, &EngineConfig::default())
}

/// Fresh watchlist on a plain memory store, plus one record owned by
/// `owner()`.
pub async fn seeded(title: &str) -> (Arc<MemoryStore<MovieEntry>>, Watchlist<MovieEntry>, VersionedRecord<MovieEntry>) {
    let store = Arc::new(MemoryStore::<MovieEntry>::default());
    let list = watchlist(store.clone());
    let record = list
        .create(&owner(), movie(title))
        .await
        .into_applied()
        .expect("seed record");
    (store, list, record)
}

// ═══════════════════════════════════════════════════════════════
//  GatedStore: every get waits until N readers have arrived
// ═══════════════════════════════════════════════════════════════

/// Holds each `get` at a barrier after reading, so N concurrent callers are
/// guaranteed to observe the same version before any of them writes.
pub struct GatedStore<P> {
    inner: Arc<MemoryStore<P>>,
    barrier: Barrier,
}

impl<P: Payload> GatedStore<P> {
    pub fn new(inner: Arc<MemoryStore<P>>, readers: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(readers),
        }
    }
}

impl<P: Payload> RecordStore<P> for GatedStore<P> {
    fn insert(&self, owner: OwnerId, payload: P) -> StoreFuture<'_, VersionedRecord<P>> {
        self.inner.insert(owner, payload)
    }

    fn get(&self, id: &RecordId) -> StoreFuture<'_, Option<VersionedRecord<P>>> {
        let id = id.clone();
        Box::pin(async move {
            let record = self.inner.get(&id).await?;
            self.barrier.wait().await;
            Ok(record)
        })
    }

    fn conditional_write(&self, id: &RecordId, expected: Version, payload: P) -> StoreFuture<'_, WriteOutcome<P>> {
        self.inner.conditional_write(id, expected, payload)
    }

    fn delete(&self, id: &RecordId, expected: Option<Version>) -> StoreFuture<'_, DeleteOutcome<P>> {
        self.inner.delete(id, expected)
    }

    fn list_by_owner(&self, owner: &OwnerId) -> StoreFuture<'_, Vec<VersionedRecord<P>>> {
        self.inner.list_by_owner(owner)
    }
}

// ═══════════════════════════════════════════════════════════════
//  FailingStore: infrastructure failures on demand
// ═══════════════════════════════════════════════════════════════

pub struct FailingStore<P> {
    inner: Arc<MemoryStore<P>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl<P: Payload> FailingStore<P> {
    pub fn new(inner: Arc<MemoryStore<P>>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::unavailable(format!("{what}: backend offline")))
        } else {
            Ok(())
        }
    }
}

impl<P: Payload> RecordStore<P> for FailingStore<P> {
    fn insert(&self, owner: OwnerId, payload: P) -> StoreFuture<'_, VersionedRecord<P>> {
        Box::pin(async move {
            Self::check(&self.fail_writes, "insert")?;
            self.inner.insert(owner, payload).await
        })
    }

    fn get(&self, id: &RecordId) -> StoreFuture<'_, Option<VersionedRecord<P>>> {
        let id = id.clone();
        Box::pin(async move {
            Self::check(&self.fail_reads, "get")?;
            self.inner.get(&id).await
        })
    }

    fn conditional_write(&self, id: &RecordId, expected: Version, payload: P) -> StoreFuture<'_, WriteOutcome<P>> {
        let id = id.clone();
        Box::pin(async move {
            Self::check(&self.fail_writes, "conditional_write")?;
            self.inner.conditional_write(&id, expected, payload).await
        })
    }

    fn delete(&self, id: &RecordId, expected: Option<Version>) -> StoreFuture<'_, DeleteOutcome<P>> {
        let id = id.clone();
        Box::pin(async move {
            Self::check(&self.fail_writes, "delete")?;
            self.inner.delete(&id, expected).await
        })
    }

    fn list_by_owner(&self, owner: &OwnerId) -> StoreFuture<'_, Vec<VersionedRecord<P>>> {
        let owner = owner.clone();
        Box::pin(async move {
            Self::check(&self.fail_reads, "list_by_owner")?;
            self.inner.list_by_owner(&owner).await
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  StallingStore: reads and writes held until released
// ═══════════════════════════════════════════════════════════════

pub struct StallingStore<P> {
    inner: Arc<MemoryStore<P>>,
    /// Extra latency added to every `get`.
    pub read_delay: Duration,
    /// Signalled when a conditional write reaches the store.
    pub write_issued: Arc<Notify>,
    /// The conditional write proceeds once this is notified.
    pub write_release: Arc<Notify>,
}

impl<P: Payload> StallingStore<P> {
    pub fn new(inner: Arc<MemoryStore<P>>, read_delay: Duration) -> Self {
        Self {
            inner,
            read_delay,
            write_issued: Arc::new(Notify::new()),
            write_release: Arc::new(Notify::new()),
        }
    }
}

impl<P: Payload> RecordStore<P> for StallingStore<P> {
    fn insert(&self, owner: OwnerId, payload: P) -> StoreFuture<'_, VersionedRecord<P>> {
        self.inner.insert(owner, payload)
    }

    fn get(&self, id: &RecordId) -> StoreFuture<'_, Option<VersionedRecord<P>>> {
        let id = id.clone();
        Box::pin(async move {
            tokio::time::sleep(self.read_delay).await;
            self.inner.get(&id).await
        })
    }

    fn conditional_write(&self, id: &RecordId, expected: Version, payload: P) -> StoreFuture<'_, WriteOutcome<P>> {
        let id = id.clone();
        Box::pin(async move {
            self.write_issued.notify_one();
            self.write_release.notified().await;
            self.inner.conditional_write(&id, expected, payload).await
        })
    }

    fn delete(&self, id: &RecordId, expected: Option<Version>) -> StoreFuture<'_, DeleteOutcome<P>> {
        self.inner.delete(id, expected)
    }

    fn list_by_owner(&self, owner: &OwnerId) -> StoreFuture<'_, Vec<VersionedRecord<P>>> {
        self.inner.list_by_owner(owner)
    }
}

// ═══════════════════════════════════════════════════════════════
//  VanishingStore: record deleted between read and write
// ═══════════════════════════════════════════════════════════════

/// Every `get` returns the record as read, then removes it, so the
/// following conditional write finds nothing.
pub struct VanishingStore<P> {
    inner: Arc<MemoryStore<P>>,
}

impl<P: Payload> VanishingStore<P> {
    pub fn new(inner: Arc<MemoryStore<P>>) -> Self {
        Self { inner }
    }
}

impl<P: Payload> RecordStore<P> for VanishingStore<P> {
    fn insert(&self, owner: OwnerId, payload: P) -> StoreFuture<'_, VersionedRecord<P>> {
        self.inner.insert(owner, payload)
    }

    fn get(&self, id: &RecordId) -> StoreFuture<'_, Option<VersionedRecord<P>>> {
        let id = id.clone();
        Box::pin(async move {
            let record = self.inner.get(&id).await?;
            if record.is_some() {
                self.inner.delete(&id, None).await?;
            }
            Ok(record)
        })
    }

    fn conditional_write(&self, id: &RecordId, expected: Version, payload: P) -> StoreFuture<'_, WriteOutcome<P>> {
        self.inner.conditional_write(id, expected, payload)
    }

    fn delete(&self, id: &RecordId, expected: Option<Version>) -> StoreFuture<'_, DeleteOutcome<P>> {
        self.inner.delete(id, expected)
    }

    fn list_by_owner(&self, owner: &OwnerId) -> StoreFuture<'_, Vec<VersionedRecord<P>>> {
        self.inner.list_by_owner(owner)
    }
}
