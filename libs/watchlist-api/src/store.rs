use std::future::Future;
use std::pin::Pin;

use crate::error::StoreError;
use crate::record::{OwnerId, Payload, RecordId, Version, VersionedRecord};

/// Boxed future returned by every store method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Result of a conditional write that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<P> {
    /// Stored version matched; the record now carries `expected + 1`.
    Written(VersionedRecord<P>),
    /// Another writer got there first. Nothing was changed.
    VersionMismatch { current: Version },
    NotFound,
}

/// Result of a (possibly conditional) delete that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome<P> {
    /// The record as it was just before removal.
    Deleted(VersionedRecord<P>),
    VersionMismatch { current: Version },
    NotFound,
}

/// Storage capability the engine depends on.
///
/// The engine doesn't know concrete implementations; any backend that
/// offers an atomic compare-and-swap keyed by id + version fits.
///
/// Contract:
/// - `conditional_write` and `delete` are linearizable per id: when N
///   callers race with the same expected version, exactly one wins and
///   the rest see `VersionMismatch`.
/// - A failed write never consumes a version number.
/// - `get` returns a record exactly as some completed write left it.
/// - `Err(StoreError)` is reserved for infrastructure failures.
pub trait RecordStore<P: Payload>: Send + Sync {
    /// Create a record with no prior version. Assigns id and version 0.
    fn insert(&self, owner: OwnerId, payload: P) -> StoreFuture<'_, VersionedRecord<P>>;

    fn get(&self, id: &RecordId) -> StoreFuture<'_, Option<VersionedRecord<P>>>;

    /// Replace the payload iff the stored version equals `expected`.
    fn conditional_write(
        &self,
        id: &RecordId,
        expected: Version,
        payload: P,
    ) -> StoreFuture<'_, WriteOutcome<P>>;

    /// Remove the record. `None` deletes unconditionally.
    fn delete(&self, id: &RecordId, expected: Option<Version>) -> StoreFuture<'_, DeleteOutcome<P>>;

    /// All records of `owner`, newest `created_at` first.
    fn list_by_owner(&self, owner: &OwnerId) -> StoreFuture<'_, Vec<VersionedRecord<P>>>;
}
