//! Single-attempt optimistic update of one record.
//!
//! Each call runs the fixed sequence read → ownership → mutate/validate →
//! compare-and-write, and classifies the result into an [`Outcome`]. The
//! coordinator keeps no state about records between calls and never retries
//! on its own; conflict handling belongs to the caller (see `retry`).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use watchlist_api::{
    Conflict, DeleteOutcome, Mutation, Outcome, OwnerId, Payload, RecordId, RecordStore,
    StoreError, Validator, Version, VersionedRecord, WriteOutcome,
};

use crate::config::CoordinatorConfig;

pub struct UpdateCoordinator<P: Payload> {
    store: Arc<dyn RecordStore<P>>,
    validator: Arc<dyn Validator<P>>,
    read_timeout: Duration,
}

impl<P: Payload> std::fmt::Debug for UpdateCoordinator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCoordinator")
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl<P: Payload> UpdateCoordinator<P> {
    pub fn new(
        store: Arc<dyn RecordStore<P>>,
        validator: Arc<dyn Validator<P>>,
        config: &CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            validator,
            read_timeout: config.read_timeout(),
        }
    }

    /// Apply `mutation` to record `id` on behalf of `caller`.
    ///
    /// `expected` pins the version the caller believes is current; `None`
    /// targets whatever version this call reads. Either way the write only
    /// lands if the store still holds that exact version.
    pub async fn update<M>(
        &self,
        id: &RecordId,
        caller: &OwnerId,
        expected: Option<Version>,
        mutation: &M,
    ) -> Outcome<VersionedRecord<P>>
    where
        M: Mutation<P> + ?Sized,
    {
        let current = match self.read(id).await {
            Ok(Some(record)) => record,
            Ok(None) => return Outcome::NotFound,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "update: read failed");
                return Outcome::StoreUnavailable(e);
            }
        };

        // Ownership is settled before any version logic.
        if !current.is_owned_by(caller) {
            tracing::debug!(id = %id, caller = %caller, "update: caller is not the owner");
            return Outcome::Forbidden;
        }

        if let Err(invalid) = mutation.check() {
            tracing::debug!(id = %id, violations = %invalid, "update: request rejected");
            return Outcome::InvalidInput(invalid);
        }

        let candidate = mutation.apply(&current.payload);
        let payload = match self.validator.validate(candidate) {
            Ok(payload) => payload,
            Err(invalid) => {
                tracing::debug!(id = %id, violations = %invalid, "update: invalid input");
                return Outcome::InvalidInput(invalid);
            }
        };

        let target = expected.unwrap_or(current.version);
        let store = self.store.clone();
        let write_id = id.clone();
        let result = commit_detached(id, "update", async move {
            store.conditional_write(&write_id, target, payload).await
        })
        .await;

        match result {
            Ok(WriteOutcome::Written(record)) => {
                tracing::debug!(id = %id, version = record.version, "update applied");
                Outcome::Applied(record)
            }
            Ok(WriteOutcome::VersionMismatch { current }) => {
                tracing::debug!(id = %id, expected = target, actual = current, "update conflict");
                Outcome::Conflict(Conflict {
                    expected: target,
                    actual: current,
                })
            }
            // Deleted between our read and our write.
            Ok(WriteOutcome::NotFound) => Outcome::NotFound,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "update: conditional write failed");
                Outcome::StoreUnavailable(e)
            }
        }
    }

    /// Remove record `id` on behalf of `caller`, with the same ordering as
    /// `update`: existence, then ownership, then the (optional) version check.
    pub async fn delete(
        &self,
        id: &RecordId,
        caller: &OwnerId,
        expected: Option<Version>,
    ) -> Outcome<VersionedRecord<P>> {
        let current = match self.read(id).await {
            Ok(Some(record)) => record,
            Ok(None) => return Outcome::NotFound,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "delete: read failed");
                return Outcome::StoreUnavailable(e);
            }
        };

        if !current.is_owned_by(caller) {
            tracing::debug!(id = %id, caller = %caller, "delete: caller is not the owner");
            return Outcome::Forbidden;
        }

        let store = self.store.clone();
        let delete_id = id.clone();
        let result = commit_detached(id, "delete", async move {
            store.delete(&delete_id, expected).await
        })
        .await;

        match result {
            Ok(DeleteOutcome::Deleted(record)) => {
                tracing::debug!(id = %id, version = record.version, "record deleted");
                Outcome::Applied(record)
            }
            Ok(DeleteOutcome::VersionMismatch { current }) => {
                let expected = expected.unwrap_or(current);
                tracing::debug!(id = %id, expected, actual = current, "delete conflict");
                Outcome::Conflict(Conflict {
                    expected,
                    actual: current,
                })
            }
            Ok(DeleteOutcome::NotFound) => Outcome::NotFound,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "delete failed");
                Outcome::StoreUnavailable(e)
            }
        }
    }

    /// Owner-scoped read: the record only if `caller` owns it.
    pub async fn fetch(&self, id: &RecordId, caller: &OwnerId) -> Outcome<VersionedRecord<P>> {
        match self.read(id).await {
            Ok(Some(record)) if record.is_owned_by(caller) => Outcome::Applied(record),
            Ok(Some(_)) => Outcome::Forbidden,
            Ok(None) => Outcome::NotFound,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "fetch failed");
                Outcome::StoreUnavailable(e)
            }
        }
    }

    /// Store read bounded by the configured timeout.
    pub(crate) async fn read(&self, id: &RecordId) -> Result<Option<VersionedRecord<P>>, StoreError> {
        bounded(self.read_timeout, id, self.store.get(id)).await
    }

    pub(crate) fn store(&self) -> &Arc<dyn RecordStore<P>> {
        &self.store
    }

    pub(crate) fn validator(&self) -> &Arc<dyn Validator<P>> {
        &self.validator
    }

    pub(crate) fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

/// Await `fut`, turning an elapsed deadline into a `Timeout` store error.
pub(crate) async fn bounded<T>(
    limit: Duration,
    id: impl std::fmt::Display,
    fut: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::timeout(format!(
            "read of {id} exceeded {} ms",
            limit.as_millis()
        ))),
    }
}

/// Version left behind by a commit, if it changed anything.
trait Committed {
    fn committed_version(&self) -> Option<Version>;
}

impl<P> Committed for WriteOutcome<P> {
    fn committed_version(&self) -> Option<Version> {
        match self {
            WriteOutcome::Written(record) => Some(record.version),
            _ => None,
        }
    }
}

impl<P> Committed for DeleteOutcome<P> {
    fn committed_version(&self) -> Option<Version> {
        match self {
            DeleteOutcome::Deleted(record) => Some(record.version),
            _ => None,
        }
    }
}

/// Run a store mutation on its own task.
///
/// Once issued, the mutation runs to completion even if the caller's future
/// is dropped; in that case the true outcome is logged instead of returned.
async fn commit_detached<T, F>(id: &RecordId, action: &'static str, fut: F) -> Result<T, StoreError>
where
    T: Committed + Send + 'static,
    F: Future<Output = Result<T, StoreError>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let task_id = id.clone();
    tokio::spawn(async move {
        let result = fut.await;
        if let Err(unreported) = tx.send(result) {
            match unreported {
                Ok(outcome) => match outcome.committed_version() {
                    Some(version) => tracing::warn!(
                        id = %task_id,
                        action,
                        version,
                        "caller stopped waiting, but the store committed the change"
                    ),
                    None => tracing::info!(
                        id = %task_id,
                        action,
                        "caller stopped waiting; store made no change"
                    ),
                },
                Err(e) => tracing::warn!(
                    id = %task_id,
                    action,
                    error = %e,
                    "caller stopped waiting; store operation failed"
                ),
            }
        }
    });

    match rx.await {
        Ok(result) => result,
        Err(_) => Err(StoreError::unavailable(format!(
            "{action} of {id} ended without reporting an outcome; re-read to learn the record state"
        ))),
    }
}
