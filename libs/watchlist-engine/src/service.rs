use std::sync::Arc;

use watchlist_api::{
    MovieEntry, Mutation, Outcome, OwnerId, Payload, RecordId, RecordStore, Validator, Version,
    VersionedRecord,
};

use crate::config::EngineConfig;
use crate::coordinator::{UpdateCoordinator, bounded};

/// Transport-agnostic CRUD surface over one record store.
///
/// Creation, owner-scoped reads and listing live here; every mutation of an
/// existing record goes through the [`UpdateCoordinator`].
#[derive(Debug)]
pub struct Watchlist<P: Payload> {
    coordinator: UpdateCoordinator<P>,
}

impl Watchlist<MovieEntry> {
    /// Movie watchlist with the field rules and timeouts from `config`.
    pub fn movies(store: Arc<dyn RecordStore<MovieEntry>>, config: &EngineConfig) -> Self {
        Self::new(UpdateCoordinator::new(
            store,
            Arc::new(config.validation.clone()),
            &config.coordinator,
        ))
    }
}

impl<P: Payload> Watchlist<P> {
    pub fn new(coordinator: UpdateCoordinator<P>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &UpdateCoordinator<P> {
        &self.coordinator
    }

    /// Validate `payload` and store it as a new record owned by `owner`.
    pub async fn create(&self, owner: &OwnerId, payload: P) -> Outcome<VersionedRecord<P>> {
        let payload = match self.coordinator.validator().validate(payload) {
            Ok(payload) => payload,
            Err(invalid) => return Outcome::InvalidInput(invalid),
        };

        match self.coordinator.store().insert(owner.clone(), payload).await {
            Ok(record) => {
                tracing::debug!(id = %record.id, owner = %owner, "record created");
                Outcome::Applied(record)
            }
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "create failed");
                Outcome::StoreUnavailable(e)
            }
        }
    }

    pub async fn fetch(&self, id: &RecordId, caller: &OwnerId) -> Outcome<VersionedRecord<P>> {
        self.coordinator.fetch(id, caller).await
    }

    /// Every record of `owner`, newest first.
    pub async fn list(&self, owner: &OwnerId) -> Outcome<Vec<VersionedRecord<P>>> {
        let listed = bounded(
            self.coordinator.read_timeout(),
            format!("records of {owner}"),
            self.coordinator.store().list_by_owner(owner),
        )
        .await;
        match listed {
            Ok(records) => Outcome::Applied(records),
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "list failed");
                Outcome::StoreUnavailable(e)
            }
        }
    }

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
        self.coordinator.update(id, caller, expected, mutation).await
    }

    pub async fn delete(
        &self,
        id: &RecordId,
        caller: &OwnerId,
        expected: Option<Version>,
    ) -> Outcome<VersionedRecord<P>> {
        self.coordinator.delete(id, caller, expected).await
    }
}
