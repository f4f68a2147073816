use std::sync::Arc;

use storage_memory::MemoryStoreFactory;
use watchlist_api::{MovieEntry, OwnerId, RecordStore, VersionedRecord};
use watchlist_engine::{EngineError, StoreConfig, Watchlist};

use super::config::Effective;
use super::error::StressError;

/// Build the record store named by `[store] kind`.
pub fn build_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore<MovieEntry>>, StressError> {
    match config.kind.as_str() {
        "memory" => {
            let json = config.config_json()?;
            let store: Arc<dyn RecordStore<MovieEntry>> = MemoryStoreFactory.create::<MovieEntry>(&json)?;
            Ok(store)
        }
        other => Err(EngineError::UnknownStore(other.to_string()).into()),
    }
}

pub fn watchlist(eff: &Effective) -> Result<Arc<Watchlist<MovieEntry>>, StressError> {
    let store = build_store(&eff.engine.store)?;
    tracing::info!(
        store = %eff.engine.store.kind,
        read_timeout_ms = eff.engine.coordinator.read_timeout_ms,
        "watchlist ready"
    );
    Ok(Arc::new(Watchlist::movies(store, &eff.engine)))
}

pub fn test_owner() -> OwnerId {
    OwnerId::new("stress-user")
}

/// Create the record the run works against.
pub async fn seed(list: &Watchlist<MovieEntry>, title: &str) -> Result<VersionedRecord<MovieEntry>, StressError> {
    let outcome = list.create(&test_owner(), MovieEntry::new(title, 2023)).await;
    let class = outcome.class();
    outcome
        .into_applied()
        .ok_or_else(|| StressError::Violation(format!("creating the test record returned {class}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_is_rejected() {
        let config = StoreConfig {
            kind: "postgres".into(),
            config: None,
        };
        let err = build_store(&config).err().unwrap();
        assert!(matches!(err, StressError::Engine(EngineError::UnknownStore(k)) if k == "postgres"));
    }

    #[test]
    fn memory_store_honours_capacity_setting() {
        let config = StoreConfig {
            kind: "memory".into(),
            config: Some(toml::Value::Table(
                [("max_records".to_string(), toml::Value::Integer(0))].into_iter().collect(),
            )),
        };
        assert!(matches!(build_store(&config), Err(StressError::Store(_))));
    }
}
