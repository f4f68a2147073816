use watchlist_api::StoreError;
use watchlist_engine::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum StressError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Store(#[from] StoreError),

    /// A run finished but broke a consistency check.
    #[error("check failed: {0}")]
    Violation(String),
}
