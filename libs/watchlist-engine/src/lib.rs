pub mod config;
pub mod coordinator;
pub mod error;
pub mod retry;
pub mod service;

pub use config::{CoordinatorConfig, EngineConfig, StoreConfig};
pub use coordinator::UpdateCoordinator;
pub use error::EngineError;
pub use retry::{RetryConfig, RetryOutcome, RetryPolicy, RetryReport};
pub use service::Watchlist;
