pub mod config;
pub mod error;
pub mod report;
pub mod scenario;
pub mod sequential;
pub mod setup;
pub mod stress;
