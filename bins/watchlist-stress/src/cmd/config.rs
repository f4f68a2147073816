use clap::Args;

use watchlist_engine::EngineConfig;

use super::error::StressError;

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug)]
pub struct EngineArgs {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "watchlist.toml", env = "WATCHLIST_CONFIG")]
    pub config: String,

    /// Override `coordinator.read_timeout_ms`
    #[arg(long, global = true)]
    pub read_timeout_ms: Option<u64>,

    /// Override `retry.max_attempts`
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective: merged config
// ═══════════════════════════════════════════════════════════════

/// Final configuration: config file < env/CLI.
pub struct Effective {
    pub engine: EngineConfig,
}

impl Effective {
    pub fn new(args: &EngineArgs) -> Result<Self, StressError> {
        let mut engine = if std::path::Path::new(&args.config).exists() {
            EngineConfig::load(&args.config)?
        } else {
            tracing::debug!(config = %args.config, "no config file, using defaults");
            EngineConfig::default()
        };

        if let Some(ms) = args.read_timeout_ms {
            if ms == 0 {
                return Err(StressError::Config("--read-timeout-ms must be greater than zero".into()));
            }
            engine.coordinator.read_timeout_ms = ms;
        }
        if let Some(attempts) = args.max_attempts {
            if attempts == 0 {
                return Err(StressError::Config("--max-attempts must be at least 1".into()));
            }
            engine.retry.max_attempts = attempts;
        }

        Ok(Self { engine })
    }
}
