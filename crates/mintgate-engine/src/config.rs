use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Upper bound on any single ledger call. A timeout is reported as a
    /// retryable `LedgerUnavailable`, never as evidence of non-minting.
    #[serde(default = "EngineConfig::default_ledger_timeout_ms")]
    pub ledger_timeout_ms: u64,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ledger_timeout_ms: Self::default_ledger_timeout_ms(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl EngineConfig {
    fn default_ledger_timeout_ms() -> u64 {
        10_000
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_millis(self.ledger_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { json: false }
    }
}

pub fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    match path {
        None => Ok(EngineConfig::default()),
        Some(p) => {
            let raw = fs::read_to_string(Path::new(p))?;
            let cfg: EngineConfig =
                serde_json::from_str(&raw).map_err(|e| anyhow!("invalid config json: {e}"))?;
            if cfg.ledger_timeout_ms == 0 {
                return Err(anyhow!("ledger_timeout_ms must be positive"));
            }
            Ok(cfg)
        }
    }
}
