//! SDK tuning knobs, loadable from `~/.keepkey/sdk.json`

use std::path::{Path, PathBuf};
use std::time::Duration;

use ethereum_types::U256;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TxError};
use crate::retry::RetryPolicy;

/// 10 gwei
const DEFAULT_MIN_GAS_PRICE_WEI: u64 = 10_000_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Floor for UTXO fee rates, sat/vB
    pub min_relay_fee_rate: u64,
    /// Provider fee rates above this are taken to be sat/kB
    pub fee_rate_kb_threshold: f64,
    pub min_gas_price_wei: u64,
    /// Wei held back from a max send
    pub max_send_buffer_wei: u64,
    pub swap_expiry_secs: u64,
    pub ripple_ledger_horizon: u64,
    pub confirmation_poll_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            min_relay_fee_rate: 1,
            fee_rate_kb_threshold: 500.0,
            min_gas_price_wei: DEFAULT_MIN_GAS_PRICE_WEI,
            max_send_buffer_wei: 100,
            swap_expiry_secs: 3600,
            ripple_ledger_horizon: 1000,
            confirmation_poll_secs: 8,
            retry: RetryPolicy::default(),
        }
    }
}

impl SdkConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SdkConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        log::debug!("loaded {}", path.display());
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when absent.
    pub fn load_or_default() -> Result<Self> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.confirmation_poll_secs == 0 {
            return Err(TxError::Config("confirmation_poll_secs must be > 0".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(TxError::Config("retry.max_attempts must be > 0".to_string()));
        }
        if self.fee_rate_kb_threshold <= 0.0 || !self.fee_rate_kb_threshold.is_finite() {
            return Err(TxError::Config("fee_rate_kb_threshold must be positive".to_string()));
        }
        if self.min_relay_fee_rate == 0 {
            return Err(TxError::Config("min_relay_fee_rate must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn gas_price_floor(&self) -> U256 {
        U256::from(self.min_gas_price_wei)
    }

    pub fn send_buffer(&self) -> U256 {
        U256::from(self.max_send_buffer_wei)
    }

    pub fn confirmation_poll_interval(&self) -> Duration {
        Duration::from_secs(self.confirmation_poll_secs)
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".keepkey")
        .join("sdk.json")
}
