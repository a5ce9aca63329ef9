//! UTXO fee-rate normalisation and tier selection

use std::fmt;

use crate::config::SdkConfig;
use crate::errors::{Result, TxError};
use crate::provider::FeeRates;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeTier {
    Slow,
    Average,
    Fastest,
}

impl TryFrom<u8> for FeeTier {
    type Error = TxError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            1 | 2 => Ok(FeeTier::Slow),
            3 | 4 => Ok(FeeTier::Average),
            5 => Ok(FeeTier::Fastest),
            other => Err(TxError::InvalidRequest(format!(
                "fee level must be 1-5, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeeTier::Slow => "slow",
            FeeTier::Average => "average",
            FeeTier::Fastest => "fastest",
        };
        f.write_str(name)
    }
}

/// Three-tier view over the provider payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedFees {
    pub slow: Option<f64>,
    pub average: Option<f64>,
    pub fastest: Option<f64>,
}

impl NormalizedFees {
    pub fn get(&self, tier: FeeTier) -> Option<f64> {
        match tier {
            FeeTier::Slow => self.slow,
            FeeTier::Average => self.average,
            FeeTier::Fastest => self.fastest,
        }
    }
}

/// Providers answer with `{slow, average, fastest}` or with
/// `{average, fast, fastest}`; in the latter, each tier shifts down one.
pub fn normalize(rates: &FeeRates) -> NormalizedFees {
    let (slow, average) = match rates.slow {
        Some(slow) => (Some(slow), rates.average.or(rates.fast)),
        None => (rates.average, rates.fast.or(rates.average)),
    };
    let fastest = rates.fastest.or(rates.fast).or(average);
    NormalizedFees {
        slow,
        average,
        fastest,
    }
}

/// Rates above `threshold` are sat/kB and get scaled to sat/vB.
pub fn correct_unit(rate: f64, threshold: f64) -> f64 {
    if rate > threshold {
        rate / 1000.0
    } else {
        rate
    }
}

/// Whole sat/vB rate for `fee_level`, floored at the minimum relay fee.
pub fn select_fee_rate(rates: &FeeRates, fee_level: u8, config: &SdkConfig) -> Result<u64> {
    let tier = FeeTier::try_from(fee_level)?;
    let raw = normalize(rates).get(tier).ok_or_else(|| {
        TxError::ProviderUnavailable(format!("fee rate payload has no {} tier", tier))
    })?;
    if !raw.is_finite() || raw <= 0.0 {
        return Err(TxError::ProviderUnavailable(format!(
            "unusable {} fee rate: {}",
            tier, raw
        )));
    }

    let corrected = correct_unit(raw, config.fee_rate_kb_threshold);
    if corrected != raw {
        log::warn!("rate {} looks like sat/kB, using {} sat/vB", raw, corrected);
    }

    let rate = (corrected.ceil() as u64).max(config.min_relay_fee_rate);
    log::debug!("{} tier -> {} sat/vB", tier, rate);
    Ok(rate)
}
