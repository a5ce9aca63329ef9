//! Decimal amount <-> integer base-unit conversion

use ethereum_types::U256;
use ethers_core::utils::{format_units, parse_units};

use crate::errors::{Result, TxError};

/// Integer plus fractional digits that always fit in a U256.
const MAX_SAFE_DIGITS: usize = 77;

/// Parse a decimal string (`"100.50"`) into base units at `decimals` precision.
///
/// Digits past `decimals` are truncated. Negative and non-numeric inputs are
/// rejected, as are amounts too large for 256 bits.
pub fn to_base_units(amount: &str, decimals: u32) -> Result<U256> {
    let trimmed = amount.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(TxError::InvalidRequest(format!("invalid amount: {:?}", amount)));
    }
    let whole = trimmed.split('.').next().unwrap_or_default().trim_start_matches('0');
    if whole.len() + decimals as usize > MAX_SAFE_DIGITS {
        return Err(TxError::InvalidRequest(format!(
            "amount {} is too large at {} decimals",
            trimmed, decimals
        )));
    }
    parse_units(trimmed, decimals)
        .map(U256::from)
        .map_err(|e| TxError::InvalidRequest(format!("invalid amount {:?}: {}", amount, e)))
}

/// Like [`to_base_units`] but rejects amounts that round down to zero.
pub fn exact_base_units(amount: &str, decimals: u32) -> Result<U256> {
    let value = to_base_units(amount, decimals)?;
    if value.is_zero() {
        return Err(TxError::InvalidRequest(format!(
            "amount {} is below the smallest unit at {} decimals",
            amount.trim(),
            decimals
        )));
    }
    Ok(value)
}

/// Satoshi-style conversion for chains whose base unit fits in 64 bits.
pub fn to_sats(amount: &str, decimals: u32) -> Result<u64> {
    let value = to_base_units(amount, decimals)?;
    if value > U256::from(u64::MAX) {
        return Err(TxError::InvalidRequest(format!("amount {} overflows u64", amount)));
    }
    Ok(value.as_u64())
}

/// Non-zero [`to_sats`].
pub fn exact_sats(amount: &str, decimals: u32) -> Result<u64> {
    let value = exact_base_units(amount, decimals)?;
    if value > U256::from(u64::MAX) {
        return Err(TxError::InvalidRequest(format!("amount {} overflows u64", amount)));
    }
    Ok(value.as_u64())
}

/// Lossy conversion for display and USD estimates.
pub fn base_units_to_f64(value: U256, decimals: u32) -> f64 {
    format_units(value, decimals)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scales_by_decimals() {
        assert_eq!(to_base_units("100.50", 6).unwrap(), U256::from(100_500_000u64));
        assert_eq!(to_base_units("5", 6).unwrap(), U256::from(5_000_000u64));
        assert_eq!(
            to_base_units("1", 18).unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
        assert_eq!(to_sats("0.0006", 8).unwrap(), 60_000);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(to_base_units("", 6).is_err());
        assert!(to_base_units("-1", 6).is_err());
        assert!(to_base_units("one", 6).is_err());
    }

    #[test]
    fn test_sub_unit_amounts_are_rejected() {
        assert_eq!(to_sats("0.000000001", 8).unwrap(), 0);
        assert!(matches!(exact_sats("0.000000001", 8), Err(TxError::InvalidRequest(_))));
        assert!(matches!(exact_base_units("0.0000001", 6), Err(TxError::InvalidRequest(_))));
        assert_eq!(exact_base_units("0.000001", 6).unwrap(), U256::one());
    }

    #[test]
    fn test_oversized_amounts_are_rejected() {
        let huge = "1".repeat(70);
        assert!(matches!(to_base_units(&huge, 18), Err(TxError::InvalidRequest(_))));
        assert!(matches!(to_base_units(&"9".repeat(90), 0), Err(TxError::InvalidRequest(_))));
        assert!(to_base_units(&"1".repeat(59), 18).is_ok());
    }

    #[test]
    fn test_display_conversion() {
        let v = U256::from(1_500_000u64);
        assert!((base_units_to_f64(v, 6) - 1.5).abs() < f64::EPSILON);
    }
}
