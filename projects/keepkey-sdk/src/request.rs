//! Caller-facing transfer requests

use serde::{Deserialize, Serialize};

use crate::caip::Caip;
use crate::errors::{Result, TxError};
use crate::pubkey::ScriptType;

/// Default fee tier: fastest.
pub const DEFAULT_FEE_LEVEL: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendAmount {
    /// Decimal amount in whole coins/tokens, e.g. `"0.5"`
    Exact(String),
    /// Everything spendable after fees
    Max,
}

impl SendAmount {
    pub fn is_max(&self) -> bool {
        matches!(self, SendAmount::Max)
    }

    pub fn exact(&self) -> Option<&str> {
        match self {
            SendAmount::Exact(v) => Some(v.as_str()),
            SendAmount::Max => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub caip: Caip,
    /// Absent for THORChain/MAYAChain deposits
    #[serde(default)]
    pub to: Option<String>,
    pub amount: SendAmount,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default = "default_fee_level")]
    pub fee_level: u8,
    #[serde(default)]
    pub change_script_type: Option<ScriptType>,
}

fn default_fee_level() -> u8 {
    DEFAULT_FEE_LEVEL
}

impl TransferRequest {
    pub fn new(caip: Caip, amount: SendAmount) -> Self {
        Self {
            caip,
            to: None,
            amount,
            memo: None,
            fee_level: DEFAULT_FEE_LEVEL,
            change_script_type: None,
        }
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn fee_level(mut self, level: u8) -> Self {
        self.fee_level = level;
        self
    }

    pub fn change_script_type(mut self, script_type: ScriptType) -> Self {
        self.change_script_type = Some(script_type);
        self
    }

    pub fn is_max(&self) -> bool {
        self.amount.is_max()
    }

    /// Memo with surrounding whitespace stripped; blank memos become `None`.
    pub fn memo_trimmed(&self) -> Option<&str> {
        self.memo.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }

    /// Destination, required for every send except deposits.
    pub fn require_to(&self) -> Result<&str> {
        match self.to.as_deref().map(str::trim) {
            Some(to) if !to.is_empty() => Ok(to),
            _ => Err(TxError::InvalidRequest("destination address is required".to_string())),
        }
    }

    /// Exact amount as a decimal string; rejects zero and negative values.
    pub fn require_amount(&self) -> Result<&str> {
        let amount = self
            .amount
            .exact()
            .ok_or_else(|| TxError::InvalidRequest("exact amount required".to_string()))?;
        let parsed: f64 = amount
            .trim()
            .parse()
            .map_err(|_| TxError::InvalidRequest(format!("invalid amount: {:?}", amount)))?;
        if !(parsed.is_finite() && parsed > 0.0) {
            return Err(TxError::InvalidRequest(format!("amount must be > 0, got {}", amount)));
        }
        Ok(amount.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc() -> Caip {
        Caip::parse("bip122:000000000019d6689c085ae165831e93/slip44:0").unwrap()
    }

    #[test]
    fn test_amount_validation() {
        let ok = TransferRequest::new(btc(), SendAmount::Exact("0.001".into()));
        assert_eq!(ok.require_amount().unwrap(), "0.001");

        let zero = TransferRequest::new(btc(), SendAmount::Exact("0".into()));
        assert!(zero.require_amount().is_err());

        let max = TransferRequest::new(btc(), SendAmount::Max);
        assert!(max.is_max());
        assert!(max.require_amount().is_err());
    }

    #[test]
    fn test_blank_memo_and_destination() {
        let req = TransferRequest::new(btc(), SendAmount::Max).memo("   ").to("  ");
        assert_eq!(req.memo_trimmed(), None);
        assert!(req.require_to().is_err());
    }

    #[test]
    fn test_request_json_defaults() {
        let req: TransferRequest = serde_json::from_str(
            r#"{"caip":"eip155:1/slip44:60","to":"0xabc","amount":{"exact":"1.5"}}"#,
        )
        .unwrap();
        assert_eq!(req.fee_level, DEFAULT_FEE_LEVEL);
        assert_eq!(req.amount.exact(), Some("1.5"));

        let max: TransferRequest =
            serde_json::from_str(r#"{"caip":"eip155:1/slip44:60","amount":"max"}"#).unwrap();
        assert!(max.is_max());
    }
}
