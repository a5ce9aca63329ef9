use thiserror::Error;

#[derive(Error, Debug)]
pub enum TxError {
    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(String),

    #[error("No pubkey found for network: {0}")]
    MissingPubkey(String),

    #[error("Insufficient funds: need {needed}, have {available} ({context})")]
    InsufficientFunds {
        needed: String,
        available: String,
        context: String,
    },

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Coin selection failed: {0}")]
    CoinSelectionFailed(String),

    #[error("Swap encoding failed: {0}")]
    SwapEncodingFailed(String),

    #[error("Unsupported message type {msg_type} for {network}")]
    UnsupportedMessage { network: String, msg_type: String },

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Broadcast failed: {0}")]
    BroadcastFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TxError {
    /// Wrap a failed chain-data lookup, naming what was being fetched.
    pub(crate) fn provider(what: &str, err: anyhow::Error) -> Self {
        TxError::ProviderUnavailable(format!("{}: {:#}", what, err))
    }

    pub(crate) fn insufficient(
        needed: impl ToString,
        available: impl ToString,
        context: impl Into<String>,
    ) -> Self {
        TxError::InsufficientFunds {
            needed: needed.to_string(),
            available: available.to_string(),
            context: context.into(),
        }
    }

    /// Transient failures a caller may retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TxError::ProviderUnavailable(_) | TxError::BroadcastFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, TxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_message_names_both_sides() {
        let err = TxError::insufficient(1_000u64, 400u64, "amount + fee");
        let msg = err.to_string();
        assert!(msg.contains("need 1000"));
        assert!(msg.contains("have 400"));
        assert!(msg.contains("amount + fee"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(TxError::ProviderUnavailable("fee rate".into()).is_retryable());
        assert!(!TxError::UnsupportedAsset("foo:bar/baz:1".into()).is_retryable());
        assert!(!TxError::insufficient(2, 1, "x").is_retryable());
    }
}
