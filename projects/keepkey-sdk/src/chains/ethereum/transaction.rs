//! Unsigned EVM transaction

use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Legacy (EIP-155) transaction. Quantities serialise as `0x` hex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmUnsignedTx {
    pub chain_id: u64,
    pub nonce: U256,
    pub gas_limit: U256,
    pub gas_price: U256,
    /// Recipient, token contract, or swap router
    pub to: Address,
    /// Wei
    pub value: U256,
    /// `0x`-prefixed call data; `"0x"` when empty
    pub data: String,
    /// Derivation path of the sending key
    #[serde(rename = "addressNList")]
    pub address_n_list: Vec<u32>,
    /// Advisory, token transfers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_fee_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_usd: Option<f64>,
}

impl EvmUnsignedTx {
    /// Worst-case fee in wei.
    pub fn max_fee(&self) -> U256 {
        self.gas_limit.saturating_mul(self.gas_price)
    }

    pub fn data_bytes(&self) -> Vec<u8> {
        hex::decode(self.data.trim_start_matches("0x")).unwrap_or_default()
    }
}
