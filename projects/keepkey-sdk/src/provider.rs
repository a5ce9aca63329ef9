//! Chain-data provider capability
//!
//! Everything the builders learn about a chain (UTXOs, fee rates, nonces,
//! account sequences, prices) comes through [`ChainDataProvider`]. The concrete
//! backend is external; implementations return `anyhow::Result` and the
//! builders map failures into [`crate::TxError`] at the call site.

use anyhow::Result;
use async_trait::async_trait;
use ethereum_types::U256;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::caip::{Caip, NetworkId};
use crate::pubkey::ScriptType;
use crate::signer::SignedTx;

/// One spendable output as reported by the provider.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    /// Satoshis; providers send either a number or a decimal string
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub value: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Raw previous transaction, needed for non-segwit signing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    /// Filled in by the builder from the owning pubkey
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_type: Option<ScriptType>,
    #[serde(default)]
    pub confirmations: u64,
}

/// Fee guidance as reported; which tiers are present varies by backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeRates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest: Option<f64>,
    /// e.g. "sat/vB" or "sat/kB"; informational
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub account_number: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub sequence: u64,
    /// Ripple only
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_index_current: Option<u64>,
    /// Ripple only, in drops
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
}

/// THORChain inbound vault for one source chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundAddress {
    pub chain: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<String>,
    #[serde(default)]
    pub halted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    pub txid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    /// Absent while the tx has not been seen by the backend
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub confirmations: u64,
}

#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    /// `chain` is the provider's chain symbol (`BTC`, `LTC`, ...).
    async fn list_unspent(&self, chain: &str, xpub: &str) -> Result<Vec<Utxo>>;

    async fn get_fee_rate(&self, network: &NetworkId) -> Result<FeeRates>;

    /// Wei
    async fn get_gas_price(&self, network: &NetworkId) -> Result<U256>;

    /// `None` for an address that has never transacted.
    async fn get_nonce(&self, network: &NetworkId, address: &str) -> Result<Option<u64>>;

    /// Native balance as a decimal string in whole coins.
    async fn get_balance(&self, network: &NetworkId, address: &str) -> Result<String>;

    /// Token balance as a decimal string in whole tokens.
    async fn get_token_balance(
        &self,
        network: &NetworkId,
        address: &str,
        contract: &str,
    ) -> Result<String>;

    /// `chain` is the lowercase chain name (`cosmos`, `osmosis`, `ripple`, ...).
    async fn get_account_info(&self, chain: &str, address: &str) -> Result<AccountInfo>;

    async fn get_change_address_index(&self, chain: &str, xpub: &str) -> Result<u32>;

    /// USD prices, one per requested asset, same order.
    async fn get_market_price(&self, assets: &[Caip]) -> Result<Vec<f64>>;

    async fn get_inbound_addresses(&self) -> Result<Vec<InboundAddress>>;

    async fn broadcast(&self, network: &NetworkId, tx: &SignedTx) -> Result<BroadcastResult>;

    async fn lookup_tx(&self, network: &NetworkId, txid: &str) -> Result<TxStatus>;
}
