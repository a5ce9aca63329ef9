//! In-memory provider and signer
//!
//! [`StaticProvider`] answers every lookup from canned data and can be
//! deserialised from a JSON session snapshot; [`RecordingSigner`] records each
//! request and returns a deterministic hex payload. Both back the `kktx`
//! dry-run and the test suites.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use ethereum_types::U256;
use serde::{Deserialize, Serialize};

use crate::caip::{Caip, NetworkId};
use crate::chains::cosmos::transaction::CosmosUnsignedTx;
use crate::chains::ethereum::transaction::EvmUnsignedTx;
use crate::chains::ripple::RippleUnsignedTx;
use crate::provider::{AccountInfo, BroadcastResult, ChainDataProvider, FeeRates, InboundAddress, TxStatus, Utxo};
use crate::signer::{SignedTx, Signer, UtxoSignRequest};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct ProviderState {
    calls: usize,
    broadcasts: Vec<(NetworkId, SignedTx)>,
    status_cursor: HashMap<String, usize>,
}

/// Canned chain data. Network-keyed maps use the network id string,
/// address-keyed maps the address exactly as the builder passes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticProvider {
    /// By xpub
    utxos: HashMap<String, Vec<Utxo>>,
    /// By network id
    fee_rates: HashMap<String, FeeRates>,
    /// Wei, by network id
    gas_prices: HashMap<String, u64>,
    /// By address
    nonces: HashMap<String, u64>,
    /// Whole coins, by address
    balances: HashMap<String, String>,
    /// Whole tokens, by lowercase contract address
    token_balances: HashMap<String, String>,
    /// By address
    accounts: HashMap<String, AccountInfo>,
    /// By xpub
    change_indexes: HashMap<String, u32>,
    /// USD, by CAIP
    prices: HashMap<String, f64>,
    inbound_addresses: Vec<InboundAddress>,
    broadcast_txid: Option<String>,
    /// Successive `lookup_tx` answers per txid; the last one repeats
    tx_statuses: HashMap<String, Vec<TxStatus>>,
    /// Provider methods that fail on every call
    failures: HashSet<String>,
    #[serde(skip)]
    state: Arc<Mutex<ProviderState>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_utxos(mut self, xpub: impl Into<String>, utxos: Vec<Utxo>) -> Self {
        self.utxos.insert(xpub.into(), utxos);
        self
    }

    pub fn with_fee_rates(mut self, network: &str, rates: FeeRates) -> Self {
        self.fee_rates.insert(network.to_string(), rates);
        self
    }

    pub fn with_gas_price(mut self, network: &str, wei: u64) -> Self {
        self.gas_prices.insert(network.to_string(), wei);
        self
    }

    pub fn with_nonce(mut self, address: impl Into<String>, nonce: u64) -> Self {
        self.nonces.insert(address.into(), nonce);
        self
    }

    pub fn with_balance(mut self, address: impl Into<String>, balance: impl Into<String>) -> Self {
        self.balances.insert(address.into(), balance.into());
        self
    }

    pub fn with_token_balance(mut self, contract: &str, balance: impl Into<String>) -> Self {
        self.token_balances.insert(contract.to_ascii_lowercase(), balance.into());
        self
    }

    pub fn with_account(mut self, address: impl Into<String>, info: AccountInfo) -> Self {
        self.accounts.insert(address.into(), info);
        self
    }

    pub fn with_change_index(mut self, xpub: impl Into<String>, index: u32) -> Self {
        self.change_indexes.insert(xpub.into(), index);
        self
    }

    pub fn with_price(mut self, caip: &str, usd: f64) -> Self {
        self.prices.insert(caip.to_string(), usd);
        self
    }

    pub fn with_inbound_address(mut self, inbound: InboundAddress) -> Self {
        self.inbound_addresses.push(inbound);
        self
    }

    pub fn with_broadcast_result(mut self, result: BroadcastResult) -> Self {
        self.broadcast_txid = Some(result.txid);
        self
    }

    pub fn with_tx_statuses(mut self, txid: impl Into<String>, statuses: Vec<TxStatus>) -> Self {
        self.tx_statuses.insert(txid.into(), statuses);
        self
    }

    /// Make `method` (e.g. `"get_fee_rate"`) fail on every call.
    pub fn failing(mut self, method: &str) -> Self {
        self.failures.insert(method.to_string());
        self
    }

    /// Provider calls made so far, across clones.
    pub fn call_count(&self) -> usize {
        locked(&self.state).calls
    }

    pub fn broadcasts(&self) -> Vec<(NetworkId, SignedTx)> {
        locked(&self.state).broadcasts.clone()
    }

    fn enter(&self, method: &str) -> Result<()> {
        locked(&self.state).calls += 1;
        log::debug!("offline provider call: {}", method);
        if self.failures.contains(method) {
            bail!("{} unavailable", method);
        }
        Ok(())
    }
}

#[async_trait]
impl ChainDataProvider for StaticProvider {
    async fn list_unspent(&self, chain: &str, xpub: &str) -> Result<Vec<Utxo>> {
        self.enter("list_unspent")?;
        log::debug!("{} UTXOs requested for {}", chain, xpub);
        Ok(self.utxos.get(xpub).cloned().unwrap_or_default())
    }

    async fn get_fee_rate(&self, network: &NetworkId) -> Result<FeeRates> {
        self.enter("get_fee_rate")?;
        self.fee_rates
            .get(network.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("no fee rate for {}", network))
    }

    async fn get_gas_price(&self, network: &NetworkId) -> Result<U256> {
        self.enter("get_gas_price")?;
        self.gas_prices
            .get(network.as_str())
            .map(|wei| U256::from(*wei))
            .ok_or_else(|| anyhow!("no gas price for {}", network))
    }

    async fn get_nonce(&self, _network: &NetworkId, address: &str) -> Result<Option<u64>> {
        self.enter("get_nonce")?;
        Ok(self.nonces.get(address).copied())
    }

    async fn get_balance(&self, network: &NetworkId, address: &str) -> Result<String> {
        self.enter("get_balance")?;
        self.balances
            .get(address)
            .cloned()
            .ok_or_else(|| anyhow!("no balance for {} on {}", address, network))
    }

    async fn get_token_balance(&self, _network: &NetworkId, address: &str, contract: &str) -> Result<String> {
        self.enter("get_token_balance")?;
        self.token_balances
            .get(&contract.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| anyhow!("no {} balance for {}", contract, address))
    }

    async fn get_account_info(&self, chain: &str, address: &str) -> Result<AccountInfo> {
        self.enter("get_account_info")?;
        self.accounts
            .get(address)
            .cloned()
            .ok_or_else(|| anyhow!("no {} account {}", chain, address))
    }

    async fn get_change_address_index(&self, _chain: &str, xpub: &str) -> Result<u32> {
        self.enter("get_change_address_index")?;
        Ok(self.change_indexes.get(xpub).copied().unwrap_or(0))
    }

    async fn get_market_price(&self, assets: &[Caip]) -> Result<Vec<f64>> {
        self.enter("get_market_price")?;
        assets
            .iter()
            .map(|caip| {
                self.prices
                    .get(caip.as_str())
                    .copied()
                    .ok_or_else(|| anyhow!("no price for {}", caip))
            })
            .collect()
    }

    async fn get_inbound_addresses(&self) -> Result<Vec<InboundAddress>> {
        self.enter("get_inbound_addresses")?;
        Ok(self.inbound_addresses.clone())
    }

    async fn broadcast(&self, network: &NetworkId, tx: &SignedTx) -> Result<BroadcastResult> {
        self.enter("broadcast")?;
        let txid = self
            .broadcast_txid
            .clone()
            .ok_or_else(|| anyhow!("broadcast is disabled in this session"))?;
        locked(&self.state).broadcasts.push((network.clone(), tx.clone()));
        Ok(BroadcastResult { txid })
    }

    async fn lookup_tx(&self, _network: &NetworkId, txid: &str) -> Result<TxStatus> {
        self.enter("lookup_tx")?;
        let statuses = match self.tx_statuses.get(txid) {
            Some(s) if !s.is_empty() => s,
            _ => return Ok(TxStatus::default()),
        };
        let mut state = locked(&self.state);
        let cursor = state.status_cursor.entry(txid.to_string()).or_insert(0);
        let status = statuses[(*cursor).min(statuses.len() - 1)].clone();
        *cursor += 1;
        Ok(status)
    }
}

/// One request the signer received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignCall {
    pub kind: &'static str,
    pub payload: serde_json::Value,
}

/// Signs nothing: returns `hex(json(request))` and records the call.
#[derive(Debug, Clone, Default)]
pub struct RecordingSigner {
    calls: Arc<Mutex<Vec<SignCall>>>,
    failure: Option<String>,
}

impl RecordingSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every request with `reason`, as a device would on user cancel.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    pub fn calls(&self) -> Vec<SignCall> {
        locked(&self.calls).clone()
    }

    fn record<T: Serialize>(&self, kind: &'static str, request: &T) -> Result<SignedTx> {
        let payload = serde_json::to_value(request)?;
        locked(&self.calls).push(SignCall {
            kind,
            payload: payload.clone(),
        });
        if let Some(reason) = &self.failure {
            bail!("{} rejected: {}", kind, reason);
        }
        let bytes = serde_json::to_vec(&payload)?;
        Ok(SignedTx::new(hex::encode(bytes)))
    }
}

#[async_trait]
impl Signer for RecordingSigner {
    async fn sign_utxo(&self, request: &UtxoSignRequest) -> Result<SignedTx> {
        self.record("utxo", request)
    }

    async fn sign_cosmos_amino(&self, tx: &CosmosUnsignedTx) -> Result<SignedTx> {
        self.record("cosmos_amino", tx)
    }

    async fn sign_evm(&self, tx: &EvmUnsignedTx) -> Result<SignedTx> {
        self.record("evm", tx)
    }

    async fn sign_ripple(&self, tx: &RippleUnsignedTx) -> Result<SignedTx> {
        self.record("ripple", tx)
    }
}
