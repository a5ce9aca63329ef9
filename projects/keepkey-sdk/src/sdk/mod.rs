//! Session-level SDK facade
//!
//! Holds the enabled networks, the de-duplicated pubkeys and balances, and
//! the selected asset. Builders only ever see read-only snapshots of this
//! state through the [`TransactionManager`].

pub mod follow;
pub mod summary;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::caip::{classify, Caip, NetworkId};
use crate::chains::cosmos::staking::StakingRequest;
use crate::config::SdkConfig;
use crate::errors::{Result, TxError};
use crate::manager::TransactionManager;
use crate::provider::ChainDataProvider;
use crate::pubkey::{PubkeyRecord, PubkeyStore};
use crate::request::{SendAmount, TransferRequest};
use crate::signer::{SignedTx, Signer};
use crate::tx::UnsignedTx;

pub use self::follow::{follow_transaction, required_confirmations, ConfirmationReport};
pub use self::summary::{summarize, TxSummary};

/// One cached balance row.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Unique per (asset, holder)
    pub identifier: String,
    pub caip: Caip,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    /// Whole units
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
}

impl Balance {
    pub fn network_id(&self) -> NetworkId {
        self.caip.network_id()
    }

    pub fn value_usd(&self) -> Option<f64> {
        self.price_usd.filter(|p| *p > 0.0).map(|p| p * self.balance)
    }
}

/// The asset the caller is working with and everything the session knows
/// about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetContext {
    pub caip: Caip,
    pub network_id: NetworkId,
    pub pubkeys: Vec<PubkeyRecord>,
    pub balances: Vec<Balance>,
    pub balance_total: f64,
    pub price_usd: Option<f64>,
}

impl AssetContext {
    pub fn value_usd(&self) -> Option<f64> {
        self.price_usd.map(|p| p * self.balance_total)
    }
}

/// Result of a one-call transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub caip: Caip,
    pub txid: String,
    pub unsigned_tx: UnsignedTx,
    pub signed_tx: SignedTx,
}

pub struct KeepKeySdk {
    manager: TransactionManager,
    blockchains: Vec<NetworkId>,
    pubkeys: PubkeyStore,
    balances: Vec<Balance>,
    asset_context: Option<AssetContext>,
    pubkey_context: Option<PubkeyRecord>,
}

impl KeepKeySdk {
    pub fn new(provider: Arc<dyn ChainDataProvider>, signer: Arc<dyn Signer>, config: SdkConfig) -> Self {
        Self {
            manager: TransactionManager::new(provider, signer, config),
            blockchains: Vec::new(),
            pubkeys: PubkeyStore::new(),
            balances: Vec::new(),
            asset_context: None,
            pubkey_context: None,
        }
    }

    pub fn manager(&self) -> &TransactionManager {
        &self.manager
    }

    /// Replace the enabled network list. Already-loaded pubkeys and balances
    /// are kept; the filter applies to later loads.
    pub fn set_blockchains(&mut self, blockchains: Vec<NetworkId>) -> Result<()> {
        if blockchains.is_empty() {
            return Err(TxError::InvalidRequest("at least one blockchain is required".to_string()));
        }
        log::info!("{} blockchains enabled", blockchains.len());
        self.blockchains = blockchains;
        Ok(())
    }

    pub fn blockchains(&self) -> &[NetworkId] {
        &self.blockchains
    }

    /// Add pubkeys valid on an enabled network, skipping (pubkey, path)
    /// duplicates. Returns how many were added.
    pub fn load_pubkeys(&mut self, records: Vec<PubkeyRecord>) -> usize {
        let added = self.pubkeys.load(records, &self.blockchains);
        log::info!("loaded {} pubkeys, {} total", added, self.pubkeys.len());
        added
    }

    pub fn pubkeys(&self) -> &[PubkeyRecord] {
        self.pubkeys.as_slice()
    }

    /// Add balances on enabled networks, first row per identifier wins.
    /// Returns how many were added.
    pub fn load_balances(&mut self, balances: Vec<Balance>) -> usize {
        let mut added = 0;
        for balance in balances {
            let network = balance.network_id();
            if !self.blockchains.is_empty() && !self.blockchains.contains(&network) {
                continue;
            }
            if self.balances.iter().any(|b| b.identifier == balance.identifier) {
                log::debug!("skipping duplicate balance {}", balance.identifier);
                continue;
            }
            self.balances.push(balance);
            added += 1;
        }
        log::info!("loaded {} balances, {} total", added, self.balances.len());
        added
    }

    pub fn balances(&self) -> &[Balance] {
        &self.balances
    }

    /// Select (or with `None`, clear) the working asset. The signing context
    /// moves to the first key for the asset's network unless the current one
    /// already matches.
    pub fn set_asset_context(&mut self, caip: Option<Caip>) -> Result<Option<&AssetContext>> {
        let caip = match caip {
            Some(caip) => caip,
            None => {
                self.asset_context = None;
                return Ok(None);
            }
        };
        classify(&caip)?;
        let network = caip.network_id();

        let pubkeys: Vec<PubkeyRecord> = self.pubkeys.for_network(&network).cloned().collect();
        let balances: Vec<Balance> = self.balances.iter().filter(|b| b.caip == caip).cloned().collect();
        let balance_total = balances.iter().map(|b| b.balance).sum();
        let price_usd = balances.iter().filter_map(|b| b.price_usd).find(|p| *p > 0.0);

        let context_ok = self.pubkey_context.as_ref().map(|p| p.matches(&network)).unwrap_or(false);
        if !context_ok {
            self.pubkey_context = pubkeys.first().cloned();
            match &self.pubkey_context {
                Some(key) => log::info!("signing context now {}", key.address_or_pubkey()),
                None => log::warn!("no pubkey for {}, signing context cleared", network),
            }
        }

        log::info!(
            "asset context {} ({} pubkeys, {} balances)",
            caip,
            pubkeys.len(),
            balances.len()
        );
        self.asset_context = Some(AssetContext {
            caip,
            network_id: network,
            pubkeys,
            balances,
            balance_total,
            price_usd,
        });
        Ok(self.asset_context.as_ref())
    }

    pub fn asset_context(&self) -> Option<&AssetContext> {
        self.asset_context.as_ref()
    }

    pub fn set_pubkey_context(&mut self, pubkey: Option<PubkeyRecord>) {
        self.pubkey_context = pubkey;
    }

    pub fn pubkey_context(&self) -> Option<&PubkeyRecord> {
        self.pubkey_context.as_ref()
    }

    pub async fn build_tx(&self, request: &TransferRequest) -> Result<UnsignedTx> {
        self.manager
            .transfer(request, self.pubkeys.as_slice(), self.pubkey_context.as_ref())
            .await
    }

    /// Build a max send and report what it would move and cost.
    pub async fn estimate_max(&self, request: &TransferRequest) -> Result<TxSummary> {
        let mut request = request.clone();
        request.amount = SendAmount::Max;
        let tx = self.build_tx(&request).await?;
        summarize(&request.caip, &tx)
    }

    pub async fn build_staking_tx(&self, request: &StakingRequest) -> Result<UnsignedTx> {
        self.manager
            .build_staking(request, self.pubkeys.as_slice(), self.pubkey_context.as_ref())
            .await
    }

    pub async fn sign_tx(&self, caip: &Caip, tx: &UnsignedTx) -> Result<SignedTx> {
        self.manager.sign(caip, tx).await
    }

    pub async fn broadcast_tx(&self, caip: &Caip, signed: &SignedTx) -> Result<String> {
        self.manager.broadcast(&caip.network_id(), signed).await
    }

    /// Build, sign and broadcast in one call.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt> {
        let unsigned_tx = self.build_tx(request).await?;
        let signed_tx = self.sign_tx(&request.caip, &unsigned_tx).await?;
        let txid = self.broadcast_tx(&request.caip, &signed_tx).await?;
        log::info!("transfer of {} sent: {}", request.caip, txid);
        Ok(TransferReceipt {
            caip: request.caip.clone(),
            txid,
            unsigned_tx,
            signed_tx,
        })
    }

    pub async fn follow_transaction(&self, caip: &Caip, txid: &str) -> ConfirmationReport {
        follow_transaction(self.manager.provider().as_ref(), self.manager.config(), caip, txid).await
    }
}
