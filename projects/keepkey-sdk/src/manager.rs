//! Transaction manager
//!
//! Thin dispatcher over the chain builders, the signer and the provider's
//! broadcast call. A transfer moves `Built -> Signed -> Broadcast`; every
//! transition is one call that either advances or returns an error, and
//! nothing is retried here.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::caip::{classify, evm_chain_id, utxo_coin_name, Caip, ChainFamily, NetworkId};
use crate::chains::bitcoin::build_utxo_tx;
use crate::chains::cosmos::staking::StakingRequest;
use crate::chains::cosmos::templates::chain_for;
use crate::chains::cosmos::{build_cosmos_tx, build_staking_tx, msg_allowed, CosmosUnsignedTx};
use crate::chains::ethereum::build_evm_tx;
use crate::chains::ripple::build_ripple_tx;
use crate::chains::BuildContext;
use crate::config::SdkConfig;
use crate::errors::{Result, TxError};
use crate::provider::ChainDataProvider;
use crate::pubkey::PubkeyRecord;
use crate::request::TransferRequest;
use crate::signer::{SignedTx, Signer, UtxoSignRequest};
use crate::tx::UnsignedTx;

const UTXO_TX_VERSION: u32 = 1;
const UTXO_LOCKTIME: u32 = 0;

/// One lock per CAIP so overlapping builds for an asset cannot race on
/// nonces, sequences or UTXOs.
type BuildLocks = Arc<Mutex<HashMap<Caip, Arc<Mutex<()>>>>>;

pub struct TransactionManager {
    provider: Arc<dyn ChainDataProvider>,
    signer: Arc<dyn Signer>,
    config: SdkConfig,
    build_locks: BuildLocks,
}

impl TransactionManager {
    pub fn new(provider: Arc<dyn ChainDataProvider>, signer: Arc<dyn Signer>, config: SdkConfig) -> Self {
        Self {
            provider,
            signer,
            config,
            build_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn provider(&self) -> &Arc<dyn ChainDataProvider> {
        &self.provider
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    async fn build_lock(&self, caip: &Caip) -> Arc<Mutex<()>> {
        let mut locks = self.build_locks.lock().await;
        locks.entry(caip.clone()).or_default().clone()
    }

    /// Classify the asset and build an unsigned transaction for it.
    #[tracing::instrument(level = "debug", skip_all, fields(caip = %request.caip))]
    pub async fn transfer(
        &self,
        request: &TransferRequest,
        pubkeys: &[PubkeyRecord],
        signer_context: Option<&PubkeyRecord>,
    ) -> Result<UnsignedTx> {
        let family = classify(&request.caip)?;
        let lock = self.build_lock(&request.caip).await;
        let _guard = lock.lock().await;

        log::info!("building {} tx for {}", family, request.caip);
        let ctx = BuildContext::new(pubkeys, self.provider.as_ref(), &self.config).with_signer_context(signer_context);

        let tx = match family {
            ChainFamily::Utxo => UnsignedTx::Utxo(build_utxo_tx(&ctx, request).await?),
            ChainFamily::Eip155 => UnsignedTx::Eip155(build_evm_tx(&ctx, request).await?),
            ChainFamily::Tendermint => UnsignedTx::Tendermint(build_cosmos_tx(&ctx, request, None).await?),
            ChainFamily::Other => UnsignedTx::Ripple(build_ripple_tx(&ctx, request).await?),
        };
        Ok(tx)
    }

    /// Build a Cosmos Hub / Osmosis staking transaction.
    #[tracing::instrument(level = "debug", skip_all, fields(caip = %request.caip))]
    pub async fn build_staking(
        &self,
        request: &StakingRequest,
        pubkeys: &[PubkeyRecord],
        signer_context: Option<&PubkeyRecord>,
    ) -> Result<UnsignedTx> {
        let family = classify(&request.caip)?;
        if family != ChainFamily::Tendermint {
            return Err(TxError::InvalidRequest(format!(
                "staking is only available on Tendermint chains, {} is {}",
                request.caip, family
            )));
        }
        let lock = self.build_lock(&request.caip).await;
        let _guard = lock.lock().await;

        let ctx = BuildContext::new(pubkeys, self.provider.as_ref(), &self.config).with_signer_context(signer_context);
        Ok(UnsignedTx::Tendermint(build_staking_tx(&ctx, request).await?))
    }

    /// Sign `tx` for `caip`. The asset is re-classified and must agree with
    /// the transaction's family.
    #[tracing::instrument(level = "debug", skip_all, fields(caip = %caip))]
    pub async fn sign(&self, caip: &Caip, tx: &UnsignedTx) -> Result<SignedTx> {
        let family = classify(caip)?;
        if family != tx.family() {
            return Err(TxError::InvalidRequest(format!(
                "{} is a {} asset but the transaction is {}",
                caip,
                family,
                tx.family()
            )));
        }

        let signed = match tx {
            UnsignedTx::Utxo(utxo) => {
                let coin = utxo_coin_name(caip)
                    .ok_or_else(|| TxError::UnsupportedAsset(format!("no signer coin name for {}", caip)))?;
                let request = UtxoSignRequest {
                    coin: coin.to_string(),
                    inputs: utxo.inputs.clone(),
                    outputs: utxo.outputs.clone(),
                    version: UTXO_TX_VERSION,
                    locktime: UTXO_LOCKTIME,
                    op_return_data: utxo.memo.clone(),
                };
                log::info!(
                    "signing {} tx: {} inputs, {} outputs",
                    coin,
                    request.inputs.len(),
                    request.outputs.len()
                );
                self.signer.sign_utxo(&request).await
            }
            UnsignedTx::Eip155(evm) => {
                let expected = evm_chain_id(&caip.network_id())?;
                if evm.chain_id != expected {
                    return Err(TxError::InvalidRequest(format!(
                        "transaction chain id {} does not match {}",
                        evm.chain_id, caip
                    )));
                }
                self.signer.sign_evm(evm).await
            }
            UnsignedTx::Tendermint(cosmos) => {
                check_cosmos_msgs(&caip.network_id(), cosmos)?;
                self.signer.sign_cosmos_amino(cosmos).await
            }
            UnsignedTx::Ripple(ripple) => self.signer.sign_ripple(ripple).await,
        }
        .map_err(|e| TxError::SigningFailed(format!("{:#}", e)))?;

        if signed.serialized_tx.trim().is_empty() {
            return Err(TxError::SigningFailed("signer returned an empty transaction".to_string()));
        }
        Ok(signed)
    }

    /// Submit a signed transaction, returning its txid.
    #[tracing::instrument(level = "debug", skip_all, fields(network = %network))]
    pub async fn broadcast(&self, network: &NetworkId, signed: &SignedTx) -> Result<String> {
        if signed.serialized_tx.trim().is_empty() {
            return Err(TxError::InvalidRequest("nothing to broadcast".to_string()));
        }
        let result = self
            .provider
            .broadcast(network, signed)
            .await
            .map_err(|e| TxError::BroadcastFailed(format!("{:#}", e)))?;
        if result.txid.trim().is_empty() {
            return Err(TxError::BroadcastFailed(format!("{} returned no txid", network)));
        }
        log::info!("broadcast on {}: {}", network, result.txid);
        Ok(result.txid)
    }
}

/// Every message must be one this chain is allowed to sign, and the doc must
/// target the chain the asset lives on.
fn check_cosmos_msgs(network: &NetworkId, tx: &CosmosUnsignedTx) -> Result<()> {
    let chain = chain_for(network)?;
    if tx.sign_doc.chain_id != chain.chain_id {
        return Err(TxError::InvalidRequest(format!(
            "sign doc is for {}, asset is on {}",
            tx.sign_doc.chain_id, chain.chain_id
        )));
    }
    if tx.sign_doc.msgs.is_empty() {
        return Err(TxError::InvalidRequest("sign doc has no messages".to_string()));
    }
    match tx.sign_doc.msgs.iter().find(|m| !msg_allowed(chain, m)) {
        Some(msg) => Err(TxError::UnsupportedMessage {
            network: network.to_string(),
            msg_type: msg.type_url().to_string(),
        }),
        None => Ok(()),
    }
}
