//! Hardware signer capability

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chains::bitcoin::transaction::{UtxoInput, UtxoOutput};
use crate::chains::cosmos::transaction::CosmosUnsignedTx;
use crate::chains::ethereum::transaction::EvmUnsignedTx;
use crate::chains::ripple::RippleUnsignedTx;

/// Chain wire-format bytes, hex encoded. Passed unmodified to broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTx {
    pub serialized_tx: String,
}

impl SignedTx {
    pub fn new(serialized_tx: impl Into<String>) -> Self {
        Self {
            serialized_tx: serialized_tx.into(),
        }
    }
}

/// Payload for the device's UTXO signing flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoSignRequest {
    /// Device coin name (`Bitcoin`, `Litecoin`, ...)
    pub coin: String,
    pub inputs: Vec<UtxoInput>,
    pub outputs: Vec<UtxoOutput>,
    pub version: u32,
    pub locktime: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_return_data: Option<String>,
}

#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign_utxo(&self, request: &UtxoSignRequest) -> Result<SignedTx>;

    async fn sign_cosmos_amino(&self, tx: &CosmosUnsignedTx) -> Result<SignedTx>;

    async fn sign_evm(&self, tx: &EvmUnsignedTx) -> Result<SignedTx>;

    async fn sign_ripple(&self, tx: &RippleUnsignedTx) -> Result<SignedTx>;
}
