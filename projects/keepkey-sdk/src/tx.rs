use serde::{Deserialize, Serialize};

use crate::caip::ChainFamily;
use crate::chains::bitcoin::transaction::UtxoUnsignedTx;
use crate::chains::cosmos::transaction::CosmosUnsignedTx;
use crate::chains::ethereum::transaction::EvmUnsignedTx;
use crate::chains::ripple::RippleUnsignedTx;

/// Output of exactly one builder call, consumed by exactly one signer call.
/// Holds no references to session or provider state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "tx", rename_all = "UPPERCASE")]
pub enum UnsignedTx {
    Utxo(UtxoUnsignedTx),
    Eip155(EvmUnsignedTx),
    Tendermint(CosmosUnsignedTx),
    /// Ripple is the only member of the OTHER family
    #[serde(rename = "OTHER")]
    Ripple(RippleUnsignedTx),
}

impl UnsignedTx {
    pub fn family(&self) -> ChainFamily {
        match self {
            UnsignedTx::Utxo(_) => ChainFamily::Utxo,
            UnsignedTx::Eip155(_) => ChainFamily::Eip155,
            UnsignedTx::Tendermint(_) => ChainFamily::Tendermint,
            UnsignedTx::Ripple(_) => ChainFamily::Other,
        }
    }
}
