//! Unsigned UTXO transaction shape handed to the signer

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::pubkey::ScriptType;

/// Transaction input
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoInput {
    /// Derivation path of the owning key
    #[serde(rename = "addressNList")]
    pub address_n_list: Vec<u32>,
    pub script_type: ScriptType,
    /// Satoshis
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u64,
    pub vout: u32,
    pub txid: String,
    /// Raw previous transaction; empty when the provider did not supply it
    #[serde(default)]
    pub hex: String,
}

/// Payment to an external address
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendOutput {
    pub address: String,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u64,
}

/// Change back to a wallet-derived path
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOutput {
    #[serde(rename = "addressNList")]
    pub address_n_list: Vec<u32>,
    pub script_type: ScriptType,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u64,
    pub is_change: bool,
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "addressType", rename_all = "lowercase")]
pub enum UtxoOutput {
    Spend(SpendOutput),
    Change(ChangeOutput),
}

impl UtxoOutput {
    pub fn amount(&self) -> u64 {
        match self {
            UtxoOutput::Spend(o) => o.amount,
            UtxoOutput::Change(o) => o.amount,
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, UtxoOutput::Change(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoUnsignedTx {
    pub inputs: Vec<UtxoInput>,
    pub outputs: Vec<UtxoOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Satoshis; always inputs minus outputs
    pub fee: u64,
    /// sat/vB used for selection
    pub fee_rate: u64,
}

impl UtxoUnsignedTx {
    pub fn input_total(&self) -> u64 {
        self.inputs.iter().map(|i| i.amount).sum()
    }

    pub fn output_total(&self) -> u64 {
        self.outputs.iter().map(UtxoOutput::amount).sum()
    }

    pub fn change(&self) -> Option<&ChangeOutput> {
        self.outputs.iter().find_map(|o| match o {
            UtxoOutput::Change(c) => Some(c),
            UtxoOutput::Spend(_) => None,
        })
    }
}
