//! Per-chain sign-doc templates and the Tendermint chain table
//!
//! Templates are pure data assembly: no lookups, no branching beyond their
//! own message shape.

use crate::caip::{Caip, NetworkId};
use crate::errors::{Result, TxError};

use super::transaction::{Coin, CosmosMsg, DepositCoin, MsgDeposit, MsgSend, SignDoc, StdFee};

/// Static parameters of one supported Tendermint chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TendermintChain {
    pub network: &'static str,
    /// Name the data provider keys account lookups by
    pub name: &'static str,
    pub chain_id: &'static str,
    pub denom: &'static str,
    pub decimals: u32,
    /// Bech32 prefix of account addresses
    pub hrp: &'static str,
    pub slip44: u32,
    /// Asset notation used in deposit messages
    pub deposit_asset: Option<&'static str>,
}

pub const COSMOS_HUB: TendermintChain = TendermintChain {
    network: "cosmos:cosmoshub-4",
    name: "cosmos",
    chain_id: "cosmoshub-4",
    denom: "uatom",
    decimals: 6,
    hrp: "cosmos",
    slip44: 118,
    deposit_asset: None,
};

pub const OSMOSIS: TendermintChain = TendermintChain {
    network: "cosmos:osmosis-1",
    name: "osmosis",
    chain_id: "osmosis-1",
    denom: "uosmo",
    decimals: 6,
    hrp: "osmo",
    slip44: 118,
    deposit_asset: None,
};

pub const THORCHAIN: TendermintChain = TendermintChain {
    network: "cosmos:thorchain-mainnet-v1",
    name: "thorchain",
    chain_id: "thorchain-mainnet-v1",
    denom: "rune",
    decimals: 8,
    hrp: "thor",
    slip44: 931,
    deposit_asset: Some("THOR.RUNE"),
};

pub const MAYACHAIN: TendermintChain = TendermintChain {
    network: "cosmos:mayachain-mainnet-v1",
    name: "mayachain",
    chain_id: "mayachain-mainnet-v1",
    denom: "cacao",
    decimals: 10,
    hrp: "maya",
    slip44: 931,
    deposit_asset: Some("MAYA.CACAO"),
};

const CHAINS: &[TendermintChain] = &[COSMOS_HUB, OSMOSIS, THORCHAIN, MAYACHAIN];

/// Exact lookup; unknown networks have no fallback.
pub fn chain_for(network: &NetworkId) -> Result<&'static TendermintChain> {
    CHAINS
        .iter()
        .find(|c| network == c.network)
        .ok_or_else(|| TxError::UnsupportedAsset(format!("no Tendermint template for {}", network)))
}

/// Denom, decimals and deposit notation of the asset being moved. Differs
/// from the chain's own only for secondary assets like `denom:maya`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDenom {
    pub denom: String,
    pub decimals: u32,
    pub deposit_asset: Option<String>,
}

pub fn asset_denom(caip: &Caip, chain: &TendermintChain) -> AssetDenom {
    if chain.name == MAYACHAIN.name && caip.asset_namespace() == "denom" && caip.asset_reference() == "maya" {
        return AssetDenom {
            denom: "maya".to_string(),
            decimals: 4,
            deposit_asset: Some("MAYA.MAYA".to_string()),
        };
    }
    AssetDenom {
        denom: chain.denom.to_string(),
        decimals: chain.decimals,
        deposit_asset: chain.deposit_asset.map(str::to_string),
    }
}

/// Inputs shared by every template.
#[derive(Debug, Clone)]
pub struct TemplateParams {
    pub account_number: String,
    pub chain_id: String,
    pub from_address: String,
    pub denom: String,
    /// Base units
    pub amount: String,
    pub memo: String,
    pub sequence: String,
}

fn envelope(p: &TemplateParams, fee: StdFee, msgs: Vec<CosmosMsg>) -> SignDoc {
    SignDoc {
        account_number: p.account_number.clone(),
        chain_id: p.chain_id.clone(),
        fee,
        msgs,
        memo: p.memo.clone(),
        sequence: p.sequence.clone(),
    }
}

fn bank_send(p: &TemplateParams, to: &str) -> MsgSend {
    MsgSend {
        from_address: p.from_address.clone(),
        to_address: to.to_string(),
        amount: vec![Coin::new(p.denom.clone(), &p.amount)],
    }
}

fn deposit(p: &TemplateParams, asset: &str) -> MsgDeposit {
    MsgDeposit {
        coins: vec![DepositCoin {
            asset: asset.to_string(),
            amount: p.amount.clone(),
        }],
        memo: p.memo.clone(),
        signer: p.from_address.clone(),
    }
}

/// Fixed fee a transfer or deposit pays on `chain`.
pub fn transfer_fee(chain: &TendermintChain, is_deposit: bool) -> StdFee {
    match chain.name {
        "cosmos" => StdFee::new(200_000, vec![Coin::new("uatom", 5_000)]),
        "osmosis" => StdFee::new(300_000, vec![Coin::new("uosmo", 35_000)]),
        _ if is_deposit => StdFee::new(500_000_000, vec![Coin::new(chain.denom, 0)]),
        _ => StdFee::new(500_000_000, vec![]),
    }
}

pub fn cosmos_transfer(p: &TemplateParams, to: &str) -> SignDoc {
    let fee = transfer_fee(&COSMOS_HUB, false);
    envelope(p, fee, vec![CosmosMsg::Send(bank_send(p, to))])
}

pub fn osmosis_transfer(p: &TemplateParams, to: &str) -> SignDoc {
    let fee = transfer_fee(&OSMOSIS, false);
    envelope(p, fee, vec![CosmosMsg::Send(bank_send(p, to))])
}

pub fn thorchain_transfer(p: &TemplateParams, to: &str) -> SignDoc {
    let fee = transfer_fee(&THORCHAIN, false);
    envelope(p, fee, vec![CosmosMsg::ThorchainSend(bank_send(p, to))])
}

pub fn thorchain_deposit(p: &TemplateParams) -> SignDoc {
    let fee = transfer_fee(&THORCHAIN, true);
    envelope(p, fee, vec![CosmosMsg::ThorchainDeposit(deposit(p, "THOR.RUNE"))])
}

pub fn mayachain_transfer(p: &TemplateParams, to: &str) -> SignDoc {
    let fee = transfer_fee(&MAYACHAIN, false);
    envelope(p, fee, vec![CosmosMsg::MayachainSend(bank_send(p, to))])
}

pub fn mayachain_deposit(p: &TemplateParams, asset: &str) -> SignDoc {
    let fee = transfer_fee(&MAYACHAIN, true);
    envelope(p, fee, vec![CosmosMsg::MayachainDeposit(deposit(p, asset))])
}
