//! Amino sign-doc shapes for Cosmos-SDK chains

use serde::{Deserialize, Serialize};

/// Bank coin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl ToString) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }
}

/// THORChain/MAYAChain deposit coin, keyed by asset notation (`THOR.RUNE`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositCoin {
    pub asset: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

impl StdFee {
    pub fn new(gas: impl ToString, amount: Vec<Coin>) -> Self {
        Self {
            amount,
            gas: gas.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    pub from_address: String,
    pub to_address: String,
    pub amount: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDeposit {
    pub coins: Vec<DepositCoin>,
    pub memo: String,
    pub signer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDelegate {
    pub delegator_address: String,
    pub validator_address: String,
    pub amount: Coin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBeginRedelegate {
    pub delegator_address: String,
    pub validator_src_address: String,
    pub validator_dst_address: String,
    pub amount: Coin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgWithdrawDelegatorReward {
    pub delegator_address: String,
    pub validator_address: String,
}

/// Amino-typed message, serialised as `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CosmosMsg {
    #[serde(rename = "cosmos-sdk/MsgSend")]
    Send(MsgSend),
    #[serde(rename = "thorchain/MsgSend")]
    ThorchainSend(MsgSend),
    #[serde(rename = "thorchain/MsgDeposit")]
    ThorchainDeposit(MsgDeposit),
    #[serde(rename = "mayachain/MsgSend")]
    MayachainSend(MsgSend),
    #[serde(rename = "mayachain/MsgDeposit")]
    MayachainDeposit(MsgDeposit),
    #[serde(rename = "cosmos-sdk/MsgDelegate")]
    Delegate(MsgDelegate),
    #[serde(rename = "cosmos-sdk/MsgUndelegate")]
    Undelegate(MsgDelegate),
    #[serde(rename = "cosmos-sdk/MsgBeginRedelegate")]
    Redelegate(MsgBeginRedelegate),
    #[serde(rename = "cosmos-sdk/MsgWithdrawDelegatorReward")]
    WithdrawDelegatorReward(MsgWithdrawDelegatorReward),
}

impl CosmosMsg {
    /// Amino type string
    pub fn type_url(&self) -> &'static str {
        match self {
            CosmosMsg::Send(_) => "cosmos-sdk/MsgSend",
            CosmosMsg::ThorchainSend(_) => "thorchain/MsgSend",
            CosmosMsg::ThorchainDeposit(_) => "thorchain/MsgDeposit",
            CosmosMsg::MayachainSend(_) => "mayachain/MsgSend",
            CosmosMsg::MayachainDeposit(_) => "mayachain/MsgDeposit",
            CosmosMsg::Delegate(_) => "cosmos-sdk/MsgDelegate",
            CosmosMsg::Undelegate(_) => "cosmos-sdk/MsgUndelegate",
            CosmosMsg::Redelegate(_) => "cosmos-sdk/MsgBeginRedelegate",
            CosmosMsg::WithdrawDelegatorReward(_) => "cosmos-sdk/MsgWithdrawDelegatorReward",
        }
    }
}

/// Account number and sequence travel as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignDoc {
    pub account_number: String,
    pub chain_id: String,
    pub fee: StdFee,
    pub msgs: Vec<CosmosMsg>,
    pub memo: String,
    pub sequence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmosUnsignedTx {
    pub signer_address: String,
    #[serde(rename = "addressNList")]
    pub address_n_list: Vec<u32>,
    pub sign_doc: SignDoc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_amino_shape() {
        let msg = CosmosMsg::ThorchainDeposit(MsgDeposit {
            coins: vec![DepositCoin {
                asset: "THOR.RUNE".into(),
                amount: "100000000".into(),
            }],
            memo: "=:BTC.BTC:bc1q".into(),
            signer: "thor1abc".into(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "thorchain/MsgDeposit");
        assert_eq!(json["value"]["coins"][0]["asset"], "THOR.RUNE");
        assert_eq!(msg.type_url(), "thorchain/MsgDeposit");

        let back: CosmosMsg = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
