//! Staking sign-docs for Cosmos Hub and Osmosis

use serde::{Deserialize, Serialize};

use crate::caip::Caip;
use crate::errors::{Result, TxError};
use crate::units::to_base_units;

use super::templates::{TemplateParams, TendermintChain, COSMOS_HUB, OSMOSIS};
use super::transaction::{
    Coin, CosmosMsg, MsgBeginRedelegate, MsgDelegate, MsgWithdrawDelegatorReward, SignDoc, StdFee,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StakingAction {
    Delegate {
        validator: String,
        /// Whole coins, e.g. `"1.5"`
        amount: String,
    },
    Undelegate {
        validator: String,
        amount: String,
    },
    Redelegate {
        validator_src: String,
        validator_dst: String,
        amount: String,
    },
    ClaimRewards {
        validator: String,
    },
    ClaimAllRewards {
        validators: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingRequest {
    pub caip: Caip,
    pub action: StakingAction,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Fixed staking fee for chains that support it.
pub fn staking_fee(chain: &TendermintChain) -> Result<StdFee> {
    if chain.name == COSMOS_HUB.name {
        Ok(StdFee::new(1_500_000, vec![Coin::new("uatom", 37_500)]))
    } else if chain.name == OSMOSIS.name {
        Ok(StdFee::new(1_000_000, vec![Coin::new("uosmo", 25_000)]))
    } else {
        Err(TxError::InvalidRequest(format!("staking is not supported on {}", chain.network)))
    }
}

fn require(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TxError::InvalidRequest(format!("{} is required", what)));
    }
    Ok(trimmed.to_string())
}

fn scaled(amount: &str, chain: &TendermintChain) -> Result<Coin> {
    let base = to_base_units(amount, chain.decimals)?;
    if base.is_zero() {
        return Err(TxError::InvalidRequest(format!("staking amount must be > 0, got {}", amount)));
    }
    Ok(Coin::new(chain.denom, base))
}

/// Messages for one staking action, signed by `delegator`.
pub fn staking_msgs(action: &StakingAction, delegator: &str, chain: &TendermintChain) -> Result<Vec<CosmosMsg>> {
    let delegator = delegator.to_string();
    let msgs = match action {
        StakingAction::Delegate { validator, amount } => vec![CosmosMsg::Delegate(MsgDelegate {
            delegator_address: delegator,
            validator_address: require(validator, "validator address")?,
            amount: scaled(amount, chain)?,
        })],
        StakingAction::Undelegate { validator, amount } => vec![CosmosMsg::Undelegate(MsgDelegate {
            delegator_address: delegator,
            validator_address: require(validator, "validator address")?,
            amount: scaled(amount, chain)?,
        })],
        StakingAction::Redelegate {
            validator_src,
            validator_dst,
            amount,
        } => vec![CosmosMsg::Redelegate(MsgBeginRedelegate {
            delegator_address: delegator,
            validator_src_address: require(validator_src, "source validator")?,
            validator_dst_address: require(validator_dst, "destination validator")?,
            amount: scaled(amount, chain)?,
        })],
        StakingAction::ClaimRewards { validator } => {
            vec![CosmosMsg::WithdrawDelegatorReward(MsgWithdrawDelegatorReward {
                delegator_address: delegator,
                validator_address: require(validator, "validator address")?,
            })]
        }
        StakingAction::ClaimAllRewards { validators } => {
            if validators.is_empty() {
                return Err(TxError::InvalidRequest("at least one validator is required".to_string()));
            }
            validators
                .iter()
                .map(|v| {
                    Ok(CosmosMsg::WithdrawDelegatorReward(MsgWithdrawDelegatorReward {
                        delegator_address: delegator.clone(),
                        validator_address: require(v, "validator address")?,
                    }))
                })
                .collect::<Result<Vec<_>>>()?
        }
    };
    Ok(msgs)
}

pub fn staking_doc(p: &TemplateParams, fee: StdFee, msgs: Vec<CosmosMsg>) -> SignDoc {
    SignDoc {
        account_number: p.account_number.clone(),
        chain_id: p.chain_id.clone(),
        fee,
        msgs,
        memo: p.memo.clone(),
        sequence: p.sequence.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::cosmos::templates::THORCHAIN;

    #[test]
    fn test_delegate_scales_amount() {
        let action = StakingAction::Delegate {
            validator: "cosmosvaloper1abc".into(),
            amount: "1.5".into(),
        };
        let msgs = staking_msgs(&action, "cosmos1me", &COSMOS_HUB).unwrap();
        match &msgs[0] {
            CosmosMsg::Delegate(m) => assert_eq!(m.amount, Coin::new("uatom", 1_500_000)),
            other => panic!("unexpected msg {:?}", other),
        }
    }

    #[test]
    fn test_claim_all_emits_one_msg_per_validator() {
        let action = StakingAction::ClaimAllRewards {
            validators: vec!["osmovaloper1a".into(), "osmovaloper1b".into()],
        };
        let msgs = staking_msgs(&action, "osmo1me", &OSMOSIS).unwrap();
        assert_eq!(msgs.len(), 2);
        assert!(msgs.iter().all(|m| m.type_url() == "cosmos-sdk/MsgWithdrawDelegatorReward"));

        let empty = StakingAction::ClaimAllRewards { validators: vec![] };
        assert!(staking_msgs(&empty, "osmo1me", &OSMOSIS).is_err());
    }

    #[test]
    fn test_fees_per_chain() {
        assert_eq!(staking_fee(&COSMOS_HUB).unwrap().gas, "1500000");
        assert_eq!(staking_fee(&OSMOSIS).unwrap().amount[0].amount, "25000");
        assert!(staking_fee(&THORCHAIN).is_err());
    }

    #[test]
    fn test_action_json() {
        let action: StakingAction =
            serde_json::from_str(r#"{"type":"claim_rewards","validator":"cosmosvaloper1x"}"#).unwrap();
        assert_eq!(
            action,
            StakingAction::ClaimRewards {
                validator: "cosmosvaloper1x".into()
            }
        );
    }
}
