//! What an unsigned transaction moves, in one flat shape

use ethereum_types::{Address, U256};
use ethers_core::utils::format_units;
use serde::{Deserialize, Serialize};

use crate::caip::{Caip, ChainFamily};
use crate::chains::bitcoin::transaction::UtxoOutput;
use crate::chains::cosmos::templates::{asset_denom, chain_for};
use crate::chains::cosmos::CosmosMsg;
use crate::chains::ethereum::abi::TRANSFER_SELECTOR;
use crate::chains::ethereum::token_decimals;
use crate::errors::{Result, TxError};
use crate::tx::UnsignedTx;

const BTC_DECIMALS: u32 = 8;
const ETH_DECIMALS: u32 = 18;
const XRP_DECIMALS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxSummary {
    pub caip: Caip,
    pub family: ChainFamily,
    /// `None` for deposits and staking
    pub recipient: Option<String>,
    /// Whole units
    pub amount: String,
    pub amount_base: U256,
    /// Whole units of the fee asset
    pub fee: String,
    pub fee_base: U256,
    pub decimals: u32,
}

fn whole(value: U256, decimals: u32) -> Result<String> {
    format_units(value, decimals).map_err(|e| TxError::InvalidRequest(format!("cannot format {}: {}", value, e)))
}

fn parse_base(value: &str) -> Result<U256> {
    U256::from_dec_str(value).map_err(|e| TxError::InvalidRequest(format!("bad base amount {:?}: {}", value, e)))
}

/// Summarise `tx`, built for `caip`.
pub fn summarize(caip: &Caip, tx: &UnsignedTx) -> Result<TxSummary> {
    let (recipient, amount_base, fee_base, decimals, fee_decimals) = match tx {
        UnsignedTx::Utxo(utxo) => {
            let spend: Vec<_> = utxo
                .outputs
                .iter()
                .filter_map(|o| match o {
                    UtxoOutput::Spend(s) => Some(s),
                    _ => None,
                })
                .collect();
            let amount: u64 = spend.iter().map(|s| s.amount).sum();
            let recipient = spend.first().map(|s| s.address.clone());
            (recipient, U256::from(amount), U256::from(utxo.fee), BTC_DECIMALS, BTC_DECIMALS)
        }
        UnsignedTx::Eip155(evm) => {
            let data = evm.data_bytes();
            if data.len() >= 68 && data[..4] == TRANSFER_SELECTOR && evm.value.is_zero() {
                let recipient = Address::from_slice(&data[16..36]);
                let amount = U256::from_big_endian(&data[36..68]);
                let decimals = token_decimals(caip.asset_reference());
                (Some(format!("{:?}", recipient)), amount, evm.max_fee(), decimals, ETH_DECIMALS)
            } else {
                (Some(format!("{:?}", evm.to)), evm.value, evm.max_fee(), ETH_DECIMALS, ETH_DECIMALS)
            }
        }
        UnsignedTx::Tendermint(cosmos) => {
            let chain = chain_for(&caip.network_id())?;
            let asset = asset_denom(caip, chain);
            let msg = cosmos
                .sign_doc
                .msgs
                .first()
                .ok_or_else(|| TxError::InvalidRequest("sign doc has no messages".to_string()))?;
            let (recipient, amount) = match msg {
                CosmosMsg::Send(m) | CosmosMsg::ThorchainSend(m) | CosmosMsg::MayachainSend(m) => (
                    Some(m.to_address.clone()),
                    m.amount.first().map(|c| c.amount.as_str()).unwrap_or("0"),
                ),
                CosmosMsg::ThorchainDeposit(m) | CosmosMsg::MayachainDeposit(m) => {
                    (None, m.coins.first().map(|c| c.amount.as_str()).unwrap_or("0"))
                }
                CosmosMsg::Delegate(m) | CosmosMsg::Undelegate(m) => (None, m.amount.amount.as_str()),
                CosmosMsg::Redelegate(m) => (None, m.amount.amount.as_str()),
                CosmosMsg::WithdrawDelegatorReward(_) => (None, "0"),
            };
            let fee = cosmos
                .sign_doc
                .fee
                .amount
                .iter()
                .filter(|c| c.denom == chain.denom)
                .map(|c| parse_base(&c.amount))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .fold(U256::zero(), |acc, v| acc.saturating_add(v));
            (recipient, parse_base(amount)?, fee, asset.decimals, chain.decimals)
        }
        UnsignedTx::Ripple(ripple) => {
            let fee = ripple
                .tx
                .value
                .fee
                .amount
                .first()
                .map(|c| parse_base(&c.amount))
                .transpose()?
                .unwrap_or_default();
            (
                Some(ripple.payment.destination.clone()),
                parse_base(&ripple.payment.amount)?,
                fee,
                XRP_DECIMALS,
                XRP_DECIMALS,
            )
        }
    };

    Ok(TxSummary {
        caip: caip.clone(),
        family: tx.family(),
        recipient,
        amount: whole(amount_base, decimals)?,
        amount_base,
        fee: whole(fee_base, fee_decimals)?,
        fee_base,
        decimals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::bitcoin::transaction::{SpendOutput, UtxoUnsignedTx};
    use crate::chains::ethereum::abi::{encode_transfer, to_hex_data};
    use crate::chains::ethereum::EvmUnsignedTx;

    #[test]
    fn test_utxo_summary_counts_only_spend_outputs() {
        let tx = UnsignedTx::Utxo(UtxoUnsignedTx {
            inputs: vec![],
            outputs: vec![UtxoOutput::Spend(SpendOutput {
                address: "bc1qdest".into(),
                amount: 60_000,
            })],
            memo: None,
            fee: 1_672,
            fee_rate: 8,
        });
        let caip = Caip::parse("bip122:000000000019d6689c085ae165831e93/slip44:0").unwrap();
        let summary = summarize(&caip, &tx).unwrap();
        assert_eq!(summary.amount_base, U256::from(60_000u64));
        assert_eq!(summary.fee_base, U256::from(1_672u64));
        assert_eq!(summary.recipient.as_deref(), Some("bc1qdest"));
        assert!(summary.amount.starts_with("0.0006"));
    }

    #[test]
    fn test_token_summary_reads_call_data() {
        let to = Address::repeat_byte(0x11);
        let caip = Caip::parse("eip155:1/erc20:0xdac17f958d2ee523a2206206994597c13d831ec7").unwrap();
        let tx = UnsignedTx::Eip155(EvmUnsignedTx {
            chain_id: 1,
            nonce: U256::zero(),
            gas_limit: U256::from(100_000u64),
            gas_price: U256::from(10_000_000_000u64),
            to: Address::repeat_byte(0xda),
            value: U256::zero(),
            data: to_hex_data(&encode_transfer(to, U256::from(100_500_000u64))),
            address_n_list: vec![],
            gas_fee_usd: None,
            amount_usd: None,
        });
        let summary = summarize(&caip, &tx).unwrap();
        assert_eq!(summary.decimals, 6);
        assert_eq!(summary.amount_base, U256::from(100_500_000u64));
        assert_eq!(summary.recipient, Some(format!("{:?}", to)));
        assert_eq!(summary.fee_base, U256::from(1_000_000_000_000_000u64));
    }
}
