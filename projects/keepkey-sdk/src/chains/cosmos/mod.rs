//! Cosmos-SDK (Tendermint) chain support
//!
//! Supports:
//! - Cosmos Hub
//! - Osmosis
//! - THORChain (send and deposit)
//! - MAYAChain (send and deposit)

pub mod staking;
pub mod templates;
pub mod transaction;

use std::str::FromStr;

use cosmrs::AccountId;
use ethereum_types::U256;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TxError};
use crate::provider::AccountInfo;
use crate::pubkey::{resolve_signing_key, PubkeyRecord};
use crate::request::TransferRequest;
use crate::units::{exact_base_units, to_base_units};

use self::staking::StakingRequest;
use self::templates::{TemplateParams, TendermintChain, MAYACHAIN};
pub use self::transaction::{CosmosMsg, CosmosUnsignedTx, SignDoc};
use super::BuildContext;

const HARDENED: u32 = 0x8000_0000;

/// Bank send or THORChain/MAYAChain deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CosmosMsgKind {
    Transfer,
    Deposit,
}

impl CosmosMsgKind {
    /// A destination means a transfer, no destination a deposit.
    pub fn infer(to: Option<&str>) -> Self {
        match to.map(str::trim) {
            Some(to) if !to.is_empty() => CosmosMsgKind::Transfer,
            _ => CosmosMsgKind::Deposit,
        }
    }
}

/// Bech32 account address with the chain's prefix.
pub fn validate_address(address: &str, hrp: &str) -> Result<()> {
    let account = AccountId::from_str(address.trim())
        .map_err(|e| TxError::InvalidRequest(format!("invalid address {:?}: {}", address, e)))?;
    if account.prefix() != hrp {
        return Err(TxError::InvalidRequest(format!(
            "address {} has prefix {:?}, expected {:?}",
            address,
            account.prefix(),
            hrp
        )));
    }
    Ok(())
}

fn signing_path(key: &PubkeyRecord, chain: &TendermintChain) -> Vec<u32> {
    key.best_address_n_list().unwrap_or_else(|| {
        log::warn!("no path info on {}, using account 0", key.address_or_pubkey());
        vec![HARDENED | 44, HARDENED | chain.slip44, HARDENED, 0, 0]
    })
}

async fn account_info(ctx: &BuildContext<'_>, chain: &TendermintChain, from: &str) -> Result<AccountInfo> {
    let info = ctx
        .provider
        .get_account_info(chain.name, from)
        .await
        .map_err(|e| TxError::provider("account info", e))?;
    log::debug!(
        "{} account {} sequence {}",
        chain.name,
        info.account_number,
        info.sequence
    );
    Ok(info)
}

fn fee_in_denom(chain: &TendermintChain, deposit: bool, denom: &str) -> U256 {
    templates::transfer_fee(chain, deposit)
        .amount
        .iter()
        .filter(|c| c.denom == denom)
        .filter_map(|c| U256::from_dec_str(&c.amount).ok())
        .fold(U256::zero(), |acc, v| acc.saturating_add(v))
}

pub async fn build_cosmos_tx(
    ctx: &BuildContext<'_>,
    request: &TransferRequest,
    kind: Option<CosmosMsgKind>,
) -> Result<CosmosUnsignedTx> {
    let caip = &request.caip;
    let network = caip.network_id();
    let chain = templates::chain_for(&network)?;
    let key = resolve_signing_key(ctx.signer_context, ctx.pubkeys, &network)?;
    let from = key.address_or_pubkey().to_string();
    let kind = kind.unwrap_or_else(|| CosmosMsgKind::infer(request.to.as_deref()));
    let asset = templates::asset_denom(caip, chain);

    let is_deposit = kind == CosmosMsgKind::Deposit;
    if is_deposit && chain.deposit_asset.is_none() {
        return Err(TxError::InvalidRequest(format!(
            "{} has no deposit message; a destination address is required",
            chain.chain_id
        )));
    }
    let to = if is_deposit {
        None
    } else {
        let to = request.require_to()?;
        validate_address(to, chain.hrp)?;
        Some(to.to_string())
    };

    let amount = if request.is_max() {
        let balance = ctx
            .provider
            .get_balance(&network, &from)
            .await
            .map_err(|e| TxError::provider("balance", e))?;
        let balance = to_base_units(&balance, asset.decimals)
            .map_err(|_| TxError::ProviderUnavailable(format!("malformed balance {:?}", balance)))?;
        let fee = fee_in_denom(chain, is_deposit, &asset.denom);
        if balance <= fee {
            return Err(TxError::insufficient(fee, balance, format!("{} max send", asset.denom)));
        }
        balance - fee
    } else {
        exact_base_units(request.require_amount()?, asset.decimals)?
    };

    let info = account_info(ctx, chain, &from).await?;
    let params = TemplateParams {
        account_number: info.account_number.to_string(),
        chain_id: chain.chain_id.to_string(),
        from_address: from.clone(),
        denom: asset.denom.clone(),
        amount: amount.to_string(),
        memo: request.memo_trimmed().unwrap_or_default().to_string(),
        sequence: info.sequence.to_string(),
    };

    let sign_doc = match (chain.name, to.as_deref()) {
        ("cosmos", Some(to)) => templates::cosmos_transfer(&params, to),
        ("osmosis", Some(to)) => templates::osmosis_transfer(&params, to),
        ("thorchain", Some(to)) => templates::thorchain_transfer(&params, to),
        ("thorchain", None) => templates::thorchain_deposit(&params),
        ("mayachain", Some(to)) => templates::mayachain_transfer(&params, to),
        ("mayachain", None) => {
            let deposit_asset = asset
                .deposit_asset
                .as_deref()
                .or(MAYACHAIN.deposit_asset)
                .unwrap_or("MAYA.CACAO");
            templates::mayachain_deposit(&params, deposit_asset)
        }
        (name, _) => {
            return Err(TxError::UnsupportedAsset(format!("no {:?} template for {}", kind, name)));
        }
    };

    log::info!(
        "{} {:?} of {} {} from {}",
        chain.chain_id,
        kind,
        params.amount,
        params.denom,
        from
    );

    Ok(CosmosUnsignedTx {
        signer_address: from,
        address_n_list: signing_path(key, chain),
        sign_doc,
    })
}

/// Delegate, undelegate, redelegate or claim rewards on Cosmos Hub / Osmosis.
pub async fn build_staking_tx(ctx: &BuildContext<'_>, request: &StakingRequest) -> Result<CosmosUnsignedTx> {
    let network = request.caip.network_id();
    let chain = templates::chain_for(&network)?;
    let fee = staking::staking_fee(chain)?;
    let key = resolve_signing_key(ctx.signer_context, ctx.pubkeys, &network)?;
    let from = key.address_or_pubkey().to_string();

    let msgs = staking::staking_msgs(&request.action, &from, chain)?;
    let info = account_info(ctx, chain, &from).await?;
    let params = TemplateParams {
        account_number: info.account_number.to_string(),
        chain_id: chain.chain_id.to_string(),
        from_address: from.clone(),
        denom: chain.denom.to_string(),
        amount: String::new(),
        memo: request
            .memo
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        sequence: info.sequence.to_string(),
    };

    log::info!("{} staking, {} msgs", chain.chain_id, msgs.len());
    Ok(CosmosUnsignedTx {
        signer_address: from,
        address_n_list: signing_path(key, chain),
        sign_doc: staking::staking_doc(&params, fee, msgs),
    })
}

/// Whether `msg` may be signed for a tx on `chain`. Unlisted pairs fail closed.
pub fn msg_allowed(chain: &TendermintChain, msg: &CosmosMsg) -> bool {
    match chain.name {
        "cosmos" | "osmosis" => matches!(
            msg,
            CosmosMsg::Send(_)
                | CosmosMsg::Delegate(_)
                | CosmosMsg::Undelegate(_)
                | CosmosMsg::Redelegate(_)
                | CosmosMsg::WithdrawDelegatorReward(_)
        ),
        "thorchain" => matches!(msg, CosmosMsg::ThorchainSend(_) | CosmosMsg::ThorchainDeposit(_)),
        "mayachain" => matches!(msg, CosmosMsg::MayachainSend(_) | CosmosMsg::MayachainDeposit(_)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::cosmos::templates::{COSMOS_HUB, OSMOSIS, THORCHAIN};
    use crate::chains::cosmos::transaction::{MsgDeposit, MsgSend};

    fn address(hrp: &str) -> String {
        AccountId::new(hrp, &[7u8; 20]).unwrap().to_string()
    }

    #[test]
    fn test_address_prefix_checked() {
        assert!(validate_address(&address("cosmos"), "cosmos").is_ok());
        assert!(validate_address(&address("osmo"), "cosmos").is_err());
        assert!(validate_address("cosmos1notbech32", "cosmos").is_err());
    }

    #[test]
    fn test_kind_inferred_from_destination() {
        assert_eq!(CosmosMsgKind::infer(Some("thor1abc")), CosmosMsgKind::Transfer);
        assert_eq!(CosmosMsgKind::infer(Some("  ")), CosmosMsgKind::Deposit);
        assert_eq!(CosmosMsgKind::infer(None), CosmosMsgKind::Deposit);
    }

    #[test]
    fn test_message_allow_list() {
        let send = CosmosMsg::Send(MsgSend {
            from_address: "a".into(),
            to_address: "b".into(),
            amount: vec![],
        });
        let deposit = CosmosMsg::ThorchainDeposit(MsgDeposit {
            coins: vec![],
            memo: String::new(),
            signer: "a".into(),
        });
        assert!(msg_allowed(&COSMOS_HUB, &send));
        assert!(msg_allowed(&THORCHAIN, &deposit));
        assert!(!msg_allowed(&OSMOSIS, &deposit));
        assert!(!msg_allowed(&THORCHAIN, &send));
    }

    #[test]
    fn test_fee_in_denom() {
        assert_eq!(fee_in_denom(&COSMOS_HUB, false, "uatom"), U256::from(5_000u64));
        assert_eq!(fee_in_denom(&THORCHAIN, false, "rune"), U256::zero());
    }
}
