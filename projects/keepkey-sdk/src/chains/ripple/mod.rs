//! Ripple (XRP) support

use ethereum_types::U256;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TxError};
use crate::pubkey::{address_n_list_to_bip32, resolve_signing_key};
use crate::request::TransferRequest;
use crate::units::exact_base_units;

use super::cosmos::transaction::{Coin, StdFee};
use super::BuildContext;

const DROPS_DECIMALS: u32 = 6;
const FEE_DROPS: u64 = 1_000;
const GAS: u64 = 28_000;
/// 1 XRP account reserve
const RESERVE_DROPS: u64 = 1_000_000;

/// m/44'/144'/0'/0/0 for every account.
// TODO: confirm with the device team whether the path should come from the matched pubkey
pub const RIPPLE_ADDRESS_N_LIST: [u32; 5] = [0x8000_002c, 0x8000_0090, 0x8000_0000, 0, 0];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RippleMsgValue {
    pub amount: Vec<Coin>,
    pub from_address: String,
    pub to_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RippleMsg {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(rename = "DestinationTag")]
    pub destination_tag: String,
    pub value: RippleMsgValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RippleTxValue {
    pub fee: StdFee,
    pub memo: String,
    pub msg: Vec<RippleMsg>,
    pub signatures: Option<Vec<String>>,
}

/// Legacy `auth/StdTx` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RippleStdTx {
    #[serde(rename = "type")]
    pub tx_type: String,
    pub value: RippleTxValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RipplePayment {
    /// Drops
    pub amount: String,
    pub destination: String,
    pub destination_tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RippleUnsignedTx {
    #[serde(rename = "addressNList")]
    pub address_n_list: Vec<u32>,
    pub tx: RippleStdTx,
    pub last_ledger_sequence: String,
    pub sequence: String,
    pub payment: RipplePayment,
}

/// Numeric memos are destination tags; anything else (or nothing) is `"0"`.
pub fn destination_tag(memo: Option<&str>) -> String {
    match memo.map(str::trim) {
        Some(tag) if !tag.is_empty() && tag.parse::<u32>().is_ok() => tag.to_string(),
        _ => "0".to_string(),
    }
}

pub async fn build_ripple_tx(ctx: &BuildContext<'_>, request: &TransferRequest) -> Result<RippleUnsignedTx> {
    let network = request.caip.network_id();
    let key = resolve_signing_key(ctx.signer_context, ctx.pubkeys, &network)?;
    let from = key.address_or_pubkey().to_string();
    let to = request.require_to()?.to_string();

    let info = ctx
        .provider
        .get_account_info("ripple", &from)
        .await
        .map_err(|e| TxError::provider("ripple account info", e))?;
    let ledger = info.ledger_index_current.ok_or_else(|| {
        TxError::ProviderUnavailable(format!("account info for {} has no current ledger index", from))
    })?;

    let amount = if request.is_max() {
        let balance = info
            .balance
            .as_deref()
            .and_then(|b| U256::from_dec_str(b.trim()).ok())
            .ok_or_else(|| TxError::ProviderUnavailable(format!("account info for {} has no balance", from)))?;
        let reserve = U256::from(RESERVE_DROPS + 1);
        if balance <= reserve {
            return Err(TxError::insufficient(reserve, balance, "XRP reserve"));
        }
        balance - reserve
    } else {
        exact_base_units(request.require_amount()?, DROPS_DECIMALS)?
    };
    let amount = amount.to_string();

    let memo = request.memo_trimmed();
    let tag = destination_tag(memo);
    let last_ledger_sequence = ledger.checked_add(ctx.config.ripple_ledger_horizon).ok_or_else(|| {
        TxError::ProviderUnavailable(format!("ledger index {} overflows the ledger horizon", ledger))
    })?;

    log::warn!(
        "signing with fixed path {} regardless of matched key",
        address_n_list_to_bip32(&RIPPLE_ADDRESS_N_LIST)
    );

    let tx = RippleStdTx {
        tx_type: "auth/StdTx".to_string(),
        value: RippleTxValue {
            fee: StdFee::new(GAS, vec![Coin::new("drop", FEE_DROPS)]),
            memo: memo.unwrap_or_default().to_string(),
            msg: vec![RippleMsg {
                msg_type: "ripple-sdk/MsgSend".to_string(),
                destination_tag: tag.clone(),
                value: RippleMsgValue {
                    amount: vec![Coin::new("drop", &amount)],
                    from_address: from.clone(),
                    to_address: to.clone(),
                },
            }],
            signatures: None,
        },
    };

    log::info!("{} drops {} -> {} tag {}", amount, from, to, tag);

    Ok(RippleUnsignedTx {
        address_n_list: RIPPLE_ADDRESS_N_LIST.to_vec(),
        tx,
        last_ledger_sequence: last_ledger_sequence.to_string(),
        sequence: info.sequence.to_string(),
        payment: RipplePayment {
            amount,
            destination: to,
            destination_tag: tag,
        },
    })
}
