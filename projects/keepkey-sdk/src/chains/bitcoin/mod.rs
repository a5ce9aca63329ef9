//! UTXO chain support (Bitcoin, Bitcoin Cash, Dash, Dogecoin, Litecoin)
//!
//! Builds an unsigned UTXO transaction: pick a change key, derive the next
//! change path, gather UTXOs across every matching key, select coins at the
//! provider's fee rate and emit signer-ready inputs and outputs.

pub mod coinselect;
pub mod fees;
pub mod transaction;

use std::collections::HashSet;

use futures::future::try_join_all;

use crate::caip::{utxo_chain_symbol, Caip};
use crate::errors::{Result, TxError};
use crate::provider::Utxo;
use crate::pubkey::{address_n_list_to_bip32, bip32_to_address_n_list, PubkeyRecord, ScriptType};
use crate::request::TransferRequest;
use crate::units::exact_sats;

use self::coinselect::{SelectedOutput, Selection, SelectionParams};
use self::transaction::{ChangeOutput, SpendOutput, UtxoInput, UtxoOutput, UtxoUnsignedTx};
use super::BuildContext;

pub use self::fees::{correct_unit, normalize, select_fee_rate, FeeTier};

/// All supported UTXO coins use 8 decimal places.
const UTXO_DECIMALS: u32 = 8;
const HARDENED: u32 = 0x8000_0000;

/// Pick the change key: explicit override, else a native segwit key, else the
/// first match.
fn select_change_key<'a>(
    matches: &[&'a PubkeyRecord],
    override_type: Option<ScriptType>,
) -> (&'a PubkeyRecord, ScriptType) {
    let first = matches[0];
    if let Some(script_type) = override_type {
        let key = matches
            .iter()
            .copied()
            .find(|k| k.effective_script_type() == script_type)
            .unwrap_or(first);
        return (key, script_type);
    }
    if let Some(key) = matches
        .iter()
        .copied()
        .find(|k| k.effective_script_type() == ScriptType::P2wpkh)
    {
        return (key, ScriptType::P2wpkh);
    }
    (first, first.effective_script_type())
}

/// `m/purpose'/coin'/account'/1/index`
fn change_path(caip: &Caip, key: &PubkeyRecord, script_type: ScriptType, index: u32) -> Result<Vec<u32>> {
    let coin = caip
        .slip44()
        .ok_or_else(|| TxError::UnsupportedAsset(format!("{} has no slip44 coin type", caip)))?;
    let account = key
        .account_path()
        .and_then(|p| p.get(2).copied())
        .unwrap_or(HARDENED);
    Ok(vec![
        HARDENED | script_type.bip_purpose(),
        HARDENED | coin,
        account,
        1,
        index,
    ])
}

/// Keep the first occurrence of each outpoint.
fn dedupe_outpoints(utxos: Vec<Utxo>) -> Vec<Utxo> {
    let mut seen = HashSet::new();
    utxos
        .into_iter()
        .filter(|u| seen.insert((u.txid.clone(), u.vout)))
        .collect()
}

fn materialize_input(utxo: &Utxo) -> Result<UtxoInput> {
    let path = utxo.path.as_deref().ok_or_else(|| {
        TxError::ProviderUnavailable(format!("utxo {}:{} has no derivation path", utxo.txid, utxo.vout))
    })?;
    Ok(UtxoInput {
        address_n_list: bip32_to_address_n_list(path)?,
        script_type: utxo.script_type.unwrap_or(ScriptType::P2pkh),
        amount: utxo.value,
        vout: utxo.vout,
        txid: utxo.txid.clone(),
        hex: utxo.hex.clone().unwrap_or_default(),
    })
}

pub async fn build_utxo_tx(ctx: &BuildContext<'_>, request: &TransferRequest) -> Result<UtxoUnsignedTx> {
    let caip = &request.caip;
    let network = caip.network_id();
    let chain = utxo_chain_symbol(&network).ok_or_else(|| TxError::UnsupportedAsset(caip.to_string()))?;
    let to = request.require_to()?;
    // validated before any network call
    FeeTier::try_from(request.fee_level)?;
    let amount = if request.is_max() {
        None
    } else {
        Some(exact_sats(request.require_amount()?, UTXO_DECIMALS)?)
    };

    let matches: Vec<&PubkeyRecord> = ctx.pubkeys.iter().filter(|k| k.matches(&network)).collect();
    if matches.is_empty() {
        return Err(TxError::MissingPubkey(network.to_string()));
    }

    // 1-2. change key and path
    let (change_key, change_type) = select_change_key(&matches, request.change_script_type);
    let change_index = ctx
        .provider
        .get_change_address_index(chain, &change_key.pubkey)
        .await
        .map_err(|e| TxError::provider("change address index", e))?;
    let change_path = change_path(caip, change_key, change_type, change_index)?;
    log::info!(
        "{} change {} ({})",
        chain,
        address_n_list_to_bip32(&change_path),
        change_type
    );

    // 3. UTXOs from every matching key, tagged with the owner's script type
    let fetches = matches.iter().map(|key| async move {
        let utxos = ctx.provider.list_unspent(chain, &key.pubkey).await?;
        let script_type = key.effective_script_type();
        Ok::<_, anyhow::Error>(
            utxos
                .into_iter()
                .map(|mut u| {
                    u.script_type = Some(script_type);
                    u
                })
                .collect::<Vec<_>>(),
        )
    });
    let utxos = try_join_all(fetches)
        .await
        .map_err(|e| TxError::provider("list unspent", e))?;
    let utxos = dedupe_outpoints(utxos.into_iter().flatten().collect());
    if utxos.is_empty() {
        return Err(TxError::CoinSelectionFailed(format!("no UTXOs found for {}", chain)));
    }
    let total = utxos.iter().fold(0u64, |acc, u| acc.saturating_add(u.value));
    log::debug!("{} utxos, {} sats total across {} keys", utxos.len(), total, matches.len());

    // 4. fee rate
    let fee_rates = ctx
        .provider
        .get_fee_rate(&network)
        .await
        .map_err(|e| TxError::provider("fee rate", e))?;
    let fee_rate = select_fee_rate(&fee_rates, request.fee_level, ctx.config)?;

    // 5. selection
    let memo = request.memo_trimmed().map(str::to_string);
    let params = SelectionParams {
        destination: to,
        fee_rate,
        change_script_type: change_type,
        memo_len: memo.as_ref().map(|m| m.len()),
    };
    let selection: Selection = match amount {
        None => coinselect::split(&utxos, &params).ok_or_else(|| {
            TxError::insufficient("more than the fee", total, format!("{} max send at {} sat/vB", chain, fee_rate))
        })?,
        Some(amount) if amount > total => {
            return Err(TxError::insufficient(amount, total, format!("{} UTXO total", chain)));
        }
        Some(amount) => match coinselect::select(&utxos, amount, &params) {
            Some(selection) => selection,
            None => {
                return Err(TxError::CoinSelectionFailed(format!(
                    "fees too high: {} sats cannot cover {} plus fee at {} sat/vB",
                    total, amount, fee_rate
                )));
            }
        },
    };

    // 6. signer-ready inputs/outputs
    let inputs = selection
        .inputs
        .iter()
        .map(materialize_input)
        .collect::<Result<Vec<_>>>()?;
    let outputs = selection
        .outputs
        .into_iter()
        .map(|o| match o {
            SelectedOutput::Destination { address, value } => UtxoOutput::Spend(SpendOutput { address, amount: value }),
            SelectedOutput::Change { value } => UtxoOutput::Change(ChangeOutput {
                address_n_list: change_path.clone(),
                script_type: change_type,
                amount: value,
                is_change: true,
            }),
        })
        .collect::<Vec<_>>();

    log::info!(
        "{} inputs, {} outputs, fee {} sats at {} sat/vB",
        inputs.len(),
        outputs.len(),
        selection.fee,
        fee_rate
    );

    Ok(UtxoUnsignedTx {
        inputs,
        outputs,
        memo,
        fee: selection.fee,
        fee_rate,
    })
}
