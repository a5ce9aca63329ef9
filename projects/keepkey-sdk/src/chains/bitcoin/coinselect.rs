//! Coin selection over virtual-size estimates
//!
//! `select` tries an exact-ish "blackjack" match (no change output) first and
//! falls back to accumulating largest-first. `split` spends every input to a
//! single destination. In every result `fee == inputs - outputs`.

use crate::provider::Utxo;
use crate::pubkey::ScriptType;

/// Version, locktime, input and output counts
const TX_OVERHEAD_VBYTES: u64 = 10;
/// Segwit marker and flag, rounded up
const SEGWIT_OVERHEAD_VBYTES: u64 = 1;
const DUST_THRESHOLD: u64 = 546;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedOutput {
    Destination { address: String, value: u64 },
    Change { value: u64 },
}

impl SelectedOutput {
    pub fn value(&self) -> u64 {
        match self {
            SelectedOutput::Destination { value, .. } | SelectedOutput::Change { value } => *value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub inputs: Vec<Utxo>,
    pub outputs: Vec<SelectedOutput>,
    pub fee: u64,
}

/// Fixed parameters of one selection run.
#[derive(Debug, Clone)]
pub struct SelectionParams<'a> {
    pub destination: &'a str,
    /// sat/vB
    pub fee_rate: u64,
    pub change_script_type: ScriptType,
    /// OP_RETURN payload length, if any
    pub memo_len: Option<usize>,
}

impl SelectionParams<'_> {
    fn extra_vbytes(&self) -> u64 {
        // value(8) + script len(1) + OP_RETURN(1) + push(1) + data
        self.memo_len.map(|len| 11 + len as u64).unwrap_or(0)
    }

    fn destination_vbytes(&self) -> u64 {
        output_vbytes_for_address(self.destination)
    }

    /// Change is only worth creating above the cost of later spending it.
    fn dust_threshold(&self) -> u64 {
        DUST_THRESHOLD.max(self.change_script_type.input_vbytes() * self.fee_rate)
    }
}

fn input_vbytes(utxo: &Utxo) -> u64 {
    utxo.script_type.unwrap_or(ScriptType::P2pkh).input_vbytes()
}

/// Output size from the address encoding.
pub fn output_vbytes_for_address(address: &str) -> u64 {
    let lower = address.to_ascii_lowercase();
    let bech32 = ["bc1", "ltc1", "tb1", "bcrt1"].iter().any(|hrp| lower.starts_with(hrp));
    if bech32 {
        // p2wpkh is 42-44 chars; p2wsh and taproot are longer
        if lower.len() <= 44 {
            ScriptType::P2wpkh.output_vbytes()
        } else {
            43
        }
    } else if address.starts_with('3') || address.starts_with('M') || address.starts_with('2') {
        ScriptType::P2shP2wpkh.output_vbytes()
    } else {
        ScriptType::P2pkh.output_vbytes()
    }
}

/// Total vsize for a set of inputs plus the given output sizes.
pub fn estimate_vbytes(inputs: &[Utxo], output_vbytes: &[u64], extra: u64) -> u64 {
    let segwit = inputs
        .iter()
        .any(|u| u.script_type.map(|s| s.is_segwit()).unwrap_or(false));
    let overhead = TX_OVERHEAD_VBYTES + if segwit { SEGWIT_OVERHEAD_VBYTES } else { 0 };
    overhead + inputs.iter().map(input_vbytes).sum::<u64>() + output_vbytes.iter().sum::<u64>() + extra
}

/// Largest first, ties broken by outpoint so results are reproducible.
pub fn sort_candidates(utxos: &mut [Utxo]) {
    utxos.sort_by(|a, b| {
        b.value
            .cmp(&a.value)
            .then_with(|| a.txid.cmp(&b.txid))
            .then_with(|| a.vout.cmp(&b.vout))
    });
}

/// Pick inputs covering `amount` plus fee. `None` when no combination works.
pub fn select(utxos: &[Utxo], amount: u64, params: &SelectionParams<'_>) -> Option<Selection> {
    let mut candidates = utxos.to_vec();
    sort_candidates(&mut candidates);

    blackjack(&candidates, amount, params).or_else(|| accumulative(&candidates, amount, params))
}

fn blackjack(candidates: &[Utxo], amount: u64, params: &SelectionParams<'_>) -> Option<Selection> {
    let outputs = [params.destination_vbytes()];
    let threshold = params.dust_threshold();
    let mut picked: Vec<Utxo> = Vec::new();
    let mut total = 0u64;

    for utxo in candidates {
        let mut trial = picked.clone();
        trial.push(utxo.clone());
        let fee = estimate_vbytes(&trial, &outputs, params.extra_vbytes()) * params.fee_rate;
        // overshooting by more than dust would waste it as fee
        if total + utxo.value > amount + fee + threshold {
            continue;
        }
        picked = trial;
        total += utxo.value;

        if total >= amount + fee {
            return Some(Selection {
                inputs: picked,
                outputs: vec![SelectedOutput::Destination {
                    address: params.destination.to_string(),
                    value: amount,
                }],
                fee: total - amount,
            });
        }
    }
    None
}

fn accumulative(candidates: &[Utxo], amount: u64, params: &SelectionParams<'_>) -> Option<Selection> {
    let no_change = [params.destination_vbytes()];
    let with_change = [params.destination_vbytes(), params.change_script_type.output_vbytes()];
    let mut picked: Vec<Utxo> = Vec::new();
    let mut total = 0u64;

    for utxo in candidates {
        picked.push(utxo.clone());
        total += utxo.value;

        let fee = estimate_vbytes(&picked, &no_change, params.extra_vbytes()) * params.fee_rate;
        if total < amount + fee {
            continue;
        }

        let fee_with_change =
            estimate_vbytes(&picked, &with_change, params.extra_vbytes()) * params.fee_rate;
        let destination = SelectedOutput::Destination {
            address: params.destination.to_string(),
            value: amount,
        };

        if total >= amount + fee_with_change {
            let change = total - amount - fee_with_change;
            if change > params.dust_threshold() {
                return Some(Selection {
                    inputs: picked,
                    outputs: vec![destination, SelectedOutput::Change { value: change }],
                    fee: fee_with_change,
                });
            }
        }

        return Some(Selection {
            inputs: picked,
            outputs: vec![destination],
            fee: total - amount,
        });
    }
    None
}

/// Spend everything to one output. `None` when the fee eats the whole balance
/// or leaves only dust.
pub fn split(utxos: &[Utxo], params: &SelectionParams<'_>) -> Option<Selection> {
    if utxos.is_empty() {
        return None;
    }
    let mut inputs = utxos.to_vec();
    sort_candidates(&mut inputs);

    let total: u64 = inputs.iter().map(|u| u.value).sum();
    let fee = estimate_vbytes(&inputs, &[params.destination_vbytes()], params.extra_vbytes())
        * params.fee_rate;
    let value = total.checked_sub(fee)?;
    if value <= DUST_THRESHOLD {
        return None;
    }

    Some(Selection {
        inputs,
        outputs: vec![SelectedOutput::Destination {
            address: params.destination.to_string(),
            value,
        }],
        fee,
    })
}
