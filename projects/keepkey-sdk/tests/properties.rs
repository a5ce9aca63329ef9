use proptest::prelude::*;

use keepkey_sdk::chains::bitcoin::coinselect::{select, split, SelectedOutput, SelectionParams};
use keepkey_sdk::chains::bitcoin::correct_unit;
use keepkey_sdk::provider::Utxo;
use keepkey_sdk::units::to_sats;
use keepkey_sdk::ScriptType;

const DEST: &str = "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh";

fn utxos(values: &[u64]) -> Vec<Utxo> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| Utxo {
            txid: format!("{:064x}", i),
            vout: i as u32,
            value: *value,
            address: None,
            path: Some("m/84'/0'/0'/0/0".to_string()),
            hex: None,
            script_type: Some(ScriptType::P2wpkh),
            confirmations: 1,
        })
        .collect()
}

fn params(fee_rate: u64) -> SelectionParams<'static> {
    SelectionParams {
        destination: DEST,
        fee_rate,
        change_script_type: ScriptType::P2wpkh,
        memo_len: None,
    }
}

proptest! {
    #[test]
    fn correct_unit_only_rescales_per_kb_rates(rate in 0.0f64..100_000.0) {
        let corrected = correct_unit(rate, 500.0);
        if rate > 500.0 {
            prop_assert!((corrected - rate / 1000.0).abs() < 1e-9);
        } else {
            prop_assert_eq!(corrected, rate);
        }
    }

    #[test]
    fn select_conserves_value(
        values in prop::collection::vec(1_000u64..2_000_000, 1..8),
        amount in 1_000u64..3_000_000,
        fee_rate in 1u64..200,
    ) {
        let set = utxos(&values);
        if let Some(selection) = select(&set, amount, &params(fee_rate)) {
            let inputs: u64 = selection.inputs.iter().map(|u| u.value).sum();
            let outputs: u64 = selection.outputs.iter().map(SelectedOutput::value).sum();
            prop_assert_eq!(inputs, outputs + selection.fee);
            prop_assert!(selection.fee > 0);
            prop_assert_eq!(selection.outputs[0].value(), amount);
            let changes = selection
                .outputs
                .iter()
                .filter(|o| matches!(o, SelectedOutput::Change { .. }))
                .count();
            prop_assert!(changes <= 1);
        }
    }

    #[test]
    fn split_spends_everything_to_one_output(
        values in prop::collection::vec(1_000u64..2_000_000, 1..8),
        fee_rate in 1u64..200,
    ) {
        let set = utxos(&values);
        if let Some(selection) = split(&set, &params(fee_rate)) {
            let total: u64 = values.iter().sum();
            prop_assert_eq!(selection.inputs.len(), values.len());
            prop_assert_eq!(selection.outputs.len(), 1);
            prop_assert_eq!(selection.outputs[0].value() + selection.fee, total);
        }
    }

    #[test]
    fn decimal_strings_scale_exactly(whole in 0u64..1_000_000_000, frac in 0u64..100_000_000, decimals in 0usize..9) {
        let frac = frac % 10u64.pow(decimals as u32);
        let amount = if decimals == 0 {
            whole.to_string()
        } else {
            format!("{}.{:0width$}", whole, frac, width = decimals)
        };
        let expected = whole * 10u64.pow(decimals as u32) + frac;
        prop_assert_eq!(to_sats(&amount, decimals as u32).unwrap(), expected);
    }
}
