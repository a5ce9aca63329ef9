use std::sync::Arc;

use cosmrs::AccountId;
use ethereum_types::U256;

use keepkey_sdk::chains::cosmos::staking::{StakingAction, StakingRequest};
use keepkey_sdk::chains::cosmos::CosmosMsg;
use keepkey_sdk::offline::{RecordingSigner, StaticProvider};
use keepkey_sdk::provider::{AccountInfo, BroadcastResult, FeeRates, InboundAddress, Utxo};
use keepkey_sdk::pubkey::address_n_list_to_bip32;
use keepkey_sdk::{
    Caip, KeepKeySdk, NetworkId, PubkeyRecord, ScriptType, SdkConfig, SendAmount, TransactionManager,
    TransferRequest, TxError, UnsignedTx,
};

const BTC: &str = "bip122:000000000019d6689c085ae165831e93/slip44:0";
const BTC_NET: &str = "bip122:000000000019d6689c085ae165831e93";
const ETH: &str = "eip155:1/slip44:60";
const USDT: &str = "eip155:1/erc20:0xdac17f958d2ee523a2206206994597c13d831ec7";
const ATOM: &str = "cosmos:cosmoshub-4/slip44:118";
const RUNE: &str = "cosmos:thorchain-mainnet-v1/slip44:931";
const CACAO: &str = "cosmos:mayachain-mainnet-v1/slip44:931";
const XRP: &str = "ripple:4109c6f2045fc7eff4cde8f9905d19c2/slip44:144";

const BTC_DEST: &str = "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh";
const ETH_FROM: &str = "0x1111111111111111111111111111111111111111";
const ETH_TO: &str = "0x2222222222222222222222222222222222222222";
const TC_VAULT: &str = "0x3333333333333333333333333333333333333333";
const TC_ROUTER: &str = "0x4444444444444444444444444444444444444444";

fn caip(s: &str) -> Caip {
    Caip::parse(s).unwrap()
}

fn bech32(hrp: &str, byte: u8) -> String {
    AccountId::new(hrp, &[byte; 20]).unwrap().to_string()
}

fn utxo(txid: &str, value: u64) -> Utxo {
    Utxo {
        txid: txid.to_string(),
        vout: 0,
        value,
        address: None,
        path: Some("m/84'/0'/0'/0/0".to_string()),
        hex: None,
        script_type: None,
        confirmations: 3,
    }
}

fn btc_key() -> PubkeyRecord {
    PubkeyRecord::new("zpub-test", vec![NetworkId::new(BTC_NET)])
        .with_path("m/84'/0'/0'")
        .with_script_type(ScriptType::P2wpkh)
}

fn eth_key() -> PubkeyRecord {
    PubkeyRecord::new("0xpub", vec![NetworkId::new("eip155:*")])
        .with_address(ETH_FROM)
        .with_path("m/44'/60'/0'/0/0")
}

fn btc_provider() -> StaticProvider {
    StaticProvider::new()
        .with_utxos(
            "zpub-test",
            vec![utxo("aa", 50_000), utxo("bb", 30_000), utxo("cc", 20_000)],
        )
        .with_fee_rates(
            BTC_NET,
            FeeRates {
                slow: Some(2.0),
                average: Some(4.0),
                fastest: Some(8.0),
                ..FeeRates::default()
            },
        )
        .with_change_index("zpub-test", 3)
}

fn eth_provider() -> StaticProvider {
    StaticProvider::new()
        .with_gas_price("eip155:1", 5_000_000_000)
        .with_nonce(ETH_FROM, 7)
        .with_balance(ETH_FROM, "1")
}

fn sdk_with(provider: StaticProvider, keys: Vec<PubkeyRecord>) -> (KeepKeySdk, Arc<RecordingSigner>) {
    let _ = env_logger::try_init();
    let signer = Arc::new(RecordingSigner::new());
    let mut sdk = KeepKeySdk::new(Arc::new(provider), signer.clone(), SdkConfig::default());
    sdk.load_pubkeys(keys);
    (sdk, signer)
}

#[tokio::test]
async fn utxo_send_selects_two_largest_with_change() {
    let provider = btc_provider().with_broadcast_result(BroadcastResult { txid: "btc-txid".into() });
    let (sdk, signer) = sdk_with(provider.clone(), vec![btc_key()]);

    let request = TransferRequest::new(caip(BTC), SendAmount::Exact("0.0006".into()))
        .to(BTC_DEST)
        .fee_level(5);
    let tx = match sdk.build_tx(&request).await.unwrap() {
        UnsignedTx::Utxo(tx) => tx,
        other => panic!("expected a UTXO tx, got {:?}", other),
    };

    let inputs: Vec<u64> = tx.inputs.iter().map(|i| i.amount).collect();
    assert_eq!(inputs, vec![50_000, 30_000]);
    assert_eq!(tx.fee_rate, 8);
    assert_eq!(tx.fee, 209 * 8);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.outputs[0].amount(), 60_000);
    let change = tx.change().unwrap();
    assert_eq!(change.amount, 18_328);
    assert_eq!(address_n_list_to_bip32(&change.address_n_list), "m/84'/0'/0'/1/3");
    assert_eq!(tx.input_total() - tx.output_total(), tx.fee);

    // identical inputs, identical tx
    let again = sdk.build_tx(&request).await.unwrap();
    assert_eq!(again, UnsignedTx::Utxo(tx));

    let receipt = sdk.transfer(&request).await.unwrap();
    assert_eq!(receipt.txid, "btc-txid");
    let calls = signer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, "utxo");
    assert_eq!(calls[0].payload["coin"], "Bitcoin");
    assert_eq!(calls[0].payload["version"], 1);
    assert_eq!(provider.broadcasts().len(), 1);
    assert_eq!(provider.broadcasts()[0].0, NetworkId::new(BTC_NET));
}

#[tokio::test]
async fn utxo_max_send_has_no_change() {
    let (sdk, _) = sdk_with(btc_provider(), vec![btc_key()]);
    let request = TransferRequest::new(caip(BTC), SendAmount::Max).to(BTC_DEST);

    let summary = sdk.estimate_max(&request).await.unwrap();
    // 11 + 3*68 + 31 = 246 vB
    assert_eq!(summary.fee_base, U256::from(246u64 * 8));
    assert_eq!(summary.amount_base, U256::from(100_000u64 - 246 * 8));

    let tx = match sdk.build_tx(&request).await.unwrap() {
        UnsignedTx::Utxo(tx) => tx,
        other => panic!("expected a UTXO tx, got {:?}", other),
    };
    assert!(tx.change().is_none());
    assert_eq!(tx.output_total() + tx.fee, tx.input_total());
}

#[tokio::test]
async fn utxo_shortfall_is_insufficient_funds() {
    let (sdk, _) = sdk_with(btc_provider(), vec![btc_key()]);
    let request = TransferRequest::new(caip(BTC), SendAmount::Exact("0.002".into())).to(BTC_DEST);
    match sdk.build_tx(&request).await {
        Err(TxError::InsufficientFunds { needed, available, .. }) => {
            assert_eq!(needed, "200000");
            assert_eq!(available, "100000");
        }
        other => panic!("unexpected {:?}", other),
    }

    // covers the amount, not the fee
    let request = TransferRequest::new(caip(BTC), SendAmount::Exact("0.001".into())).to(BTC_DEST);
    assert!(matches!(sdk.build_tx(&request).await, Err(TxError::CoinSelectionFailed(_))));
}

#[tokio::test]
async fn evm_max_send_leaves_fee_and_buffer() {
    let (sdk, _) = sdk_with(eth_provider(), vec![eth_key()]);
    let request = TransferRequest::new(caip(ETH), SendAmount::Max).to(ETH_TO);

    let tx = match sdk.build_tx(&request).await.unwrap() {
        UnsignedTx::Eip155(tx) => tx,
        other => panic!("expected an EVM tx, got {:?}", other),
    };
    let one_eth = U256::exp10(18);
    assert_eq!(tx.gas_price, U256::from(10_000_000_000u64));
    assert_eq!(tx.gas_limit, U256::from(21_000u64));
    assert_eq!(tx.value, one_eth - U256::from(210_000_000_000_000u64) - U256::from(100u64));
    assert_eq!(tx.value + tx.max_fee() + U256::from(100u64), one_eth);
    assert_eq!(tx.data, "0x");
    assert_eq!(tx.nonce, U256::from(7u64));
    assert_eq!(address_n_list_to_bip32(&tx.address_n_list), "m/44'/60'/0'/0/0");
}

#[tokio::test]
async fn erc20_transfer_encodes_six_decimal_amount() {
    let (sdk, _) = sdk_with(eth_provider(), vec![eth_key()]);
    let request = TransferRequest::new(caip(USDT), SendAmount::Exact("100.50".into())).to(ETH_TO);

    let tx = match sdk.build_tx(&request).await.unwrap() {
        UnsignedTx::Eip155(tx) => tx,
        other => panic!("expected an EVM tx, got {:?}", other),
    };
    assert!(tx.data.starts_with("0xa9059cbb"));
    let data = tx.data_bytes();
    assert_eq!(data.len(), 68);
    assert_eq!(U256::from_big_endian(&data[36..68]), U256::from(100_500_000u64));
    assert_eq!(format!("{:?}", tx.to), "0xdac17f958d2ee523a2206206994597c13d831ec7");
    assert_eq!(tx.gas_limit, U256::from(100_000u64));
    // no prices in this session
    assert_eq!(tx.amount_usd, None);

    let json = serde_json::to_value(&tx).unwrap();
    assert_eq!(json["value"], "0x0");
}

#[tokio::test]
async fn thorchain_swap_memo_routes_through_router() {
    let provider = eth_provider().with_inbound_address(InboundAddress {
        chain: "ETH".into(),
        address: TC_VAULT.into(),
        router: Some(TC_ROUTER.into()),
        halted: false,
    });
    let (sdk, _) = sdk_with(provider, vec![eth_key()]);
    let request = TransferRequest::new(caip(ETH), SendAmount::Exact("0.1".into())).memo("=:BTC.BTC:bc1qxyz");

    let tx = match sdk.build_tx(&request).await.unwrap() {
        UnsignedTx::Eip155(tx) => tx,
        other => panic!("expected an EVM tx, got {:?}", other),
    };
    assert_eq!(tx.gas_limit, U256::from(120_000u64));
    assert!(tx.data.starts_with("0x44bc937b"));
    assert_eq!(format!("{:?}", tx.to), TC_ROUTER);
    assert_eq!(tx.value, U256::exp10(17));
}

#[tokio::test]
async fn thorchain_swap_refuses_zero_vault() {
    let provider = eth_provider().with_inbound_address(InboundAddress {
        chain: "ETH".into(),
        address: "0x0000000000000000000000000000000000000000".into(),
        router: Some(TC_ROUTER.into()),
        halted: false,
    });
    let (sdk, _) = sdk_with(provider, vec![eth_key()]);
    let request = TransferRequest::new(caip(ETH), SendAmount::Exact("0.1".into())).memo("=:BTC.BTC:bc1qxyz");
    assert!(matches!(sdk.build_tx(&request).await, Err(TxError::SwapEncodingFailed(_))));
}

#[tokio::test]
async fn cosmos_send_scales_to_uatom_and_signs() {
    let from = bech32("cosmos", 1);
    let to = bech32("cosmos", 2);
    let provider = StaticProvider::new().with_account(
        from.clone(),
        AccountInfo {
            account_number: 42,
            sequence: 7,
            ..AccountInfo::default()
        },
    );
    let key = PubkeyRecord::new("cosmospub", vec![NetworkId::new("cosmos:cosmoshub-4")]).with_address(from.clone());
    let (sdk, signer) = sdk_with(provider, vec![key]);

    let request = TransferRequest::new(caip(ATOM), SendAmount::Exact("5".into())).to(to.clone());
    let tx = sdk.build_tx(&request).await.unwrap();
    let doc = match &tx {
        UnsignedTx::Tendermint(tx) => &tx.sign_doc,
        other => panic!("expected a Tendermint tx, got {:?}", other),
    };
    assert_eq!(doc.account_number, "42");
    assert_eq!(doc.sequence, "7");
    assert_eq!(doc.chain_id, "cosmoshub-4");
    match &doc.msgs[0] {
        CosmosMsg::Send(m) => {
            assert_eq!(m.amount[0].denom, "uatom");
            assert_eq!(m.amount[0].amount, "5000000");
            assert_eq!(m.to_address, to);
        }
        other => panic!("unexpected msg {:?}", other),
    }

    sdk.sign_tx(&caip(ATOM), &tx).await.unwrap();
    assert_eq!(signer.calls()[0].kind, "cosmos_amino");
}

#[tokio::test]
async fn thorchain_deposit_without_destination() {
    let from = bech32("thor", 3);
    let provider = StaticProvider::new().with_account(from.clone(), AccountInfo::default());
    let key = PubkeyRecord::new("thorpub", vec![NetworkId::new("cosmos:thorchain-mainnet-v1")]).with_address(from);
    let (sdk, _) = sdk_with(provider, vec![key]);

    let request = TransferRequest::new(caip(RUNE), SendAmount::Exact("1.5".into())).memo("=:ETH.ETH:0xabc");
    let tx = sdk.build_tx(&request).await.unwrap();
    let doc = match &tx {
        UnsignedTx::Tendermint(tx) => &tx.sign_doc,
        other => panic!("expected a Tendermint tx, got {:?}", other),
    };
    match &doc.msgs[0] {
        CosmosMsg::ThorchainDeposit(m) => {
            assert_eq!(m.coins[0].asset, "THOR.RUNE");
            assert_eq!(m.coins[0].amount, "150000000");
            assert_eq!(m.memo, "=:ETH.ETH:0xabc");
        }
        other => panic!("unexpected msg {:?}", other),
    }
}

#[tokio::test]
async fn mayachain_transfer_uses_mayachain_msg() {
    let from = bech32("maya", 4);
    let to = bech32("maya", 5);
    let provider = StaticProvider::new().with_account(from.clone(), AccountInfo::default());
    let key = PubkeyRecord::new("mayapub", vec![NetworkId::new("cosmos:mayachain-mainnet-v1")]).with_address(from);
    let (sdk, _) = sdk_with(provider, vec![key]);

    let request = TransferRequest::new(caip(CACAO), SendAmount::Exact("2".into())).to(to);
    match sdk.build_tx(&request).await.unwrap() {
        UnsignedTx::Tendermint(tx) => {
            assert_eq!(tx.sign_doc.msgs[0].type_url(), "mayachain/MsgSend");
            assert_eq!(tx.sign_doc.fee.gas, "500000000");
        }
        other => panic!("expected a Tendermint tx, got {:?}", other),
    }
}

#[tokio::test]
async fn staking_delegate_signs_through_allow_list() {
    let from = bech32("cosmos", 6);
    let provider = StaticProvider::new().with_account(
        from.clone(),
        AccountInfo {
            account_number: 9,
            sequence: 1,
            ..AccountInfo::default()
        },
    );
    let key = PubkeyRecord::new("cosmospub", vec![NetworkId::new("cosmos:cosmoshub-4")]).with_address(from);
    let (sdk, signer) = sdk_with(provider, vec![key]);

    let request = StakingRequest {
        caip: caip(ATOM),
        action: StakingAction::Delegate {
            validator: "cosmosvaloper1abc".into(),
            amount: "2.5".into(),
        },
        memo: None,
    };
    let tx = sdk.build_staking_tx(&request).await.unwrap();
    match &tx {
        UnsignedTx::Tendermint(tx) => {
            assert_eq!(tx.sign_doc.fee.gas, "1500000");
            assert_eq!(tx.sign_doc.msgs[0].type_url(), "cosmos-sdk/MsgDelegate");
        }
        other => panic!("expected a Tendermint tx, got {:?}", other),
    }
    sdk.sign_tx(&caip(ATOM), &tx).await.unwrap();
    assert_eq!(signer.calls().len(), 1);

    let on_utxo = StakingRequest {
        caip: caip(BTC),
        ..request
    };
    assert!(matches!(sdk.build_staking_tx(&on_utxo).await, Err(TxError::InvalidRequest(_))));
}

#[tokio::test]
async fn ripple_defaults_destination_tag_and_reserves_on_max() {
    let provider = StaticProvider::new().with_account(
        "rFromAddress",
        AccountInfo {
            account_number: 0,
            sequence: 5,
            ledger_index_current: Some(900),
            balance: Some("25000000".into()),
        },
    );
    let key = PubkeyRecord::new("xrppub", vec![NetworkId::new("ripple:4109c6f2045fc7eff4cde8f9905d19c2")])
        .with_address("rFromAddress");
    let (sdk, signer) = sdk_with(provider, vec![key]);

    let request = TransferRequest::new(caip(XRP), SendAmount::Max).to("rDestination");
    let tx = sdk.build_tx(&request).await.unwrap();
    let ripple = match &tx {
        UnsignedTx::Ripple(tx) => tx,
        other => panic!("expected a Ripple tx, got {:?}", other),
    };
    assert_eq!(ripple.payment.destination_tag, "0");
    assert_eq!(ripple.payment.amount, "23999999");
    assert_eq!(ripple.last_ledger_sequence, "1900");
    assert_eq!(ripple.sequence, "5");
    assert_eq!(ripple.tx.value.msg[0].destination_tag, "0");

    let tagged = TransferRequest::new(caip(XRP), SendAmount::Exact("1".into()))
        .to("rDestination")
        .memo("12345");
    match sdk.build_tx(&tagged).await.unwrap() {
        UnsignedTx::Ripple(tx) => {
            assert_eq!(tx.payment.destination_tag, "12345");
            assert_eq!(tx.payment.amount, "1000000");
        }
        other => panic!("expected a Ripple tx, got {:?}", other),
    }

    sdk.sign_tx(&caip(XRP), &tx).await.unwrap();
    assert_eq!(signer.calls()[0].kind, "ripple");
}

#[tokio::test]
async fn unsupported_caip_makes_no_provider_calls() {
    let provider = StaticProvider::new();
    let manager = TransactionManager::new(
        Arc::new(provider.clone()),
        Arc::new(RecordingSigner::new()),
        SdkConfig::default(),
    );
    let request = TransferRequest::new(
        caip("solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp/slip44:501"),
        SendAmount::Exact("1".into()),
    )
    .to("somewhere");
    assert!(matches!(
        manager.transfer(&request, &[], None).await,
        Err(TxError::UnsupportedAsset(_))
    ));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn missing_pubkey_is_reported() {
    let (sdk, _) = sdk_with(btc_provider(), vec![eth_key()]);
    let request = TransferRequest::new(caip(BTC), SendAmount::Exact("0.0001".into())).to(BTC_DEST);
    assert!(matches!(sdk.build_tx(&request).await, Err(TxError::MissingPubkey(_))));
}

#[tokio::test]
async fn concurrent_builds_for_one_asset_both_complete() {
    let (sdk, _) = sdk_with(eth_provider(), vec![eth_key()]);
    let request = TransferRequest::new(caip(ETH), SendAmount::Exact("0.1".into())).to(ETH_TO);
    let (a, b) = tokio::join!(sdk.build_tx(&request), sdk.build_tx(&request));
    assert_eq!(a.unwrap(), b.unwrap());
}

#[tokio::test]
async fn utxo_keys_of_every_script_type_contribute_inputs() {
    let legacy = PubkeyRecord::new("xpub-test", vec![NetworkId::new(BTC_NET)])
        .with_path("m/44'/0'/0'")
        .with_script_type(ScriptType::P2pkh);
    let mut legacy_utxo = utxo("dd", 40_000);
    legacy_utxo.path = Some("m/44'/0'/0'/0/7".to_string());
    let provider = btc_provider()
        .with_utxos("xpub-test", vec![legacy_utxo.clone()])
        // the segwit key also reports the legacy outpoint
        .with_utxos("zpub-test", vec![utxo("aa", 50_000), legacy_utxo]);
    let (sdk, _) = sdk_with(provider, vec![legacy, btc_key()]);

    let request = TransferRequest::new(caip(BTC), SendAmount::Exact("0.0008".into())).to(BTC_DEST);
    let tx = match sdk.build_tx(&request).await.unwrap() {
        UnsignedTx::Utxo(tx) => tx,
        other => panic!("expected a UTXO tx, got {:?}", other),
    };

    let inputs: Vec<(&str, u64, ScriptType)> = tx
        .inputs
        .iter()
        .map(|i| (i.txid.as_str(), i.amount, i.script_type))
        .collect();
    assert_eq!(
        inputs,
        vec![("aa", 50_000, ScriptType::P2wpkh), ("dd", 40_000, ScriptType::P2pkh)]
    );
    assert_eq!(address_n_list_to_bip32(&tx.inputs[1].address_n_list), "m/44'/0'/0'/0/7");
    // 11 + 68 + 148 + 31 + 31 = 289 vB
    assert_eq!(tx.fee, 289 * 8);
    let change = tx.change().unwrap();
    assert_eq!(change.script_type, ScriptType::P2wpkh);
    assert_eq!(address_n_list_to_bip32(&change.address_n_list), "m/84'/0'/0'/1/3");
    assert_eq!(change.amount, 90_000 - 80_000 - 289 * 8);
}

#[tokio::test]
async fn amounts_below_the_smallest_unit_are_rejected() {
    let from = bech32("cosmos", 1);
    let provider = eth_provider()
        .with_account(from.clone(), AccountInfo::default())
        .with_account(
            "rFromAddress",
            AccountInfo {
                ledger_index_current: Some(900),
                balance: Some("25000000".into()),
                ..AccountInfo::default()
            },
        );
    let (sdk, _) = sdk_with(
        provider,
        vec![
            btc_key(),
            eth_key(),
            PubkeyRecord::new("cosmospub", vec![NetworkId::new("cosmos:cosmoshub-4")]).with_address(from),
            PubkeyRecord::new("xrppub", vec![NetworkId::new("ripple:4109c6f2045fc7eff4cde8f9905d19c2")])
                .with_address("rFromAddress"),
        ],
    );

    let cases = [
        (BTC, "0.000000001", BTC_DEST.to_string()),
        (ETH, "0.0000000000000000001", ETH_TO.to_string()),
        (USDT, "0.0000001", ETH_TO.to_string()),
        (ATOM, "0.0000001", bech32("cosmos", 2)),
        (XRP, "0.0000001", "rDestination".to_string()),
    ];
    for (asset, amount, to) in cases {
        let request = TransferRequest::new(caip(asset), SendAmount::Exact(amount.into())).to(to);
        match sdk.build_tx(&request).await {
            Err(TxError::InvalidRequest(_)) => {}
            other => panic!("{} accepted a sub-unit amount: {:?}", asset, other),
        }
    }
}

#[tokio::test]
async fn oversized_evm_amount_is_an_error() {
    let (sdk, _) = sdk_with(eth_provider(), vec![eth_key()]);
    // U256::MAX wei written in ETH
    let max_wei_in_eth = "115792089237316195423570985008687907853269984665640564039457.584007913129639935";
    for amount in [max_wei_in_eth.to_string(), "9".repeat(60)] {
        let request = TransferRequest::new(caip(ETH), SendAmount::Exact(amount)).to(ETH_TO);
        assert!(matches!(sdk.build_tx(&request).await, Err(TxError::InvalidRequest(_))));
    }

    // fits in 256 bits, but not in the balance
    let request = TransferRequest::new(caip(ETH), SendAmount::Exact("1".repeat(50))).to(ETH_TO);
    assert!(matches!(sdk.build_tx(&request).await, Err(TxError::InsufficientFunds { .. })));
}

#[tokio::test]
async fn ripple_ledger_index_overflow_is_reported() {
    let provider = StaticProvider::new().with_account(
        "rFromAddress",
        AccountInfo {
            ledger_index_current: Some(u64::MAX),
            ..AccountInfo::default()
        },
    );
    let key = PubkeyRecord::new("xrppub", vec![NetworkId::new("ripple:4109c6f2045fc7eff4cde8f9905d19c2")])
        .with_address("rFromAddress");
    let (sdk, _) = sdk_with(provider, vec![key]);
    let request = TransferRequest::new(caip(XRP), SendAmount::Exact("1".into())).to("rDestination");
    assert!(matches!(sdk.build_tx(&request).await, Err(TxError::ProviderUnavailable(_))));
}
