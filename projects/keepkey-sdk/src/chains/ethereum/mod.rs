//! EVM chain support
//!
//! Native sends (plain, memo-carrying, or THORChain swap deposits) and ERC-20
//! transfers on any `eip155:` chain.

pub mod abi;
pub mod thorchain;
pub mod transaction;

use ethereum_types::{Address, U256};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::caip::{evm_chain_id, Caip};
use crate::errors::{Result, TxError};
use crate::pubkey::{address_n_list_to_bip32, resolve_signing_key, PubkeyRecord};
use crate::request::TransferRequest;
use crate::units::{base_units_to_f64, exact_base_units, to_base_units};

pub use self::transaction::EvmUnsignedTx;
use super::BuildContext;

const NATIVE_DECIMALS: u32 = 18;
const MAINNET_TRANSFER_GAS: u64 = 21_000;
const L2_TRANSFER_GAS: u64 = 25_000;
const SWAP_GAS: u64 = 120_000;
/// SSTORE-heavy tokens ran out of gas at lower limits
const TOKEN_TRANSFER_GAS: u64 = 100_000;
const GAS_PER_MEMO_BYTE: u64 = 68;

/// m/44'/60'/0'/0/0
const DEFAULT_ADDRESS_N_LIST: [u32; 5] = [0x8000_002c, 0x8000_003c, 0x8000_0000, 0, 0];

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("static address pattern"));

/// Six-decimal stablecoins, lowercase contract addresses.
const SIX_DECIMAL_TOKENS: &[&str] = &[
    "0xdac17f958d2ee523a2206206994597c13d831ec7", // USDT, Ethereum
    "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", // USDC, Ethereum
    "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913", // USDC, Base
    "0x3c499c542cef5e3811e1192ce70d8cc03d5c3359", // USDC, Polygon
    "0xc2132d05d31c914a87c6611c10748aeb04b58e8f", // USDT, Polygon
    "0xaf88d065e77c8cc2239327c5edb3a432268e5831", // USDC, Arbitrum
    "0xfd086bc7cd5c481dcc9c85ebe478a1c0b69fcbb9", // USDT, Arbitrum
    "0xb97ef9ef8734c71904d8002f8b6bc66dd9c48a6e", // USDC, Avalanche
    "0x9702230a8ea53601f5cd2dc00fdbc13d4df4a8c7", // USDT, Avalanche
];

pub(crate) fn parse_address(value: &str) -> Result<Address> {
    let value = value.trim();
    if !ADDRESS_RE.is_match(value) {
        return Err(TxError::InvalidRequest(format!("invalid EVM address: {:?}", value)));
    }
    let bytes = hex::decode(&value[2..])
        .map_err(|e| TxError::InvalidRequest(format!("invalid EVM address {:?}: {}", value, e)))?;
    Ok(Address::from_slice(&bytes))
}

/// No on-chain lookup: known stablecoins are 6, everything else 18.
pub fn token_decimals(contract: &str) -> u32 {
    if SIX_DECIMAL_TOKENS.contains(&contract.to_ascii_lowercase().as_str()) {
        6
    } else {
        NATIVE_DECIMALS
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EvmAsset {
    Native,
    Erc20 { contract: Address, raw: String },
}

fn classify_asset(caip: &Caip) -> Result<EvmAsset> {
    match caip.asset_namespace() {
        "slip44" => Ok(EvmAsset::Native),
        "erc20" => {
            let raw = caip.asset_reference().to_string();
            let contract = parse_address(&raw)
                .map_err(|_| TxError::UnsupportedAsset(format!("bad token contract in {}", caip)))?;
            Ok(EvmAsset::Erc20 { contract, raw })
        }
        _ => Err(TxError::UnsupportedAsset(caip.to_string())),
    }
}

/// Master list, relative list, master path, path; else the default account.
fn signing_path(key: &PubkeyRecord) -> Vec<u32> {
    match key.best_address_n_list() {
        Some(list) => list,
        None => {
            log::warn!(
                "no path info on {}, using {}",
                key.address_or_pubkey(),
                address_n_list_to_bip32(&DEFAULT_ADDRESS_N_LIST)
            );
            DEFAULT_ADDRESS_N_LIST.to_vec()
        }
    }
}

fn memo_gas(memo: Option<&str>) -> u64 {
    memo.map(|m| m.len() as u64 * GAS_PER_MEMO_BYTE).unwrap_or(0)
}

/// Checked `gas_price * gas_limit`.
fn gas_cost(gas_price: U256, gas_limit: u64) -> Result<U256> {
    gas_price.checked_mul(U256::from(gas_limit)).ok_or_else(|| {
        TxError::ProviderUnavailable(format!("gas price {} overflows at {} gas", gas_price, gas_limit))
    })
}

/// Gas limit for a native send.
pub fn native_gas_limit(chain_id: u64, memo: Option<&str>) -> u64 {
    match memo {
        Some(m) if thorchain::is_swap_memo(m) => SWAP_GAS,
        _ => {
            let base = if chain_id == 1 { MAINNET_TRANSFER_GAS } else { L2_TRANSFER_GAS };
            base + memo_gas(memo)
        }
    }
}

pub async fn build_evm_tx(ctx: &BuildContext<'_>, request: &TransferRequest) -> Result<EvmUnsignedTx> {
    // 1. chain, signing key and asset
    let caip = &request.caip;
    let network = caip.network_id();
    let chain_id = evm_chain_id(&network)?;
    let key = resolve_signing_key(ctx.signer_context, ctx.pubkeys, &network)?;
    let from = key.address_or_pubkey().to_string();
    let asset = classify_asset(caip)?;
    let memo = request.memo_trimmed();

    // 4. gas price, floored
    let reported = ctx
        .provider
        .get_gas_price(&network)
        .await
        .map_err(|e| TxError::provider("gas price", e))?;
    let floor = ctx.config.gas_price_floor();
    let gas_price = if reported < floor {
        log::warn!("gas price {} below floor, using {}", reported, floor);
        floor
    } else {
        reported
    };

    // 5. nonce; a fresh address has none
    let nonce = ctx
        .provider
        .get_nonce(&network, &from)
        .await
        .map_err(|e| TxError::provider("nonce", e))?
        .unwrap_or(0);

    // 6. native balance
    let balance_str = ctx
        .provider
        .get_balance(&network, &from)
        .await
        .map_err(|e| TxError::provider("balance", e))?;
    let balance = to_base_units(&balance_str, NATIVE_DECIMALS)
        .map_err(|_| TxError::ProviderUnavailable(format!("malformed balance {:?}", balance_str)))?;
    if balance.is_zero() {
        return Err(TxError::insufficient("gas", 0, format!("{} has no native balance on {}", from, network)));
    }

    let address_n_list = signing_path(key);

    let tx = match asset {
        EvmAsset::Native => {
            let (to, value, gas_limit, data) =
                build_native(ctx, request, chain_id, gas_price, balance, memo).await?;
            EvmUnsignedTx {
                chain_id,
                nonce: U256::from(nonce),
                gas_limit: U256::from(gas_limit),
                gas_price,
                to,
                value,
                data,
                address_n_list,
                gas_fee_usd: None,
                amount_usd: None,
            }
        }
        EvmAsset::Erc20 { contract, raw } => {
            let to = parse_address(request.require_to()?)?;
            let gas_limit = TOKEN_TRANSFER_GAS + memo_gas(memo);
            let gas_fee = gas_cost(gas_price, gas_limit)?;
            if gas_fee > balance {
                return Err(TxError::insufficient(
                    gas_fee,
                    balance,
                    "native balance for token transfer gas",
                ));
            }

            let decimals = token_decimals(&raw);
            let amount = if request.is_max() {
                let token_balance = ctx
                    .provider
                    .get_token_balance(&network, &from, &raw)
                    .await
                    .map_err(|e| TxError::provider("token balance", e))?;
                let amount = to_base_units(&token_balance, decimals).map_err(|_| {
                    TxError::ProviderUnavailable(format!("malformed token balance {:?}", token_balance))
                })?;
                if amount.is_zero() {
                    return Err(TxError::insufficient("any", 0, format!("{} token balance", raw)));
                }
                amount
            } else {
                exact_base_units(request.require_amount()?, decimals)?
            };

            let (gas_fee_usd, amount_usd) =
                usd_estimates(ctx, chain_id, caip, gas_fee, amount, decimals).await;

            log::info!("ERC-20 {} amount {} ({} decimals)", raw, amount, decimals);
            EvmUnsignedTx {
                chain_id,
                nonce: U256::from(nonce),
                gas_limit: U256::from(gas_limit),
                gas_price,
                to: contract,
                value: U256::zero(),
                data: abi::to_hex_data(&abi::encode_transfer(to, amount)),
                address_n_list,
                gas_fee_usd,
                amount_usd,
            }
        }
    };

    log::info!(
        "chain {} nonce {} gas {} @ {} wei, value {}",
        tx.chain_id,
        tx.nonce,
        tx.gas_limit,
        tx.gas_price,
        tx.value
    );
    Ok(tx)
}

/// Returns (to, value, gas limit, data).
async fn build_native(
    ctx: &BuildContext<'_>,
    request: &TransferRequest,
    chain_id: u64,
    gas_price: U256,
    balance: U256,
    memo: Option<&str>,
) -> Result<(Address, U256, u64, String)> {
    let gas_limit = native_gas_limit(chain_id, memo);
    let fee = gas_cost(gas_price, gas_limit)?;

    let value = if request.is_max() {
        let reserve = fee
            .checked_add(ctx.config.send_buffer())
            .ok_or_else(|| TxError::ProviderUnavailable(format!("gas fee {} overflows with send buffer", fee)))?;
        if balance <= reserve {
            return Err(TxError::insufficient(reserve, balance, "gas fee plus send buffer"));
        }
        balance - reserve
    } else {
        let amount = exact_base_units(request.require_amount()?, NATIVE_DECIMALS)?;
        let needed = amount
            .checked_add(fee)
            .ok_or_else(|| TxError::InvalidRequest(format!("amount {} plus gas fee overflows", amount)))?;
        if needed > balance {
            return Err(TxError::insufficient(needed, balance, "amount + gas fee"));
        }
        amount
    };

    match memo {
        Some(memo) if thorchain::is_swap_memo(memo) => {
            let route = thorchain::resolve_inbound(ctx.provider, chain_id).await?;
            let expiry = chrono::Utc::now().timestamp().max(0) as u64 + ctx.config.swap_expiry_secs;
            let data = abi::encode_deposit_with_expiry(
                route.vault,
                Address::zero(),
                value,
                memo,
                U256::from(expiry),
            );
            log::info!("swap deposit via router {:?}, memo {:?}", route.router, memo);
            Ok((route.router, value, gas_limit, abi::to_hex_data(&data)))
        }
        Some(memo) => {
            let to = parse_address(request.require_to()?)?;
            Ok((to, value, gas_limit, abi::to_hex_data(memo.as_bytes())))
        }
        None => {
            let to = parse_address(request.require_to()?)?;
            Ok((to, value, gas_limit, "0x".to_string()))
        }
    }
}

/// Advisory USD values; a failed price lookup leaves them empty.
async fn usd_estimates(
    ctx: &BuildContext<'_>,
    chain_id: u64,
    token: &Caip,
    gas_fee: U256,
    amount: U256,
    decimals: u32,
) -> (Option<f64>, Option<f64>) {
    let native = match Caip::parse(&format!("eip155:{}/slip44:60", chain_id)) {
        Ok(native) => native,
        Err(_) => return (None, None),
    };
    match ctx.provider.get_market_price(&[native, token.clone()]).await {
        Ok(prices) if prices.len() >= 2 => (
            Some(base_units_to_f64(gas_fee, NATIVE_DECIMALS) * prices[0]),
            Some(base_units_to_f64(amount, decimals) * prices[1]),
        ),
        Ok(prices) => {
            log::warn!("price lookup returned {} values, skipping USD estimate", prices.len());
            (None, None)
        }
        Err(e) => {
            log::warn!("price lookup failed, skipping USD estimate: {:#}", e);
            (None, None)
        }
    }
}
