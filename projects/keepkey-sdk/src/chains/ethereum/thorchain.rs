//! THORChain swap routing for native EVM sends

use ethereum_types::Address;

use crate::errors::{Result, TxError};
use crate::provider::ChainDataProvider;

use super::parse_address;

/// Swap (`=:`, `SWAP:`) and other THORChain action memos.
pub fn is_swap_memo(memo: &str) -> bool {
    memo.starts_with('=') || memo.starts_with("SWAP") || memo.contains(':')
}

/// THORChain's name for the inbound chain of an EVM chain id.
pub fn inbound_chain(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("ETH"),
        56 => Some("BSC"),
        43114 => Some("AVAX"),
        8453 => Some("BASE"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundRoute {
    pub vault: Address,
    pub router: Address,
}

/// Live vault and router for `chain_id`. Every failure, including a zero
/// address, is a `SwapEncodingFailed`; funds never go to an unverified vault.
pub async fn resolve_inbound(provider: &dyn ChainDataProvider, chain_id: u64) -> Result<InboundRoute> {
    let chain = inbound_chain(chain_id).ok_or_else(|| {
        TxError::SwapEncodingFailed(format!("no THORChain inbound for chain id {}", chain_id))
    })?;

    let inbound = provider
        .get_inbound_addresses()
        .await
        .map_err(|e| TxError::SwapEncodingFailed(format!("inbound address lookup failed: {:#}", e)))?;

    let entry = inbound
        .iter()
        .find(|a| a.chain.eq_ignore_ascii_case(chain))
        .ok_or_else(|| TxError::SwapEncodingFailed(format!("no inbound address for {}", chain)))?;
    if entry.halted {
        return Err(TxError::SwapEncodingFailed(format!("{} inbound is halted", chain)));
    }

    let vault = parse_address(&entry.address)
        .map_err(|_| TxError::SwapEncodingFailed(format!("bad vault address {:?}", entry.address)))?;
    let router = entry
        .router
        .as_deref()
        .map(parse_address)
        .transpose()
        .map_err(|_| TxError::SwapEncodingFailed(format!("bad router for {}", chain)))?
        .ok_or_else(|| TxError::SwapEncodingFailed(format!("no router for {}", chain)))?;

    if vault.is_zero() || router.is_zero() {
        return Err(TxError::SwapEncodingFailed(format!("{} vault or router is the zero address", chain)));
    }

    log::info!("{} vault {:?} router {:?}", chain, vault, router);
    Ok(InboundRoute { vault, router })
}
