//! Call-data encoding for the two contract calls the builder emits

use ethereum_types::{Address, U256};
use ethers_core::abi::{encode, Token};

/// `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// `depositWithExpiry(address,address,uint256,string,uint256)` on the THORChain router
pub const DEPOSIT_WITH_EXPIRY_SELECTOR: [u8; 4] = [0x44, 0xbc, 0x93, 0x7b];

fn with_selector(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut data = selector.to_vec();
    data.extend(encode(tokens));
    data
}

pub fn encode_transfer(to: Address, amount: U256) -> Vec<u8> {
    with_selector(TRANSFER_SELECTOR, &[Token::Address(to), Token::Uint(amount)])
}

/// Head is five words (vault, asset, amount, memo offset = 0xa0, expiry),
/// followed by the memo length and its zero-padded bytes.
pub fn encode_deposit_with_expiry(
    vault: Address,
    asset: Address,
    amount: U256,
    memo: &str,
    expiry: U256,
) -> Vec<u8> {
    with_selector(
        DEPOSIT_WITH_EXPIRY_SELECTOR,
        &[
            Token::Address(vault),
            Token::Address(asset),
            Token::Uint(amount),
            Token::String(memo.to_string()),
            Token::Uint(expiry),
        ],
    )
}

pub fn to_hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
