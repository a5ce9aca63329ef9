//! CAIP asset identifiers and chain-family classification
//!
//! An asset id has the shape `namespace:reference/assetNamespace:assetReference`
//! (e.g. `eip155:1/erc20:0xdac17f958d2ee523a2206206994597c13d831ec7`). Dropping
//! the asset suffix yields the network id used to match pubkeys to chains.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TxError};

/// Network pattern carried by pubkeys valid on every EVM chain.
pub const EVM_WILDCARD: &str = "eip155:*";

pub const UTXO_SUPPORT: &[&str] = &[
    "bip122:000000000019d6689c085ae165831e93/slip44:0",   // BTC
    "bip122:000000000000000000651ef99cb9fcbe/slip44:145", // BCH
    "bip122:000007d91d1254d60e2dd1ae58038307/slip44:5",   // DASH
    "bip122:00000000001a91e3dace36e2be3bf030/slip44:3",   // DOGE
    "bip122:12a765e31ffd4059bada1e25190f6e98/slip44:2",   // LTC
];

pub const TENDERMINT_SUPPORT: &[&str] = &[
    "cosmos:mayachain-mainnet-v1/slip44:931",
    "cosmos:mayachain-mainnet-v1/denom:maya",
    "cosmos:osmosis-1/slip44:118",
    "cosmos:cosmoshub-4/slip44:118",
    "cosmos:thorchain-mainnet-v1/slip44:931",
];

pub const OTHER_SUPPORT: &[&str] = &[RIPPLE_CAIP];

pub const RIPPLE_CAIP: &str = "ripple:4109c6f2045fc7eff4cde8f9905d19c2/slip44:144";

/// (network id, provider chain symbol, signer coin name)
const UTXO_CHAINS: &[(&str, &str, &str)] = &[
    ("bip122:000000000019d6689c085ae165831e93", "BTC", "Bitcoin"),
    ("bip122:000000000000000000651ef99cb9fcbe", "BCH", "BitcoinCash"),
    ("bip122:000007d91d1254d60e2dd1ae58038307", "DASH", "Dash"),
    ("bip122:00000000001a91e3dace36e2be3bf030", "DOGE", "Dogecoin"),
    ("bip122:12a765e31ffd4059bada1e25190f6e98", "LTC", "Litecoin"),
];

static CAIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([-a-z0-9]{3,8}):([-_a-zA-Z0-9]{1,32})/([-a-z0-9]{3,8}):([-.%a-zA-Z0-9]{1,128})$")
        .expect("static CAIP pattern")
});

/// The four chain families the transaction core knows how to build for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainFamily {
    Utxo,
    Tendermint,
    Eip155,
    Other,
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainFamily::Utxo => "UTXO",
            ChainFamily::Tendermint => "TENDERMINT",
            ChainFamily::Eip155 => "EIP155",
            ChainFamily::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// A validated CAIP-19 style asset identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Caip(String);

impl Caip {
    pub fn parse(value: &str) -> Result<Self> {
        if CAIP_RE.is_match(value) {
            Ok(Caip(value.to_string()))
        } else {
            Err(TxError::UnsupportedAsset(format!("malformed CAIP: {}", value)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn network_id(&self) -> NetworkId {
        let (network, _) = self.split();
        NetworkId(network.to_string())
    }

    /// `slip44`, `erc20`, `denom`, ...
    pub fn asset_namespace(&self) -> &str {
        let (_, asset) = self.split();
        asset.split_once(':').map(|(ns, _)| ns).unwrap_or(asset)
    }

    pub fn asset_reference(&self) -> &str {
        let (_, asset) = self.split();
        asset.split_once(':').map(|(_, reference)| reference).unwrap_or("")
    }

    /// SLIP-44 coin type when the asset is a chain's native coin.
    pub fn slip44(&self) -> Option<u32> {
        if self.asset_namespace() == "slip44" {
            self.asset_reference().parse().ok()
        } else {
            None
        }
    }

    fn split(&self) -> (&str, &str) {
        self.0.split_once('/').unwrap_or((self.0.as_str(), ""))
    }
}

impl FromStr for Caip {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self> {
        Caip::parse(s)
    }
}

impl TryFrom<String> for Caip {
    type Error = TxError;

    fn try_from(value: String) -> Result<Self> {
        Caip::parse(&value)
    }
}

impl From<Caip> for String {
    fn from(caip: Caip) -> Self {
        caip.0
    }
}

impl fmt::Display for Caip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A chain identifier: the asset id with the asset suffix dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(String);

impl NetworkId {
    pub fn new(value: impl Into<String>) -> Self {
        NetworkId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_evm(&self) -> bool {
        self.0.starts_with("eip155:")
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for NetworkId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NetworkId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Route an asset to its chain family.
///
/// Allow-lists are checked before the structural `eip155:` prefix test; new
/// chains are added by extending a list, never by reordering.
pub fn classify(caip: &Caip) -> Result<ChainFamily> {
    let id = caip.as_str();
    if UTXO_SUPPORT.contains(&id) {
        return Ok(ChainFamily::Utxo);
    }
    if TENDERMINT_SUPPORT.contains(&id) {
        return Ok(ChainFamily::Tendermint);
    }
    if id.starts_with("eip155:") {
        return Ok(ChainFamily::Eip155);
    }
    if OTHER_SUPPORT.contains(&id) {
        return Ok(ChainFamily::Other);
    }
    Err(TxError::UnsupportedAsset(id.to_string()))
}

/// Chain symbol the data provider keys UTXO lookups by.
pub fn utxo_chain_symbol(network_id: &NetworkId) -> Option<&'static str> {
    UTXO_CHAINS
        .iter()
        .find(|(network, _, _)| network_id == *network)
        .map(|(_, symbol, _)| *symbol)
}

/// Coin name the hardware signer expects for a UTXO asset.
pub fn utxo_coin_name(caip: &Caip) -> Option<&'static str> {
    let network_id = caip.network_id();
    UTXO_CHAINS
        .iter()
        .find(|(network, _, _)| network_id == *network)
        .map(|(_, _, coin)| *coin)
}

/// Numeric EIP-155 chain id from an `eip155:<id>` network id.
pub fn evm_chain_id(network_id: &NetworkId) -> Result<u64> {
    network_id
        .as_str()
        .strip_prefix("eip155:")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| TxError::UnsupportedAsset(format!("malformed EVM network id: {}", network_id)))
}
