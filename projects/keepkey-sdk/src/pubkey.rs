//! Derived public keys discovered from the signer, and the session store that
//! holds them.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use bitcoin::bip32::DerivationPath;
use serde::{Deserialize, Serialize};

use crate::caip::{NetworkId, EVM_WILDCARD};
use crate::errors::{Result, TxError};

/// UTXO address/script flavour a key derives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptType {
    #[serde(rename = "p2pkh")]
    P2pkh,
    #[serde(rename = "p2sh-p2wpkh", alias = "p2sh")]
    P2shP2wpkh,
    #[serde(rename = "p2wpkh")]
    P2wpkh,
}

impl ScriptType {
    /// BIP-44 / 49 / 84 purpose field.
    pub fn bip_purpose(&self) -> u32 {
        match self {
            ScriptType::P2pkh => 44,
            ScriptType::P2shP2wpkh => 49,
            ScriptType::P2wpkh => 84,
        }
    }

    pub fn is_segwit(&self) -> bool {
        !matches!(self, ScriptType::P2pkh)
    }

    /// Virtual size a signed input of this type adds.
    pub fn input_vbytes(&self) -> u64 {
        match self {
            ScriptType::P2pkh => 148,
            ScriptType::P2shP2wpkh => 91,
            ScriptType::P2wpkh => 68,
        }
    }

    pub fn output_vbytes(&self) -> u64 {
        match self {
            ScriptType::P2pkh => 34,
            ScriptType::P2shP2wpkh => 32,
            ScriptType::P2wpkh => 31,
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScriptType::P2pkh => "p2pkh",
            ScriptType::P2shP2wpkh => "p2sh-p2wpkh",
            ScriptType::P2wpkh => "p2wpkh",
        };
        f.write_str(name)
    }
}

impl FromStr for ScriptType {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "p2pkh" => Ok(ScriptType::P2pkh),
            "p2sh" | "p2sh-p2wpkh" => Ok(ScriptType::P2shP2wpkh),
            "p2wpkh" => Ok(ScriptType::P2wpkh),
            other => Err(TxError::InvalidRequest(format!("unknown script type: {}", other))),
        }
    }
}

/// One derived key the signer controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubkeyRecord {
    /// Raw pubkey or xpub/ypub/zpub
    pub pubkey: String,
    /// Network ids this key is valid for; `eip155:*` covers every EVM chain
    pub networks: Vec<NetworkId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_master: Option<String>,
    #[serde(default, rename = "addressNList", skip_serializing_if = "Option::is_none")]
    pub address_n_list: Option<Vec<u32>>,
    #[serde(default, rename = "addressNListMaster", skip_serializing_if = "Option::is_none")]
    pub address_n_list_master: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_type: Option<ScriptType>,
}

impl PubkeyRecord {
    pub fn new(pubkey: impl Into<String>, networks: Vec<NetworkId>) -> Self {
        Self {
            pubkey: pubkey.into(),
            networks,
            address: None,
            path: None,
            path_master: None,
            address_n_list: None,
            address_n_list_master: None,
            script_type: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_path_master(mut self, path: impl Into<String>) -> Self {
        self.path_master = Some(path.into());
        self
    }

    pub fn with_address_n_list_master(mut self, list: Vec<u32>) -> Self {
        self.address_n_list_master = Some(list);
        self
    }

    pub fn with_script_type(mut self, script_type: ScriptType) -> Self {
        self.script_type = Some(script_type);
        self
    }

    /// Exact network match, or the EVM wildcard for `eip155:` networks.
    pub fn matches(&self, network: &NetworkId) -> bool {
        self.networks.iter().any(|n| {
            n == network || (n.as_str() == EVM_WILDCARD && network.is_evm())
        })
    }

    /// Declared script type, else inferred from the BIP purpose of the path,
    /// else legacy.
    pub fn effective_script_type(&self) -> ScriptType {
        if let Some(script_type) = self.script_type {
            return script_type;
        }
        match self.best_address_n_list().and_then(|l| l.first().copied()) {
            Some(p) if p == 0x8000_0000 | 84 => ScriptType::P2wpkh,
            Some(p) if p == 0x8000_0000 | 49 => ScriptType::P2shP2wpkh,
            _ => ScriptType::P2pkh,
        }
    }

    /// Address if known, else the raw pubkey.
    pub fn address_or_pubkey(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.pubkey)
    }

    /// Best available index-list path: master list, relative list, then the
    /// parsed string forms in the same order.
    pub fn best_address_n_list(&self) -> Option<Vec<u32>> {
        if let Some(list) = self.address_n_list_master.as_ref().filter(|l| !l.is_empty()) {
            return Some(list.clone());
        }
        if let Some(list) = self.address_n_list.as_ref().filter(|l| !l.is_empty()) {
            return Some(list.clone());
        }
        for path in [&self.path_master, &self.path].into_iter().flatten() {
            match bip32_to_address_n_list(path) {
                Ok(list) if !list.is_empty() => return Some(list),
                Ok(_) => {}
                Err(e) => log::warn!("unparseable path {:?} on {}: {}", path, self.pubkey, e),
            }
        }
        None
    }

    /// Account-level path (`m/purpose'/coin'/account'`) as indices, when known.
    pub fn account_path(&self) -> Option<Vec<u32>> {
        let list = self.best_address_n_list()?;
        Some(list.into_iter().take(3).collect())
    }
}

/// Convert `m/84'/0'/0'` (or `84'/0'/0'`) to `[0x80000054, 0x80000000, 0x80000000]`.
pub fn bip32_to_address_n_list(path: &str) -> Result<Vec<u32>> {
    let normalized = if path.starts_with('m') {
        path.to_string()
    } else {
        format!("m/{}", path.trim_start_matches('/'))
    };
    let parsed = DerivationPath::from_str(&normalized)
        .map_err(|e| TxError::InvalidRequest(format!("bad derivation path {:?}: {}", path, e)))?;
    Ok((&parsed).into_iter().map(|child| u32::from(*child)).collect())
}

/// Inverse of [`bip32_to_address_n_list`], for logging.
pub fn address_n_list_to_bip32(list: &[u32]) -> String {
    let mut out = String::from("m");
    for index in list {
        if index & 0x8000_0000 != 0 {
            out.push_str(&format!("/{}'", index & 0x7fff_ffff));
        } else {
            out.push_str(&format!("/{}", index));
        }
    }
    out
}

/// Pick the key a builder signs with: the caller's context when it still
/// matches the network, else the first matching key.
pub fn resolve_signing_key<'a>(
    context: Option<&'a PubkeyRecord>,
    pubkeys: &'a [PubkeyRecord],
    network: &NetworkId,
) -> Result<&'a PubkeyRecord> {
    if let Some(ctx) = context {
        if ctx.matches(network) {
            return Ok(ctx);
        }
        log::info!(
            "signing context {} is not valid for {}, selecting a matching key",
            ctx.address_or_pubkey(),
            network
        );
    }
    pubkeys
        .iter()
        .find(|p| p.matches(network))
        .ok_or_else(|| TxError::MissingPubkey(network.to_string()))
}

/// Ordered, de-duplicated session pubkeys keyed by (pubkey, path).
#[derive(Debug, Clone, Default)]
pub struct PubkeyStore {
    records: Vec<PubkeyRecord>,
    seen: HashSet<(String, Option<String>)>,
}

impl PubkeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn identity(record: &PubkeyRecord) -> (String, Option<String>) {
        (record.pubkey.clone(), record.path.clone())
    }

    /// Insert keeping first-seen order. Returns false for a duplicate.
    pub fn insert(&mut self, record: PubkeyRecord) -> bool {
        if !self.seen.insert(Self::identity(&record)) {
            log::debug!("skipping duplicate pubkey {}", record.pubkey);
            return false;
        }
        self.records.push(record);
        true
    }

    /// Load a batch, keeping only keys valid on at least one enabled network.
    /// An empty `enabled` list disables filtering. Returns how many were added.
    pub fn load(&mut self, records: Vec<PubkeyRecord>, enabled: &[NetworkId]) -> usize {
        let mut added = 0;
        for record in records {
            if !enabled.is_empty() && !enabled.iter().any(|n| record.matches(n)) {
                log::debug!("pubkey {} has no enabled network, skipping", record.pubkey);
                continue;
            }
            if self.insert(record) {
                added += 1;
            }
        }
        added
    }

    pub fn for_network<'a>(&'a self, network: &'a NetworkId) -> impl Iterator<Item = &'a PubkeyRecord> + 'a {
        self.records.iter().filter(move |r| r.matches(network))
    }

    pub fn as_slice(&self) -> &[PubkeyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.seen.clear();
    }
}
