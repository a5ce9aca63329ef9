//! Chain-family transaction builders
//!
//! One builder per family. Each reads pubkeys and provider responses and
//! returns a self-contained unsigned transaction; none of them touch session
//! state.

pub mod bitcoin;
pub mod cosmos;
pub mod ethereum;
pub mod ripple;

use crate::config::SdkConfig;
use crate::provider::ChainDataProvider;
use crate::pubkey::PubkeyRecord;

/// Read-only inputs shared by every builder for the duration of one build.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub pubkeys: &'a [PubkeyRecord],
    pub provider: &'a dyn ChainDataProvider,
    /// Key the caller last selected; builders fall back to the first
    /// matching key when it is unset or bound to another network
    pub signer_context: Option<&'a PubkeyRecord>,
    pub config: &'a SdkConfig,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        pubkeys: &'a [PubkeyRecord],
        provider: &'a dyn ChainDataProvider,
        config: &'a SdkConfig,
    ) -> Self {
        Self {
            pubkeys,
            provider,
            signer_context: None,
            config,
        }
    }

    pub fn with_signer_context(mut self, context: Option<&'a PubkeyRecord>) -> Self {
        self.signer_context = context;
        self
    }
}
