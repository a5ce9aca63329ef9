pub mod caip;
pub mod chains;
pub mod config;
pub mod errors;
pub mod manager;
pub mod offline;
pub mod provider;
pub mod pubkey;
pub mod request;
pub mod retry;
pub mod sdk;
pub mod signer;
pub mod tx;
pub mod units;

// Re-export the main entry points
pub use caip::{classify, Caip, ChainFamily, NetworkId};
pub use config::SdkConfig;
pub use errors::{Result, TxError};
pub use manager::TransactionManager;
pub use provider::ChainDataProvider;
pub use pubkey::{PubkeyRecord, ScriptType};
pub use request::{SendAmount, TransferRequest};
pub use sdk::{KeepKeySdk, TransferReceipt};
pub use signer::{SignedTx, Signer};
pub use tx::UnsignedTx;
