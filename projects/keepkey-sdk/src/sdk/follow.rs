//! Confirmation tracking for broadcast transactions

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};

use crate::caip::{utxo_chain_symbol, Caip, NetworkId};
use crate::config::SdkConfig;
use crate::errors::TxError;
use crate::provider::{ChainDataProvider, TxStatus};
use crate::retry::retry_with_backoff;

/// Confirmations after which a transaction is treated as final.
pub fn required_confirmations(network: &NetworkId) -> u64 {
    match utxo_chain_symbol(network) {
        Some("BTC") => 6,
        Some("DOGE") => 3,
        _ => 1,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationReport {
    pub caip: Caip,
    pub txid: String,
    pub required_confirmations: u64,
    pub confirmations: u64,
    pub broadcast_time: DateTime<Utc>,
    pub detected_time: Option<DateTime<Utc>>,
    pub confirm_time: Option<DateTime<Utc>>,
    pub time_to_detect: Option<String>,
    pub time_to_confirm: Option<String>,
    pub time_from_detection_to_confirm: Option<String>,
}

fn human(elapsed: Duration) -> String {
    humantime::format_duration(Duration::from_secs(elapsed.as_secs())).to_string()
}

/// Poll until `txid` reaches the network's required confirmations.
///
/// Polls every `config.confirmation_poll_secs`. Transient lookup failures
/// are retried with `config.retry`; a lookup that still fails is logged and
/// the next poll goes ahead. There is no built-in deadline, wrap the call in
/// `tokio::time::timeout` to bound it.
pub async fn follow_transaction(
    provider: &dyn ChainDataProvider,
    config: &SdkConfig,
    caip: &Caip,
    txid: &str,
) -> ConfirmationReport {
    let network = caip.network_id();
    let required = required_confirmations(&network);
    let interval = config.confirmation_poll_interval();

    let broadcast_time = Utc::now();
    let started = Instant::now();
    let mut detected: Option<(DateTime<Utc>, Instant)> = None;

    log::info!("following {} on {}, need {} confirmations", txid, network, required);

    let network_ref = &network;
    loop {
        let lookup = retry_with_backoff("lookup_tx", &config.retry, TxError::is_retryable, move || async move {
            provider
                .lookup_tx(network_ref, txid)
                .await
                .map_err(|e| TxError::provider("tx lookup", e))
        })
        .await;

        match lookup {
            Ok(TxStatus { txid: seen, confirmations }) => {
                if seen.is_some() && detected.is_none() {
                    log::info!("{} detected after {}", txid, human(started.elapsed()));
                    detected = Some((Utc::now(), Instant::now()));
                }
                if confirmations >= required {
                    let confirm_time = Utc::now();
                    let confirmed_at = Instant::now();
                    // Confirmed without ever being reported as seen
                    let (detected_time, detected_at) = detected.unwrap_or((confirm_time, confirmed_at));
                    log::info!(
                        "{} confirmed ({} confs) after {}",
                        txid,
                        confirmations,
                        human(started.elapsed())
                    );
                    return ConfirmationReport {
                        caip: caip.clone(),
                        txid: txid.to_string(),
                        required_confirmations: required,
                        confirmations,
                        broadcast_time,
                        detected_time: Some(detected_time),
                        confirm_time: Some(confirm_time),
                        time_to_detect: Some(human(detected_at.duration_since(started))),
                        time_to_confirm: Some(human(confirmed_at.duration_since(started))),
                        time_from_detection_to_confirm: Some(human(confirmed_at.duration_since(detected_at))),
                    };
                }
                log::debug!("{} at {}/{} confirmations", txid, confirmations, required);
            }
            Err(e) => log::warn!("lookup of {} failed, polling again: {}", txid, e),
        }

        sleep(interval).await;
    }
}
