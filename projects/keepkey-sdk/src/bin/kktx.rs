//! kktx: offline transaction dry-run
//!
//! Loads a JSON session snapshot (pubkeys plus canned chain data), builds the
//! unsigned transaction for one request and prints it with a short summary.
//!
//! ```text
//! kktx --session session.json --caip eip155:1/slip44:60 --to 0x... --amount 0.1
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;
use serde::Deserialize;

use keepkey_sdk::offline::{RecordingSigner, StaticProvider};
use keepkey_sdk::sdk::summarize;
use keepkey_sdk::{Caip, KeepKeySdk, PubkeyRecord, SdkConfig, SendAmount, TransferRequest};

#[derive(Parser, Debug)]
#[command(name = "kktx", version, about = "Build an unsigned KeepKey transaction from a session snapshot")]
struct Args {
    /// Session snapshot: {"pubkeys": [...], "provider": {...}}
    #[arg(long)]
    session: PathBuf,

    /// Asset to send, e.g. bip122:000000000019d6689c085ae165831e93/slip44:0
    #[arg(long)]
    caip: String,

    #[arg(long)]
    to: Option<String>,

    /// Decimal amount in whole units
    #[arg(long, required_unless_present = "max", conflicts_with = "max")]
    amount: Option<String>,

    /// Send everything spendable after fees
    #[arg(long)]
    max: bool,

    #[arg(long)]
    memo: Option<String>,

    /// 1-5, 5 is fastest
    #[arg(long, default_value_t = keepkey_sdk::request::DEFAULT_FEE_LEVEL)]
    fee_level: u8,

    /// Config file; defaults to ~/.keepkey/sdk.json when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also run the request through the recording signer
    #[arg(long)]
    sign: bool,
}

#[derive(Debug, Deserialize)]
struct SessionSnapshot {
    pubkeys: Vec<PubkeyRecord>,
    #[serde(default)]
    provider: StaticProvider,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SdkConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => SdkConfig::load_or_default()?,
    };

    let raw = std::fs::read_to_string(&args.session)
        .with_context(|| format!("reading session {}", args.session.display()))?;
    let session: SessionSnapshot = serde_json::from_str(&raw).context("parsing session snapshot")?;

    let caip = Caip::parse(&args.caip)?;
    let mut sdk = KeepKeySdk::new(Arc::new(session.provider), Arc::new(RecordingSigner::new()), config);
    sdk.load_pubkeys(session.pubkeys);
    sdk.set_asset_context(Some(caip.clone()))?;

    let amount = match (&args.amount, args.max) {
        (_, true) => SendAmount::Max,
        (Some(amount), false) => SendAmount::Exact(amount.clone()),
        (None, false) => anyhow::bail!("--amount or --max is required"),
    };
    let mut request = TransferRequest::new(caip.clone(), amount).fee_level(args.fee_level);
    if let Some(to) = &args.to {
        request = request.to(to.clone());
    }
    if let Some(memo) = &args.memo {
        request = request.memo(memo.clone());
    }

    let unsigned = sdk.build_tx(&request).await?;
    println!("{}", serde_json::to_string_pretty(&unsigned)?);

    let summary = summarize(&caip, &unsigned)?;
    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Asset".to_string(), caip.to_string()]);
    table.add_row(vec!["Family".to_string(), summary.family.to_string()]);
    table.add_row(vec![
        "Recipient".to_string(),
        summary.recipient.clone().unwrap_or_else(|| "(deposit)".to_string()),
    ]);
    table.add_row(vec!["Amount".to_string(), summary.amount.clone()]);
    table.add_row(vec!["Fee".to_string(), summary.fee.clone()]);

    if args.sign {
        let signed = sdk.sign_tx(&caip, &unsigned).await?;
        table.add_row(vec!["Signed bytes".to_string(), (signed.serialized_tx.len() / 2).to_string()]);
    }
    eprintln!("{table}");

    Ok(())
}
