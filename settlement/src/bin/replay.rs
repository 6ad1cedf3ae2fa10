//! Replay a message log against genesis state
//!
//! Usage: `settlement-replay <config.toml> <messages.jsonl>`
//!
//! Each line of the log is one message envelope plus the block it runs in:
//!
//! ```text
//! {"height":1,"time":"2024-01-01T00:00:00Z","type":"donate","value":{...}}
//! ```
//!
//! Prints one outcome per line and the final state root.

use anyhow::Context;
use chrono::{DateTime, Utc};
use content_settlement::{BlockExecutor, Config, Handler, Metrics, Msg, MsgEnvelope};
use ledger_core::{BlockInfo, LedgerState};
use serde::Deserialize;
use std::io::BufRead;

#[derive(Debug, Deserialize)]
struct ReplayLine {
    height: u64,
    time: DateTime<Utc>,
    #[serde(flatten)]
    envelope: MsgEnvelope,
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let (config_path, log_path) = match (args.next(), args.next()) {
        (Some(config), Some(log)) => (config, log),
        _ => anyhow::bail!("usage: settlement-replay <config.toml> <messages.jsonl>"),
    };

    let config = Config::from_file(&config_path)
        .with_context(|| format!("loading config {}", config_path))?;
    init_tracing(&config);
    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Starting replay"
    );

    let mut state = LedgerState::from_config(&config.ledger).context("building genesis state")?;
    let metrics = Metrics::new().context("registering metrics")?;
    let executor = BlockExecutor::new(Handler::with_reference_managers(config.engagement.clone()))
        .with_metrics(metrics);

    let file = std::fs::File::open(&log_path).with_context(|| format!("opening {}", log_path))?;
    let mut delivered = 0usize;
    for (index, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", log_path))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: ReplayLine = serde_json::from_str(&line)
            .with_context(|| format!("line {}: malformed entry", index + 1))?;
        let block = BlockInfo::new(entry.height, entry.time);

        let outcome = match Msg::decode(entry.envelope) {
            Ok(msg) => executor.deliver(&mut state, block, &msg),
            Err(err) => (&err).into(),
        };
        println!("{}\t{}\t{}", index + 1, outcome.code, outcome.log);
        delivered += 1;
    }

    let root = state.state_root().context("computing state root")?;
    tracing::info!(
        messages = delivered,
        accounts = state.account_count(),
        posts = state.post_count(),
        supply = %state.total_supply(),
        "Replay finished"
    );
    println!("state_root\t{}", hex::encode(root));
    Ok(())
}
