//! Block execution and the per-message transaction boundary
//!
//! Every message runs in its own [`TxContext`]. The context's writes reach
//! the ledger state only when the handler succeeds; on any error the
//! context is dropped and the state is exactly as it was before the
//! message.
//!
//! # Example
//!
//! ```no_run
//! use content_settlement::{BlockExecutor, Config, Handler, Msg};
//! use ledger_core::{BlockInfo, LedgerState};
//!
//! fn main() -> content_settlement::Result<()> {
//!     let config = Config::default();
//!     let mut state = LedgerState::from_config(&config.ledger)
//!         .map_err(|e| content_settlement::Error::Config(e.to_string()))?;
//!     let executor = BlockExecutor::new(Handler::with_reference_managers(config.engagement));
//!
//!     let msg = Msg::from_json(r#"{"type":"view","value":{"username":"alice","author":"bob","post_id":"p1"}}"#)?;
//!     let outcome = executor.deliver(&mut state, BlockInfo::new(1, config.ledger.genesis_time), &msg);
//!     println!("{} {}", outcome.code, outcome.log);
//!     Ok(())
//! }
//! ```

use crate::{
    error::Error,
    handler::{Handler, Receipt},
    metrics::Metrics,
    msg::Msg,
};
use ledger_core::{BlockInfo, ErrorCode, LedgerState};
use serde::{Deserialize, Serialize};

/// Result of delivering one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutcome {
    /// Result code, `Ok` on success
    pub code: ErrorCode,
    /// Human-readable detail, empty on success
    pub log: String,
}

impl TxOutcome {
    /// Successful outcome
    pub fn ok() -> Self {
        Self {
            code: ErrorCode::Ok,
            log: String::new(),
        }
    }

    /// Check for success
    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }
}

impl From<&Error> for TxOutcome {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code(),
            log: error_chain(err),
        }
    }
}

fn error_chain(err: &Error) -> String {
    let mut log = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !log.contains(&cause_text) {
            log.push_str(": ");
            log.push_str(&cause_text);
        }
        source = cause.source();
    }
    log
}

/// Executes messages against the ledger state
#[derive(Debug, Clone)]
pub struct BlockExecutor {
    handler: Handler,
    metrics: Option<Metrics>,
}

impl BlockExecutor {
    /// Create executor
    pub fn new(handler: Handler) -> Self {
        Self {
            handler,
            metrics: None,
        }
    }

    /// Record counters on `metrics`
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Metrics, if attached
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Deliver one message, committing its writes only on success
    pub fn deliver(&self, state: &mut LedgerState, block: BlockInfo, msg: &Msg) -> TxOutcome {
        let result = msg.validate_basic().and_then(|()| {
            let mut ctx = state.begin(block);
            let receipt = self.handler.handle(&mut ctx, msg)?;
            Ok((receipt, ctx.into_write_set()))
        });

        match result {
            Ok((receipt, write_set)) => {
                let writes = write_set.len();
                state.apply(write_set);
                tracing::info!(
                    height = block.height,
                    kind = msg.kind(),
                    writes,
                    "Committed message"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_tx("ok");
                    if let Receipt::Donated(donation) = &receipt {
                        metrics.record_donation(donation);
                    }
                }
                TxOutcome::ok()
            }
            Err(err) => {
                let outcome = TxOutcome::from(&err);
                tracing::warn!(
                    height = block.height,
                    kind = msg.kind(),
                    code = outcome.code.as_u32(),
                    error = %outcome.log,
                    "Rejected message"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_tx("rejected");
                }
                outcome
            }
        }
    }

    /// Deliver every message of a block in order
    pub fn execute_block(
        &self,
        state: &mut LedgerState,
        block: BlockInfo,
        msgs: &[Msg],
    ) -> Vec<TxOutcome> {
        let outcomes: Vec<TxOutcome> = msgs
            .iter()
            .map(|msg| self.deliver(state, block, msg))
            .collect();
        tracing::info!(
            height = block.height,
            messages = msgs.len(),
            rejected = outcomes.iter().filter(|o| !o.is_ok()).count(),
            "Executed block"
        );
        outcomes
    }
}
