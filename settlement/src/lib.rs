//! Content Settlement Engine
//!
//! Deterministic settlement of content-economy messages: donations,
//! likes, views, reports and upvotes, and post creation.
//!
//! # Architecture
//!
//! Each message is handled in one pass:
//!
//! 1. **Validation**: Stateless checks on the decoded message
//! 2. **Dispatch**: The [`Handler`] routes the message by kind
//! 3. **Settlement**: Handlers check preconditions, then mutate state only
//!    through the account, post and global collaborators
//! 4. **Commit**: The [`BlockExecutor`] applies the message's writes on
//!    success and discards them on failure
//!
//! # Donation Settlement
//!
//! A donation to a repost resolves the source once and splits the amount:
//! - The source post receives `amount × (1 − split_rate)`
//! - The repost keeps the remainder
//! - Every non-zero leg retains friction and queues a reward event

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod donation;
pub mod engagement;
pub mod error;
pub mod executor;
pub mod handler;
pub mod metrics;
pub mod msg;
pub mod post;
pub mod resolver;

// Re-exports
pub use config::Config;
pub use donation::{DonationPipeline, DonationReceipt, SettledLeg};
pub use engagement::Engagement;
pub use error::{Action, Error, Result};
pub use executor::{BlockExecutor, TxOutcome};
pub use handler::{Handler, Receipt};
pub use metrics::Metrics;
pub use msg::{Msg, MsgEnvelope};
pub use resolver::ReferenceResolver;
