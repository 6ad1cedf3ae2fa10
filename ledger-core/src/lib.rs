//! Content Ledger Core
//!
//! Deterministic ledger state for the content economy: coin and rate
//! arithmetic, account and post records, global economic state, and the
//! account, post and global collaborators the settlement handlers call into.
//!
//! # Architecture
//!
//! - **Ordered state**: Every keyspace is a `BTreeMap`; the canonical encoding
//!   is identical on every node
//! - **Transactional context**: Handlers write into a copy-on-write overlay
//!   that is applied only when the message succeeds
//! - **Collaborator traits**: `AccountLedger`, `PostStore` and `GlobalPool`
//!   are the only mutation paths into the state
//!
//! # Invariants
//!
//! - Supply conservation: Σ(balances) + friction pool changes only at genesis
//! - Deterministic replay: Same messages → same state root
//! - No negative coin: subtraction below zero is an error, never a clamp
//! - No wall clock: the only time source is the block time

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod account;
pub mod coin;
pub mod config;
pub mod error;
pub mod global;
pub mod post;
pub mod store;
pub mod types;

// Re-exports
pub use account::{AccountLedger, AccountManager};
pub use coin::{Coin, Rate};
pub use config::Config;
pub use error::{Error, ErrorCode, Result};
pub use global::{GlobalManager, GlobalPool};
pub use post::{PostManager, PostStore};
pub use store::{LedgerState, TxContext, WriteSet};
pub use types::{
    Account, AccountKey, BlockInfo, FundingPool, GlobalParams, GlobalState, Post,
    PostCreateParams, PostKey, RewardEvent, RewardEventKey, ScheduledRewardEvent,
};
