//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode over ordered maps)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (integer coins, decimal rates)

use crate::coin::{Coin, Rate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Account name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountKey(String);

impl AccountKey {
    /// Create new account key
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Immutable `(author, post_id)` reference to a post
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostKey {
    /// Post author
    pub author: AccountKey,
    /// Author-scoped post identifier
    pub post_id: String,
}

impl PostKey {
    /// Create new post key
    pub fn new(author: impl Into<AccountKey>, post_id: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            post_id: post_id.into(),
        }
    }
}

impl fmt::Display for PostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.author, self.post_id)
    }
}

/// Balance pool a debit or credit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingPool {
    /// Spendable balance
    Checking,
    /// Savings balance; also the account's stake
    Saving,
}

impl fmt::Display for FundingPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundingPool::Checking => write!(f, "checking"),
            FundingPool::Saving => write!(f, "saving"),
        }
    }
}

/// Block the current message executes in
///
/// Block time is agreed by consensus; it is the only clock the ledger reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Block height
    pub height: u64,
    /// Block time
    pub time: DateTime<Utc>,
}

impl BlockInfo {
    /// Create block info
    pub fn new(height: u64, time: DateTime<Utc>) -> Self {
        Self { height, time }
    }
}

/// Account record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account name
    pub username: AccountKey,
    /// Savings balance
    pub saving: Coin,
    /// Checking balance
    pub checking: Coin,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Number of donations this account made to each author
    pub donation_relationships: BTreeMap<AccountKey, u64>,
}

impl Account {
    /// Balance of one pool
    pub fn balance(&self, pool: FundingPool) -> Coin {
        match pool {
            FundingPool::Checking => self.checking,
            FundingPool::Saving => self.saving,
        }
    }

    /// Mutable balance of one pool
    pub fn balance_mut(&mut self, pool: FundingPool) -> &mut Coin {
        match pool {
            FundingPool::Checking => &mut self.checking,
            FundingPool::Saving => &mut self.saving,
        }
    }

    /// Sum of both pools
    pub fn total_balance(&self) -> Coin {
        self.saving + self.checking
    }
}

/// Parameters for creating a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCreateParams {
    /// Post reference
    pub key: PostKey,
    /// Title
    pub title: String,
    /// Body
    pub content: String,
    /// Comment-tree parent
    pub parent: Option<PostKey>,
    /// Shared post, when this post is a repost
    pub source: Option<PostKey>,
    /// Fraction of donations to reposts of this post kept by the reposter
    pub redistribution_split_rate: Option<Rate>,
}

/// Accumulated donations from one consumer to one post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecord {
    /// Number of donations
    pub times: u64,
    /// Total deposited amount
    pub amount: Coin,
}

/// Last view of a post by one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMarker {
    /// Height of the block the latest view was recorded in
    pub last_height: u64,
}

/// Stake-weighted report or upvote by one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOrUpvote {
    /// Stake captured when the action was recorded
    pub stake: Coin,
    /// `true` for a report, `false` for an upvote
    pub is_report: bool,
}

/// Post record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post reference
    pub key: PostKey,
    /// Title
    pub title: String,
    /// Body
    pub content: String,
    /// Creation time (block time)
    pub created_at: DateTime<Utc>,
    /// Comment-tree parent
    pub parent: Option<PostKey>,
    /// Shared post
    pub source: Option<PostKey>,
    /// Redistribution split rate
    pub redistribution_split_rate: Option<Rate>,
    /// Direct comments
    pub comments: BTreeSet<PostKey>,
    /// Donations by consumer
    pub donations: BTreeMap<AccountKey, DonationRecord>,
    /// Total direct deposits
    pub total_donation: Coin,
    /// Inflation reward paid to date
    pub total_reward: Coin,
    /// Like weight by user
    pub likes: BTreeMap<AccountKey, i64>,
    /// Sum of like weights
    pub total_like_weight: i64,
    /// View markers by user
    pub views: BTreeMap<AccountKey, ViewMarker>,
    /// Reports and upvotes by user
    pub report_or_upvotes: BTreeMap<AccountKey, ReportOrUpvote>,
    /// Stake behind reports
    pub total_report_stake: Coin,
    /// Stake behind upvotes
    pub total_upvote_stake: Coin,
}

impl Post {
    /// Fresh post from creation parameters
    pub fn new(params: PostCreateParams, created_at: DateTime<Utc>) -> Self {
        Self {
            key: params.key,
            title: params.title,
            content: params.content,
            created_at,
            parent: params.parent,
            source: params.source,
            redistribution_split_rate: params.redistribution_split_rate,
            comments: BTreeSet::new(),
            donations: BTreeMap::new(),
            total_donation: Coin::ZERO,
            total_reward: Coin::ZERO,
            likes: BTreeMap::new(),
            total_like_weight: 0,
            views: BTreeMap::new(),
            report_or_upvotes: BTreeMap::new(),
            total_report_stake: Coin::ZERO,
            total_upvote_stake: Coin::ZERO,
        }
    }

    /// Number of distinct viewers
    pub fn viewer_count(&self) -> usize {
        self.views.len()
    }
}

/// Record of one friction-eligible settlement leg, queued for inflation
/// processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEvent {
    /// Author credited by the leg
    pub post_author: AccountKey,
    /// Post the leg settled against
    pub post_id: String,
    /// Donating account
    pub consumer: AccountKey,
    /// Evaluated reward weight
    pub evaluate: Coin,
    /// Gross leg amount
    pub original: Coin,
    /// Friction retained from the leg
    pub friction: Coin,
    /// Application the donation was made through
    pub from_app: Option<AccountKey>,
}

/// Position of a queued reward event: due time, then queue order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RewardEventKey {
    /// Earliest time the event may be processed
    pub due_at: DateTime<Utc>,
    /// Global queue sequence number
    pub seq: u64,
}

/// Reward event waiting for the inflation drain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRewardEvent {
    /// Earliest time the event may be processed
    pub due_at: DateTime<Utc>,
    /// The event
    pub event: RewardEvent,
}

/// Reward evaluation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluateParams {
    /// Post age at which evaluated weight is halved (seconds)
    pub time_half_life_secs: u64,
    /// Cumulative post reward at which evaluated weight is halved
    pub reward_saturation: Coin,
    /// Prior donations to the same author at which evaluated weight is halved
    pub repeat_donation_threshold: u64,
}

impl Default for EvaluateParams {
    fn default() -> Self {
        Self {
            time_half_life_secs: 7 * 24 * 3600,           // one week
            reward_saturation: Coin::from_tokens(10_000),
            repeat_donation_threshold: 10,
        }
    }
}

/// Protocol-wide economic parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalParams {
    /// Fraction of every settled leg retained as friction
    pub consumption_friction_rate: Rate,
    /// Delay before a reward event becomes due (seconds)
    pub reward_event_delay_secs: u64,
    /// Reward evaluation parameters
    pub evaluate: EvaluateParams,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            consumption_friction_rate: Rate::ONE_PERCENT,
            reward_event_delay_secs: 7 * 24 * 3600,
            evaluate: EvaluateParams::default(),
        }
    }
}

/// Global economic state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    /// Economic parameters
    pub params: GlobalParams,
    /// Gross consumption in the current window
    pub consumption_window: Coin,
    /// Friction retained from donations
    pub friction_pool: Coin,
    /// Evaluated weight registered in the current window
    pub window_evaluated_weight: Coin,
    /// Sequence number assigned to the next queued reward event
    pub next_reward_event_seq: u64,
}

impl GlobalState {
    /// Fresh global state
    pub fn new(params: GlobalParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }
}
