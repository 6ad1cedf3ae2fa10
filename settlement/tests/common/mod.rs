//! Shared fixtures for settlement integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use content_settlement::{
    config::EngagementConfig,
    msg::{CreatePostMsg, DonateMsg, LikeMsg, ReportOrUpvoteMsg, ViewMsg},
    BlockExecutor, Handler, Metrics, Msg,
};
use ledger_core::{
    config::GenesisAccount, AccountKey, AccountLedger, AccountManager, BlockInfo, Coin, Config,
    FundingPool, GlobalManager, GlobalPool, LedgerState, PostCreateParams, PostKey, PostManager,
    PostStore, Rate, RewardEvent, ScheduledRewardEvent, TxContext,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Genesis time of every fixture
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Block at `height`, at genesis time
pub fn block(height: u64) -> BlockInfo {
    BlockInfo::new(height, t0())
}

/// Genesis state with `(username, saving tokens)` accounts and 1% friction
pub fn genesis(accounts: &[(&str, &str)]) -> LedgerState {
    let config = Config {
        genesis_time: t0(),
        genesis_accounts: accounts
            .iter()
            .map(|(name, saving)| GenesisAccount {
                username: name.to_string(),
                saving: saving.to_string(),
                checking: "0".to_string(),
            })
            .collect(),
        ..Config::default()
    };
    LedgerState::from_config(&config).unwrap()
}

/// Executor over the reference managers with metrics attached
pub fn executor() -> BlockExecutor {
    executor_with(Handler::with_reference_managers(EngagementConfig::default()))
}

/// Executor over `handler` with metrics attached
pub fn executor_with(handler: Handler) -> BlockExecutor {
    BlockExecutor::new(handler).with_metrics(Metrics::new().unwrap())
}

/// Deliver `msg` and assert it committed
pub fn deliver_ok(executor: &BlockExecutor, state: &mut LedgerState, height: u64, msg: Msg) {
    let outcome = executor.deliver(state, block(height), &msg);
    assert!(outcome.is_ok(), "{:?} rejected: {:?}", msg, outcome);
}

pub fn create_post(author: &str, id: &str) -> Msg {
    Msg::CreatePost(CreatePostMsg {
        author: AccountKey::new(author),
        post_id: id.to_string(),
        title: format!("{} by {}", id, author),
        content: "content".to_string(),
        parent: None,
        source: None,
        redistribution_split_rate: None,
    })
}

pub fn create_post_with_rate(author: &str, id: &str, rate: &str) -> Msg {
    let Msg::CreatePost(mut m) = create_post(author, id) else {
        unreachable!()
    };
    m.redistribution_split_rate = Some(rate.to_string());
    Msg::CreatePost(m)
}

pub fn repost(author: &str, id: &str, source: (&str, &str), rate: Option<&str>) -> Msg {
    let Msg::CreatePost(mut m) = create_post(author, id) else {
        unreachable!()
    };
    m.source = Some(PostKey::new(source.0, source.1));
    m.redistribution_split_rate = rate.map(str::to_string);
    Msg::CreatePost(m)
}

pub fn donate(user: &str, amount: &str, author: &str, id: &str) -> Msg {
    donate_from(user, amount, author, id, FundingPool::Saving)
}

pub fn donate_from(user: &str, amount: &str, author: &str, id: &str, pool: FundingPool) -> Msg {
    Msg::Donate(DonateMsg {
        username: AccountKey::new(user),
        amount: amount.to_string(),
        author: AccountKey::new(author),
        post_id: id.to_string(),
        funding_pool: pool,
        from_app: None,
    })
}

pub fn like(user: &str, weight: i64, author: &str, id: &str) -> Msg {
    Msg::Like(LikeMsg {
        username: AccountKey::new(user),
        weight,
        author: AccountKey::new(author),
        post_id: id.to_string(),
    })
}

pub fn view(user: &str, author: &str, id: &str) -> Msg {
    Msg::View(ViewMsg {
        username: AccountKey::new(user),
        author: AccountKey::new(author),
        post_id: id.to_string(),
    })
}

pub fn report_or_upvote(user: &str, author: &str, id: &str, is_report: bool, is_revoke: bool) -> Msg {
    Msg::ReportOrUpvote(ReportOrUpvoteMsg {
        username: AccountKey::new(user),
        author: AccountKey::new(author),
        post_id: id.to_string(),
        is_report,
        is_revoke,
    })
}

pub fn saving(state: &LedgerState, name: &str) -> Coin {
    state.account(&AccountKey::new(name)).unwrap().saving
}

pub fn tokens(amount: &str) -> Coin {
    Coin::from_token_str(amount).unwrap()
}

/// Collaborator call that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Debit,
    SourceOf,
    SplitRateOf,
    FrictionRate,
    RecordDonation,
    Credit,
    AddConsumption,
    DonationCount,
    CreatedTimeAndReward,
    EvaluateConsumption,
    RecordRelationship,
    RegisterReward,
}

impl Step {
    pub const ALL: [Step; 12] = [
        Step::Debit,
        Step::SourceOf,
        Step::SplitRateOf,
        Step::FrictionRate,
        Step::RecordDonation,
        Step::Credit,
        Step::AddConsumption,
        Step::DonationCount,
        Step::CreatedTimeAndReward,
        Step::EvaluateConsumption,
        Step::RecordRelationship,
        Step::RegisterReward,
    ];

    /// Whether the step runs once per leg rather than once per donation
    pub fn is_per_leg(self) -> bool {
        !matches!(self, Step::Debit | Step::SourceOf | Step::SplitRateOf)
    }
}

/// Fails the `nth` call (0-based) of one collaborator step
#[derive(Debug)]
pub struct Fault {
    step: Step,
    nth: usize,
    calls: AtomicUsize,
}

impl Fault {
    pub fn new(step: Step, nth: usize) -> Arc<Self> {
        Arc::new(Self {
            step,
            nth,
            calls: AtomicUsize::new(0),
        })
    }

    fn check(&self, step: Step) -> ledger_core::Result<()> {
        if step != self.step {
            return Ok(());
        }
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.nth {
            return Err(ledger_core::Error::Config(format!("injected fault at {:?}", step)));
        }
        Ok(())
    }
}

/// Account collaborator that fails on demand
#[derive(Debug)]
pub struct FaultyAccounts(pub Arc<Fault>);

impl AccountLedger for FaultyAccounts {
    fn exists(&self, ctx: &TxContext<'_>, key: &AccountKey) -> bool {
        AccountManager.exists(ctx, key)
    }

    fn create_account(
        &self,
        ctx: &mut TxContext<'_>,
        key: &AccountKey,
        saving: Coin,
        checking: Coin,
    ) -> ledger_core::Result<()> {
        AccountManager.create_account(ctx, key, saving, checking)
    }

    fn balance(&self, ctx: &TxContext<'_>, key: &AccountKey, pool: FundingPool) -> ledger_core::Result<Coin> {
        AccountManager.balance(ctx, key, pool)
    }

    fn debit(
        &self,
        ctx: &mut TxContext<'_>,
        key: &AccountKey,
        coin: Coin,
        pool: FundingPool,
    ) -> ledger_core::Result<()> {
        AccountManager.debit(ctx, key, coin, pool)?;
        self.0.check(Step::Debit)
    }

    fn credit(
        &self,
        ctx: &mut TxContext<'_>,
        key: &AccountKey,
        coin: Coin,
        pool: FundingPool,
    ) -> ledger_core::Result<()> {
        AccountManager.credit(ctx, key, coin, pool)?;
        self.0.check(Step::Credit)
    }

    fn donation_count(
        &self,
        ctx: &TxContext<'_>,
        consumer: &AccountKey,
        author: &AccountKey,
    ) -> ledger_core::Result<u64> {
        self.0.check(Step::DonationCount)?;
        AccountManager.donation_count(ctx, consumer, author)
    }

    fn record_donation_relationship(
        &self,
        ctx: &mut TxContext<'_>,
        consumer: &AccountKey,
        author: &AccountKey,
    ) -> ledger_core::Result<()> {
        AccountManager.record_donation_relationship(ctx, consumer, author)?;
        self.0.check(Step::RecordRelationship)
    }

    fn stake_of(&self, ctx: &TxContext<'_>, key: &AccountKey) -> ledger_core::Result<Coin> {
        AccountManager.stake_of(ctx, key)
    }
}

/// Post collaborator that fails on demand
#[derive(Debug)]
pub struct FaultyPosts(pub Arc<Fault>);

impl PostStore for FaultyPosts {
    fn exists(&self, ctx: &TxContext<'_>, key: &PostKey) -> bool {
        PostManager.exists(ctx, key)
    }

    fn create_post(&self, ctx: &mut TxContext<'_>, params: PostCreateParams) -> ledger_core::Result<()> {
        PostManager.create_post(ctx, params)
    }

    fn add_comment(
        &self,
        ctx: &mut TxContext<'_>,
        parent: &PostKey,
        child_author: &AccountKey,
        child_post_id: &str,
    ) -> ledger_core::Result<()> {
        PostManager.add_comment(ctx, parent, child_author, child_post_id)
    }

    fn source_of(&self, ctx: &TxContext<'_>, key: &PostKey) -> ledger_core::Result<Option<PostKey>> {
        self.0.check(Step::SourceOf)?;
        PostManager.source_of(ctx, key)
    }

    fn split_rate_of(&self, ctx: &TxContext<'_>, key: &PostKey) -> ledger_core::Result<Rate> {
        self.0.check(Step::SplitRateOf)?;
        PostManager.split_rate_of(ctx, key)
    }

    fn record_donation(
        &self,
        ctx: &mut TxContext<'_>,
        key: &PostKey,
        consumer: &AccountKey,
        coin: Coin,
    ) -> ledger_core::Result<()> {
        PostManager.record_donation(ctx, key, consumer, coin)?;
        self.0.check(Step::RecordDonation)
    }

    fn created_time_and_reward(
        &self,
        ctx: &TxContext<'_>,
        key: &PostKey,
    ) -> ledger_core::Result<(DateTime<Utc>, Coin)> {
        self.0.check(Step::CreatedTimeAndReward)?;
        PostManager.created_time_and_reward(ctx, key)
    }

    fn upsert_like(
        &self,
        ctx: &mut TxContext<'_>,
        key: &PostKey,
        user: &AccountKey,
        weight: i64,
    ) -> ledger_core::Result<()> {
        PostManager.upsert_like(ctx, key, user, weight)
    }

    fn upsert_view(&self, ctx: &mut TxContext<'_>, key: &PostKey, user: &AccountKey) -> ledger_core::Result<()> {
        PostManager.upsert_view(ctx, key, user)
    }

    fn apply_report_or_upvote(
        &self,
        ctx: &mut TxContext<'_>,
        key: &PostKey,
        user: &AccountKey,
        stake: Coin,
        is_report: bool,
        is_revoke: bool,
    ) -> ledger_core::Result<()> {
        PostManager.apply_report_or_upvote(ctx, key, user, stake, is_report, is_revoke)
    }
}

/// Global collaborator that fails on demand
#[derive(Debug)]
pub struct FaultyGlobal(pub Arc<Fault>);

impl GlobalPool for FaultyGlobal {
    fn consumption_friction_rate(&self, ctx: &TxContext<'_>) -> ledger_core::Result<Rate> {
        self.0.check(Step::FrictionRate)?;
        GlobalManager.consumption_friction_rate(ctx)
    }

    fn add_consumption(&self, ctx: &mut TxContext<'_>, coin: Coin) -> ledger_core::Result<()> {
        GlobalManager.add_consumption(ctx, coin)?;
        self.0.check(Step::AddConsumption)
    }

    fn evaluate_consumption(
        &self,
        ctx: &TxContext<'_>,
        coin: Coin,
        donation_count: u64,
        post_age_secs: u64,
        cumulative_reward: Coin,
    ) -> ledger_core::Result<Coin> {
        self.0.check(Step::EvaluateConsumption)?;
        GlobalManager.evaluate_consumption(ctx, coin, donation_count, post_age_secs, cumulative_reward)
    }

    fn register_reward_event(
        &self,
        ctx: &mut TxContext<'_>,
        event: RewardEvent,
        friction: Coin,
        evaluate: Coin,
    ) -> ledger_core::Result<()> {
        GlobalManager.register_reward_event(ctx, event, friction, evaluate)?;
        self.0.check(Step::RegisterReward)
    }

    fn pending_reward_events(&self, ctx: &TxContext<'_>) -> Vec<ScheduledRewardEvent> {
        GlobalManager.pending_reward_events(ctx)
    }
}

/// Handler whose collaborators share one fault
pub fn faulty_handler(fault: Arc<Fault>) -> Handler {
    Handler::new(
        Arc::new(FaultyAccounts(fault.clone())),
        Arc::new(FaultyPosts(fault.clone())),
        Arc::new(FaultyGlobal(fault)),
        EngagementConfig::default(),
    )
}
