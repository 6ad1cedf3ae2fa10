//! Donation settlement pipeline
//!
//! A donation debits the consumer once and settles the debited amount in
//! one or two legs. A donation to a repost is split with the source post:
//! the source receives `amount × (1 − split_rate)` and the repost keeps the
//! remainder. Each leg retains friction, credits the rest to the author's
//! saving pool, and queues a reward event carrying the leg's evaluated
//! weight.
//!
//! # Invariants
//!
//! - `debited == Σ direct_deposit + Σ friction` across the legs
//! - A zero leg touches no state and emits no event
//! - Every precondition is checked before the first write

use crate::{
    error::{Action, Error, Result},
    msg::DonateMsg,
    resolver::ReferenceResolver,
};
use ledger_core::{
    AccountKey, AccountLedger, Coin, ErrorCode, FundingPool, GlobalPool, PostKey, PostStore,
    RewardEvent, TxContext,
};

/// One settled leg
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledLeg {
    /// Post the leg settled against
    pub post: PostKey,
    /// Gross leg amount
    pub coin: Coin,
    /// Friction retained
    pub friction: Coin,
    /// Amount credited to the author
    pub direct_deposit: Coin,
    /// Evaluated reward weight
    pub evaluate: Coin,
}

/// Result of a settled donation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationReceipt {
    /// Addressed post
    pub target: PostKey,
    /// Amount debited from the consumer
    pub debited: Coin,
    /// Pool the amount was drawn from
    pub funding_pool: FundingPool,
    /// Non-zero legs, source leg first
    pub legs: Vec<SettledLeg>,
    /// Legs skipped because their amount was zero
    pub zero_legs: usize,
}

impl DonationReceipt {
    /// Total friction across legs
    pub fn friction(&self) -> Coin {
        self.legs.iter().map(|leg| leg.friction).sum()
    }

    /// Total credited to authors
    pub fn deposited(&self) -> Coin {
        self.legs.iter().map(|leg| leg.direct_deposit).sum()
    }
}

/// Donation pipeline over the three collaborators
pub struct DonationPipeline<'a> {
    accounts: &'a dyn AccountLedger,
    posts: &'a dyn PostStore,
    global: &'a dyn GlobalPool,
}

impl std::fmt::Debug for DonationPipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DonationPipeline").finish_non_exhaustive()
    }
}

impl<'a> DonationPipeline<'a> {
    /// Create pipeline
    pub fn new(
        accounts: &'a dyn AccountLedger,
        posts: &'a dyn PostStore,
        global: &'a dyn GlobalPool,
    ) -> Self {
        Self {
            accounts,
            posts,
            global,
        }
    }

    /// Settle a donation
    pub fn settle_donation(
        &self,
        ctx: &mut TxContext<'_>,
        msg: &DonateMsg,
    ) -> Result<DonationReceipt> {
        let target = msg.target();
        let consumer = &msg.username;

        let amount = Coin::from_token_str(&msg.amount).map_err(|e| Error::InvalidAmount {
            amount: msg.amount.clone(),
            reason: e.to_string(),
        })?;
        if amount.is_zero() {
            return Err(Error::InvalidAmount {
                amount: msg.amount.clone(),
                reason: "amount must be positive".to_string(),
            });
        }
        if !self.accounts.exists(ctx, consumer) {
            return Err(Error::AccountNotFound(consumer.clone()));
        }
        if !self.posts.exists(ctx, &target) {
            return Err(Error::PostNotFound {
                action: Action::Donate,
                post: target,
            });
        }

        self.accounts
            .debit(ctx, consumer, amount, msg.funding_pool)
            .map_err(|e| match e.code() {
                ErrorCode::InsufficientFunds => Error::InsufficientFunds {
                    post: target.clone(),
                    source: e,
                },
                _ => Error::collaborator(Action::Donate, &target)(e),
            })?;

        let resolver = ReferenceResolver::new(self.posts);
        let source = resolver
            .resolve_source(ctx, &target)
            .map_err(Error::collaborator(Action::Donate, &target))?;

        let mut receipt = DonationReceipt {
            target: target.clone(),
            debited: amount,
            funding_pool: msg.funding_pool,
            legs: Vec::with_capacity(2),
            zero_legs: 0,
        };

        let remainder = match source {
            Some(source) => {
                let rate = resolver
                    .split_rate(ctx, &source)
                    .map_err(Error::collaborator(Action::Donate, &source))?;
                let source_share = amount.mul_rate(rate.complement());
                self.settle_leg(ctx, consumer, source_share, &source, msg, &mut receipt)?;
                amount
                    .minus(source_share)
                    .map_err(Error::collaborator(Action::Donate, &target))?
            }
            None => amount,
        };
        self.settle_leg(ctx, consumer, remainder, &target, msg, &mut receipt)?;

        tracing::debug!(
            consumer = %consumer,
            target = %target,
            amount = %amount,
            legs = receipt.legs.len(),
            "Settled donation"
        );
        Ok(receipt)
    }

    fn settle_leg(
        &self,
        ctx: &mut TxContext<'_>,
        consumer: &AccountKey,
        coin: Coin,
        post: &PostKey,
        msg: &DonateMsg,
        receipt: &mut DonationReceipt,
    ) -> Result<()> {
        if coin.is_zero() {
            receipt.zero_legs += 1;
            tracing::debug!(post = %post, "Skipped zero leg");
            return Ok(());
        }

        let author = &post.author;
        if !self.accounts.exists(ctx, author) {
            return Err(Error::AuthorNotFound {
                action: Action::Donate,
                post: post.clone(),
                author: author.clone(),
            });
        }

        let collaborator = Error::collaborator(Action::Donate, post);
        let leg = self.apply_leg(ctx, consumer, coin, post, msg).map_err(collaborator)?;

        tracing::debug!(
            post = %post,
            coin = %leg.coin,
            friction = %leg.friction,
            direct_deposit = %leg.direct_deposit,
            evaluate = %leg.evaluate,
            "Settled leg"
        );
        receipt.legs.push(leg);
        Ok(())
    }

    fn apply_leg(
        &self,
        ctx: &mut TxContext<'_>,
        consumer: &AccountKey,
        coin: Coin,
        post: &PostKey,
        msg: &DonateMsg,
    ) -> ledger_core::Result<SettledLeg> {
        let author = &post.author;

        let rate = self.global.consumption_friction_rate(ctx)?;
        let friction = coin.mul_rate(rate);
        let direct_deposit = coin.minus(friction)?;

        self.posts.record_donation(ctx, post, consumer, direct_deposit)?;
        self.accounts
            .credit(ctx, author, direct_deposit, FundingPool::Saving)?;
        self.global.add_consumption(ctx, coin)?;

        let donation_count = self.accounts.donation_count(ctx, consumer, author)?;
        let (created_at, cumulative_reward) = self.posts.created_time_and_reward(ctx, post)?;
        let post_age_secs =
            u64::try_from((ctx.block_time() - created_at).num_seconds()).unwrap_or(0);
        let evaluate = self.global.evaluate_consumption(
            ctx,
            coin,
            donation_count,
            post_age_secs,
            cumulative_reward,
        )?;
        self.accounts
            .record_donation_relationship(ctx, consumer, author)?;

        let event = RewardEvent {
            post_author: author.clone(),
            post_id: post.post_id.clone(),
            consumer: consumer.clone(),
            evaluate,
            original: coin,
            friction,
            from_app: msg.from_app.clone(),
        };
        self.global
            .register_reward_event(ctx, event, friction, evaluate)?;

        Ok(SettledLeg {
            post: post.clone(),
            coin,
            friction,
            direct_deposit,
            evaluate,
        })
    }
}
