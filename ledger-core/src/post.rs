//! Post collaborator
//!
//! Posts are flat records keyed by `(author, post_id)`. Parent and source
//! references are plain keys; following one is an explicit lookup.

use crate::{
    coin::{Coin, Rate},
    store::TxContext,
    types::{
        AccountKey, DonationRecord, Post, PostCreateParams, PostKey, ReportOrUpvote, ViewMarker,
    },
    Error, Result,
};
use chrono::{DateTime, Utc};

/// Post operations consumed by the settlement handlers
pub trait PostStore: Send + Sync {
    /// Check whether a post exists
    fn exists(&self, ctx: &TxContext<'_>, key: &PostKey) -> bool;

    /// Create a post stamped with the block time
    fn create_post(&self, ctx: &mut TxContext<'_>, params: PostCreateParams) -> Result<()>;

    /// Register `child` as a comment of `parent`
    fn add_comment(
        &self,
        ctx: &mut TxContext<'_>,
        parent: &PostKey,
        child_author: &AccountKey,
        child_post_id: &str,
    ) -> Result<()>;

    /// Direct source of a post, `None` for an original post
    fn source_of(&self, ctx: &TxContext<'_>, key: &PostKey) -> Result<Option<PostKey>>;

    /// Redistribution split rate configured on a post
    fn split_rate_of(&self, ctx: &TxContext<'_>, key: &PostKey) -> Result<Rate>;

    /// Accumulate a donation from `consumer`
    fn record_donation(
        &self,
        ctx: &mut TxContext<'_>,
        key: &PostKey,
        consumer: &AccountKey,
        coin: Coin,
    ) -> Result<()>;

    /// Creation time and inflation reward paid to date
    fn created_time_and_reward(
        &self,
        ctx: &TxContext<'_>,
        key: &PostKey,
    ) -> Result<(DateTime<Utc>, Coin)>;

    /// Set `user`'s like weight, replacing any previous weight
    fn upsert_like(
        &self,
        ctx: &mut TxContext<'_>,
        key: &PostKey,
        user: &AccountKey,
        weight: i64,
    ) -> Result<()>;

    /// Mark the post as viewed by `user` in the current block
    fn upsert_view(&self, ctx: &mut TxContext<'_>, key: &PostKey, user: &AccountKey)
        -> Result<()>;

    /// Record or revoke a stake-weighted report or upvote
    fn apply_report_or_upvote(
        &self,
        ctx: &mut TxContext<'_>,
        key: &PostKey,
        user: &AccountKey,
        stake: Coin,
        is_report: bool,
        is_revoke: bool,
    ) -> Result<()>;
}

/// Reference post manager over the ledger state
#[derive(Debug, Clone, Copy, Default)]
pub struct PostManager;

impl PostManager {
    /// Create post manager
    pub fn new() -> Self {
        Self
    }

    fn post<'c>(&self, ctx: &'c TxContext<'_>, key: &PostKey) -> Result<&'c Post> {
        ctx.post(key).ok_or_else(|| Error::PostNotFound(key.clone()))
    }

    fn post_mut<'c>(&self, ctx: &'c mut TxContext<'_>, key: &PostKey) -> Result<&'c mut Post> {
        ctx.post_mut(key)
            .ok_or_else(|| Error::PostNotFound(key.clone()))
    }
}

impl PostStore for PostManager {
    fn exists(&self, ctx: &TxContext<'_>, key: &PostKey) -> bool {
        ctx.has_post(key)
    }

    fn create_post(&self, ctx: &mut TxContext<'_>, params: PostCreateParams) -> Result<()> {
        if ctx.has_post(&params.key) {
            return Err(Error::PostAlreadyExists(params.key));
        }

        let post = Post::new(params, ctx.block_time());
        tracing::debug!(post = %post.key, source = ?post.source, "Created post");
        ctx.put_post(post);
        Ok(())
    }

    fn add_comment(
        &self,
        ctx: &mut TxContext<'_>,
        parent: &PostKey,
        child_author: &AccountKey,
        child_post_id: &str,
    ) -> Result<()> {
        let post = self.post_mut(ctx, parent)?;
        post.comments
            .insert(PostKey::new(child_author.clone(), child_post_id));
        Ok(())
    }

    fn source_of(&self, ctx: &TxContext<'_>, key: &PostKey) -> Result<Option<PostKey>> {
        Ok(self.post(ctx, key)?.source.clone())
    }

    fn split_rate_of(&self, ctx: &TxContext<'_>, key: &PostKey) -> Result<Rate> {
        self.post(ctx, key)?
            .redistribution_split_rate
            .ok_or_else(|| Error::SplitRateNotFound(key.clone()))
    }

    fn record_donation(
        &self,
        ctx: &mut TxContext<'_>,
        key: &PostKey,
        consumer: &AccountKey,
        coin: Coin,
    ) -> Result<()> {
        let post = self.post_mut(ctx, key)?;
        let record = post
            .donations
            .entry(consumer.clone())
            .or_insert_with(DonationRecord::default);
        record.times += 1;
        record.amount += coin;
        post.total_donation += coin;
        Ok(())
    }

    fn created_time_and_reward(
        &self,
        ctx: &TxContext<'_>,
        key: &PostKey,
    ) -> Result<(DateTime<Utc>, Coin)> {
        let post = self.post(ctx, key)?;
        Ok((post.created_at, post.total_reward))
    }

    fn upsert_like(
        &self,
        ctx: &mut TxContext<'_>,
        key: &PostKey,
        user: &AccountKey,
        weight: i64,
    ) -> Result<()> {
        let post = self.post_mut(ctx, key)?;
        let previous = post.likes.get(user).copied().unwrap_or(0);
        let total = post
            .total_like_weight
            .checked_sub(previous)
            .and_then(|total| total.checked_add(weight))
            .ok_or_else(|| {
                Error::InvalidAmount(format!("like weight {} overflows total on {}", weight, key))
            })?;
        post.likes.insert(user.clone(), weight);
        post.total_like_weight = total;
        Ok(())
    }

    fn upsert_view(
        &self,
        ctx: &mut TxContext<'_>,
        key: &PostKey,
        user: &AccountKey,
    ) -> Result<()> {
        let height = ctx.block().height;
        let post = self.post_mut(ctx, key)?;
        post.views.insert(
            user.clone(),
            ViewMarker {
                last_height: height,
            },
        );
        Ok(())
    }

    fn apply_report_or_upvote(
        &self,
        ctx: &mut TxContext<'_>,
        key: &PostKey,
        user: &AccountKey,
        stake: Coin,
        is_report: bool,
        is_revoke: bool,
    ) -> Result<()> {
        let post = self.post_mut(ctx, key)?;

        if is_revoke {
            let previous = post.report_or_upvotes.remove(user).ok_or_else(|| {
                Error::ReportOrUpvoteNotFound {
                    post: key.clone(),
                    user: user.clone(),
                }
            })?;
            // Remove exactly what was recorded, not the current stake.
            let total = if previous.is_report {
                &mut post.total_report_stake
            } else {
                &mut post.total_upvote_stake
            };
            *total = total.minus(previous.stake)?;
            return Ok(());
        }

        if post.report_or_upvotes.contains_key(user) {
            return Err(Error::ReportOrUpvoteAlreadyExists {
                post: key.clone(),
                user: user.clone(),
            });
        }

        post.report_or_upvotes
            .insert(user.clone(), ReportOrUpvote { stake, is_report });
        if is_report {
            post.total_report_stake += stake;
        } else {
            post.total_upvote_stake += stake;
        }
        Ok(())
    }
}
