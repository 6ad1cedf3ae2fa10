//! Like, view and report-or-upvote resolution
//!
//! Each action resolves repost indirection once and lands in full on the
//! effective target.

use crate::{
    error::{Action, Error, Result},
    msg::{LikeMsg, ReportOrUpvoteMsg, ViewMsg},
    resolver::ReferenceResolver,
};
use ledger_core::{AccountKey, AccountLedger, PostKey, PostStore, TxContext};

/// Engagement handlers over the account and post collaborators
pub struct Engagement<'a> {
    accounts: &'a dyn AccountLedger,
    posts: &'a dyn PostStore,
    allow_report_revoke: bool,
}

impl std::fmt::Debug for Engagement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engagement")
            .field("allow_report_revoke", &self.allow_report_revoke)
            .finish_non_exhaustive()
    }
}

impl<'a> Engagement<'a> {
    /// Create engagement handlers
    pub fn new(
        accounts: &'a dyn AccountLedger,
        posts: &'a dyn PostStore,
        allow_report_revoke: bool,
    ) -> Self {
        Self {
            accounts,
            posts,
            allow_report_revoke,
        }
    }

    /// Set the user's like weight on the effective target
    pub fn like(&self, ctx: &mut TxContext<'_>, msg: &LikeMsg) -> Result<PostKey> {
        let post =
            self.effective_target(ctx, Action::Like, &msg.username, &msg.author, &msg.post_id)?;
        self.posts
            .upsert_like(ctx, &post, &msg.username, msg.weight)
            .map_err(Error::collaborator(Action::Like, &post))?;
        tracing::debug!(user = %msg.username, post = %post, weight = msg.weight, "Recorded like");
        Ok(post)
    }

    /// Mark the effective target as viewed
    pub fn view(&self, ctx: &mut TxContext<'_>, msg: &ViewMsg) -> Result<PostKey> {
        let post =
            self.effective_target(ctx, Action::View, &msg.username, &msg.author, &msg.post_id)?;
        self.posts
            .upsert_view(ctx, &post, &msg.username)
            .map_err(Error::collaborator(Action::View, &post))?;
        tracing::debug!(user = %msg.username, post = %post, "Recorded view");
        Ok(post)
    }

    /// Record or revoke a stake-weighted report or upvote
    pub fn report_or_upvote(
        &self,
        ctx: &mut TxContext<'_>,
        msg: &ReportOrUpvoteMsg,
    ) -> Result<PostKey> {
        if msg.is_revoke && !self.allow_report_revoke {
            return Err(Error::RevokeNotSupported);
        }

        let action = Action::ReportOrUpvote;
        let post = self.effective_target(ctx, action, &msg.username, &msg.author, &msg.post_id)?;
        let stake = self
            .accounts
            .stake_of(ctx, &msg.username)
            .map_err(Error::collaborator(action, &post))?;

        self.posts
            .apply_report_or_upvote(ctx, &post, &msg.username, stake, msg.is_report, msg.is_revoke)
            .map_err(Error::collaborator(action, &post))?;

        tracing::debug!(
            user = %msg.username,
            post = %post,
            stake = %stake,
            is_report = msg.is_report,
            is_revoke = msg.is_revoke,
            "Applied report or upvote"
        );
        Ok(post)
    }

    fn effective_target(
        &self,
        ctx: &TxContext<'_>,
        action: Action,
        user: &AccountKey,
        author: &AccountKey,
        post_id: &str,
    ) -> Result<PostKey> {
        if !self.accounts.exists(ctx, user) {
            return Err(Error::UserNotFound {
                action,
                user: user.clone(),
            });
        }

        let target = PostKey::new(author.clone(), post_id);
        if !self.posts.exists(ctx, &target) {
            return Err(Error::PostNotFound {
                action,
                post: target,
            });
        }

        ReferenceResolver::new(self.posts)
            .effective_target(ctx, &target)
            .map_err(Error::collaborator(action, &target))
    }
}
