//! Message dispatcher
//!
//! Routes one decoded message to its handler. Handlers read and write only
//! through the collaborators and the transactional context they are given.

use crate::{
    config::EngagementConfig,
    donation::{DonationPipeline, DonationReceipt},
    engagement::Engagement,
    error::{Error, Result},
    msg::Msg,
    post,
};
use ledger_core::{
    AccountLedger, AccountManager, GlobalManager, GlobalPool, PostKey, PostManager, PostStore,
    TxContext,
};
use std::sync::Arc;

/// Effects of a handled message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receipt {
    /// Post created
    PostCreated(PostKey),
    /// Donation settled
    Donated(DonationReceipt),
    /// Like recorded on the effective target
    Liked(PostKey),
    /// View recorded on the effective target
    Viewed(PostKey),
    /// Report or upvote applied to the effective target
    ReportedOrUpvoted(PostKey),
}

/// Message dispatcher
#[derive(Clone)]
pub struct Handler {
    accounts: Arc<dyn AccountLedger>,
    posts: Arc<dyn PostStore>,
    global: Arc<dyn GlobalPool>,
    engagement: EngagementConfig,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("engagement", &self.engagement)
            .finish_non_exhaustive()
    }
}

impl Handler {
    /// Create dispatcher over the given collaborators
    pub fn new(
        accounts: Arc<dyn AccountLedger>,
        posts: Arc<dyn PostStore>,
        global: Arc<dyn GlobalPool>,
        engagement: EngagementConfig,
    ) -> Self {
        Self {
            accounts,
            posts,
            global,
            engagement,
        }
    }

    /// Create dispatcher over the reference managers
    pub fn with_reference_managers(engagement: EngagementConfig) -> Self {
        Self::new(
            Arc::new(AccountManager::new()),
            Arc::new(PostManager::new()),
            Arc::new(GlobalManager::new()),
            engagement,
        )
    }

    /// Handle one message
    pub fn handle(&self, ctx: &mut TxContext<'_>, msg: &Msg) -> Result<Receipt> {
        match msg {
            Msg::CreatePost(m) => {
                post::create_post(self.accounts.as_ref(), self.posts.as_ref(), ctx, m)
                    .map(Receipt::PostCreated)
            }
            Msg::Donate(m) => DonationPipeline::new(
                self.accounts.as_ref(),
                self.posts.as_ref(),
                self.global.as_ref(),
            )
            .settle_donation(ctx, m)
            .map(Receipt::Donated),
            Msg::Like(m) => self.engagement().like(ctx, m).map(Receipt::Liked),
            Msg::View(m) => self.engagement().view(ctx, m).map(Receipt::Viewed),
            Msg::ReportOrUpvote(m) => self
                .engagement()
                .report_or_upvote(ctx, m)
                .map(Receipt::ReportedOrUpvoted),
            Msg::Unrecognized { kind } => Err(Error::UnrecognizedMessage(kind.clone())),
        }
    }

    fn engagement(&self) -> Engagement<'_> {
        Engagement::new(
            self.accounts.as_ref(),
            self.posts.as_ref(),
            self.engagement.allow_report_revoke,
        )
    }
}
