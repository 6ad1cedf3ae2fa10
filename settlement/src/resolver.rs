//! One-hop repost resolution
//!
//! A repost names its source; the source's own source is never followed.

use ledger_core::{PostKey, PostStore, Rate, Result, TxContext};

/// Resolves repost indirection through the post collaborator
#[derive(Clone, Copy)]
pub struct ReferenceResolver<'a> {
    posts: &'a dyn PostStore,
}

impl std::fmt::Debug for ReferenceResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceResolver").finish_non_exhaustive()
    }
}

impl<'a> ReferenceResolver<'a> {
    /// Create resolver
    pub fn new(posts: &'a dyn PostStore) -> Self {
        Self { posts }
    }

    /// Direct source of `target`, `None` for an original post
    ///
    /// Fails with `PostNotFound` if `target` does not exist.
    pub fn resolve_source(&self, ctx: &TxContext<'_>, target: &PostKey) -> Result<Option<PostKey>> {
        self.posts.source_of(ctx, target)
    }

    /// Split rate configured on `source`
    pub fn split_rate(&self, ctx: &TxContext<'_>, source: &PostKey) -> Result<Rate> {
        self.posts.split_rate_of(ctx, source)
    }

    /// Post an engagement action lands on: the source of a repost, else
    /// the target itself
    pub fn effective_target(&self, ctx: &TxContext<'_>, target: &PostKey) -> Result<PostKey> {
        Ok(self
            .resolve_source(ctx, target)?
            .unwrap_or_else(|| target.clone()))
    }
}
