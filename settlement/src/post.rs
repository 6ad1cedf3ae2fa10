//! Create-post handler

use crate::{
    error::{Action, Error, Result},
    msg::CreatePostMsg,
};
use ledger_core::{AccountLedger, PostCreateParams, PostKey, PostStore, Rate, TxContext};
use std::str::FromStr;

/// Create a post, registering it with its comment-tree parent
pub fn create_post(
    accounts: &dyn AccountLedger,
    posts: &dyn PostStore,
    ctx: &mut TxContext<'_>,
    msg: &CreatePostMsg,
) -> Result<PostKey> {
    let key = msg.key();

    if !accounts.exists(ctx, &msg.author) {
        return Err(Error::AuthorNotFound {
            action: Action::CreatePost,
            post: key,
            author: msg.author.clone(),
        });
    }
    if posts.exists(ctx, &key) {
        return Err(Error::PostAlreadyExists(key));
    }
    if let Some(parent) = &msg.parent {
        if !posts.exists(ctx, parent) {
            return Err(Error::InvalidParent(parent.clone()));
        }
    }
    if let Some(source) = &msg.source {
        if !posts.exists(ctx, source) {
            return Err(Error::InvalidSource(source.clone()));
        }
    }
    let redistribution_split_rate = msg
        .redistribution_split_rate
        .as_deref()
        .map(Rate::from_str)
        .transpose()
        .map_err(Error::InvalidRate)?;

    if let Some(parent) = &msg.parent {
        posts
            .add_comment(ctx, parent, &msg.author, &msg.post_id)
            .map_err(Error::collaborator(Action::CreatePost, &key))?;
    }

    let params = PostCreateParams {
        key: key.clone(),
        title: msg.title.clone(),
        content: msg.content.clone(),
        parent: msg.parent.clone(),
        source: msg.source.clone(),
        redistribution_split_rate,
    };
    posts
        .create_post(ctx, params)
        .map_err(Error::collaborator(Action::CreatePost, &key))?;

    Ok(key)
}
