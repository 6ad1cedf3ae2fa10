//! Error types for the settlement handlers

use ledger_core::{AccountKey, ErrorCode, PostKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message kind an error arose in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Create post
    CreatePost,
    /// Donate
    Donate,
    /// Like
    Like,
    /// View
    View,
    /// Report or upvote
    ReportOrUpvote,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::CreatePost => "create post",
            Action::Donate => "donate",
            Action::Like => "like",
            Action::View => "view",
            Action::ReportOrUpvote => "report or upvote",
        };
        write!(f, "{}", name)
    }
}

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Stateless validation failed
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// No handler for the message kind
    #[error("Unrecognized message type: {0}")]
    UnrecognizedMessage(String),

    /// Donation amount is not a positive coin amount
    #[error("Invalid amount {amount:?}: {reason}")]
    InvalidAmount {
        /// Amount as received
        amount: String,
        /// Why it was rejected
        reason: String,
    },

    /// Donating account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(AccountKey),

    /// Engaging user does not exist
    #[error("{action}: user not found: {user}")]
    UserNotFound {
        /// Message kind
        action: Action,
        /// Missing user
        user: AccountKey,
    },

    /// Addressed post does not exist
    #[error("{action}: post not found: {post}")]
    PostNotFound {
        /// Message kind
        action: Action,
        /// Missing post
        post: PostKey,
    },

    /// Author account of a post does not exist
    #[error("{action}: author {author} of {post} not found")]
    AuthorNotFound {
        /// Message kind
        action: Action,
        /// Post being settled or created
        post: PostKey,
        /// Missing author
        author: AccountKey,
    },

    /// Consumer balance too low for the donation
    #[error("Insufficient funds to donate to {post}: {source}")]
    InsufficientFunds {
        /// Addressed post
        post: PostKey,
        /// Account-level failure
        #[source]
        source: ledger_core::Error,
    },

    /// Post key already taken
    #[error("Post already exists: {0}")]
    PostAlreadyExists(PostKey),

    /// Comment parent does not exist
    #[error("Invalid parent post: {0}")]
    InvalidParent(PostKey),

    /// Shared source post does not exist
    #[error("Invalid source post: {0}")]
    InvalidSource(PostKey),

    /// Redistribution split rate is malformed
    #[error("Invalid redistribution split rate: {0}")]
    InvalidRate(#[source] ledger_core::Error),

    /// Revocation disabled by configuration
    #[error("Report or upvote revocation is not supported")]
    RevokeNotSupported,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Collaborator failure, propagated with its cause
    #[error("{action} on {post} failed: {source}")]
    Collaborator {
        /// Message kind
        action: Action,
        /// Post being processed
        post: PostKey,
        /// Underlying failure
        #[source]
        source: ledger_core::Error,
    },
}

impl Error {
    /// Stable code for this error
    ///
    /// Collaborator failures keep the collaborator's own code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidMessage(_) => ErrorCode::InvalidMessage,
            Error::UnrecognizedMessage(_) => ErrorCode::UnrecognizedMessage,
            Error::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            Error::AccountNotFound(_) => ErrorCode::AccountNotFound,
            Error::UserNotFound { .. } => ErrorCode::UserNotFound,
            Error::PostNotFound { .. } => ErrorCode::PostNotFound,
            Error::AuthorNotFound { .. } => ErrorCode::AuthorNotFound,
            Error::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            Error::PostAlreadyExists(_) => ErrorCode::PostAlreadyExists,
            Error::InvalidParent(_) => ErrorCode::InvalidParent,
            Error::InvalidSource(_) => ErrorCode::InvalidSource,
            Error::InvalidRate(_) => ErrorCode::InvalidRate,
            Error::RevokeNotSupported => ErrorCode::RevokeNotSupported,
            Error::Config(_) => ErrorCode::Internal,
            Error::Collaborator { source, .. } => source.code(),
        }
    }

    /// Wrap a collaborator failure
    pub(crate) fn collaborator(
        action: Action,
        post: &PostKey,
    ) -> impl FnOnce(ledger_core::Error) -> Error + '_ {
        move |source| Error::Collaborator {
            action,
            post: post.clone(),
            source,
        }
    }
}
