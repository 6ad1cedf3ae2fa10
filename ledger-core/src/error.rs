//! Error types for the ledger

use crate::coin::Coin;
use crate::types::{AccountKey, FundingPool, PostKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stable result codes reported for every transaction
///
/// Codes are part of the replicated transaction result and must never be
/// renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ErrorCode {
    /// Success
    Ok = 0,
    /// Message failed stateless validation
    InvalidMessage = 1,
    /// Message kind has no handler
    UnrecognizedMessage = 2,
    /// Amount string is not a valid coin amount
    InvalidAmount = 3,
    /// Rate is outside `[0, 1]` or too precise
    InvalidRate = 4,

    /// Acting account does not exist
    AccountNotFound = 100,
    /// Post author account does not exist
    AuthorNotFound = 101,
    /// Engaging user does not exist
    UserNotFound = 102,
    /// Account name taken
    AccountAlreadyExists = 103,

    /// Post does not exist
    PostNotFound = 200,
    /// Post key taken
    PostAlreadyExists = 201,
    /// Comment parent does not exist
    InvalidParent = 202,
    /// Shared source post does not exist
    InvalidSource = 203,
    /// Post has no redistribution split rate
    SplitRateNotFound = 204,

    /// Balance too low for a debit
    InsufficientFunds = 300,
    /// Coin arithmetic would go negative
    NegativeCoin = 301,

    /// User already reported or upvoted the post
    ReportOrUpvoteAlreadyExists = 400,
    /// Nothing to revoke
    ReportOrUpvoteNotFound = 401,
    /// Revocation disabled by configuration
    RevokeNotSupported = 402,

    /// Internal failure (serialization, configuration, IO)
    Internal = 500,
}

impl ErrorCode {
    /// Numeric code
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Check for success
    pub fn is_ok(self) -> bool {
        self == ErrorCode::Ok
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.as_u32())
    }
}

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed or out-of-range rate
    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    /// Subtraction below zero
    #[error("Coin subtraction would go negative: {minuend} - {subtrahend}")]
    NegativeCoin {
        /// Left operand
        minuend: Coin,
        /// Right operand
        subtrahend: Coin,
    },

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(AccountKey),

    /// Account already exists
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(AccountKey),

    /// Balance too low
    #[error("Insufficient funds in {account} {pool}: available {available}, required {required}")]
    InsufficientFunds {
        /// Debited account
        account: AccountKey,
        /// Debited pool
        pool: FundingPool,
        /// Balance before the debit
        available: Coin,
        /// Requested debit
        required: Coin,
    },

    /// Post not found
    #[error("Post not found: {0}")]
    PostNotFound(PostKey),

    /// Post already exists
    #[error("Post already exists: {0}")]
    PostAlreadyExists(PostKey),

    /// No redistribution split rate configured on the post
    #[error("Redistribution split rate not found for post {0}")]
    SplitRateNotFound(PostKey),

    /// Duplicate report or upvote
    #[error("{user} already reported or upvoted {post}")]
    ReportOrUpvoteAlreadyExists {
        /// Target post
        post: PostKey,
        /// Acting user
        user: AccountKey,
    },

    /// Revoke without a prior report or upvote
    #[error("{user} has no report or upvote on {post} to revoke")]
    ReportOrUpvoteNotFound {
        /// Target post
        post: PostKey,
        /// Acting user
        user: AccountKey,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidAmount(_) => ErrorCode::InvalidAmount,
            Error::InvalidRate(_) => ErrorCode::InvalidRate,
            Error::NegativeCoin { .. } => ErrorCode::NegativeCoin,
            Error::AccountNotFound(_) => ErrorCode::AccountNotFound,
            Error::AccountAlreadyExists(_) => ErrorCode::AccountAlreadyExists,
            Error::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            Error::PostNotFound(_) => ErrorCode::PostNotFound,
            Error::PostAlreadyExists(_) => ErrorCode::PostAlreadyExists,
            Error::SplitRateNotFound(_) => ErrorCode::SplitRateNotFound,
            Error::ReportOrUpvoteAlreadyExists { .. } => ErrorCode::ReportOrUpvoteAlreadyExists,
            Error::ReportOrUpvoteNotFound { .. } => ErrorCode::ReportOrUpvoteNotFound,
            Error::Serialization(_) | Error::Config(_) | Error::Io(_) => ErrorCode::Internal,
        }
    }
}
