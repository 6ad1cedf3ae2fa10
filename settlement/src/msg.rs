//! Settlement messages
//!
//! Messages travel as a tagged envelope `{"type": <kind>, "value": {...}}`.
//! Decoding an envelope with an unknown kind yields [`Msg::Unrecognized`]
//! so the dispatcher can reject it with a result code instead of failing
//! the whole block.

use crate::error::{Error, Result};
use ledger_core::{AccountKey, FundingPool, PostKey};
use serde::{Deserialize, Serialize};

/// Username length bounds, in characters
pub const USERNAME_LEN: (usize, usize) = (3, 20);
/// Post id length bounds, in characters
pub const POST_ID_LEN: (usize, usize) = (1, 64);
/// Maximum title length, in characters
pub const MAX_TITLE_LEN: usize = 50;
/// Maximum content length, in characters
pub const MAX_CONTENT_LEN: usize = 1000;
/// Absolute bound of a like weight
pub const MAX_LIKE_WEIGHT: i64 = 10_000;

/// Kind tag of [`CreatePostMsg`]
pub const KIND_CREATE_POST: &str = "create_post";
/// Kind tag of [`DonateMsg`]
pub const KIND_DONATE: &str = "donate";
/// Kind tag of [`LikeMsg`]
pub const KIND_LIKE: &str = "like";
/// Kind tag of [`ViewMsg`]
pub const KIND_VIEW: &str = "view";
/// Kind tag of [`ReportOrUpvoteMsg`]
pub const KIND_REPORT_OR_UPVOTE: &str = "report_or_upvote";

/// Create a post, optionally as a comment or a repost
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePostMsg {
    /// Author
    pub author: AccountKey,
    /// Post id, unique per author
    pub post_id: String,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Body
    #[serde(default)]
    pub content: String,
    /// Comment-tree parent
    #[serde(default)]
    pub parent: Option<PostKey>,
    /// Shared post
    #[serde(default)]
    pub source: Option<PostKey>,
    /// Split rate as a decimal string, e.g. `"0.7"`
    #[serde(default)]
    pub redistribution_split_rate: Option<String>,
}

impl CreatePostMsg {
    /// Key of the post being created
    pub fn key(&self) -> PostKey {
        PostKey::new(self.author.clone(), self.post_id.clone())
    }
}

/// Donate to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonateMsg {
    /// Consumer
    pub username: AccountKey,
    /// Amount as a decimal token string
    pub amount: String,
    /// Author of the addressed post
    pub author: AccountKey,
    /// Id of the addressed post
    pub post_id: String,
    /// Pool the amount is drawn from
    pub funding_pool: FundingPool,
    /// App the donation came through
    #[serde(default)]
    pub from_app: Option<AccountKey>,
}

impl DonateMsg {
    /// Addressed post
    pub fn target(&self) -> PostKey {
        PostKey::new(self.author.clone(), self.post_id.clone())
    }
}

/// Like or dislike a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeMsg {
    /// Liking user
    pub username: AccountKey,
    /// Signed weight
    pub weight: i64,
    /// Author of the addressed post
    pub author: AccountKey,
    /// Id of the addressed post
    pub post_id: String,
}

/// Record a view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMsg {
    /// Viewer
    pub username: AccountKey,
    /// Author of the addressed post
    pub author: AccountKey,
    /// Id of the addressed post
    pub post_id: String,
}

/// Report or upvote a post, or revoke an earlier one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOrUpvoteMsg {
    /// Acting user
    pub username: AccountKey,
    /// Author of the addressed post
    pub author: AccountKey,
    /// Id of the addressed post
    pub post_id: String,
    /// `true` for a report, `false` for an upvote
    pub is_report: bool,
    /// Withdraw the user's earlier report or upvote
    #[serde(default)]
    pub is_revoke: bool,
}

/// Decoded message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Create post
    CreatePost(CreatePostMsg),
    /// Donate
    Donate(DonateMsg),
    /// Like
    Like(LikeMsg),
    /// View
    View(ViewMsg),
    /// Report or upvote
    ReportOrUpvote(ReportOrUpvoteMsg),
    /// Kind with no handler
    Unrecognized {
        /// Kind tag as received
        kind: String,
    },
}

/// Tagged wire form of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgEnvelope {
    /// Kind tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Message body
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Msg {
    /// Kind tag
    pub fn kind(&self) -> &str {
        match self {
            Msg::CreatePost(_) => KIND_CREATE_POST,
            Msg::Donate(_) => KIND_DONATE,
            Msg::Like(_) => KIND_LIKE,
            Msg::View(_) => KIND_VIEW,
            Msg::ReportOrUpvote(_) => KIND_REPORT_OR_UPVOTE,
            Msg::Unrecognized { kind } => kind,
        }
    }

    /// Decode an envelope
    ///
    /// A known kind with a malformed body is `InvalidMessage`; an unknown
    /// kind decodes to [`Msg::Unrecognized`].
    pub fn decode(envelope: MsgEnvelope) -> Result<Msg> {
        fn body<T: serde::de::DeserializeOwned>(kind: &str, value: serde_json::Value) -> Result<T> {
            serde_json::from_value(value)
                .map_err(|e| Error::InvalidMessage(format!("malformed {} body: {}", kind, e)))
        }

        let MsgEnvelope { kind, value } = envelope;
        let msg = match kind.as_str() {
            KIND_CREATE_POST => Msg::CreatePost(body(&kind, value)?),
            KIND_DONATE => Msg::Donate(body(&kind, value)?),
            KIND_LIKE => Msg::Like(body(&kind, value)?),
            KIND_VIEW => Msg::View(body(&kind, value)?),
            KIND_REPORT_OR_UPVOTE => Msg::ReportOrUpvote(body(&kind, value)?),
            _ => Msg::Unrecognized { kind: kind.clone() },
        };
        Ok(msg)
    }

    /// Decode an envelope from JSON text
    pub fn from_json(json: &str) -> Result<Msg> {
        let envelope: MsgEnvelope = serde_json::from_str(json)
            .map_err(|e| Error::InvalidMessage(format!("malformed envelope: {}", e)))?;
        Self::decode(envelope)
    }

    /// Encode into an envelope
    pub fn encode(&self) -> Result<MsgEnvelope> {
        let value = match self {
            Msg::CreatePost(m) => serde_json::to_value(m),
            Msg::Donate(m) => serde_json::to_value(m),
            Msg::Like(m) => serde_json::to_value(m),
            Msg::View(m) => serde_json::to_value(m),
            Msg::ReportOrUpvote(m) => serde_json::to_value(m),
            Msg::Unrecognized { .. } => Ok(serde_json::Value::Null),
        }
        .map_err(|e| Error::InvalidMessage(e.to_string()))?;

        Ok(MsgEnvelope {
            kind: self.kind().to_string(),
            value,
        })
    }

    /// Stateless checks run before any state is read
    pub fn validate_basic(&self) -> Result<()> {
        match self {
            Msg::CreatePost(m) => {
                check_username("author", &m.author)?;
                check_post_id("post_id", &m.post_id)?;
                if let Some(parent) = &m.parent {
                    check_post_key("parent", parent)?;
                }
                if let Some(source) = &m.source {
                    check_post_key("source", source)?;
                }
                check_max_len("title", &m.title, MAX_TITLE_LEN)?;
                check_max_len("content", &m.content, MAX_CONTENT_LEN)
            }
            Msg::Donate(m) => {
                check_username("username", &m.username)?;
                check_username("author", &m.author)?;
                check_post_id("post_id", &m.post_id)?;
                if let Some(app) = &m.from_app {
                    check_username("from_app", app)?;
                }
                Ok(())
            }
            Msg::Like(m) => {
                check_username("username", &m.username)?;
                check_username("author", &m.author)?;
                check_post_id("post_id", &m.post_id)?;
                if m.weight.abs() > MAX_LIKE_WEIGHT {
                    return Err(Error::InvalidMessage(format!(
                        "like weight {} outside [-{}, {}]",
                        m.weight, MAX_LIKE_WEIGHT, MAX_LIKE_WEIGHT
                    )));
                }
                Ok(())
            }
            Msg::View(m) => {
                check_username("username", &m.username)?;
                check_username("author", &m.author)?;
                check_post_id("post_id", &m.post_id)
            }
            Msg::ReportOrUpvote(m) => {
                check_username("username", &m.username)?;
                check_username("author", &m.author)?;
                check_post_id("post_id", &m.post_id)
            }
            Msg::Unrecognized { .. } => Ok(()),
        }
    }
}

fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(Error::InvalidMessage(format!(
            "{} length {} outside [{}, {}]",
            field, len, min, max
        )));
    }
    Ok(())
}

fn check_username(field: &str, name: &AccountKey) -> Result<()> {
    check_len(field, name.as_str(), USERNAME_LEN)
}

fn check_post_id(field: &str, post_id: &str) -> Result<()> {
    check_len(field, post_id, POST_ID_LEN)
}

fn check_post_key(field: &str, key: &PostKey) -> Result<()> {
    check_username(field, &key.author)?;
    check_post_id(field, &key.post_id)
}

fn check_max_len(field: &str, value: &str, max: usize) -> Result<()> {
    check_len(field, value, (0, max))
}
