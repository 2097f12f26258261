//! Shared domain types
//!
//! Field names on the wire follow the public API (`senderID`, `receiverEmail`,
//! ...) rather than Rust naming, so the serde renames here are load-bearing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable user identifier issued by the user directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// An addressed text message
///
/// Sender fields always come from the authenticated caller. At least one of
/// the receiver fields is set; both may be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message: String,
    #[serde(rename = "senderID")]
    pub sender_id: UserId,
    #[serde(rename = "senderEmail")]
    pub sender_email: String,
    #[serde(rename = "receiverID")]
    pub receiver_id: Option<UserId>,
    #[serde(rename = "receiverEmail")]
    pub receiver_email: Option<String>,
}
