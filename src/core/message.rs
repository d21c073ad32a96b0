//! Message value type and its line-oriented JSON encoding.
//!
//! The wire field names (`message`, `senderIp`) are fixed by the deployed
//! peers and must not change.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One logical message exchanged between two peers.
///
/// There is no kind/type discriminant: protocol control messages and chat
/// content share this shape, and the receiver classifies them by pattern
/// matching on `text`. A chat message whose text happens to look like a
/// control phrase will be treated as one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Free-form message text.
    #[serde(rename = "message")]
    pub text: String,

    /// Address string of the logical originator, as claimed by the sender.
    #[serde(rename = "senderIp")]
    pub origin: String,
}

impl Message {
    pub fn new(text: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: origin.into(),
        }
    }

    /// Serialize to a single-line record. serde_json never emits raw
    /// newlines (they are escaped inside strings), so the output is
    /// self-delimiting.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse one record. Inverse of [`Message::encode`] for every valid
    /// message; fails with `MalformedMessage` otherwise.
    pub fn decode(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}
