//! Conversation turns used as inference context.

use serde::{Deserialize, Serialize};

/// Single conversation turn.
///
/// Histories are ordered oldest first; the last entry is the message the
/// parameters are extracted from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolHistoryMessage {
    role: String,
    content: String,
}

impl ToolHistoryMessage {
    /// Creates a message with an arbitrary role label.
    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Creates a `user` message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Creates an `assistant` message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    /// Returns the role label.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Returns the message content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}
