//! Chat message model for persistence.
//!
//! Maps to the `messages` table; one record per inbound chat message.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::ThreadScope;
use crate::error::StorageError;

/// A message as delivered by the inbound event source.
///
/// `(chat_id, message_id)` identifies the message; `(chat_id, thread)` is the
/// partition it is stored and read under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub chat_id: i64,
    pub message_id: i64,
    #[serde(default, rename = "thread_id")]
    pub thread: ThreadScope,
    pub user_id: i64,
    /// Display name; the event source substitutes a placeholder when the author has none.
    pub username: String,
    pub text: String,
    /// Seconds since the Unix epoch, as reported by the origin system.
    pub timestamp: i64,
}

impl ChatMessage {
    /// Creates a root-context message. Use [`ChatMessage::in_thread`] for topics.
    pub fn new(
        chat_id: i64,
        message_id: i64,
        user_id: i64,
        username: impl Into<String>,
        text: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            chat_id,
            message_id,
            thread: ThreadScope::Root,
            user_id,
            username: username.into(),
            text: text.into(),
            timestamp,
        }
    }

    pub fn in_thread(mut self, thread_id: i64) -> Self {
        self.thread = ThreadScope::Topic(thread_id);
        self
    }

    /// Rejects records that must never reach the store.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.username.trim().is_empty() {
            return Err(StorageError::InvalidMessage(format!(
                "empty username (chat_id={}, message_id={})",
                self.chat_id, self.message_id
            )));
        }
        if self.text.trim().is_empty() {
            return Err(StorageError::InvalidMessage(format!(
                "empty text (chat_id={}, message_id={})",
                self.chat_id, self.message_id
            )));
        }
        if DateTime::from_timestamp(self.timestamp, 0).is_none() {
            return Err(StorageError::InvalidMessage(format!(
                "timestamp {} out of range (chat_id={}, message_id={})",
                self.timestamp, self.chat_id, self.message_id
            )));
        }
        Ok(())
    }
}
