//! Summarization requester: read a partition, hand it to a [`Summarizer`],
//! then purge what was summarized.
//!
//! The summarizer itself (an LLM call) lives outside this workspace; only the
//! trait boundary and the reply texts shown to chat users are defined here.

use std::sync::Arc;

use async_trait::async_trait;
use storage::{MessageStore, ThreadScope};
use tracing::{error, info, instrument, warn};

use crate::error::{DigestError, Result};

/// Reply when a partition has nothing stored.
pub const NOTHING_TO_SUMMARIZE: &str = "No messages to summarize!";

/// Reply when anything in the summarize round-trip fails.
pub const SUMMARY_FAILED: &str = "Failed to generate summary. Try again later.";

/// Turns a transcript into summary text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String>;
}

/// Result of one summarize request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// The partition was empty; the summarizer was not called.
    Nothing,
    /// Formatted reply, ready to send.
    Summary {
        message_count: usize,
        text: String,
    },
}

/// Builds the reply header: `Summary of N messages:` plus a topic line for non-zero threads.
pub fn format_summary_message(message_count: usize, summary: &str, thread: ThreadScope) -> String {
    // Thread id 0 is not a real topic and gets the plain header.
    let header = match thread {
        ThreadScope::Topic(id) if id != 0 => {
            format!("📋 Topic #{}\n\nSummary of {} messages", id, message_count)
        }
        _ => format!("Summary of {} messages", message_count),
    };
    format!("{}:\n\n{}", header, summary)
}

/// Maps a summarize result to the text shown in the chat. Errors never leak details.
pub fn reply_text(result: &Result<SummaryOutcome>) -> &str {
    match result {
        Ok(SummaryOutcome::Nothing) => NOTHING_TO_SUMMARIZE,
        Ok(SummaryOutcome::Summary { text, .. }) => text.as_str(),
        Err(_) => SUMMARY_FAILED,
    }
}

/// Read-summarize-purge flow over a shared store.
#[derive(Clone)]
pub struct SummaryRequester {
    store: Arc<dyn MessageStore>,
    summarizer: Arc<dyn Summarizer>,
    default_limit: Option<u32>,
}

impl SummaryRequester {
    pub fn new(store: Arc<dyn MessageStore>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            store,
            summarizer,
            default_limit: None,
        }
    }

    /// Limit used when a request does not give one.
    pub fn with_default_limit(mut self, limit: Option<u32>) -> Self {
        self.default_limit = limit;
        self
    }

    /// Summarizes the partition and, on success, deletes the messages that were read.
    ///
    /// Messages stored while the summarizer runs are kept for the next summary.
    /// If the summarizer fails nothing is deleted.
    #[instrument(skip(self), fields(thread = %thread))]
    pub async fn summarize(
        &self,
        chat_id: i64,
        thread: ThreadScope,
        limit: Option<u32>,
    ) -> Result<SummaryOutcome> {
        let limit = limit.or(self.default_limit);

        let Some(transcript) = self.store.read_range(chat_id, thread, limit).await? else {
            info!(chat_id, "No messages to summarize");
            return Ok(SummaryOutcome::Nothing);
        };

        info!(
            chat_id,
            chars = transcript.content.len(),
            messages = transcript.message_count,
            "Requesting summary"
        );

        let summary = self
            .summarizer
            .summarize(&transcript.content)
            .await
            .map_err(|e| {
                error!(error = %e, chat_id, "Summarizer failed");
                e
            })?;

        if summary.trim().is_empty() {
            warn!(chat_id, "Summarizer returned empty text; keeping messages");
            return Err(DigestError::Summarizer("empty summary".to_string()));
        }

        self.store
            .delete_through(chat_id, thread, transcript.watermark)
            .await?;

        Ok(SummaryOutcome::Summary {
            message_count: transcript.message_count,
            text: format_summary_message(transcript.message_count, &summary, thread),
        })
    }
}
