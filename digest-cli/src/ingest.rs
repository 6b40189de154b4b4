//! JSON-lines event source: one `ChatMessage` object per line.
//!
//! Malformed lines and records the store rejects are logged and skipped;
//! storage faults stop the run so the caller can retry the whole file
//! (replays are harmless on the SQLite backend).

use std::path::Path;

use anyhow::{Context, Result};
use storage::{ChatMessage, MessageStore};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Display name used when the origin system gives none.
pub const UNKNOWN_USERNAME: &str = "unknown";

/// Tally of one ingest run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Stored, or recognized as an already-stored duplicate.
    pub accepted: usize,
    /// Parsed but refused by validation (e.g. empty text).
    pub rejected: usize,
    /// Not a valid message record.
    pub malformed: usize,
}

/// Fills in the username placeholder the store requires.
pub fn normalize(mut message: ChatMessage) -> ChatMessage {
    if message.username.trim().is_empty() {
        message.username = UNKNOWN_USERNAME.to_string();
    }
    message
}

/// Reads records from `reader` until EOF and appends each to `store`.
pub async fn ingest<R>(store: &dyn MessageStore, reader: R) -> Result<IngestReport>
where
    R: AsyncBufRead + Unpin,
{
    let mut report = IngestReport::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message = match serde_json::from_str::<ChatMessage>(line) {
            Ok(message) => normalize(message),
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping malformed record");
                report.malformed += 1;
                continue;
            }
        };

        match store.append(&message).await {
            Ok(()) => report.accepted += 1,
            Err(e) if e.is_constraint() => {
                warn!(line = line_no, error = %e, "Skipping rejected record");
                report.rejected += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to store record on line {}", line_no));
            }
        }
    }

    info!(
        accepted = report.accepted,
        rejected = report.rejected,
        malformed = report.malformed,
        "Ingest finished"
    );
    Ok(report)
}

/// Ingests from a JSON-lines file, or from stdin when `path` is `None` or `-`.
pub async fn ingest_path(store: &dyn MessageStore, path: Option<&Path>) -> Result<IngestReport> {
    match path.filter(|p| p.as_os_str() != "-") {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Open {}", path.display()))?;
            ingest(store, BufReader::new(file)).await
        }
        None => ingest(store, BufReader::new(tokio::io::stdin())).await,
    }
}
