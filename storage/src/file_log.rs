//! File-per-partition fallback store.
//!
//! Each `(chat_id, thread)` partition is an append-only text file with one
//! record per line: `<seq>\t<epoch seconds>\t<transcript line>`. There is no
//! message identity on disk, so this backend does not deduplicate: callers
//! must not redeliver.
//!
//! Sequence numbers are store-wide and never reused. The last one handed out
//! is kept in the `sequence` file of the log directory, so watermarks stay
//! valid across purges and restarts.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::StorageError;
use crate::lifecycle::{Lifecycle, StoreState};
use crate::models::{format_line, ChatMessage, ThreadScope, Transcript};
use crate::repository::{check_limit, MessageStore};

const SEQUENCE_FILE: &str = "sequence";

/// Open log directory plus the last sequence number handed out.
struct LogDir {
    path: PathBuf,
    last_seq: i64,
}

/// One parsed record of a partition file.
struct LogEntry<'a> {
    seq: i64,
    timestamp: i64,
    raw: &'a str,
    line: &'a str,
}

/// [`MessageStore`] over a directory of partition log files.
///
/// All file access goes through one mutex, which makes each operation atomic
/// with respect to the others.
pub struct FileLogStore {
    dir: PathBuf,
    state: Mutex<Lifecycle<LogDir>>,
}

impl FileLogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            state: Mutex::new(Lifecycle::Uninitialized),
        }
    }

    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self::new(dir);
        store.init().await?;
        Ok(store)
    }

    /// Creates the log directory if needed and loads the sequence counter.
    pub async fn init(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        state.ensure_uninitialized()?;

        fs::create_dir_all(&self.dir).await?;
        let last_seq = read_sequence(&self.dir.join(SEQUENCE_FILE)).await?;

        *state = Lifecycle::Ready(LogDir {
            path: self.dir.clone(),
            last_seq,
        });
        info!(dir = %self.dir.display(), last_seq, "File log store ready");
        Ok(())
    }

    /// Path of the log file for one partition.
    pub fn partition_path(dir: &Path, chat_id: i64, thread: ThreadScope) -> PathBuf {
        match thread {
            ThreadScope::Root => dir.join(format!("messages-{}.txt", chat_id)),
            ThreadScope::Topic(id) => dir.join(format!("messages-{}-{}.txt", chat_id, id)),
        }
    }
}

fn corrupt(path: &Path, detail: impl std::fmt::Display) -> StorageError {
    StorageError::Io(io::Error::new(
        ErrorKind::InvalidData,
        format!("{}: {}", path.display(), detail),
    ))
}

async fn read_sequence(path: &Path) -> Result<i64, StorageError> {
    match fs::read_to_string(path).await {
        Ok(content) => content
            .trim()
            .parse()
            .map_err(|e| corrupt(path, format!("bad sequence: {}", e))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Writes beside `path` and renames over it, so a crash leaves either the
/// old contents or the new ones.
async fn replace_file(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Reads a partition file; a missing file is an empty partition.
async fn read_log(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn remove_log(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn parse_entry(raw: &str) -> Option<LogEntry<'_>> {
    let (seq, rest) = raw.split_once('\t')?;
    let (timestamp, line) = rest.split_once('\t')?;
    Some(LogEntry {
        seq: seq.parse().ok()?,
        timestamp: timestamp.parse().ok()?,
        raw,
        line,
    })
}

fn parse_log<'a>(path: &Path, content: &'a str) -> Result<Vec<LogEntry<'a>>, StorageError> {
    content
        .lines()
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(i, raw)| {
            parse_entry(raw).ok_or_else(|| corrupt(path, format!("bad record on line {}", i + 1)))
        })
        .collect()
}

/// One line per message; line breaks inside a field are folded to spaces.
fn single_line(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

#[async_trait]
impl MessageStore for FileLogStore {
    #[instrument(skip(self, message), fields(chat_id = message.chat_id, message_id = message.message_id))]
    async fn append(&self, message: &ChatMessage) -> Result<(), StorageError> {
        message.validate()?;

        let mut state = self.state.lock().await;
        let log = state.ready_mut()?;

        // Persist the counter first: a crash may skip a number but never reuse one.
        let seq = log.last_seq + 1;
        replace_file(&log.path.join(SEQUENCE_FILE), seq.to_string().as_bytes()).await?;
        log.last_seq = seq;

        let path = Self::partition_path(&log.path, message.chat_id, message.thread);
        let record = format!(
            "{}\t{}\t{}\n",
            seq,
            message.timestamp,
            format_line(
                message.timestamp,
                &single_line(&message.username),
                &single_line(&message.text),
            )
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(record.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %path.display(), seq, "Appended message");
        Ok(())
    }

    #[instrument(skip(self), fields(thread = %thread))]
    async fn read_range(
        &self,
        chat_id: i64,
        thread: ThreadScope,
        limit: Option<u32>,
    ) -> Result<Option<Transcript>, StorageError> {
        let limit = check_limit(limit)?;

        let state = self.state.lock().await;
        let log = state.ready()?;
        let path = Self::partition_path(&log.path, chat_id, thread);
        let Some(content) = read_log(&path).await? else {
            return Ok(None);
        };

        let mut entries = parse_log(&path, &content)?;
        entries.sort_by_key(|e| (e.timestamp, e.seq));

        let skip = match limit {
            Some(n) => entries.len().saturating_sub(n as usize),
            None => 0,
        };
        info!(chat_id, count = entries.len() - skip, "Retrieved messages");

        Ok(Transcript::from_lines(
            entries
                .into_iter()
                .skip(skip)
                .map(|e| (e.seq, e.line.to_string())),
        ))
    }

    #[instrument(skip(self), fields(thread = %thread))]
    async fn delete_range(&self, chat_id: i64, thread: ThreadScope) -> Result<(), StorageError> {
        let state = self.state.lock().await;
        let log = state.ready()?;
        remove_log(&Self::partition_path(&log.path, chat_id, thread)).await?;
        info!(chat_id, "Deleted partition");
        Ok(())
    }

    #[instrument(skip(self), fields(thread = %thread))]
    async fn delete_through(
        &self,
        chat_id: i64,
        thread: ThreadScope,
        watermark: i64,
    ) -> Result<(), StorageError> {
        let state = self.state.lock().await;
        let log = state.ready()?;
        let path = Self::partition_path(&log.path, chat_id, thread);

        let Some(content) = read_log(&path).await? else {
            return Ok(());
        };
        let entries = parse_log(&path, &content)?;
        let total = entries.len();
        let kept: Vec<&str> = entries
            .iter()
            .filter(|e| e.seq > watermark)
            .map(|e| e.raw)
            .collect();

        if kept.is_empty() {
            remove_log(&path).await?;
        } else if kept.len() < total {
            let mut rest = kept.join("\n");
            rest.push('\n');
            replace_file(&path, rest.as_bytes()).await?;
        }

        info!(
            chat_id,
            watermark,
            deleted = total - kept.len(),
            "Deleted partition through watermark"
        );
        Ok(())
    }

    async fn count(&self, chat_id: i64, thread: ThreadScope) -> Result<u64, StorageError> {
        let state = self.state.lock().await;
        let log = state.ready()?;
        let content = read_log(&Self::partition_path(&log.path, chat_id, thread)).await?;
        Ok(content
            .map(|c| c.lines().filter(|l| !l.is_empty()).count() as u64)
            .unwrap_or(0))
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.state.lock().await.close();
        info!(dir = %self.dir.display(), "File log store closed");
        Ok(())
    }

    async fn state(&self) -> StoreState {
        self.state.lock().await.state()
    }
}
