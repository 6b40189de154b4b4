//! CLI parser.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use storage::ThreadScope;

#[derive(Parser)]
#[command(name = "digest")]
#[command(about = "Chat message store CLI: migrate, append, ingest, read, purge, count", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// A `(chat, thread)` partition; no `--thread` means the chat's root context.
#[derive(Args, Debug, Clone, Copy)]
pub struct PartitionArgs {
    #[arg(short, long, allow_hyphen_values = true)]
    pub chat: i64,
    #[arg(short, long, allow_hyphen_values = true)]
    pub thread: Option<i64>,
}

impl PartitionArgs {
    pub fn scope(&self) -> ThreadScope {
        ThreadScope::from(self.thread)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the store and apply pending schema migrations.
    Migrate,
    /// Append one message (ignored if the chat already has this message id).
    Append {
        #[command(flatten)]
        partition: PartitionArgs,
        #[arg(short, long)]
        message_id: i64,
        #[arg(short, long, default_value_t = 0)]
        user_id: i64,
        #[arg(long, default_value = "unknown")]
        username: String,
        #[arg(long)]
        text: String,
        /// Seconds since epoch; defaults to now.
        #[arg(long)]
        timestamp: Option<i64>,
    },
    /// Append JSON-lines message records from a file, or stdin when omitted or `-`.
    Ingest { path: Option<PathBuf> },
    /// Print a partition's transcript, oldest first.
    Read {
        #[command(flatten)]
        partition: PartitionArgs,
        /// Only the N most recent messages.
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Delete a partition, or only rows up to a watermark from an earlier read.
    Purge {
        #[command(flatten)]
        partition: PartitionArgs,
        #[arg(short, long, allow_hyphen_values = true)]
        watermark: Option<i64>,
    },
    /// Print the number of stored messages in a partition.
    Count {
        #[command(flatten)]
        partition: PartitionArgs,
    },
}
