//! # digest-cli
//!
//! CLI foundation: argument parsing and the JSON-lines ingest path. Store
//! selection and config live in digest-core.

pub mod cli;
pub mod ingest;

pub use cli::{Cli, Commands, PartitionArgs};
pub use ingest::{ingest, ingest_path, IngestReport, UNKNOWN_USERNAME};
