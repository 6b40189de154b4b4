//! # digest-core
//!
//! Application glue around the message store: configuration and backend selection,
//! tracing initialization, errors, and the summarize-then-purge requester.

pub mod backend;
pub mod config;
pub mod error;
pub mod logger;
pub mod summary;


pub use backend::open_store;
pub use config::{DigestConfig, StoreBackend};
pub use error::{DigestError, Result};
pub use logger::init_tracing;
pub use summary::{
    format_summary_message, reply_text, Summarizer, SummaryOutcome, SummaryRequester,
    NOTHING_TO_SUMMARIZE, SUMMARY_FAILED,
};
