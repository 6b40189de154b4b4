//! Data models for storage (chat messages, thread scopes, transcripts).
//!
//! Used by the store implementations and callers of the storage API.

mod message_record;
mod thread_scope;
mod transcript;

pub use message_record::ChatMessage;
pub use thread_scope::ThreadScope;
pub use transcript::{format_line, format_timestamp, Transcript};
