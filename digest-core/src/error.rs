use storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DigestError>;
