use thiserror::Error;

use crate::item::ItemKind;

/// The source document could not be turned into page texts.
#[derive(Debug, Error)]
pub enum DocumentReadError {
    #[error("failed to read PDF: {0}")]
    Pdf(String),
    #[error("PDF has no pages")]
    NoPages,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single generation request failed.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The upstream service answered with a non-success status (auth, rate limit, ...).
    #[error("request rejected with status {status}: {message}")]
    Request { status: u16, message: String },
    /// The request never got a usable HTTP answer.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("empty response from model")]
    EmptyResponse,
}

impl GenerationError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Transport(_) => true,
            GenerationError::Request { status, .. } => *status == 429 || *status >= 500,
            GenerationError::EmptyResponse => false,
        }
    }
}

/// Reserved: the item parser currently accepts any text and never fails.
#[derive(Debug, Error)]
#[error("could not parse {kind} response: {message}")]
pub struct ParseError {
    pub kind: ItemKind,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Tagged failure returned to the caller of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("document read failed: {0}")]
    DocumentRead(#[from] DocumentReadError),
    #[error("generation failed on segment {segment} ({kind}): {source}")]
    Generation {
        segment: usize,
        kind: ItemKind,
        #[source]
        source: GenerationError,
    },
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}
