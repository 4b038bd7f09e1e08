//! Quiz generation from PDF page ranges.
//!
//! page texts → [`segment::select`] → [`segment::build`] → for each segment and
//! [`ItemKind`]: [`GenerationClient`] → [`parser::parse`] → [`PersistenceSink`].

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod item;
pub mod parser;
pub mod pipeline;
pub mod reader;
pub mod segment;

pub use client::{GenerationClient, OpenAiClient, RetryingClient};
pub use error::{DocumentReadError, GenerationError, ParseError, PersistenceError, PipelineError};
pub use item::{ItemKind, QuizItem};
pub use pipeline::{BatchResult, BatchStatus, FailurePolicy, PersistenceSink, Pipeline, RunReport};
pub use segment::{PageRange, PageText, Segment, SegmentPolicy};
