//! Error types for sectioncountlib

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while counting or synchronizing a document
#[derive(Error, Debug)]
pub enum SectionCountError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid glob pattern
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// Path does not exist
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// The word pattern could not be compiled or evaluated
    #[error("word pattern error: {0}")]
    Pattern(String),

    /// An edit referenced offsets outside the document or inside a character
    #[error("invalid edit {from}..{to} for document of {len} bytes")]
    InvalidEdit { from: usize, to: usize, len: usize },

    /// A line splice referenced lines outside the line cache
    #[error("splice {start}..{end} is outside the line cache of {len} lines")]
    InvalidSplice { start: usize, end: usize, len: usize },

    /// Settings could not be parsed
    #[error("invalid settings: {0}")]
    Settings(String),

    /// The background counter thread is gone
    #[error("background word counter is not running")]
    WorkerUnavailable,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
