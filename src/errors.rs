/*!
 * Error types for the booktrans library.
 *
 * This module contains custom error types for the different parts of the
 * translation pipeline, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

use crate::translation::pipeline::{JobState, TranslationStage};

/// Errors that can occur when talking to a model backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The model answered but produced no text
    #[error("Model returned an empty response")]
    EmptyResponse,
}

/// Errors that can occur during translation of a document
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// The model could not be reached or did not answer in time
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ProviderError),

    /// The model answered but the heuristic gate rejected the output
    #[error("Translation rejected by validator: {reason}")]
    ValidationFailed {
        /// Why the candidate was rejected
        reason: String,
    },

    /// A chunk exhausted its retry budget
    #[error("{stage} failed for chunk {chunk} after {attempts} attempts: {last_error}")]
    ChunkFailed {
        /// Stage that was running
        stage: TranslationStage,
        /// 1-based chunk number
        chunk: usize,
        /// Number of model calls made
        attempts: u32,
        /// Last error observed before giving up
        last_error: Box<TranslationError>,
    },

    /// The job was cancelled by the caller
    #[error("Translation cancelled")]
    Cancelled,

    /// An illegal job state transition was requested
    #[error("Invalid job state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: JobState,
        /// Requested state
        to: JobState,
    },

    /// The request itself is unusable
    #[error("Invalid translation request: {0}")]
    InvalidRequest(String),
}

/// Errors raised by cache stores
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing storage failed
    #[error("Cache storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for CacheError {
    fn from(error: anyhow::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl TranslationError {
    /// Whether another attempt at the same chunk could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ModelUnavailable(_) | Self::ValidationFailed { .. })
    }
}
