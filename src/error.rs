//! Unified error types for chatstats.
//!
//! This module provides a single [`ChatstatsError`] enum that covers all
//! error cases in the library. This design follows the pattern used by
//! popular crates like `reqwest`, `serde_json`, and `csv`.
//!
//! # Error Handling Philosophy
//!
//! - **Library users** get typed errors they can match on
//! - **Application users** get clear, actionable error messages
//! - **Developers** get source error chains for debugging
//!
//! Note that two failure classes are deliberately *not* errors: values wider
//! than their configured bit width are truncated on write (a build contract,
//! see [`crate::codec`]), and out-of-range bit reads panic (they indicate a
//! corrupted stream or a codec bug, and no caller can meaningfully recover).

use std::io;

use thiserror::Error;

/// A specialized [`Result`] type for chatstats operations.
///
/// This type is broadly used across the library for any operation that
/// may produce an error.
///
/// # Example
///
/// ```rust
/// use chatstats::error::Result;
/// use chatstats::database::Database;
///
/// fn my_function() -> Result<Option<Database>> {
///     // ... operations that may fail
///     Ok(None)
/// }
/// ```
pub type Result<T> = std::result::Result<T, ChatstatsError>;

/// The error type for all chatstats operations.
///
/// This enum represents all possible errors that can occur when using
/// chatstats. Each variant contains context about what went wrong and, where
/// applicable, the underlying source error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatstatsError {
    /// An I/O error occurred.
    ///
    /// This typically happens when:
    /// - The archive file doesn't exist
    /// - Permission denied
    /// - Disk is full (when writing output)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing/serialization error.
    ///
    /// This can occur when loading or saving an archive.
    #[cfg(feature = "json-io")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing error.
    ///
    /// This can occur when exporting block results to CSV format.
    #[cfg(feature = "csv-output")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A raw byte buffer cannot back a bit stream.
    ///
    /// The stream is addressed in 32-bit words, so its byte form must be a
    /// multiple of 4 bytes.
    #[error("buffer of {len} bytes is not aligned to 32 bits")]
    UnalignedBuffer {
        /// Length of the rejected buffer, in bytes
        len: usize,
    },

    /// An archive failed semantic validation.
    ///
    /// This occurs when:
    /// - A message references a channel or author index past the dictionary
    /// - A required dictionary is missing
    /// - A date cannot be interpreted
    #[error("Invalid archive: {message}")]
    InvalidArchive {
        /// Description of what's wrong
        message: String,
    },

    /// Invalid date in a filter update or archive.
    ///
    /// Date filters expect keys present in the database's date range.
    #[error("Invalid date '{input}'. Expected format: {expected}")]
    InvalidDate {
        /// The invalid date string that was provided
        input: String,
        /// Expected format description
        expected: &'static str,
    },

    /// A message referenced a channel index outside the channel dictionary.
    #[error("Unknown channel index {index} (database has {count} channels)")]
    UnknownChannel {
        /// The out-of-range index
        index: usize,
        /// Number of channels in the dictionary
        count: usize,
    },

    /// A block key string did not name any registered block.
    #[error("Unknown block '{key}'")]
    UnknownBlock {
        /// The unrecognized key
        key: String,
    },

    /// A block was invoked with arguments of the wrong kind.
    ///
    /// Parameterized blocks (like per-word statistics) need their matching
    /// argument variant; everything else takes none.
    #[error("Block '{key}' called with incompatible arguments")]
    InvalidBlockArgs {
        /// Key of the block that rejected its arguments
        key: String,
    },

    /// A database cannot be built without any messages.
    ///
    /// The final bit layout is derived from the data, so an empty input has
    /// no meaningful encoding.
    #[error("Cannot build a database from zero messages")]
    EmptyDatabase,

    /// The aggregation worker thread is gone.
    ///
    /// Requests after the worker has been shut down (or has panicked) fail
    /// with this error.
    #[error("Aggregation worker disconnected")]
    WorkerDisconnected,
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl ChatstatsError {
    /// Creates an invalid archive error.
    pub fn invalid_archive(message: impl Into<String>) -> Self {
        ChatstatsError::InvalidArchive {
            message: message.into(),
        }
    }

    /// Creates an invalid date error.
    pub fn invalid_date(input: impl Into<String>) -> Self {
        ChatstatsError::InvalidDate {
            input: input.into(),
            expected: "YYYY-MM-DD",
        }
    }

    /// Creates an unknown channel error.
    pub fn unknown_channel(index: usize, count: usize) -> Self {
        ChatstatsError::UnknownChannel { index, count }
    }

    /// Creates an unknown block error.
    pub fn unknown_block(key: impl Into<String>) -> Self {
        ChatstatsError::UnknownBlock { key: key.into() }
    }

    /// Creates an incompatible block arguments error.
    pub fn invalid_block_args(key: impl Into<String>) -> Self {
        ChatstatsError::InvalidBlockArgs { key: key.into() }
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, ChatstatsError::Io(_))
    }

    /// Returns `true` if this is an alignment error.
    pub fn is_unaligned_buffer(&self) -> bool {
        matches!(self, ChatstatsError::UnalignedBuffer { .. })
    }

    /// Returns `true` if this is an archive validation error.
    pub fn is_invalid_archive(&self) -> bool {
        matches!(self, ChatstatsError::InvalidArchive { .. })
    }

    /// Returns `true` if this is a date-related error.
    pub fn is_invalid_date(&self) -> bool {
        matches!(self, ChatstatsError::InvalidDate { .. })
    }

    /// Returns `true` if this is an unknown channel error.
    pub fn is_unknown_channel(&self) -> bool {
        matches!(self, ChatstatsError::UnknownChannel { .. })
    }

    /// Returns `true` if this is an unknown block error.
    pub fn is_unknown_block(&self) -> bool {
        matches!(self, ChatstatsError::UnknownBlock { .. })
    }

    /// Returns `true` if this is an incompatible block arguments error.
    pub fn is_invalid_block_args(&self) -> bool {
        matches!(self, ChatstatsError::InvalidBlockArgs { .. })
    }

    /// Returns `true` if this is an empty database error.
    pub fn is_empty_database(&self) -> bool {
        matches!(self, ChatstatsError::EmptyDatabase)
    }

    /// Returns `true` if the aggregation worker is gone.
    pub fn is_worker_disconnected(&self) -> bool {
        matches!(self, ChatstatsError::WorkerDisconnected)
    }
}

// ============================================================================
// Tests
// ============================================================================
