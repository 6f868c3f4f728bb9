//! Error types for MARC transcoding operations.
//!
//! This module provides the [`MarcError`] type for all codec and framing
//! operations and the [`Result`] convenience type.

use thiserror::Error;

/// Error type for all MARC transcoding operations.
///
/// Represents the conditions that can occur while decoding or encoding
/// records in any of the supported wire formats.
#[derive(Error, Debug)]
pub enum MarcError {
    /// Empty or structurally truncated binary input.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Error indicating an invalid leader (24-character header).
    #[error("Invalid leader: {0}")]
    InvalidLeader(String),

    /// Error indicating an invalid field structure.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// An Aleph Sequential line too short to contain an addressable tag.
    #[error("Malformed line: {0}")]
    MalformedLine(String),

    /// Error during parsing of record data.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The record has no `001` control field to use as its identifier.
    #[error("Missing identifier: record has no 001 control field")]
    MissingIdentifier,

    /// A numeric value does not fit its fixed-width decimal slot.
    #[error("{what} {value} does not fit in {width} digits")]
    FieldOverflow {
        /// Which structural value overflowed (e.g. "field length")
        what: &'static str,
        /// The value that was computed
        value: usize,
        /// Number of decimal digits available
        width: usize,
    },

    /// A byte range addressed by the directory is not valid UTF-8.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;
