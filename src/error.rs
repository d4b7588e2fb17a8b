//! Error types for MARC decoding and rendering.
//!
//! This module provides the [`MarcError`] type for all library operations, the
//! [`Result`] convenience type, and [`ErrorKind`], the coarse classification used
//! when errors are reported back to a caller.

use serde::Serialize;
use thiserror::Error;

/// Error type for all MARC library operations.
///
/// Variants map onto four reported kinds (see [`ErrorKind`]): format detection,
/// decoding, rendering and reading the underlying source.
#[derive(Error, Debug)]
pub enum MarcError {
    /// The buffer is empty or could not be classified as any supported format.
    #[error("Format detection failed: {0}")]
    FormatDetection(String),

    /// Error indicating an invalid or malformed MARC record.
    #[error("Invalid MARC record: {0}")]
    InvalidRecord(String),

    /// Error indicating an invalid leader (24-byte header).
    #[error("Invalid leader: {0}")]
    InvalidLeader(String),

    /// Error indicating an invalid field structure.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// Error indicating a truncated or incomplete record.
    #[error("Truncated record: {0}")]
    TruncatedRecord(String),

    /// Syntax error in a whole XML or JSON document.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A record could not be turned into text.
    #[error("Render error: {0}")]
    Render(String),

    /// Reading the caller's source failed before decoding could begin.
    #[error("Error reading MARC source: {0}")]
    SourceRead(#[from] std::io::Error),
}

impl MarcError {
    /// The reported kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarcError::FormatDetection(_) => ErrorKind::FormatDetection,
            MarcError::InvalidRecord(_)
            | MarcError::InvalidLeader(_)
            | MarcError::InvalidField(_)
            | MarcError::TruncatedRecord(_)
            | MarcError::ParseError(_) => ErrorKind::Decode,
            MarcError::Render(_) => ErrorKind::Render,
            MarcError::SourceRead(_) => ErrorKind::SourceRead,
        }
    }
}

/// Coarse classification of a [`MarcError`], as seen by callers of the batch API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Empty or unclassifiable input. Always fatal to the whole call.
    FormatDetection,
    /// Malformed leader, directory, document syntax or record block.
    Decode,
    /// A decoded record could not be rendered. Isolated to that record.
    Render,
    /// The caller-owned source could not be read. Always fatal.
    SourceRead,
}

impl ErrorKind {
    /// Human-readable name used in inline error blocks.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ErrorKind::FormatDetection => "FormatDetectionError",
            ErrorKind::Decode => "DecodeError",
            ErrorKind::Render => "RenderError",
            ErrorKind::SourceRead => "SourceReadError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;
