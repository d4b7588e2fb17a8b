//! Character decoding for MARC field data.
//!
//! All four source formats are decoded as UTF-8. Bytes that are not valid UTF-8 are
//! never fatal: they decode to U+FFFD so a single mis-encoded field cannot abort its
//! record or the batch.
//!
//! The character coding declared in leader position 9 is still recognised:
//! - Space character = MARC-8
//! - 'a' = UTF-8
//!
//! MARC-8 data is not transcoded; it goes through the same best-effort UTF-8 path.

use crate::error::{MarcError, Result};
use encoding_rs::UTF_8;
use std::borrow::Cow;

/// Character encoding declared by a MARC leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarcEncoding {
    /// MARC-8 encoding (legacy, mixed character sets)
    Marc8,
    /// UTF-8 encoding (modern standard)
    Utf8,
}

impl MarcEncoding {
    /// Detect encoding from leader character coding field.
    ///
    /// # Errors
    ///
    /// Returns `MarcError::InvalidLeader` if the character is not a valid encoding indicator.
    pub fn from_leader_char(c: char) -> Result<Self> {
        match c {
            ' ' => Ok(MarcEncoding::Marc8),
            'a' => Ok(MarcEncoding::Utf8),
            _ => Err(MarcError::InvalidLeader(format!(
                "Unknown character coding scheme: {c:?}"
            ))),
        }
    }
}

/// Decode field bytes as UTF-8, replacing invalid sequences.
///
/// Borrows when the input is already valid UTF-8.
#[must_use]
pub fn decode_lossy(bytes: &[u8]) -> Cow<'_, str> {
    let (text, had_errors) = UTF_8.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::debug!(
            len = bytes.len(),
            "invalid UTF-8 replaced with U+FFFD"
        );
    }
    text
}

/// Decode a whole text document, dropping a leading UTF-8 byte-order mark.
#[must_use]
pub fn decode_document(bytes: &[u8]) -> Cow<'_, str> {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    if had_errors {
        tracing::warn!("document is not valid UTF-8; invalid sequences replaced with U+FFFD");
    }
    text
}

/// Length of a leading UTF-8 byte-order mark, or zero.
#[must_use]
pub fn bom_len(bytes: &[u8]) -> usize {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        3
    } else {
        0
    }
}
