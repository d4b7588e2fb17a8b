//! MARC record leader parsing.
//!
//! The MARC leader is a 24-byte fixed-length field at the start of every ISO 2709
//! record. The binary decoder needs two of its numbers to locate everything else.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 digits)
//! - Position 5: Record status
//! - Position 6: Record type (a = language material, c = music, etc.)
//! - Position 7: Bibliographic level (m = monograph, s = serial, etc.)
//! - Position 8: Control record type
//! - Position 9: Character coding (space = MARC-8, a = UTF-8)
//! - Position 10: Indicator count (usually 2)
//! - Position 11: Subfield code count (usually 2)
//! - Positions 12-16: Base address of data (5 digits)
//! - Positions 17-19: Encoding level, cataloging form, multipart level
//! - Positions 20-23: Entry map (usually "4500")

use crate::encoding::MarcEncoding;
use crate::error::{MarcError, Result};

/// Length of an ISO 2709 leader in bytes.
pub const LEADER_LEN: usize = 24;

/// Layout information read from a binary leader.
///
/// Only positions 0-4 and 12-16 are validated; the single-character positions are
/// taken as-is because real-world files fill them loosely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leader {
    /// Record length (5 digits) - positions 0-4
    pub record_length: usize,
    /// Record status (1 char) - position 5
    pub record_status: char,
    /// Type of record (1 char) - position 6
    pub record_type: char,
    /// Bibliographic level (1 char) - position 7
    pub bibliographic_level: char,
    /// Character coding scheme (1 char) - position 9
    pub character_coding: char,
    /// Base address of data (5 digits) - positions 12-16
    pub data_base_address: usize,
}

impl Leader {
    /// Parse a leader from the first 24 bytes of a record.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 24 bytes are given or if the record length or
    /// base address is not five ASCII digits.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < LEADER_LEN {
            return Err(MarcError::InvalidLeader(format!(
                "Leader must be at least 24 bytes, got {}",
                bytes.len()
            )));
        }

        Ok(Leader {
            record_length: parse_digits(
                &bytes[0..5],
                "record length",
                MarcError::InvalidLeader,
            )?,
            record_status: bytes[5] as char,
            record_type: bytes[6] as char,
            bibliographic_level: bytes[7] as char,
            character_coding: bytes[9] as char,
            data_base_address: parse_digits(
                &bytes[12..17],
                "base address of data",
                MarcError::InvalidLeader,
            )?,
        })
    }

    /// Validate that the leader is suitable for binary record reading.
    ///
    /// Checks that `record_length` and `data_base_address` are at least 24 and that
    /// the data starts inside the record, which is required before performing
    /// arithmetic on these fields.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated bound.
    pub fn validate_for_reading(&self) -> Result<()> {
        if self.record_length < LEADER_LEN {
            return Err(MarcError::InvalidLeader(format!(
                "Record length must be at least 24, got {}",
                self.record_length
            )));
        }
        if self.data_base_address < LEADER_LEN {
            return Err(MarcError::InvalidLeader(format!(
                "Base address of data must be at least 24, got {}",
                self.data_base_address
            )));
        }
        if self.data_base_address > self.record_length {
            return Err(MarcError::InvalidLeader(format!(
                "Base address of data {} lies beyond record length {}",
                self.data_base_address, self.record_length
            )));
        }
        Ok(())
    }

    /// Character coding declared in position 9, if recognised.
    #[must_use]
    pub fn encoding(&self) -> Option<MarcEncoding> {
        MarcEncoding::from_leader_char(self.character_coding).ok()
    }
}

/// Parse an ASCII decimal number, reporting non-digits through `error`.
pub(crate) fn parse_digits(
    bytes: &[u8],
    what: &str,
    error: fn(String) -> MarcError,
) -> Result<usize> {
    let mut result = 0usize;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return Err(error(format!(
                "Invalid {what}: expected digits, got {:?}",
                String::from_utf8_lossy(bytes)
            )));
        }
        result = result * 10 + usize::from(byte - b'0');
    }
    Ok(result)
}
