//! Reading ISO 2709 binary MARC records from a byte buffer.
//!
//! This module provides [`MarcReader`], which walks a buffer of concatenated
//! records one record at a time. Each record is framed by its 0x1D record
//! terminator before it is parsed, so a malformed record is reported and skipped
//! without losing sync with the records that follow it.
//!
//! # Examples
//!
//! ```
//! use marcview::MarcReader;
//!
//! let data = b"";
//! let mut reader = MarcReader::new(data);
//!
//! while let Some(result) = reader.next_record() {
//!     match result {
//!         Ok(record) => println!("{:?}", record.control_number()),
//!         Err(e) => eprintln!("skipped: {e}"),
//!     }
//! }
//! ```

use crate::encoding::{decode_lossy, MarcEncoding};
use crate::error::{MarcError, Result};
use crate::formats::{Format, FormatReader};
use crate::leader::{parse_digits, Leader, LEADER_LEN};
use crate::record::{ControlField, DataField, Record, Tag};
use crate::recovery::{RecoveryContext, RecoveryMode};

pub(crate) const RECORD_TERMINATOR: u8 = 0x1D;
pub(crate) const FIELD_TERMINATOR: u8 = 0x1E;
pub(crate) const SUBFIELD_DELIMITER: u8 = 0x1F;

const DIRECTORY_ENTRY_LEN: usize = 12;

/// Reader for ISO 2709 binary MARC format.
///
/// `MarcReader` borrows the caller's buffer and yields one record per call. Records
/// are fully parsed and returned as [`Record`] instances.
#[derive(Debug)]
pub struct MarcReader<'a> {
    data: &'a [u8],
    position: usize,
    recovery_mode: RecoveryMode,
    records_read: usize,
}

impl<'a> MarcReader<'a> {
    /// Create a new MARC reader over a buffer of concatenated records.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        MarcReader {
            data,
            position: 0,
            recovery_mode: RecoveryMode::Strict,
            records_read: 0,
        }
    }

    /// Set the recovery mode for handling malformed fields.
    ///
    /// - `Strict`: a malformed directory entry or field fails the record (default)
    /// - `Lenient`: skip malformed entries, keep the rest of the record
    /// - `Permissive`: also salvage fields that overrun the record
    ///
    /// # Examples
    ///
    /// ```
    /// use marcview::{MarcReader, RecoveryMode};
    ///
    /// let reader = MarcReader::new(&[]).with_recovery_mode(RecoveryMode::Lenient);
    /// ```
    #[must_use]
    pub fn with_recovery_mode(mut self, mode: RecoveryMode) -> Self {
        self.recovery_mode = mode;
        self
    }

    /// Read a single MARC record.
    ///
    /// Returns `Ok(Some(record))` if a record was successfully read, `Ok(None)` at
    /// the end of the buffer, or `Err` if the current record is malformed. After an
    /// error the reader is already positioned at the next record.
    ///
    /// # Errors
    ///
    /// Returns an error if the leader, directory or a field of the current record is
    /// malformed (subject to the recovery mode).
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let Some(bytes) = self.next_frame() else {
            return Ok(None);
        };
        let offset = self.position - bytes.len();

        match parse_record(bytes, self.recovery_mode) {
            Ok(record) => {
                self.records_read += 1;
                Ok(Some(record))
            },
            Err(e) => {
                tracing::warn!(offset, "failed to decode binary record: {e}");
                Err(e)
            },
        }
    }

    /// Iterator-style variant of [`read_record`](Self::read_record).
    pub fn next_record(&mut self) -> Option<Result<Record>> {
        self.read_record().transpose()
    }

    /// Slice out the next record, up to and including its terminator, and advance.
    fn next_frame(&mut self) -> Option<&'a [u8]> {
        let data = self.data;
        while self.position < data.len() && data[self.position].is_ascii_whitespace() {
            self.position += 1;
        }
        if self.position >= data.len() {
            return None;
        }

        let start = self.position;
        let end = memchr::memchr(RECORD_TERMINATOR, &data[start..])
            .map_or(data.len(), |i| start + i + 1);
        self.position = end;
        Some(&data[start..end])
    }
}

impl FormatReader for MarcReader<'_> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        MarcReader::read_record(self)
    }

    fn format(&self) -> Format {
        Format::Binary
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

/// Parse one framed record (leader through record terminator).
fn parse_record(bytes: &[u8], mode: RecoveryMode) -> Result<Record> {
    if bytes.len() < LEADER_LEN {
        return Err(MarcError::TruncatedRecord(format!(
            "{} bytes is shorter than the 24-byte leader",
            bytes.len()
        )));
    }

    let leader = Leader::from_bytes(&bytes[..LEADER_LEN])?;
    leader.validate_for_reading()?;

    if bytes.last() != Some(&RECORD_TERMINATOR) {
        return Err(MarcError::TruncatedRecord(
            "record is not terminated by 0x1D".to_string(),
        ));
    }

    if leader.encoding() == Some(MarcEncoding::Marc8) {
        tracing::debug!("record declares MARC-8; decoding as UTF-8 best effort");
    }

    let mut context = RecoveryContext::new(mode);

    if leader.record_length != bytes.len() {
        context.recover::<()>(
            MarcError::InvalidRecord(format!(
                "declared record length {} but record occupies {} bytes",
                leader.record_length,
                bytes.len()
            )),
            "leader",
        )?;
    }

    let base_address = leader.data_base_address;
    if base_address > bytes.len() {
        return Err(MarcError::TruncatedRecord(format!(
            "base address of data {base_address} lies beyond the {} record bytes",
            bytes.len()
        )));
    }
    // Fields may not reach past the declared length, nor past the framed bytes.
    let limit = leader.record_length.min(bytes.len());

    let mut builder = Record::builder().leader(decode_lossy(&bytes[..LEADER_LEN]));

    // Directory entries: tag(3) + length(4) + start position(5), ended by 0x1E
    let directory = &bytes[LEADER_LEN..base_address];
    let mut pos = 0;
    while pos < directory.len() {
        if directory[pos] == FIELD_TERMINATOR {
            break;
        }

        if pos + DIRECTORY_ENTRY_LEN > directory.len() {
            context.recover::<()>(
                MarcError::InvalidRecord("Incomplete directory entry".to_string()),
                "directory",
            )?;
            break;
        }

        let entry = &directory[pos..pos + DIRECTORY_ENTRY_LEN];
        pos += DIRECTORY_ENTRY_LEN;

        let Some((tag, field_length, start_position)) =
            parse_directory_entry(entry)
                .map(Some)
                .or_else(|e| context.recover(e, "directory"))?
        else {
            continue;
        };

        let field_start = base_address + start_position;
        let field_end = field_start + field_length;
        let slice_end = if field_end > limit {
            let error = MarcError::InvalidRecord(format!(
                "Field {tag} (start {start_position}, length {field_length}) exceeds record length {}",
                leader.record_length
            ));
            context.recover::<()>(error, &format!("field {tag}"))?;
            if context.salvages_truncated() && field_start < limit {
                limit
            } else {
                continue;
            }
        } else {
            field_end
        };

        let field_data = field_body(&bytes[field_start..slice_end]);

        if tag.is_control_tag() {
            let value = decode_lossy(field_data).into_owned();
            builder.push_field(ControlField::new(tag, value));
        } else {
            let context_label = format!("field {tag}");
            if let Some(field) = parse_data_field(field_data, tag)
                .map(Some)
                .or_else(|e| context.recover(e, &context_label))?
            {
                builder.push_field(field);
            }
        }
    }

    if context.has_errors() {
        tracing::debug!(
            recoveries = context.recovery_messages.len(),
            "record decoded with recoveries"
        );
    }

    Ok(builder.build())
}

/// Split a 12-byte directory entry into tag, field length and start position.
fn parse_directory_entry(entry: &[u8]) -> Result<(Tag, usize, usize)> {
    let tag = Tag::new(decode_lossy(&entry[0..3]))?;
    let field_length = parse_digits(&entry[3..7], "field length", MarcError::InvalidRecord)?;
    let start_position =
        parse_digits(&entry[7..12], "field start position", MarcError::InvalidRecord)?;
    Ok((tag, field_length, start_position))
}

/// Field bytes up to (not including) the first field terminator.
fn field_body(data: &[u8]) -> &[u8] {
    match memchr::memchr(FIELD_TERMINATOR, data) {
        Some(end) => &data[..end],
        None => data,
    }
}

/// Parse a data field from raw bytes
fn parse_data_field(data: &[u8], tag: Tag) -> Result<DataField> {
    if data.len() < 2 {
        return Err(MarcError::InvalidField(format!(
            "Field {tag} too short (needs indicators)"
        )));
    }

    let mut field = DataField::new(tag, data[0] as char, data[1] as char);

    let subfield_data = &data[2..];
    if subfield_data.is_empty() {
        return Ok(field);
    }
    if subfield_data[0] != SUBFIELD_DELIMITER {
        return Err(MarcError::InvalidField(format!(
            "Field {}: expected subfield delimiter after indicators",
            field.tag
        )));
    }

    for chunk in subfield_data[1..].split(|&b| b == SUBFIELD_DELIMITER) {
        // A delimiter with nothing after it carries no subfield.
        let Some((&code, value)) = chunk.split_first() else {
            continue;
        };
        field.add_subfield(code as char, decode_lossy(value));
    }

    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a binary record from (tag, body) pairs; bodies exclude the field
    /// terminator.
    fn build_record(fields: &[(&str, &[u8])]) -> Vec<u8> {
        let mut directory = Vec::new();
        let mut data = Vec::new();
        for (tag, body) in fields {
            let mut field = body.to_vec();
            field.push(FIELD_TERMINATOR);
            directory.extend_from_slice(tag.as_bytes());
            directory.extend_from_slice(format!("{:04}{:05}", field.len(), data.len()).as_bytes());
            data.extend_from_slice(&field);
        }
        directory.push(FIELD_TERMINATOR);

        let base_address = LEADER_LEN + directory.len();
        let record_length = base_address + data.len() + 1;

        let mut record = format!("{record_length:05}nam a22{base_address:05} a 4500").into_bytes();
        record.extend_from_slice(&directory);
        record.extend_from_slice(&data);
        record.push(RECORD_TERMINATOR);
        record
    }

    fn sample_record() -> Vec<u8> {
        build_record(&[
            ("001", b"12345"),
            ("245", b"10\x1faTest title\x1fcAuthor"),
        ])
    }

    /// Overwrite the length digits of directory entry `index`.
    fn patch_entry_length(record: &mut [u8], index: usize, length: &str) {
        let at = LEADER_LEN + index * DIRECTORY_ENTRY_LEN + 3;
        record[at..at + 4].copy_from_slice(length.as_bytes());
    }

    #[test]
    fn test_read_simple_record() {
        let bytes = sample_record();
        let mut reader = MarcReader::new(&bytes);

        let record = reader.read_record().unwrap().unwrap();

        assert_eq!(record.leader().len(), 24);
        assert_eq!(record.control_number(), Some("12345"));
        let field = record.get_fields("245").next().unwrap();
        assert_eq!(field.indicator1, '1');
        assert_eq!(field.indicator2, '0');
        assert_eq!(field.get_subfield('a'), Some("Test title"));
        assert_eq!(field.get_subfield('c'), Some("Author"));

        assert!(reader.read_record().unwrap().is_none());
        assert_eq!(reader.records_read(), Some(1));
    }

    #[test]
    fn test_eof_returns_none() {
        let mut reader = MarcReader::new(&[]);
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_read_multiple_records_with_separating_newlines() {
        let mut all_bytes = Vec::new();
        for _ in 0..3 {
            all_bytes.extend_from_slice(&sample_record());
            all_bytes.extend_from_slice(b"\r\n");
        }

        let mut reader = MarcReader::new(&all_bytes);
        let mut count = 0;
        while let Some(result) = reader.next_record() {
            result.unwrap();
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn test_field_exceeding_record_is_contained() {
        let mut bad = sample_record();
        patch_entry_length(&mut bad, 1, "9999");
        let mut all_bytes = bad;
        all_bytes.extend_from_slice(&sample_record());

        let mut reader = MarcReader::new(&all_bytes);

        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, MarcError::InvalidRecord(_)));
        assert!(err.to_string().contains("exceeds record length"), "got: {err}");

        let next = reader.read_record().unwrap().unwrap();
        assert_eq!(next.control_number(), Some("12345"));
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_lenient_skips_overflowing_field() {
        let mut bad = sample_record();
        patch_entry_length(&mut bad, 1, "9999");

        let mut reader = MarcReader::new(&bad).with_recovery_mode(RecoveryMode::Lenient);
        let record = reader.read_record().unwrap().unwrap();
        assert_eq!(record.control_number(), Some("12345"));
        assert_eq!(record.get_fields("245").count(), 0);
    }

    #[test]
    fn test_permissive_salvages_overflowing_field() {
        let mut bad = sample_record();
        patch_entry_length(&mut bad, 1, "9999");

        let mut reader = MarcReader::new(&bad).with_recovery_mode(RecoveryMode::Permissive);
        let record = reader.read_record().unwrap().unwrap();
        let field = record.get_fields("245").next().unwrap();
        assert_eq!(field.get_subfield('a'), Some("Test title"));
        assert_eq!(field.get_subfield('c'), Some("Author"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_fatal() {
        let bytes = build_record(&[("245", b"00\x1faCaf\xe9")]);
        let mut reader = MarcReader::new(&bytes);
        let record = reader.read_record().unwrap().unwrap();
        let field = record.get_fields("245").next().unwrap();
        assert_eq!(field.get_subfield('a'), Some("Caf\u{FFFD}"));
    }

    #[test]
    fn test_missing_terminator_is_truncated() {
        let mut bytes = sample_record();
        bytes.pop();
        let mut reader = MarcReader::new(&bytes);
        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, MarcError::TruncatedRecord(_)));
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_short_fragment_is_truncated() {
        let mut reader = MarcReader::new(b"00123nam\x1d");
        assert!(matches!(
            reader.read_record().unwrap_err(),
            MarcError::TruncatedRecord(_)
        ));
    }

    #[test]
    fn test_record_length_mismatch_strict_and_lenient() {
        let mut bytes = sample_record();
        let wrong = format!("{:05}", bytes.len() + 10);
        bytes[0..5].copy_from_slice(wrong.as_bytes());

        let mut strict = MarcReader::new(&bytes);
        assert!(strict.read_record().is_err());

        let mut lenient = MarcReader::new(&bytes).with_recovery_mode(RecoveryMode::Lenient);
        let record = lenient.read_record().unwrap().unwrap();
        assert_eq!(record.control_number(), Some("12345"));
    }

    #[test]
    fn test_malformed_leader_record_length_too_small() {
        let mut reader = MarcReader::new(b"00010nam a2200025 i 4500\x1d");
        let err = reader.read_record().unwrap_err().to_string();
        assert!(
            err.contains("Record length must be at least 24"),
            "got: {err}"
        );
    }

    #[test]
    fn test_non_numeric_directory_entry() {
        let mut bad = sample_record();
        let at = LEADER_LEN + DIRECTORY_ENTRY_LEN + 3;
        bad[at..at + 4].copy_from_slice(b"00x9");

        let err = MarcReader::new(&bad).read_record().unwrap_err();
        assert!(matches!(err, MarcError::InvalidRecord(_)));
        assert!(err.to_string().contains("Invalid field length"), "got: {err}");

        let mut lenient = MarcReader::new(&bad).with_recovery_mode(RecoveryMode::Lenient);
        let record = lenient.read_record().unwrap().unwrap();
        assert_eq!(record.control_number(), Some("12345"));
        assert_eq!(record.get_fields("245").count(), 0);
    }

    #[test]
    fn test_parse_data_field_returns_field() {
        let tag = Tag::new("245").unwrap();
        let field = parse_data_field(b"14\x1faThe title\x1f\x1fcBy", tag.clone()).unwrap();
        assert_eq!((field.indicator1, field.indicator2), ('1', '4'));
        assert_eq!(field.subfields.len(), 2);
        assert_eq!(field.get_subfield('c'), Some("By"));

        let err = parse_data_field(b"1", tag).unwrap_err();
        assert!(matches!(err, MarcError::InvalidField(_)));
    }

    #[test]
    fn test_data_field_without_delimiter() {
        let bytes = build_record(&[("245", b"10Title")]);
        let mut reader = MarcReader::new(&bytes);
        assert!(matches!(
            reader.read_record().unwrap_err(),
            MarcError::InvalidField(_)
        ));
    }

    #[test]
    fn test_subfield_order_preserved() {
        let bytes = build_record(&[("650", b" 0\x1faOne\x1fxTwo\x1faThree\x1fvFour")]);
        let mut reader = MarcReader::new(&bytes);
        let record = reader.read_record().unwrap().unwrap();
        let field = record.get_fields("650").next().unwrap();
        let pairs: Vec<(char, &str)> = field
            .subfields
            .iter()
            .map(|sf| (sf.code, sf.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![('a', "One"), ('x', "Two"), ('a', "Three"), ('v', "Four")]
        );
    }

    #[test]
    fn test_non_numeric_tag_is_data_field() {
        let bytes = build_record(&[("FMT", b"  \x1faBK")]);
        let mut reader = MarcReader::new(&bytes);
        let record = reader.read_record().unwrap().unwrap();
        assert_eq!(record.data_fields().count(), 1);
    }
}
