//! Format detection and decoder dispatch.
//!
//! This module decides which encoding a raw buffer holds and hands back the matching
//! decoder behind the uniform [`FormatReader`] trait.
//!
//! # Supported Formats
//!
//! | Format | Module | Description |
//! |--------|--------|-------------|
//! | Binary | [`reader`](crate::reader) | ISO 2709 interchange format |
//! | Xml | [`marcxml`](crate::marcxml) | LOC MARCXML (`<record>` / `<collection>`) |
//! | Json | [`marcjson`](crate::marcjson) | MARC-in-JSON |
//! | Mnemonic | [`mnemonic`](crate::mnemonic) | MARCMaker-style `=TAG` text |
//!
//! # Detection
//!
//! [`classify`] applies a fixed-priority heuristic to the start of the buffer. ISO 2709
//! has no reliable textual prefix, so a binary buffer that happens to start with `{`,
//! `[` or `<?xml` is misclassified.
//!
//! ```
//! use marcview::formats::{classify, Format};
//!
//! assert_eq!(classify(b"  <?xml version=\"1.0\"?><record/>"), Format::Xml);
//! assert_eq!(classify(b"[{\"leader\": \"\"}]"), Format::Json);
//! assert_eq!(classify(b"=LDR  00000nam\n=001  1\n"), Format::Mnemonic);
//! assert_eq!(classify(b"00026nam a2200025 a 4500\x1e\x1d"), Format::Binary);
//! assert_eq!(classify(b" \n\t"), Format::Unknown);
//! ```

mod traits;

pub use traits::{FormatReader, FormatReaderExt, RecordIterator};

use crate::encoding::bom_len;
use crate::error::{MarcError, Result};
use crate::marcjson::MarcJsonReader;
use crate::marcxml::MarcXmlReader;
use crate::mnemonic::MnemonicReader;
use crate::reader::MarcReader;
use crate::recovery::RecoveryMode;

/// How far into the trimmed buffer the mnemonic rule looks for `=`.
const MNEMONIC_SNIFF_LEN: usize = 100;

/// Classification produced by the format sniffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Format {
    /// ISO 2709 binary MARC format (`.mrc`, `.marc`, `.001`, `.dat`)
    Binary,
    /// MARCXML
    Xml,
    /// MARC-in-JSON
    Json,
    /// Mnemonic (MARCMaker) text
    Mnemonic,
    /// Empty or unclassifiable input
    Unknown,
}

impl Format {
    /// Get the human-readable name for this format.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Binary => "ISO 2709",
            Self::Xml => "MARCXML",
            Self::Json => "MARC-in-JSON",
            Self::Mnemonic => "Mnemonic",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Classify a raw buffer.
///
/// Leading ASCII whitespace and a UTF-8 byte-order mark are skipped. Rules, first
/// match wins:
///
/// 1. starts with `<?xml` → [`Format::Xml`]
/// 2. starts with `[` or `{` → [`Format::Json`]
/// 3. contains a newline anywhere and has `=` in the first 100 bytes after
///    trimming → [`Format::Mnemonic`]
/// 4. anything else → [`Format::Binary`]
///
/// An empty or whitespace-only buffer is [`Format::Unknown`].
#[must_use]
pub fn classify(bytes: &[u8]) -> Format {
    let trimmed = trim_ascii(&bytes[bom_len(bytes)..]);

    let format = if trimmed.is_empty() {
        Format::Unknown
    } else if trimmed.starts_with(b"<?xml") {
        Format::Xml
    } else if trimmed.starts_with(b"[") || trimmed.starts_with(b"{") {
        Format::Json
    } else if memchr::memchr(b'\n', bytes).is_some()
        && memchr::memchr(b'=', &trimmed[..trimmed.len().min(MNEMONIC_SNIFF_LEN)]).is_some()
    {
        Format::Mnemonic
    } else {
        Format::Binary
    };

    tracing::debug!(%format, len = bytes.len(), "classified input");
    format
}

/// Build the decoder for a classified buffer.
///
/// The recovery mode applies to the binary decoder only.
///
/// # Errors
///
/// Returns `MarcError::FormatDetection` for [`Format::Unknown`], and the decoder's
/// document-level error when an XML or JSON document cannot be parsed at all.
pub fn decoder_for<'a>(
    format: Format,
    bytes: &'a [u8],
    recovery_mode: RecoveryMode,
) -> Result<Box<dyn FormatReader + 'a>> {
    match format {
        Format::Binary => Ok(Box::new(
            MarcReader::new(bytes).with_recovery_mode(recovery_mode),
        )),
        Format::Xml => Ok(Box::new(MarcXmlReader::from_bytes(bytes)?)),
        Format::Json => Ok(Box::new(MarcJsonReader::from_bytes(bytes)?)),
        Format::Mnemonic => Ok(Box::new(MnemonicReader::from_bytes(bytes))),
        Format::Unknown => Err(MarcError::FormatDetection(
            "input is empty or could not be classified".to_string(),
        )),
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |pos| pos + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_wins_over_everything() {
        assert_eq!(classify(b"<?xml version=\"1.0\"?>\n<a b=\"c\"/>"), Format::Xml);
        assert_eq!(classify(b"\r\n\t <?xml"), Format::Xml);
    }

    #[test]
    fn test_json_prefixes() {
        assert_eq!(classify(b"[]"), Format::Json);
        assert_eq!(classify(b"\n{\"a\": \"=\"}\n"), Format::Json);
    }

    #[test]
    fn test_mnemonic_needs_newline_and_equals() {
        assert_eq!(classify(b"=001  123\n=245  10$aT"), Format::Mnemonic);
        // no newline
        assert_eq!(classify(b"=001  123"), Format::Binary);
        // '=' too far in
        let mut late = vec![b'x'; 50];
        late.push(b'\n');
        late.extend_from_slice(&[b'x'; 100]);
        late.push(b'=');
        assert_eq!(classify(&late), Format::Binary);
    }

    #[test]
    fn test_binary_fallback() {
        assert_eq!(classify(b"00714cam a2200205 a 4500"), Format::Binary);
        assert_eq!(classify(&[0x00, 0x1d, 0xff]), Format::Binary);
    }

    #[test]
    fn test_empty_is_unknown() {
        assert_eq!(classify(b""), Format::Unknown);
        assert_eq!(classify(b"   \n\r\t"), Format::Unknown);
        assert_eq!(classify(b"\xEF\xBB\xBF"), Format::Unknown);
    }

    #[test]
    fn test_bom_is_skipped() {
        assert_eq!(classify(b"\xEF\xBB\xBF<?xml version=\"1.0\"?>"), Format::Xml);
    }

    #[test]
    fn test_decoder_for_unknown_is_detection_error() {
        let err = decoder_for(Format::Unknown, b"", RecoveryMode::Strict).unwrap_err();
        assert!(matches!(err, MarcError::FormatDetection(_)));
    }

    #[test]
    fn test_decoder_for_reports_format() {
        let reader = decoder_for(Format::Mnemonic, b"=001  1\n", RecoveryMode::Strict).unwrap();
        assert_eq!(reader.format(), Format::Mnemonic);
    }

    #[test]
    fn test_format_display() {
        assert_eq!(format!("{}", Format::Binary), "ISO 2709");
        assert_eq!(Format::Json.name(), "MARC-in-JSON");
    }
}
