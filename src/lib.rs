#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! ## Modules
//!
//! - [`formats`] - Format sniffing and the [`FormatReader`] decoder trait
//! - [`reader`] - ISO 2709 binary decoder
//! - [`marcxml`] - MARCXML decoder
//! - [`marcjson`] - MARC-in-JSON decoder
//! - [`mnemonic`] - Mnemonic (MARCMaker) text decoder
//! - [`record`] - Core record structures (`Record`, `Field`, `Subfield`)
//! - [`render`] - Plain text rendering
//! - [`batch`] - Whole-buffer processing with per-record error isolation
//! - [`leader`] - ISO 2709 leader (24-byte header)
//! - [`recovery`] - Recovery modes for malformed binary records
//! - [`encoding`] - Character coding and lossy UTF-8 decoding
//! - [`error`] - Error types and result type

pub mod batch;
pub mod encoding;
pub mod error;
/// Format detection and decoder dispatch.
///
/// See the [`formats`] module documentation for the detection rules.
pub mod formats;
pub mod leader;
pub mod marcjson;
pub mod marcxml;
pub mod mnemonic;
pub mod reader;
/// Core MARC record structures (`Record`, `Field`, `Subfield`)
pub mod record;
pub mod recovery;
pub mod render;

pub use batch::{process, process_reader, BatchOutput, BatchProcessor, ReportedError};
pub use error::{ErrorKind, MarcError, Result};
pub use formats::{classify, Format, FormatReader, FormatReaderExt};
pub use leader::Leader;
pub use marcjson::MarcJsonReader;
pub use marcxml::MarcXmlReader;
pub use mnemonic::MnemonicReader;
pub use reader::MarcReader;
pub use record::{ControlField, DataField, Field, Record, RecordBuilder, Subfield, Tag};
pub use recovery::{RecoveryContext, RecoveryMode};
pub use render::{render, RecordRenderer, TextRenderer};
