//! Batch processing: sniff, decode and render a whole buffer.
//!
//! [`BatchProcessor::process`] never fails as a whole. A buffer that cannot be
//! classified or parsed at the document level yields an output with a single
//! top-level error and no text. Otherwise every unit the decoder produces is either
//! rendered or replaced by an inline error block, and each unit is followed by a
//! separator line:
//!
//! ```text
//! Record ID: 12345
//! 245  10 a Title
//!
//! ========================================
//! Error parsing record: Invalid field: ...
//! Details:
//! DecodeError in record 2 (Mnemonic)
//!
//! ========================================
//! ```
//!
//! # Examples
//!
//! ```
//! use marcview::batch::process;
//!
//! let json = br#"[{"leader": "00123nam a2200061 a 4500",
//!                 "fields": [{"001": "12345"}]}]"#;
//! let output = process(json);
//!
//! assert!(output.errors.is_empty());
//! assert!(output.text.starts_with("Record ID: 12345\n001: 12345\n"));
//! ```

use std::fmt;
use std::io::Read;

use serde::Serialize;

use crate::error::{ErrorKind, MarcError};
use crate::formats::{classify, decoder_for, Format};
use crate::recovery::RecoveryMode;
use crate::render::{RecordRenderer, TextRenderer};

/// Width of the `=` rule written after every unit.
const SEPARATOR_WIDTH: usize = 40;

/// An error as surfaced to the caller of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedError {
    /// Coarse classification
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// 1-based index of the failed unit, or `None` for a top-level failure
    pub record: Option<usize>,
}

impl ReportedError {
    /// Report `error` against a unit index (or the whole batch when `None`).
    #[must_use]
    pub fn new(error: &MarcError, record: Option<usize>) -> Self {
        ReportedError {
            kind: error.kind(),
            message: error.to_string(),
            record,
        }
    }
}

impl fmt::Display for ReportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record {
            Some(n) => write!(f, "{} in record {n}: {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Result of processing one buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutput {
    /// Detected format, `None` if the source could not be read
    pub format: Option<Format>,
    /// Rendered records, inline error blocks and separators
    pub text: String,
    /// Every error, in the order encountered
    pub errors: Vec<ReportedError>,
    /// Number of units rendered successfully
    pub records_rendered: usize,
}

impl BatchOutput {
    /// Output for a failure that prevented any unit from being processed.
    #[must_use]
    pub fn fatal(format: Option<Format>, error: &MarcError) -> Self {
        BatchOutput {
            format,
            errors: vec![ReportedError::new(error, None)],
            ..BatchOutput::default()
        }
    }

    /// Whether a top-level failure occurred.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.errors.iter().any(|e| e.record.is_none())
    }
}

/// Configured pipeline from raw bytes to rendered text.
#[derive(Debug)]
pub struct BatchProcessor {
    recovery_mode: RecoveryMode,
    renderer: Box<dyn RecordRenderer>,
}

impl Default for BatchProcessor {
    fn default() -> Self {
        BatchProcessor {
            recovery_mode: RecoveryMode::default(),
            renderer: Box::new(TextRenderer),
        }
    }
}

impl BatchProcessor {
    /// Processor with strict recovery and the plain text renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recovery mode used for ISO 2709 input.
    #[must_use]
    pub fn with_recovery_mode(mut self, mode: RecoveryMode) -> Self {
        self.recovery_mode = mode;
        self
    }

    /// Replace the renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl RecordRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Sniff, decode and render every unit in `bytes`.
    #[must_use]
    pub fn process(&self, bytes: &[u8]) -> BatchOutput {
        let format = classify(bytes);
        let mut reader = match decoder_for(format, bytes, self.recovery_mode) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!(%format, "cannot decode input: {e}");
                return BatchOutput::fatal(Some(format), &e);
            },
        };

        let mut output = BatchOutput {
            format: Some(format),
            ..BatchOutput::default()
        };

        let mut index = 0;
        loop {
            let unit = match reader.read_record() {
                Ok(Some(record)) => Ok(record),
                Ok(None) => break,
                Err(e) => Err(e),
            };
            index += 1;

            match unit.and_then(|record| self.renderer.render(&record)) {
                Ok(text) => {
                    output.text.push_str(&text);
                    output.records_rendered += 1;
                },
                Err(e) => {
                    let reported = ReportedError::new(&e, Some(index));
                    write_error_block(&mut output.text, &reported, format);
                    output.errors.push(reported);
                },
            }
            write_separator(&mut output.text);
        }

        tracing::debug!(
            %format,
            units = index,
            rendered = output.records_rendered,
            failed = output.errors.len(),
            "batch complete"
        );
        output
    }

    /// Drain `source` into memory, then [`process`](Self::process) it.
    ///
    /// A read failure yields a single top-level `SourceRead` error and no text.
    #[must_use]
    pub fn process_reader<R: Read>(&self, mut source: R) -> BatchOutput {
        let mut bytes = Vec::new();
        if let Err(e) = source.read_to_end(&mut bytes) {
            let error = MarcError::SourceRead(e);
            tracing::warn!("{error}");
            return BatchOutput::fatal(None, &error);
        }
        self.process(&bytes)
    }
}

fn write_error_block(text: &mut String, error: &ReportedError, format: Format) {
    text.push_str("Error parsing record: ");
    text.push_str(&error.message);
    text.push_str("\nDetails:\n");
    text.push_str(error.kind.name());
    if let Some(n) = error.record {
        text.push_str(" in record ");
        text.push_str(&n.to_string());
    }
    text.push_str(" (");
    text.push_str(format.name());
    text.push_str(")\n");
}

fn write_separator(text: &mut String) {
    text.push('\n');
    text.extend(std::iter::repeat('=').take(SEPARATOR_WIDTH));
    text.push('\n');
}

/// Process a buffer with the default configuration.
#[must_use]
pub fn process(bytes: &[u8]) -> BatchOutput {
    BatchProcessor::default().process(bytes)
}

/// Process a readable source with the default configuration.
#[must_use]
pub fn process_reader<R: Read>(source: R) -> BatchOutput {
    BatchProcessor::default().process_reader(source)
}
