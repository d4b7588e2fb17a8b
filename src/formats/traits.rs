//! Format reader trait for MARC records.
//!
//! Every decoder (ISO 2709, MARCXML, MARC-in-JSON, mnemonic) implements
//! [`FormatReader`], so the batch processor can drive whichever one the sniffer picked
//! through a single trait object.
//!
//! # Example
//!
//! ```ignore
//! use marcview::formats::{FormatReader, FormatReaderExt};
//!
//! fn count_good<R: FormatReader>(reader: &mut R) -> usize {
//!     reader.records().filter(Result::is_ok).count()
//! }
//! ```

use super::Format;
use crate::error::Result;
use crate::record::Record;

/// Trait for decoders that produce MARC records from an in-memory buffer.
///
/// The sequence a reader produces is lazy, finite and non-restartable: each call
/// consumes one unit (record or block) of the source.
///
/// # Implementation Notes
///
/// Implementations must:
/// - Return `Ok(None)` once the source is exhausted (not an error)
/// - Advance past a unit *before* reporting that it failed, so an `Err` never
///   stalls iteration and the next call continues with the following unit
/// - Preserve field and subfield ordering exactly
pub trait FormatReader: std::fmt::Debug {
    /// Read the next record from the source.
    ///
    /// Returns:
    /// - `Ok(Some(record))` if a record was read successfully
    /// - `Ok(None)` if the end of the source was reached
    /// - `Err(_)` if this unit was malformed; later units may still be read
    ///
    /// # Errors
    ///
    /// Returns an error if the current unit contains malformed data.
    fn read_record(&mut self) -> Result<Option<Record>>;

    /// The format this reader decodes.
    fn format(&self) -> Format;

    /// Read all remaining records into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first per-record error. On error, previously read records are
    /// discarded.
    fn read_all(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Returns the number of records successfully read so far.
    ///
    /// The default implementation returns `None` if tracking is not supported.
    fn records_read(&self) -> Option<usize> {
        None
    }
}

impl<R: FormatReader + ?Sized> FormatReader for Box<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        (**self).read_record()
    }

    fn format(&self) -> Format {
        (**self).format()
    }

    fn records_read(&self) -> Option<usize> {
        (**self).records_read()
    }
}

/// Extension trait providing iterator-style access for format readers.
///
/// This trait is automatically implemented for all types implementing [`FormatReader`].
pub trait FormatReaderExt: FormatReader {
    /// Create an iterator over per-unit results from this reader.
    ///
    /// Failed units are yielded as `Err` and iteration continues with the next unit.
    fn records(&mut self) -> RecordIterator<'_, Self>
    where
        Self: Sized,
    {
        RecordIterator { reader: self }
    }
}

impl<T: FormatReader> FormatReaderExt for T {}

/// Iterator adapter for [`FormatReader`].
///
/// Created by the [`records`](FormatReaderExt::records) method.
#[derive(Debug)]
pub struct RecordIterator<'a, R: FormatReader> {
    reader: &'a mut R,
}

impl<R: FormatReader> Iterator for RecordIterator<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
