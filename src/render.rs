//! Rendering records as human-readable text.
//!
//! The text layout is one header line followed by one line per field, in the record's
//! original field order:
//!
//! ```text
//! Record ID: 12345
//! 001: 12345
//! 245  10 a Title c Author
//! ```
//!
//! # Examples
//!
//! ```
//! use marcview::render::render;
//! use marcview::{ControlField, DataField, Record, Tag};
//!
//! # fn main() -> marcview::Result<()> {
//! let mut title = DataField::new(Tag::new("245")?, '1', '0');
//! title.add_subfield('a', "Title");
//! let record = Record::builder()
//!     .field(ControlField::new(Tag::new("001")?, "12345"))
//!     .field(title)
//!     .build();
//!
//! assert_eq!(render(&record)?, "Record ID: 12345\n001: 12345\n245  10 a Title\n");
//! # Ok(())
//! # }
//! ```

use std::fmt::{self, Write};

use crate::error::{MarcError, Result};
use crate::record::{ControlField, DataField, Field, Record};

/// Header value used when a record has no 001 field.
pub const NO_ID: &str = "No ID";

/// Trait for turning a record into text.
///
/// Implementations must be deterministic and free of side effects beyond writing to
/// the sink.
pub trait RecordRenderer: fmt::Debug {
    /// Render `record` into `out`.
    ///
    /// # Errors
    ///
    /// Returns `MarcError::Render` if the sink rejects a write.
    fn render_into(&self, record: &Record, out: &mut dyn Write) -> Result<()>;

    /// Render `record` into a new string.
    ///
    /// # Errors
    ///
    /// Returns `MarcError::Render` if rendering fails.
    fn render(&self, record: &Record) -> Result<String> {
        let mut out = String::new();
        self.render_into(record, &mut out)?;
        Ok(out)
    }
}

/// The plain text layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl RecordRenderer for TextRenderer {
    fn render_into(&self, record: &Record, out: &mut dyn Write) -> Result<()> {
        write_record(record, out).map_err(|fmt::Error| {
            MarcError::Render(format!(
                "output sink rejected record {}",
                record.control_number().unwrap_or(NO_ID)
            ))
        })
    }
}

fn write_record(record: &Record, out: &mut dyn Write) -> fmt::Result {
    writeln!(out, "Record ID: {}", record.control_number().unwrap_or(NO_ID))?;
    for field in record.fields() {
        match field {
            Field::Control(field) => write_control_field(field, out)?,
            Field::Data(field) => write_data_field(field, out)?,
        }
    }
    Ok(())
}

fn write_control_field(field: &ControlField, out: &mut dyn Write) -> fmt::Result {
    writeln!(out, "{}: {}", field.tag, field.value)
}

fn write_data_field(field: &DataField, out: &mut dyn Write) -> fmt::Result {
    write!(
        out,
        "{:<4} {}{} ",
        field.tag.as_str(),
        field.indicator1,
        field.indicator2
    )?;
    for (i, subfield) in field.subfields.iter().enumerate() {
        if i > 0 {
            out.write_char(' ')?;
        }
        write!(out, "{} {}", subfield.code, subfield.value)?;
    }
    out.write_char('\n')
}

/// Render a record with [`TextRenderer`].
///
/// # Errors
///
/// Returns `MarcError::Render` if rendering fails.
pub fn render(record: &Record) -> Result<String> {
    TextRenderer.render(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Tag;

    fn tag(s: &str) -> Tag {
        Tag::new(s).unwrap()
    }

    /// Sink that accepts `budget` writes and then fails.
    struct FailingSink {
        budget: usize,
    }

    impl Write for FailingSink {
        fn write_str(&mut self, _s: &str) -> fmt::Result {
            if self.budget == 0 {
                return Err(fmt::Error);
            }
            self.budget -= 1;
            Ok(())
        }
    }

    #[test]
    fn test_render_no_id() {
        let record = Record::builder().build();
        assert_eq!(render(&record).unwrap(), "Record ID: No ID\n");
    }

    #[test]
    fn test_render_fields_in_order() {
        let mut subject = DataField::new(tag("650"), ' ', '0');
        subject.add_subfield('a', "Cats");
        subject.add_subfield('x', "Behavior");

        let record = Record::builder()
            .field(subject)
            .field(ControlField::new(tag("001"), "abc"))
            .field(ControlField::new(tag("008"), "850101s1985    nyu"))
            .build();

        assert_eq!(
            render(&record).unwrap(),
            "Record ID: abc\n\
             650   0 a Cats x Behavior\n\
             001: abc\n\
             008: 850101s1985    nyu\n"
        );
    }

    #[test]
    fn test_render_field_without_subfields() {
        let record = Record::builder()
            .field(DataField::new(tag("500"), ' ', ' '))
            .build();
        assert_eq!(render(&record).unwrap(), "Record ID: No ID\n500     \n");
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut field = DataField::new(tag("245"), '0', '0');
        field.add_subfield('a', "Same");
        let record = Record::builder().field(field).build();
        assert_eq!(render(&record).unwrap(), render(&record).unwrap());
    }

    #[test]
    fn test_sink_failure_is_render_error() {
        let record = Record::builder()
            .field(ControlField::new(tag("001"), "x"))
            .build();
        let mut sink = FailingSink { budget: 1 };
        let err = TextRenderer.render_into(&record, &mut sink).unwrap_err();
        assert!(matches!(err, MarcError::Render(_)));
    }
}
