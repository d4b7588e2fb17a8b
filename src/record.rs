//! MARC record structures.
//!
//! This module provides the canonical record model shared by every decoder and the
//! renderer:
//! - [`Record`] - leader plus an ordered sequence of fields
//! - [`Field`] - either a [`ControlField`] or a [`DataField`]
//! - [`Subfield`] - coded data element inside a data field
//! - [`Tag`] - validated three-character field identifier
//!
//! Records are built once through [`RecordBuilder`] and are read-only afterwards.
//!
//! # Examples
//!
//! ```
//! use marcview::{ControlField, DataField, Record, Tag};
//!
//! # fn main() -> marcview::Result<()> {
//! let mut title = DataField::new(Tag::new("245")?, '1', '0');
//! title.add_subfield('a', "Title");
//!
//! let record = Record::builder()
//!     .leader("00123nam a2200061 a 4500")
//!     .field(ControlField::new(Tag::new("001")?, "12345"))
//!     .field(title)
//!     .build();
//!
//! assert_eq!(record.control_number(), Some("12345"));
//! assert_eq!(record.fields().len(), 2);
//! # Ok(())
//! # }
//! ```

use crate::error::{MarcError, Result};
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;

/// Three-character field tag, conventionally numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Validate and wrap a tag.
    ///
    /// # Errors
    ///
    /// Returns `MarcError::InvalidField` unless the tag is exactly three characters.
    pub fn new(tag: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        if tag.chars().count() == 3 {
            Ok(Tag(tag))
        } else {
            Err(MarcError::InvalidField(format!(
                "Tag must be exactly 3 characters, got {tag:?}"
            )))
        }
    }

    /// The tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this tag names a control field (all digits, below `010`).
    #[must_use]
    pub fn is_control_tag(&self) -> bool {
        self.0.bytes().all(|b| b.is_ascii_digit()) && self.0.as_str() < "010"
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A control field (conventionally 001-009): raw text, no indicators or subfields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlField {
    /// Field tag
    pub tag: Tag,
    /// Field value
    pub value: String,
}

impl ControlField {
    /// Create a control field.
    #[must_use]
    pub fn new(tag: Tag, value: impl Into<String>) -> Self {
        ControlField {
            tag,
            value: value.into(),
        }
    }
}

/// A variable data field with two indicators and coded subfields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataField {
    /// Field tag
    pub tag: Tag,
    /// First indicator
    pub indicator1: char,
    /// Second indicator
    pub indicator2: char,
    /// Subfields (stored in `SmallVec` to avoid allocation for typical fields with 4 or fewer subfields)
    pub subfields: SmallVec<[Subfield; 4]>,
}

/// A subfield within a data field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield value
    pub value: String,
}

impl DataField {
    /// Create a new data field with no subfields.
    #[must_use]
    pub fn new(tag: Tag, indicator1: char, indicator2: char) -> Self {
        DataField {
            tag,
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        }
    }

    /// Append a subfield, keeping source order.
    pub fn add_subfield(&mut self, code: char, value: impl Into<String>) {
        self.subfields.push(Subfield {
            code,
            value: value.into(),
        });
    }

    /// Get first value for a subfield code
    #[must_use]
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Iterate over subfields with a specific code
    pub fn subfields_by_code(&self, code: char) -> impl Iterator<Item = &str> {
        self.subfields
            .iter()
            .filter(move |sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }
}

/// One field of a record, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Field {
    /// Control field
    Control(ControlField),
    /// Data field
    Data(DataField),
}

impl Field {
    /// Tag of either kind of field.
    #[must_use]
    pub fn tag(&self) -> &Tag {
        match self {
            Field::Control(field) => &field.tag,
            Field::Data(field) => &field.tag,
        }
    }

    /// The control field, if this is one.
    #[must_use]
    pub fn as_control(&self) -> Option<&ControlField> {
        match self {
            Field::Control(field) => Some(field),
            Field::Data(_) => None,
        }
    }

    /// The data field, if this is one.
    #[must_use]
    pub fn as_data(&self) -> Option<&DataField> {
        match self {
            Field::Data(field) => Some(field),
            Field::Control(_) => None,
        }
    }
}

impl From<ControlField> for Field {
    fn from(field: ControlField) -> Self {
        Field::Control(field)
    }
}

impl From<DataField> for Field {
    fn from(field: DataField) -> Self {
        Field::Data(field)
    }
}

/// A MARC bibliographic record.
///
/// Control and data fields share one ordered list so that interleaved source order
/// survives decoding and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    leader: String,
    fields: Vec<Field>,
}

impl Record {
    /// Create a builder for constructing a record.
    #[must_use]
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// Leader text: 24 characters for binary records, best-effort or empty otherwise.
    #[must_use]
    pub fn leader(&self) -> &str {
        &self.leader
    }

    /// All fields in source order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Control fields in source order.
    pub fn control_fields(&self) -> impl Iterator<Item = &ControlField> {
        self.fields.iter().filter_map(Field::as_control)
    }

    /// Data fields in source order.
    pub fn data_fields(&self) -> impl Iterator<Item = &DataField> {
        self.fields.iter().filter_map(Field::as_data)
    }

    /// Value of the first control field with the given tag.
    #[must_use]
    pub fn get_control_field(&self, tag: &str) -> Option<&str> {
        self.control_fields()
            .find(|field| field.tag == tag)
            .map(|field| field.value.as_str())
    }

    /// Data fields with the given tag, in source order.
    pub fn get_fields<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DataField> + 'a {
        self.data_fields().filter(move |field| field.tag == tag)
    }

    /// Record control number (first 001 field).
    #[must_use]
    pub fn control_number(&self) -> Option<&str> {
        self.get_control_field("001")
    }
}

/// Builder used by decoders to assemble a [`Record`] before emitting it.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    leader: String,
    fields: Vec<Field>,
}

impl RecordBuilder {
    /// Set the leader text
    #[must_use]
    pub fn leader(mut self, leader: impl Into<String>) -> Self {
        self.leader = leader.into();
        self
    }

    /// Add a field to the record being built
    #[must_use]
    pub fn field(mut self, field: impl Into<Field>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Set the leader text in place.
    pub fn set_leader(&mut self, leader: impl Into<String>) {
        self.leader = leader.into();
    }

    /// Append a field in place.
    pub fn push_field(&mut self, field: impl Into<Field>) {
        self.fields.push(field.into());
    }

    /// Build the record
    #[must_use]
    pub fn build(self) -> Record {
        Record {
            leader: self.leader,
            fields: self.fields,
        }
    }
}
