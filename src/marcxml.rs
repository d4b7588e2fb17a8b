//! Decoding MARC records from MARCXML.
//!
//! MARCXML is defined by the Library of Congress
//! (<https://www.loc.gov/standards/marcxml/>): `tag`, `ind1`, `ind2` and `code` are
//! XML attributes, and records appear either bare or inside a `<collection>`. Both
//! default-namespace (`<record xmlns="...">`) and prefix-namespace
//! (`<marc:record xmlns:marc="...">`) documents are accepted, since elements are matched
//! on their local name.
//!
//! The whole document is checked for well-formedness up front: a syntax error anywhere
//! fails the decode before any record is produced. Problems inside an otherwise
//! well-formed `<record>` only fail that record.
//!
//! # Examples
//!
//! ```
//! use marcview::formats::FormatReader;
//! use marcview::marcxml::MarcXmlReader;
//!
//! # fn main() -> marcview::Result<()> {
//! let xml = br#"<?xml version="1.0"?>
//! <collection xmlns="http://www.loc.gov/MARC21/slim">
//!   <record>
//!     <leader>00000nam a2200000 a 4500</leader>
//!     <controlfield tag="001">12345</controlfield>
//!     <datafield tag="245" ind1="1" ind2="0">
//!       <subfield code="a">Title</subfield>
//!     </datafield>
//!   </record>
//! </collection>"#;
//!
//! let mut reader = MarcXmlReader::from_bytes(xml)?;
//! let record = reader.read_record()?.unwrap();
//! assert_eq!(record.control_number(), Some("12345"));
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::encoding::{decode_document, decode_lossy};
use crate::error::{MarcError, Result};
use crate::formats::{Format, FormatReader};
use crate::record::{ControlField, DataField, Record, RecordBuilder, Tag};

/// Reader yielding the records of a MARCXML document in document order.
#[derive(Debug)]
pub struct MarcXmlReader {
    records: VecDeque<Result<Record>>,
    records_read: usize,
}

impl MarcXmlReader {
    /// Parse a MARCXML document from raw bytes (a UTF-8 BOM is ignored).
    ///
    /// # Errors
    ///
    /// Returns `MarcError::ParseError` if the document is not well-formed XML.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_xml(&decode_document(bytes))
    }

    /// Parse a MARCXML document from a string.
    ///
    /// # Errors
    ///
    /// Returns `MarcError::ParseError` if the document is not well-formed XML.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let records = parse_document(xml)?;
        tracing::debug!(records = records.len(), "parsed MARCXML document");
        Ok(MarcXmlReader {
            records,
            records_read: 0,
        })
    }
}

impl FormatReader for MarcXmlReader {
    fn read_record(&mut self) -> Result<Option<Record>> {
        match self.records.pop_front() {
            Some(Ok(record)) => {
                self.records_read += 1;
                Ok(Some(record))
            },
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn format(&self) -> Format {
        Format::Xml
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

/// Element whose text content is currently being collected.
#[derive(Debug)]
enum Open {
    Nothing,
    Leader,
    Control(Tag),
    Subfield(char),
}

/// Accumulates one `<record>` element.
#[derive(Debug)]
struct RecordState {
    /// Element depth of the `<record>` start tag
    depth: usize,
    builder: RecordBuilder,
    open: Open,
    field: Option<DataField>,
    text: String,
    error: Option<MarcError>,
}

impl RecordState {
    fn new(depth: usize) -> Self {
        RecordState {
            depth,
            builder: Record::builder(),
            open: Open::Nothing,
            field: None,
            text: String::new(),
            error: None,
        }
    }

    /// Keep the first structural error; the rest of the record is still consumed.
    fn fail(&mut self, error: MarcError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Handle a start tag inside the record. Only malformed markup is returned as an
    /// error; structural problems are recorded on the state.
    fn start(&mut self, element: &BytesStart<'_>) -> Result<()> {
        if self.error.is_some() {
            return Ok(());
        }

        match element.local_name().as_ref() {
            b"leader" => {
                self.open = Open::Leader;
                self.text.clear();
            },
            b"controlfield" => match required_tag(element)? {
                Ok(tag) => {
                    self.open = Open::Control(tag);
                    self.text.clear();
                },
                Err(e) => self.fail(e),
            },
            b"datafield" => match required_tag(element)? {
                Ok(tag) => {
                    let ind1 = indicator(element, "ind1")?;
                    let ind2 = indicator(element, "ind2")?;
                    self.field = Some(DataField::new(tag, ind1, ind2));
                },
                Err(e) => self.fail(e),
            },
            b"subfield" => {
                if self.field.is_none() {
                    self.fail(MarcError::InvalidField(
                        "subfield outside of a datafield".to_string(),
                    ));
                    return Ok(());
                }
                let code = attribute(element, "code")?.unwrap_or_default();
                let mut chars = code.chars();
                match (chars.next(), chars.next()) {
                    (Some(code), None) => {
                        self.open = Open::Subfield(code);
                        self.text.clear();
                    },
                    _ => self.fail(MarcError::InvalidField(format!(
                        "subfield code must be a single character, got {code:?}"
                    ))),
                }
            },
            _ => {},
        }
        Ok(())
    }

    fn end(&mut self, local_name: &[u8]) {
        if self.error.is_some() {
            return;
        }

        match (local_name, std::mem::replace(&mut self.open, Open::Nothing)) {
            (b"leader", Open::Leader) => {
                self.builder.set_leader(std::mem::take(&mut self.text));
            },
            (b"controlfield", Open::Control(tag)) => {
                self.builder
                    .push_field(ControlField::new(tag, std::mem::take(&mut self.text)));
            },
            (b"subfield", Open::Subfield(code)) => {
                if let Some(field) = self.field.as_mut() {
                    field.add_subfield(code, std::mem::take(&mut self.text));
                }
            },
            (b"datafield", _) => {
                if let Some(field) = self.field.take() {
                    self.builder.push_field(field);
                }
            },
            (_, open) => self.open = open,
        }
    }

    fn text(&mut self, text: &str) {
        if !matches!(self.open, Open::Nothing) {
            self.text.push_str(text);
        }
    }

    fn finish(self) -> Result<Record> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.builder.build()),
        }
    }
}

fn parse_document(xml: &str) -> Result<VecDeque<Result<Record>>> {
    let mut reader = Reader::from_str(xml);
    reader.expand_empty_elements(true).trim_text(false);

    let mut records = VecDeque::new();
    let mut current: Option<RecordState> = None;
    let mut depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| syntax_error(reader.buffer_position(), &e))?;

        match event {
            Event::Start(element) => {
                depth += 1;
                match current.as_mut() {
                    Some(state) => state.start(&element)?,
                    None if element.local_name().as_ref() == b"record" => {
                        current = Some(RecordState::new(depth));
                    },
                    None => {},
                }
            },
            Event::End(element) => {
                if let Some(mut state) = current.take() {
                    if state.depth == depth {
                        records.push_back(state.finish());
                    } else {
                        state.end(element.local_name().as_ref());
                        current = Some(state);
                    }
                }
                depth = depth.saturating_sub(1);
            },
            Event::Text(text) => {
                if let Some(state) = current.as_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| syntax_error(reader.buffer_position(), &e))?;
                    state.text(&text);
                }
            },
            Event::CData(data) => {
                if let Some(state) = current.as_mut() {
                    state.text(&decode_lossy(&data.into_inner()));
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if depth > 0 {
        return Err(MarcError::ParseError(format!(
            "MARCXML document ended with {depth} unclosed element(s)"
        )));
    }

    Ok(records)
}

fn syntax_error(position: usize, error: &quick_xml::Error) -> MarcError {
    MarcError::ParseError(format!("MARCXML syntax error at byte {position}: {error}"))
}

/// Unescaped attribute value. Malformed attribute markup is a document error.
fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    let attr = element
        .try_get_attribute(name)
        .map_err(|e| MarcError::ParseError(format!("malformed attribute {name:?}: {e}")))?;
    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|e| MarcError::ParseError(format!("malformed attribute {name:?}: {e}")))?;
            Ok(Some(value.into_owned()))
        },
        None => Ok(None),
    }
}

/// The `tag` attribute: outer error is a document error, inner one a record error.
fn required_tag(element: &BytesStart<'_>) -> Result<Result<Tag>> {
    let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
    Ok(match attribute(element, "tag")? {
        Some(tag) => Tag::new(tag),
        None => Err(MarcError::InvalidField(format!(
            "<{name}> is missing its tag attribute"
        ))),
    })
}

fn indicator(element: &BytesStart<'_>, name: &str) -> Result<char> {
    Ok(attribute(element, name)?
        .and_then(|value| value.chars().next())
        .unwrap_or(' '))
}
