//! Decoding MARC records from MARC-in-JSON.
//!
//! # Format
//!
//! - A document is an array of record objects; a single object is a one-record batch
//! - Each record has a `leader` string and a `fields` array
//! - Control fields (001-009): `{tag: value}`
//! - Data fields (010+): `{tag: {ind1, ind2, subfields: [{code: value}, ...]}}`
//!
//! Invalid JSON fails the whole document. A record whose shape is wrong fails on its
//! own and its siblings still decode.

use std::collections::VecDeque;

use serde_json::{Map, Value};

use crate::encoding::bom_len;
use crate::error::{MarcError, Result};
use crate::formats::{Format, FormatReader};
use crate::record::{ControlField, DataField, Record, Tag};

/// Reader yielding the records of a MARC-in-JSON document in array order.
#[derive(Debug)]
pub struct MarcJsonReader {
    records: VecDeque<Value>,
    index: usize,
    records_read: usize,
}

impl MarcJsonReader {
    /// Parse a MARC-in-JSON document from raw bytes (a UTF-8 BOM is ignored).
    ///
    /// # Errors
    ///
    /// Returns `MarcError::ParseError` if the bytes are not valid JSON or the
    /// top-level value is neither an array nor an object.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(&bytes[bom_len(bytes)..])
            .map_err(|e| MarcError::ParseError(format!("invalid MARC-in-JSON document: {e}")))?;
        Self::from_value(value)
    }

    /// Wrap an already-parsed JSON document.
    ///
    /// # Errors
    ///
    /// Returns `MarcError::ParseError` if the value is neither an array nor an object.
    pub fn from_value(value: Value) -> Result<Self> {
        let records: VecDeque<Value> = match value {
            Value::Array(items) => items.into(),
            Value::Object(_) => VecDeque::from([value]),
            other => {
                return Err(MarcError::ParseError(format!(
                    "MARC-in-JSON document must be an array or object, got {}",
                    json_type(&other)
                )))
            },
        };
        tracing::debug!(records = records.len(), "parsed MARC-in-JSON document");

        Ok(MarcJsonReader {
            records,
            index: 0,
            records_read: 0,
        })
    }
}

impl FormatReader for MarcJsonReader {
    fn read_record(&mut self) -> Result<Option<Record>> {
        let Some(value) = self.records.pop_front() else {
            return Ok(None);
        };
        self.index += 1;

        let record = marcjson_to_record(&value).map_err(|e| {
            tracing::warn!(record = self.index, "failed to decode MARC-in-JSON record: {e}");
            e
        })?;
        self.records_read += 1;
        Ok(Some(record))
    }

    fn format(&self) -> Format {
        Format::Json
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

/// Convert one MARC-in-JSON record object to a [`Record`].
///
/// # Errors
///
/// Returns `MarcError::InvalidRecord` or `MarcError::InvalidField` if the value does
/// not have the MARC-in-JSON record shape.
pub fn marcjson_to_record(json: &Value) -> Result<Record> {
    let object = json
        .as_object()
        .ok_or_else(|| MarcError::InvalidRecord(format!("record must be an object, got {}", json_type(json))))?;

    let mut builder = Record::builder();

    match object.get("leader") {
        Some(Value::String(leader)) => builder.set_leader(leader.as_str()),
        Some(other) => {
            return Err(MarcError::InvalidRecord(format!(
                "leader must be a string, got {}",
                json_type(other)
            )))
        },
        None => {},
    }

    let fields = object
        .get("fields")
        .ok_or_else(|| MarcError::InvalidRecord("record is missing its fields array".to_string()))?
        .as_array()
        .ok_or_else(|| MarcError::InvalidRecord("fields must be an array".to_string()))?;

    for item in fields {
        let (tag, value) = single_entry(item, "field")?;
        let tag = Tag::new(tag.as_str())?;

        match value {
            Value::String(text) => builder.push_field(ControlField::new(tag, text.as_str())),
            Value::Object(body) => builder.push_field(data_field(tag, body)?),
            other => {
                return Err(MarcError::InvalidField(format!(
                    "Field {tag} must be a string or object, got {}",
                    json_type(other)
                )))
            },
        }
    }

    Ok(builder.build())
}

fn data_field(tag: Tag, body: &Map<String, Value>) -> Result<DataField> {
    let ind1 = indicator(&tag, body, "ind1")?;
    let ind2 = indicator(&tag, body, "ind2")?;
    let mut field = DataField::new(tag, ind1, ind2);

    let subfields = match body.get("subfields") {
        Some(Value::Array(subfields)) => subfields.as_slice(),
        Some(other) => {
            return Err(MarcError::InvalidField(format!(
                "Field {}: subfields must be an array, got {}",
                field.tag,
                json_type(other)
            )))
        },
        None => &[],
    };

    for item in subfields {
        let (code, value) = single_entry(item, "subfield")?;
        let mut chars = code.chars();
        let (Some(code), None) = (chars.next(), chars.next()) else {
            return Err(MarcError::InvalidField(format!(
                "Field {}: subfield code must be a single character, got {code:?}",
                field.tag
            )));
        };
        let value = value.as_str().ok_or_else(|| {
            MarcError::InvalidField(format!(
                "Field {}: subfield {code} value must be a string",
                field.tag
            ))
        })?;
        field.add_subfield(code, value);
    }

    Ok(field)
}

/// Absent indicators are blank; otherwise the first character is used.
fn indicator(tag: &Tag, body: &Map<String, Value>, name: &str) -> Result<char> {
    match body.get(name) {
        None | Some(Value::Null) => Ok(' '),
        Some(Value::String(s)) => Ok(s.chars().next().unwrap_or(' ')),
        Some(other) => Err(MarcError::InvalidField(format!(
            "Field {tag}: {name} must be a string, got {}",
            json_type(other)
        ))),
    }
}

/// The key and value of an object that must hold exactly one entry.
fn single_entry<'a>(item: &'a Value, what: &str) -> Result<(&'a String, &'a Value)> {
    let object = item
        .as_object()
        .ok_or_else(|| MarcError::InvalidField(format!("{what} must be an object")))?;
    let mut entries = object.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(MarcError::InvalidField(format!(
            "{what} object must have exactly one key, got {}",
            object.len()
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
