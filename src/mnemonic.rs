//! Decoding MARC records from mnemonic (MARCMaker) text.
//!
//! Each record is a block of lines separated from the next by one or more blank
//! lines. Every line introduces one field:
//!
//! ```text
//! =LDR  00000nam\\22000007a\4500
//! =001  12345
//! =245  10$aTitle :$bsubtitle /$cAuthor.
//! ```
//!
//! A `\` stands for a blank in the leader, control values and indicators, and
//! `{dollar}` inside a control or subfield value is a literal `$`. Blocks are decoded
//! independently, so a malformed block fails on its own.

use std::collections::VecDeque;

use regex::Regex;

use crate::encoding::decode_document;
use crate::error::{MarcError, Result};
use crate::formats::{Format, FormatReader};
use crate::record::{ControlField, DataField, Record, Tag};

lazy_static::lazy_static! {
    static ref FIELD_LINE: Regex =
        Regex::new(r"^=(\S+)(?: {1,2}(.*))?$").expect("field line pattern is valid");
}

const BLANK: char = '\\';
const SUBFIELD_MARK: char = '$';
const DOLLAR_ESCAPE: &str = "{dollar}";

/// A run of non-blank lines and the 1-based line number it starts at.
#[derive(Debug)]
struct Block {
    line: usize,
    lines: Vec<String>,
}

/// Reader yielding one record per mnemonic block.
#[derive(Debug)]
pub struct MnemonicReader {
    blocks: VecDeque<Block>,
    records_read: usize,
}

impl MnemonicReader {
    /// Split mnemonic text into record blocks. Invalid UTF-8 is replaced, never fatal.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_text(&decode_document(bytes))
    }

    /// Split mnemonic text into record blocks.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut blocks = VecDeque::new();
        let mut current: Option<Block> = None;

        for (index, line) in text.split('\n').enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                blocks.extend(current.take());
                continue;
            }
            current
                .get_or_insert_with(|| Block {
                    line: index + 1,
                    lines: Vec::new(),
                })
                .lines
                .push(line.to_string());
        }
        blocks.extend(current);

        tracing::debug!(blocks = blocks.len(), "split mnemonic text into blocks");
        MnemonicReader {
            blocks,
            records_read: 0,
        }
    }
}

impl FormatReader for MnemonicReader {
    fn read_record(&mut self) -> Result<Option<Record>> {
        let Some(block) = self.blocks.pop_front() else {
            return Ok(None);
        };

        let record = parse_block(&block).map_err(|e| {
            let e = MarcError::InvalidRecord(format!(
                "mnemonic block starting at line {}: {e}",
                block.line
            ));
            tracing::warn!("{e}");
            e
        })?;
        self.records_read += 1;
        Ok(Some(record))
    }

    fn format(&self) -> Format {
        Format::Mnemonic
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

fn parse_block(block: &Block) -> Result<Record> {
    let mut builder = Record::builder();

    for (offset, line) in block.lines.iter().enumerate() {
        let line_no = block.line + offset;
        let captures = FIELD_LINE.captures(line).ok_or_else(|| {
            MarcError::InvalidField(format!("line {line_no} does not start with '=TAG'"))
        })?;
        let tag = &captures[1];
        let data = captures.get(2).map_or("", |m| m.as_str());

        if tag == "LDR" {
            builder.set_leader(unblank(data));
            continue;
        }

        let tag = Tag::new(tag)
            .map_err(|_| MarcError::InvalidField(format!("line {line_no}: tag {tag:?} is not 3 characters")))?;

        let mut chars = data.char_indices().skip(2);
        match chars.next() {
            Some((rest_start, _)) if data[rest_start..].contains(SUBFIELD_MARK) => {
                let field = parse_data_field(tag, &data[..rest_start], &data[rest_start..])
                    .map_err(|e| MarcError::InvalidField(format!("line {line_no}: {e}")))?;
                builder.push_field(field);
            },
            _ => {
                let value = unescape_dollar(&unblank(data));
                builder.push_field(ControlField::new(tag, value));
            },
        }
    }

    Ok(builder.build())
}

/// `indicators` holds exactly two characters; `rest` contains at least one `$`.
fn parse_data_field(tag: Tag, indicators: &str, rest: &str) -> Result<DataField> {
    let mut ind = indicators.chars().map(|c| if c == BLANK { ' ' } else { c });
    let ind1 = ind.next().unwrap_or(' ');
    let ind2 = ind.next().unwrap_or(' ');
    let mut field = DataField::new(tag, ind1, ind2);

    let Some(subfields) = rest.strip_prefix(SUBFIELD_MARK) else {
        return Err(MarcError::InvalidField(format!(
            "Field {}: text {:?} precedes the first subfield",
            field.tag,
            rest.split(SUBFIELD_MARK).next().unwrap_or_default()
        )));
    };

    for chunk in subfields.split(SUBFIELD_MARK) {
        let mut chars = chunk.chars();
        let Some(code) = chars.next() else {
            return Err(MarcError::InvalidField(format!(
                "Field {}: '$' without a subfield code",
                field.tag
            )));
        };
        field.add_subfield(code, unescape_dollar(chars.as_str()));
    }

    Ok(field)
}

fn unblank(value: &str) -> String {
    value.replace(BLANK, " ")
}

fn unescape_dollar(value: &str) -> String {
    value.replace(DOLLAR_ESCAPE, "$")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(text: &str) -> Vec<Result<Record>> {
        let mut reader = MnemonicReader::from_text(text);
        let mut out = Vec::new();
        loop {
            match reader.read_record() {
                Ok(Some(record)) => out.push(Ok(record)),
                Ok(None) => break,
                Err(e) => out.push(Err(e)),
            }
        }
        out
    }

    #[test]
    fn test_single_record() {
        let text = "=LDR  00000nam\\\\22000007a\\4500\n=001  12345\n=245  10$aTitle :$bsubtitle /$cAuthor.\n";
        let record = results(text).remove(0).unwrap();

        assert_eq!(record.leader(), "00000nam  22000007a 4500");
        assert_eq!(record.control_number(), Some("12345"));
        let field = record.get_fields("245").next().unwrap();
        assert_eq!((field.indicator1, field.indicator2), ('1', '0'));
        let pairs: Vec<(char, &str)> = field
            .subfields
            .iter()
            .map(|sf| (sf.code, sf.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![('a', "Title :"), ('b', "subtitle /"), ('c', "Author.")]
        );
    }

    #[test]
    fn test_blank_indicators_and_dollar_escape() {
        let record = results("=500  \\\\$aPrice {dollar}5.\n").remove(0).unwrap();
        let field = record.get_fields("500").next().unwrap();
        assert_eq!((field.indicator1, field.indicator2), (' ', ' '));
        assert_eq!(field.get_subfield('a'), Some("Price $5."));
    }

    #[test]
    fn test_control_value_unblanked() {
        let record = results("=008  850101s1985\\\\\\\\nyu\n").remove(0).unwrap();
        assert_eq!(record.get_control_field("008"), Some("850101s1985    nyu"));

        let record = results("=001  ab{dollar}cd\n").remove(0).unwrap();
        assert_eq!(record.control_number(), Some("ab$cd"));
        assert_eq!(record.data_fields().count(), 0);
    }

    #[test]
    fn test_blocks_split_on_blank_lines() {
        let text = "\r\n=001  a\r\n=245  00$aOne\r\n\r\n\r\n=001  b\r\n   \n=001  c";
        let ids: Vec<String> = results(text)
            .into_iter()
            .map(|r| r.unwrap().control_number().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_malformed_block_is_isolated() {
        let text = "=001  1\n=245  10$aFirst\n\nthis is not a field line\n\n=001  3\n";
        let out = results(text);
        assert_eq!(out.len(), 3);
        assert!(out[0].is_ok());
        let err = out[1].as_ref().unwrap_err().to_string();
        assert!(err.contains("line 4"), "got: {err}");
        assert_eq!(out[2].as_ref().unwrap().control_number(), Some("3"));
    }

    #[test]
    fn test_text_before_first_subfield_is_error() {
        let out = results("=245  10Title$aMore\n");
        let err = out[0].as_ref().unwrap_err().to_string();
        assert!(err.contains("precedes the first subfield"), "got: {err}");
    }

    #[test]
    fn test_dollar_without_code_is_error() {
        let out = results("=245  10$aTitle$\n");
        assert!(out[0].is_err());
    }

    #[test]
    fn test_bad_tag_length_is_error() {
        assert!(results("=24  10$aTitle\n")[0].is_err());
        assert!(results("=2450 10$aTitle\n")[0].is_err());
    }

    #[test]
    fn test_empty_input_has_no_blocks() {
        assert!(results("").is_empty());
        assert!(results("\n \n\r\n").is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut reader = MnemonicReader::from_bytes(b"=001  caf\xe9\n");
        let record = reader.read_record().unwrap().unwrap();
        assert_eq!(record.control_number(), Some("caf\u{FFFD}"));
        assert_eq!(reader.records_read(), Some(1));
    }
}
