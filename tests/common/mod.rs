//! Common test helpers and utilities shared across test suite.

#![allow(dead_code)]

const FIELD_TERMINATOR: u8 = 0x1E;
const RECORD_TERMINATOR: u8 = 0x1D;

/// Subfield delimiter, for assembling data field bodies.
pub const SF: &str = "\x1f";

/// Assemble an ISO 2709 record from `(tag, body)` pairs.
///
/// Bodies exclude the field terminator; data field bodies start with the two
/// indicators followed by `\x1f`-delimited subfields.
pub fn build_binary_record(fields: &[(&str, &str)]) -> Vec<u8> {
    let mut directory = Vec::new();
    let mut data = Vec::new();
    for (tag, body) in fields {
        let mut field = body.as_bytes().to_vec();
        field.push(FIELD_TERMINATOR);
        directory.extend_from_slice(tag.as_bytes());
        directory.extend_from_slice(format!("{:04}{:05}", field.len(), data.len()).as_bytes());
        data.extend_from_slice(&field);
    }
    directory.push(FIELD_TERMINATOR);

    let base_address = 24 + directory.len();
    let record_length = base_address + data.len() + 1;

    let mut record = format!("{record_length:05}nam a22{base_address:05} a 4500").into_bytes();
    record.extend_from_slice(&directory);
    record.extend_from_slice(&data);
    record.push(RECORD_TERMINATOR);
    record
}

/// A small book record with control number `id`.
pub fn book_record(id: &str, title: &str) -> Vec<u8> {
    build_binary_record(&[
        ("001", id),
        ("008", "850101s1985    nyu           000 0 eng  "),
        ("100", &format!("1 {SF}aFitzgerald, F. Scott")),
        ("245", &format!("14{SF}a{title} /{SF}cF. Scott Fitzgerald.")),
        ("650", &format!(" 0{SF}aLong Island (N.Y.){SF}vFiction.")),
    ])
}

/// Replace the length digits of directory entry `index` in a built record.
pub fn patch_directory_length(record: &mut [u8], index: usize, length: &str) {
    let at = 24 + index * 12 + 3;
    record[at..at + 4].copy_from_slice(length.as_bytes());
}

/// The `=` rule written after every unit.
pub fn separator() -> String {
    format!("\n{}\n", "=".repeat(40))
}
