//! ISO 2709 binary codec.
//!
//! Converts a single directory-indexed binary record to and from [`Record`].
//! A record is laid out as:
//!
//! ```text
//! leader (24) | directory (N x 12) | 0x1E | field data | 0x1D
//! ```
//!
//! Each directory entry is `tag(3) + length(4) + start(5)`, where `length` and
//! `start` are decimal **byte** quantities relative to the start of the field
//! data. Field values are UTF-8, so every slice that a directory entry
//! addresses goes through [`utf8_slice`] rather than character indexing.
//!
//! # Examples
//!
//! ```
//! use marcshift::{iso2709, Field, Leader, Record};
//!
//! let mut record = Record::new(Leader::default());
//! record.add_control_field_str("001", "12345");
//! let mut field = Field::new("245".to_string(), '1', '0');
//! field.add_subfield_str('a', "Käsikirja");
//! record.add_field(field);
//!
//! let bytes = iso2709::encode(&record)?;
//! let decoded = iso2709::decode(&bytes)?;
//! assert_eq!(decoded.get_field("245").unwrap().get_subfield('a'), Some("Käsikirja"));
//! # Ok::<(), marcshift::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::leader::{format_fixed, Leader, LEADER_LEN};
use crate::record::{is_control_tag, Field, Record};
use tracing::debug;

/// Terminates the directory and every field.
pub const FIELD_TERMINATOR: u8 = 0x1E;
/// Introduces each subfield within a data field.
pub const SUBFIELD_DELIMITER: u8 = 0x1F;
/// Terminates a record.
pub const RECORD_TERMINATOR: u8 = 0x1D;

const DIRECTORY_ENTRY_LEN: usize = 12;
const LENGTH_DIGITS: usize = 4;
const START_DIGITS: usize = 5;

/// One parsed directory entry. Only lives while a record is being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirectoryEntry<'a> {
    tag: &'a str,
    length: usize,
    start: usize,
}

impl<'a> DirectoryEntry<'a> {
    fn parse(entry: &'a [u8]) -> Result<Self> {
        let tag = std::str::from_utf8(&entry[0..3]).map_err(|_| {
            MarcError::InvalidRecord(format!("Directory tag is not UTF-8: {:?}", &entry[0..3]))
        })?;
        Ok(DirectoryEntry {
            tag,
            length: parse_digits(&entry[3..7])?,
            start: parse_digits(&entry[7..12])?,
        })
    }
}

/// Append a directory entry for a field of `length` bytes at byte offset `start`.
fn write_directory_entry(
    directory: &mut Vec<u8>,
    tag: &str,
    length: usize,
    start: usize,
) -> Result<()> {
    if tag.len() != 3 {
        return Err(MarcError::InvalidField(format!(
            "Tag must be 3 bytes, got '{tag}'"
        )));
    }
    directory.extend_from_slice(tag.as_bytes());
    directory.extend_from_slice(format_fixed(length, LENGTH_DIGITS, "field length")?.as_bytes());
    directory.extend_from_slice(format_fixed(start, START_DIGITS, "field offset")?.as_bytes());
    Ok(())
}

/// Parse an ASCII decimal number without allocating
fn parse_digits(bytes: &[u8]) -> Result<usize> {
    let mut result = 0usize;
    for &byte in bytes {
        if byte.is_ascii_digit() {
            result = result * 10 + (byte - b'0') as usize;
        } else {
            return Err(MarcError::InvalidRecord(format!(
                "Invalid numeric field: expected digits, got byte {}",
                byte as char
            )));
        }
    }
    Ok(result)
}

/// Take `len` bytes at byte offset `start` and decode them as UTF-8.
///
/// # Errors
///
/// Returns [`MarcError::InvalidRecord`] if the range runs past the end of
/// `bytes`, and [`MarcError::EncodingError`] if the range splits a character
/// or is otherwise not valid UTF-8.
pub fn utf8_slice(bytes: &[u8], start: usize, len: usize) -> Result<&str> {
    std::str::from_utf8(byte_range(bytes, start, len)?)
        .map_err(|e| MarcError::EncodingError(format!("bytes {start}..{}: {e}", start + len)))
}

fn byte_range(bytes: &[u8], start: usize, len: usize) -> Result<&[u8]> {
    start
        .checked_add(len)
        .and_then(|end| bytes.get(start..end))
        .ok_or_else(|| {
            MarcError::InvalidRecord(format!(
                "Field at byte {start} with length {len} exceeds data area of {} bytes",
                bytes.len()
            ))
        })
}

/// Returns true if the third character of `field` is the subfield delimiter.
///
/// Indicators may be multi-byte characters, so the check walks characters of
/// the valid UTF-8 prefix rather than indexing bytes.
fn delimiter_follows_indicators(field: &[u8]) -> bool {
    let text = match std::str::from_utf8(field) {
        Ok(text) => text,
        Err(e) => std::str::from_utf8(&field[..e.valid_up_to()]).unwrap_or_default(),
    };
    text.chars().nth(2) == Some(char::from(SUBFIELD_DELIMITER))
}

/// Widen a data field slice by one byte when its indicators were not counted.
///
/// Some encoders in the wild store a data field's start one byte past its first
/// indicator. When the character where the subfield delimiter belongs is
/// anything else, the byte before `start` is taken back in front of the field.
fn reinclude_uncounted_indicator(blob: &[u8], start: usize, len: usize) -> &[u8] {
    let field = &blob[start..start + len];
    if start == 0 || delimiter_follows_indicators(field) {
        return field;
    }
    debug!(start, "data field offset excludes first indicator, re-including preceding byte");
    &blob[start - 1..start + len]
}

fn indicator(c: Option<char>) -> char {
    match c {
        Some(c) if c != char::from(SUBFIELD_DELIMITER) => c,
        _ => ' ',
    }
}

fn parse_data_field(tag: &str, bytes: &[u8]) -> Result<Field> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| MarcError::EncodingError(format!("Tag {tag}: {e}")))?;

    let mut chars = text.chars();
    let ind1 = indicator(chars.next());
    let ind2 = indicator(chars.next());
    let mut field = Field::new(tag.to_string(), ind1, ind2);

    let delimiter = char::from(SUBFIELD_DELIMITER);
    let terminator = char::from(FIELD_TERMINATOR);
    for chunk in chars
        .as_str()
        .split(|c| c == delimiter || c == terminator)
        .filter(|chunk| !chunk.is_empty())
    {
        let mut sub = chunk.chars();
        if let Some(code) = sub.next() {
            field.add_subfield(code, sub.as_str().to_string());
        }
    }

    Ok(field)
}

/// Decode one binary record.
///
/// `data` is the record without its record terminator (a trailing `0x1D` is
/// tolerated and ignored, since no directory entry addresses it).
///
/// # Errors
///
/// Returns [`MarcError::InvalidRecord`] if `data` is empty, no field terminator
/// follows the leader, a directory entry is not numeric, or an entry addresses
/// bytes outside the data area. Returns [`MarcError::InvalidLeader`] if the
/// leader is not UTF-8 and [`MarcError::EncodingError`] if a field is not.
pub fn decode(data: &[u8]) -> Result<Record> {
    if data.is_empty() {
        return Err(MarcError::InvalidRecord("empty input".to_string()));
    }

    let directory_end = data
        .get(LEADER_LEN..)
        .and_then(|rest| memchr::memchr(FIELD_TERMINATOR, rest))
        .map(|pos| pos + LEADER_LEN)
        .ok_or_else(|| {
            MarcError::InvalidRecord("no field terminator after the directory".to_string())
        })?;

    let leader = std::str::from_utf8(&data[..LEADER_LEN])
        .map_err(|e| MarcError::InvalidLeader(format!("Leader is not UTF-8: {e}")))?;
    let mut record = Record::new(Leader::new(leader));

    let directory = &data[LEADER_LEN..directory_end];
    let blob = &data[directory_end + 1..];

    for chunk in directory.chunks_exact(DIRECTORY_ENTRY_LEN) {
        let entry = DirectoryEntry::parse(chunk)?;

        if is_control_tag(entry.tag) {
            // Stored length counts the field terminator
            let value = utf8_slice(blob, entry.start, entry.length.saturating_sub(1))?;
            record.add_control_field(entry.tag.to_string(), value.to_string());
        } else {
            byte_range(blob, entry.start, entry.length)?;
            let bytes = reinclude_uncounted_indicator(blob, entry.start, entry.length);
            record.add_field(parse_data_field(entry.tag, bytes)?);
        }
    }

    Ok(record)
}

fn push_char(buf: &mut Vec<u8>, c: char) {
    let mut utf8 = [0u8; 4];
    buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
}

/// Encode one record, including its record terminator.
///
/// Control fields are laid out first, then data fields, each in model order.
/// The leader's record length (positions 0-4) and base address of data
/// (positions 12-16) are recomputed from the encoded byte lengths.
///
/// # Errors
///
/// Returns [`MarcError::InvalidField`] for a tag that is not 3 bytes,
/// [`MarcError::FieldOverflow`] when a field length needs more than 4 digits or
/// an offset, the record length or the base address needs more than 5, and
/// [`MarcError::InvalidLeader`] when the leader is not 24 bytes.
pub fn encode(record: &Record) -> Result<Vec<u8>> {
    let field_count = record.control_fields.len() + record.fields.len();
    let mut directory = Vec::with_capacity(field_count * DIRECTORY_ENTRY_LEN);
    let mut data = Vec::new();

    for cf in &record.control_fields {
        let start = data.len();
        data.extend_from_slice(cf.value.as_bytes());
        data.push(FIELD_TERMINATOR);
        write_directory_entry(&mut directory, &cf.tag, data.len() - start, start)?;
    }

    for field in &record.fields {
        let start = data.len();
        push_char(&mut data, field.indicator1);
        push_char(&mut data, field.indicator2);
        data.push(SUBFIELD_DELIMITER);
        for (i, subfield) in field.subfields.iter().enumerate() {
            if i > 0 {
                data.push(SUBFIELD_DELIMITER);
            }
            push_char(&mut data, subfield.code);
            data.extend_from_slice(subfield.value.as_bytes());
        }
        data.push(FIELD_TERMINATOR);
        write_directory_entry(&mut directory, &field.tag, data.len() - start, start)?;
    }

    let base_address = LEADER_LEN + directory.len() + 1;
    let record_length = base_address + data.len() + 1;
    let leader = record.leader.with_structure(record_length, base_address)?;

    let mut out = Vec::with_capacity(record_length);
    out.extend_from_slice(leader.as_str().as_bytes());
    out.extend_from_slice(&directory);
    out.push(FIELD_TERMINATOR);
    out.extend_from_slice(&data);
    out.push(RECORD_TERMINATOR);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a record by hand: leader, one 245 field, terminators.
    fn hand_built_record(field_245: &[u8], start: usize, stored_length: usize) -> Vec<u8> {
        let mut directory = Vec::new();
        directory.extend_from_slice(b"245");
        directory.extend_from_slice(format!("{stored_length:04}").as_bytes());
        directory.extend_from_slice(format!("{start:05}").as_bytes());

        let base_address = 24 + directory.len() + 1;
        let record_length = base_address + field_245.len() + 1;

        let mut bytes = Vec::new();
        bytes.extend_from_slice(format!("{record_length:05}nam a22{base_address:05} i 4500").as_bytes());
        bytes.extend_from_slice(&directory);
        bytes.push(FIELD_TERMINATOR);
        bytes.extend_from_slice(field_245);
        bytes.push(RECORD_TERMINATOR);
        bytes
    }

    fn sample() -> Record {
        Record::builder(Leader::new("00000cam a2200000 a 4500"))
            .control_field_str("001", "000123456")
            .control_field_str("005", "")
            .field(
                Field::builder("245".to_string(), '1', '0')
                    .subfield_str('a', "Test title")
                    .subfield_str('c', "Author")
                    .build(),
            )
            .build()
    }

    #[test]
    fn test_decode_empty_input() {
        let err = decode(b"").unwrap_err();
        assert!(matches!(err, MarcError::InvalidRecord(_)));
    }

    #[test]
    fn test_decode_without_directory_terminator() {
        let err = decode(b"00053nam a2200037 i 45002450015000001").unwrap_err();
        assert!(matches!(err, MarcError::InvalidRecord(_)));
    }

    #[test]
    fn test_decode_short_input() {
        let err = decode(b"00053nam").unwrap_err();
        assert!(matches!(err, MarcError::InvalidRecord(_)));
    }

    #[test]
    fn test_decode_hand_built_record() {
        let field = b"10\x1FaTest title\x1E";
        let bytes = hand_built_record(field, 0, field.len());
        let record = decode(&bytes).unwrap();

        assert_eq!(record.leader.record_type(), Some('a'));
        let field = record.get_field("245").unwrap();
        assert_eq!(field.indicator1, '1');
        assert_eq!(field.indicator2, '0');
        assert_eq!(field.get_subfield('a'), Some("Test title"));
    }

    #[test]
    fn test_decode_reincludes_uncounted_indicator() {
        // Entry points at the second indicator and its length skips the first.
        let blob = b"10\x1Faabc\x1E";
        let bytes = hand_built_record(blob, 1, blob.len() - 1);
        let record = decode(&bytes).unwrap();

        let field = record.get_field("245").unwrap();
        assert_eq!((field.indicator1, field.indicator2), ('1', '0'));
        assert_eq!(field.get_subfield('a'), Some("abc"));
    }

    #[test]
    fn test_roundtrip_multibyte_indicator() {
        // 245 sits after 001, so the compatibility path could fire on it
        let record = Record::builder(Leader::default())
            .control_field_str("001", "000000001")
            .field(
                Field::builder("245".to_string(), 'ä', '0')
                    .subfield_str('a', "x")
                    .build(),
            )
            .field(
                Field::builder("246".to_string(), '1', 'ö')
                    .subfield_str('a', "y")
                    .build(),
            )
            .build();

        let decoded = decode(&encode(&record).unwrap()).unwrap();
        assert_eq!(decoded.fields, record.fields);
        let field = decoded.get_field("245").unwrap();
        assert_eq!((field.indicator1, field.indicator2), ('ä', '0'));
        assert_eq!(field.subfields.len(), 1);
    }

    #[test]
    fn test_delimiter_follows_indicators() {
        assert!(delimiter_follows_indicators(b"10\x1Fa"));
        assert!(delimiter_follows_indicators("ä0\x1Fa".as_bytes()));
        assert!(!delimiter_follows_indicators(b"0\x1Fa"));
        assert!(!delimiter_follows_indicators(b"\xff0\x1Fa"));
    }

    #[test]
    fn test_decode_blank_indicator_marker() {
        // A delimiter in an indicator position means "no indicator"
        let blob = b"\x1F\x1Fxa\x1Fbb\x1E";
        let bytes = hand_built_record(blob, 0, blob.len());
        let field = decode(&bytes).unwrap().fields[0].clone();
        assert_eq!((field.indicator1, field.indicator2), (' ', ' '));
        assert_eq!(field.subfields.len(), 2);
        assert_eq!(field.subfields[0].code, 'x');
        assert_eq!(field.subfields[0].value, "a");
    }

    #[test]
    fn test_decode_field_outside_data_area() {
        let field = b"10\x1FaTest\x1E";
        let bytes = hand_built_record(field, 0, 90);
        let err = decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, MarcError::InvalidRecord(_)));
    }

    #[test]
    fn test_decode_non_numeric_directory() {
        let mut bytes = hand_built_record(b"10\x1Fa\x1E", 0, 5);
        bytes[27] = b'x';
        assert!(matches!(decode(&bytes), Err(MarcError::InvalidRecord(_))));
    }

    #[test]
    fn test_encode_simple_record() {
        let mut record = Record::new(Leader::new("00000nam a2200000 i 4500"));
        let mut field = Field::new("245".to_string(), '1', '0');
        field.add_subfield_str('a', "Test title");
        record.add_field(field);

        let bytes = encode(&record).unwrap();
        // 24 (leader) + 12 (directory) + 1 + 15 (field) + 1 (record terminator)
        assert_eq!(&bytes[0..5], b"00053");
        assert_eq!(&bytes[12..17], b"00037");
        assert_eq!(&bytes[24..36], b"245001500000");
        assert_eq!(bytes[36], FIELD_TERMINATOR);
        assert_eq!(*bytes.last().unwrap(), RECORD_TERMINATOR);
    }

    #[test]
    fn test_encode_counts_bytes_not_characters() {
        let mut record = Record::new(Leader::default());
        record.add_control_field_str("001", "日本");
        let mut field = Field::new("245".to_string(), '0', '0');
        field.add_subfield_str('a', "語");
        record.add_field(field);

        let bytes = encode(&record).unwrap();
        // 001: 6 bytes + terminator; 245: 2 + 1 + 1 + 3 + 1
        assert_eq!(&bytes[24..36], b"001000700000");
        assert_eq!(&bytes[36..48], b"245000800007");
        assert_eq!(&bytes[0..5], format!("{:05}", bytes.len()).as_bytes());

        let decoded = decode(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(decoded.get_control_field("001"), Some("日本"));
        assert_eq!(decoded.fields[0].get_subfield('a'), Some("語"));
    }

    #[test]
    fn test_roundtrip() {
        let record = sample();
        let bytes = encode(&record).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.control_fields, record.control_fields);
        assert_eq!(decoded.fields, record.fields);
        assert_eq!(decoded.leader.as_str()[5..12], record.leader.as_str()[5..12]);
    }

    #[test]
    fn test_roundtrip_field_without_subfields() {
        let mut record = Record::new(Leader::default());
        record.add_field(Field::new("500".to_string(), ' ', ' '));
        record.add_field(
            Field::builder("650".to_string(), ' ', '0')
                .subfield_str('a', "After")
                .build(),
        );

        let decoded = decode(&encode(&record).unwrap()).unwrap();
        assert_eq!(decoded.fields, record.fields);
    }

    #[test]
    fn test_directory_consistency() {
        let bytes = encode(&sample()).unwrap();
        let leader = Leader::new(std::str::from_utf8(&bytes[..24]).unwrap());
        let directory_end = 24 + memchr::memchr(FIELD_TERMINATOR, &bytes[24..]).unwrap();

        assert_eq!(leader.record_length(), Some(bytes.len() as u32));
        assert_eq!(leader.base_address(), Some(directory_end as u32 + 1));
    }

    #[test]
    fn test_encode_field_length_overflow() {
        let mut record = Record::new(Leader::default());
        record.add_control_field("008".to_string(), "x".repeat(10_000));
        let err = encode(&record).unwrap_err();
        assert!(matches!(
            err,
            MarcError::FieldOverflow {
                what: "field length",
                width: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_encode_rejects_bad_tag() {
        let mut record = Record::new(Leader::default());
        record.add_control_field_str("01", "x");
        assert!(matches!(encode(&record), Err(MarcError::InvalidField(_))));
    }

    #[test]
    fn test_utf8_slice_rejects_split_character() {
        let bytes = "äb".as_bytes();
        assert_eq!(utf8_slice(bytes, 0, 2).unwrap(), "ä");
        assert!(matches!(
            utf8_slice(bytes, 1, 2),
            Err(MarcError::EncodingError(_))
        ));
        assert!(matches!(
            utf8_slice(bytes, 2, 5),
            Err(MarcError::InvalidRecord(_))
        ));
    }
}
