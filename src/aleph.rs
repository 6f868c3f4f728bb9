//! Aleph Sequential line codec.
//!
//! Aleph Sequential is a line-oriented export format. Every field of a record
//! sits on its own line, prefixed with the record's system number:
//!
//! ```text
//! 000000001 FMT   L BK
//! 000000001 LDR   L 00000nam a2200000   4500
//! 000000001 001   L 000000001
//! 000000001 24510 L $$aTitle$$bsubtitle
//! ```
//!
//! Columns are fixed character positions: the tag starts at column 10, the
//! indicators sit at 13 and 14 and the content begins at column 18. Variable
//! fields separate subfields with `$$` followed by a one-character code.
//!
//! Long fields are split over several lines. A line whose first subfield is
//! `$$9^` or `$$9^^` continues the line before it and is merged into it
//! before any field is parsed.
//!
//! # Examples
//!
//! ```
//! use marcshift::aleph;
//!
//! let lines = [
//!     "000000001 FMT   L BK",
//!     "000000001 001   L 000000001",
//!     "000000001 24510 L $$aTitle$$bsubtitle",
//! ];
//! let record = aleph::decode(&lines)?;
//! assert_eq!(record.get_field("245").unwrap().get_subfield('b'), Some("subtitle"));
//! assert!(aleph::encode(&record)?.starts_with("000000001 FMT   L BK\n"));
//! # Ok::<(), marcshift::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::leader::Leader;
use crate::record::{char_slice, Field, Record, CANONICAL_DELIMITER, LEADER_TAG};

/// Tags whose content is carried verbatim, without indicators or subfields.
///
/// `FMT` is Aleph's own record format field; it is dropped on decode and
/// synthesised on encode.
pub const FIXED_FIELD_TAGS: [&str; 10] = [
    "FMT", "001", "002", "003", "004", "005", "006", "007", "008", "009",
];

/// Subfield marker; always followed by a one-character subfield code.
pub const SUBFIELD_MARKER: &str = "$$";

const FORMAT_TAG: &str = "FMT";
const IDENTIFIER_WIDTH: usize = 9;
const TAG_COLUMN: usize = 10;
const INDICATOR1_COLUMN: usize = 13;
const INDICATOR2_COLUMN: usize = 14;
const CONTENT_COLUMN: usize = 18;
// Past `$$9^`
const APPEND_COLUMN: usize = 22;
// Past `$$9^^$$` and the code that follows it
const JOIN_COLUMN: usize = 26;

/// The record identifier of a line: everything before its first space.
#[must_use]
pub fn record_id(line: &str) -> &str {
    line.find(' ').map_or(line, |pos| &line[..pos])
}

/// Returns true for tags that carry raw content rather than subfields.
#[must_use]
pub fn is_fixed_field_tag(tag: &str) -> bool {
    tag == LEADER_TAG || FIXED_FIELD_TAGS.contains(&tag)
}

/// Derive the Aleph record format code from leader positions 6 and 7.
///
/// # Examples
///
/// ```
/// use marcshift::{aleph, Leader};
///
/// assert_eq!(aleph::record_format(&Leader::new("00000nas a2200000   4500")), "CR");
/// assert_eq!(aleph::record_format(&Leader::new("00000nam a2200000   4500")), "BK");
/// ```
#[must_use]
pub fn record_format(leader: &Leader) -> &'static str {
    let kind = leader.record_type().unwrap_or(' ');
    let level = leader.bibliographic_level().unwrap_or(' ');
    match (kind, level) {
        ('m', _) => "CF",
        ('a' | 't', 'b' | 'i' | 's') => "CR",
        ('e' | 'f', _) => "MP",
        ('c' | 'd' | 'i' | 'j', _) => "MU",
        ('p', _) => "MX",
        ('g' | 'k' | 'o' | 'r', _) => "VM",
        _ => "BK",
    }
}

/// One line split into its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineField<'a> {
    Fixed {
        tag: &'a str,
        value: &'a str,
    },
    Variable {
        tag: &'a str,
        indicator1: char,
        indicator2: char,
        content: &'a str,
    },
}

fn parse_line(line: &str) -> Result<LineField<'_>> {
    let tag = char_slice(line, TAG_COLUMN, Some(TAG_COLUMN + 3));
    if tag.chars().count() != 3 {
        return Err(MarcError::MalformedLine(format!(
            "Could not parse tag from line: {line}"
        )));
    }

    let content = char_slice(line, CONTENT_COLUMN, None);
    if is_fixed_field_tag(tag) {
        return Ok(LineField::Fixed {
            tag,
            value: content,
        });
    }

    let column = |n: usize| line.chars().nth(n).unwrap_or(' ');
    let indicator1 = column(INDICATOR1_COLUMN);
    let indicator2 = column(INDICATOR2_COLUMN);
    Ok(LineField::Variable {
        tag,
        indicator1,
        indicator2,
        content,
    })
}

/// Split variable field content into `(code, value)` pairs.
fn subfields(content: &str) -> impl Iterator<Item = (char, &str)> {
    content
        .split(SUBFIELD_MARKER)
        .filter(|chunk| !chunk.is_empty())
        .filter_map(|chunk| {
            let mut chars = chunk.chars();
            chars.next().map(|code| (code, chars.as_str()))
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continuation {
    /// `$$9^`: the rest of the line is appended as-is
    Append,
    /// `$$9^^`: the text of the next subfield is joined with a space
    Join,
}

fn continuation_marker(line: &str) -> Result<Option<Continuation>> {
    let LineField::Variable { content, .. } = parse_line(line)? else {
        return Ok(None);
    };
    match subfields(content).next() {
        Some(('9', "^")) => Ok(Some(Continuation::Append)),
        Some(('9', "^^")) => Ok(Some(Continuation::Join)),
        Some(('9', marker)) if marker.starts_with('^') => Err(MarcError::ParseError(format!(
            "Could not parse subfield 9 continuation marker '{marker}' on line: {line}"
        ))),
        _ => Ok(None),
    }
}

/// Fold continuation lines into the line they continue.
fn merge_continuations<S: AsRef<str>>(lines: &[S]) -> Result<Vec<String>> {
    let mut merged: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines.iter().map(AsRef::as_ref) {
        if let Some(previous) = merged.last_mut() {
            if let Some(marker) = continuation_marker(line)? {
                if previous.ends_with('^') {
                    previous.pop();
                }
                match marker {
                    Continuation::Append => previous.push_str(char_slice(line, APPEND_COLUMN, None)),
                    Continuation::Join => {
                        let last = line.chars().count().saturating_sub(1);
                        previous.push(' ');
                        previous.push_str(char_slice(line, JOIN_COLUMN, Some(last)));
                    },
                }
                continue;
            }
        }
        merged.push(line.to_string());
    }
    Ok(merged)
}

/// Decode the lines of one record.
///
/// Lines must already be grouped by record identifier and stripped of their
/// line terminators. The `FMT` line is dropped, an `LDR` line becomes the
/// leader and the remaining fixed tags become control fields.
///
/// # Errors
///
/// Returns [`MarcError::MalformedLine`] if a line is too short to carry a tag
/// and [`MarcError::ParseError`] if a subfield 9 continuation marker is
/// neither `^` nor `^^`.
pub fn decode<S: AsRef<str>>(lines: &[S]) -> Result<Record> {
    let lines = merge_continuations(lines)?;
    let mut record = Record::default();

    for line in &lines {
        match parse_line(line)? {
            LineField::Fixed { tag, .. } if tag == FORMAT_TAG => {},
            LineField::Fixed { tag, value } if tag == LEADER_TAG => {
                record.leader = Leader::new(value);
            },
            LineField::Fixed { tag, value } => record.add_control_field_str(tag, value),
            LineField::Variable {
                tag,
                indicator1,
                indicator2,
                content,
            } => {
                let mut field = Field::new(tag.to_string(), indicator1, indicator2);
                for (code, value) in subfields(content) {
                    field.add_subfield_str(code, value);
                }
                record.add_field(field);
            },
        }
    }

    Ok(record)
}

/// Decode one record from newline-separated text. Blank lines are ignored.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_text(text: &str) -> Result<Record> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.is_empty()).collect();
    decode(&lines)
}

fn reads_as_continuation(field: &Field) -> bool {
    field
        .subfields
        .first()
        .is_some_and(|sf| sf.code == '9' && sf.value.starts_with('^'))
}

/// The line prefix for `id`: left-padded with `0` to nine characters.
fn line_identifier(id: &str) -> Result<String> {
    if id.chars().count() > IDENTIFIER_WIDTH || id.contains(char::is_whitespace) {
        return Err(MarcError::InvalidField(format!(
            "001 '{id}' cannot be used as a {IDENTIFIER_WIDTH}-character record identifier"
        )));
    }
    Ok(format!("{id:0>IDENTIFIER_WIDTH$}"))
}

/// Encode one record as Aleph Sequential lines, each terminated by `\n`.
///
/// The first line is a synthetic `FMT` line carrying [`record_format`]. Every
/// line of the record's canonical text form follows, with the canonical
/// subfield delimiter rewritten to `$$`.
///
/// # Errors
///
/// Returns [`MarcError::MissingIdentifier`] if the record has no `001` and
/// [`MarcError::InvalidField`] if the `001` is longer than nine characters or
/// contains whitespace, or if a data field opens with a subfield 9 starting
/// with `^` (the continuation marker).
pub fn encode(record: &Record) -> Result<String> {
    let id = record
        .get_control_field("001")
        .ok_or(MarcError::MissingIdentifier)?;
    let id = line_identifier(id)?;
    if let Some(field) = record.fields.iter().find(|field| reads_as_continuation(field)) {
        return Err(MarcError::InvalidField(format!(
            "Field {} starts with subfield 9 '^', which would read back as a continuation line",
            field.tag
        )));
    }

    let mut out = format!("{id} {FORMAT_TAG}   L {}\n", record_format(&record.leader));
    for line in record.to_string().lines() {
        let tag = char_slice(line, 0, Some(3));
        let indicator1 = char_slice(line, 4, Some(5));
        let indicator2 = char_slice(line, 5, Some(6));
        let content = char_slice(line, 7, None).replace(CANONICAL_DELIMITER, SUBFIELD_MARKER);
        out.push_str(&format!("{id} {tag}{indicator1}{indicator2} L {content}\n"));
    }
    Ok(out)
}
