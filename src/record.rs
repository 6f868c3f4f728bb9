//! MARC bibliographic record structures and their canonical text form.
//!
//! This module provides the record model shared by every codec:
//! - [`Record`]: leader, control fields and data fields in source order
//! - [`ControlField`]: tag/value fields (`001`-`009`)
//! - [`Field`]: data fields with two indicators and ordered subfields
//! - [`Subfield`]: coded data elements within a data field
//!
//! # Canonical text form
//!
//! `Record` implements [`Display`](std::fmt::Display) and [`FromStr`] for a
//! line-per-field text form:
//!
//! ```text
//! LDR    00000nam a2200000   4500
//! 001    12345
//! 245 10 ‡aThe Great Gatsby /‡cF. Scott Fitzgerald.
//! ```
//!
//! The Aleph Sequential encoder is built on top of this form.
//!
//! # Examples
//!
//! ```
//! use marcshift::{Field, Leader, Record};
//!
//! let record = Record::builder(Leader::default())
//!     .control_field_str("001", "12345")
//!     .field(
//!         Field::builder("245".to_string(), '1', '0')
//!             .subfield_str('a', "Title")
//!             .build(),
//!     )
//!     .build();
//!
//! let text = record.to_string();
//! let parsed: Record = text.parse()?;
//! assert_eq!(parsed, record);
//! # Ok::<(), marcshift::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::leader::Leader;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Subfield delimiter glyph used by the canonical text form.
pub const CANONICAL_DELIMITER: char = '‡';

/// Tag used for the leader line in line-oriented forms.
pub const LEADER_TAG: &str = "LDR";

/// Returns true if `tag` names a control field (tags beginning with `00`).
#[must_use]
pub fn is_control_tag(tag: &str) -> bool {
    tag.starts_with("00")
}

/// Slice `text` by character columns `[start, end)`, clamped to its length.
///
/// Line-oriented formats address their columns by character, not byte.
pub(crate) fn char_slice(text: &str, start: usize, end: Option<usize>) -> &str {
    let offset = |n: usize| text.char_indices().nth(n).map_or(text.len(), |(i, _)| i);
    let from = offset(start);
    let to = end.map_or(text.len(), offset);
    if to <= from {
        ""
    } else {
        &text[from..to]
    }
}

/// A MARC bibliographic record
///
/// Control fields and data fields are kept as ordered vectors, so repeated
/// tags keep their relative positions across a decode/encode round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Record leader (24 characters)
    pub leader: Leader,
    /// Control fields in source order
    pub control_fields: Vec<ControlField>,
    /// Data fields in source order
    pub fields: Vec<Field>,
}

/// A control field: a tag with an unstructured value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlField {
    /// Field tag (3 characters)
    pub tag: String,
    /// Field value
    pub value: String,
}

/// A data field in a MARC record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field tag (3 characters)
    pub tag: String,
    /// First indicator
    pub indicator1: char,
    /// Second indicator
    pub indicator2: char,
    /// Subfields (stored in `SmallVec` to avoid allocation for typical fields with 4 or fewer subfields)
    pub subfields: SmallVec<[Subfield; 4]>,
}

/// A subfield within a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield value
    pub value: String,
}

impl Default for Record {
    fn default() -> Self {
        Record::new(Leader::default())
    }
}

impl Record {
    /// Create a new, empty record with the given leader
    #[must_use]
    pub fn new(leader: Leader) -> Self {
        Record {
            leader,
            control_fields: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Create a builder for fluently constructing records
    #[must_use]
    pub fn builder(leader: Leader) -> RecordBuilder {
        RecordBuilder {
            record: Record::new(leader),
        }
    }

    /// Append a control field
    pub fn add_control_field(&mut self, tag: String, value: String) {
        self.control_fields.push(ControlField { tag, value });
    }

    /// Append a control field using string slices
    pub fn add_control_field_str(&mut self, tag: &str, value: &str) {
        self.add_control_field(tag.to_string(), value.to_string());
    }

    /// Get the value of the first control field with the given tag
    #[must_use]
    pub fn get_control_field(&self, tag: &str) -> Option<&str> {
        self.control_fields
            .iter()
            .find(|cf| cf.tag == tag)
            .map(|cf| cf.value.as_str())
    }

    /// Iterate over all control fields as (tag, value) tuples
    pub fn control_fields_iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.control_fields
            .iter()
            .map(|cf| (cf.tag.as_str(), cf.value.as_str()))
    }

    /// Append a data field
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Iterate over data fields with a given tag, in record order
    pub fn get_fields<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(move |f| f.tag == tag)
    }

    /// Get the first data field with a given tag
    #[must_use]
    pub fn get_field(&self, tag: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// Iterate over all data fields in record order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Parse the canonical text form.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::ParseError`] if a line is too short to carry a tag
    /// or a data field line lacks its indicator columns.
    pub fn from_canonical_str(text: &str) -> Result<Record> {
        let mut record = Record::default();

        for line in text.lines().filter(|l| !l.is_empty()) {
            let tag = char_slice(line, 0, Some(3));
            if tag.chars().count() != 3 {
                return Err(MarcError::ParseError(format!(
                    "Could not parse tag from line: {line}"
                )));
            }
            let content = char_slice(line, 7, None);

            if tag == LEADER_TAG {
                record.leader = Leader::new(content);
            } else if is_control_tag(tag) {
                record.add_control_field_str(tag, content);
            } else {
                let mut indicators = line.chars().skip(4);
                let (Some(ind1), Some(ind2)) = (indicators.next(), indicators.next()) else {
                    return Err(MarcError::ParseError(format!(
                        "Missing indicators on line: {line}"
                    )));
                };
                let mut field = Field::new(tag.to_string(), ind1, ind2);
                for chunk in content.split(CANONICAL_DELIMITER).filter(|c| !c.is_empty()) {
                    let mut chars = chunk.chars();
                    if let Some(code) = chars.next() {
                        field.add_subfield(code, chars.as_str().to_string());
                    }
                }
                record.add_field(field);
            }
        }

        Ok(record)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{LEADER_TAG}    {}", self.leader)?;
        for cf in &self.control_fields {
            write!(f, "\n{}    {}", cf.tag, cf.value)?;
        }
        for field in &self.fields {
            write!(f, "\n{field}")?;
        }
        Ok(())
    }
}

impl FromStr for Record {
    type Err = MarcError;

    fn from_str(s: &str) -> Result<Self> {
        Record::from_canonical_str(s)
    }
}

/// Builder for constructing records fluently
///
/// # Examples
///
/// ```
/// use marcshift::{Field, Leader, Record};
///
/// let record = Record::builder(Leader::default())
///     .control_field_str("001", "12345")
///     .field(Field::builder("245".to_string(), '1', '0')
///         .subfield_str('a', "The Great Gatsby")
///         .build())
///     .build();
/// assert_eq!(record.get_control_field("001"), Some("12345"));
/// ```
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Add a control field to the record being built
    #[must_use]
    pub fn control_field(mut self, tag: String, value: String) -> Self {
        self.record.add_control_field(tag, value);
        self
    }

    /// Add a control field using string slices
    #[must_use]
    pub fn control_field_str(mut self, tag: &str, value: &str) -> Self {
        self.record.add_control_field_str(tag, value);
        self
    }

    /// Add a data field to the record being built
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.record.add_field(field);
        self
    }

    /// Build the record
    #[must_use]
    pub fn build(self) -> Record {
        self.record
    }
}

impl Field {
    /// Create a new data field
    #[must_use]
    pub fn new(tag: String, indicator1: char, indicator2: char) -> Self {
        Field {
            tag,
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        }
    }

    /// Create a builder for constructing fields fluently
    #[must_use]
    pub fn builder(tag: String, indicator1: char, indicator2: char) -> FieldBuilder {
        FieldBuilder {
            field: Field::new(tag, indicator1, indicator2),
        }
    }

    /// Add a subfield
    pub fn add_subfield(&mut self, code: char, value: String) {
        self.subfields.push(Subfield { code, value });
    }

    /// Add a subfield using a string slice
    pub fn add_subfield_str(&mut self, code: char, value: &str) {
        self.add_subfield(code, value.to_string());
    }

    /// Get first value for a subfield code
    #[must_use]
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Iterate over values of subfields with a specific code
    pub fn subfields_by_code(&self, code: char) -> impl Iterator<Item = &str> {
        self.subfields
            .iter()
            .filter(move |sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{} ", self.tag, self.indicator1, self.indicator2)?;
        for sf in &self.subfields {
            write!(f, "{CANONICAL_DELIMITER}{}{}", sf.code, sf.value)?;
        }
        Ok(())
    }
}

/// Builder for constructing fields fluently
#[derive(Debug)]
pub struct FieldBuilder {
    field: Field,
}

impl FieldBuilder {
    /// Add a subfield to the field being built
    #[must_use]
    pub fn subfield(mut self, code: char, value: String) -> Self {
        self.field.add_subfield(code, value);
        self
    }

    /// Add a subfield using a string slice
    #[must_use]
    pub fn subfield_str(mut self, code: char, value: &str) -> Self {
        self.field.add_subfield_str(code, value);
        self
    }

    /// Build the field
    #[must_use]
    pub fn build(self) -> Field {
        self.field
    }
}
