//! MARC record leader access and structural rewriting.
//!
//! The leader is a 24-character fixed-length header at the start of every MARC record.
//! It is carried as the raw string it was decoded from; only the structural
//! positions are interpreted here.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 digits)
//! - Position 5: Record status
//! - Position 6: Record type (a = language material, c = music, etc.)
//! - Position 7: Bibliographic level (m = monograph, s = serial, etc.)
//! - Positions 8-11: Control type, character coding, indicator and subfield code counts
//! - Positions 12-16: Base address of data (5 digits)
//! - Positions 17-23: Encoding level, cataloging form, multipart level, entry map
//!
//! Record length and base address are derived values: every encoder recomputes
//! them through [`Leader::with_structure`] instead of trusting what was decoded.

use crate::error::{MarcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Length of a leader in bytes.
pub const LEADER_LEN: usize = 24;

const RECORD_LENGTH: Range<usize> = 0..5;
const BASE_ADDRESS: Range<usize> = 12..17;

/// MARC Leader - the 24-character header of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leader(String);

impl Default for Leader {
    fn default() -> Self {
        Leader("00000nam a2200000   4500".to_string())
    }
}

impl Leader {
    /// Wrap a raw leader string.
    ///
    /// No validation happens here; decoders preserve whatever the source carried.
    pub fn new(raw: impl Into<String>) -> Self {
        Leader(raw.into())
    }

    /// The raw leader text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Record length from positions 0-4, if numeric.
    #[must_use]
    pub fn record_length(&self) -> Option<u32> {
        self.numeric(RECORD_LENGTH)
    }

    /// Base address of data from positions 12-16, if numeric.
    #[must_use]
    pub fn base_address(&self) -> Option<u32> {
        self.numeric(BASE_ADDRESS)
    }

    /// Type of record (position 6).
    #[must_use]
    pub fn record_type(&self) -> Option<char> {
        self.0.chars().nth(6)
    }

    /// Bibliographic level (position 7).
    #[must_use]
    pub fn bibliographic_level(&self) -> Option<char> {
        self.0.chars().nth(7)
    }

    fn numeric(&self, range: Range<usize>) -> Option<u32> {
        let digits = self.0.get(range)?;
        if digits.bytes().all(|b| b.is_ascii_digit()) {
            digits.parse().ok()
        } else {
            None
        }
    }

    /// Return a copy with the record length and base address rewritten.
    ///
    /// Both values are written as zero-padded 5-digit decimals into positions
    /// 0-4 and 12-16.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidLeader`] if the leader is not exactly 24 bytes
    /// or the numeric positions are not ASCII, and [`MarcError::FieldOverflow`]
    /// if either value needs more than 5 digits.
    pub fn with_structure(&self, record_length: usize, base_address: usize) -> Result<Leader> {
        if self.0.len() != LEADER_LEN {
            return Err(MarcError::InvalidLeader(format!(
                "Leader must be {LEADER_LEN} bytes, got {}",
                self.0.len()
            )));
        }
        let bytes = self.0.as_bytes();
        if !bytes[RECORD_LENGTH].is_ascii() || !bytes[BASE_ADDRESS].is_ascii() {
            return Err(MarcError::InvalidLeader(format!(
                "Leader has non-ASCII structural positions: '{}'",
                self.0
            )));
        }

        let length = format_fixed(record_length, 5, "record length")?;
        let base = format_fixed(base_address, 5, "base address of data")?;

        let mut rewritten = String::with_capacity(LEADER_LEN);
        rewritten.push_str(&length);
        rewritten.push_str(&self.0[RECORD_LENGTH.end..BASE_ADDRESS.start]);
        rewritten.push_str(&base);
        rewritten.push_str(&self.0[BASE_ADDRESS.end..]);
        Ok(Leader(rewritten))
    }

    /// Get valid values for leader positions 6 and 7 (MARC 21 reference).
    ///
    /// Returns `None` for positions without a table.
    #[must_use]
    pub fn valid_values_at_position(position: usize) -> Option<Vec<(&'static str, &'static str)>> {
        match position {
            6 => Some(vec![
                ("a", "Language material"),
                ("c", "Notated music"),
                ("d", "Manuscript notated music"),
                ("e", "Cartographic material"),
                ("f", "Manuscript cartographic material"),
                ("g", "Projected medium"),
                ("i", "Nonmusical sound recording"),
                ("j", "Musical sound recording"),
                ("k", "Two-dimensional nonprojectable graphic"),
                ("m", "Computer file"),
                ("o", "Kit"),
                ("p", "Mixed materials"),
                (
                    "r",
                    "Three-dimensional artifact or naturally occurring object",
                ),
                ("t", "Manuscript language material"),
            ]),
            7 => Some(vec![
                ("a", "Monographic component part"),
                ("b", "Serial component part"),
                ("c", "Collection"),
                ("d", "Subunit"),
                ("i", "Integrating resource"),
                ("m", "Monograph/Item"),
                ("s", "Serial"),
            ]),
            _ => None,
        }
    }

    /// Get the description for a value at a leader position.
    #[must_use]
    pub fn describe_value(position: usize, value: &str) -> Option<&'static str> {
        Self::valid_values_at_position(position).and_then(|values| {
            values
                .into_iter()
                .find(|(v, _)| *v == value)
                .map(|(_, desc)| desc)
        })
    }
}

impl fmt::Display for Leader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Leader {
    fn from(raw: &str) -> Self {
        Leader::new(raw)
    }
}

/// Format `value` as a zero-padded decimal of exactly `width` digits.
///
/// # Errors
///
/// Returns [`MarcError::FieldOverflow`] if the value needs more digits.
pub(crate) fn format_fixed(value: usize, width: usize, what: &'static str) -> Result<String> {
    let text = format!("{value:0width$}");
    if text.len() > width {
        return Err(MarcError::FieldOverflow { what, value, width });
    }
    Ok(text)
}
