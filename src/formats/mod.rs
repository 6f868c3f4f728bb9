//! Format traits and format detection.
//!
//! | Format | Reader | Writer | Extensions |
//! |--------|--------|--------|------------|
//! | ISO 2709 | [`MarcReader`](crate::MarcReader) | [`MarcWriter`](crate::MarcWriter) | `mrc`, `marc`, `iso` |
//! | Aleph Sequential | [`AlephReader`](crate::AlephReader) | [`AlephWriter`](crate::AlephWriter) | `seq` |
//! | MARCXML | [`MarcxmlReader`](crate::MarcxmlReader) | [`MarcxmlWriter`](crate::MarcxmlWriter) | `xml` |
//!
//! [`open_reader`] and [`open_writer`] pick the implementation at runtime:
//!
//! ```
//! use marcshift::formats::{open_reader, Format};
//! use std::io::Cursor;
//!
//! let data = "000000001 001   L 000000001\n";
//! let format = Format::detect(data.as_bytes()).unwrap();
//! assert_eq!(format, Format::AlephSequential);
//!
//! let mut reader = open_reader(format, Cursor::new(data));
//! assert_eq!(reader.read_all()?.len(), 1);
//! # Ok::<(), marcshift::MarcError>(())
//! ```

mod traits;

pub use traits::{FormatReader, FormatReaderExt, FormatWriter, RecordIterator};

use crate::reader::{AlephReader, MarcReader, MarcxmlReader};
use crate::writer::{AlephWriter, MarcWriter, MarcxmlWriter};
use std::fmt::Debug;
use std::io::{Read, Write};

/// Supported wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Format {
    /// ISO 2709 binary (`.mrc`, `.marc`, `.iso`)
    Iso2709,
    /// Aleph Sequential lines (`.seq`)
    AlephSequential,
    /// MARCXML collection (`.xml`)
    Marcxml,
}

impl Format {
    /// Detect format from a file extension.
    ///
    /// ```
    /// use marcshift::formats::Format;
    ///
    /// assert_eq!(Format::from_extension("MRC"), Some(Format::Iso2709));
    /// assert_eq!(Format::from_extension("unknown"), None);
    /// ```
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mrc" | "marc" | "iso" => Some(Self::Iso2709),
            "seq" => Some(Self::AlephSequential),
            "xml" => Some(Self::Marcxml),
            _ => None,
        }
    }

    /// Guess the format from the first bytes of a stream.
    ///
    /// Markup is MARCXML, five leading digits are an ISO 2709 record length
    /// and anything else with a tag at column 10 is Aleph Sequential.
    #[must_use]
    pub fn detect(head: &[u8]) -> Option<Self> {
        let start = head.iter().position(|b| !b.is_ascii_whitespace())?;
        let head = &head[start..];
        let space_at_id_end = head.get(9) == Some(&b' ');
        let record_length = head.get(..5).is_some_and(|n| n.iter().all(u8::is_ascii_digit));

        if head.starts_with(b"<") {
            Some(Self::Marcxml)
        } else if record_length && !space_at_id_end {
            Some(Self::Iso2709)
        } else if space_at_id_end && head.len() >= 13 {
            Some(Self::AlephSequential)
        } else {
            None
        }
    }

    /// Get the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Iso2709 => "mrc",
            Self::AlephSequential => "seq",
            Self::Marcxml => "xml",
        }
    }

    /// Get the human-readable name for this format.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Iso2709 => "ISO 2709",
            Self::AlephSequential => "Aleph Sequential",
            Self::Marcxml => "MARCXML",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Create a boxed reader for `format`.
pub fn open_reader<R>(format: Format, source: R) -> Box<dyn FormatReader>
where
    R: Read + Debug + 'static,
{
    match format {
        Format::Iso2709 => Box::new(MarcReader::new(source)),
        Format::AlephSequential => Box::new(AlephReader::new(source)),
        Format::Marcxml => Box::new(MarcxmlReader::new(source)),
    }
}

/// Create a boxed writer for `format`.
pub fn open_writer<W>(format: Format, destination: W) -> Box<dyn FormatWriter>
where
    W: Write + Debug + 'static,
{
    match format {
        Format::Iso2709 => Box::new(MarcWriter::new(destination)),
        Format::AlephSequential => Box::new(AlephWriter::new(destination)),
        Format::Marcxml => Box::new(MarcxmlWriter::new(destination)),
    }
}
