//! Writing records to [`std::io::Write`] destinations.
//!
//! One writer per wire format: [`MarcWriter`] (ISO 2709), [`AlephWriter`]
//! (Aleph Sequential) and [`MarcxmlWriter`] (a MARCXML `<collection>`).
//!
//! # Examples
//!
//! ```
//! use marcshift::{AlephWriter, Field, Leader, Record};
//!
//! let record = Record::builder(Leader::default())
//!     .control_field_str("001", "000000001")
//!     .field(Field::builder("245".to_string(), '1', '0').subfield_str('a', "Title").build())
//!     .build();
//!
//! let mut buffer = Vec::new();
//! let mut writer = AlephWriter::new(&mut buffer);
//! writer.write_record(&record)?;
//! writer.finish()?;
//! assert!(String::from_utf8(buffer).unwrap().contains("000000001 24510 L $$aTitle\n"));
//! # Ok::<(), marcshift::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::formats::FormatWriter;
use crate::marcxml::{self, MARCXML_NS, XML_DECLARATION};
use crate::record::Record;
use crate::{aleph, iso2709};
use std::io::Write;

fn finished_error() -> MarcError {
    MarcError::InvalidRecord("Writer already finished".to_string())
}

/// Writer for ISO 2709 binary records.
#[derive(Debug)]
pub struct MarcWriter<W: Write> {
    writer: W,
    records_written: usize,
    finished: bool,
}

impl<W: Write> MarcWriter<W> {
    /// Create a new binary writer.
    pub fn new(writer: W) -> Self {
        MarcWriter {
            writer,
            records_written: 0,
            finished: false,
        }
    }

    /// Encode and write one record, including its record terminator.
    ///
    /// # Errors
    ///
    /// Returns the encoder's error for a record that cannot be laid out, or an
    /// I/O error.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(finished_error());
        }
        let bytes = iso2709::encode(record)?;
        self.writer.write_all(&bytes)?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush the destination.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if flushing fails.
    pub fn finish(&mut self) -> Result<()> {
        self.finished = true;
        self.writer.flush()?;
        Ok(())
    }

    /// Consume the writer, returning the underlying destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Writer for Aleph Sequential records.
#[derive(Debug)]
pub struct AlephWriter<W: Write> {
    writer: W,
    records_written: usize,
    finished: bool,
}

impl<W: Write> AlephWriter<W> {
    /// Create a new Aleph Sequential writer.
    pub fn new(writer: W) -> Self {
        AlephWriter {
            writer,
            records_written: 0,
            finished: false,
        }
    }

    /// Encode and write the lines of one record.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::MissingIdentifier`] for a record without `001`,
    /// or an I/O error.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(finished_error());
        }
        let lines = aleph::encode(record)?;
        self.writer.write_all(lines.as_bytes())?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush the destination.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if flushing fails.
    pub fn finish(&mut self) -> Result<()> {
        self.finished = true;
        self.writer.flush()?;
        Ok(())
    }

    /// Consume the writer, returning the underlying destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Writer for a MARCXML `<collection>`.
///
/// The XML declaration and opening `<collection>` tag are written before the
/// first record; [`finish`](Self::finish) closes the collection, so it must be
/// called even when no record was written.
#[derive(Debug)]
pub struct MarcxmlWriter<W: Write> {
    writer: W,
    records_written: usize,
    started: bool,
    finished: bool,
}

impl<W: Write> MarcxmlWriter<W> {
    /// Create a new MARCXML writer.
    pub fn new(writer: W) -> Self {
        MarcxmlWriter {
            writer,
            records_written: 0,
            started: false,
            finished: false,
        }
    }

    fn start(&mut self) -> Result<()> {
        if !self.started {
            write!(self.writer, "{XML_DECLARATION}\n<collection xmlns=\"{MARCXML_NS}\">\n")?;
            self.started = true;
        }
        Ok(())
    }

    /// Write one `<record>` element.
    ///
    /// # Errors
    ///
    /// Returns a serialization or I/O error.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(finished_error());
        }
        let element = marcxml::record_to_marcxml_element(record)?;
        self.start()?;
        self.writer.write_all(element.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.records_written += 1;
        Ok(())
    }

    /// Close the collection and flush.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing or flushing fails.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.start()?;
        self.writer.write_all(b"</collection>\n")?;
        self.writer.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Consume the writer, returning the underlying destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

macro_rules! impl_format_writer {
    ($($writer:ident),*) => {$(
        impl<W: Write + std::fmt::Debug> FormatWriter for $writer<W> {
            fn write_record(&mut self, record: &Record) -> Result<()> {
                $writer::write_record(self, record)
            }

            fn finish(&mut self) -> Result<()> {
                $writer::finish(self)
            }

            fn records_written(&self) -> Option<usize> {
                Some(self.records_written)
            }
        }
    )*};
}

impl_format_writer!(MarcWriter, AlephWriter, MarcxmlWriter);
