//! Reading records from [`std::io::Read`] sources.
//!
//! [`FramedReader`] pulls fixed-size chunks from a source, feeds them to a
//! [`FrameReader`], and hands out the decoded records one at a time. The
//! format is chosen by the framer type; [`MarcReader`], [`AlephReader`] and
//! [`MarcxmlReader`] name the three combinations.
//!
//! # Examples
//!
//! Reading records from a file:
//!
//! ```no_run
//! use marcshift::MarcReader;
//! use std::fs::File;
//!
//! let file = File::open("records.mrc")?;
//! let mut reader = MarcReader::new(file);
//!
//! while let Some(record) = reader.read_record()? {
//!     println!("{}", record.leader);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Reading Aleph Sequential from a buffer:
//!
//! ```
//! use marcshift::AlephReader;
//! use std::io::Cursor;
//!
//! let data = "000000001 001   L 000000001\n000000002 001   L 000000002\n";
//! let mut reader = AlephReader::new(Cursor::new(data));
//! assert!(reader.read_record()?.is_some());
//! assert!(reader.read_record()?.is_some());
//! assert!(reader.read_record()?.is_none());
//! # Ok::<(), marcshift::MarcError>(())
//! ```

use crate::config::ReaderConfig;
use crate::error::Result;
use crate::formats::FormatReader;
use crate::framing::{AlephFrameReader, FrameReader, Iso2709FrameReader, MarcxmlFrameReader};
use crate::record::Record;
use crate::recovery::RecoveryMode;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

/// Reader for ISO 2709 binary records.
pub type MarcReader<R> = FramedReader<R, Iso2709FrameReader>;

/// Reader for Aleph Sequential records.
pub type AlephReader<R> = FramedReader<R, AlephFrameReader>;

/// Reader for MARCXML records.
pub type MarcxmlReader<R> = FramedReader<R, MarcxmlFrameReader>;

/// Streams records out of a [`Read`] source through a frame reader.
///
/// A record that fails to decode is returned as an `Err` from
/// [`read_record`](Self::read_record); whether later records are still
/// delivered depends on the [`RecoveryMode`]. An I/O error from the source is
/// returned once and ends the stream.
#[derive(Debug)]
pub struct FramedReader<R: Read, F: FrameReader> {
    reader: R,
    framer: F,
    chunk: Vec<u8>,
    pending: VecDeque<Result<Record>>,
    exhausted: bool,
    records_read: usize,
}

impl<R: Read, F: FrameReader + Default> FramedReader<R, F> {
    /// Create a reader with the default configuration.
    pub fn new(reader: R) -> Self {
        Self::with_framer(reader, F::default())
    }
}

impl<R: Read, F: FrameReader> FramedReader<R, F> {
    /// Create a reader around an already configured framer.
    pub fn with_framer(reader: R, framer: F) -> Self {
        FramedReader {
            reader,
            framer,
            chunk: vec![0; ReaderConfig::default().buffer_size],
            pending: VecDeque::new(),
            exhausted: false,
            records_read: 0,
        }
    }

    /// Apply a [`ReaderConfig`].
    #[must_use]
    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.chunk = vec![0; config.buffer_size.max(1)];
        self.framer.set_recovery_mode(config.recovery_mode);
        self
    }

    /// Set the recovery mode.
    #[must_use]
    pub fn with_recovery_mode(mut self, mode: RecoveryMode) -> Self {
        self.framer.set_recovery_mode(mode);
        self
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` once the source is exhausted and every buffered
    /// record has been handed out.
    ///
    /// # Errors
    ///
    /// Returns the decode error of a malformed record, or the I/O error that
    /// ended the stream.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(result) = self.pending.pop_front() {
                let record = result?;
                self.records_read += 1;
                return Ok(Some(record));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fill()?;
        }
    }

    /// Number of records successfully returned so far.
    #[must_use]
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Consume the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn fill(&mut self) -> Result<()> {
        let n = match self.reader.read(&mut self.chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(()),
            Err(e) => {
                self.exhausted = true;
                return Err(e.into());
            },
        };

        if n == 0 {
            self.exhausted = true;
            self.pending.extend(self.framer.finish());
        } else {
            self.pending.extend(self.framer.feed(&self.chunk[..n]));
        }
        Ok(())
    }
}

impl<R: Read + std::fmt::Debug, F: FrameReader> FormatReader for FramedReader<R, F> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        FramedReader::read_record(self)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}
