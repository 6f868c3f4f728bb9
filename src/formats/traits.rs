//! Format reader and writer traits.
//!
//! Every wire format exposes the same two traits, so conversion code can be
//! written once:
//!
//! ```
//! use marcshift::formats::{FormatReader, FormatWriter};
//!
//! fn convert<R: FormatReader, W: FormatWriter>(
//!     reader: &mut R,
//!     writer: &mut W,
//! ) -> marcshift::Result<usize> {
//!     let mut count = 0;
//!     while let Some(record) = reader.read_record()? {
//!         writer.write_record(&record)?;
//!         count += 1;
//!     }
//!     writer.finish()?;
//!     Ok(count)
//! }
//! ```

use crate::error::Result;
use crate::record::Record;

/// Trait for readers that produce records from a source.
///
/// Implementations return `Ok(None)` when the source is exhausted, and
/// preserve field order, subfield order, indicators and the leader exactly as
/// found in the source.
pub trait FormatReader: std::fmt::Debug {
    /// Read the next record from the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the next record is malformed or I/O fails.
    fn read_record(&mut self) -> Result<Option<Record>>;

    /// Read all remaining records into a vector.
    ///
    /// # Errors
    ///
    /// Stops at, and returns, the first error. Records read before it are
    /// discarded.
    fn read_all(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Returns the number of records read so far, if tracked.
    fn records_read(&self) -> Option<usize> {
        None
    }
}

/// Trait for writers that serialize records to a destination.
///
/// [`finish`](Self::finish) must be called once all records are written;
/// some formats only emit their closing markup there.
pub trait FormatWriter: std::fmt::Debug {
    /// Write a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or writing fails.
    fn write_record(&mut self, record: &Record) -> Result<()>;

    /// Write several records in order.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    fn write_batch(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Finish writing and flush any buffered data.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or finalizing the output fails.
    fn finish(&mut self) -> Result<()>;

    /// Returns the number of records written so far, if tracked.
    fn records_written(&self) -> Option<usize> {
        None
    }
}

/// Iterator-style access for any [`FormatReader`].
pub trait FormatReaderExt: FormatReader {
    /// Iterate over the remaining records.
    ///
    /// Decode errors are yielded as `Err` items; iteration ends when the
    /// reader returns `Ok(None)`.
    fn records(&mut self) -> RecordIterator<'_, Self>
    where
        Self: Sized,
    {
        RecordIterator { reader: self }
    }
}

impl<T: FormatReader> FormatReaderExt for T {}

/// Iterator adapter created by [`FormatReaderExt::records`].
#[derive(Debug)]
pub struct RecordIterator<'a, R: FormatReader> {
    reader: &'a mut R,
}

impl<R: FormatReader> Iterator for RecordIterator<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarcError;
    use crate::leader::Leader;

    #[derive(Debug)]
    struct VecReader {
        items: Vec<Result<Record>>,
        read: usize,
    }

    impl FormatReader for VecReader {
        fn read_record(&mut self) -> Result<Option<Record>> {
            if self.items.is_empty() {
                return Ok(None);
            }
            let record = self.items.remove(0)?;
            self.read += 1;
            Ok(Some(record))
        }

        fn records_read(&self) -> Option<usize> {
            Some(self.read)
        }
    }

    #[derive(Debug, Default)]
    struct VecWriter {
        records: Vec<Record>,
        finished: bool,
    }

    impl FormatWriter for VecWriter {
        fn write_record(&mut self, record: &Record) -> Result<()> {
            if self.finished {
                return Err(MarcError::InvalidRecord("Writer already finished".to_string()));
            }
            self.records.push(record.clone());
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn test_read_all() {
        let mut reader = VecReader {
            items: vec![Ok(Record::default()), Ok(Record::new(Leader::new("x")))],
            read: 0,
        };
        assert_eq!(reader.read_all().unwrap().len(), 2);
        assert_eq!(reader.records_read(), Some(2));
    }

    #[test]
    fn test_iterator_yields_errors_in_place() {
        let mut reader = VecReader {
            items: vec![
                Ok(Record::default()),
                Err(MarcError::MissingIdentifier),
                Ok(Record::default()),
            ],
            read: 0,
        };
        let results: Vec<Result<Record>> = reader.records().collect();
        assert_eq!(results.len(), 3);
        assert!(results[1].is_err());
    }

    #[test]
    fn test_write_batch() {
        let mut writer = VecWriter::default();
        writer.write_batch(&[Record::default(), Record::default()]).unwrap();
        writer.finish().unwrap();
        assert_eq!(writer.records.len(), 2);
        assert_eq!(writer.records_written(), None);
        assert!(writer.write_record(&Record::default()).is_err());
    }
}
