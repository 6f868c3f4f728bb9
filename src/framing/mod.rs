//! Streaming record framers.
//!
//! A frame reader turns an unbounded sequence of arbitrarily sized byte chunks
//! into decoded records. It owns an accumulation buffer, recognises record
//! boundaries as chunks arrive, and hands each complete record to its codec.
//!
//! The contract is synchronous and caller-driven:
//!
//! - [`FrameReader::feed`] appends one chunk and returns every record whose
//!   boundary became visible, in input order.
//! - [`FrameReader::finish`] signals end of input, flushes whatever is still
//!   buffered, and resets the framer for reuse.
//!
//! A record that fails to decode is returned as an `Err` item. Whether framing
//! continues afterwards is governed by [`RecoveryMode`].
//!
//! # Examples
//!
//! ```
//! use marcshift::framing::{FrameReader, Iso2709FrameReader};
//! use marcshift::{iso2709, Field, Leader, Record};
//!
//! let mut record = Record::new(Leader::default());
//! record.add_field(Field::builder("245".to_string(), '0', '0').subfield_str('a', "Title").build());
//! let bytes = iso2709::encode(&record)?;
//!
//! let mut framer = Iso2709FrameReader::new();
//! let mut decoded = Vec::new();
//! for chunk in bytes.chunks(7) {
//!     decoded.extend(framer.feed(chunk));
//! }
//! decoded.extend(framer.finish());
//! assert_eq!(decoded.len(), 1);
//! # Ok::<(), marcshift::MarcError>(())
//! ```

mod aleph;
mod iso2709;
mod marcxml;

pub use aleph::AlephFrameReader;
pub use iso2709::Iso2709FrameReader;
pub use marcxml::MarcxmlFrameReader;

use crate::error::Result;
use crate::record::Record;
use crate::recovery::RecoveryMode;
use tracing::warn;

/// A chunk-driven record framer.
pub trait FrameReader: std::fmt::Debug {
    /// Append a chunk of input and return every record completed by it.
    fn feed(&mut self, chunk: &[u8]) -> Vec<Result<Record>>;

    /// Signal end of input and flush any buffered record.
    ///
    /// The framer is reset afterwards and can be fed a new stream.
    fn finish(&mut self) -> Vec<Result<Record>>;

    /// Number of records successfully decoded since the last reset.
    fn records_emitted(&self) -> usize;

    /// Change how per-record decode failures are handled.
    fn set_recovery_mode(&mut self, mode: RecoveryMode);

    /// Frame a complete input in one call: `feed(data)` followed by `finish()`.
    fn decode_all(&mut self, data: &[u8]) -> Vec<Result<Record>> {
        let mut results = self.feed(data);
        results.extend(self.finish());
        results
    }
}

/// Emission bookkeeping shared by the framers.
#[derive(Debug, Default)]
struct EmitState {
    mode: RecoveryMode,
    halted: bool,
    emitted: usize,
}

impl EmitState {
    fn is_halted(&self) -> bool {
        self.halted
    }

    fn push(&mut self, result: Result<Record>, out: &mut Vec<Result<Record>>) {
        if self.halted {
            return;
        }
        match &result {
            Ok(_) => self.emitted += 1,
            Err(e) if self.mode.halts_on_error() => {
                warn!(error = %e, "record failed to decode, halting stream");
                self.halted = true;
            },
            Err(e) => warn!(error = %e, "record failed to decode, skipping"),
        }
        out.push(result);
    }

    fn reset(&mut self) {
        self.halted = false;
        self.emitted = 0;
    }
}
