//! Framer for ISO 2709 binary streams.
//!
//! Records are delimited by the record terminator byte (0x1D). Everything up
//! to, but not including, the terminator is handed to [`crate::iso2709::decode`].

use super::{EmitState, FrameReader};
use crate::error::Result;
use crate::iso2709::{self, RECORD_TERMINATOR};
use crate::record::Record;
use crate::recovery::RecoveryMode;
use bytes::BytesMut;
use tracing::debug;

/// Frames ISO 2709 records out of a byte stream.
#[derive(Debug, Default)]
pub struct Iso2709FrameReader {
    buffer: BytesMut,
    // Bytes at the front of `buffer` already known to hold no terminator
    scanned: usize,
    state: EmitState,
}

impl Iso2709FrameReader {
    /// Create a framer with the default (lenient) recovery mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recovery mode.
    #[must_use]
    pub fn with_recovery_mode(mut self, mode: RecoveryMode) -> Self {
        self.state.mode = mode;
        self
    }

    /// Number of bytes buffered and not yet framed.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

impl FrameReader for Iso2709FrameReader {
    fn feed(&mut self, chunk: &[u8]) -> Vec<Result<Record>> {
        let mut out = Vec::new();
        if self.state.is_halted() {
            return out;
        }
        self.buffer.extend_from_slice(chunk);

        while !self.state.is_halted() {
            let Some(offset) = memchr::memchr(RECORD_TERMINATOR, &self.buffer[self.scanned..]) else {
                break;
            };
            let end = self.scanned + offset;
            let frame = self.buffer.split_to(end + 1);
            self.scanned = 0;
            debug!(record_len = end, "record terminator found");
            self.state.push(iso2709::decode(&frame[..end]), &mut out);
        }
        self.scanned = self.buffer.len();
        out
    }

    fn finish(&mut self) -> Vec<Result<Record>> {
        let mut out = Vec::new();
        let leftover = std::mem::take(&mut self.buffer);
        if !self.state.is_halted() && !leftover.iter().all(u8::is_ascii_whitespace) {
            debug!(len = leftover.len(), "decoding unterminated trailing record");
            self.state.push(iso2709::decode(&leftover), &mut out);
        }
        self.scanned = 0;
        self.state.reset();
        out
    }

    fn records_emitted(&self) -> usize {
        self.state.emitted
    }

    fn set_recovery_mode(&mut self, mode: RecoveryMode) {
        self.state.mode = mode;
    }
}
