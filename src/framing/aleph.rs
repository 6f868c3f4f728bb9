//! Framer for Aleph Sequential streams.
//!
//! Lines are taken once their `\n` has arrived. Consecutive lines that share a
//! record identifier form one record; the record is decoded as soon as a line
//! with a different identifier shows up, or at [`FrameReader::finish`].
//! A record containing a line that is not UTF-8 is reported as
//! [`MarcError::EncodingError`].

use super::{EmitState, FrameReader};
use crate::aleph;
use crate::error::{MarcError, Result};
use crate::record::Record;
use crate::recovery::RecoveryMode;
use bytes::BytesMut;
use std::str::Utf8Error;
use tracing::debug;

/// One complete input line.
#[derive(Debug)]
struct Line {
    text: String,
    // Set when the raw bytes were not UTF-8; `text` is then a lossy copy
    // kept only for grouping and error reporting
    utf8_error: Option<Utf8Error>,
}

impl Line {
    fn from_bytes(raw: &[u8]) -> Self {
        match std::str::from_utf8(raw) {
            Ok(text) => Line {
                text: text.to_string(),
                utf8_error: None,
            },
            Err(e) => Line {
                text: String::from_utf8_lossy(raw).into_owned(),
                utf8_error: Some(e),
            },
        }
    }
}

/// Decode one identifier group. A line that was not UTF-8 fails the group.
fn decode_group(group: &[Line]) -> Result<Record> {
    if let Some((line, e)) = group
        .iter()
        .find_map(|line| line.utf8_error.map(|e| (line, e)))
    {
        return Err(MarcError::EncodingError(format!(
            "Line is not valid UTF-8 ({e}): {}",
            line.text
        )));
    }
    let lines: Vec<&str> = group.iter().map(|line| line.text.as_str()).collect();
    aleph::decode(&lines)
}

/// Groups Aleph Sequential lines into records.
#[derive(Debug, Default)]
pub struct AlephFrameReader {
    buffer: BytesMut,
    lines: Vec<Line>,
    current_id: Option<String>,
    // Lines at the front of `lines` already known to belong to `current_id`
    scanned: usize,
    state: EmitState,
}

impl AlephFrameReader {
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

    /// Number of complete lines waiting for their record to close.
    #[must_use]
    pub fn pending_lines(&self) -> usize {
        self.lines.len()
    }

    fn push_line(&mut self, raw: &[u8]) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.iter().all(u8::is_ascii_whitespace) {
            return;
        }
        self.lines.push(Line::from_bytes(raw));
    }

    fn scan(&mut self, out: &mut Vec<Result<Record>>) {
        let mut i = self.scanned;
        while i < self.lines.len() && !self.state.is_halted() {
            let id = aleph::record_id(&self.lines[i].text).to_string();
            match &self.current_id {
                None => self.current_id = Some(id),
                Some(current) if *current != id => {
                    let group: Vec<Line> = self.lines.drain(..i).collect();
                    debug!(id = %current, lines = group.len(), "record boundary found");
                    self.current_id = Some(id);
                    self.state.push(decode_group(&group), out);
                    i = 0;
                },
                Some(_) => {},
            }
            i += 1;
        }
        self.scanned = i.min(self.lines.len());
    }
}

impl FrameReader for AlephFrameReader {
    fn feed(&mut self, chunk: &[u8]) -> Vec<Result<Record>> {
        let mut out = Vec::new();
        if self.state.is_halted() {
            return out;
        }
        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = memchr::memchr(b'\n', &self.buffer) {
            let line = self.buffer.split_to(pos + 1);
            self.push_line(&line[..pos]);
        }

        self.scan(&mut out);
        out
    }

    fn finish(&mut self) -> Vec<Result<Record>> {
        let mut out = Vec::new();
        if !self.state.is_halted() {
            let tail = std::mem::take(&mut self.buffer);
            self.push_line(&tail);
            self.scan(&mut out);

            if !self.lines.is_empty() && !self.state.is_halted() {
                debug!(lines = self.lines.len(), "decoding final record");
                let group = std::mem::take(&mut self.lines);
                self.state.push(decode_group(&group), &mut out);
            }
        }

        self.buffer.clear();
        self.lines.clear();
        self.current_id = None;
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
