//! Framer for MARCXML streams.
//!
//! Each `<record>` element (optionally namespace-prefixed) is cut out of the
//! stream as soon as its closing tag arrives and decoded with
//! [`crate::marcxml::marcxml_to_record`]. Anything between records, such as
//! the XML declaration or a `<collection>` wrapper, is discarded.

use super::{EmitState, FrameReader};
use crate::error::{MarcError, Result};
use crate::marcxml;
use crate::record::Record;
use crate::recovery::RecoveryMode;
use bytes::{Buf, BytesMut};
use lazy_static::lazy_static;
use regex::bytes::Regex;
use tracing::debug;

lazy_static! {
    static ref RECORD_START: Regex =
        Regex::new(r"<(?:[A-Za-z_][\w.-]*:)?record[\s>]").expect("valid regex");
    static ref RECORD_END: Regex =
        Regex::new(r"</(?:[A-Za-z_][\w.-]*:)?record\s*>").expect("valid regex");
}

/// Frames MARCXML `<record>` elements out of a byte stream.
#[derive(Debug, Default)]
pub struct MarcxmlFrameReader {
    buffer: BytesMut,
    // Offset where the search for the pending record's closing tag resumes
    scanned: usize,
    state: EmitState,
}

impl MarcxmlFrameReader {
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

    /// Drop everything that cannot be part of a record start tag.
    fn discard_to_last_tag_open(&mut self) {
        let keep_from = memchr::memrchr(b'<', &self.buffer).unwrap_or(self.buffer.len());
        self.buffer.advance(keep_from);
        self.scanned = 0;
    }
}

fn decode(element: &[u8]) -> Result<Record> {
    let xml = std::str::from_utf8(element)
        .map_err(|e| MarcError::EncodingError(format!("MARCXML record is not UTF-8: {e}")))?;
    marcxml::marcxml_to_record(xml)
}

impl FrameReader for MarcxmlFrameReader {
    fn feed(&mut self, chunk: &[u8]) -> Vec<Result<Record>> {
        let mut out = Vec::new();
        if self.state.is_halted() {
            return out;
        }
        self.buffer.extend_from_slice(chunk);

        while !self.state.is_halted() {
            let Some(start) = RECORD_START.find(&self.buffer).map(|m| m.start()) else {
                self.discard_to_last_tag_open();
                break;
            };
            self.buffer.advance(start);
            self.scanned = self.scanned.saturating_sub(start);

            let Some(end) = RECORD_END.find_at(&self.buffer, self.scanned).map(|m| m.end()) else {
                // A closing tag can only begin at or after the last `<`
                self.scanned = memchr::memrchr(b'<', &self.buffer).unwrap_or(self.buffer.len());
                break;
            };
            let element = self.buffer.split_to(end);
            self.scanned = 0;
            debug!(len = element.len(), "record element found");
            self.state.push(decode(&element), &mut out);
        }
        out
    }

    fn finish(&mut self) -> Vec<Result<Record>> {
        if !self.buffer.is_empty() {
            debug!(len = self.buffer.len(), "discarding trailing XML");
        }
        self.buffer.clear();
        self.scanned = 0;
        self.state.reset();
        Vec::new()
    }

    fn records_emitted(&self) -> usize {
        self.state.emitted
    }

    fn set_recovery_mode(&mut self, mode: RecoveryMode) {
        self.state.mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<marc:collection xmlns:marc="http://www.loc.gov/MARC21/slim">
  <marc:record>
    <marc:leader>00000nam a2200000   4500</marc:leader>
    <marc:controlfield tag="001">rec1</marc:controlfield>
    <marc:datafield tag="245" ind1="1" ind2="0">
      <marc:subfield code="a">Ensimmäinen</marc:subfield>
    </marc:datafield>
  </marc:record>
  <marc:record>
    <marc:leader>00000nam a2200000   4500</marc:leader>
    <marc:controlfield tag="001">rec2</marc:controlfield>
  </marc:record>
</marc:collection>
"#;

    fn ids(results: &[Result<Record>]) -> Vec<&str> {
        results
            .iter()
            .map(|r| r.as_ref().unwrap().get_control_field("001").unwrap())
            .collect()
    }

    #[test]
    fn test_frames_collection() {
        let results = MarcxmlFrameReader::new().decode_all(COLLECTION.as_bytes());
        assert_eq!(ids(&results), vec!["rec1", "rec2"]);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut framer = MarcxmlFrameReader::new();
        let mut results = Vec::new();
        for byte in COLLECTION.as_bytes() {
            results.extend(framer.feed(std::slice::from_ref(byte)));
        }
        results.extend(framer.finish());
        assert_eq!(ids(&results), vec!["rec1", "rec2"]);
        assert_eq!(
            results[0].as_ref().unwrap().get_field("245").unwrap().get_subfield('a'),
            Some("Ensimmäinen")
        );
    }

    #[test]
    fn test_closing_tag_search_resumes_at_last_tag_open() {
        let fields: String = (0..50)
            .map(|n| format!("<datafield tag=\"500\" ind1=\" \" ind2=\" \"><subfield code=\"a\">{n}</subfield></datafield>"))
            .collect();
        let head = format!("<record><controlfield tag=\"001\">big</controlfield>{fields}");

        let mut framer = MarcxmlFrameReader::new();
        assert!(framer.feed(head.as_bytes()).is_empty());
        assert_eq!(framer.scanned, head.rfind('<').unwrap());

        assert!(framer.feed(b"</rec").is_empty());
        assert_eq!(framer.scanned, framer.buffer.len() - 5);

        let results = framer.feed(b"ord>");
        assert_eq!(ids(&results), vec!["big"]);
        assert_eq!(results[0].as_ref().unwrap().fields.len(), 50);
        assert_eq!(framer.scanned, 0);
    }

    #[test]
    fn test_unprefixed_records() {
        let xml = "<collection><record><leader>00000nam a2200000   4500</leader>\
                   <controlfield tag=\"001\">x</controlfield></record></collection>";
        let results = MarcxmlFrameReader::new().decode_all(xml.as_bytes());
        assert_eq!(ids(&results), vec!["x"]);
    }

    #[test]
    fn test_unterminated_record_is_dropped_at_finish() {
        let xml = "<record><leader>00000nam a2200000   4500</leader>";
        let mut framer = MarcxmlFrameReader::new();
        assert!(framer.feed(xml.as_bytes()).is_empty());
        assert!(framer.finish().is_empty());
    }

    #[test]
    fn test_bad_record_is_reported() {
        let xml = "<record><datafield tag=\"245\"><subfield code=\"\">x</subfield></datafield></record>\
                   <record><controlfield tag=\"001\">ok</controlfield></record>";
        let results = MarcxmlFrameReader::new().decode_all(xml.as_bytes());
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(MarcError::InvalidField(_))));
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_strict_halts() {
        let xml = "<record><datafield tag=\"245\"><subfield code=\"\">x</subfield></datafield></record>\
                   <record><controlfield tag=\"001\">ok</controlfield></record>";
        let mut framer = MarcxmlFrameReader::new().with_recovery_mode(RecoveryMode::Strict);
        assert_eq!(framer.decode_all(xml.as_bytes()).len(), 1);
    }
}
