//! Common test helpers shared across the integration suites.

#![allow(dead_code)]

use marcshift::framing::FrameReader;
use marcshift::{iso2709, Field, Leader, Record, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Route library diagnostics to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .try_init();
}

/// Leader used by the generated test records.
pub fn create_test_leader() -> Leader {
    Leader::new("00000cam a22000004i 4500")
}

/// A small bibliographic record with multi-byte content.
pub fn create_test_record(id: &str) -> Record {
    Record::builder(create_test_leader())
        .control_field_str("001", id)
        .control_field_str("008", "190311s2019    fi |||||||||||||||||fin||")
        .field(
            Field::builder("100".to_string(), '1', ' ')
                .subfield_str('a', "Virtanen, Maija,")
                .subfield_str('e', "kirjoittaja.")
                .build(),
        )
        .field(
            Field::builder("245".to_string(), '1', '0')
                .subfield_str('a', "Kirjastojen historia Suomessa /")
                .subfield_str('c', "Maija Virtanen.")
                .build(),
        )
        .field(
            Field::builder("650".to_string(), ' ', '7')
                .subfield_str('a', "kirjastot – historia")
                .subfield_str('2', "yso/fin")
                .build(),
        )
        .build()
}

/// Concatenate the ISO 2709 encodings of `records`.
pub fn binary_stream(records: &[Record]) -> Vec<u8> {
    records
        .iter()
        .flat_map(|r| iso2709::encode(r).expect("test record encodes"))
        .collect()
}

/// Feed `data` to `framer` in chunks of `chunk_size` bytes, then finish.
pub fn frame_in_chunks<F: FrameReader>(
    framer: &mut F,
    data: &[u8],
    chunk_size: usize,
) -> Vec<Result<Record>> {
    let mut results = Vec::new();
    for chunk in data.chunks(chunk_size.max(1)) {
        results.extend(framer.feed(chunk));
    }
    results.extend(framer.finish());
    results
}

/// Unwrap every result, panicking with the first error.
pub fn unwrap_all(results: Vec<Result<Record>>) -> Vec<Record> {
    results
        .into_iter()
        .map(|r| r.expect("record decodes"))
        .collect()
}
