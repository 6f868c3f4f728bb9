#![no_main]

use libfuzzer_sys::fuzz_target;
use marcshift::aleph;
use marcshift::framing::{AlephFrameReader, FrameReader};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(record) = aleph::decode_text(text) {
            let _ = aleph::encode(&record);
        }
    }

    let mut framer = AlephFrameReader::new();
    for chunk in data.chunks(7) {
        let _ = framer.feed(chunk);
    }
    let _ = framer.finish();
});
