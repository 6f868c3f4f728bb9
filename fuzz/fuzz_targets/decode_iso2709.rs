#![no_main]

use libfuzzer_sys::fuzz_target;
use marcshift::framing::{FrameReader, Iso2709FrameReader};
use marcshift::iso2709;

fuzz_target!(|data: &[u8]| {
    // A decoded record must survive re-encoding
    if let Ok(record) = iso2709::decode(data) {
        if let Ok(bytes) = iso2709::encode(&record) {
            let _ = iso2709::decode(&bytes);
        }
    }

    let mut framer = Iso2709FrameReader::new();
    for chunk in data.chunks(13) {
        let _ = framer.feed(chunk);
    }
    let _ = framer.finish();
});
