#![no_main]

use libfuzzer_sys::fuzz_target;
use sensorlink_proto::codec::{decode_message, decode_response, encode_message};

fuzz_target!(|data: &[u8]| {
    // Must never panic, whatever the bytes
    if let Ok(message) = decode_message(data) {
        // Anything accepted re-encodes to something that decodes again
        let bytes = encode_message(&message).expect("decoded message re-encodes");
        let again = decode_message(&bytes).expect("re-encoded message decodes");
        assert_eq!(again.units.len(), message.units.len());
    }

    let _ = decode_response(data);
});
