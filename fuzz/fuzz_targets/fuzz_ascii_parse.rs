#![no_main]

use libfuzzer_sys::fuzz_target;
use modbus_wire::{AsciiFrame, Pdu};

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = AsciiFrame::parse(data) {
        let _ = Pdu::decode_request(frame.pdu.as_slice());
        let _ = Pdu::decode_response(frame.pdu.as_slice());

        // Re-encoding normalizes hex digits to upper case, so compare
        // case-insensitively with the input
        let reencoded = frame.encode();
        assert_eq!(reencoded.to_ascii_uppercase(), data.to_ascii_uppercase());
    }
});
