#![no_main]

use libfuzzer_sys::fuzz_target;
use modbus_wire::{Pdu, TcpFrame};

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = TcpFrame::parse(data) {
        let _ = Pdu::decode_request(frame.pdu.as_slice());
        let _ = Pdu::decode_response(frame.pdu.as_slice());

        assert_eq!(frame.encode(), data);
    }
});
