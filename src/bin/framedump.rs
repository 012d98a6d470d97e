//! Modbus Wire Demo
//!
//! Builds the same Read Holding Registers transaction on all three
//! transports and dumps the wire bytes, then parses them back.
//!
//! Usage: cargo run --bin framedump

use modbus_wire::{
    interchar_timeout_us, interframe_delay_us, AsciiFrame, ModbusFunction, Pdu, RtuFrame, TcpFrame,
};

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("modbus_wire v{} frame dump", modbus_wire::VERSION);
    println!("==============================\n");

    // Read 3 holding registers from 0x006B on slave/unit 0x11
    let request = Pdu::ReadRegistersRequest {
        function: ModbusFunction::ReadHoldingRegisters,
        start_address: 0x006B,
        quantity: 3,
    };
    println!("PDU: {}", hex(request.encode()?.as_slice()));

    // =========================================================================
    // One PDU, three envelopes
    // =========================================================================

    let rtu = RtuFrame::new(0x11, request.encode()?)?;
    println!("RTU:   {}", hex(&rtu.encode()));

    let ascii = AsciiFrame::new(0x11, request.encode()?)?;
    println!("ASCII: {}", String::from_utf8_lossy(&ascii.encode()).trim_end());

    let tcp = TcpFrame::new(0x0001, 0x11, request.encode()?)?;
    println!("TCP:   {}", hex(&tcp.encode()));

    // =========================================================================
    // Round trip and exception handling
    // =========================================================================

    let parsed = RtuFrame::parse(&rtu.encode())?;
    let decoded = Pdu::decode_request(parsed.pdu.as_slice())?;
    println!("\nRTU parse -> addr={}, {decoded:?}", parsed.address);

    let exception = TcpFrame::parse(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x11, 0x83, 0x02])?;
    let decoded = Pdu::decode_response(exception.pdu.as_slice())?;
    if let Pdu::Exception {
        function,
        exception,
    } = decoded
    {
        println!("TCP exception -> {function}: {exception}");
    }

    // =========================================================================
    // RTU timing table
    // =========================================================================

    println!("\nbaud    t3.5 (us)  t1.5 (us)");
    for baud in [1200, 9600, 19200, 38400, 115200] {
        println!(
            "{baud:<7} {:<10} {}",
            interframe_delay_us(baud),
            interchar_timeout_us(baud)
        );
    }

    Ok(())
}
