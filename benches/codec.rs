//! Encode/decode throughput for the PDU codec and the three framers.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use modbus_wire::{AsciiFrame, ModbusFunction, Pdu, RtuFrame, TcpFrame};

fn full_register_response() -> Pdu {
    Pdu::ReadRegistersResponse {
        function: ModbusFunction::ReadHoldingRegisters,
        values: (0..125).collect(),
    }
}

fn bench_pdu_codec(c: &mut Criterion) {
    let response = full_register_response();
    let encoded = response.encode().unwrap();

    c.bench_function("pdu_encode_125_registers", |b| {
        b.iter(|| black_box(&response).encode().unwrap())
    });

    c.bench_function("pdu_decode_125_registers", |b| {
        b.iter(|| Pdu::decode_response(black_box(encoded.as_slice())).unwrap())
    });
}

fn bench_framing(c: &mut Criterion) {
    let pdu = full_register_response().encode().unwrap();

    let rtu = RtuFrame::new(0x11, pdu.clone()).unwrap().encode();
    c.bench_function("rtu_parse_max_frame", |b| {
        b.iter(|| RtuFrame::parse(black_box(&rtu)).unwrap())
    });

    let ascii = AsciiFrame::new(0x11, pdu.clone()).unwrap().encode();
    c.bench_function("ascii_parse_max_frame", |b| {
        b.iter(|| AsciiFrame::parse(black_box(&ascii)).unwrap())
    });

    let tcp = TcpFrame::new(1, 0x11, pdu.clone()).unwrap().encode();
    c.bench_function("tcp_parse_max_frame", |b| {
        b.iter(|| TcpFrame::parse(black_box(&tcp)).unwrap())
    });

    c.bench_function("rtu_encode_max_frame", |b| {
        let frame = RtuFrame::new(0x11, pdu.clone()).unwrap();
        b.iter(|| black_box(&frame).encode())
    });
}

criterion_group!(benches, bench_pdu_codec, bench_framing);
criterion_main!(benches);
