//! Modbus TCP framing (MBAP)
//!
//! TCP frame layout, all fields big-endian:
//!
//! ```text
//! [transaction id (2)] [protocol id (2) = 0] [length (2)] [unit id (1)] [PDU]
//! ```
//!
//! The length field counts unit id + PDU, so a frame is `length + 6`
//! bytes overall and never more than 260. There is no checksum; TCP
//! provides integrity. Transaction ids pair responses with requests; the
//! counter state lives with the caller, this module only supplies the
//! wrapping successor.

use tracing::debug;

use crate::constants::{MBAP_HEADER_SIZE, MBAP_MAX_LENGTH, TCP_MIN_FRAME_SIZE};
use crate::error::{ModbusError, ModbusResult};
use crate::pdu::ModbusPdu;

/// Protocol identifier for Modbus; the field is reserved at zero.
pub const PROTOCOL_ID: u16 = 0x0000;

// ============================================================================
// MBAP Header
// ============================================================================

/// The 7-byte MBAP header preceding every TCP PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    /// Request/response pairing id, echoed by the server
    pub transaction_id: u16,
    /// Always 0x0000 for Modbus
    pub protocol_id: u16,
    /// Byte count of unit id + PDU
    pub length: u16,
    /// Target unit, for gateways bridging to serial lines
    pub unit_id: u8,
}

impl MbapHeader {
    /// Header for a frame carrying `pdu_len` PDU bytes.
    pub fn new(transaction_id: u16, unit_id: u8, pdu_len: usize) -> Self {
        Self {
            transaction_id,
            protocol_id: PROTOCOL_ID,
            length: (1 + pdu_len) as u16,
            unit_id,
        }
    }

    /// Serialize to the 7 wire bytes.
    pub fn encode(&self) -> [u8; MBAP_HEADER_SIZE] {
        let mut bytes = [0u8; MBAP_HEADER_SIZE];
        bytes[0..2].copy_from_slice(&self.transaction_id.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.protocol_id.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.length.to_be_bytes());
        bytes[6] = self.unit_id;
        bytes
    }

    /// Deserialize from at least 7 wire bytes. Field values are not
    /// validated here; [`TcpFrame::parse`] applies the structural rules.
    pub fn decode(bytes: &[u8]) -> ModbusResult<Self> {
        if bytes.len() < MBAP_HEADER_SIZE {
            return Err(ModbusError::FrameTooShort {
                length: bytes.len(),
                minimum: MBAP_HEADER_SIZE,
            });
        }
        Ok(Self {
            transaction_id: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
            unit_id: bytes[6],
        })
    }
}

// ============================================================================
// Frame Build and Parse
// ============================================================================

/// A parsed or to-be-sent Modbus TCP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpFrame {
    /// MBAP header
    pub header: MbapHeader,
    /// The transported PDU
    pub pdu: ModbusPdu,
}

impl TcpFrame {
    /// Assemble a frame for transmission.
    pub fn new(transaction_id: u16, unit_id: u8, pdu: ModbusPdu) -> ModbusResult<Self> {
        if pdu.is_empty() {
            return Err(ModbusError::invalid_argument("cannot frame an empty PDU"));
        }
        Ok(Self {
            header: MbapHeader::new(transaction_id, unit_id, pdu.len()),
            pdu,
        })
    }

    /// Total wire size of this frame.
    #[inline]
    pub fn wire_len(&self) -> usize {
        MBAP_HEADER_SIZE + self.pdu.len()
    }

    /// Encode to an owned byte buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.wire_len());
        frame.extend_from_slice(&self.header.encode());
        frame.extend_from_slice(self.pdu.as_slice());

        debug!(
            "TCP frame encoded: tid={}, unit={}, FC=0x{:02X}, len={}",
            self.header.transaction_id,
            self.header.unit_id,
            self.pdu.function_code().unwrap_or(0),
            frame.len()
        );
        frame
    }

    /// Encode into a caller-provided buffer, returning the bytes written.
    /// Semantically identical to [`TcpFrame::encode`].
    pub fn encode_into(&self, buf: &mut [u8]) -> ModbusResult<usize> {
        let needed = self.wire_len();
        if buf.len() < needed {
            return Err(ModbusError::BufferTooSmall {
                needed,
                available: buf.len(),
            });
        }
        buf[..MBAP_HEADER_SIZE].copy_from_slice(&self.header.encode());
        buf[MBAP_HEADER_SIZE..needed].copy_from_slice(self.pdu.as_slice());
        Ok(needed)
    }

    /// Parse a complete MBAP-framed message.
    ///
    /// Checks, in order: minimum length ([`ModbusError::FrameTooShort`]),
    /// protocol id ([`ModbusError::WrongProtocol`]), agreement of the
    /// length field with the actual frame size
    /// ([`ModbusError::LengthMismatch`]), then the inner PDU
    /// ([`ModbusError::MalformedPdu`]).
    pub fn parse(frame: &[u8]) -> ModbusResult<Self> {
        if frame.len() < TCP_MIN_FRAME_SIZE {
            return Err(ModbusError::FrameTooShort {
                length: frame.len(),
                minimum: TCP_MIN_FRAME_SIZE,
            });
        }

        let header = MbapHeader::decode(frame)?;
        if header.protocol_id != PROTOCOL_ID {
            return Err(ModbusError::WrongProtocol {
                protocol_id: header.protocol_id,
            });
        }

        let declared = header.length as usize;
        let actual = frame.len() - (MBAP_HEADER_SIZE - 1);
        if declared != actual || declared < 2 || declared > MBAP_MAX_LENGTH {
            return Err(ModbusError::LengthMismatch { declared, actual });
        }

        let pdu = ModbusPdu::from_wire(&frame[MBAP_HEADER_SIZE..])?;

        debug!(
            "TCP frame parsed: tid={}, unit={}, FC=0x{:02X}, len={}",
            header.transaction_id,
            header.unit_id,
            pdu.function_code().unwrap_or(0),
            frame.len()
        );
        Ok(Self { header, pdu })
    }
}

// ============================================================================
// Transaction IDs
// ============================================================================

/// Successor of a transaction id, wrapping 0xFFFF -> 0x0000.
///
/// The counter itself belongs to the connection owner; advancing it under
/// that owner's synchronization keeps this function pure.
#[inline]
pub fn next_transaction_id(current: u16) -> u16 {
    current.wrapping_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::PduBuilder;

    #[test]
    fn test_tcp_build_frame_fc03() {
        let pdu = PduBuilder::build_read_request(0x03, 0x006B, 3).unwrap();
        let frame = TcpFrame::new(0x0001, 0x11, pdu).unwrap();
        assert_eq!(
            frame.encode(),
            vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x11, 0x03, 0x00, 0x6B, 0x00, 0x03]
        );
    }

    #[test]
    fn test_tcp_build_frame_buffer_small() {
        let pdu = PduBuilder::build_read_request(0x03, 0x006B, 3).unwrap();
        let frame = TcpFrame::new(0x0001, 0x11, pdu).unwrap();

        let mut buf = [0u8; 8];
        assert!(matches!(
            frame.encode_into(&mut buf),
            Err(ModbusError::BufferTooSmall {
                needed: 12,
                available: 8
            })
        ));

        let mut buf = [0u8; 260];
        let written = frame.encode_into(&mut buf).unwrap();
        assert_eq!(&buf[..written], frame.encode().as_slice());
    }

    #[test]
    fn test_tcp_parse_frame_fc03() {
        let frame = TcpFrame::parse(&[
            0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x11, 0x03, 0x00, 0x6B, 0x00, 0x03,
        ])
        .unwrap();
        assert_eq!(frame.header.transaction_id, 1);
        assert_eq!(frame.header.protocol_id, 0);
        assert_eq!(frame.header.length, 6);
        assert_eq!(frame.header.unit_id, 0x11);
        assert_eq!(frame.pdu.as_slice(), &[0x03, 0x00, 0x6B, 0x00, 0x03]);
    }

    #[test]
    fn test_tcp_parse_response_frame() {
        // FC03 response: byte count 4, registers 0x0001 0x0002
        let frame = TcpFrame::parse(&[
            0x00, 0x2A, 0x00, 0x00, 0x00, 0x07, 0x11, 0x03, 0x04, 0x00, 0x01, 0x00, 0x02,
        ])
        .unwrap();
        assert_eq!(frame.header.transaction_id, 0x2A);
        assert_eq!(frame.pdu.as_slice(), &[0x03, 0x04, 0x00, 0x01, 0x00, 0x02]);
    }

    #[test]
    fn test_tcp_parse_exception_frame() {
        let frame =
            TcpFrame::parse(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x11, 0x83, 0x02]).unwrap();
        assert!(frame.pdu.is_exception());
        assert_eq!(frame.pdu.exception_code(), Some(0x02));
    }

    #[test]
    fn test_tcp_parse_frame_too_short() {
        let err = TcpFrame::parse(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x11]).unwrap_err();
        assert_eq!(
            err,
            ModbusError::FrameTooShort {
                length: 7,
                minimum: 8
            }
        );
    }

    #[test]
    fn test_tcp_parse_frame_wrong_protocol() {
        let err = TcpFrame::parse(&[
            0x00, 0x01, 0x00, 0x01, 0x00, 0x06, 0x11, 0x03, 0x00, 0x6B, 0x00, 0x03,
        ])
        .unwrap_err();
        assert_eq!(err, ModbusError::WrongProtocol { protocol_id: 1 });
    }

    #[test]
    fn test_tcp_parse_frame_length_mismatch() {
        // Declares length 5 but the frame holds 20 bytes total
        let mut frame = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x11];
        frame.extend_from_slice(&[0x03; 13]);
        assert_eq!(frame.len(), 20);

        let err = TcpFrame::parse(&frame).unwrap_err();
        assert_eq!(
            err,
            ModbusError::LengthMismatch {
                declared: 5,
                actual: 14
            }
        );
    }

    #[test]
    fn test_tcp_parse_frame_length_too_small() {
        // Length 1 would leave no room for a function code
        let err = TcpFrame::parse(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x11, 0x03]).unwrap_err();
        assert!(matches!(err, ModbusError::LengthMismatch { .. }));
    }

    #[test]
    fn test_tcp_frame_round_trip() {
        let pdu = PduBuilder::build_write_multiple_registers(0x0001, &[0x000A, 0x0102]).unwrap();
        let sent = TcpFrame::new(0xBEEF, 0x11, pdu).unwrap();
        let received = TcpFrame::parse(&sent.encode()).unwrap();
        assert_eq!(received, sent);
    }

    #[test]
    fn test_mbap_header_round_trip() {
        let header = MbapHeader::new(0x1234, 0x11, 5);
        assert_eq!(header.length, 6);
        let decoded = MbapHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_tcp_transaction_id() {
        assert_eq!(next_transaction_id(0), 1);
        assert_eq!(next_transaction_id(41), 42);
        // Wraps at the 16-bit boundary
        assert_eq!(next_transaction_id(0xFFFF), 0x0000);
    }
}
