//! Modbus RTU framing and serial-line timing
//!
//! RTU frame layout:
//!
//! ```text
//! [address (1)] [function (1)] [body (0-251)] [crc_lo (1)] [crc_hi (1)]
//! ```
//!
//! Total size 4..=256 bytes, CRC-16 transmitted little-endian over
//! address + PDU. Frames on the line are delimited by silence: at least
//! 3.5 character times between frames, and no gap of 1.5 character times
//! or more inside one. [`RtuReceiver`] implements that delimiting over a
//! caller-supplied byte/timestamp stream; this crate never owns a timer
//! or a serial port.

use tracing::debug;

use crate::constants::{
    BITS_PER_CHAR, INTERCHAR_TIMEOUT_FIXED_US, INTERFRAME_DELAY_FIXED_US, MAX_SLAVE_ADDRESS,
    RTU_MAX_FRAME_SIZE, RTU_MIN_FRAME_SIZE, TIMING_FIXED_BAUD,
};
use crate::crc::{crc16, crc16_verify};
use crate::error::{ModbusError, ModbusResult};
use crate::pdu::ModbusPdu;

// ============================================================================
// Frame Build and Parse
// ============================================================================

/// A parsed or to-be-sent RTU frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtuFrame {
    /// Slave address (0 = broadcast)
    pub address: u8,
    /// The transported PDU
    pub pdu: ModbusPdu,
    /// CRC-16 over address + PDU
    pub crc: u16,
}

impl RtuFrame {
    /// Assemble a frame for transmission. The CRC is computed here.
    ///
    /// Addresses above 247 are reserved by the serial-line spec and
    /// rejected with [`ModbusError::InvalidArgument`].
    pub fn new(address: u8, pdu: ModbusPdu) -> ModbusResult<Self> {
        if address > MAX_SLAVE_ADDRESS {
            return Err(ModbusError::invalid_argument(format!(
                "slave address {address} above {MAX_SLAVE_ADDRESS}"
            )));
        }
        if pdu.is_empty() {
            return Err(ModbusError::invalid_argument("cannot frame an empty PDU"));
        }

        let mut crc_input = Vec::with_capacity(1 + pdu.len());
        crc_input.push(address);
        crc_input.extend_from_slice(pdu.as_slice());
        let crc = crc16(&crc_input);

        Ok(Self { address, pdu, crc })
    }

    /// Total wire size of this frame.
    #[inline]
    pub fn wire_len(&self) -> usize {
        1 + self.pdu.len() + 2
    }

    /// Encode to an owned byte buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.wire_len());
        frame.push(self.address);
        frame.extend_from_slice(self.pdu.as_slice());
        frame.extend_from_slice(&self.crc.to_le_bytes());

        debug!(
            "RTU frame encoded: addr={}, FC=0x{:02X}, len={}",
            self.address,
            self.pdu.function_code().unwrap_or(0),
            frame.len()
        );
        frame
    }

    /// Encode into a caller-provided buffer, returning the bytes written.
    /// Semantically identical to [`RtuFrame::encode`].
    pub fn encode_into(&self, buf: &mut [u8]) -> ModbusResult<usize> {
        let needed = self.wire_len();
        if buf.len() < needed {
            return Err(ModbusError::BufferTooSmall {
                needed,
                available: buf.len(),
            });
        }
        buf[0] = self.address;
        buf[1..1 + self.pdu.len()].copy_from_slice(self.pdu.as_slice());
        buf[needed - 2..needed].copy_from_slice(&self.crc.to_le_bytes());
        Ok(needed)
    }

    /// Parse a complete frame received off the line.
    ///
    /// Checks, in order: minimum length ([`ModbusError::FrameTooShort`]),
    /// CRC ([`ModbusError::BadCrc`]), then the inner PDU
    /// ([`ModbusError::MalformedPdu`]).
    pub fn parse(frame: &[u8]) -> ModbusResult<Self> {
        if frame.len() < RTU_MIN_FRAME_SIZE {
            return Err(ModbusError::FrameTooShort {
                length: frame.len(),
                minimum: RTU_MIN_FRAME_SIZE,
            });
        }

        let split = frame.len() - 2;
        if !crc16_verify(frame) {
            return Err(ModbusError::BadCrc {
                computed: crc16(&frame[..split]),
                received: u16::from_le_bytes([frame[split], frame[split + 1]]),
            });
        }

        let address = frame[0];
        let pdu = ModbusPdu::from_wire(&frame[1..split])?;
        let crc = u16::from_le_bytes([frame[split], frame[split + 1]]);

        debug!(
            "RTU frame parsed: addr={}, FC=0x{:02X}, len={}",
            address,
            pdu.function_code().unwrap_or(0),
            frame.len()
        );
        Ok(Self { address, pdu, crc })
    }
}

// ============================================================================
// Timing
// ============================================================================

/// Inter-frame delay (3.5 character times) in microseconds.
///
/// A character is 11 bits. At and above 19200 baud the serial-line spec
/// fixes the delay at 1750 us; below, it is `3.5 * 11 / baud` rounded to
/// the nearest microsecond. Baud 0 falls back to the fixed value.
pub fn interframe_delay_us(baud_rate: u32) -> u32 {
    if baud_rate == 0 || baud_rate >= TIMING_FIXED_BAUD {
        INTERFRAME_DELAY_FIXED_US
    } else {
        // 3.5 chars * 11 bits * 1e6 us = 38_500_000 bit-us
        let numerator = 3_500_000 * BITS_PER_CHAR;
        (numerator + baud_rate / 2) / baud_rate
    }
}

/// Inter-character timeout (1.5 character times) in microseconds.
///
/// Fixed at 750 us at and above 19200 baud, `1.5 * 11 / baud` rounded to
/// the nearest microsecond below.
pub fn interchar_timeout_us(baud_rate: u32) -> u32 {
    if baud_rate == 0 || baud_rate >= TIMING_FIXED_BAUD {
        INTERCHAR_TIMEOUT_FIXED_US
    } else {
        // 1.5 chars * 11 bits * 1e6 us = 16_500_000 bit-us
        let numerator = 1_500_000 * BITS_PER_CHAR;
        (numerator + baud_rate / 2) / baud_rate
    }
}

/// Both RTU timing values for one baud rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudTiming {
    /// Configured baud rate
    pub baud_rate: u32,
    /// Silence that delimits frames (t3.5)
    pub interframe_delay_us: u32,
    /// Largest tolerated gap inside a frame (t1.5)
    pub interchar_timeout_us: u32,
}

impl BaudTiming {
    /// Derive the timing pair from a baud rate.
    pub fn from_baud(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            interframe_delay_us: interframe_delay_us(baud_rate),
            interchar_timeout_us: interchar_timeout_us(baud_rate),
        }
    }
}

// ============================================================================
// Live-Stream Receiver
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Waiting for the first byte of a frame
    Idle,
    /// Collecting frame bytes
    Receiving,
    /// A complete frame is buffered
    Complete,
}

/// Frame delimiter for a live RTU byte stream.
///
/// The caller feeds every received byte together with a monotonic
/// microsecond timestamp and polls for completion; the receiver holds no
/// timer and never blocks. A gap of more than t1.5 inside a frame is
/// reported as [`ModbusError::FrameError`] and reception restarts at the
/// offending byte; a gap of at least t3.5 ends the frame.
///
/// # Example
///
/// ```rust
/// use modbus_wire::rtu::RtuReceiver;
///
/// let mut rx = RtuReceiver::new(19_200);
/// let frame = [0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD];
/// for (i, &byte) in frame.iter().enumerate() {
///     rx.push_byte(byte, 100 * i as u64).unwrap();
/// }
/// // 3.5 char times of silence close the frame
/// let received = rx.poll_complete(100 * 8 + 1_750).unwrap();
/// assert_eq!(received, &frame);
/// ```
#[derive(Debug, Clone)]
pub struct RtuReceiver {
    timing: BaudTiming,
    buffer: [u8; RTU_MAX_FRAME_SIZE],
    len: usize,
    last_byte_at_us: u64,
    state: RxState,
}

impl RtuReceiver {
    /// Create a receiver with timing derived from the baud rate.
    pub fn new(baud_rate: u32) -> Self {
        Self {
            timing: BaudTiming::from_baud(baud_rate),
            buffer: [0; RTU_MAX_FRAME_SIZE],
            len: 0,
            last_byte_at_us: 0,
            state: RxState::Idle,
        }
    }

    /// Timing values this receiver applies.
    #[inline]
    pub fn timing(&self) -> BaudTiming {
        self.timing
    }

    /// Discard any partial frame and return to idle.
    pub fn reset(&mut self) {
        self.state = RxState::Idle;
        self.len = 0;
    }

    /// Feed one received byte with its arrival time (monotonic, in
    /// microseconds).
    ///
    /// Returns [`ModbusError::FrameError`] when the byte arrives after
    /// the inter-character timeout inside a frame, or when the frame
    /// overruns the 256-byte RTU limit. In both cases reception restarts
    /// cleanly: the offending byte opens the next frame.
    pub fn push_byte(&mut self, byte: u8, now_us: u64) -> ModbusResult<()> {
        match self.state {
            RxState::Idle | RxState::Complete => {
                self.start_frame(byte, now_us);
                Ok(())
            }
            RxState::Receiving => {
                let gap = now_us.saturating_sub(self.last_byte_at_us);
                if gap > u64::from(self.timing.interchar_timeout_us) {
                    // The partial frame is lost; this byte opens a new one
                    self.start_frame(byte, now_us);
                    return Err(ModbusError::FrameError);
                }

                if self.len >= RTU_MAX_FRAME_SIZE {
                    self.reset();
                    return Err(ModbusError::FrameError);
                }
                self.buffer[self.len] = byte;
                self.len += 1;
                self.last_byte_at_us = now_us;
                Ok(())
            }
        }
    }

    /// Check whether the inter-frame silence has elapsed and a complete
    /// frame is available.
    ///
    /// Returns the raw frame bytes once at least t3.5 has passed since
    /// the last byte. Runt frames (shorter than 4 bytes) are discarded
    /// silently as line noise. The frame stays available until the next
    /// [`RtuReceiver::push_byte`].
    pub fn poll_complete(&mut self, now_us: u64) -> Option<&[u8]> {
        match self.state {
            RxState::Complete => Some(&self.buffer[..self.len]),
            RxState::Receiving => {
                let gap = now_us.saturating_sub(self.last_byte_at_us);
                if gap < u64::from(self.timing.interframe_delay_us) {
                    return None;
                }
                if self.len < RTU_MIN_FRAME_SIZE {
                    self.reset();
                    return None;
                }
                self.state = RxState::Complete;
                debug!("RTU frame complete: {} bytes", self.len);
                Some(&self.buffer[..self.len])
            }
            RxState::Idle => None,
        }
    }

    fn start_frame(&mut self, byte: u8, now_us: u64) {
        self.buffer[0] = byte;
        self.len = 1;
        self.last_byte_at_us = now_us;
        self.state = RxState::Receiving;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::PduBuilder;

    #[test]
    fn test_rtu_build_frame_fc03() {
        let pdu = PduBuilder::build_read_request(0x03, 0x0000, 10).unwrap();
        let frame = RtuFrame::new(0x01, pdu).unwrap();
        assert_eq!(
            frame.encode(),
            // CRC 0xCDC5 transmitted low byte first
            vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD]
        );
    }

    #[test]
    fn test_rtu_build_frame_spec_example() {
        let pdu = PduBuilder::build_read_request(0x03, 0x006B, 3).unwrap();
        let frame = RtuFrame::new(0x11, pdu).unwrap();
        assert_eq!(
            frame.encode(),
            vec![0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87]
        );
    }

    #[test]
    fn test_rtu_build_frame_buffer_small() {
        let pdu = PduBuilder::build_read_request(0x03, 0x0000, 10).unwrap();
        let frame = RtuFrame::new(0x01, pdu).unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(
            frame.encode_into(&mut buf),
            Err(ModbusError::BufferTooSmall {
                needed: 8,
                available: 4
            })
        ));

        let mut buf = [0u8; 64];
        let written = frame.encode_into(&mut buf).unwrap();
        assert_eq!(&buf[..written], frame.encode().as_slice());
    }

    #[test]
    fn test_rtu_build_frame_bad_address() {
        let pdu = PduBuilder::build_read_request(0x03, 0, 1).unwrap();
        assert!(RtuFrame::new(248, pdu).is_err());
    }

    #[test]
    fn test_rtu_parse_frame_fc03() {
        let frame = RtuFrame::parse(&[0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87]).unwrap();
        assert_eq!(frame.address, 0x11);
        assert_eq!(frame.pdu.function_code(), Some(0x03));
        assert_eq!(frame.pdu.as_slice(), &[0x03, 0x00, 0x6B, 0x00, 0x03]);
        assert_eq!(frame.crc, 0x8776);
    }

    #[test]
    fn test_rtu_parse_frame_invalid_crc() {
        let err = RtuFrame::parse(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, ModbusError::BadCrc { received: 0xFFFF, .. }));
    }

    #[test]
    fn test_rtu_parse_frame_too_short() {
        let err = RtuFrame::parse(&[0x01, 0x03, 0xFF]).unwrap_err();
        assert_eq!(
            err,
            ModbusError::FrameTooShort {
                length: 3,
                minimum: 4
            }
        );
    }

    #[test]
    fn test_rtu_parse_exception_frame() {
        let frame = RtuFrame::parse(&[0x11, 0x83, 0x02, 0xC1, 0x34]).unwrap();
        assert!(frame.pdu.is_exception());
        assert_eq!(frame.pdu.exception_code(), Some(0x02));
    }

    #[test]
    fn test_rtu_frame_round_trip() {
        let pdu = PduBuilder::build_write_multiple_registers(0x0001, &[0x000A, 0x0102]).unwrap();
        let sent = RtuFrame::new(0x11, pdu).unwrap();
        let received = RtuFrame::parse(&sent.encode()).unwrap();
        assert_eq!(received, sent);
    }

    #[test]
    fn test_rtu_interframe_delay_9600() {
        assert_eq!(interframe_delay_us(9600), 4010);
    }

    #[test]
    fn test_rtu_interchar_timeout_9600() {
        assert_eq!(interchar_timeout_us(9600), 1719);
    }

    #[test]
    fn test_rtu_interframe_delay_19200() {
        assert_eq!(interframe_delay_us(19200), 1750);
        assert_eq!(interchar_timeout_us(19200), 750);
    }

    #[test]
    fn test_rtu_interframe_delay_38400() {
        assert_eq!(interframe_delay_us(38400), 1750);
        assert_eq!(interchar_timeout_us(38400), 750);
    }

    #[test]
    fn test_rtu_interframe_delay_zero() {
        // Guard against division by zero; fall back to the fixed values
        assert_eq!(interframe_delay_us(0), 1750);
        assert_eq!(interchar_timeout_us(0), 750);
    }

    #[test]
    fn test_rtu_timing_low_baud() {
        // 1200 baud: 3.5 chars = 38_500_000 / 1200 = 32083.33 -> 32083
        assert_eq!(interframe_delay_us(1200), 32083);
        // 1.5 chars = 16_500_000 / 1200 = 13750
        assert_eq!(interchar_timeout_us(1200), 13750);
    }

    #[test]
    fn test_baud_timing_bundle() {
        let timing = BaudTiming::from_baud(9600);
        assert_eq!(timing.interframe_delay_us, 4010);
        assert_eq!(timing.interchar_timeout_us, 1719);
    }

    #[test]
    fn test_receiver_collects_frame() {
        let mut rx = RtuReceiver::new(9600);
        let frame = [0x01u8, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD];

        // One character time apart at 9600 baud is ~1146 us
        let mut now = 0u64;
        for &byte in &frame {
            rx.push_byte(byte, now).unwrap();
            now += 1146;
        }

        // Not yet complete right after the last byte
        assert!(rx.poll_complete(now).is_none());

        // After t3.5 of silence the frame is available and parses
        now += 4010;
        let received = rx.poll_complete(now).unwrap().to_vec();
        assert_eq!(received, frame);
        assert!(RtuFrame::parse(&received).is_ok());
    }

    #[test]
    fn test_receiver_interchar_timeout() {
        let mut rx = RtuReceiver::new(9600);
        rx.push_byte(0x01, 0).unwrap();
        rx.push_byte(0x03, 1000).unwrap();

        // Gap well beyond t1.5 (1719 us at 9600 baud)
        let err = rx.push_byte(0x00, 10_000).unwrap_err();
        assert_eq!(err, ModbusError::FrameError);

        // The late byte opened a fresh frame
        rx.push_byte(0x03, 10_500).unwrap();
        assert!(rx.poll_complete(10_600).is_none());
    }

    #[test]
    fn test_receiver_discards_runt_frame() {
        let mut rx = RtuReceiver::new(9600);
        rx.push_byte(0x01, 0).unwrap();
        rx.push_byte(0x03, 1000).unwrap();

        // Silence elapses with only 2 bytes buffered: noise, dropped
        assert!(rx.poll_complete(10_000).is_none());

        // Receiver is usable again
        let frame = [0x01u8, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD];
        let mut now = 20_000u64;
        for &byte in &frame {
            rx.push_byte(byte, now).unwrap();
            now += 1000;
        }
        assert!(rx.poll_complete(now + 4010).is_some());
    }

    #[test]
    fn test_receiver_restarts_after_complete() {
        let mut rx = RtuReceiver::new(19200);
        let frame = [0x01u8, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD];

        let mut now = 0u64;
        for &byte in &frame {
            rx.push_byte(byte, now).unwrap();
            now += 500;
        }
        assert!(rx.poll_complete(now + 1750).is_some());

        // Next byte begins a new frame
        rx.push_byte(0x02, now + 5000).unwrap();
        assert!(rx.poll_complete(now + 5001).is_none());
    }

    #[test]
    fn test_receiver_overrun() {
        let mut rx = RtuReceiver::new(19200);
        let mut now = 0u64;
        let mut result = Ok(());
        for _ in 0..300 {
            result = rx.push_byte(0x55, now);
            if result.is_err() {
                break;
            }
            now += 100;
        }
        assert_eq!(result, Err(ModbusError::FrameError));
    }
}
