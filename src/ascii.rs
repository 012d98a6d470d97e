//! Modbus ASCII framing
//!
//! ASCII frame layout:
//!
//! ```text
//! ':' hex(address) hex(function) hex(body...) hex(lrc) CR LF
//! ```
//!
//! Every binary byte travels as two upper-case hex digits, so a frame
//! carrying a full 253-byte PDU spans 513 characters. The LRC is computed
//! over the binary bytes (address + PDU) before hex encoding. Unlike RTU,
//! frames are delimited by the ':' and CR LF markers, not by timing.

use tracing::debug;

use crate::constants::{ASCII_MAX_FRAME_SIZE, ASCII_MIN_FRAME_SIZE, MAX_SLAVE_ADDRESS};
use crate::error::{ModbusError, ModbusResult};
use crate::lrc::{ascii_to_binary, binary_to_ascii, byte_to_ascii, lrc, lrc_verify};
use crate::pdu::ModbusPdu;

/// ASCII frame start delimiter.
const START: u8 = b':';
/// First terminator character.
const CR: u8 = b'\r';
/// Second terminator character.
const LF: u8 = b'\n';

// ============================================================================
// Frame Build and Parse
// ============================================================================

/// A parsed or to-be-sent ASCII frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiFrame {
    /// Slave address (0 = broadcast)
    pub address: u8,
    /// The transported PDU
    pub pdu: ModbusPdu,
    /// LRC over the binary address + PDU bytes
    pub lrc: u8,
}

impl AsciiFrame {
    /// Assemble a frame for transmission. The LRC is computed here, over
    /// the binary bytes that will be hex-encoded.
    pub fn new(address: u8, pdu: ModbusPdu) -> ModbusResult<Self> {
        if address > MAX_SLAVE_ADDRESS {
            return Err(ModbusError::invalid_argument(format!(
                "slave address {address} above {MAX_SLAVE_ADDRESS}"
            )));
        }
        if pdu.is_empty() {
            return Err(ModbusError::invalid_argument("cannot frame an empty PDU"));
        }

        let mut binary = Vec::with_capacity(1 + pdu.len());
        binary.push(address);
        binary.extend_from_slice(pdu.as_slice());
        let lrc = lrc(&binary);

        Ok(Self { address, pdu, lrc })
    }

    /// Total wire size of this frame:
    /// ':' + 2 * (address + PDU + LRC) + CR + LF.
    #[inline]
    pub fn wire_len(&self) -> usize {
        1 + 2 * (1 + self.pdu.len() + 1) + 2
    }

    /// Encode to an owned byte buffer of upper-case hex characters.
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.wire_len());
        frame.push(START);
        frame.extend_from_slice(&byte_to_ascii(self.address));
        frame.extend_from_slice(&binary_to_ascii(self.pdu.as_slice()));
        frame.extend_from_slice(&byte_to_ascii(self.lrc));
        frame.push(CR);
        frame.push(LF);

        debug!(
            "ASCII frame encoded: addr={}, FC=0x{:02X}, len={}",
            self.address,
            self.pdu.function_code().unwrap_or(0),
            frame.len()
        );
        frame
    }

    /// Encode into a caller-provided buffer, returning the bytes written.
    /// Semantically identical to [`AsciiFrame::encode`].
    pub fn encode_into(&self, buf: &mut [u8]) -> ModbusResult<usize> {
        let needed = self.wire_len();
        if buf.len() < needed {
            return Err(ModbusError::BufferTooSmall {
                needed,
                available: buf.len(),
            });
        }
        buf[..needed].copy_from_slice(&self.encode());
        Ok(needed)
    }

    /// Parse a complete frame.
    ///
    /// Checks, in order: minimum length ([`ModbusError::FrameTooShort`]),
    /// the ':' delimiter ([`ModbusError::NoStartDelimiter`]), the CR LF
    /// terminator ([`ModbusError::NoTerminator`]), hex decoding
    /// ([`ModbusError::OddHexLength`] / [`ModbusError::InvalidHex`]), the
    /// LRC ([`ModbusError::BadLrc`]), then the inner PDU
    /// ([`ModbusError::MalformedPdu`]).
    pub fn parse(frame: &[u8]) -> ModbusResult<Self> {
        if frame.len() < ASCII_MIN_FRAME_SIZE {
            return Err(ModbusError::FrameTooShort {
                length: frame.len(),
                minimum: ASCII_MIN_FRAME_SIZE,
            });
        }
        if frame[0] != START {
            return Err(ModbusError::NoStartDelimiter);
        }
        if frame[frame.len() - 2] != CR || frame[frame.len() - 1] != LF {
            return Err(ModbusError::NoTerminator);
        }

        // Hex payload between ':' and CR LF
        let binary = ascii_to_binary(&frame[1..frame.len() - 2])?;

        if !lrc_verify(&binary) {
            let split = binary.len() - 1;
            return Err(ModbusError::BadLrc {
                computed: lrc(&binary[..split]),
                received: binary[split],
            });
        }

        let address = binary[0];
        let received_lrc = binary[binary.len() - 1];
        let pdu = ModbusPdu::from_wire(&binary[1..binary.len() - 1])?;

        debug!(
            "ASCII frame parsed: addr={}, FC=0x{:02X}, len={}",
            address,
            pdu.function_code().unwrap_or(0),
            frame.len()
        );
        Ok(Self {
            address,
            pdu,
            lrc: received_lrc,
        })
    }
}

// ============================================================================
// Live-Stream Receiver
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Waiting for ':'
    Idle,
    /// Collecting characters
    Receiving,
    /// CR seen, expecting LF
    CrSeen,
    /// A complete frame is buffered
    Complete,
}

/// Frame delimiter for a live ASCII character stream.
///
/// ASCII frames carry explicit delimiters, so no timing is involved: ':'
/// opens (or reopens) a frame, CR LF closes it. Response timeouts belong
/// to the caller.
#[derive(Debug, Clone)]
pub struct AsciiReceiver {
    buffer: [u8; ASCII_MAX_FRAME_SIZE],
    len: usize,
    state: RxState,
}

impl Default for AsciiReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl AsciiReceiver {
    /// Create an idle receiver.
    pub fn new() -> Self {
        Self {
            buffer: [0; ASCII_MAX_FRAME_SIZE],
            len: 0,
            state: RxState::Idle,
        }
    }

    /// Discard any partial frame and return to idle.
    pub fn reset(&mut self) {
        self.state = RxState::Idle;
        self.len = 0;
    }

    /// Feed one received character.
    ///
    /// Characters outside a frame are ignored. A ':' anywhere restarts
    /// reception. Returns [`ModbusError::FrameError`] when a frame
    /// overruns the 513-character limit or a stray character follows CR;
    /// the receiver returns to idle in both cases.
    pub fn push_byte(&mut self, byte: u8) -> ModbusResult<()> {
        if byte == START {
            self.buffer[0] = START;
            self.len = 1;
            self.state = RxState::Receiving;
            return Ok(());
        }

        match self.state {
            // Inter-frame garbage is dropped silently
            RxState::Idle | RxState::Complete => Ok(()),

            RxState::Receiving => {
                if self.len >= ASCII_MAX_FRAME_SIZE {
                    self.reset();
                    return Err(ModbusError::FrameError);
                }
                self.buffer[self.len] = byte;
                self.len += 1;
                if byte == CR {
                    self.state = RxState::CrSeen;
                }
                Ok(())
            }

            RxState::CrSeen => {
                if byte != LF {
                    self.reset();
                    return Err(ModbusError::FrameError);
                }
                if self.len >= ASCII_MAX_FRAME_SIZE {
                    self.reset();
                    return Err(ModbusError::FrameError);
                }
                self.buffer[self.len] = LF;
                self.len += 1;
                self.state = RxState::Complete;
                debug!("ASCII frame complete: {} bytes", self.len);
                Ok(())
            }
        }
    }

    /// The completed frame, if one is buffered. It stays available until
    /// the next ':' restarts reception.
    pub fn complete_frame(&self) -> Option<&[u8]> {
        if self.state == RxState::Complete {
            Some(&self.buffer[..self.len])
        } else {
            None
        }
    }
}
