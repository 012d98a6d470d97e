//! # Modbus Wire - Modbus Frame and PDU Codecs
//!
//! Encoder/decoder primitives for the Modbus application protocol across
//! its three standard transport encodings:
//!
//! - **RTU**: binary serial framing with CRC-16 and baud-derived timing
//! - **ASCII**: hex-text serial framing with LRC and `: ... CR LF` delimiters
//! - **TCP**: MBAP-header framing with transaction ids
//!
//! The crate converts between structured PDU values and on-the-wire byte
//! sequences and verifies integrity. It performs no I/O: serial ports,
//! sockets and timers belong to the caller, as do data models and
//! master/slave state machines. Every function is synchronous, pure over
//! its inputs and safe to call from any thread.
//!
//! ## Supported Function Codes
//!
//! | Code | Function |
//! |------|----------|
//! | 0x01 | Read Coils |
//! | 0x02 | Read Discrete Inputs |
//! | 0x03 | Read Holding Registers |
//! | 0x04 | Read Input Registers |
//! | 0x05 | Write Single Coil |
//! | 0x06 | Write Single Register |
//! | 0x0F | Write Multiple Coils |
//! | 0x10 | Write Multiple Registers |
//!
//! Exception responses decode to a dedicated [`Pdu::Exception`] variant;
//! unrecognized function codes pass through as [`Pdu::Raw`].
//!
//! ## Quick Start
//!
//! ```rust
//! use modbus_wire::{ModbusFunction, Pdu, RtuFrame, TcpFrame};
//!
//! # fn main() -> modbus_wire::ModbusResult<()> {
//! // Read 3 holding registers starting at 0x006B
//! let request = Pdu::ReadRegistersRequest {
//!     function: ModbusFunction::ReadHoldingRegisters,
//!     start_address: 0x006B,
//!     quantity: 3,
//! };
//!
//! // Same PDU, two transports
//! let rtu = RtuFrame::new(0x11, request.encode()?)?.encode();
//! assert_eq!(rtu, [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87]);
//!
//! let tcp = TcpFrame::new(1, 0x11, request.encode()?)?.encode();
//! assert_eq!(&tcp[6..], &rtu[..6]);
//!
//! // And back
//! let frame = RtuFrame::parse(&rtu)?;
//! assert_eq!(Pdu::decode_request(frame.pdu.as_slice())?, request);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus protocol constants based on official specification
pub mod constants;

/// Modbus protocol definitions: function codes, exceptions, addressing
pub mod protocol;

/// Raw PDU buffer with stack-allocated fixed array
pub mod pdu;

/// Typed PDU codec: function-code-aware encode/decode
pub mod codec;

/// CRC-16 integrity codec (RTU)
pub mod crc;

/// LRC integrity codec and hex-ASCII conversion (ASCII)
pub mod lrc;

/// RTU framing, timing model and live-stream receiver
pub mod rtu;

/// ASCII framing and live-stream receiver
pub mod ascii;

/// TCP framing with MBAP header
pub mod tcp;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Error handling ===
pub use error::{ModbusError, ModbusResult};

// === Core types ===
pub use codec::Pdu;
pub use pdu::{ModbusPdu, PduBuilder};
pub use protocol::{address_match, AddressMatch, ModbusException, ModbusFunction, SlaveId};

// === Framing ===
pub use ascii::{AsciiFrame, AsciiReceiver};
pub use rtu::{interchar_timeout_us, interframe_delay_us, BaudTiming, RtuFrame, RtuReceiver};
pub use tcp::{next_transaction_id, MbapHeader, TcpFrame};

// === Integrity codecs ===
pub use crc::{crc16, crc16_verify};
pub use lrc::{lrc, lrc_verify};

// === Protocol limits (commonly needed constants) ===
pub use constants::{
    MAX_PDU_SIZE, MAX_READ_COILS, MAX_READ_REGISTERS, MAX_WRITE_COILS, MAX_WRITE_REGISTERS,
};

/// Modbus TCP default port
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
