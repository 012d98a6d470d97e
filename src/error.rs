//! Core error types and result handling
//!
//! Every fallible operation in this crate returns [`ModbusResult`]. The
//! error kinds map one-to-one onto the failure modes of the wire formats:
//! caller mistakes (`InvalidArgument`, `BufferTooSmall`), integrity
//! failures (`BadCrc`, `BadLrc`), structural frame errors per transport,
//! and PDU-level rejections (`MalformedPdu`).
//!
//! A Modbus *exception response* is not an error: it is a well-formed PDU
//! that the decoder returns as [`Pdu::Exception`](crate::codec::Pdu).
//! Errors are always returned to the caller; the library never panics on
//! wire input, never retries and never logs above `debug`.

use thiserror::Error;

/// Result type used throughout the crate.
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Errors produced by the PDU codec, the integrity codecs and the three
/// framing adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModbusError {
    /// Caller-supplied value violates a protocol invariant
    /// (quantity out of range, inconsistent byte count, ...).
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument
        message: String,
    },

    /// Caller-provided output buffer cannot hold the produced frame.
    #[error("output buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes the encoded frame requires
        needed: usize,
        /// Bytes the caller provided
        available: usize,
    },

    /// Inbound byte slice is shorter than the minimum valid frame.
    #[error("frame too short: {length} bytes (minimum {minimum})")]
    FrameTooShort {
        /// Length of the rejected input
        length: usize,
        /// Minimum frame length for the transport
        minimum: usize,
    },

    /// CRC-16 check failed on an RTU frame.
    #[error("CRC mismatch: computed {computed:#06X}, received {received:#06X}")]
    BadCrc {
        /// CRC computed over the frame body
        computed: u16,
        /// CRC carried by the frame
        received: u16,
    },

    /// LRC check failed on an ASCII frame.
    #[error("LRC mismatch: computed {computed:#04X}, received {received:#04X}")]
    BadLrc {
        /// LRC computed over the decoded bytes
        computed: u8,
        /// LRC carried by the frame
        received: u8,
    },

    /// ASCII frame does not begin with the ':' start delimiter.
    #[error("ASCII frame missing ':' start delimiter")]
    NoStartDelimiter,

    /// ASCII frame does not end with CR LF.
    #[error("ASCII frame missing CR LF terminator")]
    NoTerminator,

    /// A character outside `[0-9A-Fa-f]` where a hex digit was required.
    #[error("invalid hex digit {digit:#04X}")]
    InvalidHex {
        /// The offending input byte
        digit: u8,
    },

    /// ASCII hex payload has odd length and cannot form whole bytes.
    #[error("hex payload has odd length {length}")]
    OddHexLength {
        /// Length of the rejected hex payload
        length: usize,
    },

    /// MBAP protocol identifier is not zero.
    #[error("MBAP protocol id {protocol_id:#06X}, expected 0x0000")]
    WrongProtocol {
        /// Protocol identifier found in the header
        protocol_id: u16,
    },

    /// MBAP length field disagrees with the actual frame length.
    #[error("MBAP length mismatch: declared {declared}, actual frame holds {actual}")]
    LengthMismatch {
        /// Value of the MBAP length field
        declared: usize,
        /// Length implied by the received frame
        actual: usize,
    },

    /// Inner PDU failed to parse (unknown layout, inconsistent byte
    /// count, bad exception body, ...).
    #[error("malformed PDU: {message}")]
    MalformedPdu {
        /// What the PDU parser rejected
        message: String,
    },

    /// Live-stream framing violation while receiving an RTU frame:
    /// inter-character gap exceeded, or frame overran the 256-byte limit.
    #[error("framing error on live byte stream")]
    FrameError,
}

impl ModbusError {
    /// Create an [`ModbusError::InvalidArgument`] error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        ModbusError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a [`ModbusError::MalformedPdu`] error.
    pub fn malformed_pdu<S: Into<String>>(message: S) -> Self {
        ModbusError::MalformedPdu {
            message: message.into(),
        }
    }
}
