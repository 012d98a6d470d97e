//! Modbus protocol constants based on official specification
//!
//! All limits derive from the 256-byte RS485 ADU inherited by every
//! transport: PDU = 256 - address (1) - CRC (2) = 253 bytes. The
//! per-function quantity limits are the largest counts whose request or
//! response body still fits in that PDU.

// ============================================================================
// PDU and Frame Size Constants
// ============================================================================

/// Maximum PDU (function code + body) size per Modbus specification.
pub const MAX_PDU_SIZE: usize = 253;

/// Minimum RTU frame: address (1) + function (1) + CRC (2).
pub const RTU_MIN_FRAME_SIZE: usize = 4;

/// Maximum RTU frame: address (1) + PDU (253) + CRC (2).
pub const RTU_MAX_FRAME_SIZE: usize = 256;

/// Minimum ASCII frame: ':' + addr (2) + function (2) + LRC (2) + CR + LF.
pub const ASCII_MIN_FRAME_SIZE: usize = 9;

/// Maximum ASCII frame: ':' + 2 * (addr + PDU + LRC) + CR + LF
/// = 1 + 2 * 255 + 2 = 513.
pub const ASCII_MAX_FRAME_SIZE: usize = 513;

/// MBAP header: transaction id (2) + protocol id (2) + length (2) + unit id (1).
pub const MBAP_HEADER_SIZE: usize = 7;

/// Minimum TCP frame: MBAP header + function code.
pub const TCP_MIN_FRAME_SIZE: usize = 8;

/// Maximum TCP frame: MBAP header + max PDU = 260.
pub const TCP_MAX_FRAME_SIZE: usize = MBAP_HEADER_SIZE + MAX_PDU_SIZE;

/// Maximum value of the MBAP length field: unit id (1) + max PDU (253).
pub const MBAP_MAX_LENGTH: usize = 1 + MAX_PDU_SIZE;

// ============================================================================
// Register and Coil Operation Limits
// ============================================================================

/// Maximum registers for FC03/FC04: (253 - 2) / 2 = 125.
pub const MAX_READ_REGISTERS: u16 = 125;

/// Maximum registers for FC16: (253 - 6) / 2 = 123.
pub const MAX_WRITE_REGISTERS: u16 = 123;

/// Maximum coils for FC01/FC02 (spec value, below the 2008 PDU-fit bound).
pub const MAX_READ_COILS: u16 = 2000;

/// Maximum coils for FC15 (spec value 0x7B0, below the 1976 PDU-fit bound).
pub const MAX_WRITE_COILS: u16 = 1968;

// ============================================================================
// Addressing and Coil Values
// ============================================================================

/// Broadcast address on serial lines; all slaves accept, none respond.
pub const BROADCAST_ADDRESS: u8 = 0;

/// Highest assignable slave address.
pub const MAX_SLAVE_ADDRESS: u8 = 247;

/// Wire value for an energized coil in FC05.
pub const COIL_ON: u16 = 0xFF00;

/// Wire value for a de-energized coil in FC05.
pub const COIL_OFF: u16 = 0x0000;

// ============================================================================
// RTU Timing
// ============================================================================

/// Bits per serial character: start + 8 data + parity + stop.
pub const BITS_PER_CHAR: u32 = 11;

/// Baud rate at and above which the fixed timing values apply.
pub const TIMING_FIXED_BAUD: u32 = 19_200;

/// Fixed inter-frame delay (3.5 char times) for baud rates >= 19200.
pub const INTERFRAME_DELAY_FIXED_US: u32 = 1_750;

/// Fixed inter-character timeout (1.5 char times) for baud rates >= 19200.
pub const INTERCHAR_TIMEOUT_FIXED_US: u32 = 750;
