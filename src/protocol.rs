//! Modbus protocol definitions
//!
//! Function codes, exception codes and serial-line addressing. These types
//! are shared by the PDU codec and all three framing adapters.
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
//! Codes with the 0x80 bit set are exception responses carrying the
//! original code in the low seven bits.

use std::fmt;

use crate::constants::BROADCAST_ADDRESS;
use crate::error::{ModbusError, ModbusResult};

/// Modbus slave/unit identifier.
pub type SlaveId = u8;

// ============================================================================
// Function Codes
// ============================================================================

/// Modbus function codes recognized by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModbusFunction {
    /// Read Coils (0x01)
    ReadCoils = 0x01,
    /// Read Discrete Inputs (0x02)
    ReadDiscreteInputs = 0x02,
    /// Read Holding Registers (0x03)
    ReadHoldingRegisters = 0x03,
    /// Read Input Registers (0x04)
    ReadInputRegisters = 0x04,
    /// Write Single Coil (0x05)
    WriteSingleCoil = 0x05,
    /// Write Single Register (0x06)
    WriteSingleRegister = 0x06,
    /// Write Multiple Coils (0x0F)
    WriteMultipleCoils = 0x0F,
    /// Write Multiple Registers (0x10)
    WriteMultipleRegisters = 0x10,
}

impl ModbusFunction {
    /// Convert from a wire byte. The 0x80 exception bit must already be
    /// stripped by the caller.
    pub fn from_u8(value: u8) -> ModbusResult<Self> {
        match value {
            0x01 => Ok(ModbusFunction::ReadCoils),
            0x02 => Ok(ModbusFunction::ReadDiscreteInputs),
            0x03 => Ok(ModbusFunction::ReadHoldingRegisters),
            0x04 => Ok(ModbusFunction::ReadInputRegisters),
            0x05 => Ok(ModbusFunction::WriteSingleCoil),
            0x06 => Ok(ModbusFunction::WriteSingleRegister),
            0x0F => Ok(ModbusFunction::WriteMultipleCoils),
            0x10 => Ok(ModbusFunction::WriteMultipleRegisters),
            _ => Err(ModbusError::malformed_pdu(format!(
                "unrecognized function code 0x{value:02X}"
            ))),
        }
    }

    /// Convert to the wire byte.
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Function byte of the matching exception response (0x80 bit set).
    #[inline]
    pub fn exception_function(self) -> u8 {
        self.to_u8() | 0x80
    }

    /// True for FC01-FC04.
    pub fn is_read(self) -> bool {
        matches!(
            self,
            ModbusFunction::ReadCoils
                | ModbusFunction::ReadDiscreteInputs
                | ModbusFunction::ReadHoldingRegisters
                | ModbusFunction::ReadInputRegisters
        )
    }

    /// True for FC05/06/0F/10.
    pub fn is_write(self) -> bool {
        !self.is_read()
    }

    /// True for the bit-oriented codes (coils and discrete inputs).
    pub fn is_bit_access(self) -> bool {
        matches!(
            self,
            ModbusFunction::ReadCoils
                | ModbusFunction::ReadDiscreteInputs
                | ModbusFunction::WriteSingleCoil
                | ModbusFunction::WriteMultipleCoils
        )
    }
}

impl fmt::Display for ModbusFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModbusFunction::ReadCoils => "Read Coils",
            ModbusFunction::ReadDiscreteInputs => "Read Discrete Inputs",
            ModbusFunction::ReadHoldingRegisters => "Read Holding Registers",
            ModbusFunction::ReadInputRegisters => "Read Input Registers",
            ModbusFunction::WriteSingleCoil => "Write Single Coil",
            ModbusFunction::WriteSingleRegister => "Write Single Register",
            ModbusFunction::WriteMultipleCoils => "Write Multiple Coils",
            ModbusFunction::WriteMultipleRegisters => "Write Multiple Registers",
        };
        write!(f, "{} (0x{:02X})", name, *self as u8)
    }
}

// ============================================================================
// Exception Codes
// ============================================================================

/// Modbus exception codes carried by exception responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModbusException {
    /// Function code not supported by the server (0x01)
    IllegalFunction = 0x01,
    /// Data address not allowable for the server (0x02)
    IllegalDataAddress = 0x02,
    /// Value in the data field not allowable (0x03)
    IllegalDataValue = 0x03,
    /// Unrecoverable error while performing the action (0x04)
    ServerDeviceFailure = 0x04,
    /// Request accepted, long-running processing started (0x05)
    Acknowledge = 0x05,
    /// Server busy with a long-duration command (0x06)
    ServerDeviceBusy = 0x06,
    /// Parity error reading record file memory (0x08)
    MemoryParityError = 0x08,
    /// Gateway could not allocate an internal path (0x0A)
    GatewayPathUnavailable = 0x0A,
    /// No response from the gateway target device (0x0B)
    GatewayTargetFailedToRespond = 0x0B,
}

impl ModbusException {
    /// Convert from the wire byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(ModbusException::IllegalFunction),
            0x02 => Some(ModbusException::IllegalDataAddress),
            0x03 => Some(ModbusException::IllegalDataValue),
            0x04 => Some(ModbusException::ServerDeviceFailure),
            0x05 => Some(ModbusException::Acknowledge),
            0x06 => Some(ModbusException::ServerDeviceBusy),
            0x08 => Some(ModbusException::MemoryParityError),
            0x0A => Some(ModbusException::GatewayPathUnavailable),
            0x0B => Some(ModbusException::GatewayTargetFailedToRespond),
            _ => None,
        }
    }

    /// Convert to the wire byte.
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Human-readable description from the Modbus application protocol
    /// specification.
    pub fn description(self) -> &'static str {
        match self {
            ModbusException::IllegalFunction => "function code not allowable for the server",
            ModbusException::IllegalDataAddress => "data address not allowable for the server",
            ModbusException::IllegalDataValue => "value in the query data field not allowable",
            ModbusException::ServerDeviceFailure => {
                "unrecoverable error while performing the requested action"
            }
            ModbusException::Acknowledge => "request accepted, processing will take time",
            ModbusException::ServerDeviceBusy => "server busy with a long-duration command",
            ModbusException::MemoryParityError => "parity error reading record file memory",
            ModbusException::GatewayPathUnavailable => {
                "gateway could not allocate an internal communication path"
            }
            ModbusException::GatewayTargetFailedToRespond => {
                "no response obtained from the gateway target device"
            }
        }
    }
}

impl fmt::Display for ModbusException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exception 0x{:02X}: {}", self.to_u8(), self.description())
    }
}

// ============================================================================
// Serial-Line Addressing
// ============================================================================

/// Outcome of matching a received frame address against a slave's own.
///
/// Broadcast frames (address 0) are accepted by every slave but must not
/// be answered; that policy belongs to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMatch {
    /// Frame is addressed to this slave.
    Match,
    /// Frame is a broadcast (address 0).
    Broadcast,
    /// Frame is addressed to some other slave.
    Mismatch,
}

/// Match a received RTU/ASCII frame address against the local address.
pub fn address_match(frame_address: u8, own_address: u8) -> AddressMatch {
    if frame_address == BROADCAST_ADDRESS {
        AddressMatch::Broadcast
    } else if frame_address == own_address {
        AddressMatch::Match
    } else {
        AddressMatch::Mismatch
    }
}

/// True if the address is the serial broadcast address.
#[inline]
pub fn is_broadcast(address: u8) -> bool {
    address == BROADCAST_ADDRESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_conversion() {
        assert_eq!(
            ModbusFunction::from_u8(0x03).unwrap(),
            ModbusFunction::ReadHoldingRegisters
        );
        assert_eq!(ModbusFunction::ReadHoldingRegisters.to_u8(), 0x03);
        assert_eq!(
            ModbusFunction::ReadHoldingRegisters.exception_function(),
            0x83
        );

        assert!(ModbusFunction::from_u8(0x07).is_err());
        assert!(ModbusFunction::from_u8(0xFF).is_err());
    }

    #[test]
    fn test_function_classification() {
        assert!(ModbusFunction::ReadCoils.is_read());
        assert!(ModbusFunction::ReadCoils.is_bit_access());
        assert!(ModbusFunction::WriteMultipleRegisters.is_write());
        assert!(!ModbusFunction::ReadInputRegisters.is_bit_access());
    }

    #[test]
    fn test_exception_conversion() {
        assert_eq!(
            ModbusException::from_u8(0x02).unwrap(),
            ModbusException::IllegalDataAddress
        );
        assert_eq!(ModbusException::IllegalDataAddress.to_u8(), 0x02);
        // 0x07 and 0x09 are gaps in the code space
        assert!(ModbusException::from_u8(0x07).is_none());
        assert!(ModbusException::from_u8(0x09).is_none());
    }

    #[test]
    fn test_address_match_direct() {
        assert_eq!(address_match(17, 17), AddressMatch::Match);
    }

    #[test]
    fn test_address_match_broadcast() {
        assert_eq!(address_match(0, 17), AddressMatch::Broadcast);
    }

    #[test]
    fn test_address_mismatch() {
        assert_eq!(address_match(5, 17), AddressMatch::Mismatch);
    }

    #[test]
    fn test_is_broadcast() {
        assert!(is_broadcast(0x00));
        assert!(!is_broadcast(0x01));
        assert!(!is_broadcast(0xFF));
    }
}
