//! Raw Modbus PDU data structure
//!
//! Uses a fixed-size stack array to avoid heap allocation. The framing
//! adapters treat this type as an opaque byte sequence plus a function
//! code; the typed view lives in [`crate::codec`].

use tracing::debug;

use crate::constants::{
    COIL_OFF, COIL_ON, MAX_PDU_SIZE, MAX_READ_COILS, MAX_READ_REGISTERS, MAX_WRITE_COILS,
    MAX_WRITE_REGISTERS,
};
use crate::error::{ModbusError, ModbusResult};

/// Protocol Data Unit: function code followed by up to 252 body bytes,
/// held in a stack-allocated buffer.
#[derive(Clone)]
pub struct ModbusPdu {
    /// Fixed-size buffer (stack)
    data: [u8; MAX_PDU_SIZE],
    /// Actual data length
    len: usize,
}

impl ModbusPdu {
    /// Create an empty PDU.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; MAX_PDU_SIZE],
            len: 0,
        }
    }

    /// Create a PDU from a byte slice without wire validation.
    #[inline]
    pub fn from_slice(data: &[u8]) -> ModbusResult<Self> {
        if data.len() > MAX_PDU_SIZE {
            return Err(ModbusError::malformed_pdu(format!(
                "PDU too large: {} bytes (max {})",
                data.len(),
                MAX_PDU_SIZE
            )));
        }

        let mut pdu = Self::new();
        pdu.data[..data.len()].copy_from_slice(data);
        pdu.len = data.len();
        Ok(pdu)
    }

    /// Create a PDU from bytes received off the wire.
    ///
    /// On top of the size bound this enforces the structural rules every
    /// transport shares: a PDU carries at least a function code, and an
    /// exception response is exactly function + exception code.
    pub fn from_wire(data: &[u8]) -> ModbusResult<Self> {
        if data.is_empty() {
            return Err(ModbusError::malformed_pdu("empty PDU"));
        }
        if data[0] & 0x80 != 0 && data.len() != 2 {
            return Err(ModbusError::malformed_pdu(format!(
                "exception response with {} body bytes, expected 1",
                data.len() - 1
            )));
        }

        let pdu = Self::from_slice(data)?;
        debug!(
            "PDU from wire: FC=0x{:02X} ({}), len={}",
            data[0],
            Self::function_code_description(data[0]),
            data.len()
        );
        Ok(pdu)
    }

    /// Push a single byte.
    #[inline]
    pub fn push(&mut self, byte: u8) -> ModbusResult<()> {
        if self.len >= MAX_PDU_SIZE {
            return Err(ModbusError::malformed_pdu("PDU buffer full"));
        }
        self.data[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    /// Push u16 in big-endian.
    #[inline]
    pub fn push_u16(&mut self, value: u16) -> ModbusResult<()> {
        self.push((value >> 8) as u8)?;
        self.push((value & 0xFF) as u8)?;
        Ok(())
    }

    /// Extend with a byte slice.
    #[inline]
    pub fn extend(&mut self, data: &[u8]) -> ModbusResult<()> {
        if self.len + data.len() > MAX_PDU_SIZE {
            return Err(ModbusError::malformed_pdu(format!(
                "PDU would exceed max size: {} + {} > {}",
                self.len,
                data.len(),
                MAX_PDU_SIZE
            )));
        }
        self.data[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        Ok(())
    }

    /// Get immutable data slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Get current length.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get function code (first byte).
    #[inline]
    pub fn function_code(&self) -> Option<u8> {
        if self.len > 0 {
            Some(self.data[0])
        } else {
            None
        }
    }

    /// Check if exception response.
    #[inline]
    pub fn is_exception(&self) -> bool {
        self.function_code()
            .map(|fc| fc & 0x80 != 0)
            .unwrap_or(false)
    }

    /// Get exception code of an exception response.
    #[inline]
    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() && self.len > 1 {
            Some(self.data[1])
        } else {
            None
        }
    }

    /// Get human-readable function code description.
    pub fn function_code_description(fc: u8) -> &'static str {
        match fc & 0x7F {
            0x01 => "Read Coils",
            0x02 => "Read Discrete Inputs",
            0x03 => "Read Holding Registers",
            0x04 => "Read Input Registers",
            0x05 => "Write Single Coil",
            0x06 => "Write Single Register",
            0x0F => "Write Multiple Coils",
            0x10 => "Write Multiple Registers",
            _ => "Unknown Function",
        }
    }
}

impl Default for ModbusPdu {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ModbusPdu {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ModbusPdu {}

impl std::fmt::Debug for ModbusPdu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModbusPdu")
            .field("data", &self.as_slice())
            .finish()
    }
}

impl AsRef<[u8]> for ModbusPdu {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// PDU builder - fluent API plus shortcut constructors for the standard
/// request and response shapes.
pub struct PduBuilder {
    pdu: ModbusPdu,
}

impl Default for PduBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PduBuilder {
    /// Create a new builder.
    #[inline]
    pub fn new() -> Self {
        Self {
            pdu: ModbusPdu::new(),
        }
    }

    /// Set function code.
    #[inline]
    pub fn function_code(mut self, fc: u8) -> ModbusResult<Self> {
        self.pdu.push(fc)?;
        Ok(self)
    }

    /// Add a big-endian address.
    #[inline]
    pub fn address(mut self, addr: u16) -> ModbusResult<Self> {
        self.pdu.push_u16(addr)?;
        Ok(self)
    }

    /// Add a big-endian quantity.
    #[inline]
    pub fn quantity(mut self, qty: u16) -> ModbusResult<Self> {
        self.pdu.push_u16(qty)?;
        Ok(self)
    }

    /// Add a byte.
    #[inline]
    pub fn byte(mut self, b: u8) -> ModbusResult<Self> {
        self.pdu.push(b)?;
        Ok(self)
    }

    /// Add data.
    #[inline]
    pub fn data(mut self, data: &[u8]) -> ModbusResult<Self> {
        self.pdu.extend(data)?;
        Ok(self)
    }

    /// Build the PDU.
    #[inline]
    pub fn build(self) -> ModbusPdu {
        if let Some(fc) = self.pdu.function_code() {
            debug!(
                "PDU built: FC=0x{:02X} ({}), total_len={}",
                fc,
                ModbusPdu::function_code_description(fc),
                self.pdu.len()
            );
        }
        self.pdu
    }

    /// Build a read request PDU for FC01-04.
    ///
    /// # Arguments
    /// * `fc` - Function code (1, 2, 3, or 4)
    /// * `start_address` - Starting address for the read operation
    /// * `quantity` - Number of coils (FC01/02) or registers (FC03/04)
    pub fn build_read_request(fc: u8, start_address: u16, quantity: u16) -> ModbusResult<ModbusPdu> {
        let limit = match fc {
            0x01 | 0x02 => MAX_READ_COILS,
            0x03 | 0x04 => MAX_READ_REGISTERS,
            _ => {
                return Err(ModbusError::invalid_argument(format!(
                    "0x{fc:02X} is not a read function code"
                )))
            }
        };
        if quantity == 0 || quantity > limit {
            return Err(ModbusError::invalid_argument(format!(
                "read quantity {quantity} outside 1..={limit}"
            )));
        }
        Ok(PduBuilder::new()
            .function_code(fc)?
            .address(start_address)?
            .quantity(quantity)?
            .build())
    }

    /// Build a write single coil PDU (FC05).
    pub fn build_write_single_coil(address: u16, value: bool) -> ModbusResult<ModbusPdu> {
        let coil_value: u16 = if value { COIL_ON } else { COIL_OFF };
        Ok(PduBuilder::new()
            .function_code(0x05)?
            .address(address)?
            .quantity(coil_value)?
            .build())
    }

    /// Build a write single register PDU (FC06).
    pub fn build_write_single_register(address: u16, value: u16) -> ModbusResult<ModbusPdu> {
        Ok(PduBuilder::new()
            .function_code(0x06)?
            .address(address)?
            .quantity(value)?
            .build())
    }

    /// Build a write multiple coils PDU (FC15) from unpacked values.
    pub fn build_write_multiple_coils(address: u16, values: &[bool]) -> ModbusResult<ModbusPdu> {
        if values.is_empty() || values.len() > MAX_WRITE_COILS as usize {
            return Err(ModbusError::invalid_argument(format!(
                "coil count {} outside 1..={}",
                values.len(),
                MAX_WRITE_COILS
            )));
        }

        let byte_count = values.len().div_ceil(8);
        let mut coil_bytes = vec![0u8; byte_count];
        for (i, &value) in values.iter().enumerate() {
            if value {
                coil_bytes[i / 8] |= 1 << (i % 8);
            }
        }

        Ok(PduBuilder::new()
            .function_code(0x0F)?
            .address(address)?
            .quantity(values.len() as u16)?
            .byte(byte_count as u8)?
            .data(&coil_bytes)?
            .build())
    }

    /// Build a write multiple registers PDU (FC16).
    pub fn build_write_multiple_registers(address: u16, values: &[u16]) -> ModbusResult<ModbusPdu> {
        if values.is_empty() || values.len() > MAX_WRITE_REGISTERS as usize {
            return Err(ModbusError::invalid_argument(format!(
                "register count {} outside 1..={}",
                values.len(),
                MAX_WRITE_REGISTERS
            )));
        }

        let mut builder = PduBuilder::new()
            .function_code(0x10)?
            .address(address)?
            .quantity(values.len() as u16)?
            .byte((values.len() * 2) as u8)?;

        for &value in values {
            builder = builder.byte((value >> 8) as u8)?.byte((value & 0xFF) as u8)?;
        }

        Ok(builder.build())
    }

    /// Build an exception response PDU: `[function | 0x80, code]`.
    pub fn build_exception(function: u8, exception_code: u8) -> ModbusResult<ModbusPdu> {
        Ok(PduBuilder::new()
            .function_code(function | 0x80)?
            .byte(exception_code)?
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdu_basic_operations() {
        let mut pdu = ModbusPdu::new();
        assert_eq!(pdu.len(), 0);
        assert!(pdu.is_empty());

        pdu.push(0x03).unwrap();
        assert_eq!(pdu.function_code(), Some(0x03));
        assert!(!pdu.is_exception());

        pdu.push_u16(0x0100).unwrap();
        pdu.push_u16(0x000A).unwrap();

        assert_eq!(pdu.len(), 5);
        assert_eq!(pdu.as_slice(), &[0x03, 0x01, 0x00, 0x00, 0x0A]);
    }

    #[test]
    fn test_pdu_from_wire_empty() {
        assert!(matches!(
            ModbusPdu::from_wire(&[]),
            Err(ModbusError::MalformedPdu { .. })
        ));
    }

    #[test]
    fn test_pdu_from_wire_exception_length() {
        // Valid exception: exactly function + code
        let pdu = ModbusPdu::from_wire(&[0x83, 0x02]).unwrap();
        assert!(pdu.is_exception());
        assert_eq!(pdu.exception_code(), Some(0x02));

        // Exception with trailing garbage is rejected
        assert!(ModbusPdu::from_wire(&[0x83, 0x02, 0x00]).is_err());
        // Exception with no code is rejected
        assert!(ModbusPdu::from_wire(&[0x83]).is_err());
    }

    #[test]
    fn test_pdu_too_large() {
        let data = [0u8; MAX_PDU_SIZE + 1];
        assert!(ModbusPdu::from_slice(&data).is_err());
    }

    #[test]
    fn test_pdu_builder() {
        let pdu = PduBuilder::new()
            .function_code(0x03)
            .unwrap()
            .address(0x0100)
            .unwrap()
            .quantity(0x000A)
            .unwrap()
            .build();

        assert_eq!(pdu.len(), 5);
        assert_eq!(pdu.as_slice(), &[0x03, 0x01, 0x00, 0x00, 0x0A]);
    }

    #[test]
    fn test_build_read_request() {
        let pdu = PduBuilder::build_read_request(0x03, 0x006B, 3).unwrap();

        assert_eq!(pdu.function_code(), Some(0x03));
        assert_eq!(pdu.as_slice(), &[0x03, 0x00, 0x6B, 0x00, 0x03]);
    }

    #[test]
    fn test_build_read_request_rejects_bad_quantity() {
        assert!(PduBuilder::build_read_request(0x03, 0, 0).is_err());
        assert!(PduBuilder::build_read_request(0x03, 0, 126).is_err());
        assert!(PduBuilder::build_read_request(0x01, 0, 2001).is_err());
        assert!(PduBuilder::build_read_request(0x05, 0, 1).is_err());
    }

    #[test]
    fn test_build_write_single_coil() {
        let pdu = PduBuilder::build_write_single_coil(0x00AC, true).unwrap();
        assert_eq!(pdu.as_slice(), &[0x05, 0x00, 0xAC, 0xFF, 0x00]);

        let pdu = PduBuilder::build_write_single_coil(0x00AC, false).unwrap();
        assert_eq!(pdu.as_slice(), &[0x05, 0x00, 0xAC, 0x00, 0x00]);
    }

    #[test]
    fn test_build_write_single_register() {
        let pdu = PduBuilder::build_write_single_register(0x0001, 0x0003).unwrap();

        assert_eq!(pdu.function_code(), Some(0x06));
        assert_eq!(pdu.as_slice(), &[0x06, 0x00, 0x01, 0x00, 0x03]);
    }

    #[test]
    fn test_build_write_multiple_coils() {
        let pdu = PduBuilder::build_write_multiple_coils(0x0100, &[true, false, true]).unwrap();
        // [FC, AddrH, AddrL, QtyH, QtyL, ByteCount, Data...]
        assert_eq!(
            pdu.as_slice(),
            &[0x0F, 0x01, 0x00, 0x00, 0x03, 0x01, 0b0000_0101]
        );
    }

    #[test]
    fn test_build_write_multiple_registers() {
        let pdu = PduBuilder::build_write_multiple_registers(0x0001, &[0x000A, 0x0102]).unwrap();

        assert_eq!(
            pdu.as_slice(),
            &[0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]
        );
    }

    #[test]
    fn test_build_exception() {
        let pdu = PduBuilder::build_exception(0x03, 0x02).unwrap();

        assert!(pdu.is_exception());
        assert_eq!(pdu.as_slice(), &[0x83, 0x02]);
    }
}
