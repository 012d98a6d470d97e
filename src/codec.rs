//! Typed Modbus PDU codec
//!
//! Function-code-aware serialization and deserialization of request and
//! response bodies. [`Pdu`] is a tagged sum with one constructor per
//! function and direction; [`Pdu::encode`] produces the raw
//! `[function][body...]` form and the two decoders rebuild the typed
//! value from wire bytes.
//!
//! Request and response bodies of the same function code are not
//! distinguishable by inspection alone (an FC01 request and an FC01
//! response can be byte-identical), so decoding is split into
//! [`Pdu::decode_request`] and [`Pdu::decode_response`]; the caller knows
//! which direction it is handling. Exception responses decode through
//! either entry point.
//!
//! All multi-byte integers are big-endian on the wire. Bit data is packed
//! LSB-first: bit N lives in bit `N % 8` of byte `N / 8`.

use tracing::debug;

use crate::constants::{
    COIL_OFF, COIL_ON, MAX_READ_COILS, MAX_READ_REGISTERS, MAX_WRITE_COILS, MAX_WRITE_REGISTERS,
};
use crate::error::{ModbusError, ModbusResult};
use crate::pdu::ModbusPdu;
use crate::protocol::{ModbusException, ModbusFunction};

/// A decoded Protocol Data Unit.
///
/// One constructor per function code and direction. `ReadBits*` covers
/// FC01/02 and `ReadRegisters*` covers FC03/04, with the `function` field
/// recording which of the pair was on the wire. FC05/06 share a single
/// constructor for request and response because the response echoes the
/// request verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pdu {
    /// FC01/FC02 request: read `quantity` coils or discrete inputs.
    ReadBitsRequest {
        /// [`ModbusFunction::ReadCoils`] or [`ModbusFunction::ReadDiscreteInputs`]
        function: ModbusFunction,
        /// First coil/input address
        start_address: u16,
        /// Number of bits to read (1..=2000)
        quantity: u16,
    },

    /// FC01/FC02 response: packed bit data, LSB-first per byte.
    ReadBitsResponse {
        /// [`ModbusFunction::ReadCoils`] or [`ModbusFunction::ReadDiscreteInputs`]
        function: ModbusFunction,
        /// Packed bits; the wire byte count is `data.len()`
        data: Vec<u8>,
    },

    /// FC03/FC04 request: read `quantity` registers.
    ReadRegistersRequest {
        /// [`ModbusFunction::ReadHoldingRegisters`] or [`ModbusFunction::ReadInputRegisters`]
        function: ModbusFunction,
        /// First register address
        start_address: u16,
        /// Number of registers to read (1..=125)
        quantity: u16,
    },

    /// FC03/FC04 response: register values.
    ReadRegistersResponse {
        /// [`ModbusFunction::ReadHoldingRegisters`] or [`ModbusFunction::ReadInputRegisters`]
        function: ModbusFunction,
        /// Register values; the wire byte count is `2 * values.len()`
        values: Vec<u16>,
    },

    /// FC05 request or echo response. The wire value is 0xFF00 for `true`
    /// and 0x0000 for `false`; other values are unrepresentable here and
    /// rejected by the decoders.
    WriteSingleCoil {
        /// Coil address
        address: u16,
        /// Coil state
        value: bool,
    },

    /// FC06 request or echo response.
    WriteSingleRegister {
        /// Register address
        address: u16,
        /// Register value
        value: u16,
    },

    /// FC0F request: write `quantity` coils from packed bit data.
    WriteMultipleCoilsRequest {
        /// First coil address
        start_address: u16,
        /// Number of coils to write (1..=1968)
        quantity: u16,
        /// Packed bits; must hold exactly `(quantity + 7) / 8` bytes
        data: Vec<u8>,
    },

    /// FC10 request: write consecutive registers.
    WriteMultipleRegistersRequest {
        /// First register address
        start_address: u16,
        /// Register values (1..=123)
        values: Vec<u16>,
    },

    /// FC0F/FC10 response: start address and quantity echo.
    WriteMultipleResponse {
        /// [`ModbusFunction::WriteMultipleCoils`] or [`ModbusFunction::WriteMultipleRegisters`]
        function: ModbusFunction,
        /// Echoed start address
        start_address: u16,
        /// Echoed quantity
        quantity: u16,
    },

    /// Exception response: `[function | 0x80, code]`.
    Exception {
        /// The function the server was asked to perform
        function: ModbusFunction,
        /// Why it refused
        exception: ModbusException,
    },

    /// PDU with a function code this codec does not model. Preserved
    /// verbatim; round-tripping is guaranteed only for recognized codes.
    Raw {
        /// Function byte as received
        function: u8,
        /// Body bytes as received
        data: Vec<u8>,
    },
}

impl Pdu {
    // ========================================================================
    // Encoding
    // ========================================================================

    /// Serialize to the raw `[function][body...]` form.
    ///
    /// Returns [`ModbusError::InvalidArgument`] when a quantity or byte
    /// count violates its per-function limit.
    pub fn encode(&self) -> ModbusResult<ModbusPdu> {
        let mut out = ModbusPdu::new();

        match self {
            Pdu::ReadBitsRequest {
                function,
                start_address,
                quantity,
            } => {
                require_function(*function, is_bit_read, "bit read")?;
                check_quantity(*quantity, MAX_READ_COILS, "read bits")?;
                out.push(function.to_u8())?;
                out.push_u16(*start_address)?;
                out.push_u16(*quantity)?;
            }

            Pdu::ReadRegistersRequest {
                function,
                start_address,
                quantity,
            } => {
                require_function(*function, is_register_read, "register read")?;
                check_quantity(*quantity, MAX_READ_REGISTERS, "read registers")?;
                out.push(function.to_u8())?;
                out.push_u16(*start_address)?;
                out.push_u16(*quantity)?;
            }

            Pdu::ReadBitsResponse { function, data } => {
                require_function(*function, is_bit_read, "bit read")?;
                let max_bytes = (MAX_READ_COILS as usize).div_ceil(8);
                if data.is_empty() || data.len() > max_bytes {
                    return Err(ModbusError::invalid_argument(format!(
                        "bit response byte count {} outside 1..={max_bytes}",
                        data.len()
                    )));
                }
                out.push(function.to_u8())?;
                out.push(data.len() as u8)?;
                out.extend(data)?;
            }

            Pdu::ReadRegistersResponse { function, values } => {
                require_function(*function, is_register_read, "register read")?;
                check_count(values.len(), MAX_READ_REGISTERS, "register response")?;
                out.push(function.to_u8())?;
                out.push((values.len() * 2) as u8)?;
                for &value in values {
                    out.push_u16(value)?;
                }
            }

            Pdu::WriteSingleCoil { address, value } => {
                out.push(ModbusFunction::WriteSingleCoil.to_u8())?;
                out.push_u16(*address)?;
                out.push_u16(if *value { COIL_ON } else { COIL_OFF })?;
            }

            Pdu::WriteSingleRegister { address, value } => {
                out.push(ModbusFunction::WriteSingleRegister.to_u8())?;
                out.push_u16(*address)?;
                out.push_u16(*value)?;
            }

            Pdu::WriteMultipleCoilsRequest {
                start_address,
                quantity,
                data,
            } => {
                check_quantity(*quantity, MAX_WRITE_COILS, "write coils")?;
                let expected = (*quantity as usize).div_ceil(8);
                if data.len() != expected {
                    return Err(ModbusError::invalid_argument(format!(
                        "{} coil data bytes do not match quantity {quantity} (need {expected})",
                        data.len()
                    )));
                }
                out.push(ModbusFunction::WriteMultipleCoils.to_u8())?;
                out.push_u16(*start_address)?;
                out.push_u16(*quantity)?;
                out.push(data.len() as u8)?;
                out.extend(data)?;
            }

            Pdu::WriteMultipleRegistersRequest {
                start_address,
                values,
            } => {
                check_count(values.len(), MAX_WRITE_REGISTERS, "write registers")?;
                out.push(ModbusFunction::WriteMultipleRegisters.to_u8())?;
                out.push_u16(*start_address)?;
                out.push_u16(values.len() as u16)?;
                out.push((values.len() * 2) as u8)?;
                for &value in values {
                    out.push_u16(value)?;
                }
            }

            Pdu::WriteMultipleResponse {
                function,
                start_address,
                quantity,
            } => {
                require_function(
                    *function,
                    |f| {
                        matches!(
                            f,
                            ModbusFunction::WriteMultipleCoils
                                | ModbusFunction::WriteMultipleRegisters
                        )
                    },
                    "write multiple",
                )?;
                out.push(function.to_u8())?;
                out.push_u16(*start_address)?;
                out.push_u16(*quantity)?;
            }

            Pdu::Exception {
                function,
                exception,
            } => {
                out.push(function.exception_function())?;
                out.push(exception.to_u8())?;
            }

            Pdu::Raw { function, data } => {
                out.push(*function)?;
                out.extend(data)?;
            }
        }

        debug!(
            "PDU encoded: FC=0x{:02X}, len={}",
            out.function_code().unwrap_or(0),
            out.len()
        );
        Ok(out)
    }

    /// Serialize into a caller-provided buffer, returning the bytes
    /// written. Semantically identical to [`Pdu::encode`].
    pub fn encode_into(&self, buf: &mut [u8]) -> ModbusResult<usize> {
        let pdu = self.encode()?;
        let bytes = pdu.as_slice();
        if buf.len() < bytes.len() {
            return Err(ModbusError::BufferTooSmall {
                needed: bytes.len(),
                available: buf.len(),
            });
        }
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len())
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Decode a PDU received by a server (request direction).
    ///
    /// Exception responses are accepted here as well: a master that has
    /// lost direction context can still classify the bytes.
    pub fn decode_request(bytes: &[u8]) -> ModbusResult<Pdu> {
        let (fc, body) = split_function(bytes)?;
        debug!("decoding request PDU: FC=0x{fc:02X}, body_len={}", body.len());

        if fc & 0x80 != 0 {
            return decode_exception(fc, body);
        }

        let function = match ModbusFunction::from_u8(fc) {
            Ok(f) => f,
            Err(_) => return Ok(raw(fc, body)),
        };

        match function {
            ModbusFunction::ReadCoils | ModbusFunction::ReadDiscreteInputs => {
                let (start_address, quantity) = decode_addr_qty(body, "read bits request")?;
                Ok(Pdu::ReadBitsRequest {
                    function,
                    start_address,
                    quantity,
                })
            }

            ModbusFunction::ReadHoldingRegisters | ModbusFunction::ReadInputRegisters => {
                let (start_address, quantity) = decode_addr_qty(body, "read registers request")?;
                Ok(Pdu::ReadRegistersRequest {
                    function,
                    start_address,
                    quantity,
                })
            }

            ModbusFunction::WriteSingleCoil => decode_write_single_coil(body),

            ModbusFunction::WriteSingleRegister => {
                let (address, value) = decode_addr_qty(body, "write single register")?;
                Ok(Pdu::WriteSingleRegister { address, value })
            }

            ModbusFunction::WriteMultipleCoils => decode_write_multiple_coils(body),

            ModbusFunction::WriteMultipleRegisters => decode_write_multiple_registers(body),
        }
    }

    /// Decode a PDU received by a master (response direction).
    pub fn decode_response(bytes: &[u8]) -> ModbusResult<Pdu> {
        let (fc, body) = split_function(bytes)?;
        debug!(
            "decoding response PDU: FC=0x{fc:02X}, body_len={}",
            body.len()
        );

        if fc & 0x80 != 0 {
            return decode_exception(fc, body);
        }

        let function = match ModbusFunction::from_u8(fc) {
            Ok(f) => f,
            Err(_) => return Ok(raw(fc, body)),
        };

        match function {
            ModbusFunction::ReadCoils | ModbusFunction::ReadDiscreteInputs => {
                let data = decode_counted_body(body, "bit response")?;
                Ok(Pdu::ReadBitsResponse {
                    function,
                    data: data.to_vec(),
                })
            }

            ModbusFunction::ReadHoldingRegisters | ModbusFunction::ReadInputRegisters => {
                let data = decode_counted_body(body, "register response")?;
                if data.len() % 2 != 0 {
                    return Err(ModbusError::malformed_pdu(format!(
                        "register response byte count {} is odd",
                        data.len()
                    )));
                }
                let values = data
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                Ok(Pdu::ReadRegistersResponse { function, values })
            }

            ModbusFunction::WriteSingleCoil => decode_write_single_coil(body),

            ModbusFunction::WriteSingleRegister => {
                let (address, value) = decode_addr_qty(body, "write single register")?;
                Ok(Pdu::WriteSingleRegister { address, value })
            }

            ModbusFunction::WriteMultipleCoils | ModbusFunction::WriteMultipleRegisters => {
                let (start_address, quantity) = decode_addr_qty(body, "write multiple response")?;
                Ok(Pdu::WriteMultipleResponse {
                    function,
                    start_address,
                    quantity,
                })
            }
        }
    }

    /// Function byte this PDU puts on the wire.
    pub fn function_byte(&self) -> u8 {
        match self {
            Pdu::ReadBitsRequest { function, .. }
            | Pdu::ReadBitsResponse { function, .. }
            | Pdu::ReadRegistersRequest { function, .. }
            | Pdu::ReadRegistersResponse { function, .. }
            | Pdu::WriteMultipleResponse { function, .. } => function.to_u8(),
            Pdu::WriteSingleCoil { .. } => ModbusFunction::WriteSingleCoil.to_u8(),
            Pdu::WriteSingleRegister { .. } => ModbusFunction::WriteSingleRegister.to_u8(),
            Pdu::WriteMultipleCoilsRequest { .. } => ModbusFunction::WriteMultipleCoils.to_u8(),
            Pdu::WriteMultipleRegistersRequest { .. } => {
                ModbusFunction::WriteMultipleRegisters.to_u8()
            }
            Pdu::Exception { function, .. } => function.exception_function(),
            Pdu::Raw { function, .. } => *function,
        }
    }

    /// True for [`Pdu::Exception`].
    pub fn is_exception(&self) -> bool {
        matches!(self, Pdu::Exception { .. })
    }
}

// ============================================================================
// Decoding Helpers
// ============================================================================

fn split_function(bytes: &[u8]) -> ModbusResult<(u8, &[u8])> {
    match bytes.split_first() {
        Some((&fc, body)) => Ok((fc, body)),
        None => Err(ModbusError::malformed_pdu("empty PDU")),
    }
}

fn raw(function: u8, body: &[u8]) -> Pdu {
    Pdu::Raw {
        function,
        data: body.to_vec(),
    }
}

fn decode_exception(fc: u8, body: &[u8]) -> ModbusResult<Pdu> {
    if body.len() != 1 {
        return Err(ModbusError::malformed_pdu(format!(
            "exception response with {} body bytes, expected 1",
            body.len()
        )));
    }

    let function = match ModbusFunction::from_u8(fc & 0x7F) {
        Ok(f) => f,
        // Exception to a function we do not model; hand the bytes through
        Err(_) => return Ok(raw(fc, body)),
    };
    let exception = ModbusException::from_u8(body[0]).ok_or_else(|| {
        ModbusError::malformed_pdu(format!("unrecognized exception code 0x{:02X}", body[0]))
    })?;

    Ok(Pdu::Exception {
        function,
        exception,
    })
}

/// Decode the fixed 4-byte `[addr_hi, addr_lo, word_hi, word_lo]` body
/// shared by FC01-06 requests and FC0F/10 responses.
fn decode_addr_qty(body: &[u8], what: &str) -> ModbusResult<(u16, u16)> {
    if body.len() != 4 {
        return Err(ModbusError::malformed_pdu(format!(
            "{what} body is {} bytes, expected 4",
            body.len()
        )));
    }
    Ok((
        u16::from_be_bytes([body[0], body[1]]),
        u16::from_be_bytes([body[2], body[3]]),
    ))
}

/// Decode a `[byte_count][data...]` body, checking the count against the
/// actual remainder.
fn decode_counted_body<'a>(body: &'a [u8], what: &str) -> ModbusResult<&'a [u8]> {
    let (&byte_count, data) = body.split_first().ok_or_else(|| {
        ModbusError::malformed_pdu(format!("{what} body missing byte count"))
    })?;
    if byte_count == 0 {
        return Err(ModbusError::malformed_pdu(format!("{what} byte count is 0")));
    }
    if data.len() != byte_count as usize {
        return Err(ModbusError::malformed_pdu(format!(
            "{what} carries {} data bytes but declares {byte_count}",
            data.len()
        )));
    }
    Ok(data)
}

fn decode_write_single_coil(body: &[u8]) -> ModbusResult<Pdu> {
    let (address, raw_value) = decode_addr_qty(body, "write single coil")?;
    let value = match raw_value {
        COIL_ON => true,
        COIL_OFF => false,
        _ => {
            return Err(ModbusError::malformed_pdu(format!(
                "coil value 0x{raw_value:04X} is neither 0xFF00 nor 0x0000"
            )))
        }
    };
    Ok(Pdu::WriteSingleCoil { address, value })
}

fn decode_write_multiple_coils(body: &[u8]) -> ModbusResult<Pdu> {
    if body.len() < 5 {
        return Err(ModbusError::malformed_pdu(format!(
            "write multiple coils body is {} bytes, expected at least 5",
            body.len()
        )));
    }
    let start_address = u16::from_be_bytes([body[0], body[1]]);
    let quantity = u16::from_be_bytes([body[2], body[3]]);
    let byte_count = body[4] as usize;
    let data = &body[5..];

    if quantity == 0 || quantity > MAX_WRITE_COILS {
        return Err(ModbusError::malformed_pdu(format!(
            "write coil quantity {quantity} outside 1..={MAX_WRITE_COILS}"
        )));
    }
    let expected = (quantity as usize).div_ceil(8);
    if byte_count != expected || data.len() != byte_count {
        return Err(ModbusError::malformed_pdu(format!(
            "coil byte count {byte_count} with {} data bytes does not match quantity {quantity}",
            data.len()
        )));
    }

    Ok(Pdu::WriteMultipleCoilsRequest {
        start_address,
        quantity,
        data: data.to_vec(),
    })
}

fn decode_write_multiple_registers(body: &[u8]) -> ModbusResult<Pdu> {
    if body.len() < 5 {
        return Err(ModbusError::malformed_pdu(format!(
            "write multiple registers body is {} bytes, expected at least 5",
            body.len()
        )));
    }
    let start_address = u16::from_be_bytes([body[0], body[1]]);
    let quantity = u16::from_be_bytes([body[2], body[3]]);
    let byte_count = body[4] as usize;
    let data = &body[5..];

    if quantity == 0 || quantity > MAX_WRITE_REGISTERS {
        return Err(ModbusError::malformed_pdu(format!(
            "write register quantity {quantity} outside 1..={MAX_WRITE_REGISTERS}"
        )));
    }
    if byte_count != quantity as usize * 2 || data.len() != byte_count {
        return Err(ModbusError::malformed_pdu(format!(
            "register byte count {byte_count} with {} data bytes does not match quantity {quantity}",
            data.len()
        )));
    }

    let values = data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    Ok(Pdu::WriteMultipleRegistersRequest {
        start_address,
        values,
    })
}

// ============================================================================
// Encoding Helpers
// ============================================================================

fn is_bit_read(function: ModbusFunction) -> bool {
    matches!(
        function,
        ModbusFunction::ReadCoils | ModbusFunction::ReadDiscreteInputs
    )
}

fn is_register_read(function: ModbusFunction) -> bool {
    matches!(
        function,
        ModbusFunction::ReadHoldingRegisters | ModbusFunction::ReadInputRegisters
    )
}

fn require_function(
    function: ModbusFunction,
    accepts: impl Fn(ModbusFunction) -> bool,
    what: &str,
) -> ModbusResult<()> {
    if accepts(function) {
        Ok(())
    } else {
        Err(ModbusError::invalid_argument(format!(
            "{function} is not a {what} function"
        )))
    }
}

fn check_quantity(quantity: u16, limit: u16, what: &str) -> ModbusResult<()> {
    if quantity == 0 || quantity > limit {
        return Err(ModbusError::invalid_argument(format!(
            "{what} quantity {quantity} outside 1..={limit}"
        )));
    }
    Ok(())
}

fn check_count(count: usize, limit: u16, what: &str) -> ModbusResult<()> {
    if count == 0 || count > limit as usize {
        return Err(ModbusError::invalid_argument(format!(
            "{what} count {count} outside 1..={limit}"
        )));
    }
    Ok(())
}
