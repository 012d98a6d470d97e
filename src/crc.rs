//! CRC-16 integrity codec for Modbus RTU
//!
//! The Modbus variant of CRC-16: polynomial 0xA001 (reversed 0x8005),
//! initial value 0xFFFF, no final XOR. The checksum is transmitted
//! little-endian, low byte first. Backed by the table-driven
//! `CRC_16_MODBUS` algorithm of the `crc` crate; the table is a
//! compile-time constant.

use ::crc::{Crc, CRC_16_MODBUS};

/// CRC calculator for Modbus RTU frames.
const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Compute the Modbus CRC-16 over a byte span.
///
/// An empty span yields the initial value 0xFFFF.
///
/// # Example
///
/// ```rust
/// use modbus_wire::crc::crc16;
///
/// let frame = [0x01, 0x03, 0x00, 0x00, 0x00, 0x0A];
/// assert_eq!(crc16(&frame), 0xCDC5);
/// ```
#[inline]
pub fn crc16(data: &[u8]) -> u16 {
    CRC_MODBUS.checksum(data)
}

/// Verify a buffer whose last two bytes are the little-endian CRC of the
/// preceding bytes.
///
/// Buffers shorter than the checksum itself never verify.
pub fn crc16_verify(data: &[u8]) -> bool {
    if data.len() < 2 {
        return false;
    }
    let split = data.len() - 2;
    let received = u16::from_le_bytes([data[split], data[split + 1]]);
    crc16(&data[..split]) == received
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_empty_data() {
        // Empty data returns the initial CRC value
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_crc16_single_byte() {
        assert_eq!(crc16(&[0x01]), 0x807E);
    }

    #[test]
    fn test_crc16_known_vector_modbus() {
        // Read 10 holding registers from address 0, slave 1
        let data = [0x01, 0x03, 0x00, 0x00, 0x00, 0x0A];
        // Transmitted on the wire as 0xC5, 0xCD
        assert_eq!(crc16(&data), 0xCDC5);
    }

    #[test]
    fn test_crc16_known_vector_ascii() {
        // Standard CRC-16/MODBUS check value
        assert_eq!(crc16(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_crc16_response_vector() {
        // FC04 response carrying one register of 0xFFFF
        let data = [0x01, 0x04, 0x02, 0xFF, 0xFF];
        assert_eq!(crc16(&data), 0x80B8);
    }

    #[test]
    fn test_crc16_verify_valid() {
        let frame = [0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD];
        assert!(crc16_verify(&frame));
    }

    #[test]
    fn test_crc16_verify_invalid() {
        let frame = [0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xFF, 0xFF];
        assert!(!crc16_verify(&frame));
    }

    #[test]
    fn test_crc16_verify_frame_too_short() {
        assert!(!crc16_verify(&[]));
        assert!(!crc16_verify(&[0x01]));
    }

    #[test]
    fn test_crc16_verify_minimum_frame() {
        // Address + function code only, CRC appended
        let crc = crc16(&[0x01, 0x03]);
        let frame = [0x01, 0x03, (crc & 0xFF) as u8, (crc >> 8) as u8];
        assert!(crc16_verify(&frame));
    }

    #[test]
    fn test_crc16_large_buffer() {
        let data: Vec<u8> = (0..=255).cycle().take(4096).collect();
        let crc = crc16(&data);
        assert_ne!(crc, 0xFFFF);

        let mut frame = data;
        frame.extend_from_slice(&crc.to_le_bytes());
        assert!(crc16_verify(&frame));
    }

    #[test]
    fn test_crc16_append_verify_roundtrip() {
        for data in [&[][..], &[0x11][..], &[0x01, 0x05, 0x00, 0xAC, 0xFF, 0x00][..]] {
            let mut frame = data.to_vec();
            frame.extend_from_slice(&crc16(data).to_le_bytes());
            assert!(crc16_verify(&frame), "failed for {data:02X?}");
        }
    }
}
