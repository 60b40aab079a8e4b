//! Float conversions used by Mastervolt firmware.
//!
//! Reading and writing do not use the same packing rule. `decode` assembles the
//! bits as `exponent, hi, mi, lo` from most to least significant byte, while
//! `encode` returns the little-endian IEEE-754 bytes of the value. Both are kept
//! independent and must not be rewritten in terms of each other until the
//! hardware documentation confirms the intent.

/// Wire bytes of a Mastervolt float.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatBytes {
    pub lo: u8,
    pub mi: u8,
    pub hi: u8,
    pub exponent: u8,
}

impl FloatBytes {
    pub fn new(lo: u8, mi: u8, hi: u8, exponent: u8) -> Self {
        Self {
            lo,
            mi,
            hi,
            exponent,
        }
    }

    /// Byte tuple in `(lo, mi, hi, exponent)` order.
    pub fn as_tuple(&self) -> (u8, u8, u8, u8) {
        (self.lo, self.mi, self.hi, self.exponent)
    }
}

/// Decode four response bytes into a float.
///
/// Any bit pattern is accepted; NaN and infinities pass through unchanged.
pub fn decode_float(lo: u8, mi: u8, hi: u8, exponent: u8) -> f32 {
    let bits = ((exponent as u32) << 24) | ((hi as u32) << 16) | ((mi as u32) << 8) | lo as u32;
    f32::from_be_bytes(bits.to_be_bytes())
}

/// Encode a float for a write request.
pub fn encode_float(value: f32) -> FloatBytes {
    let [lo, mi, hi, exponent] = value.to_le_bytes();
    FloatBytes::new(lo, mi, hi, exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_one() {
        assert_eq!(encode_float(1.0).as_tuple(), (0x00, 0x00, 0x80, 0x3F));
    }

    #[test]
    fn test_decode_one() {
        assert_eq!(decode_float(0x00, 0x00, 0x80, 0x3F), 1.0);
        assert_eq!(
            decode_float(0x00, 0x00, 0x80, 0x3F),
            f32::from_be_bytes([0x3F, 0x80, 0x00, 0x00])
        );
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode_float(0.0).as_tuple(), (0x00, 0x00, 0x00, 0x00));
        assert_eq!(encode_float(-1.0).as_tuple(), (0x00, 0x00, 0x80, 0xBF));
        assert_eq!(encode_float(12.5).as_tuple(), (0x00, 0x00, 0x48, 0x41));
        assert_eq!(encode_float(230.5).as_tuple(), (0x00, 0x80, 0x66, 0x43));
    }

    #[test]
    fn test_decode_known_values() {
        assert_eq!(decode_float(0x00, 0x80, 0x66, 0x43), 230.5);
        assert_eq!(decode_float(0x00, 0x00, 0x48, 0x41), 12.5);
        assert_eq!(decode_float(0x00, 0x00, 0x80, 0xBF), -1.0);
    }

    #[test]
    fn test_decode_passes_special_values_through() {
        assert_eq!(decode_float(0x00, 0x00, 0x80, 0x7F), f32::INFINITY);
        assert_eq!(decode_float(0x00, 0x00, 0x80, 0xFF), f32::NEG_INFINITY);

        let nan = decode_float(0x01, 0x00, 0xC0, 0x7F);
        assert!(nan.is_nan());
        assert_eq!(nan.to_bits(), 0x7FC0_0001);
    }

    #[test]
    fn test_decode_byte_order_is_not_little_endian() {
        // Feeding little-endian bytes straight through the big-endian reader
        // scrambles the value.
        let le = 1.0f32.to_le_bytes();
        let misread = decode_float(le[3], le[2], le[1], le[0]);
        assert_ne!(misread, 1.0);
        assert_eq!(misread.to_bits(), 0x0000_803F);
    }
}
