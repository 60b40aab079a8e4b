use super::{address::DeviceAddress, float::encode_float, FRAME_WORDS};

/// Transaction direction of a register frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Read,
    Write,
}

impl FrameKind {
    /// Register the frame is written to inside the combined transaction.
    pub fn write_address(&self) -> u16 {
        match self {
            FrameKind::Read => super::READ_FRAME_WRITE_ADDRESS,
            FrameKind::Write => super::WRITE_FRAME_WRITE_ADDRESS,
        }
    }
}

/// Six-word payload of a combined read/write-registers request:
/// four address words followed by two value words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterFrame {
    kind: FrameKind,
    words: [u16; FRAME_WORDS],
}

impl RegisterFrame {
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn words(&self) -> &[u16; FRAME_WORDS] {
        &self.words
    }

    pub fn address_words(&self) -> [u16; 4] {
        [self.words[0], self.words[1], self.words[2], self.words[3]]
    }

    pub fn payload_words(&self) -> [u16; 2] {
        [self.words[4], self.words[5]]
    }

    pub fn write_address(&self) -> u16 {
        self.kind.write_address()
    }
}

pub fn build_read_frame(addr: &DeviceAddress) -> RegisterFrame {
    let [w1, w2, w3, w4] = addr.encode();
    RegisterFrame {
        kind: FrameKind::Read,
        words: [w1, w2, w3, w4, 0x0000, 0x0000],
    }
}

pub fn build_write_frame(addr: &DeviceAddress, value: f32) -> RegisterFrame {
    let [w1, w2, w3, w4] = addr.encode();
    let bytes = encode_float(value);
    let register1 = ((bytes.lo as u16) << 8) | bytes.mi as u16;
    let register2 = ((bytes.hi as u16) << 8) | bytes.exponent as u16;

    RegisterFrame {
        kind: FrameKind::Write,
        words: [w1, w2, w3, w4, register1, register2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_address() -> DeviceAddress {
        DeviceAddress::new(0x05, 0x010203, 0x0010, 0x0020)
    }

    #[test]
    fn test_read_frame_layout() {
        let frame = build_read_frame(&reference_address());
        assert_eq!(
            frame.words(),
            &[0x0501, 0x0203, 0x0010, 0x0020, 0x0000, 0x0000]
        );
        assert_eq!(frame.kind(), FrameKind::Read);
        assert_eq!(frame.write_address(), 0x0000);
    }

    #[test]
    fn test_write_frame_payload() {
        let frame = build_write_frame(&reference_address(), 1.0);
        assert_eq!(frame.address_words(), [0x0501, 0x0203, 0x0010, 0x0020]);
        assert_eq!(frame.payload_words(), [0x0000, 0x803F]);
        assert_eq!(frame.write_address(), 0x0001);

        let frame = build_write_frame(&reference_address(), 230.5);
        assert_eq!(frame.payload_words(), [0x0080, 0x6643]);
    }

    #[test]
    fn test_write_zero_matches_read_shape() {
        let addr = reference_address();
        let read = build_read_frame(&addr);
        let write = build_write_frame(&addr, 0.0);

        assert_eq!(write.payload_words(), [0x0000, 0x0000]);
        assert_eq!(read.words(), write.words());
        assert_ne!(read.write_address(), write.write_address());
    }

    #[test]
    fn test_write_payload_is_not_a_big_endian_float() {
        // Reading the payload back as a conventional high-word-first float
        // does not give the written value.
        let frame = build_write_frame(&reference_address(), 1.0);
        let [high, low] = frame.payload_words();
        let naive = f32::from_bits(((high as u32) << 16) | low as u32);
        assert_ne!(naive, 1.0);
        assert_eq!(naive.to_bits(), 0x0000_803F);
    }
}
