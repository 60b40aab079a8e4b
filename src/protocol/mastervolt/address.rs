use serde::{Deserialize, Serialize};

/// Fully qualified logical address of a Mastervolt device variable.
///
/// Each field is masked to its protocol width on construction, so out of range
/// inputs are truncated rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    idal: u8,
    idb: u32,
    tab: u16,
    var: u16,
}

impl DeviceAddress {
    pub const IDB_MASK: u32 = 0x00FF_FFFF;

    pub fn new(idal: u32, idb: u32, tab: u32, var: u32) -> Self {
        Self {
            idal: (idal & 0xFF) as u8,
            idb: idb & Self::IDB_MASK,
            tab: (tab & 0xFFFF) as u16,
            var: (var & 0xFFFF) as u16,
        }
    }

    pub fn idal(&self) -> u8 {
        self.idal
    }

    /// 24-bit device identifier.
    pub fn idb(&self) -> u32 {
        self.idb
    }

    pub fn tab(&self) -> u16 {
        self.tab
    }

    pub fn var(&self) -> u16 {
        self.var
    }

    /// Pack the address into the four leading words of a register frame.
    pub fn encode(&self) -> [u16; 4] {
        encode_address(self)
    }
}

impl std::fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "idal=0x{:02X} idb=0x{:06X} tab=0x{:04X} var=0x{:04X}",
            self.idal, self.idb, self.tab, self.var
        )
    }
}

/// Pack a logical address into four register words.
///
/// The high byte of `idb` shares the first register with `idal`; the low two
/// bytes of `idb` fill the second register.
pub fn encode_address(addr: &DeviceAddress) -> [u16; 4] {
    let idb = addr.idb & DeviceAddress::IDB_MASK;
    let b1 = (idb & 0xFF) as u16;
    let b2 = ((idb >> 8) & 0xFF) as u16;
    let b3 = ((idb >> 16) & 0xFF) as u16;

    [
        ((addr.idal as u16) << 8) | b3,
        (b2 << 8) | b1,
        addr.tab,
        addr.var,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_reference_address() {
        let addr = DeviceAddress::new(0x05, 0x010203, 0x0010, 0x0020);
        assert_eq!(addr.encode(), [0x0501, 0x0203, 0x0010, 0x0020]);
    }

    #[test]
    fn test_encode_masks_out_of_range_fields() {
        let addr = DeviceAddress::new(0x1FF, 0x01AB_CDEF, 0x1_2345, 0x2_0001);
        assert_eq!(addr.idal(), 0xFF);
        assert_eq!(addr.idb(), 0xAB_CDEF);
        assert_eq!(addr.encode(), [0xFFAB, 0xCDEF, 0x2345, 0x0001]);
    }

    #[test]
    fn test_encode_extremes() {
        assert_eq!(DeviceAddress::new(0, 0, 0, 0).encode(), [0, 0, 0, 0]);
        assert_eq!(
            DeviceAddress::new(0xFF, 0xFF_FFFF, 0xFFFF, 0xFFFF).encode(),
            [0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF]
        );
    }

    #[test]
    fn test_encode_is_pure() {
        let addr = DeviceAddress::new(0x12, 0x345678, 0x9ABC, 0xDEF0);
        let first = encode_address(&addr);
        let second = encode_address(&addr);
        assert_eq!(first, second);
        assert_eq!(first, [0x1234, 0x5678, 0x9ABC, 0xDEF0]);
    }

    #[test]
    fn test_idal_only_touches_high_byte_of_first_word() {
        for idal in [0u32, 1, 0x7F, 0x80, 0xFF] {
            let words = DeviceAddress::new(idal, 0x00_0000, 0, 0).encode();
            assert_eq!(words[0], (idal as u16) << 8);
            assert_eq!(words[1], 0);
        }
    }
}
