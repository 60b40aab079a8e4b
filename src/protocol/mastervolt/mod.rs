//! Mastervolt addressing and value conventions on top of Modbus function 0x17
//! (read/write multiple registers).

mod address;
mod float;
mod frame;
mod outcome;
mod response;

pub use address::{encode_address, DeviceAddress};
pub use float::{decode_float, encode_float, FloatBytes};
pub use frame::{build_read_frame, build_write_frame, FrameKind, RegisterFrame};
pub use outcome::{ModbusError, TransactionOutcome};
pub use response::{decode_registers, decode_response, registers_to_bytes, DecodeError};

/// Words in a request frame: four address words and two value words.
pub const FRAME_WORDS: usize = 6;

/// First register read back by every transaction.
pub const READ_ADDRESS: u16 = 0x0000;
/// Registers read back by every transaction.
pub const READ_COUNT: u16 = 6;
/// Write offset used when the frame only selects a variable to read.
pub const READ_FRAME_WRITE_ADDRESS: u16 = 0x0000;
/// Write offset used when the frame carries a new value.
pub const WRITE_FRAME_WRITE_ADDRESS: u16 = 0x0001;

/// Bytes in a complete response (`READ_COUNT` registers, two bytes each).
pub const RESPONSE_BYTES: usize = READ_COUNT as usize * 2;
/// Offset of the `lo, mi, hi, exponent` value bytes inside the response.
/// Only valid for a `READ_COUNT` register read starting at `READ_ADDRESS`.
pub const VALUE_BYTE_OFFSET: usize = 8;

/// Unit id of the Mastervolt interface when none is configured.
pub const DEFAULT_UNIT_ID: u8 = 1;
