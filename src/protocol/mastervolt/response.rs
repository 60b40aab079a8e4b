use super::{
    float::decode_float,
    outcome::{ModbusError, TransactionOutcome},
    RESPONSE_BYTES, VALUE_BYTE_OFFSET,
};

/// Reasons a transaction did not yield a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Modbus(ModbusError),
    InsufficientData { expected: usize, received: usize },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Modbus(err) => write!(f, "{err}"),
            DecodeError::InsufficientData { expected, received } => write!(
                f,
                "response does not contain enough data (expected {expected} bytes, got {received})"
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Expand registers into bytes, high byte first.
pub fn registers_to_bytes(registers: &[u16]) -> Vec<u8> {
    registers.iter().flat_map(|reg| reg.to_be_bytes()).collect()
}

/// Decode the value carried by a transaction outcome.
pub fn decode_response(outcome: &TransactionOutcome) -> Result<f32, DecodeError> {
    match outcome {
        TransactionOutcome::Ok(registers) => decode_registers(registers),
        TransactionOutcome::ModbusError(err) => Err(DecodeError::Modbus(err.clone())),
        TransactionOutcome::InsufficientData { received, .. } => {
            Err(DecodeError::InsufficientData {
                expected: RESPONSE_BYTES,
                received: received * 2,
            })
        }
    }
}

/// Decode the value from raw response registers.
pub fn decode_registers(registers: &[u16]) -> Result<f32, DecodeError> {
    let bytes = registers_to_bytes(registers);
    if bytes.len() < RESPONSE_BYTES {
        return Err(DecodeError::InsufficientData {
            expected: RESPONSE_BYTES,
            received: bytes.len(),
        });
    }

    let value = &bytes[VALUE_BYTE_OFFSET..VALUE_BYTE_OFFSET + 4];
    Ok(decode_float(value[0], value[1], value[2], value[3]))
}
