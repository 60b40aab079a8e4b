use crate::protocol::mastervolt::{DecodeError, ModbusError};

/// Error taxonomy surfaced by the host layer.
///
/// Every variant is handled where the transaction was issued; none of them
/// leaves an entity with a partially updated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MastervoltError {
    /// A variable definition is missing a required address field.
    Config(String),
    /// A command named a target that is not registered.
    TargetResolution(String),
    /// The transport failed or timed out.
    Transport(String),
    /// The device answered with a Modbus exception.
    ModbusProtocol(String),
    /// The response carried fewer bytes than a value needs.
    InsufficientData { expected: usize, received: usize },
}

impl std::fmt::Display for MastervoltError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MastervoltError::Config(msg) => write!(f, "configuration error: {msg}"),
            MastervoltError::TargetResolution(name) => {
                write!(f, "command target '{name}' not found")
            }
            MastervoltError::Transport(msg) => write!(f, "transport error: {msg}"),
            MastervoltError::ModbusProtocol(msg) => write!(f, "modbus exception: {msg}"),
            MastervoltError::InsufficientData { expected, received } => write!(
                f,
                "response does not contain enough data (expected {expected} bytes, got {received})"
            ),
        }
    }
}

impl std::error::Error for MastervoltError {}

impl From<ModbusError> for MastervoltError {
    fn from(err: ModbusError) -> Self {
        match err {
            ModbusError::Transport(msg) => MastervoltError::Transport(msg),
            ModbusError::Timeout(timeout) => MastervoltError::Transport(format!(
                "no response within {} ms",
                timeout.as_millis()
            )),
            ModbusError::Exception(msg) => MastervoltError::ModbusProtocol(msg),
        }
    }
}

impl From<DecodeError> for MastervoltError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Modbus(err) => err.into(),
            DecodeError::InsufficientData { expected, received } => {
                MastervoltError::InsufficientData { expected, received }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_modbus_errors_map_to_taxonomy() {
        assert_eq!(
            MastervoltError::from(ModbusError::Timeout(Duration::from_millis(250))),
            MastervoltError::Transport("no response within 250 ms".to_string())
        );
        assert_eq!(
            MastervoltError::from(ModbusError::Exception("IllegalFunction".to_string())),
            MastervoltError::ModbusProtocol("IllegalFunction".to_string())
        );
        assert_eq!(
            MastervoltError::from(DecodeError::InsufficientData {
                expected: 12,
                received: 4
            }),
            MastervoltError::InsufficientData {
                expected: 12,
                received: 4
            }
        );
    }
}
