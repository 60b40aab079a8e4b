use std::time::Duration;

/// Failure reported by the Modbus endpoint for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModbusError {
    /// Connection or framing failure below the Modbus application layer.
    Transport(String),
    /// No reply within the caller supplied timeout.
    Timeout(Duration),
    /// The device answered with an exception response.
    Exception(String),
}

impl std::fmt::Display for ModbusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModbusError::Transport(msg) => write!(f, "transport error: {msg}"),
            ModbusError::Timeout(timeout) => {
                write!(f, "no response within {} ms", timeout.as_millis())
            }
            ModbusError::Exception(msg) => write!(f, "modbus exception: {msg}"),
        }
    }
}

impl std::error::Error for ModbusError {}

/// Result of a single combined read/write-registers transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome {
    Ok(Vec<u16>),
    ModbusError(ModbusError),
    InsufficientData { expected: u16, received: usize },
}

impl TransactionOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, TransactionOutcome::Ok(_))
    }
}
