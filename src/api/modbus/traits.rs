/// Core API traits - abstract interfaces without transport or channel dependencies
///
/// `ReadWriteRegisters` is the only thing the crate needs from a Modbus client.
/// The transport module implements it for `tokio-modbus` contexts; tests and
/// other hosts can provide their own.
use anyhow::Result;
use async_trait::async_trait;

use crate::{core::VariableUpdate, protocol::mastervolt::ModbusError};

/// A Modbus endpoint able to perform function 0x17 (read/write multiple registers)
/// as a single request.
#[async_trait]
pub trait ReadWriteRegisters: Send {
    /// Write `values` starting at `write_address` and read `read_count` registers
    /// starting at `read_address` on unit `unit_id`, in one request.
    async fn read_write_registers(
        &mut self,
        unit_id: u8,
        read_address: u16,
        read_count: u16,
        write_address: u16,
        values: &[u16],
    ) -> std::result::Result<Vec<u16>, ModbusError>;

    /// Called after a request was abandoned on timeout. A late reply to that
    /// request must not be read as the answer to the next one, so transports
    /// with a byte stream reopen it here.
    async fn reset(&mut self) -> std::result::Result<(), ModbusError> {
        Ok(())
    }
}

/// Trait for handling decoded variable values
///
/// Implement this trait to define what happens with each successful poll.
pub trait VariableHandler: Send + Sync {
    /// Called after a variable was read and decoded.
    fn handle_update(&self, update: VariableUpdate) -> Result<()>;

    /// Return false to stop the poll loop gracefully.
    fn should_continue(&self) -> bool {
        true
    }
}

/// Handler that drops every update (useful for testing)
pub struct NoOpHandler;

impl VariableHandler for NoOpHandler {
    fn handle_update(&self, _update: VariableUpdate) -> Result<()> {
        Ok(())
    }
}

/// Handler that logs every update
pub struct LoggingHandler;

impl VariableHandler for LoggingHandler {
    fn handle_update(&self, update: VariableUpdate) -> Result<()> {
        log::info!(
            "Variable update: name={}, value={}{}, address=({})",
            update.name,
            update.value,
            update
                .unit_of_measurement
                .as_deref()
                .map(|unit| format!(" {unit}"))
                .unwrap_or_default(),
            update.address
        );
        Ok(())
    }
}

/// Handler that forwards updates into a flume channel
pub struct ChannelHandler {
    sender: flume::Sender<VariableUpdate>,
}

impl ChannelHandler {
    pub fn new(sender: flume::Sender<VariableUpdate>) -> Self {
        Self { sender }
    }
}

impl VariableHandler for ChannelHandler {
    fn handle_update(&self, update: VariableUpdate) -> Result<()> {
        self.sender
            .send(update)
            .map_err(|e| anyhow::anyhow!("Failed to forward variable update: {}", e))
    }

    fn should_continue(&self) -> bool {
        !self.sender.is_disconnected()
    }
}
