use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use tokio_modbus::prelude::*;

use super::{traits::ReadWriteRegisters, ClientConfig, EndpointConfig};
use crate::{api::utils::open_serial_stream, protocol::mastervolt::ModbusError};

/// `ReadWriteRegisters` over a `tokio-modbus` client context (TCP or RTU).
///
/// Endpoints opened with [`connect`] remember their configuration and reopen
/// the transport when reset after a timeout. Endpoints wrapping a ready-made
/// context have nothing to reopen and keep using it.
pub struct ModbusEndpoint {
    ctx: Option<client::Context>,
    description: String,
    config: Option<ClientConfig>,
}

impl ModbusEndpoint {
    pub fn new(ctx: client::Context, description: impl Into<String>) -> Self {
        Self {
            ctx: Some(ctx),
            description: description.into(),
            config: None,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    async fn context(&mut self) -> std::result::Result<&mut client::Context, ModbusError> {
        if self.ctx.is_none() {
            if let Some(config) = &self.config {
                let ctx = open_context(config)
                    .await
                    .map_err(|err| ModbusError::Transport(format!("{err:#}")))?;
                self.ctx = Some(ctx);
            }
        }

        let description = &self.description;
        self.ctx.as_mut().ok_or_else(|| {
            ModbusError::Transport(format!("{} is not connected", description))
        })
    }
}

#[async_trait]
impl ReadWriteRegisters for ModbusEndpoint {
    async fn read_write_registers(
        &mut self,
        unit_id: u8,
        read_address: u16,
        read_count: u16,
        write_address: u16,
        values: &[u16],
    ) -> std::result::Result<Vec<u16>, ModbusError> {
        let ctx = self.context().await?;
        ctx.set_slave(Slave(unit_id));

        let result = ctx
            .read_write_multiple_registers(read_address, read_count, write_address, values)
            .await;

        match result {
            Ok(Ok(registers)) => Ok(registers),
            Ok(Err(exception)) => Err(ModbusError::Exception(format!("{exception:?}"))),
            Err(err) => Err(ModbusError::Transport(format!(
                "{} ({})",
                err, self.description
            ))),
        }
    }

    async fn reset(&mut self) -> std::result::Result<(), ModbusError> {
        if self.config.is_none() {
            return Ok(());
        }

        log::info!("Reopening {} after timeout", self.description);
        // The old stream must be closed first: serial ports are opened exclusively.
        self.ctx = None;
        self.context().await.map(|_| ())
    }
}

async fn open_context(config: &ClientConfig) -> Result<client::Context> {
    let slave = Slave(config.unit_id);

    match &config.endpoint {
        EndpointConfig::Tcp { address } => {
            let socket_addr = tokio::net::lookup_host(address.as_str())
                .await
                .with_context(|| format!("Failed to resolve {address}"))?
                .next()
                .ok_or_else(|| anyhow!("No address found for {address}"))?;

            log::info!("Connecting to Modbus TCP endpoint {}", socket_addr);
            tcp::connect_slave(socket_addr, slave)
                .await
                .with_context(|| format!("Failed to connect to {socket_addr}"))
        }
        EndpointConfig::Rtu {
            port_name,
            baud_rate,
        } => {
            log::info!("Opening Modbus RTU port {} at {} baud", port_name, baud_rate);
            let stream = open_serial_stream(port_name, *baud_rate)?;
            Ok(rtu::attach_slave(stream, slave))
        }
    }
}

/// Open the transport described by `config`.
pub async fn connect(config: &ClientConfig) -> Result<ModbusEndpoint> {
    let ctx = open_context(config).await?;
    Ok(ModbusEndpoint {
        ctx: Some(ctx),
        description: config.endpoint.to_string(),
        config: Some(config.clone()),
    })
}
