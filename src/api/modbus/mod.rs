pub mod command;
pub mod core;
pub mod master;
pub mod traits;
pub mod transport;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::mastervolt::{
    DecodeError, DeviceAddress, RegisterFrame, TransactionOutcome, DEFAULT_UNIT_ID,
};

// Re-export protocol types used at the API surface
pub use crate::protocol::mastervolt::{FrameKind, ModbusError};

// Re-export core traits (API layer - abstract interfaces)
pub use traits::{ChannelHandler, LoggingHandler, NoOpHandler, ReadWriteRegisters, VariableHandler};

pub use command::send_command;
pub use self::core::{execute_transaction, read_variable, write_variable, TransactionParams};
pub use master::{poll_entity, run_poll_loop, MastervoltPoller, PollControl};
pub use transport::{connect, ModbusEndpoint};

/// How the Mastervolt interface is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndpointConfig {
    /// Modbus TCP, `address` is `host:port`
    Tcp { address: String },
    /// Modbus RTU over a serial port
    Rtu {
        port_name: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
}

impl std::fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointConfig::Tcp { address } => write!(f, "tcp://{address}"),
            EndpointConfig::Rtu {
                port_name,
                baud_rate,
            } => write!(f, "rtu://{port_name}@{baud_rate}"),
        }
    }
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_unit_id() -> u8 {
    DEFAULT_UNIT_ID
}

fn default_timeout_ms() -> u64 {
    3000
}

/// Connection parameters shared by every transaction of a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub endpoint: EndpointConfig,
    /// Modbus unit (slave) id of the Mastervolt interface
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    /// Upper bound for a single transaction in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// A connected Mastervolt interface.
///
/// The endpoint sits behind an async mutex, so at most one transaction is in
/// flight at a time. The protocol has no request ids, and overlapping requests
/// for the same variable cannot be told apart.
pub struct MastervoltClient {
    endpoint: tokio::sync::Mutex<Box<dyn ReadWriteRegisters>>,
    unit_id: u8,
    timeout: Duration,
}

impl MastervoltClient {
    pub fn new(endpoint: Box<dyn ReadWriteRegisters>, unit_id: u8, timeout: Duration) -> Self {
        Self {
            endpoint: tokio::sync::Mutex::new(endpoint),
            unit_id,
            timeout,
        }
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one transaction with a prebuilt frame.
    pub async fn transact(&self, frame: &RegisterFrame) -> TransactionOutcome {
        let params = TransactionParams::for_frame(self.unit_id, frame, self.timeout);
        let mut endpoint = self.endpoint.lock().await;
        execute_transaction(endpoint.as_mut(), frame, &params).await
    }

    pub async fn read_variable(&self, address: &DeviceAddress) -> Result<f32, DecodeError> {
        let mut endpoint = self.endpoint.lock().await;
        read_variable(endpoint.as_mut(), self.unit_id, address, self.timeout).await
    }

    pub async fn write_variable(&self, address: &DeviceAddress, value: f32) -> TransactionOutcome {
        let mut endpoint = self.endpoint.lock().await;
        write_variable(endpoint.as_mut(), self.unit_id, address, value, self.timeout).await
    }
}

/// Builder for creating a Mastervolt client.
///
/// # Example
///
/// ```no_run
/// use mastervolt::api::modbus::MastervoltBuilder;
/// use mastervolt::protocol::mastervolt::DeviceAddress;
///
/// # async fn run() -> anyhow::Result<()> {
/// let client = MastervoltBuilder::new()
///     .with_tcp("192.168.1.50:502")
///     .with_unit_id(1)
///     .with_timeout(2000)
///     .connect()
///     .await?;
///
/// let value = client
///     .read_variable(&DeviceAddress::new(0x05, 0x010203, 0x0010, 0x0020))
///     .await?;
/// println!("{value}");
/// # Ok(())
/// # }
/// ```
pub struct MastervoltBuilder {
    endpoint: Option<EndpointConfig>,
    unit_id: u8,
    timeout_ms: u64,
}

impl Default for MastervoltBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MastervoltBuilder {
    pub fn new() -> Self {
        Self {
            endpoint: None,
            unit_id: DEFAULT_UNIT_ID,
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            endpoint: Some(config.endpoint),
            unit_id: config.unit_id,
            timeout_ms: config.timeout_ms,
        }
    }

    /// Use Modbus TCP at `address` (`host:port`).
    pub fn with_tcp(mut self, address: &str) -> Self {
        self.endpoint = Some(EndpointConfig::Tcp {
            address: address.to_string(),
        });
        self
    }

    /// Use Modbus RTU on a serial port.
    pub fn with_serial(mut self, port_name: &str, baud_rate: u32) -> Self {
        self.endpoint = Some(EndpointConfig::Rtu {
            port_name: port_name.to_string(),
            baud_rate,
        });
        self
    }

    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Set the per-transaction timeout in milliseconds.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| anyhow!("Endpoint is required. Use with_tcp() or with_serial()"))?;
        if self.timeout_ms == 0 {
            return Err(anyhow!("Timeout must be greater than zero"));
        }

        Ok(ClientConfig {
            endpoint,
            unit_id: self.unit_id,
            timeout_ms: self.timeout_ms,
        })
    }

    /// Connect the configured transport and wrap it in a client.
    pub async fn connect(self) -> Result<MastervoltClient> {
        let config = self.build()?;
        let endpoint = connect(&config).await?;
        Ok(MastervoltClient::new(
            Box::new(endpoint),
            config.unit_id,
            config.timeout(),
        ))
    }

    /// Wrap a caller supplied endpoint (for custom transports and tests).
    pub fn build_with_endpoint(self, endpoint: Box<dyn ReadWriteRegisters>) -> MastervoltClient {
        MastervoltClient::new(
            endpoint,
            self.unit_id,
            Duration::from_millis(self.timeout_ms),
        )
    }
}
