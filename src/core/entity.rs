use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{Display, EnumString};

use crate::protocol::mastervolt::DeviceAddress;

/// Whether a variable is polled for its value or only written by commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    Read,
    Write,
}

impl AccessMode {
    /// Map the numeric `rw` flag (0 = read, 1 = write).
    pub fn from_rw(rw: u8) -> Option<Self> {
        match rw {
            0 => Some(AccessMode::Read),
            1 => Some(AccessMode::Write),
            _ => None,
        }
    }

    pub fn as_rw(&self) -> u8 {
        match self {
            AccessMode::Read => 0,
            AccessMode::Write => 1,
        }
    }
}

/// Host-side state of one configured Mastervolt variable.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEntity {
    pub name: String,
    pub address: DeviceAddress,
    pub mode: AccessMode,
    /// Value sent by a command that does not carry its own.
    pub default_value: f32,
    pub unit_of_measurement: Option<String>,
    pub scan_interval: Duration,
    /// Last successfully decoded value. Never cleared by a failed transaction.
    pub value: Option<f32>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl SensorEntity {
    pub fn new(name: impl Into<String>, address: DeviceAddress, mode: AccessMode) -> Self {
        Self {
            name: name.into(),
            address,
            mode,
            default_value: 0.0,
            unit_of_measurement: None,
            scan_interval: Duration::from_secs(crate::core::DEFAULT_SCAN_INTERVAL_SECS),
            value: None,
            last_updated: None,
        }
    }

    pub fn is_polled(&self) -> bool {
        self.mode == AccessMode::Read
    }

    /// Record a decoded value and build the matching update notification.
    pub fn apply(&mut self, value: f32) -> VariableUpdate {
        let now = Utc::now();
        self.value = Some(value);
        self.last_updated = Some(now);

        VariableUpdate {
            name: self.name.clone(),
            address: self.address,
            value,
            unit_of_measurement: self.unit_of_measurement.clone(),
            timestamp: now.to_rfc3339(),
        }
    }
}

/// A freshly decoded variable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableUpdate {
    pub name: String,
    pub address: DeviceAddress,
    pub value: f32,
    pub unit_of_measurement: Option<String>,
    pub timestamp: String,
}

/// Lower-case a configured name and replace spaces with underscores.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}
