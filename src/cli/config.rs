use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, time::Duration};

use crate::{
    api::modbus::ClientConfig,
    core::{
        normalize_name, AccessMode, EntityStore, MastervoltError, SensorEntity,
        DEFAULT_SCAN_INTERVAL_SECS,
    },
    protocol::mastervolt::DeviceAddress,
};

/// A numeric field kept as written, so a wrong-typed value only affects the
/// variable that carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Integer(i64),
    Other(serde_json::Value),
}

impl RawField {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RawField::Integer(value) => Some(*value),
            RawField::Other(_) => None,
        }
    }
}

impl From<i64> for RawField {
    fn from(value: i64) -> Self {
        RawField::Integer(value)
    }
}

impl fmt::Display for RawField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawField::Integer(value) => write!(f, "{value}"),
            RawField::Other(value) => write!(f, "{value}"),
        }
    }
}

/// One Mastervolt variable as written in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub idal: Option<RawField>,
    pub idb: Option<RawField>,
    pub tab: Option<RawField>,
    pub var: Option<RawField>,
    /// 0 = read (polled), 1 = write (commands only)
    #[serde(default = "default_rw")]
    pub rw: RawField,
    /// Value written by a command that does not specify one
    #[serde(default)]
    pub value: f32,
    #[serde(default)]
    pub unit_of_measurement: Option<String>,
    /// Poll interval in seconds
    #[serde(default = "default_scan_interval")]
    pub scan_interval: RawField,
}

fn default_name() -> String {
    "Unnamed Device".to_string()
}

fn default_rw() -> RawField {
    RawField::Integer(0)
}

fn default_scan_interval() -> RawField {
    RawField::Integer(DEFAULT_SCAN_INTERVAL_SECS as i64)
}

impl VariableConfig {
    pub fn address(&self) -> Result<DeviceAddress, MastervoltError> {
        let fields = [
            ("idal", &self.idal),
            ("idb", &self.idb),
            ("tab", &self.tab),
            ("var", &self.var),
        ];

        let mut words = [0u32; 4];
        for (slot, (label, raw)) in words.iter_mut().zip(fields) {
            let raw = raw.as_ref().ok_or_else(|| {
                MastervoltError::Config(format!(
                    "Parameter {} is missing from {}",
                    label, self.name
                ))
            })?;
            *slot = raw
                .as_integer()
                .and_then(|value| u32::try_from(value).ok())
                .ok_or_else(|| {
                    MastervoltError::Config(format!(
                        "Invalid {} {} for {} (expected a non-negative integer)",
                        label, raw, self.name
                    ))
                })?;
        }

        let [idal, idb, tab, var] = words;
        Ok(DeviceAddress::new(idal, idb, tab, var))
    }

    /// Validate the definition and build the entity it describes.
    pub fn to_entity(&self) -> Result<SensorEntity, MastervoltError> {
        let address = self.address()?;
        let mode = self
            .rw
            .as_integer()
            .and_then(|rw| u8::try_from(rw).ok())
            .and_then(AccessMode::from_rw)
            .ok_or_else(|| {
                MastervoltError::Config(format!(
                    "Invalid rw flag {} for {} (expected 0 or 1)",
                    self.rw, self.name
                ))
            })?;

        let name = normalize_name(&self.name);
        let scan_interval = match self.scan_interval.as_integer() {
            Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
            _ => {
                log::warn!(
                    "Invalid scan_interval {} for {}. Using default of {} seconds.",
                    self.scan_interval,
                    name,
                    DEFAULT_SCAN_INTERVAL_SECS
                );
                Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS)
            }
        };

        let mut entity = SensorEntity::new(name, address, mode);
        entity.default_value = self.value;
        entity.unit_of_measurement = self.unit_of_measurement.clone();
        entity.scan_interval = scan_interval;
        Ok(entity)
    }
}

/// Root configuration: one connection and the variables reached through it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MastervoltConfig {
    pub connection: ClientConfig,
    #[serde(default)]
    pub variables: Vec<VariableConfig>,
}

impl MastervoltConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| anyhow!("Invalid TOML configuration: {}", e))
    }

    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).map_err(|e| anyhow!("Invalid JSON configuration: {}", e))
    }

    /// Read configuration from a file. `.json` files are parsed as JSON,
    /// everything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
        .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize configuration: {}", e))
    }

    /// Build the entity store. Invalid variables are logged and skipped.
    pub fn build_store(&self) -> EntityStore {
        let store = EntityStore::new();
        for variable in &self.variables {
            match variable.to_entity() {
                Ok(entity) => store.insert(entity),
                Err(err) => log::error!("Skipping variable {}: {}", variable.name, err),
            }
        }
        store
    }
}
