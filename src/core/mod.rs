/// Host-side state for configured Mastervolt variables
///
/// - Entities with their last known value
/// - The name to address registry used by commands
/// - The error taxonomy shared by the API layer
pub mod entity;
pub mod error;
pub mod registry;

pub use entity::{normalize_name, AccessMode, SensorEntity, VariableUpdate};
pub use error::MastervoltError;
pub use registry::{AddressRegistry, EntityStore};

/// Poll interval applied when a variable does not configure a valid one.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 30;
