use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use super::{
    entity::{SensorEntity, VariableUpdate},
    error::MastervoltError,
};
use crate::protocol::mastervolt::DeviceAddress;

/// Name to address lookup used to resolve command targets.
#[derive(Debug, Clone, Default)]
pub struct AddressRegistry {
    addresses: HashMap<String, DeviceAddress>,
}

impl AddressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address` under `name`, returning the address it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        address: DeviceAddress,
    ) -> Option<DeviceAddress> {
        self.addresses.insert(name.into(), address)
    }

    pub fn resolve(&self, name: &str) -> Result<DeviceAddress, MastervoltError> {
        self.addresses
            .get(name)
            .copied()
            .ok_or_else(|| MastervoltError::TargetResolution(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Shared store of configured entities and their last known values.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: Arc<RwLock<BTreeMap<String, SensorEntity>>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entities(entities: impl IntoIterator<Item = SensorEntity>) -> Self {
        let store = Self::new();
        for entity in entities {
            store.insert(entity);
        }
        store
    }

    /// Insert or replace an entity, keyed by its name.
    pub fn insert(&self, entity: SensorEntity) {
        let name = entity.name.clone();
        if self.entities.write().insert(name.clone(), entity).is_some() {
            log::warn!("Entity {} was defined more than once; keeping the last definition", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<SensorEntity> {
        self.entities.read().get(name).cloned()
    }

    pub fn value(&self, name: &str) -> Option<f32> {
        self.entities.read().get(name).and_then(|entity| entity.value)
    }

    pub fn names(&self) -> Vec<String> {
        self.entities.read().keys().cloned().collect()
    }

    /// Snapshot of all entities that are polled for their value.
    pub fn polled(&self) -> Vec<SensorEntity> {
        self.entities
            .read()
            .values()
            .filter(|entity| entity.is_polled())
            .cloned()
            .collect()
    }

    /// Store a decoded value. Returns `None` if the entity is unknown.
    pub fn update_value(&self, name: &str, value: f32) -> Option<VariableUpdate> {
        self.entities
            .write()
            .get_mut(name)
            .map(|entity| entity.apply(value))
    }

    /// Build an address registry covering every entity in the store.
    pub fn registry(&self) -> AddressRegistry {
        let mut registry = AddressRegistry::new();
        for (name, entity) in self.entities.read().iter() {
            registry.register(name.clone(), entity.address);
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}
