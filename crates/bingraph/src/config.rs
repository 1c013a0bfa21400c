use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use bingraph_binary::ByteOrder;
use bingraph_legacy::{ConfiguredDefaults, DefaultValue, LegacyMemberMapping, LegacyTypeHandlerCreator};
use bingraph_storer::{StorerConfig, StorerMode};
use bingraph_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, PersistenceResult};

/// Configuration of one persistence context.
///
/// ```toml
/// switch_byte_order = false
/// object_id_start = 1000000000000000000
///
/// [storer]
/// mode = "eager"
/// initial_capacity = 256
///
/// [legacy]
/// strict_defaults = false
///
/// [legacy.mappings.Point]
/// renames = { y = "z" }
/// discards = ["w"]
///
/// [legacy.defaults.Point]
/// z = 0
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Write and read big-endian instead of the native little-endian.
    pub switch_byte_order: bool,
    /// First object id handed out by the id provider.
    pub object_id_start: u64,
    pub storer: StorerSettings,
    pub legacy: LegacySettings,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorerSettings {
    pub mode: StorerMode,
    pub initial_capacity: usize,
}

/// How records of outdated type shapes are mapped onto current types.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacySettings {
    /// Fail instead of zero-filling members without a configured default.
    pub strict_defaults: bool,
    /// Per type name refactoring mappings.
    pub mappings: HashMap<String, LegacyMemberMapping>,
    /// Per type name, per member defaults for members old records lack.
    pub defaults: HashMap<String, HashMap<String, DefaultValue>>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            switch_byte_order: false,
            object_id_start: ObjectId::DEFAULT_START.value(),
            storer: StorerSettings::default(),
            legacy: LegacySettings::default(),
        }
    }
}

impl Default for StorerSettings {
    fn default() -> Self {
        let defaults = StorerConfig::default();
        Self {
            mode: defaults.mode,
            initial_capacity: defaults.initial_capacity,
        }
    }
}

impl PersistenceConfig {
    pub fn from_toml_str(text: &str) -> PersistenceResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> PersistenceResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> PersistenceResult<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn validate(&self) -> PersistenceResult<()> {
        if !self.object_id_start().is_proper() {
            return Err(PersistenceError::InvalidConfig(format!(
                "object_id_start {} is reserved",
                self.object_id_start
            )));
        }
        Ok(())
    }

    pub fn byte_order(&self) -> ByteOrder {
        ByteOrder::from_switch(self.switch_byte_order)
    }

    pub fn object_id_start(&self) -> ObjectId {
        ObjectId::new(self.object_id_start)
    }

    pub fn storer_config(&self) -> StorerConfig {
        StorerConfig {
            mode: self.storer.mode,
            initial_capacity: self.storer.initial_capacity,
            byte_order: self.byte_order(),
        }
    }

    /// A legacy handler creator with the configured mappings and defaults.
    pub fn legacy_creator(&self) -> LegacyTypeHandlerCreator {
        let defaults = ConfiguredDefaults {
            values: self.legacy.defaults.clone(),
            strict: self.legacy.strict_defaults,
        };
        LegacyTypeHandlerCreator::new()
            .with_mappings(self.legacy.mappings.clone())
            .with_default_policy(Arc::new(defaults))
    }
}
