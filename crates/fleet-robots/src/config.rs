//! JSON loading for the robots configuration file.

use crate::registry::RobotRegistry;
use fleet_core::{NodeId, RobotId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RobotsConfigError {
    #[error("failed to read robots config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse robots config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotEntry {
    pub name: String,
    pub home_node: u32,
}

/// Shape of the `robots` configuration file: robots keyed by their id.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotsConfig {
    pub robots: HashMap<String, RobotEntry>,
}

impl RobotsConfig {
    pub fn from_file(path: &str) -> Result<Self, RobotsConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn from_json(content: &str) -> Result<Self, RobotsConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn build_registry(&self) -> RobotRegistry {
        let mut registry = RobotRegistry::new();
        for (id_str, entry) in &self.robots {
            let Ok(rid) = id_str.parse::<u32>() else { continue };
            registry.add_robot(RobotId(rid), entry.name.clone(), NodeId(entry.home_node));
        }
        registry
    }
}
