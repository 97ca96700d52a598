//! JSON loading for the shelves configuration file.

use crate::registry::ShelfRegistry;
use fleet_core::{NodeId, ShelfId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShelvesConfigError {
    #[error("failed to read shelves config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse shelves config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShelfEntry {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct WorkstationEntry {
    #[serde(default)]
    pub label: Option<String>,
}

/// Shape of the `shelves` configuration file: shelves keyed by home node id,
/// workstations keyed by station node id.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShelvesConfig {
    pub shelves: HashMap<String, ShelfEntry>,
    #[serde(default)]
    pub workstations: HashMap<String, WorkstationEntry>,
}

impl ShelvesConfig {
    pub fn from_file(path: &str) -> Result<Self, ShelvesConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn from_json(content: &str) -> Result<Self, ShelvesConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn build_registry(&self) -> ShelfRegistry {
        let mut registry = ShelfRegistry::new();
        for (id_str, entry) in &self.shelves {
            let Ok(node_id) = id_str.parse::<u32>() else { continue };
            let label = entry.label.clone().unwrap_or_else(|| format!("S{node_id}"));
            registry.add_shelf(ShelfId(node_id), label, entry.items.clone(), NodeId(node_id));
        }
        registry
    }

    pub fn workstation_nodes(&self) -> Vec<NodeId> {
        self.workstations
            .keys()
            .filter_map(|s| s.parse::<u32>().ok())
            .map(NodeId)
            .collect()
    }
}
