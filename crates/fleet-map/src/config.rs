//! JSON loading for the map configuration file.

use crate::graph::{Edge, Node, WarehouseMap};
use fleet_core::{FleetResult, NodeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapConfigError {
    #[error("failed to read map config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse map config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("map config error: {0}")]
    Build(#[from] fleet_core::FleetError),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeEntry {
    pub id: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EdgeEntry {
    pub from: u32,
    pub to: u32,
    pub cost: f64,
}

/// Shape of the `map` configuration file: `{nodes: [...], edges: [...]}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MapConfig {
    pub nodes: Vec<NodeEntry>,
    pub edges: Vec<EdgeEntry>,
}

impl MapConfig {
    pub fn from_file(path: &str) -> Result<Self, MapConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn from_json(content: &str) -> Result<Self, MapConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn build_map(&self) -> FleetResult<WarehouseMap> {
        let nodes = self
            .nodes
            .iter()
            .map(|n| Node { id: NodeId(n.id), x: n.x, y: n.y })
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|e| Edge { from: NodeId(e.from), to: NodeId(e.to), cost: e.cost })
            .collect();
        WarehouseMap::build(nodes, edges)
    }
}
