//! Map & Graph Store: the warehouse grid graph and its config loading.

mod config;
mod graph;

pub use config::{EdgeEntry, MapConfig, MapConfigError, NodeEntry};
pub use graph::{Edge, Node, WarehouseMap};
