//! Error taxonomy shared by every component of the control plane.

use thiserror::Error;

/// All error kinds the control plane can produce, grouped by the six kinds
/// the design calls out: configuration, planning, routing, state-machine
/// violation, transport, and timeout.
#[derive(Error, Debug)]
pub enum FleetError {
    /// Malformed or missing configuration; fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The planner could not find a path (or the whole prioritized batch
    /// failed). Not fatal — surfaces as a failure response.
    #[error("no path found from node {from} to node {to}")]
    NoPath { from: u32, to: u32 },

    /// A prioritized multi-robot plan was aborted because some robot in the
    /// batch (identified by its position in the priority order) has no path.
    #[error("prioritized plan aborted: robot at priority index {index} has no path")]
    PrioritizedPlanFailed { index: usize },

    /// Reference to an id that doesn't exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// An inbound event doesn't match the active sub-operation of its task.
    #[error("state-machine violation: {0}")]
    StateViolation(String),

    /// A publish/send on the transport boundary failed; caller should retry
    /// on the next tick rather than treat this as fatal.
    #[error("transport error: {0}")]
    Transport(String),

    /// A robot failed to report arrival within its deadline.
    #[error("robot {0} timed out waiting for arrival")]
    Timeout(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FleetError {
    pub fn robot_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound { entity: "robot", id: id.to_string() }
    }

    pub fn task_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound { entity: "task", id: id.to_string() }
    }

    pub fn shelf_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound { entity: "shelf", id: id.to_string() }
    }

    pub fn node_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound { entity: "node", id: id.to_string() }
    }

    pub fn item_not_found(item: impl std::fmt::Display) -> Self {
        Self::NotFound { entity: "item", id: item.to_string() }
    }
}

/// Result alias used throughout the control plane.
pub type FleetResult<T> = Result<T, FleetError>;
