//! The event alphabet the Orchestrator consumes and emits.

use fleet_core::{NodeId, RobotId, ShelfId, TaskId};

/// One task in an inbound batch submission.
#[derive(Debug, Clone)]
pub struct BatchTaskSpec {
    pub task_id: TaskId,
    pub station_node: NodeId,
    pub items: Vec<String>,
}

/// Inbound events, merged from whatever transport received them.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    BatchSubmit(Vec<BatchTaskSpec>),
    /// The legacy single-robot `task_request`: a bare point-to-point plan
    /// that bypasses the task/shelf lifecycle entirely (kept for backward
    /// compatibility with older operator clients).
    LegacyPlanRequest { robot: RobotId, from_node: NodeId, to_node: NodeId },
    Arrived { robot: RobotId, node: NodeId },
    ItemPicked { task_id: TaskId, item: String },
    StatusUpdate { robot: RobotId, node: Option<NodeId> },
    StatusRequest,
    TaskStatusRequest { task_id: TaskId },
    ShelfStatusRequest,
    Tick,
}

/// Outbound effects the Orchestrator asks the Transport Adapter to deliver.
/// The Orchestrator never touches a socket or an MQTT client directly —
/// these are handed to whatever sink is wired up at startup.
#[derive(Debug, Clone)]
pub enum OutboundEvent {
    /// Publish a motion plan for one robot: distinct-node path plus the
    /// full timed path, for the motion fabric's `/agv/plan` topic.
    MotionPlan { robot: RobotId, node_path: Vec<NodeId>, timed_path: Vec<(NodeId, u32)> },
    /// `/agv/shelf_cmd` "pickup".
    ShelfLift { robot: RobotId, shelf: ShelfId },
    /// `/agv/shelf_cmd` "putdown".
    ShelfLower { robot: RobotId, shelf: ShelfId },
    /// Broadcast: a task finished every sub-operation.
    TaskComplete { task_id: TaskId },
    /// Broadcast: a shelf arrived at a pick station.
    ShelfAtStation { shelf: ShelfId, station: NodeId },
    /// Reply to a task/shelf/status request.
    StatusReport(String),
    /// A batch-submitted task was rejected (e.g. unknown item).
    TaskRejected { task_id: TaskId, reason: String },
    /// Something failed in a way the caller should know about but that
    /// didn't warrant a robot entering ERROR.
    Error(String),
}
