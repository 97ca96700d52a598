//! Wire schema for the operator WebSocket channel and the conversions
//! to/from the orchestrator's internal event alphabet.

use fleet_core::{NodeId, RobotId, TaskId};
use fleet_orchestrator::{BatchTaskSpec, InboundEvent, OutboundEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    BatchTaskRequest { tasks: Vec<WireTask> },
    /// Legacy single-task compatibility shape.
    TaskRequest { worker_id: u32, worker_marker: u32, shelf_marker: u32 },
    PickComplete { task_id: u32, item: String, #[serde(default)] workstation_id: Option<u32> },
    RobotArrived { rid: u32, node: u32 },
    RobotStatus { rid: u32, #[serde(default)] current_node: Option<u32>, #[serde(default)] status: Option<String> },
    StatusRequest,
    TaskStatusRequest { task_id: u32 },
    ShelfStatusRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireTask {
    pub task_id: u32,
    pub workstation_id: u32,
    pub items: Vec<String>,
}

impl From<InboundMessage> for InboundEvent {
    fn from(msg: InboundMessage) -> Self {
        match msg {
            InboundMessage::BatchTaskRequest { tasks } => InboundEvent::BatchSubmit(
                tasks
                    .into_iter()
                    .map(|t| BatchTaskSpec {
                        task_id: TaskId::from(t.task_id),
                        station_node: NodeId::from(t.workstation_id),
                        items: t.items,
                    })
                    .collect(),
            ),
            InboundMessage::TaskRequest { worker_id, worker_marker, shelf_marker } => {
                InboundEvent::LegacyPlanRequest {
                    robot: RobotId::from(worker_id),
                    from_node: NodeId::from(worker_marker),
                    to_node: NodeId::from(shelf_marker),
                }
            }
            InboundMessage::PickComplete { task_id, item, .. } => {
                InboundEvent::ItemPicked { task_id: TaskId::from(task_id), item }
            }
            InboundMessage::RobotArrived { rid, node } => {
                InboundEvent::Arrived { robot: RobotId::from(rid), node: NodeId::from(node) }
            }
            InboundMessage::RobotStatus { rid, current_node, .. } => InboundEvent::StatusUpdate {
                robot: RobotId::from(rid),
                node: current_node.map(NodeId::from),
            },
            InboundMessage::StatusRequest => InboundEvent::StatusRequest,
            InboundMessage::TaskStatusRequest { task_id } => {
                InboundEvent::TaskStatusRequest { task_id: TaskId::from(task_id) }
            }
            InboundMessage::ShelfStatusRequest => InboundEvent::ShelfStatusRequest,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    MotionPlan { robot: u32, node_path: Vec<u32>, timed_path: Vec<WireTimedStep> },
    ShelfLift { robot: u32, shelf: u32 },
    ShelfLower { robot: u32, shelf: u32 },
    TaskComplete { task_id: u32 },
    ShelfAtStation { shelf: u32, station: u32 },
    StatusReport { message: String },
    TaskRejected { task_id: u32, reason: String },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct WireTimedStep {
    pub node: u32,
    pub t: u32,
}

impl From<OutboundEvent> for OutboundMessage {
    fn from(event: OutboundEvent) -> Self {
        match event {
            OutboundEvent::MotionPlan { robot, node_path, timed_path } => OutboundMessage::MotionPlan {
                robot: robot.0,
                node_path: node_path.into_iter().map(|n| n.0).collect(),
                timed_path: timed_path.into_iter().map(|(n, t)| WireTimedStep { node: n.0, t }).collect(),
            },
            OutboundEvent::ShelfLift { robot, shelf } => OutboundMessage::ShelfLift { robot: robot.0, shelf: shelf.0 },
            OutboundEvent::ShelfLower { robot, shelf } => {
                OutboundMessage::ShelfLower { robot: robot.0, shelf: shelf.0 }
            }
            OutboundEvent::TaskComplete { task_id } => OutboundMessage::TaskComplete { task_id: task_id.0 },
            OutboundEvent::ShelfAtStation { shelf, station } => {
                OutboundMessage::ShelfAtStation { shelf: shelf.0, station: station.0 }
            }
            OutboundEvent::StatusReport(message) => OutboundMessage::StatusReport { message },
            OutboundEvent::TaskRejected { task_id, reason } => {
                OutboundMessage::TaskRejected { task_id: task_id.0, reason }
            }
            OutboundEvent::Error(message) => OutboundMessage::Error { message },
        }
    }
}

/// Motion fabric wire shapes (MQTT). These travel over `/agv/plan`,
/// `/agv/shelf_cmd`, `/agv/state`, `/agv/arrived` rather than the operator
/// WebSocket.
#[derive(Debug, Clone, Serialize)]
pub struct MqttPlanRobot {
    pub rid: u32,
    pub start: u32,
    pub goal: u32,
    pub node_path: Vec<u32>,
    pub timed_path: Vec<WireTimedStep>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MqttPlan {
    pub job_id: String,
    pub planner: &'static str,
    pub robots: Vec<MqttPlanRobot>,
    pub speed: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MqttShelfCommand {
    Pickup { rid: u32, shelf_id: u32 },
    Putdown { rid: u32, shelf_id: u32 },
}

/// Per-tick low-level drive setpoint. The control plane models motion only
/// at the grid/node level, so `w` is always 0 and `v` is the configured
/// cruise speed; the on-robot controller this is addressed to is
/// responsible for translating `target_node` into actual wheel commands.
#[derive(Debug, Clone, Serialize)]
pub struct MqttLowCmd {
    pub rid: u32,
    pub v: f64,
    pub w: f64,
    pub target_node: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttRobotState {
    pub rid: u32,
    pub current_node: u32,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub ts: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttRobotArrived {
    pub rid: u32,
    pub node: u32,
    #[serde(default)]
    pub ts: Option<f64>,
}

pub fn shelf_command_for(event: &OutboundEvent) -> Option<MqttShelfCommand> {
    match event {
        OutboundEvent::ShelfLift { robot, shelf } => {
            Some(MqttShelfCommand::Pickup { rid: robot.0, shelf_id: shelf.0 })
        }
        OutboundEvent::ShelfLower { robot, shelf } => {
            Some(MqttShelfCommand::Putdown { rid: robot.0, shelf_id: shelf.0 })
        }
        _ => None,
    }
}

/// The immediate next waypoint on a motion plan, for `/agv/lowcmd`.
/// `node_path` starts at the robot's current node, so the drive target is
/// the second entry when present, or the lone entry if the robot has
/// already arrived and is just holding position.
pub fn lowcmd_for(event: &OutboundEvent, speed: f64) -> Option<MqttLowCmd> {
    match event {
        OutboundEvent::MotionPlan { robot, node_path, .. } => {
            let target = node_path.get(1).or_else(|| node_path.first())?;
            Some(MqttLowCmd { rid: robot.0, v: speed, w: 0.0, target_node: target.0 })
        }
        _ => None,
    }
}

pub fn plan_for(event: &OutboundEvent, job_id: &str, speed: f64) -> Option<MqttPlan> {
    match event {
        OutboundEvent::MotionPlan { robot, node_path, timed_path } => Some(MqttPlan {
            job_id: job_id.to_string(),
            planner: "prioritized_astar_with_time_on_graph",
            robots: vec![MqttPlanRobot {
                rid: robot.0,
                start: node_path.first().map(|n| n.0).unwrap_or_default(),
                goal: node_path.last().map(|n| n.0).unwrap_or_default(),
                node_path: node_path.iter().map(|n| n.0).collect(),
                timed_path: timed_path.iter().map(|&(n, t)| WireTimedStep { node: n.0, t }).collect(),
            }],
            speed,
        }),
        _ => None,
    }
}
