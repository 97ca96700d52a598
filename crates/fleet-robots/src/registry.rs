//! Robot Registry: per-AGV state and task queue.

use fleet_core::{FleetError, FleetResult, NodeId, RobotId, ShelfId, TaskId};
use fleet_map::WarehouseMap;
use std::collections::{HashMap, VecDeque};

/// Per-robot state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RobotStatus {
    #[default]
    Idle,
    MovingToShelf,
    Lifting,
    Delivering,
    WaitPick,
    Returning,
    Forwarding,
    Error,
}

#[derive(Debug, Clone)]
pub struct Robot {
    pub id: RobotId,
    pub name: String,
    pub home_node: NodeId,
    pub current_node: NodeId,
    pub status: RobotStatus,
    pub carrying_shelf: Option<ShelfId>,
    pub current_task: Option<TaskId>,
    pub task_queue: VecDeque<TaskId>,
}

impl Robot {
    fn new(id: RobotId, name: String, home_node: NodeId) -> Self {
        Self {
            id,
            name,
            home_node,
            current_node: home_node,
            status: RobotStatus::Idle,
            carrying_shelf: None,
            current_task: None,
            task_queue: VecDeque::new(),
        }
    }
}

pub struct RobotRegistry {
    robots: HashMap<RobotId, Robot>,
}

impl RobotRegistry {
    pub fn new() -> Self {
        Self { robots: HashMap::new() }
    }

    pub fn add_robot(&mut self, id: RobotId, name: String, home_node: NodeId) {
        self.robots.insert(id, Robot::new(id, name, home_node));
    }

    pub fn get(&self, id: RobotId) -> Option<&Robot> {
        self.robots.get(&id)
    }

    pub fn get_mut(&mut self, id: RobotId) -> FleetResult<&mut Robot> {
        self.robots.get_mut(&id).ok_or_else(|| FleetError::robot_not_found(id.0))
    }

    pub fn all(&self) -> impl Iterator<Item = &Robot> {
        self.robots.values()
    }

    /// The idle robot whose current node is closest (planner heuristic) to
    /// `target_node`. None if every robot is busy.
    pub fn available(&self, target_node: NodeId, map: &WarehouseMap) -> Option<RobotId> {
        self.robots
            .values()
            .filter(|r| r.status == RobotStatus::Idle)
            .min_by(|a, b| {
                map.heuristic(a.current_node, target_node)
                    .partial_cmp(&map.heuristic(b.current_node, target_node))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|r| r.id)
    }

    /// Binds a task to a robot. If the robot is idle, it becomes active on
    /// this task immediately; otherwise the task is queued behind whatever
    /// it's already doing.
    pub fn assign(&mut self, rid: RobotId, task_id: TaskId, first_status: RobotStatus) -> FleetResult<()> {
        let robot = self.get_mut(rid)?;
        if robot.status == RobotStatus::Idle {
            robot.current_task = Some(task_id);
            robot.status = first_status;
        } else {
            robot.task_queue.push_back(task_id);
        }
        Ok(())
    }

    /// Force-rebinds a robot's current task and status without touching its
    /// queue — used when a shelf the robot is already carrying is handed
    /// off to a different task mid-flight (the forwarding policy, spec
    /// §4.4), which isn't a normal idle-robot assignment.
    pub fn reassign_current(&mut self, rid: RobotId, task_id: TaskId, status: RobotStatus) -> FleetResult<()> {
        let robot = self.get_mut(rid)?;
        robot.current_task = Some(task_id);
        robot.status = status;
        Ok(())
    }

    /// Clears the robot's current task. If another task is queued, it
    /// becomes current (caller is responsible for dispatching its first
    /// sub-operation); otherwise the robot goes idle.
    pub fn complete(&mut self, rid: RobotId) -> FleetResult<Option<TaskId>> {
        let robot = self.get_mut(rid)?;
        robot.current_task = None;
        robot.carrying_shelf = None;
        if let Some(next) = robot.task_queue.pop_front() {
            robot.current_task = Some(next);
            Ok(Some(next))
        } else {
            robot.status = RobotStatus::Idle;
            Ok(None)
        }
    }

    pub fn update_position(&mut self, rid: RobotId, node: NodeId) -> FleetResult<()> {
        self.get_mut(rid)?.current_node = node;
        Ok(())
    }

    pub fn set_status(&mut self, rid: RobotId, status: RobotStatus) -> FleetResult<()> {
        self.get_mut(rid)?.status = status;
        Ok(())
    }

    pub fn set_carrying(&mut self, rid: RobotId, shelf: Option<ShelfId>) -> FleetResult<()> {
        self.get_mut(rid)?.carrying_shelf = shelf;
        Ok(())
    }
}

impl Default for RobotRegistry {
    fn default() -> Self {
        Self::new()
    }
}
