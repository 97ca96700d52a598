//! The per-robot state machine and event dispatch loop.

use crate::event::{BatchTaskSpec, InboundEvent, OutboundEvent};
use fleet_core::{FleetError, NodeId, RobotId, ShelfId, TaskId};
use fleet_map::WarehouseMap;
use fleet_planner::{self as planner, TimedPath};
use fleet_robots::{RobotRegistry, RobotStatus};
use fleet_shelves::ShelfRegistry;
use fleet_tasks::{PickOutcome, SubTaskKind, TaskStore};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::Sender as BroadcastSender;

/// Default per-arrival timeout: 10 seconds per node of the issued path.
const SECONDS_PER_NODE_TIMEOUT: u64 = 10;

/// Owns every registry and is the single serialization point for all
/// mutation: single-threaded cooperative, no locks needed.
pub struct Orchestrator {
    map: WarehouseMap,
    shelves: ShelfRegistry,
    tasks: TaskStore,
    robots: RobotRegistry,
    outbound: BroadcastSender<OutboundEvent>,
    deadlines: HashMap<RobotId, Instant>,
    /// The motion plan last issued to each currently-moving robot, re-emitted
    /// on every tick for stateless motion controllers.
    last_plan: HashMap<RobotId, OutboundEvent>,
}

impl Orchestrator {
    pub fn new(
        map: WarehouseMap,
        shelves: ShelfRegistry,
        robots: RobotRegistry,
        outbound: BroadcastSender<OutboundEvent>,
    ) -> Self {
        Self { map, shelves, tasks: TaskStore::new(), robots, outbound, deadlines: HashMap::new(), last_plan: HashMap::new() }
    }

    fn emit(&self, event: OutboundEvent) {
        // No subscribers connected yet (or all have dropped) is a normal
        // quiet period, not an error; there's nothing useful to do with it.
        let _ = self.outbound.send(event);
    }

    /// Processes one inbound event to completion. A single event's failure
    /// never poisons the loop: every branch is guarded and unexpected
    /// errors become an `Error` outbound event rather than a panic or an
    /// unhandled rejection.
    pub fn dispatch(&mut self, event: InboundEvent) {
        let result = match event {
            InboundEvent::BatchSubmit(tasks) => {
                self.on_batch_submit(tasks);
                Ok(())
            }
            InboundEvent::LegacyPlanRequest { robot, from_node, to_node } => {
                self.on_legacy_plan_request(robot, from_node, to_node)
            }
            InboundEvent::Arrived { robot, node } => self.on_arrived(robot, node),
            InboundEvent::ItemPicked { task_id, item } => self.on_item_picked(task_id, &item),
            InboundEvent::StatusUpdate { robot, node } => self.on_status_update(robot, node),
            InboundEvent::StatusRequest => {
                self.emit(OutboundEvent::StatusReport(self.fleet_status_summary()));
                Ok(())
            }
            InboundEvent::TaskStatusRequest { task_id } => {
                self.emit(OutboundEvent::StatusReport(self.task_status_summary(task_id)));
                Ok(())
            }
            InboundEvent::ShelfStatusRequest => {
                self.emit(OutboundEvent::StatusReport(self.shelf_status_summary()));
                Ok(())
            }
            InboundEvent::Tick => {
                self.check_timeouts();
                self.reissue_motion_targets();
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "event dispatch failed");
            self.emit(OutboundEvent::Error(e.to_string()));
        }
    }

    fn on_batch_submit(&mut self, specs: Vec<BatchTaskSpec>) {
        for spec in specs {
            let task_id = spec.task_id;
            match self.tasks.create_task(task_id, spec.station_node, spec.items, &self.shelves, &self.map) {
                Ok(()) => tracing::info!(task = task_id.0, "task created"),
                Err(e) => {
                    tracing::warn!(task = task_id.0, error = %e, "task rejected");
                    self.emit(OutboundEvent::TaskRejected { task_id, reason: e.to_string() });
                }
            }
        }
        self.try_assign_pending();
    }

    /// Scans pending tasks in submission order, binding each to the nearest
    /// idle robot, until no idle robot or no pending task remains.
    fn try_assign_pending(&mut self) {
        loop {
            let Some(task_id) = self.tasks.next_pending() else { break };
            let station = self.tasks.get(task_id).unwrap().station_node;
            let Some(robot) = self.robots.available(station, &self.map) else { break };
            if let Err(e) = self.dispatch_task_to_robot(task_id, robot) {
                tracing::warn!(task = task_id.0, robot = robot.0, error = %e, "assignment failed");
                self.emit(OutboundEvent::Error(e.to_string()));
                break;
            }
        }
    }

    fn dispatch_task_to_robot(&mut self, task_id: TaskId, robot: RobotId) -> Result<(), FleetError> {
        self.tasks.start(task_id, robot)?;
        self.robots.assign(robot, task_id, RobotStatus::MovingToShelf)?;
        let target = self.tasks.get(task_id).unwrap().current_subtask().unwrap().target_node;
        self.move_robot(robot, target)
    }

    /// Plans and publishes a motion command for `robot` to `target`, and
    /// arms the arrival timeout.
    fn move_robot(&mut self, robot: RobotId, target: NodeId) -> Result<(), FleetError> {
        let current = self.robots.get(robot).ok_or_else(|| FleetError::robot_not_found(robot.0))?.current_node;
        let path = planner::plan_single(&self.map, current, target)?;
        self.arm_timeout(robot, &path);
        let plan = OutboundEvent::MotionPlan {
            robot,
            node_path: path.compress(),
            timed_path: path.states.clone(),
        };
        self.last_plan.insert(robot, plan.clone());
        self.emit(plan);
        Ok(())
    }

    fn arm_timeout(&mut self, robot: RobotId, path: &TimedPath) {
        let len = path.states.len().max(1) as u64;
        self.deadlines.insert(robot, Instant::now() + Duration::from_secs(SECONDS_PER_NODE_TIMEOUT * len));
    }

    fn check_timeouts(&mut self) {
        let now = Instant::now();
        let expired: Vec<RobotId> = self
            .deadlines
            .iter()
            .filter(|(_, &deadline)| now > deadline)
            .map(|(&r, _)| r)
            .collect();
        for robot in expired {
            self.deadlines.remove(&robot);
            self.last_plan.remove(&robot);
            if self.robots.set_status(robot, RobotStatus::Error).is_ok() {
                tracing::error!(robot = robot.0, "robot timed out waiting for arrival");
                self.emit(OutboundEvent::Error(FleetError::Timeout(robot.0).to_string()));
            }
        }
    }

    /// 1 Hz heartbeat: re-publishes each currently-moving robot's last
    /// motion target, since the motion fabric expects an idempotent repeat
    /// rather than silence between plans.
    fn reissue_motion_targets(&self) {
        for plan in self.last_plan.values() {
            self.emit(plan.clone());
        }
    }

    /// Legacy compatibility path (`task_request`): bypasses the task/shelf
    /// lifecycle entirely, just a bare point-to-point plan.
    fn on_legacy_plan_request(&mut self, robot: RobotId, from_node: NodeId, to_node: NodeId) -> Result<(), FleetError> {
        self.robots.update_position(robot, from_node)?;
        self.move_robot(robot, to_node)
    }

    fn on_status_update(&mut self, robot: RobotId, node: Option<NodeId>) -> Result<(), FleetError> {
        if let Some(node) = node {
            self.robots.update_position(robot, node)?;
        }
        Ok(())
    }

    /// Drives one robot's sub-operation forward on arrival, per its current
    /// sub-operation kind.
    fn on_arrived(&mut self, robot: RobotId, node: NodeId) -> Result<(), FleetError> {
        self.robots.update_position(robot, node)?;
        self.deadlines.remove(&robot);
        self.last_plan.remove(&robot);

        let Some(task_id) = self.robots.get(robot).and_then(|r| r.current_task) else {
            return Ok(()); // no active task; just a position update
        };
        let kind = self
            .tasks
            .get(task_id)
            .and_then(|t| t.current_subtask())
            .ok_or_else(|| FleetError::StateViolation(format!("task {task_id} has no active sub-operation")))?
            .kind;

        match kind {
            SubTaskKind::GoToShelf => self.on_arrived_at_shelf(robot, task_id, node),
            SubTaskKind::Deliver => self.on_arrived_at_station(robot, task_id, node),
            SubTaskKind::Return => self.on_arrived_returning(robot, task_id, node),
            SubTaskKind::Forward => self.on_arrived_forwarding(robot, task_id, node),
            SubTaskKind::Lift | SubTaskKind::WaitPick => Err(FleetError::StateViolation(format!(
                "robot {robot} reported arrival while task {task_id} is in a non-motion sub-operation"
            ))),
        }
    }

    fn on_arrived_at_shelf(&mut self, robot: RobotId, task_id: TaskId, node: NodeId) -> Result<(), FleetError> {
        let shelf_id = self.tasks.get(task_id).unwrap().current_subtask().unwrap().shelf_id;
        self.shelves.mark_picked_up(shelf_id, robot)?;
        self.robots.set_carrying(robot, Some(shelf_id))?;
        self.robots.set_status(robot, RobotStatus::Lifting)?;
        self.emit(OutboundEvent::ShelfLift { robot, shelf: shelf_id });

        // LIFT is synthetic in the message-driven core: it completes
        // immediately once the lift command is issued.
        let task = self.tasks.get_mut(task_id)?;
        task.advance(); // GO_TO_SHELF -> LIFT
        task.advance(); // LIFT -> DELIVER
        let station = task.current_subtask().unwrap().target_node;

        self.robots.set_status(robot, RobotStatus::Delivering)?;
        let _ = node;
        self.move_robot(robot, station)
    }

    fn on_arrived_at_station(&mut self, robot: RobotId, task_id: TaskId, node: NodeId) -> Result<(), FleetError> {
        let shelf_id = self.tasks.get(task_id).unwrap().current_subtask().unwrap().shelf_id;
        self.shelves.mark_at_station(shelf_id, node)?;
        self.robots.set_status(robot, RobotStatus::WaitPick)?;
        self.emit(OutboundEvent::ShelfAtStation { shelf: shelf_id, station: node });
        // DELIVER -> WAIT_PICK: the shelf is parked, now waiting on pick_complete events.
        self.tasks.get_mut(task_id)?.advance();
        Ok(())
    }

    fn on_arrived_returning(&mut self, robot: RobotId, task_id: TaskId, node: NodeId) -> Result<(), FleetError> {
        let shelf_id = self.tasks.get(task_id).unwrap().current_subtask().unwrap().shelf_id;
        self.shelves.mark_returned(shelf_id, node)?;
        self.robots.set_carrying(robot, None)?;
        self.emit(OutboundEvent::ShelfLower { robot, shelf: shelf_id });
        self.advance_after_shelf_visit(robot, task_id)
    }

    /// A FORWARD arrival hands the carried shelf to a different task's
    /// pending pick. The original task's chain is only bookkept forward
    /// here (its visit to this shelf is over); the robot itself stops
    /// serving it and starts serving the task it forwarded to, since it's
    /// now parked at that task's station holding the shelf it needs.
    fn on_arrived_forwarding(&mut self, robot: RobotId, task_id: TaskId, node: NodeId) -> Result<(), FleetError> {
        let sub = self.tasks.get(task_id).unwrap().current_subtask().unwrap().clone();
        self.shelves.mark_at_station(sub.shelf_id, node)?;
        self.emit(OutboundEvent::ShelfAtStation { shelf: sub.shelf_id, station: node });

        let forward_task = sub
            .forward_task
            .ok_or_else(|| FleetError::StateViolation(format!("task {task_id}'s FORWARD has no target task")))?;

        let original = self.tasks.get_mut(task_id)?;
        original.advance();
        if original.is_done() {
            self.emit(OutboundEvent::TaskComplete { task_id });
        }

        self.tasks.begin_forwarded_service(forward_task, sub.shelf_id, robot)?;
        self.robots.reassign_current(robot, forward_task, RobotStatus::WaitPick)?;
        Ok(())
    }

    /// Common tail of RETURN/FORWARD arrival: this task's visit to the
    /// shelf is over; move on to the next shelf or finish the task.
    fn advance_after_shelf_visit(&mut self, robot: RobotId, task_id: TaskId) -> Result<(), FleetError> {
        let task = self.tasks.get_mut(task_id)?;
        task.advance();
        if task.is_done() {
            self.emit(OutboundEvent::TaskComplete { task_id });
            if let Some(next_task) = self.robots.complete(robot)? {
                let target = self.tasks.get(next_task).unwrap().current_subtask().unwrap().target_node;
                self.robots.set_status(robot, RobotStatus::MovingToShelf)?;
                self.move_robot(robot, target)?;
            }
            self.try_assign_pending();
            Ok(())
        } else {
            let target = self.tasks.get(task_id).unwrap().current_subtask().unwrap().target_node;
            self.robots.set_status(robot, RobotStatus::MovingToShelf)?;
            self.move_robot(robot, target)
        }
    }

    fn on_item_picked(&mut self, task_id: TaskId, item: &str) -> Result<(), FleetError> {
        let outcome = self.tasks.handle_item_picked(task_id, item, &self.shelves, &self.map)?;
        match outcome {
            PickOutcome::ContinuePicking { .. } => {}
            PickOutcome::Return { .. } | PickOutcome::Forward { .. } => {
                let robot = self
                    .tasks
                    .get(task_id)
                    .and_then(|t| t.assigned_robot)
                    .ok_or_else(|| FleetError::StateViolation(format!("task {task_id} has no assigned robot")))?;
                let target = self.tasks.get(task_id).unwrap().current_subtask().unwrap().target_node;
                let next_status = if matches!(outcome, PickOutcome::Forward { .. }) {
                    RobotStatus::Forwarding
                } else {
                    RobotStatus::Returning
                };
                self.robots.set_status(robot, next_status)?;
                self.move_robot(robot, target)?;
            }
            PickOutcome::TaskComplete => {
                self.emit(OutboundEvent::TaskComplete { task_id });
                if let Some(robot) = self.tasks.get(task_id).and_then(|t| t.assigned_robot) {
                    if let Some(next_task) = self.robots.complete(robot)? {
                        let target = self.tasks.get(next_task).unwrap().current_subtask().unwrap().target_node;
                        self.robots.set_status(robot, RobotStatus::MovingToShelf)?;
                        self.move_robot(robot, target)?;
                    }
                }
                self.try_assign_pending();
            }
        }
        Ok(())
    }

    fn fleet_status_summary(&self) -> String {
        let idle = self.robots.all().filter(|r| r.status == RobotStatus::Idle).count();
        let total = self.robots.all().count();
        format!("{idle}/{total} robots idle")
    }

    fn task_status_summary(&self, task_id: TaskId) -> String {
        match self.tasks.get(task_id) {
            Some(t) => format!("task {task_id}: {:?} (cursor {}/{})", t.status, t.cursor, t.subtasks.len()),
            None => format!("task {task_id}: not found"),
        }
    }

    fn shelf_status_summary(&self) -> String {
        let at_rest = self.shelves.all().filter(|s| s.status == fleet_shelves::ShelfStatus::AtRest).count();
        let total = self.shelves.all().count();
        format!("{at_rest}/{total} shelves at rest")
    }
}
