//! Task decomposition data model.

use fleet_core::{NodeId, RobotId, ShelfId, TaskId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubTaskKind {
    GoToShelf,
    Lift,
    Deliver,
    WaitPick,
    Return,
    Forward,
}

#[derive(Debug, Clone)]
pub struct SubTask {
    pub kind: SubTaskKind,
    pub shelf_id: ShelfId,
    pub target_node: NodeId,
    pub items_to_pick: Vec<String>,
    /// Set only when `kind == Forward`: the task whose pending pick this
    /// shelf is being handed off to, so the orchestrator can reassign the
    /// carrying robot's service to it on arrival without re-deriving it.
    pub forward_task: Option<TaskId>,
}

impl SubTask {
    fn new(kind: SubTaskKind, shelf_id: ShelfId, target_node: NodeId) -> Self {
        Self { kind, shelf_id, target_node, items_to_pick: Vec::new(), forward_task: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Active,
    Done,
    Failed,
}

/// Builds the five-subtask chain for one shelf visit within a task:
/// GO_TO_SHELF -> LIFT -> DELIVER -> WAIT_PICK -> RETURN (the RETURN kind
/// and target are provisional; resolved at pick-completion time).
fn build_chain(shelf_id: ShelfId, station_node: NodeId, items_on_shelf: Vec<String>) -> Vec<SubTask> {
    let shelf_node = NodeId(shelf_id.0);
    let mut wait_pick = SubTask::new(SubTaskKind::WaitPick, shelf_id, station_node);
    wait_pick.items_to_pick = items_on_shelf;
    vec![
        SubTask::new(SubTaskKind::GoToShelf, shelf_id, shelf_node),
        SubTask::new(SubTaskKind::Lift, shelf_id, shelf_node),
        SubTask::new(SubTaskKind::Deliver, shelf_id, station_node),
        wait_pick,
        // Provisional: overwritten with the real parking/forward target once
        // every item on this shelf has been picked (see decomposer::decide_shelf_action).
        SubTask::new(SubTaskKind::Return, shelf_id, shelf_node),
    ]
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub station_node: NodeId,
    pub items: Vec<String>,
    pub shelf_sequence: Vec<ShelfId>,
    /// Items requested from this task, grouped by the shelf that holds them.
    /// Used by the forwarding check to decide whether another task still
    /// needs something off a shelf this task is done with.
    pub shelf_items: HashMap<ShelfId, Vec<String>>,
    pub subtasks: Vec<SubTask>,
    pub cursor: usize,
    pub picked: HashSet<String>,
    pub assigned_robot: Option<RobotId>,
    pub status: TaskStatus,
}

impl Task {
    pub(crate) fn new(
        id: TaskId,
        station_node: NodeId,
        items: Vec<String>,
        shelf_sequence: Vec<ShelfId>,
        shelf_items: HashMap<ShelfId, Vec<String>>,
    ) -> Self {
        let subtasks = shelf_sequence
            .iter()
            .flat_map(|&shelf_id| {
                let on_shelf = shelf_items.get(&shelf_id).cloned().unwrap_or_default();
                build_chain(shelf_id, station_node, on_shelf)
            })
            .collect();
        Self {
            id,
            station_node,
            items,
            shelf_sequence,
            shelf_items,
            subtasks,
            cursor: 0,
            picked: HashSet::new(),
            assigned_robot: None,
            status: TaskStatus::Pending,
        }
    }

    pub fn current_subtask(&self) -> Option<&SubTask> {
        self.subtasks.get(self.cursor)
    }

    pub fn current_subtask_mut(&mut self) -> Option<&mut SubTask> {
        self.subtasks.get_mut(self.cursor)
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.subtasks.len()
    }

    /// Still needs some item held on `shelf_id` that hasn't been picked yet.
    pub fn still_needs_from(&self, shelf_id: ShelfId) -> bool {
        self.shelf_items
            .get(&shelf_id)
            .is_some_and(|items| items.iter().any(|i| !self.picked.contains(i)))
    }

    pub(crate) fn advance(&mut self) {
        self.cursor += 1;
        if self.is_done() {
            self.status = TaskStatus::Done;
        }
    }

    /// Jumps the cursor straight to the WAIT_PICK sub-operation for
    /// `shelf_id`, skipping GO_TO_SHELF/LIFT/DELIVER: used when a shelf
    /// arrives at this task's station already carried by a robot serving
    /// another task's FORWARD, so this task never needs its own robot to
    /// fetch something already in front of it.
    pub(crate) fn skip_to_wait_pick(&mut self, shelf_id: ShelfId, robot: fleet_core::RobotId) -> bool {
        if let Some(idx) = self.subtasks.iter().position(|s| {
            s.shelf_id == shelf_id && s.kind == SubTaskKind::WaitPick
        }) {
            self.cursor = idx;
            self.status = TaskStatus::Active;
            self.assigned_robot = Some(robot);
            true
        } else {
            false
        }
    }
}
