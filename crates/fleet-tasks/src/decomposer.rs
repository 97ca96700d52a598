//! Task Store & Decomposer: creation, pick-completion policy, and the
//! forwarding-vs-return decision.

use crate::task::{SubTaskKind, Task, TaskStatus};
use fleet_core::{FleetError, FleetResult, NodeId, ShelfId, TaskId};
use fleet_map::WarehouseMap;
use fleet_shelves::ShelfRegistry;
use std::collections::HashMap;

/// What the orchestrator should do next after an `item_picked` event.
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    /// More items remain on the shelf currently at the station.
    ContinuePicking { remaining: Vec<String> },
    /// Every item on this shelf is picked; the next sub-operation is a
    /// RETURN to `park_node`.
    Return { park_node: NodeId },
    /// Every item on this shelf is picked, and another pending/active task
    /// still needs it; the next sub-operation is a FORWARD to `station_node`
    /// serving `task_id`.
    Forward { station_node: NodeId, task_id: TaskId },
    /// That was the task's last shelf; the task is now done.
    TaskComplete,
}

pub struct TaskStore {
    tasks: HashMap<TaskId, Task>,
    /// Submission order, oldest first — the order `try_assign_pending` scans in.
    submission_order: Vec<TaskId>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self { tasks: HashMap::new(), submission_order: Vec::new() }
    }

    /// Decomposes a picking order into its sub-operation chain. Fails the
    /// whole task if any requested item maps to no shelf.
    pub fn create_task(
        &mut self,
        task_id: TaskId,
        station_node: NodeId,
        items: Vec<String>,
        shelves: &ShelfRegistry,
        map: &WarehouseMap,
    ) -> FleetResult<()> {
        for item in &items {
            if shelves.shelf_of(item).is_none() {
                return Err(FleetError::item_not_found(item));
            }
        }
        let shelf_items = shelves.shelves_for(&items);
        let mut shelf_sequence: Vec<ShelfId> = shelf_items.keys().copied().collect();
        shelf_sequence.sort_by(|&a, &b| {
            map.heuristic(station_node, NodeId(a.0))
                .partial_cmp(&map.heuristic(station_node, NodeId(b.0)))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let task = Task::new(task_id, station_node, items, shelf_sequence, shelf_items);
        self.submission_order.push(task_id);
        self.tasks.insert(task_id, task);
        Ok(())
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> FleetResult<&mut Task> {
        self.tasks.get_mut(&id).ok_or_else(|| FleetError::task_not_found(id.0))
    }

    pub fn all(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// First `PENDING` task in submission order.
    pub fn next_pending(&self) -> Option<TaskId> {
        self.submission_order
            .iter()
            .copied()
            .find(|id| matches!(self.tasks.get(id).map(|t| t.status), Some(TaskStatus::Pending)))
    }

    pub fn start(&mut self, task_id: TaskId, robot: fleet_core::RobotId) -> FleetResult<()> {
        let task = self.get_mut(task_id)?;
        task.status = TaskStatus::Active;
        task.assigned_robot = Some(robot);
        Ok(())
    }

    /// Records a picked item and decides what happens next.
    pub fn handle_item_picked(
        &mut self,
        task_id: TaskId,
        item: &str,
        shelves: &ShelfRegistry,
        map: &WarehouseMap,
    ) -> FleetResult<PickOutcome> {
        let shelf_id = {
            let task = self.get_mut(task_id)?;
            let sub = task
                .current_subtask()
                .ok_or_else(|| FleetError::StateViolation(format!("task {task_id} has no active sub-operation")))?;
            if sub.kind != SubTaskKind::WaitPick {
                return Err(FleetError::StateViolation(format!(
                    "task {task_id} received item_picked while not in WAIT_PICK"
                )));
            }
            task.picked.insert(item.to_string());
            sub.shelf_id
        };

        let remaining: Vec<String> = {
            let task = self.get(task_id).unwrap();
            let sub = task.current_subtask().unwrap();
            sub.items_to_pick
                .iter()
                .filter(|i| !task.picked.contains(*i))
                .cloned()
                .collect()
        };
        if !remaining.is_empty() {
            return Ok(PickOutcome::ContinuePicking { remaining });
        }

        self.decide_shelf_action(task_id, shelf_id, shelves, map)
    }

    /// Decides, for a shelf whose pick is complete, whether the upcoming
    /// RETURN becomes a FORWARD and advances the task's cursor onto it.
    fn decide_shelf_action(
        &mut self,
        task_id: TaskId,
        shelf_id: ShelfId,
        shelves: &ShelfRegistry,
        map: &WarehouseMap,
    ) -> FleetResult<PickOutcome> {
        let current_node = self.get(task_id).unwrap().station_node;
        let forward = self.find_forwarding_candidate(task_id, shelf_id, current_node, map);

        let task = self.get_mut(task_id)?;
        task.advance();
        if task.is_done() {
            return Ok(PickOutcome::TaskComplete);
        }
        let next = task.current_subtask_mut().unwrap();

        if let Some((forward_task_id, station_node)) = forward {
            next.kind = SubTaskKind::Forward;
            next.target_node = station_node;
            next.forward_task = Some(forward_task_id);
            Ok(PickOutcome::Forward { station_node, task_id: forward_task_id })
        } else {
            let park_node = shelves
                .nearest_empty_parking(current_node, map)
                .unwrap_or(NodeId(shelf_id.0));
            next.target_node = park_node;
            Ok(PickOutcome::Return { park_node })
        }
    }

    /// Reassigns `robot`'s service from its finished FORWARD sub-operation
    /// onto `task_id`'s own chain for the same shelf, skipping straight to
    /// its WAIT_PICK — the shelf is already in front of it.
    pub fn begin_forwarded_service(
        &mut self,
        task_id: TaskId,
        shelf_id: ShelfId,
        robot: fleet_core::RobotId,
    ) -> FleetResult<()> {
        let task = self.get_mut(task_id)?;
        if !task.skip_to_wait_pick(shelf_id, robot) {
            return Err(FleetError::StateViolation(format!(
                "task {task_id} has no WAIT_PICK sub-operation for shelf {shelf_id}"
            )));
        }
        Ok(())
    }

    /// Among every other PENDING/ACTIVE task that still needs an item off
    /// `shelf_id`, picks the station nearest `from_node`, deterministically
    /// tie-broken by node id.
    fn find_forwarding_candidate(
        &self,
        self_task: TaskId,
        shelf_id: ShelfId,
        from_node: NodeId,
        map: &WarehouseMap,
    ) -> Option<(TaskId, NodeId)> {
        self.tasks
            .values()
            .filter(|t| t.id != self_task)
            .filter(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::Active))
            .filter(|t| t.still_needs_from(shelf_id))
            .map(|t| (t.id, t.station_node))
            .min_by(|&(_, a), &(_, b)| {
                map.heuristic(from_node, a)
                    .partial_cmp(&map.heuristic(from_node, b))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(&b.0))
            })
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::NodeId;
    use fleet_map::{Edge, Node};

    fn grid_map() -> WarehouseMap {
        // stations at 50/51, shelf at 9, all reachable; distances only matter
        // relatively so coordinates are placed accordingly.
        let nodes = vec![
            Node { id: NodeId(9), x: 0.0, y: 0.0 },
            Node { id: NodeId(50), x: 10.0, y: 0.0 },
            Node { id: NodeId(51), x: 20.0, y: 0.0 },
        ];
        let edges = vec![
            Edge { from: NodeId(9), to: NodeId(50), cost: 1.0 },
            Edge { from: NodeId(50), to: NodeId(9), cost: 1.0 },
            Edge { from: NodeId(50), to: NodeId(51), cost: 1.0 },
            Edge { from: NodeId(51), to: NodeId(50), cost: 1.0 },
        ];
        WarehouseMap::build(nodes, edges).unwrap()
    }

    fn shelves_with_shared_shelf() -> ShelfRegistry {
        let mut shelves = ShelfRegistry::new();
        shelves.add_shelf(
            ShelfId(9),
            "S1".into(),
            vec!["A".into(), "B".into(), "C".into()],
            NodeId(9),
        );
        shelves
    }

    #[test]
    fn rejects_task_with_unknown_item() {
        let mut store = TaskStore::new();
        let shelves = shelves_with_shared_shelf();
        let map = grid_map();
        let err = store.create_task(TaskId(1), NodeId(50), vec!["ZZZ".into()], &shelves, &map);
        assert!(err.is_err());
    }

    #[test]
    fn forwards_shelf_when_another_task_still_needs_it() {
        let mut store = TaskStore::new();
        let shelves = shelves_with_shared_shelf();
        let map = grid_map();

        store
            .create_task(TaskId(1), NodeId(50), vec!["A".into(), "B".into()], &shelves, &map)
            .unwrap();
        store
            .create_task(TaskId(2), NodeId(51), vec!["C".into()], &shelves, &map)
            .unwrap();
        store.get_mut(TaskId(1)).unwrap().status = TaskStatus::Active;
        store.get_mut(TaskId(2)).unwrap().status = TaskStatus::Pending;

        let outcome = store
            .handle_item_picked(TaskId(1), "A", &shelves, &map)
            .unwrap();
        assert_eq!(outcome, PickOutcome::ContinuePicking { remaining: vec!["B".to_string()] });

        let outcome = store
            .handle_item_picked(TaskId(1), "B", &shelves, &map)
            .unwrap();
        assert_eq!(outcome, PickOutcome::Forward { station_node: NodeId(51), task_id: TaskId(2) });
    }

    #[test]
    fn returns_shelf_when_nothing_else_needs_it() {
        let mut store = TaskStore::new();
        let shelves = shelves_with_shared_shelf();
        let map = grid_map();
        store
            .create_task(TaskId(1), NodeId(50), vec!["A".into(), "B".into(), "C".into()], &shelves, &map)
            .unwrap();
        store.get_mut(TaskId(1)).unwrap().status = TaskStatus::Active;

        store.handle_item_picked(TaskId(1), "A", &shelves, &map).unwrap();
        store.handle_item_picked(TaskId(1), "B", &shelves, &map).unwrap();
        let outcome = store.handle_item_picked(TaskId(1), "C", &shelves, &map).unwrap();
        assert!(matches!(outcome, PickOutcome::Return { .. }));
    }

    #[test]
    fn rejects_pick_complete_outside_wait_pick() {
        let mut store = TaskStore::new();
        let shelves = shelves_with_shared_shelf();
        let map = grid_map();
        store.create_task(TaskId(1), NodeId(50), vec!["A".into()], &shelves, &map).unwrap();
        // cursor is at GO_TO_SHELF, not WAIT_PICK yet.
        assert!(store.handle_item_picked(TaskId(1), "A", &shelves, &map).is_err());
    }
}
