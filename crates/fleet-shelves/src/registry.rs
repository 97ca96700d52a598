//! Shelf Registry: shelf state, item index, nearest empty slot.

use fleet_core::{FleetError, FleetResult, NodeId, RobotId, ShelfId};
use fleet_map::WarehouseMap;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShelfStatus {
    /// Parked at its home (or another empty) node.
    AtRest,
    /// Being carried by a robot.
    Carried,
    /// Parked at a pick station.
    AtStation,
}

#[derive(Debug, Clone)]
pub struct Shelf {
    pub id: ShelfId,
    pub label: String,
    pub items: Vec<String>,
    pub home_node: NodeId,
    pub current_node: NodeId,
    pub status: ShelfStatus,
    pub carried_by: Option<RobotId>,
}

/// Tracks every mobile shelf, the item -> shelf index, and which grid nodes
/// are designated shelf-parking slots.
pub struct ShelfRegistry {
    shelves: HashMap<ShelfId, Shelf>,
    item_to_shelf: HashMap<String, ShelfId>,
    parking_nodes: HashSet<NodeId>,
}

impl ShelfRegistry {
    pub fn new() -> Self {
        Self {
            shelves: HashMap::new(),
            item_to_shelf: HashMap::new(),
            parking_nodes: HashSet::new(),
        }
    }

    /// Registers a shelf parked at `home_node`, indexing its items.
    pub fn add_shelf(&mut self, id: ShelfId, label: String, items: Vec<String>, home_node: NodeId) {
        self.parking_nodes.insert(home_node);
        for item in &items {
            self.item_to_shelf.insert(item.clone(), id);
        }
        self.shelves.insert(
            id,
            Shelf {
                id,
                label,
                items,
                home_node,
                current_node: home_node,
                status: ShelfStatus::AtRest,
                carried_by: None,
            },
        );
    }

    pub fn get(&self, id: ShelfId) -> Option<&Shelf> {
        self.shelves.get(&id)
    }

    pub fn shelf_of(&self, item: &str) -> Option<ShelfId> {
        self.item_to_shelf.get(item).copied()
    }

    /// Groups requested items by the shelf that holds them.
    pub fn shelves_for(&self, items: &[String]) -> HashMap<ShelfId, Vec<String>> {
        let mut out: HashMap<ShelfId, Vec<String>> = HashMap::new();
        for item in items {
            if let Some(shelf_id) = self.item_to_shelf.get(item) {
                out.entry(*shelf_id).or_default().push(item.clone());
            }
        }
        out
    }

    pub fn mark_picked_up(&mut self, shelf_id: ShelfId, robot: RobotId) -> FleetResult<()> {
        let shelf = self.shelves.get_mut(&shelf_id).ok_or_else(|| FleetError::shelf_not_found(shelf_id.0))?;
        if shelf.status == ShelfStatus::Carried {
            return Err(FleetError::StateViolation(format!(
                "shelf {shelf_id} already carried by {:?}",
                shelf.carried_by
            )));
        }
        shelf.status = ShelfStatus::Carried;
        shelf.carried_by = Some(robot);
        tracing::debug!(shelf = shelf_id.0, robot = robot.0, "shelf picked up");
        Ok(())
    }

    pub fn mark_at_station(&mut self, shelf_id: ShelfId, station_node: NodeId) -> FleetResult<()> {
        let shelf = self.shelves.get_mut(&shelf_id).ok_or_else(|| FleetError::shelf_not_found(shelf_id.0))?;
        shelf.status = ShelfStatus::AtStation;
        shelf.current_node = station_node;
        Ok(())
    }

    pub fn mark_returned(&mut self, shelf_id: ShelfId, park_node: NodeId) -> FleetResult<()> {
        let shelf = self.shelves.get_mut(&shelf_id).ok_or_else(|| FleetError::shelf_not_found(shelf_id.0))?;
        shelf.status = ShelfStatus::AtRest;
        shelf.current_node = park_node;
        shelf.carried_by = None;
        Ok(())
    }

    fn occupied_parking_nodes(&self) -> HashSet<NodeId> {
        self.shelves
            .values()
            .filter(|s| s.status == ShelfStatus::AtRest)
            .map(|s| s.current_node)
            .collect()
    }

    /// Nearest free parking slot to `from_node`, by Euclidean distance, tied
    /// deterministically by lower node id.
    pub fn nearest_empty_parking(&self, from_node: NodeId, map: &WarehouseMap) -> Option<NodeId> {
        let occupied = self.occupied_parking_nodes();
        self.parking_nodes
            .iter()
            .filter(|n| !occupied.contains(n))
            .copied()
            .min_by(|&a, &b| {
                map.heuristic(from_node, a)
                    .partial_cmp(&map.heuristic(from_node, b))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.cmp(&b))
            })
    }

    pub fn all(&self) -> impl Iterator<Item = &Shelf> {
        self.shelves.values()
    }
}

impl Default for ShelfRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_map::{Edge, Node};

    fn line_map() -> WarehouseMap {
        let nodes = (0..5)
            .map(|i| Node { id: NodeId(i), x: i as f64, y: 0.0 })
            .collect();
        let edges = (0..4)
            .flat_map(|i| {
                vec![
                    Edge { from: NodeId(i), to: NodeId(i + 1), cost: 1.0 },
                    Edge { from: NodeId(i + 1), to: NodeId(i), cost: 1.0 },
                ]
            })
            .collect();
        WarehouseMap::build(nodes, edges).unwrap()
    }

    #[test]
    fn finds_shelf_by_item_and_groups_requests() {
        let mut reg = ShelfRegistry::new();
        reg.add_shelf(ShelfId(1), "S1".into(), vec!["A".into(), "B".into()], NodeId(1));
        reg.add_shelf(ShelfId(3), "S2".into(), vec!["C".into()], NodeId(3));
        assert_eq!(reg.shelf_of("A"), Some(ShelfId(1)));
        let grouped = reg.shelves_for(&["A".into(), "C".into(), "Z".into()]);
        assert_eq!(grouped.get(&ShelfId(1)), Some(&vec!["A".to_string()]));
        assert_eq!(grouped.get(&ShelfId(3)), Some(&vec!["C".to_string()]));
        assert_eq!(grouped.len(), 2);
    }

    #[test]
    fn nearest_empty_parking_excludes_occupied_and_breaks_ties_by_node_id() {
        let map = line_map();
        let mut reg = ShelfRegistry::new();
        reg.add_shelf(ShelfId(1), "S1".into(), vec![], NodeId(1));
        reg.add_shelf(ShelfId(3), "S2".into(), vec![], NodeId(3));
        // From node 2, both 1 and 3 are distance 1 away -> tie-break picks node 1.
        assert_eq!(reg.nearest_empty_parking(NodeId(2), &map), Some(NodeId(1)));
        reg.mark_picked_up(ShelfId(1), RobotId(0)).unwrap();
        assert_eq!(reg.nearest_empty_parking(NodeId(2), &map), Some(NodeId(3)));
    }

    #[test]
    fn double_pickup_is_rejected() {
        let mut reg = ShelfRegistry::new();
        reg.add_shelf(ShelfId(1), "S1".into(), vec![], NodeId(1));
        reg.mark_picked_up(ShelfId(1), RobotId(0)).unwrap();
        assert!(reg.mark_picked_up(ShelfId(1), RobotId(1)).is_err());
    }
}
