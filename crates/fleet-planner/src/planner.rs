//! Time-expanded A* over `(node, t)` states with a shared reservation table.

use fleet_core::{FleetError, FleetResult, NodeId};
use fleet_map::WarehouseMap;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Default planning horizon. The state space is `(node, t)` for
/// `t in 0..=T_MAX`; beyond that a state is never expanded.
pub const DEFAULT_MAX_TIME: u32 = 50;

/// How many ticks a robot's reservation lingers at its goal after arrival,
/// so a later-priority robot in the same batch can't step onto a robot that
/// just parked there.
pub const DEFAULT_STAY_AT_GOAL: u32 = 3;

/// A path through time: `(node, t)` pairs with `t` strictly increasing by 1
/// at each step (a "wait" repeats the node, a "move" advances it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedPath {
    pub states: Vec<(NodeId, u32)>,
}

impl TimedPath {
    pub fn start(&self) -> NodeId {
        self.states[0].0
    }

    pub fn goal(&self) -> NodeId {
        self.states.last().unwrap().0
    }

    pub fn goal_time(&self) -> u32 {
        self.states.last().unwrap().1
    }

    /// Collapses consecutive duplicate nodes (wait-loops) into the ordered
    /// sequence of distinct nodes visited. Idempotent: compressing an
    /// already-compressed path returns the same sequence.
    pub fn compress(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut last: Option<NodeId> = None;
        for &(node, _) in &self.states {
            if last != Some(node) {
                out.push(node);
                last = Some(node);
            }
        }
        out
    }
}

/// Shared table of `(node, t)` and `(u, v, t)` reservations accumulated
/// while planning a batch of robots in priority order. Discarded after the
/// batch completes; collision avoidance between independently-dispatched
/// robots outside a batch is best-effort only.
#[derive(Debug, Clone, Default)]
pub struct ReservationTable {
    reserved_nodes: HashSet<(NodeId, u32)>,
    reserved_edges: HashSet<(NodeId, NodeId, u32)>,
}

impl ReservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_reserved(&self, node: NodeId, t: u32) -> bool {
        self.reserved_nodes.contains(&(node, t))
    }

    /// True if some other robot is using edge `v -> u` during the interval
    /// starting at `t` (a swap conflict against our `u -> v` move).
    fn swap_conflict(&self, u: NodeId, v: NodeId, t: u32) -> bool {
        self.reserved_edges.contains(&(v, u, t))
    }

    /// Registers every state of `path` plus, for true moves only, the edge
    /// traversed, then holds the goal node reserved for `stay_at_goal` extra
    /// ticks so later-priority robots can't step onto a freshly parked one.
    pub fn register(&mut self, path: &TimedPath, stay_at_goal: u32) {
        for &(node, t) in &path.states {
            self.reserved_nodes.insert((node, t));
        }
        for w in path.states.windows(2) {
            let (u, t) = w[0];
            let (v, _) = w[1];
            if u != v {
                self.reserved_edges.insert((u, v, t));
            }
        }
        let goal = path.goal();
        let goal_t = path.goal_time();
        for dt in 1..=stay_at_goal {
            self.reserved_nodes.insert((goal, goal_t + dt));
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
struct OpenEntry {
    f: f64,
    g: f64,
    node: NodeId,
    t: u32,
}

impl Eq for OpenEntry {}

// Min-heap on f, ties broken by lower g (prefer more progress already made).
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .partial_cmp(&self.f)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.g.partial_cmp(&self.g).unwrap_or(Ordering::Equal))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-robot time-expanded A*, optionally constrained by `reservations`.
/// Pass an empty table for unconstrained planning (`plan_single`).
#[tracing::instrument(skip(map, reservations), fields(start = start.0, goal = goal.0))]
pub fn astar_with_time(
    map: &WarehouseMap,
    start: NodeId,
    goal: NodeId,
    reservations: &ReservationTable,
    max_time: u32,
) -> Option<TimedPath> {
    if reservations.node_reserved(start, 0) {
        return None;
    }

    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<(NodeId, u32), f64> = HashMap::new();
    let mut came_from: HashMap<(NodeId, u32), (NodeId, u32)> = HashMap::new();

    g_score.insert((start, 0), 0.0);
    open.push(OpenEntry { f: map.heuristic(start, goal), g: 0.0, node: start, t: 0 });

    while let Some(OpenEntry { g, node, t, .. }) = open.pop() {
        if node == goal {
            return Some(reconstruct(&came_from, node, t));
        }
        if let Some(&best) = g_score.get(&(node, t)) {
            if g > best {
                continue;
            }
        }
        if t >= max_time {
            continue;
        }
        let nt = t + 1;

        // Wait in place, cost 1, plus every graph neighbor.
        let mut candidates: Vec<(NodeId, f64)> = vec![(node, 1.0)];
        candidates.extend(map.neighbors(node));

        for (next, step_cost) in candidates {
            if reservations.node_reserved(next, nt) {
                continue;
            }
            if next != node && reservations.swap_conflict(node, next, t) {
                continue;
            }
            let tentative_g = g + step_cost;
            let key = (next, nt);
            if tentative_g < *g_score.get(&key).unwrap_or(&f64::INFINITY) {
                g_score.insert(key, tentative_g);
                came_from.insert(key, (node, t));
                let f = tentative_g + map.heuristic(next, goal);
                open.push(OpenEntry { f, g: tentative_g, node: next, t: nt });
            }
        }
    }
    None
}

fn reconstruct(
    came_from: &HashMap<(NodeId, u32), (NodeId, u32)>,
    goal: NodeId,
    goal_t: u32,
) -> TimedPath {
    let mut states = vec![(goal, goal_t)];
    let mut cur = (goal, goal_t);
    while let Some(&prev) = came_from.get(&cur) {
        states.push(prev);
        cur = prev;
    }
    states.reverse();
    TimedPath { states }
}

/// Plans a single robot with no reservation constraints.
pub fn plan_single(map: &WarehouseMap, start: NodeId, goal: NodeId) -> FleetResult<TimedPath> {
    astar_with_time(map, start, goal, &ReservationTable::new(), DEFAULT_MAX_TIME)
        .ok_or(FleetError::NoPath { from: start.0, to: goal.0 })
}

/// Prioritized multi-robot planning. `requests` order IS the priority
/// order — lower index wins. Not complete: a feasible global solution may
/// exist that this misses; on any robot's failure, the whole
/// batch is aborted rather than reordered or retried.
pub fn plan_prioritized(
    map: &WarehouseMap,
    requests: &[(NodeId, NodeId)],
    max_time: u32,
    stay_at_goal: u32,
) -> FleetResult<Vec<TimedPath>> {
    let mut reservations = ReservationTable::new();
    let mut paths = Vec::with_capacity(requests.len());
    for (index, &(start, goal)) in requests.iter().enumerate() {
        match astar_with_time(map, start, goal, &reservations, max_time) {
            Some(path) => {
                reservations.register(&path, stay_at_goal);
                paths.push(path);
            }
            None => {
                tracing::warn!(index, start = start.0, goal = goal.0, "prioritized plan aborted");
                return Err(FleetError::PrioritizedPlanFailed { index });
            }
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_map::{Edge, Node};

    fn grid(w: i64, h: i64) -> WarehouseMap {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let id = |x: i64, y: i64| NodeId((y * w + x) as u32);
        for y in 0..h {
            for x in 0..w {
                nodes.push(Node { id: id(x, y), x: x as f64, y: y as f64 });
            }
        }
        for y in 0..h {
            for x in 0..w {
                if x + 1 < w {
                    edges.push(Edge { from: id(x, y), to: id(x + 1, y), cost: 1.0 });
                    edges.push(Edge { from: id(x + 1, y), to: id(x, y), cost: 1.0 });
                }
                if y + 1 < h {
                    edges.push(Edge { from: id(x, y), to: id(x, y + 1), cost: 1.0 });
                    edges.push(Edge { from: id(x, y + 1), to: id(x, y), cost: 1.0 });
                }
            }
        }
        WarehouseMap::build(nodes, edges).unwrap()
    }

    #[test]
    fn plans_shortest_path_on_grid() {
        let map = grid(5, 5);
        let path = plan_single(&map, NodeId(0), NodeId(24)).unwrap();
        assert_eq!(path.goal(), NodeId(24));
        assert_eq!(path.states[0], (NodeId(0), 0));
    }

    #[test]
    fn consecutive_states_are_waits_or_adjacent_moves() {
        let map = grid(4, 4);
        let path = plan_single(&map, NodeId(0), NodeId(15)).unwrap();
        for w in path.states.windows(2) {
            let (u, t0) = w[0];
            let (v, t1) = w[1];
            assert_eq!(t1, t0 + 1);
            assert!(u == v || map.neighbors(u).any(|(n, _)| n == v));
        }
    }

    #[test]
    fn compress_collapses_waits_and_is_idempotent() {
        let path = TimedPath {
            states: vec![(NodeId(0), 0), (NodeId(0), 1), (NodeId(1), 2), (NodeId(1), 3)],
        };
        let once = path.compress();
        assert_eq!(once, vec![NodeId(0), NodeId(1)]);
        let twice_path = TimedPath {
            states: once.iter().enumerate().map(|(i, &n)| (n, i as u32)).collect(),
        };
        assert_eq!(twice_path.compress(), once);
    }

    #[test]
    fn prioritized_planning_avoids_vertex_and_swap_conflicts() {
        let map = grid(3, 1);
        // R1: 0 -> 2 ; R2: 2 -> 0, same corridor, would swap at t=0 if naive.
        let requests = vec![(NodeId(0), NodeId(2)), (NodeId(2), NodeId(0))];
        let paths = plan_prioritized(&map, &requests, DEFAULT_MAX_TIME, DEFAULT_STAY_AT_GOAL).unwrap();
        assert_eq!(paths.len(), 2);
        // No shared (node, t), and no swapped edge use.
        let mut seen = HashSet::new();
        for p in &paths {
            for &(n, t) in &p.states {
                assert!(seen.insert((n, t)), "vertex conflict at ({n:?},{t})");
            }
        }
        for w0 in paths[0].states.windows(2) {
            for w1 in paths[1].states.windows(2) {
                if w0[0].1 == w1[0].1 {
                    assert!(!(w0[0].0 == w1[1].0 && w0[1].0 == w1[0].0), "swap conflict");
                }
            }
        }
    }

    #[test]
    fn prioritized_planning_aborts_whole_batch_on_infeasibility() {
        // Corridor A-B-C, two robots swap with no room to wait aside (max_time small).
        let nodes = vec![
            Node { id: NodeId(0), x: 0.0, y: 0.0 },
            Node { id: NodeId(1), x: 1.0, y: 0.0 },
            Node { id: NodeId(2), x: 2.0, y: 0.0 },
        ];
        let edges = vec![
            Edge { from: NodeId(0), to: NodeId(1), cost: 1.0 },
            Edge { from: NodeId(1), to: NodeId(0), cost: 1.0 },
            Edge { from: NodeId(1), to: NodeId(2), cost: 1.0 },
            Edge { from: NodeId(2), to: NodeId(1), cost: 1.0 },
        ];
        let map = WarehouseMap::build(nodes, edges).unwrap();
        let requests = vec![(NodeId(0), NodeId(2)), (NodeId(2), NodeId(0))];
        let result = plan_prioritized(&map, &requests, 2, 1);
        assert!(matches!(result, Err(FleetError::PrioritizedPlanFailed { index: 1 })));
    }
}
