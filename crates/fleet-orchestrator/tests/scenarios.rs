//! End-to-end scenarios against an in-memory transport stub: no websocket or
//! MQTT broker needed, just the orchestrator driven directly through its
//! inbound/outbound channels.

use fleet_core::{NodeId, RobotId, ShelfId, TaskId};
use fleet_map::{Edge, Node, WarehouseMap};
use fleet_orchestrator::{BatchTaskSpec, InboundEvent, Orchestrator, OutboundEvent};
use fleet_robots::RobotRegistry;
use fleet_shelves::ShelfRegistry;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

fn bidi(a: u32, b: u32, cost: f64) -> Vec<Edge> {
    vec![Edge { from: NodeId(a), to: NodeId(b), cost }, Edge { from: NodeId(b), to: NodeId(a), cost }]
}

/// A small star map: 1 -- 9 -- 50, 9 -- 51. Covers every scenario below
/// without needing a literal 9x5 grid; what matters is the topology, not the
/// coordinates.
fn star_map() -> WarehouseMap {
    let nodes = vec![
        Node { id: NodeId(1), x: 0.0, y: 0.0 },
        Node { id: NodeId(9), x: 1.0, y: 0.0 },
        Node { id: NodeId(50), x: 2.0, y: 0.0 },
        Node { id: NodeId(51), x: 1.0, y: 1.0 },
        Node { id: NodeId(2), x: 0.0, y: 1.0 },
    ];
    let mut edges = bidi(1, 9, 1.0);
    edges.extend(bidi(9, 50, 1.0));
    edges.extend(bidi(9, 51, 1.0));
    edges.extend(bidi(2, 51, 1.0));
    WarehouseMap::build(nodes, edges).unwrap()
}

fn drain(rx: &mut broadcast::Receiver<OutboundEvent>) -> Vec<OutboundEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

/// S1 - single retrieval: one robot, one task, one shelf, no sharing.
#[test]
fn s1_single_retrieval_returns_shelf_home() {
    let map = star_map();
    let mut shelves = ShelfRegistry::new();
    shelves.add_shelf(ShelfId(9), "S1".into(), vec!["A".into()], NodeId(9));
    let mut robots = RobotRegistry::new();
    robots.add_robot(RobotId(1), "R1".into(), NodeId(1));

    let (tx, mut rx) = broadcast::channel(CHANNEL_CAPACITY);
    let mut orch = Orchestrator::new(map, shelves, robots, tx);

    orch.dispatch(InboundEvent::BatchSubmit(vec![BatchTaskSpec {
        task_id: TaskId(1),
        station_node: NodeId(50),
        items: vec!["A".into()],
    }]));
    assert!(matches!(drain(&mut rx).as_slice(), [OutboundEvent::MotionPlan { robot, .. }] if *robot == RobotId(1)));

    orch.dispatch(InboundEvent::Arrived { robot: RobotId(1), node: NodeId(9) });
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, OutboundEvent::ShelfLift { shelf, .. } if *shelf == ShelfId(9))));
    assert!(events.iter().any(|e| matches!(e, OutboundEvent::MotionPlan { .. })));

    orch.dispatch(InboundEvent::Arrived { robot: RobotId(1), node: NodeId(50) });
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, OutboundEvent::ShelfAtStation { station, .. } if *station == NodeId(50))));

    orch.dispatch(InboundEvent::ItemPicked { task_id: TaskId(1), item: "A".into() });
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, OutboundEvent::MotionPlan { .. })));

    orch.dispatch(InboundEvent::Arrived { robot: RobotId(1), node: NodeId(9) });
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, OutboundEvent::ShelfLower { shelf, .. } if *shelf == ShelfId(9))));
    assert!(events.iter().any(|e| matches!(e, OutboundEvent::TaskComplete { task_id } if *task_id == TaskId(1))));
}

/// S2 - forwarding: the shelf serving T1 is still needed by T2, so its last
/// sub-operation becomes FORWARD instead of RETURN.
#[test]
fn s2_forwarding_hands_shelf_to_waiting_task() {
    let map = star_map();
    let mut shelves = ShelfRegistry::new();
    shelves.add_shelf(ShelfId(9), "S1".into(), vec!["A".into(), "B".into(), "C".into()], NodeId(9));
    let mut robots = RobotRegistry::new();
    robots.add_robot(RobotId(1), "R1".into(), NodeId(1));

    let (tx, mut rx) = broadcast::channel(CHANNEL_CAPACITY);
    let mut orch = Orchestrator::new(map, shelves, robots, tx);

    orch.dispatch(InboundEvent::BatchSubmit(vec![
        BatchTaskSpec { task_id: TaskId(1), station_node: NodeId(50), items: vec!["A".into(), "B".into()] },
        BatchTaskSpec { task_id: TaskId(2), station_node: NodeId(51), items: vec!["C".into()] },
    ]));
    drain(&mut rx);

    orch.dispatch(InboundEvent::Arrived { robot: RobotId(1), node: NodeId(9) });
    drain(&mut rx);
    orch.dispatch(InboundEvent::Arrived { robot: RobotId(1), node: NodeId(50) });
    drain(&mut rx);

    orch.dispatch(InboundEvent::ItemPicked { task_id: TaskId(1), item: "A".into() });
    assert!(drain(&mut rx).is_empty(), "one of two items picked: nothing should move yet");

    orch.dispatch(InboundEvent::ItemPicked { task_id: TaskId(1), item: "B".into() });
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, OutboundEvent::TaskComplete { .. })), "picking isn't task completion");
    assert!(matches!(
        events.iter().find(|e| matches!(e, OutboundEvent::MotionPlan { .. })),
        Some(OutboundEvent::MotionPlan { node_path, .. }) if node_path.last() == Some(&NodeId(51))
    ));

    orch.dispatch(InboundEvent::Arrived { robot: RobotId(1), node: NodeId(51) });
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, OutboundEvent::ShelfAtStation { station, .. } if *station == NodeId(51))));
    assert!(events.iter().any(|e| matches!(e, OutboundEvent::TaskComplete { task_id } if *task_id == TaskId(1))));

    orch.dispatch(InboundEvent::ItemPicked { task_id: TaskId(2), item: "C".into() });
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, OutboundEvent::MotionPlan { .. })), "shelf returns home after T2's pick");

    orch.dispatch(InboundEvent::Arrived { robot: RobotId(1), node: NodeId(9) });
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, OutboundEvent::TaskComplete { task_id } if *task_id == TaskId(2))));
}

/// S5 - re-dispatch: a freshly idle robot picks up the oldest pending task
/// immediately, ahead of a still-busy robot.
#[test]
fn s5_redispatch_goes_to_the_robot_that_just_freed_up() {
    let map = star_map();
    let mut shelves = ShelfRegistry::new();
    shelves.add_shelf(ShelfId(9), "S1".into(), vec!["A".into()], NodeId(9));
    shelves.add_shelf(ShelfId(2), "S2".into(), vec!["Z".into()], NodeId(2));
    let mut robots = RobotRegistry::new();
    // Robot 1 is nearer node 50 by the planner's Euclidean heuristic than
    // robot 2, so it's the one that gets T1.
    robots.add_robot(RobotId(1), "R1".into(), NodeId(1));
    robots.add_robot(RobotId(2), "R2".into(), NodeId(2));

    let (tx, mut rx) = broadcast::channel(CHANNEL_CAPACITY);
    let mut orch = Orchestrator::new(map, shelves, robots, tx);

    orch.dispatch(InboundEvent::BatchSubmit(vec![
        BatchTaskSpec { task_id: TaskId(1), station_node: NodeId(50), items: vec!["A".into()] },
        BatchTaskSpec { task_id: TaskId(2), station_node: NodeId(50), items: vec!["A".into()] },
        BatchTaskSpec { task_id: TaskId(3), station_node: NodeId(50), items: vec!["Z".into()] },
    ]));
    let events = drain(&mut rx);
    // Two robots, three tasks: exactly two plans go out up front, T3 stays pending.
    assert_eq!(events.iter().filter(|e| matches!(e, OutboundEvent::MotionPlan { .. })).count(), 2);

    // Run robot 1's task (task 1, shelf 9) through to completion.
    orch.dispatch(InboundEvent::Arrived { robot: RobotId(1), node: NodeId(9) });
    drain(&mut rx);
    orch.dispatch(InboundEvent::Arrived { robot: RobotId(1), node: NodeId(50) });
    drain(&mut rx);
    orch.dispatch(InboundEvent::ItemPicked { task_id: TaskId(1), item: "A".into() });
    drain(&mut rx);
    orch.dispatch(InboundEvent::Arrived { robot: RobotId(1), node: NodeId(9) });
    let events = drain(&mut rx);

    assert!(events.iter().any(|e| matches!(e, OutboundEvent::TaskComplete { task_id } if *task_id == TaskId(1))));
    // Robot 1 is immediately redispatched to T3 (still pending), not robot 2 (busy on T2).
    assert!(matches!(
        events.iter().find(|e| matches!(e, OutboundEvent::MotionPlan { .. })),
        Some(OutboundEvent::MotionPlan { robot, .. }) if *robot == RobotId(1)
    ));
}

/// S6 - unknown item: a task requesting an item on no shelf is rejected, but
/// the rest of the batch still proceeds.
#[test]
fn s6_unknown_item_rejects_only_that_task() {
    let map = star_map();
    let mut shelves = ShelfRegistry::new();
    shelves.add_shelf(ShelfId(9), "S1".into(), vec!["A".into()], NodeId(9));
    let mut robots = RobotRegistry::new();
    robots.add_robot(RobotId(1), "R1".into(), NodeId(1));

    let (tx, mut rx) = broadcast::channel(CHANNEL_CAPACITY);
    let mut orch = Orchestrator::new(map, shelves, robots, tx);

    orch.dispatch(InboundEvent::BatchSubmit(vec![
        BatchTaskSpec { task_id: TaskId(1), station_node: NodeId(50), items: vec!["GHOST".into()] },
        BatchTaskSpec { task_id: TaskId(2), station_node: NodeId(50), items: vec!["A".into()] },
    ]));
    let events = drain(&mut rx);

    assert!(events.iter().any(|e| matches!(e, OutboundEvent::TaskRejected { task_id, .. } if *task_id == TaskId(1))));
    assert!(matches!(
        events.iter().find(|e| matches!(e, OutboundEvent::MotionPlan { .. })),
        Some(OutboundEvent::MotionPlan { robot, .. }) if *robot == RobotId(1)
    ));
}
