//! Async wiring around [`Orchestrator`]: one Tokio task owns the registries,
//! fed by an unbounded inbound channel that every transport handler clones,
//! broadcasting outbound effects to however many listeners are subscribed.
//! Unlike a simulated-clock loop this one isn't paced against wall clock:
//! dispatch happens the instant an event is dequeued, and the only
//! scheduled work is the 1 Hz timeout tick.

use crate::event::{InboundEvent, OutboundEvent};
use crate::orchestrator::Orchestrator;
use fleet_map::WarehouseMap;
use fleet_robots::RobotRegistry;
use fleet_shelves::ShelfRegistry;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const OUTBOUND_CHANNEL_CAPACITY: usize = 1024;

/// Handle to a running orchestrator task: send inbound events in, subscribe
/// to outbound effects. Cheap to clone — every transport handler and the
/// MQTT bridge gets its own.
#[derive(Clone)]
pub struct OrchestratorHandle {
    inbound: mpsc::UnboundedSender<InboundEvent>,
    outbound: broadcast::Sender<OutboundEvent>,
}

impl OrchestratorHandle {
    pub fn send(&self, event: InboundEvent) -> Result<(), mpsc::error::SendError<InboundEvent>> {
        self.inbound.send(event)
    }

    pub fn inbound_sender(&self) -> mpsc::UnboundedSender<InboundEvent> {
        self.inbound.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.outbound.subscribe()
    }
}

/// Spawns the orchestrator's event loop as a single Tokio task and returns a
/// handle plus its join handle. The 1 Hz tick that drives arrival timeouts
/// is spawned as a second, much lighter task that only ever injects
/// `InboundEvent::Tick` — all state mutation still happens on the
/// orchestrator task.
pub fn spawn_orchestrator(
    map: WarehouseMap,
    shelves: ShelfRegistry,
    robots: RobotRegistry,
) -> (OrchestratorHandle, tokio::task::JoinHandle<()>) {
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<InboundEvent>();
    let (outbound_tx, _outbound_rx) = broadcast::channel(OUTBOUND_CHANNEL_CAPACITY);

    let mut orchestrator = Orchestrator::new(map, shelves, robots, outbound_tx.clone());

    let tick_sender = inbound_tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            interval.tick().await;
            if tick_sender.send(InboundEvent::Tick).is_err() {
                break; // orchestrator task is gone
            }
        }
    });

    let task = tokio::spawn(async move {
        while let Some(event) = inbound_rx.recv().await {
            orchestrator.dispatch(event);
        }
        tracing::info!("orchestrator loop exiting: inbound channel closed");
    });

    (OrchestratorHandle { inbound: inbound_tx, outbound: outbound_tx }, task)
}
