mod event;
mod orchestrator;
mod runtime;

pub use event::{BatchTaskSpec, InboundEvent, OutboundEvent};
pub use orchestrator::Orchestrator;
pub use runtime::{spawn_orchestrator, OrchestratorHandle};
