//! Task Store & Decomposer: picking order breakdown and the forwarding policy.

mod decomposer;
mod task;

pub use decomposer::{PickOutcome, TaskStore};
pub use task::{SubTask, SubTaskKind, Task, TaskStatus};
