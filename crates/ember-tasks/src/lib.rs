//! Task orchestration: worker lifecycle and field synchronization.
//!
//! The main interpreter and each task component run on separate OS threads
//! with no shared language objects. This crate supervises those workers
//! (admission, two-message handoff, cooperative stop, fault isolation) and
//! routes single-field updates between them through per-task versioned
//! regions: fan-out from the main thread, fan-in from tasks, never an echo
//! back to the sender.

mod link;
mod messages;
mod registry;
mod supervisor;
mod worker;

pub use link::TaskLink;
pub use messages::{HostToWorker, SupervisorEvent, WorkerMessage, WorkerPort};
pub use registry::RegistrySync;
pub use supervisor::TaskSupervisor;
pub use worker::{TaskContext, TaskRuntime};
