//! Worker/supervisor message kinds.
//!
//! Everything a worker can say arrives as one tagged union, decoded once at
//! the port boundary and matched exhaustively by the supervisor dispatcher.

use std::sync::mpsc;

use ember_common::{ExtensionInfo, RegistryData, TaskData, TaskPayload, ThreadUpdate};
use ember_sync::ScalarChannel;

use crate::link::TaskLink;

/// Messages a task worker posts to the supervisor.
#[derive(Clone, Debug)]
pub enum WorkerMessage {
    /// Registry snapshot for the host to persist.
    Registry(RegistryData),
    /// An interpreter extension finished loading.
    Extension(ExtensionInfo),
    /// Free-form console line; `debug,`/`warning,`/`error,` prefixes select
    /// the severity, anything else is an application message.
    Text(String),
    /// Task state transition (a task asking to stop itself).
    Task(TaskData),
    /// Field mutation to fan in/out.
    Update(ThreadUpdate),
    /// The task runtime returned an error or panicked.
    Fault(String),
    /// The worker thread finished.
    Exited(i32),
}

/// Handoff messages from the supervisor to a freshly spawned worker, in
/// protocol order: first the scalar channel handle, then the payload with
/// the task's inbound region link.
pub enum HostToWorker {
    Channel(ScalarChannel),
    Payload {
        payload: Box<TaskPayload>,
        link: TaskLink,
    },
}

/// Supervisor happenings surfaced to the host.
#[derive(Clone, Debug)]
pub enum SupervisorEvent {
    Registry(RegistryData),
    Message(String),
    Debug(String),
    Warning(String),
    Error(String),
    TaskStarted { id: i32, name: String },
    TaskStopped { id: i32 },
    TaskFault { id: i32, reason: String },
    TaskExited { id: i32, code: i32 },
}

pub(crate) struct Routed {
    pub task_id: i32,
    pub generation: u64,
    pub message: WorkerMessage,
}

/// A worker's sending half of the supervisor port. The generation tag lets
/// the supervisor discard stragglers from a stopped worker that shares an id
/// with a newer one.
#[derive(Clone)]
pub struct WorkerPort {
    task_id: i32,
    generation: u64,
    tx: mpsc::Sender<Routed>,
}

impl WorkerPort {
    pub(crate) fn new(task_id: i32, generation: u64, tx: mpsc::Sender<Routed>) -> Self {
        WorkerPort {
            task_id,
            generation,
            tx,
        }
    }

    pub fn task_id(&self) -> i32 {
        self.task_id
    }

    pub fn post(&self, message: WorkerMessage) {
        let _ = self.tx.send(Routed {
            task_id: self.task_id,
            generation: self.generation,
            message,
        });
    }

    pub fn post_update(&self, update: ThreadUpdate) {
        self.post(WorkerMessage::Update(update));
    }

    pub fn post_text(&self, line: impl Into<String>) {
        self.post(WorkerMessage::Text(line.into()));
    }
}
