//! Worker-thread scaffolding around an externally supplied task runtime.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use anyhow::Result;
use tracing::debug;

use ember_common::TaskPayload;
use ember_sync::ScalarChannel;

use crate::link::TaskLink;
use crate::messages::{HostToWorker, WorkerMessage, WorkerPort};

/// The seam to the interpreter: one call runs one task component to
/// completion. Implementations should poll [`TaskContext::stopped`] between
/// waits so a STOP request can take effect.
pub trait TaskRuntime: Send + Sync + 'static {
    fn run(&self, ctx: TaskContext) -> Result<()>;
}

/// Everything a task worker receives through the handoff protocol.
pub struct TaskContext {
    pub channel: ScalarChannel,
    pub payload: TaskPayload,
    pub link: TaskLink,
    pub port: WorkerPort,
    stop: Arc<AtomicBool>,
}

impl TaskContext {
    /// True once the supervisor has requested termination.
    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Spawns the worker thread. The thread first completes the two-message
/// handoff (channel handle, then payload + link), then hands control to the
/// runtime. Outcome is always reported through the port: a clean return
/// posts `Exited(0)`, an error or panic posts `Fault`.
pub(crate) fn spawn_worker(
    runtime: Arc<dyn TaskRuntime>,
    handoff: mpsc::Receiver<HostToWorker>,
    port: WorkerPort,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut channel: Option<ScalarChannel> = None;
        let (payload, link) = loop {
            match handoff.recv() {
                Ok(HostToWorker::Channel(handle)) => channel = Some(handle),
                Ok(HostToWorker::Payload { payload, link }) => break (payload, link),
                // Supervisor went away before the handoff completed.
                Err(_) => return,
            }
        };
        let Some(channel) = channel else {
            port.post(WorkerMessage::Fault(
                "task payload arrived before the channel handle".into(),
            ));
            return;
        };
        debug!(task = port.task_id(), "task worker started");

        let ctx = TaskContext {
            channel,
            payload: *payload,
            link,
            port: port.clone(),
            stop,
        };
        match catch_unwind(AssertUnwindSafe(|| runtime.run(ctx))) {
            Ok(Ok(())) => port.post(WorkerMessage::Exited(0)),
            Ok(Err(err)) => port.post(WorkerMessage::Fault(format!("{err:#}"))),
            Err(panic) => port.post(WorkerMessage::Fault(panic_text(panic))),
        }
    })
}

fn panic_text(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "task worker panicked".to_string()
    }
}
