//! Task lifecycle and field-update routing.
//!
//! One supervisor exists per running application. It owns every table the
//! task layer needs (live workers, per-task inbound/outbound regions), and
//! tears them down explicitly on STOP, fault, exit and reset. Field updates
//! fan out to task inbound regions and fan in through task outbound regions;
//! the supervisor is the only component that creates or destroys those
//! bindings.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use tracing::{debug, warn};

use ember_common::{
    AppPayload, TaskData, TaskPayload, TaskState, ThreadUpdate, UpdateScope, MAX_TASKS,
    REGION_INITIAL_SIZE, REGION_MAX_SIZE,
};
use ember_sync::{ScalarChannel, SharedRegion, WAIT_STORE_TIMEOUT};

use crate::link::TaskLink;
use crate::messages::{HostToWorker, Routed, SupervisorEvent, WorkerMessage, WorkerPort};
use crate::worker::{spawn_worker, TaskRuntime};

struct TaskEntry {
    name: String,
    generation: u64,
    stop: Arc<AtomicBool>,
    // Held so the worker's handoff receiver stays connected; dropped on stop.
    _handoff: mpsc::Sender<HostToWorker>,
}

pub struct TaskSupervisor {
    channel: ScalarChannel,
    runtime: Arc<dyn TaskRuntime>,
    events: mpsc::Sender<SupervisorEvent>,
    port_tx: mpsc::Sender<Routed>,
    port_rx: mpsc::Receiver<Routed>,
    tasks: HashMap<i32, TaskEntry>,
    to_task: HashMap<i32, SharedRegion>,
    to_main: HashMap<i32, SharedRegion>,
    generation: u64,
}

impl TaskSupervisor {
    pub fn new(
        channel: ScalarChannel,
        runtime: Arc<dyn TaskRuntime>,
        events: mpsc::Sender<SupervisorEvent>,
    ) -> Self {
        let (port_tx, port_rx) = mpsc::channel();
        TaskSupervisor {
            channel,
            runtime,
            events,
            port_tx,
            port_rx,
            tasks: HashMap::new(),
            to_task: HashMap::new(),
            to_main: HashMap::new(),
            generation: 0,
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_running(&self, id: i32) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn live_tasks(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.tasks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn inbound_region(&self, id: i32) -> Option<SharedRegion> {
        self.to_task.get(&id).cloned()
    }

    pub fn outbound_region(&self, id: i32) -> Option<SharedRegion> {
        self.to_main.get(&id).cloned()
    }

    /// Handles a RUN/STOP transition issued by the main interpreter. On RUN,
    /// a task presenting its own outbound region gets it registered for
    /// fan-in before admission runs.
    pub fn handle_task_data(
        &mut self,
        data: TaskData,
        outbound: Option<SharedRegion>,
        app: &AppPayload,
    ) {
        match data.state {
            TaskState::Run => {
                if let Some(region) = outbound {
                    self.to_main.insert(data.id, region);
                }
                self.run_task(data, app);
            }
            TaskState::Stop => self.end_task(data.id),
            state => debug!(task = data.id, ?state, "ignoring task transition"),
        }
    }

    fn run_task(&mut self, data: TaskData, app: &AppPayload) {
        if self.tasks.contains_key(&data.id) || data.function_name().is_none() {
            self.emit(SupervisorEvent::Warning(format!(
                "task already running or invalid data: {}, {}",
                data.id, data.name
            )));
            return;
        }
        if self.tasks.len() == MAX_TASKS {
            self.emit(SupervisorEvent::Warning(format!(
                "maximum number of tasks reached: {}",
                self.tasks.len()
            )));
            return;
        }

        let id = data.id;
        let name = data.name.clone();
        let inbound = self
            .to_task
            .entry(id)
            .or_insert_with(|| task_region(id, "in"))
            .clone();

        self.generation += 1;
        let stop = Arc::new(AtomicBool::new(false));
        let port = WorkerPort::new(id, self.generation, self.port_tx.clone());
        let (handoff_tx, handoff_rx) = mpsc::channel();
        let _worker = spawn_worker(
            Arc::clone(&self.runtime),
            handoff_rx,
            port,
            Arc::clone(&stop),
        );

        // Handoff protocol: the shared channel handle first, then the
        // payload carrying the inbound region link.
        let payload = TaskPayload::for_task(app, data);
        let _ = handoff_tx.send(HostToWorker::Channel(self.channel.clone()));
        let _ = handoff_tx.send(HostToWorker::Payload {
            payload: Box::new(payload),
            link: TaskLink::new(inbound),
        });

        self.tasks.insert(
            id,
            TaskEntry {
                name: name.clone(),
                generation: self.generation,
                stop,
                _handoff: handoff_tx,
            },
        );
        debug!(task = id, %name, "task worker started");
        self.emit(SupervisorEvent::TaskStarted { id, name });
    }

    /// Stops a task and releases both of its regions. Releasing is what lets
    /// a later RUN with the same id start from `version == 0`; keeping a
    /// stale region would leave old `wait_store` arithmetic pointing at it.
    pub fn end_task(&mut self, id: i32) {
        if let Some(entry) = self.tasks.remove(&id) {
            entry.stop.store(true, Ordering::SeqCst);
            debug!(task = id, name = %entry.name, "task worker stopped");
            self.emit(SupervisorEvent::TaskStopped { id });
        }
        self.release_regions(id);
    }

    fn release_regions(&mut self, id: i32) {
        self.to_task.remove(&id);
        self.to_main.remove(&id);
    }

    /// Stops every task and clears all tables (application relaunch).
    pub fn reset(&mut self) {
        for id in self.live_tasks() {
            self.end_task(id);
        }
        self.to_task.clear();
        self.to_main.clear();
    }

    /// Routes one field update.
    ///
    /// Fan-in: an update from a task lands in that task's outbound region
    /// for the main thread to read at its own pace. Fan-out: a targeted
    /// update (`id > 0`, from the main thread) goes only to that task's
    /// inbound region; a broadcast goes to every other live task, re-tagged
    /// per receiver. A task never hears its own update back.
    pub fn handle_thread_update(&mut self, update: ThreadUpdate, from_task: bool) {
        if from_task {
            if let Some(region) = self.to_main.get(&update.id) {
                region.wait_store(&update, 1, WAIT_STORE_TIMEOUT);
            }
        }
        if update.id > 0 && !from_task {
            let region = self
                .to_task
                .entry(update.id)
                .or_insert_with(|| task_region(update.id, "in"));
            region.wait_store(&update, 1, WAIT_STORE_TIMEOUT);
        } else if update.scope != UpdateScope::Task {
            let targets: Vec<i32> = self
                .tasks
                .keys()
                .copied()
                .filter(|&id| !from_task || id != update.id)
                .collect();
            for id in targets {
                let retagged = update.for_receiver(id);
                let region = self
                    .to_task
                    .entry(id)
                    .or_insert_with(|| task_region(id, "in"));
                region.wait_store(&retagged, 1, WAIT_STORE_TIMEOUT);
            }
        } else if !from_task {
            debug!(task = update.id, field = %update.field, "thread update with no route");
        }
    }

    /// Drains pending worker messages without blocking.
    pub fn pump(&mut self) {
        while let Ok(routed) = self.port_rx.try_recv() {
            self.dispatch(routed);
        }
    }

    /// Waits up to `wait` for one worker message, then drains the rest.
    pub fn service(&mut self, wait: Duration) {
        match self.port_rx.recv_timeout(wait) {
            Ok(routed) => self.dispatch(routed),
            Err(_) => return,
        }
        self.pump();
    }

    fn dispatch(&mut self, routed: Routed) {
        let id = routed.task_id;
        let live = self
            .tasks
            .get(&id)
            .map(|entry| entry.generation == routed.generation)
            .unwrap_or(false);
        if !live {
            debug!(task = id, "dropping message from a stopped worker");
            return;
        }
        match routed.message {
            WorkerMessage::Registry(data) => self.emit(SupervisorEvent::Registry(data)),
            WorkerMessage::Extension(info) => self.emit(SupervisorEvent::Debug(format!(
                "loaded extension: {} (v{}) from {}",
                info.name, info.version, info.library
            ))),
            WorkerMessage::Text(line) => self.emit(route_text(line)),
            WorkerMessage::Task(data) => {
                debug!(task = data.id, name = %data.name, state = ?data.state, "task data from worker");
                if matches!(data.state, TaskState::Stop | TaskState::Done) {
                    self.end_task(data.id);
                }
            }
            WorkerMessage::Update(update) => {
                debug!(task = update.id, field = %update.field, "update from task thread");
                self.handle_thread_update(update, true);
            }
            WorkerMessage::Fault(reason) => {
                warn!(task = id, %reason, "task worker fault");
                self.emit(SupervisorEvent::TaskFault { id, reason });
                self.tasks.remove(&id);
                self.release_regions(id);
            }
            WorkerMessage::Exited(code) => {
                debug!(task = id, code, "task worker exited");
                self.emit(SupervisorEvent::TaskExited { id, code });
                self.tasks.remove(&id);
                self.release_regions(id);
            }
        }
    }

    fn emit(&self, event: SupervisorEvent) {
        if let SupervisorEvent::Warning(text) = &event {
            warn!("{text}");
        }
        let _ = self.events.send(event);
    }
}

fn task_region(id: i32, direction: &str) -> SharedRegion {
    SharedRegion::named(
        REGION_INITIAL_SIZE,
        REGION_MAX_SIZE,
        format!("task-{id}-{direction}"),
    )
}

fn route_text(line: String) -> SupervisorEvent {
    if let Some(rest) = line.strip_prefix("debug,") {
        SupervisorEvent::Debug(rest.to_string())
    } else if let Some(rest) = line.strip_prefix("warning,") {
        SupervisorEvent::Warning(rest.to_string())
    } else if let Some(rest) = line.strip_prefix("error,") {
        SupervisorEvent::Error(rest.to_string())
    } else {
        SupervisorEvent::Message(line)
    }
}
