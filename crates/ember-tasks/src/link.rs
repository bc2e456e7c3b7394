//! Worker-side face of field synchronization.
//!
//! A link wraps one inbound versioned region. The producer (the supervisor's
//! fan-out) gates its writes on `version == 1`; the consumer acknowledges by
//! loading with reset, flipping the region back to 0. One payload in flight,
//! ever.

use std::time::Duration;

use tracing::debug;

use ember_common::ThreadUpdate;
use ember_sync::{SharedRegion, WaitOutcome};

#[derive(Clone)]
pub struct TaskLink {
    region: SharedRegion,
}

impl TaskLink {
    pub fn new(region: SharedRegion) -> Self {
        TaskLink { region }
    }

    pub fn region(&self) -> &SharedRegion {
        &self.region
    }

    /// Blocks until the producer publishes (version leaves 0) or the timeout
    /// elapses. Task runtimes should prefer bounded timeouts and check their
    /// stop flag between waits; a stopped worker is never woken forcibly.
    pub fn wait_events(&self, timeout: Option<Duration>) -> WaitOutcome {
        self.region.wait_version(0, timeout)
    }

    /// Takes the pending update, if any, acknowledging it so the next queued
    /// writer can land.
    pub fn pull_update(&self) -> Option<ThreadUpdate> {
        if self.region.version() != 1 {
            return None;
        }
        let value = self.region.load(true);
        match serde_json::from_value::<ThreadUpdate>(value) {
            Ok(update) => Some(update),
            Err(err) => {
                debug!(region = %self.region.name(), %err, "pulled payload was not a thread update");
                None
            }
        }
    }
}
