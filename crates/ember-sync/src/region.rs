//! Growable versioned region: a lock-free single-slot mailbox.
//!
//! A region carries one JSON (or raw) payload at a time. The atomic
//! `(length, version)` header is the whole protocol: a producer writes bytes,
//! publishes the length, bumps the version and wakes waiters; the consumer's
//! acknowledgement is any later version change (usually a reset to 0 on
//! `load`). `wait_store` builds the producer-side backpressure on top: writes
//! queue one behind another, each gets a single timeout-bounded attempt, and
//! a timed-out write is dropped, never retried.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error};

use ember_common::{REGION_INITIAL_SIZE, REGION_MAX_SIZE};

use crate::wait::{self, WaitOutcome};

/// Default budget for one queued `wait_store` attempt.
pub const WAIT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

struct Pending {
    bytes: Vec<u8>,
    expected: i32,
    timeout: Duration,
}

struct RegionState {
    buf: Vec<u8>,
    queue: VecDeque<Pending>,
    draining: bool,
}

struct RegionInner {
    name: String,
    max_size: usize,
    len: AtomicI32,
    version: AtomicI32,
    state: Mutex<RegionState>,
}

/// Handle to a shared region. Clones are cheap and all refer to the same
/// buffer, which is how a handle crosses a thread boundary.
#[derive(Clone)]
pub struct SharedRegion {
    inner: Arc<RegionInner>,
}

impl Default for SharedRegion {
    fn default() -> Self {
        SharedRegion::new(REGION_INITIAL_SIZE, REGION_MAX_SIZE)
    }
}

impl SharedRegion {
    pub fn new(initial_size: usize, max_size: usize) -> Self {
        SharedRegion::named(initial_size, max_size, "region")
    }

    /// Same as `new`, with a name carried into log events.
    pub fn named(initial_size: usize, max_size: usize, name: impl Into<String>) -> Self {
        let initial = initial_size.min(max_size);
        SharedRegion {
            inner: Arc::new(RegionInner {
                name: name.into(),
                max_size,
                len: AtomicI32::new(0),
                version: AtomicI32::new(0),
                state: Mutex::new(RegionState {
                    buf: vec![0; initial],
                    queue: VecDeque::new(),
                    draining: false,
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn max_size(&self) -> usize {
        self.inner.max_size
    }

    /// Monotonic version counter; changes signal a new payload (or a
    /// consumer reset to 0).
    pub fn version(&self) -> i32 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Blocks until the version differs from `expected` or `timeout`
    /// elapses (`None` waits without bound).
    pub fn wait_version(&self, expected: i32, timeout: Option<Duration>) -> WaitOutcome {
        wait::wait(&self.inner.version, expected, timeout)
    }

    /// Serializes `payload` and publishes it immediately. On a capacity
    /// violation the store is refused and logged; the version does not move,
    /// which is the caller's only failure signal.
    pub fn store<T: Serialize>(&self, payload: &T) {
        match serde_json::to_vec(payload) {
            Ok(bytes) => self.store_bytes(&bytes),
            Err(err) => error!(region = %self.inner.name, %err, "payload did not serialize"),
        }
    }

    /// Publishes raw bytes without JSON encoding.
    pub fn store_bytes(&self, bytes: &[u8]) {
        let mut state = self.inner.state.lock().unwrap();
        if !self.ensure_capacity(&mut state, bytes.len()) {
            return;
        }
        state.buf[..bytes.len()].copy_from_slice(bytes);
        drop(state);
        self.inner.len.store(bytes.len() as i32, Ordering::SeqCst);
        self.inner.version.fetch_add(1, Ordering::SeqCst);
        wait::wake_all(&self.inner.version);
    }

    /// Decodes the current payload as JSON. Absent or malformed payloads
    /// yield an empty object (malformed ones are logged, not raised). With
    /// `reset`, the version is set back to 0 and waiters are woken; that is
    /// the consumer acknowledgement `wait_store` producers block on.
    pub fn load(&self, reset: bool) -> serde_json::Value {
        let empty = serde_json::Value::Object(serde_json::Map::new());
        let Some(bytes) = self.load_bytes(reset) else {
            return empty;
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => {
                error!(region = %self.inner.name, %err, "stored payload did not decode");
                empty
            }
        }
    }

    /// Raw-bytes variant of `load`.
    pub fn load_bytes(&self, reset: bool) -> Option<Vec<u8>> {
        let len = self.inner.len.load(Ordering::SeqCst);
        if len < 1 {
            return None;
        }
        let state = self.inner.state.lock().unwrap();
        let bytes = state.buf[..len as usize].to_vec();
        drop(state);
        if reset {
            self.inner.version.store(0, Ordering::SeqCst);
            wait::wake_all(&self.inner.version);
        }
        Some(bytes)
    }

    /// Queues `payload` to be stored once the version differs from
    /// `expected` (i.e. the previous payload was consumed). Returns
    /// immediately; at most one queued entry is in flight at a time, and an
    /// entry whose wait times out is dropped and logged, never retried.
    pub fn wait_store<T: Serialize>(&self, payload: &T, expected: i32, timeout: Duration) {
        let bytes = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(region = %self.inner.name, %err, "queued payload did not serialize");
                return;
            }
        };
        let mut state = self.inner.state.lock().unwrap();
        state.queue.push_back(Pending {
            bytes,
            expected,
            timeout,
        });
        if state.draining {
            return;
        }
        state.draining = true;
        drop(state);

        let region = self.clone();
        std::thread::spawn(move || region.drain_queue());
    }

    fn drain_queue(&self) {
        loop {
            let pending = {
                let mut state = self.inner.state.lock().unwrap();
                match state.queue.pop_front() {
                    Some(pending) => pending,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };
            match self.wait_version(pending.expected, Some(pending.timeout)) {
                WaitOutcome::TimedOut => {
                    error!(
                        region = %self.inner.name,
                        expected = pending.expected,
                        "timed out waiting to store shared data; entry dropped"
                    );
                }
                outcome => {
                    self.store_bytes(&pending.bytes);
                    debug!(
                        region = %self.inner.name,
                        version = self.version(),
                        immediate = (outcome == WaitOutcome::NotEqual),
                        "buffer free, stored queued data"
                    );
                }
            }
        }
    }

    fn ensure_capacity(&self, state: &mut RegionState, size: usize) -> bool {
        if size > self.inner.max_size {
            error!(
                region = %self.inner.name,
                size,
                max = self.inner.max_size,
                "buffer is full, cannot store more data"
            );
            return false;
        }
        if size > state.buf.len() {
            let new_size = self.inner.max_size.min((size * 2).max(state.buf.len() * 2));
            state.buf.resize(new_size, 0);
        }
        true
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.inner.state.lock().unwrap().buf.len()
    }
}
