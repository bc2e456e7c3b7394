//! Cross-thread shared-state core.
//!
//! Everything here rests on one platform primitive: atomic load/store plus
//! wait/notify on plain 32-bit words. Above that sit the two shared-memory
//! shapes of the runtime, the fixed-layout [`ScalarChannel`] for
//! time-critical scalar signals (keys, debug breaks, media state) and the
//! growable [`SharedRegion`] mailbox for structured payloads, plus the
//! control/debug protocols built from them.

pub mod buffer;
mod channel;
mod control;
pub mod debug;
mod region;
pub mod wait;

pub use channel::ScalarChannel;
pub use control::{Control, ControlEvent, KeyReader};
pub use region::{SharedRegion, WAIT_STORE_TIMEOUT};
pub use wait::WaitOutcome;
