//! Fixed-layout scalar channel.
//!
//! One block of atomically accessed i32 slots shared by every thread of a
//! running application: named telemetry/control slots, the key ring, and the
//! staged-string buffer. All access goes through named accessors; no call
//! site does raw offset arithmetic.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ember_common::{channel_len, DataSlot, MediaEvent, UNSET};

use crate::wait::{self, WaitOutcome};

/// Handle to the channel; clones share the same slots.
#[derive(Clone)]
pub struct ScalarChannel {
    slots: Arc<[AtomicI32]>,
}

impl Default for ScalarChannel {
    fn default() -> Self {
        ScalarChannel::new()
    }
}

impl ScalarChannel {
    /// Allocates the channel at its fixed total size, all slots unset.
    pub fn new() -> Self {
        let slots: Vec<AtomicI32> = (0..channel_len()).map(|_| AtomicI32::new(UNSET)).collect();
        ScalarChannel {
            slots: slots.into(),
        }
    }

    /// Resets every slot to `UNSET`; done on each application (re)launch.
    pub fn reset(&self) {
        for slot in self.slots.iter() {
            slot.store(UNSET, Ordering::SeqCst);
        }
    }

    pub fn get(&self, slot: DataSlot) -> i32 {
        self.load(slot.index())
    }

    pub fn set(&self, slot: DataSlot, value: i32) {
        self.store(slot.index(), value);
    }

    /// Blocks until the slot differs from `expected` (see `wait::wait`).
    pub fn wait(&self, slot: DataSlot, expected: i32, timeout: Option<Duration>) -> WaitOutcome {
        wait::wait(&self.slots[slot.index()], expected, timeout)
    }

    pub fn notify(&self, slot: DataSlot) {
        wait::wake_all(&self.slots[slot.index()]);
    }

    pub(crate) fn load(&self, index: usize) -> i32 {
        self.slots[index].load(Ordering::SeqCst)
    }

    pub(crate) fn store(&self, index: usize, value: i32) {
        self.slots[index].store(value, Ordering::SeqCst);
    }

    // Media/telemetry accessors. One writer-domain per slot by convention:
    // the media pipeline owns the V* slots, the host owns telemetry.

    pub fn set_media_event(&self, event: MediaEvent, index: i32) {
        self.set(DataSlot::Vdx, index);
        self.set(DataSlot::Vdo, event.code());
    }

    pub fn media_event(&self) -> Option<(i32, i32)> {
        let event = self.get(DataSlot::Vdo);
        if event == UNSET {
            return None;
        }
        Some((event, self.get(DataSlot::Vdx)))
    }

    pub fn set_media_selection(&self, index: i32) {
        self.set(DataSlot::Vse, index);
    }

    pub fn set_media_progress(&self, percent: i32) {
        self.set(DataSlot::Vlp, percent);
    }

    pub fn set_media_position(&self, seconds: i32) {
        self.set(DataSlot::Vps, seconds);
    }

    pub fn media_position(&self) -> i32 {
        self.get(DataSlot::Vps)
    }

    pub fn set_media_duration(&self, seconds: i32) {
        self.set(DataSlot::Vdr, seconds);
    }

    pub fn set_audio_track(&self, track: i32) {
        self.set(DataSlot::Vat, track);
    }

    pub fn set_text_track(&self, track: i32) {
        self.set(DataSlot::Vtt, track);
    }

    pub fn set_sound_event(&self, event: i32, index: i32) {
        self.set(DataSlot::Sdx, index);
        self.set(DataSlot::Snd, event);
    }

    pub fn set_memory_stats(&self, used: i32, limit: i32) {
        self.set(DataSlot::Muhs, used);
        self.set(DataSlot::Mhsl, limit);
    }

    pub fn memory_stats(&self) -> (i32, i32) {
        (self.get(DataSlot::Muhs), self.get(DataSlot::Mhsl))
    }

    pub fn set_bandwidth(&self, kbps: i32) {
        self.set(DataSlot::Mbwd, kbps);
    }

    pub fn set_cec_status(&self, status: i32) {
        self.set(DataSlot::Cec, status);
    }

    pub fn set_hdmi_status(&self, status: i32) {
        self.set(DataSlot::Hdmi, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_channel_is_fully_unset() {
        let channel = ScalarChannel::new();
        assert_eq!(channel.get(DataSlot::Dbg), UNSET);
        assert_eq!(channel.get(DataSlot::Hdmi), UNSET);
        assert_eq!(channel.media_event(), None);
    }

    #[test]
    fn reset_clears_every_slot() {
        let channel = ScalarChannel::new();
        channel.set(DataSlot::Dbg, 3);
        channel.set_media_event(MediaEvent::StartPlay, 2);
        channel.set_memory_stats(512, 2048);
        channel.reset();
        assert_eq!(channel.get(DataSlot::Dbg), UNSET);
        assert_eq!(channel.media_event(), None);
        assert_eq!(channel.memory_stats(), (UNSET, UNSET));
    }

    #[test]
    fn clones_share_slots() {
        let channel = ScalarChannel::new();
        let other = channel.clone();
        channel.set_media_position(90);
        assert_eq!(other.media_position(), 90);
    }
}
