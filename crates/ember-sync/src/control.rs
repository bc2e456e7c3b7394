//! Remote control input: key admission into the ring, and the
//! interpreter-side drain.
//!
//! The ring is a fixed-capacity FIFO with oldest-eviction. Producers never
//! stall: when every slot is occupied the oldest key code is shifted out and
//! the newest event takes the last slot. This bounds both the interpreter's
//! scan cost and the damage a fast input source can do to a slow consumer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use tracing::debug;

use ember_common::{
    remote_key_code, DataSlot, DebugCommand, KeyEvent, RemoteType, KEY_RING_SLOTS,
    KEY_SLOT_STRIDE, UNSET,
};

use crate::channel::ScalarChannel;

/// Control happenings surfaced to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    /// Host-level key (`home`, `volumemute`, `poweroff`): announced
    /// immediately, independent of application state.
    Host { key: String, modifier: i32 },
    /// A key accepted toward the interpreter (ring slot or debug break).
    Sent { key: String, modifier: i32 },
}

/// Host-side control surface over a scalar channel.
pub struct Control {
    channel: ScalarChannel,
    events: mpsc::Sender<ControlEvent>,
    send_keys_enabled: AtomicBool,
    debug_disabled: AtomicBool,
}

impl Control {
    pub fn new(channel: ScalarChannel, events: mpsc::Sender<ControlEvent>) -> Self {
        Control {
            channel,
            events,
            send_keys_enabled: AtomicBool::new(false),
            debug_disabled: AtomicBool::new(false),
        }
    }

    /// Opens or closes the key gate; the host flips this as applications
    /// start and stop.
    pub fn enable_send_keys(&self, enable: bool) {
        self.send_keys_enabled.store(enable, Ordering::SeqCst);
    }

    pub fn set_debug_enabled(&self, enabled: bool) {
        self.debug_disabled.store(!enabled, Ordering::SeqCst);
    }

    pub fn debug_enabled(&self) -> bool {
        !self.debug_disabled.load(Ordering::SeqCst)
    }

    /// Injects one key event. `modifier` is 0 for press, 100 for release.
    pub fn send_key(&self, key: &str, modifier: i32) {
        self.send_key_from(key, modifier, RemoteType::Sim, 0);
    }

    pub fn send_key_from(&self, key: &str, modifier: i32, remote: RemoteType, index: i32) {
        let name = key.to_ascii_lowercase();
        if matches!(name.as_str(), "home" | "volumemute" | "poweroff") {
            // Host keys bypass the gate entirely.
            let _ = self.events.send(ControlEvent::Host {
                key: name,
                modifier,
            });
            return;
        }
        if !self.send_keys_enabled.load(Ordering::SeqCst) {
            return;
        }
        if name == "break" {
            if self.debug_enabled() && modifier == 0 {
                self.channel
                    .set(DataSlot::Dbg, DebugCommand::Break.ordinal());
                self.channel.notify(DataSlot::Dbg);
                let _ = self.events.send(ControlEvent::Sent {
                    key: name,
                    modifier,
                });
            }
            return;
        }
        if let Some(code) = remote_key_code(&name) {
            self.admit(code, modifier, remote, index);
            let _ = self.events.send(ControlEvent::Sent {
                key: name,
                modifier,
            });
        } else if let Some(lit) = name.strip_prefix("lit_") {
            let mut chars = lit.chars();
            if let (Some(ch), None) = (chars.next(), chars.next()) {
                self.admit(ch as i32, modifier, remote, index);
                let _ = self.events.send(ControlEvent::Sent {
                    key: name,
                    modifier,
                });
            }
        }
    }

    fn admit(&self, code: i32, modifier: i32, remote: RemoteType, index: i32) {
        let offset = self.next_key_slot();
        self.channel
            .store(DataSlot::Rid.index() + offset, remote as i32 + index);
        self.channel.store(DataSlot::Mod.index() + offset, modifier);
        // Key code goes last: a non-negative key marks the slot occupied.
        self.channel
            .store(DataSlot::Key.index() + offset, code + modifier);
    }

    /// First free ring slot, else shift every key code one slot toward the
    /// head (dropping the oldest) and hand out the last slot.
    fn next_key_slot(&self) -> usize {
        let key_word = |offset: usize| DataSlot::Key.index() + offset;
        for i in 0..KEY_RING_SLOTS {
            let offset = i * KEY_SLOT_STRIDE;
            if self.channel.load(key_word(offset)) < 0 {
                return offset;
            }
        }
        debug!("key ring full, evicting oldest event");
        for i in 1..KEY_RING_SLOTS {
            let prev = (i - 1) * KEY_SLOT_STRIDE;
            let next = i * KEY_SLOT_STRIDE;
            let value = self.channel.load(key_word(next));
            self.channel.store(key_word(prev), value);
        }
        (KEY_RING_SLOTS - 1) * KEY_SLOT_STRIDE
    }
}

/// Interpreter-side ring drain. Collects ring slots in insertion order,
/// frees them, and hands events out one at a time, suppressing immediate
/// duplicates of the last delivered code.
pub struct KeyReader {
    channel: ScalarChannel,
    pending: VecDeque<KeyEvent>,
    last_key: i32,
}

impl KeyReader {
    pub fn new(channel: ScalarChannel) -> Self {
        KeyReader {
            channel,
            pending: VecDeque::new(),
            last_key: UNSET,
        }
    }

    /// Drains newly arrived ring slots and returns the next event, if any.
    pub fn poll(&mut self) -> Option<KeyEvent> {
        for i in 0..KEY_RING_SLOTS {
            let offset = i * KEY_SLOT_STRIDE;
            let key = self.channel.load(DataSlot::Key.index() + offset);
            if key == UNSET {
                break;
            }
            if self
                .pending
                .back()
                .map_or(true, |last| last.key != key)
            {
                let remote_id = self.channel.load(DataSlot::Rid.index() + offset);
                let modifier = self.channel.load(DataSlot::Mod.index() + offset);
                let (remote, index) = RemoteType::split_id(remote_id);
                self.channel.store(DataSlot::Key.index() + offset, UNSET);
                self.pending.push_back(KeyEvent {
                    remote: format!("{}:{}", remote.as_str(), index),
                    key,
                    modifier,
                });
            }
        }
        let event = self.pending.pop_front()?;
        if event.key == self.last_key {
            return None;
        }
        self.last_key = event.key;
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control() -> (Control, ScalarChannel, mpsc::Receiver<ControlEvent>) {
        let channel = ScalarChannel::new();
        let (tx, rx) = mpsc::channel();
        let control = Control::new(channel.clone(), tx);
        control.enable_send_keys(true);
        (control, channel, rx)
    }

    #[test]
    fn keys_are_dropped_while_the_gate_is_closed() {
        let channel = ScalarChannel::new();
        let (tx, _rx) = mpsc::channel();
        let control = Control::new(channel.clone(), tx);
        control.send_key("select", 0);
        assert_eq!(channel.load(DataSlot::Key.index()), UNSET);
    }

    #[test]
    fn host_keys_bypass_the_gate() {
        let channel = ScalarChannel::new();
        let (tx, rx) = mpsc::channel();
        let control = Control::new(channel, tx);
        control.send_key("home", 0);
        assert_eq!(
            rx.try_recv().unwrap(),
            ControlEvent::Host {
                key: "home".into(),
                modifier: 0
            }
        );
    }

    #[test]
    fn break_writes_the_debug_slot_not_the_ring() {
        let (control, channel, _rx) = control();
        control.send_key("break", 0);
        assert_eq!(channel.get(DataSlot::Dbg), DebugCommand::Break.ordinal());
        assert_eq!(channel.load(DataSlot::Key.index()), UNSET);
    }

    #[test]
    fn break_is_ignored_when_debugging_is_disabled() {
        let (control, channel, _rx) = control();
        control.set_debug_enabled(false);
        control.send_key("break", 0);
        assert_eq!(channel.get(DataSlot::Dbg), UNSET);
    }

    #[test]
    fn literal_keys_carry_their_code_point() {
        let (control, channel, _rx) = control();
        control.send_key("lit_a", 0);
        assert_eq!(channel.load(DataSlot::Key.index()), 'a' as i32);
    }

    #[test]
    fn ring_holds_at_most_its_fixed_capacity() {
        let (control, channel, _rx) = control();
        for key in ["up", "down", "left", "right", "select", "back"] {
            control.send_key(key, 0);
        }
        let live = (0..KEY_RING_SLOTS)
            .filter(|i| channel.load(DataSlot::Key.index() + i * KEY_SLOT_STRIDE) >= 0)
            .count();
        assert_eq!(live, KEY_RING_SLOTS);
    }

    #[test]
    fn overflow_evicts_the_oldest_event() {
        let (control, channel, _rx) = control();
        for key in ["up", "down", "left", "right", "select"] {
            control.send_key(key, 0);
        }
        control.send_key("back", 0);

        let mut reader = KeyReader::new(channel);
        let codes: Vec<i32> = std::iter::from_fn(|| reader.poll()).map(|e| e.key).collect();
        assert_eq!(
            codes,
            vec![
                remote_key_code("down").unwrap(),
                remote_key_code("left").unwrap(),
                remote_key_code("right").unwrap(),
                remote_key_code("select").unwrap(),
                remote_key_code("back").unwrap(),
            ]
        );
    }

    #[test]
    fn reader_frees_consumed_slots() {
        let (control, channel, _rx) = control();
        control.send_key("up", 0);
        control.send_key("down", 0);

        let mut reader = KeyReader::new(channel.clone());
        assert_eq!(reader.poll().unwrap().key, remote_key_code("up").unwrap());
        assert_eq!(reader.poll().unwrap().key, remote_key_code("down").unwrap());
        for i in 0..KEY_RING_SLOTS {
            assert_eq!(
                channel.load(DataSlot::Key.index() + i * KEY_SLOT_STRIDE),
                UNSET
            );
        }
    }

    #[test]
    fn reader_decodes_the_remote_class() {
        let channel = ScalarChannel::new();
        let (tx, _rx) = mpsc::channel();
        let control = Control::new(channel.clone(), tx);
        control.enable_send_keys(true);
        control.send_key_from("select", 0, RemoteType::Ecp, 1);

        let mut reader = KeyReader::new(channel);
        let event = reader.poll().unwrap();
        assert_eq!(event.remote, "ECP:1");
        assert_eq!(event.modifier, 0);
    }
}
