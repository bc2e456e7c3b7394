//! Scalar channel layout.
//!
//! The channel is a flat block of signed 32-bit slots. The named slots come
//! first, then the key ring (`KEY_RING_SLOTS` events of `KEY_SLOT_STRIDE`
//! words each), then the staged-string buffer. Every slot idles at `UNSET`.

/// Sentinel for "no value / unset" in any channel slot.
pub const UNSET: i32 = -1;

/// Key ring geometry: events held, words per event (remote id, key, mod).
pub const KEY_RING_SLOTS: usize = 5;
pub const KEY_SLOT_STRIDE: usize = 3;

/// Length of the staged-string region, in slots (one character code each).
pub const DATA_BUFFER_LEN: usize = 1024;

/// Named channel slots, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum DataSlot {
    /// Debug command rendezvous.
    Dbg,
    /// Type flag for the staged-string buffer.
    Buf,
    /// Media player event.
    Vdo,
    /// Media player event index.
    Vdx,
    /// Media selection.
    Vse,
    /// Media load progress.
    Vlp,
    /// Media position (seconds).
    Vps,
    /// Media duration (seconds).
    Vdr,
    /// Audio track selection.
    Vat,
    /// Text track selection.
    Vtt,
    /// Sound effect event.
    Snd,
    /// Sound effect index.
    Sdx,
    /// Wave audio streams.
    Wav,
    Wav1,
    Wav2,
    Wav3,
    /// Memory used heap size.
    Muhs,
    /// Memory heap size limit.
    Mhsl,
    /// Measured bandwidth.
    Mbwd,
    /// Consumer Electronics Control status.
    Cec,
    /// HDMI status.
    Hdmi,
    /// Key ring: remote id word of slot 0.
    Rid,
    /// Key ring: key code word of slot 0.
    Key,
    /// Key ring: key modifier word of slot 0.
    Mod,
}

impl DataSlot {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// First word of the key ring (the slot-0 remote id).
pub fn key_ring_base() -> usize {
    DataSlot::Rid.index()
}

/// First word of the staged-string buffer, right after the key ring.
pub fn data_buffer_index() -> usize {
    key_ring_base() + KEY_RING_SLOTS * KEY_SLOT_STRIDE
}

/// Total channel length in slots.
pub fn channel_len() -> usize {
    data_buffer_index() + DATA_BUFFER_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_slots_precede_the_key_ring() {
        assert_eq!(DataSlot::Dbg.index(), 0);
        assert_eq!(DataSlot::Hdmi.index(), 20);
        assert_eq!(DataSlot::Rid.index(), 21);
        assert_eq!(DataSlot::Key.index(), 22);
        assert_eq!(DataSlot::Mod.index(), 23);
    }

    #[test]
    fn buffer_starts_after_the_ring() {
        assert_eq!(key_ring_base(), 21);
        assert_eq!(data_buffer_index(), 21 + 5 * 3);
        assert_eq!(channel_len(), data_buffer_index() + DATA_BUFFER_LEN);
    }
}
