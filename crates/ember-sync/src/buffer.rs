//! Staged-string buffer: variable-length payloads over the scalar channel.
//!
//! Strings cross as raw UTF-16 code units terminated by a zero sentinel,
//! with the payload kind published in the `Buf` flag slot last. One staged
//! payload can be pending at a time; the consumer clears the flag back to
//! unset after reading.

use tracing::warn;

use ember_common::{data_buffer_index, BufferType, DataSlot, DATA_BUFFER_LEN, UNSET};

use crate::channel::ScalarChannel;

/// Stages `text` for the interpreter, truncated at the buffer capacity.
pub fn stage_string(channel: &ScalarChannel, text: &str, kind: BufferType) {
    if channel.get(DataSlot::Buf) != UNSET {
        warn!(?kind, "staged buffer still pending, overwriting");
    }
    let base = data_buffer_index();
    let mut written = 0;
    for unit in text.encode_utf16() {
        if written == DATA_BUFFER_LEN {
            break;
        }
        channel.store(base + written, unit as i32);
        written += 1;
    }
    if written < DATA_BUFFER_LEN {
        channel.store(base + written, 0);
    }
    channel.set(DataSlot::Buf, kind.code());
    channel.notify(DataSlot::Buf);
}

/// Reads the pending staged payload, clearing the flag. `None` when nothing
/// is staged or the flag value is unknown.
pub fn read_staged(channel: &ScalarChannel) -> Option<(BufferType, String)> {
    let flag = channel.get(DataSlot::Buf);
    let kind = BufferType::from_code(flag)?;
    let base = data_buffer_index();
    let mut units = Vec::new();
    for i in 0..DATA_BUFFER_LEN {
        let word = channel.load(base + i);
        if word <= 0 {
            break;
        }
        units.push(word as u16);
    }
    channel.set(DataSlot::Buf, UNSET);
    Some((kind, String::from_utf16_lossy(&units)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_strings_round_trip_and_clear_the_flag() {
        let channel = ScalarChannel::new();
        stage_string(&channel, r#"{"type":"transport"}"#, BufferType::Input);
        let (kind, text) = read_staged(&channel).unwrap();
        assert_eq!(kind, BufferType::Input);
        assert_eq!(text, r#"{"type":"transport"}"#);
        assert_eq!(channel.get(DataSlot::Buf), UNSET);
        assert_eq!(read_staged(&channel), None);
    }

    #[test]
    fn nothing_staged_reads_as_none() {
        let channel = ScalarChannel::new();
        assert_eq!(read_staged(&channel), None);
    }

    #[test]
    fn oversized_strings_truncate_at_capacity() {
        let channel = ScalarChannel::new();
        let long = "k".repeat(DATA_BUFFER_LEN + 64);
        stage_string(&channel, &long, BufferType::SysLog);
        let (_, text) = read_staged(&channel).unwrap();
        assert_eq!(text.len(), DATA_BUFFER_LEN);
    }

    #[test]
    fn restaging_overwrites_the_previous_payload() {
        let channel = ScalarChannel::new();
        stage_string(&channel, "first", BufferType::DebugExpr);
        stage_string(&channel, "second", BufferType::DebugExpr);
        let (_, text) = read_staged(&channel).unwrap();
        assert_eq!(text, "second");
    }
}
