//! Debug command slot: a single-value rendezvous with the interpreter.
//!
//! Only one debug session can be pending at a time, so this is deliberately
//! simpler than the key ring: one slot, written by the host, consumed (and
//! cleared back to unset) by the interpreter at safe points.

use std::time::Duration;

use ember_common::{BufferType, DataSlot, DebugCommand, UNSET};

use crate::buffer::stage_string;
use crate::channel::ScalarChannel;

/// Posts a command and wakes an interpreter blocked on the slot.
pub fn post_command(channel: &ScalarChannel, command: DebugCommand) {
    channel.set(DataSlot::Dbg, command.ordinal());
    channel.notify(DataSlot::Dbg);
}

/// Routes one debugger prompt line: a known keyword becomes its command
/// (with any argument staged as an expression); anything else is evaluated
/// as an expression. `p <x>` is shorthand for `? <x>`.
pub fn send_command_line(channel: &ScalarChannel, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    if let Some(command) = DebugCommand::parse(word) {
        if !rest.is_empty() {
            stage_string(channel, rest, BufferType::DebugExpr);
        }
        post_command(channel, command);
        return;
    }
    let expr = if word.eq_ignore_ascii_case("p") {
        format!("? {rest}")
    } else {
        line.to_string()
    };
    stage_string(channel, &expr, BufferType::DebugExpr);
    post_command(channel, DebugCommand::Expr);
}

/// Interpreter safe-point poll.
///
/// Consumes a pending `Break` (clearing the slot so repeated polls do not
/// re-trigger). A pending `Pause` blocks right here until the slot changes,
/// reporting the `pause`/`continue` transitions through the callback.
pub fn check_break(
    channel: &ScalarChannel,
    mut on_transition: impl FnMut(&str),
) -> Option<DebugCommand> {
    let value = channel.get(DataSlot::Dbg);
    if value == DebugCommand::Break.ordinal() {
        channel.set(DataSlot::Dbg, UNSET);
        return Some(DebugCommand::Break);
    }
    if value == DebugCommand::Pause.ordinal() {
        on_transition("pause");
        channel.wait(DataSlot::Dbg, DebugCommand::Pause.ordinal(), None);
        channel.set(DataSlot::Dbg, UNSET);
        on_transition("continue");
    }
    None
}

/// Debugger prompt wait: blocks while the slot is unset, then takes the
/// command. `None` on timeout or an unknown ordinal.
pub fn wait_command(channel: &ScalarChannel, timeout: Option<Duration>) -> Option<DebugCommand> {
    channel.wait(DataSlot::Dbg, UNSET, timeout);
    let value = channel.get(DataSlot::Dbg);
    if value == UNSET {
        return None;
    }
    channel.set(DataSlot::Dbg, UNSET);
    DebugCommand::from_ordinal(value)
}
