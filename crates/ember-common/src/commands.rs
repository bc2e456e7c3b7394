//! Debug command, media event and remote control tables.

/// Commands accepted by the interpreter's debug slot, ordinal-valued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DebugCommand {
    Bscs,
    Bt,
    Classes,
    Cont,
    Exit,
    Expr,
    Help,
    Last,
    List,
    Next,
    Stats,
    Step,
    Thread,
    Threads,
    Var,
    Break,
    Pause,
}

impl DebugCommand {
    pub fn ordinal(self) -> i32 {
        self as i32
    }

    pub fn from_ordinal(value: i32) -> Option<Self> {
        match value {
            0 => Some(DebugCommand::Bscs),
            1 => Some(DebugCommand::Bt),
            2 => Some(DebugCommand::Classes),
            3 => Some(DebugCommand::Cont),
            4 => Some(DebugCommand::Exit),
            5 => Some(DebugCommand::Expr),
            6 => Some(DebugCommand::Help),
            7 => Some(DebugCommand::Last),
            8 => Some(DebugCommand::List),
            9 => Some(DebugCommand::Next),
            10 => Some(DebugCommand::Stats),
            11 => Some(DebugCommand::Step),
            12 => Some(DebugCommand::Thread),
            13 => Some(DebugCommand::Threads),
            14 => Some(DebugCommand::Var),
            15 => Some(DebugCommand::Break),
            16 => Some(DebugCommand::Pause),
            _ => None,
        }
    }

    /// Parses a debugger prompt keyword, including the short aliases.
    /// Unknown text is not a parse failure at the call site: the prompt
    /// routes it as an `Expr` with the raw text staged separately.
    pub fn parse(word: &str) -> Option<Self> {
        match word.trim().to_ascii_lowercase().as_str() {
            "bscs" => Some(DebugCommand::Bscs),
            "bt" => Some(DebugCommand::Bt),
            "classes" => Some(DebugCommand::Classes),
            "cont" | "c" => Some(DebugCommand::Cont),
            "exit" => Some(DebugCommand::Exit),
            "help" => Some(DebugCommand::Help),
            "last" | "l" => Some(DebugCommand::Last),
            "list" => Some(DebugCommand::List),
            "next" | "n" => Some(DebugCommand::Next),
            "stats" => Some(DebugCommand::Stats),
            "over" | "out" | "step" | "s" | "t" => Some(DebugCommand::Step),
            "thread" | "th" => Some(DebugCommand::Thread),
            "threads" | "ths" => Some(DebugCommand::Threads),
            "var" => Some(DebugCommand::Var),
            "break" => Some(DebugCommand::Break),
            _ => None,
        }
    }
}

/// Media player lifecycle events published through the `Vdo` slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum MediaEvent {
    Selected,
    Full,
    Partial,
    Paused,
    Resumed,
    Finished,
    Failed,
    Loading,
    StartStream,
    StartPlay,
    Position,
    TooMany,
}

impl MediaEvent {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Remote control classes. The remote id word carries `class + index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum RemoteType {
    Ir = 10,
    Wd = 20,
    Bt = 30,
    Sim = 40,
    Ecp = 50,
    Rmob = 60,
}

impl RemoteType {
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteType::Ir => "IR",
            RemoteType::Wd => "WD",
            RemoteType::Bt => "BT",
            RemoteType::Sim => "SIM",
            RemoteType::Ecp => "ECP",
            RemoteType::Rmob => "RMOB",
        }
    }

    /// Splits a remote id word into its class and per-class index.
    /// Unknown classes decode as `Sim`, matching the device behavior.
    pub fn split_id(id: i32) -> (Self, i32) {
        let class = (id / 10) * 10;
        let remote = match class {
            10 => RemoteType::Ir,
            20 => RemoteType::Wd,
            30 => RemoteType::Bt,
            40 => RemoteType::Sim,
            50 => RemoteType::Ecp,
            60 => RemoteType::Rmob,
            _ => RemoteType::Sim,
        };
        (remote, id - class)
    }
}

/// Payload kinds that can sit in the staged-string buffer, flagged in `Buf`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum BufferType {
    DebugExpr,
    MediaTracks,
    SysLog,
    Input,
}

impl BufferType {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(value: i32) -> Option<Self> {
        match value {
            0 => Some(BufferType::DebugExpr),
            1 => Some(BufferType::MediaTracks),
            2 => Some(BufferType::SysLog),
            3 => Some(BufferType::Input),
            _ => None,
        }
    }
}

/// Remote key name to key code, per the reference remote mapping.
pub fn remote_key_code(name: &str) -> Option<i32> {
    let code = match name {
        "back" => 0,
        "channelup" => 1114134,
        "channeldown" => 1114135,
        "up" => 2,
        "down" => 3,
        "left" => 4,
        "right" => 5,
        "select" => 6,
        "instantreplay" => 7,
        "rev" => 8,
        "fwd" => 9,
        "info" => 10,
        "backspace" => 11,
        "play" | "pause" => 13,
        "enter" => 15,
        "a" => 17,
        "b" => 18,
        "playonly" => 22,
        "stop" => 23,
        "red" => 1114226,
        "green" => 1114227,
        "yellow" => 1114228,
        "blue" => 1114229,
        "exit" => 1114230,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_command_aliases_share_ordinals() {
        assert_eq!(DebugCommand::parse("cont"), Some(DebugCommand::Cont));
        assert_eq!(DebugCommand::parse("c"), Some(DebugCommand::Cont));
        assert_eq!(DebugCommand::parse("OVER"), Some(DebugCommand::Step));
        assert_eq!(DebugCommand::parse("ths"), Some(DebugCommand::Threads));
        assert_eq!(DebugCommand::parse("print 1+1"), None);
    }

    #[test]
    fn ordinals_round_trip() {
        for ord in 0..17 {
            let cmd = DebugCommand::from_ordinal(ord).expect("known ordinal");
            assert_eq!(cmd.ordinal(), ord);
        }
        assert_eq!(DebugCommand::from_ordinal(17), None);
        assert_eq!(DebugCommand::Pause.ordinal(), 16);
    }

    #[test]
    fn remote_ids_split_into_class_and_index() {
        assert_eq!(RemoteType::split_id(42), (RemoteType::Sim, 2));
        assert_eq!(RemoteType::split_id(50), (RemoteType::Ecp, 0));
        assert_eq!(RemoteType::split_id(7), (RemoteType::Sim, 7));
    }

    #[test]
    fn play_and_pause_share_a_key_code() {
        assert_eq!(remote_key_code("play"), remote_key_code("pause"));
        assert_eq!(remote_key_code("volume"), None);
    }
}
