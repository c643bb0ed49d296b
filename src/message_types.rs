use serde::Serialize;

/// The fixed set of ArduPilot dataflash message types the pipeline keeps.
///
/// Frames decoded with any other tag are counted as unknown and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Cmd,
    Msg,
    File,
    Mode,
    Ahr2,
    Att,
    Gps,
    Pos,
    Xkq1,
    Xkq,
    Nkq1,
    Nkq2,
    Xkq2,
    Parm,
    Stat,
    Ev,
    Xkf4,
    Fnce,
    Bat,
    Rcin,
}

impl MessageType {
    /// Every tracked message type, in the order used for serialized output.
    pub const ALL: [MessageType; 20] = [
        MessageType::Cmd,
        MessageType::Msg,
        MessageType::File,
        MessageType::Mode,
        MessageType::Ahr2,
        MessageType::Att,
        MessageType::Gps,
        MessageType::Pos,
        MessageType::Xkq1,
        MessageType::Xkq,
        MessageType::Nkq1,
        MessageType::Nkq2,
        MessageType::Xkq2,
        MessageType::Parm,
        MessageType::Stat,
        MessageType::Ev,
        MessageType::Xkf4,
        MessageType::Fnce,
        MessageType::Bat,
        MessageType::Rcin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Cmd => "CMD",
            MessageType::Msg => "MSG",
            MessageType::File => "FILE",
            MessageType::Mode => "MODE",
            MessageType::Ahr2 => "AHR2",
            MessageType::Att => "ATT",
            MessageType::Gps => "GPS",
            MessageType::Pos => "POS",
            MessageType::Xkq1 => "XKQ1",
            MessageType::Xkq => "XKQ",
            MessageType::Nkq1 => "NKQ1",
            MessageType::Nkq2 => "NKQ2",
            MessageType::Xkq2 => "XKQ2",
            MessageType::Parm => "PARM",
            MessageType::Stat => "STAT",
            MessageType::Ev => "EV",
            MessageType::Xkf4 => "XKF4",
            MessageType::Fnce => "FNCE",
            MessageType::Bat => "BAT",
            MessageType::Rcin => "RCIN",
        }
    }

    /// Look up a decoded frame's tag. Case-sensitive: dataflash tags are
    /// always upper case, anything else is treated as unknown.
    pub fn from_tag(tag: &str) -> Option<MessageType> {
        MessageType::ALL.iter().copied().find(|t| t.as_str() == tag)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for msg_type in MessageType::ALL {
            assert_eq!(MessageType::from_tag(msg_type.as_str()), Some(msg_type));
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(MessageType::from_tag("IMU"), None);
        assert_eq!(MessageType::from_tag("gps"), None);
        assert_eq!(MessageType::from_tag(""), None);
    }

    #[test]
    fn test_serializes_as_tag() {
        let json = serde_json::to_string(&MessageType::Xkq1).unwrap();
        assert_eq!(json, "\"XKQ1\"");
    }
}
