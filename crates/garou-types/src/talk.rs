use serde::{Deserialize, Serialize};

/// Utterance sentinel: the agent is finished for this phase.
pub const OVER: &str = "Over";
/// Utterance sentinel: the agent passes this turn.
pub const SKIP: &str = "Skip";
/// Internal sentinel produced when an agent fails to answer. Never
/// serialized to agents or logs; normalized before it leaves the engine.
pub const FORCE_SKIP: &str = "ForceSkip";

/// One talk or whisper entry as it appears on the wire and in histories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Talk {
    pub idx: u32,
    pub day: u32,
    pub turn: u32,
    pub agent: String,
    pub text: String,
}

impl Talk {
    pub fn is_over(&self) -> bool {
        self.text == OVER
    }

    pub fn is_skip(&self) -> bool {
        self.text == SKIP
    }
}

/// Parsed agent reply for a communication phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Say(String),
    Skip,
    Over,
}

impl Reply {
    /// Parses raw response text. `ForceSkip` is not a legal agent reply;
    /// a client sending it is treated as a plain skip.
    pub fn parse(text: &str) -> Reply {
        match text {
            OVER => Reply::Over,
            SKIP | FORCE_SKIP => Reply::Skip,
            _ => Reply::Say(text.to_string()),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Reply::Say(text) => text,
            Reply::Skip => SKIP.to_string(),
            Reply::Over => OVER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_maps_sentinels() {
        assert_eq!(Reply::parse("Over"), Reply::Over);
        assert_eq!(Reply::parse("Skip"), Reply::Skip);
        assert_eq!(Reply::parse("ForceSkip"), Reply::Skip);
        assert_eq!(
            Reply::parse("hello"),
            Reply::Say("hello".to_string())
        );
    }
}
