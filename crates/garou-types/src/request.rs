use serde::{Deserialize, Serialize};

/// Server-to-agent request kinds, one per protocol message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    Name,
    Initialize,
    DailyInitialize,
    DailyFinish,
    Talk,
    Whisper,
    Vote,
    Attack,
    Divine,
    Guard,
    Finish,
}

impl Request {
    pub fn as_str(self) -> &'static str {
        match self {
            Request::Name => "NAME",
            Request::Initialize => "INITIALIZE",
            Request::DailyInitialize => "DAILY_INITIALIZE",
            Request::DailyFinish => "DAILY_FINISH",
            Request::Talk => "TALK",
            Request::Whisper => "WHISPER",
            Request::Vote => "VOTE",
            Request::Attack => "ATTACK",
            Request::Divine => "DIVINE",
            Request::Guard => "GUARD",
            Request::Finish => "FINISH",
        }
    }

    /// Requests the agent answers with a payload; the rest are
    /// acknowledged with an empty response.
    pub fn expects_response(self) -> bool {
        matches!(
            self,
            Request::Name
                | Request::Talk
                | Request::Whisper
                | Request::Vote
                | Request::Attack
                | Request::Divine
                | Request::Guard
        )
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
