use serde::{Deserialize, Serialize};

use crate::{Info, Request, Setting, Talk};

/// One server-to-agent frame. Fields beyond `request` are attached per
/// request kind; histories are incremental suffixes since the previous
/// frame sent to the same agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Packet {
    pub request: Request,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setting: Option<Setting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talk_history: Option<Vec<Talk>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whisper_history: Option<Vec<Talk>>,
}

impl Packet {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            info: None,
            setting: None,
            talk_history: None,
            whisper_history: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_packet_serializes_to_request_only() {
        let packet = Packet::new(Request::Name);
        assert_eq!(
            serde_json::to_string(&packet).unwrap(),
            r#"{"request":"NAME"}"#
        );
    }
}
