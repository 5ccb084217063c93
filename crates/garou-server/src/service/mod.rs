mod event_log;
mod game_log;
mod profiles;
mod realtime;
mod tts;

pub use event_log::EventLogService;
pub use game_log::GameLogService;
pub use profiles::ProfileGenerator;
pub use realtime::RealtimeBroadcaster;
pub use tts::TtsClient;

use std::collections::BTreeSet;

use garou_core::AgentSummary;

/// Expands a log filename template: `{game_id}`, `{timestamp}` and
/// `{teams}` placeholders.
pub(crate) fn expand_filename(template: &str, id: &str, agents: &[AgentSummary]) -> String {
    let teams: BTreeSet<&str> = agents.iter().map(|a| a.team.as_str()).collect();
    let teams = teams.into_iter().collect::<Vec<_>>().join("_");
    template
        .replace("{game_id}", id)
        .replace("{timestamp}", &chrono::Utc::now().timestamp().to_string())
        .replace("{teams}", &teams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use garou_types::Role;

    #[test]
    fn filename_template_expansion() {
        let agents = vec![
            AgentSummary {
                idx: 1,
                team: "beta".into(),
                name: "b1".into(),
                role: Role::Villager,
            },
            AgentSummary {
                idx: 2,
                team: "alpha".into(),
                name: "a1".into(),
                role: Role::Werewolf,
            },
        ];
        let name = expand_filename("{teams}_{game_id}", "01ABC", &agents);
        assert_eq!(name, "alpha_beta_01ABC");
    }
}
