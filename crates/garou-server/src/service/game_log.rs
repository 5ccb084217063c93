use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use garou_core::{AgentSummary, GameLogConfig, TextLog};
use tracing::warn;

use super::expand_filename;

struct GameLog {
    filename: String,
    lines: Vec<String>,
}

/// Per-game `day,event,...` line log, one file per game. The file is
/// rewritten on every append so a crash loses at most the final line.
pub struct GameLogService {
    output_dir: PathBuf,
    template: String,
    games: Mutex<HashMap<String, GameLog>>,
}

impl GameLogService {
    pub fn new(config: &GameLogConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.output_dir),
            template: config.filename.clone(),
            games: Mutex::new(HashMap::new()),
        }
    }

    fn save(&self, log: &GameLog) {
        if let Err(err) = std::fs::create_dir_all(&self.output_dir) {
            warn!("failed to create game log dir: {err}");
            return;
        }
        let path = self.output_dir.join(format!("{}.log", log.filename));
        if let Err(err) = std::fs::write(&path, log.lines.join("\n")) {
            warn!(path = %path.display(), "failed to write game log: {err}");
        }
    }
}

impl TextLog for GameLogService {
    fn begin_session(&self, id: &str, agents: &[AgentSummary]) {
        let filename = expand_filename(&self.template, id, agents);
        let mut games = self.games.lock().unwrap();
        games.insert(
            id.to_string(),
            GameLog {
                filename,
                lines: Vec::new(),
            },
        );
    }

    fn append(&self, id: &str, line: String) {
        let mut games = self.games.lock().unwrap();
        if let Some(log) = games.get_mut(id) {
            log.lines.push(line);
            self.save(log);
        }
    }

    fn end_session(&self, id: &str) {
        let mut games = self.games.lock().unwrap();
        if let Some(log) = games.remove(id) {
            self.save(&log);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garou_types::Role;

    #[test]
    fn lines_end_up_in_the_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = GameLogService::new(&GameLogConfig {
            enable: true,
            output_dir: dir.path().to_string_lossy().into_owned(),
            filename: "{game_id}".to_string(),
        });
        let agents = vec![AgentSummary {
            idx: 1,
            team: "a".into(),
            name: "a1".into(),
            role: Role::Villager,
        }];

        service.begin_session("g1", &agents);
        service.append("g1", "0,status,1,VILLAGER,ALIVE,a1".to_string());
        service.append("g1", "0,talk,0,0,1,hello".to_string());
        service.end_session("g1");

        let written = std::fs::read_to_string(dir.path().join("g1.log")).unwrap();
        assert_eq!(
            written,
            "0,status,1,VILLAGER,ALIVE,a1\n0,talk,0,0,1,hello"
        );

        // appends after end are ignored
        service.append("g1", "late".to_string());
        let written = std::fs::read_to_string(dir.path().join("g1.log")).unwrap();
        assert!(!written.contains("late"));
    }
}
