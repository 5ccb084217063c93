use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use garou_types::{
    event, AgentStatus, BroadcastAgent, BroadcastPacket, Info, Judge, Packet, Profile, Request,
    Role, Setting, Species, Team, Vote,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};
use ulid::Ulid;

use crate::agent::Agent;
use crate::budget::TurnBudget;
use crate::connection::{Connection, ConnectionError};
use crate::service::{AgentSummary, Collaborators};
use crate::status::{GameStatus, JudgeRecord};

/// One running game session. All state mutation happens on the one task
/// that drives [`Game::start`], so nothing in here needs locking.
pub struct Game {
    pub(crate) id: String,
    pub(crate) setting: Setting,
    pub(crate) max_continue_error_ratio: f64,
    pub(crate) agents: Vec<Agent>,
    pub(crate) win_side: Team,
    pub(crate) finished: Arc<AtomicBool>,
    pub(crate) current_day: u32,
    pub(crate) is_daytime: bool,
    pub(crate) statuses: HashMap<u32, GameStatus>,
    pub(crate) last_talk_idx: HashMap<u32, usize>,
    pub(crate) last_whisper_idx: HashMap<u32, usize>,
    pub(crate) turn_budget: Option<TurnBudget>,
    pub(crate) rng: StdRng,
    pub(crate) broadcast_idx: u64,
    pub(crate) collaborators: Collaborators,
}

impl Game {
    pub fn new(setting: Setting, max_continue_error_ratio: f64, agents: Vec<Agent>) -> Self {
        let id = Ulid::new().to_string();
        Self::with_id(id, setting, max_continue_error_ratio, agents)
    }

    /// All random draws of the session derive from the id, so a replay
    /// with the same id and agent answers is deterministic.
    pub fn with_id(
        id: String,
        setting: Setting,
        max_continue_error_ratio: f64,
        agents: Vec<Agent>,
    ) -> Self {
        let mut statuses = HashMap::new();
        statuses.insert(0, GameStatus::initial(agents.iter().map(|a| a.idx)));
        let rng = StdRng::seed_from_u64(seed_from_id(&id));
        Self {
            id,
            setting,
            max_continue_error_ratio,
            agents,
            win_side: Team::None,
            finished: Arc::new(AtomicBool::new(false)),
            current_day: 0,
            is_daytime: true,
            statuses,
            last_talk_idx: HashMap::new(),
            last_whisper_idx: HashMap::new(),
            turn_budget: None,
            rng,
            broadcast_idx: 0,
            collaborators: Collaborators::default(),
        }
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn win_side(&self) -> Team {
        self.win_side
    }

    /// Shared finish flag the session manager polls during shutdown.
    pub fn finished_handle(&self) -> Arc<AtomicBool> {
        self.finished.clone()
    }

    /// Team name of every agent, grouped by role. Consumed by the
    /// matching optimizer once the game ends.
    pub fn role_team_names(&self) -> HashMap<Role, Vec<String>> {
        let mut map: HashMap<Role, Vec<String>> = HashMap::new();
        for agent in &self.agents {
            map.entry(agent.role).or_default().push(agent.team_name.clone());
        }
        map
    }

    /// Drives the session to completion and returns the winning side
    /// (`None` for an aborted game).
    pub async fn start(&mut self) -> Team {
        info!(id = %self.id, agents = self.agents.len(), "game starting");
        let roster = self.roster();
        if let Some(sink) = &self.collaborators.event_sink {
            sink.begin_session(&self.id, &roster);
        }
        if let Some(log) = &self.collaborators.text_log {
            log.begin_session(&self.id, &roster);
        }

        if let Err(err) = self.run().await {
            error!(id = %self.id, "session aborted: {err:#}");
            self.win_side = Team::None;
        }

        if let Err(err) = self.request_to_everyone(Request::Finish).await {
            warn!(id = %self.id, "finish broadcast failed: {err:#}");
        }
        self.log_statuses();
        let (humans, werewolves) = self.count_alive_species();
        self.append_log(format!(
            "{},result,{humans},{werewolves},{}",
            self.current_day, self.win_side
        ));
        let mut packet = self.broadcast_packet(event::RESULT);
        packet.message = Some(self.win_side.to_string());
        self.emit_broadcast(packet);

        for agent in &mut self.agents {
            agent.close().await;
        }
        if let Some(sink) = &self.collaborators.event_sink {
            sink.end_session(&self.id, self.win_side);
        }
        if let Some(log) = &self.collaborators.text_log {
            log.end_session(&self.id);
        }
        self.finished.store(true, Ordering::SeqCst);
        info!(id = %self.id, win_side = %self.win_side, "game finished");
        self.win_side
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            self.progress_day().await?;
            self.progress_night().await?;
            let next = self.current_status().next_day();
            self.statuses.insert(self.current_day + 1, next);
            self.current_day += 1;
            info!(id = %self.id, day = self.current_day, "day advanced");
            if self.should_finish() {
                return Ok(());
            }
        }
    }

    pub(crate) async fn progress_day(&mut self) -> anyhow::Result<()> {
        info!(id = %self.id, day = self.current_day, "day section starting");
        self.is_daytime = true;
        if self.current_day == 0 {
            self.request_to_everyone(Request::Initialize).await?;
        } else {
            self.request_to_everyone(Request::DailyInitialize).await?;
        }
        self.log_statuses();
        if self.setting.talk_on_first_day && self.current_day == 0 {
            self.do_whisper().await?;
        }
        self.do_talk().await?;
        Ok(())
    }

    pub(crate) async fn progress_night(&mut self) -> anyhow::Result<()> {
        info!(id = %self.id, day = self.current_day, "night section starting");
        self.is_daytime = false;
        self.request_to_everyone(Request::DailyFinish).await?;
        if self.setting.talk_on_first_day && self.current_day == 0 {
            self.do_whisper().await?;
        }
        if self.current_day != 0 {
            self.do_execution().await?;
            if self.should_finish() {
                return Ok(());
            }
        }
        self.do_divine().await?;
        if self.current_day != 0 {
            self.do_whisper().await?;
            self.do_guard().await?;
            self.do_attack().await?;
            if self.should_finish() {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Checks both termination conditions. Sets `win_side` as a side
    /// effect when the win condition holds; an error-ratio abort leaves
    /// the winner at `None`.
    pub(crate) fn should_finish(&mut self) -> bool {
        let errored = self.agents.iter().filter(|a| a.has_error).count();
        let threshold =
            (self.agents.len() as f64 * self.max_continue_error_ratio) as usize;
        if errored >= threshold {
            warn!(id = %self.id, errored, "too many failing agents, giving up");
            return true;
        }
        self.win_side = self.calc_win_side();
        if self.win_side != Team::None {
            info!(id = %self.id, win_side = %self.win_side, "win condition reached");
            return true;
        }
        false
    }

    pub(crate) fn calc_win_side(&self) -> Team {
        let (humans, werewolves) = self.count_alive_species();
        if humans <= werewolves {
            Team::Werewolf
        } else if werewolves == 0 {
            Team::Villager
        } else {
            Team::None
        }
    }

    pub(crate) fn count_alive_species(&self) -> (usize, usize) {
        let status = self.current_status();
        let mut humans = 0;
        let mut werewolves = 0;
        for agent in &self.agents {
            if !status.is_alive(agent.idx) {
                continue;
            }
            match agent.role.species() {
                Species::Human => humans += 1,
                Species::Werewolf => werewolves += 1,
            }
        }
        (humans, werewolves)
    }

    pub(crate) fn current_status(&self) -> &GameStatus {
        self.statuses
            .get(&self.current_day)
            .expect("status exists for every entered day")
    }

    pub(crate) fn current_status_mut(&mut self) -> &mut GameStatus {
        self.statuses
            .get_mut(&self.current_day)
            .expect("status exists for every entered day")
    }

    pub(crate) fn agent(&self, idx: u32) -> &Agent {
        &self.agents[(idx - 1) as usize]
    }

    pub(crate) fn agent_name(&self, idx: u32) -> String {
        self.agent(idx).game_name.clone()
    }

    pub(crate) fn find_agent_by_name(&self, name: &str) -> Option<u32> {
        let name = name.trim();
        self.agents
            .iter()
            .find(|a| a.game_name == name)
            .map(|a| a.idx)
    }

    pub(crate) fn alive_agents(&self) -> Vec<u32> {
        let status = self.current_status();
        self.agents
            .iter()
            .filter(|a| status.is_alive(a.idx))
            .map(|a| a.idx)
            .collect()
    }

    pub(crate) fn alive_werewolves(&self) -> Vec<u32> {
        let status = self.current_status();
        self.agents
            .iter()
            .filter(|a| status.is_alive(a.idx) && a.role.species() == Species::Werewolf)
            .map(|a| a.idx)
            .collect()
    }

    /// Per-agent view: own role always, the wolf pack for wolves, role
    /// results only to the role that produced them, votes only when the
    /// setting exposes them.
    pub(crate) fn build_info(&self, idx: u32) -> Info {
        let agent = self.agent(idx);
        let status = self.current_status();
        let mut info = Info {
            game_id: self.id.clone(),
            day: self.current_day,
            agent: agent.game_name.clone(),
            ..Info::default()
        };

        if let Some(previous) = self
            .current_day
            .checked_sub(1)
            .and_then(|day| self.statuses.get(&day))
        {
            if agent.role == Role::Medium {
                info.medium_result = previous.medium_result.map(|j| self.judge_to_wire(j));
            }
            if agent.role == Role::Seer {
                info.divine_result = previous.divine_result.map(|j| self.judge_to_wire(j));
            }
            info.executed_agent = previous.executed_agent.map(|i| self.agent_name(i));
            info.attacked_agent = previous.attacked_agent.map(|i| self.agent_name(i));
            if self.setting.vote_visibility {
                info.vote_list = Some(
                    previous
                        .votes
                        .iter()
                        .map(|v| Vote {
                            day: v.day,
                            agent: self.agent_name(v.agent),
                            target: self.agent_name(v.target),
                        })
                        .collect(),
                );
                if agent.role == Role::Werewolf {
                    info.attack_vote_list = Some(
                        previous
                            .attack_votes
                            .iter()
                            .map(|v| Vote {
                                day: v.day,
                                agent: self.agent_name(v.agent),
                                target: self.agent_name(v.target),
                            })
                            .collect(),
                    );
                }
            }
        }

        info.talk_list = Some(status.talks.clone());
        if agent.role == Role::Werewolf {
            info.whisper_list = Some(status.whispers.clone());
        }
        info.status_map = self
            .agents
            .iter()
            .map(|a| {
                (
                    a.game_name.clone(),
                    *status
                        .status_map
                        .get(&a.idx)
                        .unwrap_or(&AgentStatus::Alive),
                )
            })
            .collect();

        let mut role_map = HashMap::new();
        role_map.insert(agent.game_name.clone(), agent.role);
        if agent.role == Role::Werewolf {
            for other in &self.agents {
                if other.role == Role::Werewolf {
                    role_map.insert(other.game_name.clone(), other.role);
                }
            }
        }
        info.role_map = role_map;

        if let Some(budget) = &self.turn_budget {
            let (count, length, skip) = budget.quotas_for(idx);
            info.remain_count = count;
            info.remain_length = length;
            info.remain_skip = skip;
        }
        info
    }

    fn judge_to_wire(&self, judge: JudgeRecord) -> Judge {
        Judge {
            day: judge.day,
            agent: self.agent_name(judge.agent),
            target: self.agent_name(judge.target),
            result: judge.result,
        }
    }

    /// Sends one request to one agent. Connection-level failures are the
    /// caller's to absorb; only a malformed outgoing frame is fatal.
    pub(crate) async fn request_to_agent(
        &mut self,
        idx: u32,
        request: Request,
    ) -> Result<String, ConnectionError> {
        let mut info = self.build_info(idx);
        let mut packet = Packet::new(request);
        match request {
            Request::Name => {}
            Request::Initialize | Request::DailyInitialize => {
                self.last_talk_idx.clear();
                self.last_whisper_idx.clear();
                if request == Request::Initialize {
                    info.profile = self.agent(idx).profile.as_ref().map(|p| p.description());
                }
                packet.info = Some(info);
                packet.setting = Some(self.setting.clone());
            }
            Request::Vote | Request::Divine | Request::Guard => {
                packet.info = Some(info);
            }
            Request::DailyFinish | Request::Talk | Request::Whisper | Request::Attack => {
                let is_werewolf = self.agent(idx).role == Role::Werewolf;
                if matches!(request, Request::Talk | Request::DailyFinish) {
                    let len = self.current_status().talks.len();
                    let from = (*self.last_talk_idx.get(&idx).unwrap_or(&0)).min(len);
                    packet.talk_history = Some(self.current_status().talks[from..].to_vec());
                    self.last_talk_idx.insert(idx, len);
                }
                if matches!(request, Request::Whisper | Request::Attack)
                    || (request == Request::DailyFinish && is_werewolf)
                {
                    let len = self.current_status().whispers.len();
                    let from = (*self.last_whisper_idx.get(&idx).unwrap_or(&0)).min(len);
                    packet.whisper_history = Some(self.current_status().whispers[from..].to_vec());
                    self.last_whisper_idx.insert(idx, len);
                }
                packet.info = Some(info);
            }
            Request::Finish => {
                info.role_map = self
                    .agents
                    .iter()
                    .map(|a| (a.game_name.clone(), a.role))
                    .collect();
                packet.info = Some(info);
            }
        }

        let name = self.agent_name(idx);
        if let Some(sink) = &self.collaborators.event_sink {
            sink.record_request(&self.id, &name, &packet);
        }
        let timeouts = self.setting.timeout;
        let result = self.agents[(idx - 1) as usize]
            .send_packet(&packet, timeouts)
            .await;
        if let Some(sink) = &self.collaborators.event_sink {
            match &result {
                Ok(text) => sink.record_response(&self.id, &name, Ok(text)),
                Err(err) => sink.record_response(&self.id, &name, Err(&err.to_string())),
            }
        }
        result
    }

    pub(crate) async fn request_to_everyone(&mut self, request: Request) -> anyhow::Result<()> {
        for idx in 1..=self.agents.len() as u32 {
            match self.request_to_agent(idx, request).await {
                Ok(_) => {}
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    warn!(id = %self.id, agent = %self.agent_name(idx), request = %request, "request failed: {err}");
                }
            }
        }
        Ok(())
    }

    pub(crate) fn log_statuses(&self) {
        let status = self.current_status();
        for agent in &self.agents {
            let state = status
                .status_map
                .get(&agent.idx)
                .copied()
                .unwrap_or(AgentStatus::Alive);
            self.append_log(format!(
                "{},status,{},{},{},{}",
                self.current_day,
                agent.idx,
                agent.role,
                state.as_str(),
                agent.original_name
            ));
        }
    }

    pub(crate) fn append_log(&self, line: String) {
        if let Some(log) = &self.collaborators.text_log {
            log.append(&self.id, line);
        }
    }

    pub(crate) fn roster(&self) -> Vec<AgentSummary> {
        self.agents
            .iter()
            .map(|a| AgentSummary {
                idx: a.idx,
                team: a.team_name.clone(),
                name: a.original_name.clone(),
                role: a.role,
            })
            .collect()
    }

    pub(crate) fn broadcast_packet(&mut self, event: &str) -> BroadcastPacket {
        self.broadcast_idx += 1;
        let status = self.current_status();
        let agents = self
            .agents
            .iter()
            .map(|a| BroadcastAgent {
                idx: a.idx,
                team: a.team_name.clone(),
                name: a.game_name.clone(),
                profile: a.profile.as_ref().map(|p| p.description()),
                avatar: a
                    .profile
                    .as_ref()
                    .filter(|p| !p.avatar_url.is_empty())
                    .map(|p| p.avatar_url.clone()),
                role: a.role.to_string(),
                is_alive: status.is_alive(a.idx),
            })
            .collect();
        BroadcastPacket {
            id: self.id.clone(),
            idx: self.broadcast_idx,
            day: self.current_day,
            is_day: self.is_daytime,
            event: event.to_string(),
            from_idx: None,
            to_idx: None,
            bubble_idx: None,
            message: None,
            agents,
        }
    }

    pub(crate) fn emit_broadcast(&self, packet: BroadcastPacket) {
        if let Some(live) = &self.collaborators.live {
            live.emit(packet);
        }
    }
}

fn seed_from_id(id: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

const ROLE_FILL_ORDER: [Role; 6] = [
    Role::Werewolf,
    Role::Possessed,
    Role::Seer,
    Role::Medium,
    Role::Bodyguard,
    Role::Villager,
];

fn assign_role(remaining: &mut HashMap<Role, u32>) -> Role {
    for role in ROLE_FILL_ORDER {
        if let Some(count) = remaining.get_mut(&role) {
            if *count > 0 {
                *count -= 1;
                return role;
            }
        }
    }
    Role::Villager
}

/// Builds the agent roster from waiting connections and a role
/// distribution. Connection order decides the stable index.
pub fn create_agents(conns: Vec<Connection>, role_num_map: &HashMap<Role, u32>) -> Vec<Agent> {
    let mut remaining = role_num_map.clone();
    conns
        .into_iter()
        .enumerate()
        .map(|(i, conn)| Agent::new(i as u32 + 1, assign_role(&mut remaining), conn))
        .collect()
}

/// As [`create_agents`], with a profile per seat. The caller shuffles the
/// profile list if it wants unpredictable personas.
pub fn create_agents_with_profiles(
    conns: Vec<Connection>,
    role_num_map: &HashMap<Role, u32>,
    profiles: &[Profile],
) -> Vec<Agent> {
    let mut remaining = role_num_map.clone();
    conns
        .into_iter()
        .enumerate()
        .map(|(i, conn)| {
            let role = assign_role(&mut remaining);
            match profiles.get(i) {
                Some(profile) => Agent::with_profile(i as u32 + 1, role, conn, profile.clone()),
                None => Agent::new(i as u32 + 1, role, conn),
            }
        })
        .collect()
}

/// Builds the roster from an explicit role → connections assignment (the
/// matching optimizer's output).
pub fn create_agents_with_roles(mut role_map_conns: HashMap<Role, Vec<Connection>>) -> Vec<Agent> {
    let mut agents = Vec::new();
    let mut i = 0u32;
    for role in ROLE_FILL_ORDER {
        if let Some(conns) = role_map_conns.remove(&role) {
            for conn in conns {
                i += 1;
                agents.push(Agent::new(i, role, conn));
            }
        }
    }
    agents
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use garou_types::{Packet, Request, Talk};

    use super::*;
    use crate::status::VoteRecord;
    use crate::testing::{
        fast_setting, scripted_agent, talker, voter, RecordingLog, ScriptedAction,
    };

    /// First alive name from the preference list, never the agent itself.
    fn preferred_target(packet: &Packet, own: &str, prefs: &[&'static str]) -> String {
        let info = packet.info.as_ref().unwrap();
        for name in prefs {
            if *name == own {
                continue;
            }
            if info
                .status_map
                .get(*name)
                .is_some_and(|status| status.is_alive())
            {
                return name.to_string();
            }
        }
        own.to_string()
    }

    /// Agent that stays quiet in communication and targets down a fixed
    /// preference list for every role action.
    fn playing_agent(
        idx: u32,
        role: Role,
        prefs: Vec<&'static str>,
    ) -> (Agent, Arc<Mutex<Vec<Packet>>>) {
        let own = format!("Agent[{idx:02}]");
        scripted_agent(idx, role, move |packet| match packet.request {
            Request::Talk | Request::Whisper => ScriptedAction::Respond("Over".into()),
            Request::Vote | Request::Attack | Request::Divine | Request::Guard => {
                ScriptedAction::Respond(preferred_target(packet, &own, &prefs))
            }
            _ => ScriptedAction::Respond(String::new()),
        })
    }

    fn rollover(game: &mut Game) {
        let next = game.current_status().next_day();
        game.statuses.insert(game.current_day + 1, next);
        game.current_day += 1;
    }

    #[tokio::test]
    async fn guarded_attack_leaves_the_target_alive_but_is_logged() {
        let log = RecordingLog::new();
        let lines = log.lines();
        let (wolf, _) = voter(1, Role::Werewolf, "Agent[03]");
        let (bodyguard, _) = voter(2, Role::Bodyguard, "Agent[03]");
        let (villager, _) = talker(3, Role::Villager, "Over");
        let mut game = Game::new(fast_setting(), 1.0, vec![wolf, bodyguard, villager])
            .with_collaborators(Collaborators {
                text_log: Some(Arc::new(log)),
                ..Collaborators::default()
            });

        game.do_guard().await.unwrap();
        game.do_attack().await.unwrap();

        assert!(game.current_status().is_alive(3));
        assert_eq!(game.current_status().attacked_agent, None);
        let lines = lines.lock().unwrap();
        assert!(lines.iter().any(|line| line == "0,attack,3,false"));
    }

    #[tokio::test]
    async fn unguarded_attack_kills_the_target() {
        let (wolf, _) = voter(1, Role::Werewolf, "Agent[03]");
        let (bodyguard, _) = voter(2, Role::Bodyguard, "Agent[02]");
        let (villager, _) = talker(3, Role::Villager, "Over");
        let mut game = Game::new(fast_setting(), 1.0, vec![wolf, bodyguard, villager]);

        game.do_attack().await.unwrap();

        assert!(!game.current_status().is_alive(3));
        assert_eq!(game.current_status().attacked_agent, Some(3));
    }

    #[tokio::test]
    async fn self_divination_records_nothing() {
        let (seer, _) = voter(1, Role::Seer, "Agent[01]");
        let (villager, _) = talker(2, Role::Villager, "Over");
        let mut game = Game::new(fast_setting(), 1.0, vec![seer, villager]);

        game.do_divine().await.unwrap();

        assert_eq!(game.current_status().divine_result, None);
        assert!(!game.agent(1).has_error);
    }

    #[tokio::test]
    async fn divination_reveals_the_target_species() {
        let (seer, _) = voter(1, Role::Seer, "Agent[02]");
        let (wolf, _) = talker(2, Role::Werewolf, "Over");
        let mut game = Game::new(fast_setting(), 1.0, vec![seer, wolf]);

        game.do_divine().await.unwrap();

        let judge = game.current_status().divine_result.unwrap();
        assert_eq!(judge.target, 2);
        assert_eq!(judge.result, Species::Werewolf);
    }

    #[tokio::test]
    async fn unbroken_vote_tie_is_settled_by_a_uniform_draw() {
        let (a, _) = voter(1, Role::Villager, "Agent[02]");
        let (b, _) = voter(2, Role::Villager, "Agent[03]");
        let (c, _) = voter(3, Role::Villager, "Agent[01]");
        let mut setting = fast_setting();
        setting.vote.max_count = 3;
        let mut game = Game::new(setting, 1.0, vec![a, b, c]);

        game.do_execution().await.unwrap();

        let executed = game.current_status().executed_agent.expect("someone dies");
        assert!((1..=3).contains(&executed));
        assert!(!game.current_status().is_alive(executed));
        assert_eq!(game.current_status().votes.len(), 3);
        let medium = game.current_status().medium_result.unwrap();
        assert_eq!(medium.target, executed);
    }

    #[tokio::test]
    async fn werewolves_win_when_they_match_the_humans() {
        let prefs = vec![
            "Agent[04]",
            "Agent[05]",
            "Agent[02]",
            "Agent[03]",
            "Agent[01]",
        ];
        let roles = [
            Role::Werewolf,
            Role::Possessed,
            Role::Seer,
            Role::Villager,
            Role::Villager,
        ];
        let mut agents = Vec::new();
        let mut logs = Vec::new();
        for (i, role) in roles.into_iter().enumerate() {
            let (agent, log) = playing_agent(i as u32 + 1, role, prefs.clone());
            agents.push(agent);
            logs.push(log);
        }
        let mut game = Game::new(fast_setting(), 1.0, agents);

        let winner = game.start().await;

        assert_eq!(winner, Team::Werewolf);
        assert!(game.finished_handle().load(Ordering::SeqCst));

        let final_status = game.current_status();
        let dead = final_status
            .status_map
            .values()
            .filter(|s| !s.is_alive())
            .count();
        let resolved: usize = game
            .statuses
            .values()
            .map(|status| {
                status.executed_agent.iter().count() + status.attacked_agent.iter().count()
            })
            .sum();
        assert_eq!(dead, resolved);
        assert_eq!(dead, 3);

        // FINISH reveals the full role map to everyone
        let last = logs[4].lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.request, Request::Finish);
        assert_eq!(last.info.unwrap().role_map.len(), 5);
    }

    #[tokio::test]
    async fn villagers_win_once_the_last_wolf_is_executed() {
        let prefs = vec!["Agent[01]", "Agent[04]"];
        let roles = [
            Role::Werewolf,
            Role::Possessed,
            Role::Seer,
            Role::Villager,
            Role::Villager,
        ];
        let mut agents = Vec::new();
        let mut logs = Vec::new();
        for (i, role) in roles.into_iter().enumerate() {
            let (agent, log) = playing_agent(i as u32 + 1, role, prefs.clone());
            agents.push(agent);
            logs.push(log);
        }
        let mut game = Game::new(fast_setting(), 1.0, agents);

        let winner = game.start().await;

        assert_eq!(winner, Team::Villager);
        // the wolf died in the day vote, so no attack was ever solicited
        let wolf_requests: Vec<Request> =
            logs[0].lock().unwrap().iter().map(|p| p.request).collect();
        assert!(!wolf_requests.contains(&Request::Attack));
    }

    #[tokio::test]
    async fn error_ratio_aborts_the_game_without_a_winner() {
        let (broken, _) = scripted_agent(1, Role::Villager, |packet| match packet.request {
            Request::Talk => ScriptedAction::Fail,
            _ => ScriptedAction::Respond("Over".into()),
        });
        let (fine, _) = talker(2, Role::Villager, "Over");
        let mut game = Game::new(fast_setting(), 0.5, vec![broken, fine]);

        let winner = game.start().await;

        assert_eq!(winner, Team::None);
        assert!(game.finished_handle().load(Ordering::SeqCst));
        assert!(game.agent(1).has_error);
    }

    #[tokio::test]
    async fn day_talk_history_suffixes_reassemble_the_full_day() {
        let seq_a = vec!["a1".to_string(), "a2".to_string(), "Over".to_string()];
        let mut i = 0usize;
        let (a, log_a) = scripted_agent(1, Role::Villager, move |packet| match packet.request {
            Request::Talk => {
                let text = seq_a[i.min(seq_a.len() - 1)].clone();
                i += 1;
                ScriptedAction::Respond(text)
            }
            _ => ScriptedAction::Respond(String::new()),
        });
        let seq_b = vec!["b1".to_string(), "Over".to_string()];
        let mut j = 0usize;
        let (b, _) = scripted_agent(2, Role::Villager, move |packet| match packet.request {
            Request::Talk => {
                let text = seq_b[j.min(seq_b.len() - 1)].clone();
                j += 1;
                ScriptedAction::Respond(text)
            }
            _ => ScriptedAction::Respond(String::new()),
        });
        let mut game = Game::new(fast_setting(), 1.0, vec![a, b]);

        game.progress_day().await.unwrap();
        game.progress_night().await.unwrap();

        let delivered: Vec<Talk> = log_a
            .lock()
            .unwrap()
            .iter()
            .filter_map(|packet| packet.talk_history.clone())
            .flatten()
            .collect();
        assert_eq!(&delivered, &game.current_status().talks);
    }

    #[tokio::test]
    async fn info_is_filtered_to_what_each_agent_may_see() {
        let (w1, _) = talker(1, Role::Werewolf, "Over");
        let (w2, _) = talker(2, Role::Werewolf, "Over");
        let (seer, _) = talker(3, Role::Seer, "Over");
        let (medium, _) = talker(4, Role::Medium, "Over");
        let (villager, _) = talker(5, Role::Villager, "Over");
        let mut setting = fast_setting();
        setting.vote_visibility = true;
        let mut game = Game::new(setting, 1.0, vec![w1, w2, seer, medium, villager]);

        {
            let status = game.current_status_mut();
            status.divine_result = Some(JudgeRecord {
                day: 0,
                agent: 3,
                target: 1,
                result: Species::Werewolf,
            });
            status.medium_result = Some(JudgeRecord {
                day: 0,
                agent: 5,
                target: 5,
                result: Species::Human,
            });
            status.votes.push(VoteRecord {
                day: 0,
                agent: 5,
                target: 1,
            });
            status.attack_votes.push(VoteRecord {
                day: 0,
                agent: 1,
                target: 5,
            });
            status.executed_agent = Some(5);
        }
        rollover(&mut game);

        let seer_info = game.build_info(3);
        assert!(seer_info.divine_result.is_some());
        assert!(seer_info.medium_result.is_none());

        let medium_info = game.build_info(4);
        assert!(medium_info.medium_result.is_some());
        assert!(medium_info.divine_result.is_none());

        let villager_info = game.build_info(5);
        assert!(villager_info.divine_result.is_none());
        assert_eq!(villager_info.role_map.len(), 1);
        assert!(villager_info.whisper_list.is_none());
        assert!(villager_info.vote_list.is_some());
        assert!(villager_info.attack_vote_list.is_none());
        assert_eq!(villager_info.executed_agent.as_deref(), Some("Agent[05]"));

        let wolf_info = game.build_info(1);
        assert_eq!(wolf_info.role_map.len(), 2);
        assert!(wolf_info.whisper_list.is_some());
        assert!(wolf_info.attack_vote_list.is_some());

        game.setting.vote_visibility = false;
        let hidden = game.build_info(5);
        assert!(hidden.vote_list.is_none());
    }
}
