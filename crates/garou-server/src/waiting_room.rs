use std::collections::{HashMap, VecDeque};

use garou_core::Connection;
use garou_types::Role;
use tracing::info;

/// Authenticated connections waiting to be composed into a session,
/// keyed by team and drained FIFO across teams.
#[derive(Default)]
pub struct WaitingRoom {
    connections: HashMap<String, VecDeque<Connection>>,
    arrival_order: VecDeque<String>,
}

impl WaitingRoom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conn: Connection) {
        let team = conn.team_name.clone();
        info!(team = %team, name = %conn.original_name, "connection joined the waiting room");
        self.connections.entry(team.clone()).or_default().push_back(conn);
        self.arrival_order.push_back(team);
    }

    pub fn len(&self) -> usize {
        self.connections.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn teams(&self) -> Vec<String> {
        self.connections
            .iter()
            .filter(|(_, conns)| !conns.is_empty())
            .map(|(team, _)| team.clone())
            .collect()
    }

    /// Takes `count` connections in arrival order, or nothing when fewer
    /// are waiting.
    pub fn take(&mut self, count: usize) -> Option<Vec<Connection>> {
        if self.len() < count {
            return None;
        }
        let mut taken = Vec::with_capacity(count);
        while taken.len() < count {
            let team = self.arrival_order.pop_front()?;
            if let Some(conn) = self
                .connections
                .get_mut(&team)
                .and_then(VecDeque::pop_front)
            {
                taken.push(conn);
            }
        }
        Some(taken)
    }

    /// Takes one connection per seat of an optimizer match, or nothing if
    /// any required team has nobody waiting. The room is untouched on
    /// failure.
    pub fn take_for_match(
        &mut self,
        match_teams: &HashMap<Role, Vec<String>>,
    ) -> Option<HashMap<Role, Vec<Connection>>> {
        let mut needed: HashMap<&str, usize> = HashMap::new();
        for team in match_teams.values().flatten() {
            *needed.entry(team.as_str()).or_insert(0) += 1;
        }
        for (team, count) in &needed {
            if self.connections.get(*team).map_or(0, VecDeque::len) < *count {
                return None;
            }
        }
        let mut out: HashMap<Role, Vec<Connection>> = HashMap::new();
        for (role, teams) in match_teams {
            for team in teams {
                if let Some(conn) = self
                    .connections
                    .get_mut(team)
                    .and_then(VecDeque::pop_front)
                {
                    self.remove_arrival(team);
                    out.entry(*role).or_default().push(conn);
                }
            }
        }
        Some(out)
    }

    fn remove_arrival(&mut self, team: &str) {
        if let Some(pos) = self.arrival_order.iter().position(|t| t == team) {
            self.arrival_order.remove(pos);
        }
    }
}
