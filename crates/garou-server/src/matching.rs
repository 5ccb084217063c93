use std::collections::HashMap;

use garou_types::Role;
use tracing::debug;

/// Assigns roles across repeated games so every team plays every role
/// about equally often. Tracks a weighted play count per (team, role);
/// an abandoned game is re-weighted to zero so the pairing is retried.
pub struct MatchOptimizer {
    agent_count: u32,
    role_num_map: HashMap<Role, u32>,
    teams: Vec<String>,
    play_weights: HashMap<(String, Role), f64>,
}

impl MatchOptimizer {
    pub fn new(agent_count: u32, role_num_map: HashMap<Role, u32>) -> Self {
        Self {
            agent_count,
            role_num_map,
            teams: Vec::new(),
            play_weights: HashMap::new(),
        }
    }

    pub fn update_team(&mut self, team: &str) {
        if !self.teams.iter().any(|t| t == team) {
            debug!(team, "team registered with the optimizer");
            self.teams.push(team.to_string());
        }
    }

    /// Candidate matches over the known teams. Empty until enough teams
    /// registered; otherwise one match proposing the least-played role
    /// for every seat.
    pub fn get_matches(&self) -> Vec<HashMap<Role, Vec<String>>> {
        if (self.teams.len() as u32) < self.agent_count {
            return Vec::new();
        }
        let mut candidates = self.teams.clone();
        candidates.sort_by(|a, b| {
            self.total_weight(a)
                .partial_cmp(&self.total_weight(b))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        });
        candidates.truncate(self.agent_count as usize);

        let mut seats: Vec<Role> = Vec::new();
        let mut roles: Vec<(&Role, &u32)> = self.role_num_map.iter().collect();
        roles.sort_by_key(|(role, _)| role.as_str());
        for (role, count) in roles {
            for _ in 0..*count {
                seats.push(*role);
            }
        }

        let mut assignment: HashMap<Role, Vec<String>> = HashMap::new();
        let mut unassigned = candidates;
        for role in seats {
            let Some(pos) = best_team_for(&unassigned, role, &self.play_weights) else {
                return Vec::new();
            };
            assignment
                .entry(role)
                .or_default()
                .push(unassigned.remove(pos));
        }
        vec![assignment]
    }

    pub fn set_match_end(&mut self, role_team_map: &HashMap<Role, Vec<String>>) {
        self.set_match_weight(role_team_map, 1.0);
    }

    pub fn set_match_weight(&mut self, role_team_map: &HashMap<Role, Vec<String>>, weight: f64) {
        for (role, teams) in role_team_map {
            for team in teams {
                *self
                    .play_weights
                    .entry((team.clone(), *role))
                    .or_insert(0.0) += weight;
            }
        }
    }

    fn total_weight(&self, team: &str) -> f64 {
        self.play_weights
            .iter()
            .filter(|((t, _), _)| t == team)
            .map(|(_, w)| *w)
            .sum()
    }
}

fn best_team_for(
    teams: &[String],
    role: Role,
    weights: &HashMap<(String, Role), f64>,
) -> Option<usize> {
    teams
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let wa = weights.get(&((*a).clone(), role)).copied().unwrap_or(0.0);
            let wb = weights.get(&((*b).clone(), role)).copied().unwrap_or(0.0);
            wa.partial_cmp(&wb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        })
        .map(|(pos, _)| pos)
}
