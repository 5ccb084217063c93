use std::collections::HashMap;

use garou_types::{event, Request, Role};
use tracing::{info, warn};

use crate::game::Game;
use crate::status::VoteRecord;

impl Game {
    pub(crate) async fn execute_vote(&mut self) -> anyhow::Result<()> {
        info!(id = %self.id, day = self.current_day, "vote round starting");
        let voters = self.alive_agents();
        let votes = self.collect_votes(Request::Vote, voters).await?;
        self.current_status_mut().votes = votes;
        Ok(())
    }

    pub(crate) async fn execute_attack_vote(&mut self) -> anyhow::Result<()> {
        info!(id = %self.id, day = self.current_day, "attack vote round starting");
        let voters = self.alive_werewolves();
        let votes = self.collect_votes(Request::Attack, voters).await?;
        self.current_status_mut().attack_votes = votes;
        Ok(())
    }

    /// Solicits one ballot from every voter. Votes for dead targets and
    /// unresolvable names are dropped; a failed voter is simply absent.
    async fn collect_votes(
        &mut self,
        request: Request,
        voters: Vec<u32>,
    ) -> anyhow::Result<Vec<VoteRecord>> {
        let mut votes = Vec::new();
        for voter in voters {
            let Some(target) = self.find_target_by_request(voter, request).await? else {
                continue;
            };
            if !self.current_status().is_alive(target) {
                warn!(id = %self.id, voter = %self.agent_name(voter), target = %self.agent_name(target), "vote target is dead, ignoring ballot");
                continue;
            }
            votes.push(VoteRecord {
                day: self.current_day,
                agent: voter,
                target,
            });
            let (family, broadcast_event) = if request == Request::Vote {
                ("vote", event::VOTE)
            } else {
                ("attackVote", event::ATTACK_VOTE)
            };
            self.append_log(format!("{},{family},{voter},{target}", self.current_day));
            let mut packet = self.broadcast_packet(broadcast_event);
            packet.from_idx = Some(voter as i32);
            packet.to_idx = Some(target as i32);
            self.emit_broadcast(packet);
        }
        Ok(votes)
    }

    /// Resolves an agent's answer to another agent, or `None` when the
    /// request failed or named nobody.
    pub(crate) async fn find_target_by_request(
        &mut self,
        agent: u32,
        request: Request,
    ) -> anyhow::Result<Option<u32>> {
        match self.request_to_agent(agent, request).await {
            Ok(text) => {
                let target = self.find_agent_by_name(&text);
                if target.is_none() {
                    warn!(id = %self.id, agent = %self.agent_name(agent), response = %text, "no agent matches the named target");
                }
                Ok(target)
            }
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                warn!(id = %self.id, agent = %self.agent_name(agent), "target request failed: {err}");
                Ok(None)
            }
        }
    }

    /// Every agent tied at the maximum received-vote count, ascending by
    /// index so random tie-breaks draw from a stable order.
    pub(crate) fn vote_candidates(votes: &[VoteRecord]) -> Vec<u32> {
        Self::max_vote_candidates(votes.iter().map(|v| v.target))
    }

    /// As [`Self::vote_candidates`], excluding werewolf targets: the pack
    /// cannot attack its own.
    pub(crate) fn attack_candidates(&self, votes: &[VoteRecord]) -> Vec<u32> {
        Self::max_vote_candidates(
            votes
                .iter()
                .filter(|v| self.agent(v.target).role != Role::Werewolf)
                .map(|v| v.target),
        )
    }

    fn max_vote_candidates(targets: impl Iterator<Item = u32>) -> Vec<u32> {
        let mut counter: HashMap<u32, usize> = HashMap::new();
        for target in targets {
            *counter.entry(target).or_insert(0) += 1;
        }
        let Some(max) = counter.values().copied().max() else {
            return Vec::new();
        };
        let mut candidates: Vec<u32> = counter
            .into_iter()
            .filter(|&(_, count)| count == max)
            .map(|(target, _)| target)
            .collect();
        candidates.sort_unstable();
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_are_the_tied_maximum() {
        let votes = [
            VoteRecord {
                day: 1,
                agent: 1,
                target: 2,
            },
            VoteRecord {
                day: 1,
                agent: 2,
                target: 3,
            },
            VoteRecord {
                day: 1,
                agent: 3,
                target: 2,
            },
        ];
        assert_eq!(Game::vote_candidates(&votes), vec![2]);

        let cycle = [
            VoteRecord {
                day: 1,
                agent: 1,
                target: 2,
            },
            VoteRecord {
                day: 1,
                agent: 2,
                target: 3,
            },
            VoteRecord {
                day: 1,
                agent: 3,
                target: 1,
            },
        ];
        assert_eq!(Game::vote_candidates(&cycle), vec![1, 2, 3]);
    }

    #[test]
    fn no_votes_means_no_candidates() {
        assert!(Game::vote_candidates(&[]).is_empty());
    }
}
