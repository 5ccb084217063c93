use garou_types::event;
use rand::Rng;
use tracing::{info, warn};

use crate::game::Game;
use crate::status::JudgeRecord;

impl Game {
    /// Runs the day vote and applies its outcome. Rerun rounds narrow a
    /// tie; a tie that survives every round is settled by a uniform draw
    /// from the tied set.
    pub(crate) async fn do_execution(&mut self) -> anyhow::Result<()> {
        info!(id = %self.id, day = self.current_day, "execution phase starting");
        let mut executed = None;
        let mut candidates = Vec::new();
        for _ in 0..self.setting.vote.max_count {
            self.execute_vote().await?;
            candidates = Self::vote_candidates(&self.current_status().votes);
            if candidates.len() == 1 {
                executed = Some(candidates[0]);
                break;
            }
        }
        if executed.is_none() && !candidates.is_empty() {
            executed = Some(candidates[self.rng.gen_range(0..candidates.len())]);
        }

        let Some(target) = executed else {
            warn!(id = %self.id, "nobody to execute");
            let packet = self.broadcast_packet(event::EXECUTE);
            self.emit_broadcast(packet);
            return Ok(());
        };

        self.current_status_mut().mark_dead(target);
        self.current_status_mut().executed_agent = Some(target);
        let role = self.agent(target).role;
        self.append_log(format!("{},execute,{target},{role}", self.current_day));
        let mut packet = self.broadcast_packet(event::EXECUTE);
        packet.to_idx = Some(target as i32);
        self.emit_broadcast(packet);
        info!(id = %self.id, executed = %self.agent_name(target), "execution resolved");

        // what the medium learns tonight
        self.current_status_mut().medium_result = Some(JudgeRecord {
            day: self.current_day,
            agent: target,
            target,
            result: role.species(),
        });
        Ok(())
    }
}
