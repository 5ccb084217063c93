use garou_types::event;
use rand::Rng;
use tracing::{info, warn};

use crate::game::Game;

impl Game {
    /// Runs the attack vote and resolves the night kill. A tie that
    /// survives the rerun rounds is settled by a uniform draw unless the
    /// setting allows a no-target night. A guarded target survives; the
    /// attempt is still logged.
    pub(crate) async fn do_attack(&mut self) -> anyhow::Result<()> {
        info!(id = %self.id, day = self.current_day, "attack phase starting");
        if self.alive_werewolves().is_empty() {
            return Ok(());
        }
        let mut attacked = None;
        let mut candidates = Vec::new();
        for _ in 0..self.setting.attack_vote.max_count {
            self.execute_attack_vote().await?;
            candidates = self.attack_candidates(&self.current_status().attack_votes);
            if candidates.len() == 1 {
                attacked = Some(candidates[0]);
                break;
            }
        }
        if attacked.is_none() && !self.setting.attack_vote.allow_no_target && !candidates.is_empty()
        {
            attacked = Some(candidates[self.rng.gen_range(0..candidates.len())]);
        }

        match attacked {
            Some(target) if !self.is_guarded(target) => {
                self.current_status_mut().mark_dead(target);
                self.current_status_mut().attacked_agent = Some(target);
                self.append_log(format!("{},attack,{target},true", self.current_day));
                let mut packet = self.broadcast_packet(event::ATTACK);
                packet.to_idx = Some(target as i32);
                self.emit_broadcast(packet);
                info!(id = %self.id, attacked = %self.agent_name(target), "attack succeeded");
            }
            Some(target) => {
                self.append_log(format!("{},attack,{target},false", self.current_day));
                let mut packet = self.broadcast_packet(event::ATTACK);
                packet.from_idx = Some(-1);
                packet.to_idx = Some(target as i32);
                self.emit_broadcast(packet);
                info!(id = %self.id, target = %self.agent_name(target), "attack blocked by the guard");
            }
            None => {
                self.append_log(format!("{},attack,-1,true", self.current_day));
                let packet = self.broadcast_packet(event::ATTACK);
                self.emit_broadcast(packet);
                warn!(id = %self.id, "no attack target tonight");
            }
        }
        Ok(())
    }

    fn is_guarded(&self, target: u32) -> bool {
        self.current_status().guard.is_some_and(|guard| {
            guard.target == target && self.current_status().is_alive(guard.agent)
        })
    }
}
