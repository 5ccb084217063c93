use garou_types::{event, Request, Role};
use tracing::{info, warn};

use crate::game::Game;
use crate::status::JudgeRecord;

impl Game {
    pub(crate) async fn do_divine(&mut self) -> anyhow::Result<()> {
        info!(id = %self.id, day = self.current_day, "divine phase starting");
        let seer = self
            .alive_agents()
            .into_iter()
            .find(|&idx| self.agent(idx).role == Role::Seer);
        if let Some(seer) = seer {
            self.conduct_divination(seer).await?;
        }
        Ok(())
    }

    /// One divination: self-targets, dead targets, and unresolvable names
    /// all drop the result without a retry.
    async fn conduct_divination(&mut self, seer: u32) -> anyhow::Result<()> {
        let Some(target) = self.find_target_by_request(seer, Request::Divine).await? else {
            warn!(id = %self.id, "divine target not resolved, skipping divination");
            return Ok(());
        };
        if !self.current_status().is_alive(target) {
            warn!(id = %self.id, target = %self.agent_name(target), "divine target is dead, skipping divination");
            return Ok(());
        }
        if target == seer {
            warn!(id = %self.id, "seer targeted itself, skipping divination");
            return Ok(());
        }
        let species = self.agent(target).role.species();
        self.current_status_mut().divine_result = Some(JudgeRecord {
            day: self.current_day,
            agent: seer,
            target,
            result: species,
        });
        self.append_log(format!(
            "{},divine,{seer},{target},{species}",
            self.current_day
        ));
        let mut packet = self.broadcast_packet(event::DIVINE);
        packet.from_idx = Some(seer as i32);
        packet.to_idx = Some(target as i32);
        self.emit_broadcast(packet);
        info!(id = %self.id, target = %self.agent_name(target), %species, "divine result recorded");
        Ok(())
    }
}
