use garou_types::{event, Request, Role};
use tracing::{info, warn};

use crate::game::Game;
use crate::status::GuardRecord;

impl Game {
    pub(crate) async fn do_guard(&mut self) -> anyhow::Result<()> {
        info!(id = %self.id, day = self.current_day, "guard phase starting");
        let bodyguard = self
            .alive_agents()
            .into_iter()
            .find(|&idx| self.agent(idx).role == Role::Bodyguard);
        if let Some(bodyguard) = bodyguard {
            self.conduct_guard(bodyguard).await?;
        }
        Ok(())
    }

    async fn conduct_guard(&mut self, bodyguard: u32) -> anyhow::Result<()> {
        let Some(target) = self.find_target_by_request(bodyguard, Request::Guard).await? else {
            warn!(id = %self.id, "guard target not resolved, nobody is guarded");
            return Ok(());
        };
        if !self.current_status().is_alive(target) {
            warn!(id = %self.id, target = %self.agent_name(target), "guard target is dead, nobody is guarded");
            return Ok(());
        }
        if target == bodyguard {
            warn!(id = %self.id, "bodyguard targeted itself, nobody is guarded");
            return Ok(());
        }
        self.current_status_mut().guard = Some(GuardRecord {
            day: self.current_day,
            agent: bodyguard,
            target,
        });
        let target_role = self.agent(target).role;
        self.append_log(format!(
            "{},guard,{bodyguard},{target},{target_role}",
            self.current_day
        ));
        let mut packet = self.broadcast_packet(event::GUARD);
        packet.from_idx = Some(bodyguard as i32);
        packet.to_idx = Some(target as i32);
        self.emit_broadcast(packet);
        info!(id = %self.id, target = %self.agent_name(target), "guard target recorded");
        Ok(())
    }
}
