use garou_types::{event, Reply, Request, Talk, OVER, SKIP};
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::budget::TurnBudget;
use crate::game::Game;

impl Game {
    pub(crate) async fn do_talk(&mut self) -> anyhow::Result<()> {
        info!(id = %self.id, day = self.current_day, "talk phase starting");
        self.conduct_communication(Request::Talk).await
    }

    pub(crate) async fn do_whisper(&mut self) -> anyhow::Result<()> {
        info!(id = %self.id, day = self.current_day, "whisper phase starting");
        self.conduct_communication(Request::Whisper).await
    }

    /// Runs one talk or whisper phase: participants are shuffled once,
    /// then solicited round-robin for up to `max_count.per_day` rounds. A
    /// round in which nobody produces a non-`Over` utterance ends the
    /// phase early.
    async fn conduct_communication(&mut self, request: Request) -> anyhow::Result<()> {
        let (mut participants, setting) = match request {
            Request::Talk => (self.alive_agents(), self.setting.talk.clone()),
            Request::Whisper => (self.alive_werewolves(), self.setting.whisper.clone()),
            _ => return Ok(()),
        };
        if participants.len() < 2 {
            warn!(id = %self.id, participants = participants.len(), "not enough participants, skipping phase");
            return Ok(());
        }
        participants.shuffle(&mut self.rng);
        self.turn_budget = Some(TurnBudget::new(&setting, &participants));

        let mut next_idx = 0u32;
        for turn in 0..setting.max_count.per_day {
            let mut progressed = false;
            for &speaker in &participants {
                let can_speak = self
                    .turn_budget
                    .as_ref()
                    .is_some_and(|budget| budget.can_speak(speaker));
                if !can_speak {
                    continue;
                }
                if let Some(budget) = self.turn_budget.as_mut() {
                    budget.take_turn(speaker);
                }

                let reply = match self.request_to_agent(speaker, request).await {
                    Ok(text) => {
                        let parsed = Reply::parse(&text);
                        match self.turn_budget.as_mut() {
                            Some(budget) => budget.normalize(speaker, parsed),
                            None => parsed,
                        }
                    }
                    Err(err) if err.is_fatal() => return Err(err.into()),
                    // A failed agent passes silently: recorded as a skip
                    // without spending its skip quota.
                    Err(err) => {
                        warn!(id = %self.id, agent = %self.agent_name(speaker), "solicitation failed, forcing a pass: {err}");
                        Reply::Skip
                    }
                };

                let text = match reply {
                    Reply::Say(text) => {
                        let others: Vec<String> = self
                            .agents
                            .iter()
                            .filter(|a| a.idx != speaker)
                            .map(|a| a.game_name.clone())
                            .collect();
                        let kept = match self.turn_budget.as_mut() {
                            Some(budget) => budget.limit_text(speaker, &text, &others),
                            None => text,
                        };
                        if kept.trim().is_empty() {
                            warn!(id = %self.id, agent = %self.agent_name(speaker), "utterance truncated to nothing, treating as Over");
                            OVER.to_string()
                        } else {
                            kept
                        }
                    }
                    Reply::Skip => SKIP.to_string(),
                    Reply::Over => OVER.to_string(),
                };

                let entry = Talk {
                    idx: next_idx,
                    day: self.current_day,
                    turn,
                    agent: self.agent_name(speaker),
                    text: text.clone(),
                };
                next_idx += 1;

                if text == OVER {
                    if let Some(budget) = self.turn_budget.as_mut() {
                        budget.mark_over(speaker);
                    }
                } else {
                    progressed = true;
                }

                let (family, broadcast_event) = if request == Request::Talk {
                    ("talk", event::TALK)
                } else {
                    ("whisper", event::WHISPER)
                };
                self.append_log(format!(
                    "{},{family},{},{},{},{}",
                    self.current_day, entry.idx, entry.turn, speaker, entry.text
                ));
                let mut packet = self.broadcast_packet(broadcast_event);
                packet.bubble_idx = Some(speaker as i32);
                packet.message = Some(entry.text.clone());
                self.emit_broadcast(packet);
                if text != OVER && text != SKIP {
                    if let Some(speaker_svc) = &self.collaborators.speaker {
                        speaker_svc.speak(&self.id, &text, self.agent(speaker).voice_id());
                    }
                }

                if request == Request::Talk {
                    self.current_status_mut().talks.push(entry);
                } else {
                    self.current_status_mut().whispers.push(entry);
                }
            }
            if !progressed {
                break;
            }
        }

        self.turn_budget = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use garou_types::{MaxCountSetting, Request, Role};

    use crate::game::Game;
    use crate::testing::{fast_setting, scripted_agent, talker, ScriptedAction};

    #[tokio::test]
    async fn quota_exhaustion_ends_the_phase_after_two_rounds() {
        let mut setting = fast_setting();
        setting.talk.max_count = MaxCountSetting {
            per_agent: 2,
            per_day: 5,
        };
        let (a, _) = talker(1, Role::Villager, "hi");
        let (b, _) = talker(2, Role::Villager, "hi");
        let mut game = Game::new(setting, 1.0, vec![a, b]);

        game.do_talk().await.unwrap();

        let talks = &game.current_status().talks;
        assert_eq!(talks.len(), 4);
        assert!(talks.iter().all(|t| t.text == "hi"));
        // idx strictly monotonic, no gaps
        for (i, talk) in talks.iter().enumerate() {
            assert_eq!(talk.idx, i as u32);
        }
        assert_eq!(talks.iter().filter(|t| t.turn == 0).count(), 2);
        assert_eq!(talks.iter().filter(|t| t.turn == 1).count(), 2);
    }

    #[tokio::test]
    async fn skip_budget_exhaustion_collapses_to_over() {
        let mut setting = fast_setting();
        setting.talk.max_skip = 1;
        let (skipper, _) = talker(1, Role::Villager, "Skip");
        let (quiet, _) = talker(2, Role::Villager, "Over");
        let mut game = Game::new(setting, 1.0, vec![skipper, quiet]);

        game.do_talk().await.unwrap();

        let mine: Vec<&str> = game
            .current_status()
            .talks
            .iter()
            .filter(|t| t.agent == "Agent[01]")
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(mine, vec!["Skip", "Over"]);
    }

    #[tokio::test]
    async fn failing_agent_passes_without_spending_skip_quota() {
        let mut setting = fast_setting();
        setting.talk.max_skip = 0;
        setting.talk.max_count = MaxCountSetting {
            per_agent: 2,
            per_day: 5,
        };
        let (broken, _) = scripted_agent(1, Role::Villager, |_| ScriptedAction::Fail);
        let (chatty, _) = talker(2, Role::Villager, "hello");
        let mut game = Game::new(setting, 1.0, vec![broken, chatty]);

        game.do_talk().await.unwrap();

        let broken_entries: Vec<&str> = game
            .current_status()
            .talks
            .iter()
            .filter(|t| t.agent == "Agent[01]")
            .map(|t| t.text.as_str())
            .collect();
        // with max_skip 0 a voluntary skip would have become Over; the
        // forced pass never does
        assert_eq!(broken_entries, vec!["Skip", "Skip"]);
        assert!(game.agent(1).has_error);
    }

    #[tokio::test]
    async fn whisper_only_includes_werewolf_species() {
        let setting = fast_setting();
        let (w1, _) = talker(1, Role::Werewolf, "Over");
        let (w2, _) = talker(2, Role::Werewolf, "Over");
        let (possessed, possessed_log) = talker(3, Role::Possessed, "Over");
        let (villager, _) = talker(4, Role::Villager, "Over");
        let mut game = Game::new(setting, 1.0, vec![w1, w2, possessed, villager]);

        game.do_whisper().await.unwrap();

        for talk in &game.current_status().whispers {
            assert!(talk.agent == "Agent[01]" || talk.agent == "Agent[02]");
        }
        let possessed_requests: Vec<Request> = possessed_log
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.request)
            .collect();
        assert!(!possessed_requests.contains(&Request::Whisper));
    }

    #[tokio::test]
    async fn single_participant_phase_is_skipped() {
        let setting = fast_setting();
        let (wolf, _) = talker(1, Role::Werewolf, "grr");
        let (villager, _) = talker(2, Role::Villager, "hi");
        let mut game = Game::new(setting, 1.0, vec![wolf, villager]);

        game.do_whisper().await.unwrap();
        assert!(game.current_status().whispers.is_empty());
    }

    #[tokio::test]
    async fn quotas_are_rendered_into_info_only_during_the_phase() {
        let mut setting = fast_setting();
        setting.talk.max_count = MaxCountSetting {
            per_agent: 2,
            per_day: 3,
        };
        let (a, log) = talker(1, Role::Villager, "Over");
        let (b, _) = talker(2, Role::Villager, "Over");
        let mut game = Game::new(setting, 1.0, vec![a, b]);

        game.do_talk().await.unwrap();

        let packets = log.lock().unwrap();
        let talk_packet = packets
            .iter()
            .find(|p| p.request == Request::Talk)
            .expect("talk request sent");
        let info = talk_packet.info.as_ref().unwrap();
        // solicited after take_turn: one of two turns already consumed
        assert_eq!(info.remain_count, Some(1));
        assert_eq!(info.remain_skip, Some(2));
        assert_eq!(info.remain_length, None);
        assert!(game.turn_budget.is_none());
    }
}
