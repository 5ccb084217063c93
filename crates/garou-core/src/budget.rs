use std::collections::HashMap;

use garou_types::{Reply, TalkSetting};

/// Counts text length under a phase's counting rule: by
/// whitespace-separated word when `in_word`, otherwise by Unicode scalar;
/// whitespace is free unless `count_spaces` is set.
pub fn counted_len(text: &str, in_word: bool, count_spaces: bool) -> usize {
    if in_word {
        text.split_whitespace().count()
    } else if count_spaces {
        text.chars().count()
    } else {
        text.chars().filter(|ch| !ch.is_whitespace()).count()
    }
}

/// Truncates `text` to at most `limit` counted units. Text already within
/// the limit is returned unchanged.
pub fn truncate_to(text: &str, limit: usize, in_word: bool, count_spaces: bool) -> String {
    if counted_len(text, in_word, count_spaces) <= limit {
        return text.to_string();
    }
    if in_word {
        return text
            .split_whitespace()
            .take(limit)
            .collect::<Vec<_>>()
            .join(" ");
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let countable = count_spaces || !ch.is_whitespace();
        if countable && used == limit {
            break;
        }
        out.push(ch);
        if countable {
            used += 1;
        }
    }
    if !count_spaces {
        out.truncate(out.trim_end().len());
    }
    out
}

/// Per-phase utterance quotas. Owned by the engine for the duration of one
/// talk or whisper phase and dropped when the phase ends; the per-day
/// snapshot never carries these. `quotas_for` renders an agent's view for
/// the `Info` it receives mid-phase.
pub struct TurnBudget {
    setting: TalkSetting,
    remain_count: HashMap<u32, u32>,
    remain_length: Option<HashMap<u32, i64>>,
    remain_skip: HashMap<u32, u32>,
}

impl TurnBudget {
    pub fn new(setting: &TalkSetting, participants: &[u32]) -> Self {
        let remain_length = setting
            .max_length
            .per_agent
            .map(|limit| participants.iter().map(|&a| (a, limit as i64)).collect());
        Self {
            remain_count: participants
                .iter()
                .map(|&a| (a, setting.max_count.per_agent))
                .collect(),
            remain_skip: participants
                .iter()
                .map(|&a| (a, setting.max_skip))
                .collect(),
            remain_length,
            setting: setting.clone(),
        }
    }

    pub fn can_speak(&self, agent: u32) -> bool {
        if self.remain_count.get(&agent).copied().unwrap_or(0) == 0 {
            return false;
        }
        if let Some(lengths) = &self.remain_length {
            if lengths.get(&agent).copied().unwrap_or(0) <= 0 {
                return false;
            }
        }
        true
    }

    pub fn take_turn(&mut self, agent: u32) {
        if let Some(count) = self.remain_count.get_mut(&agent) {
            *count = count.saturating_sub(1);
        }
    }

    /// Sentinel accounting: a voluntary skip consumes one skip credit and
    /// collapses to `Over` once the credit is gone; a real utterance
    /// refills the credit.
    pub fn normalize(&mut self, agent: u32, reply: Reply) -> Reply {
        let reply = match reply {
            Reply::Skip => {
                let skips = self.remain_skip.entry(agent).or_insert(0);
                if *skips == 0 {
                    Reply::Over
                } else {
                    *skips -= 1;
                    Reply::Skip
                }
            }
            other => other,
        };
        if matches!(reply, Reply::Say(_)) {
            self.remain_skip.insert(agent, self.setting.max_skip);
        }
        reply
    }

    /// The agent sent `Over` (or collapsed to it): it exits the phase.
    pub fn mark_over(&mut self, agent: u32) {
        self.remain_count.insert(agent, 0);
    }

    /// (remain_count, remain_length, remain_skip) as shown to the agent.
    pub fn quotas_for(&self, agent: u32) -> (Option<u32>, Option<u32>, Option<u32>) {
        let count = self.remain_count.get(&agent).copied();
        let length = self
            .remain_length
            .as_ref()
            .and_then(|m| m.get(&agent).map(|v| (*v).max(0) as u32));
        let skip = self.remain_skip.get(&agent).copied();
        (count, length, skip)
    }

    fn remaining_length(&self, agent: u32) -> i64 {
        self.remain_length
            .as_ref()
            .and_then(|m| m.get(&agent).copied())
            .unwrap_or(0)
    }

    fn debit(&mut self, agent: u32, cost: i64) {
        if cost <= 0 {
            return;
        }
        if let Some(lengths) = &mut self.remain_length {
            if let Some(value) = lengths.get_mut(&agent) {
                *value -= cost;
            }
        }
    }

    /// Applies the phase's length budgets to a real utterance and charges
    /// the speaker. The addressed part of a mention is paid out of the
    /// mention budget; everything kept beyond the free base debits the
    /// per-agent allowance. An empty result means the utterance collapses
    /// to `Over` (the caller's concern).
    pub fn limit_text(&mut self, agent: u32, text: &str, other_names: &[String]) -> String {
        let max = self.setting.max_length.clone();
        let in_word = max.count_in_word;
        let spaces = max.count_spaces;

        if !max.is_limited() {
            return match max.per_talk {
                Some(cap) => truncate_to(text, cap as usize, in_word, spaces),
                None => text.to_string(),
            };
        }

        let base = max.base_length.unwrap_or(0) as i64;
        let mention = max
            .mention_length
            .and_then(|_| earliest_mention(text, other_names));

        if let (Some(mention_budget), Some((at, token))) = (max.mention_length, mention) {
            let before = text[..at].trim();
            let after = text[at + token.len()..].trim();

            let allow = (base + self.remaining_length(agent)).max(0) as usize;
            let before = truncate_to(before, allow, in_word, spaces);
            self.debit(agent, counted_len(&before, in_word, spaces) as i64 - base);

            let allow = (mention_budget as i64 + self.remaining_length(agent)).max(0) as usize;
            let after = truncate_to(after, allow, in_word, spaces);
            self.debit(
                agent,
                counted_len(&after, in_word, spaces) as i64 - mention_budget as i64,
            );

            let mut joined = join_segments(&[before.as_str(), token.as_str(), after.as_str()]);
            if let Some(cap) = max.per_talk {
                let cap = cap as usize;
                if counted_len(&joined, in_word, spaces) > cap {
                    let reserved = counted_len(&before, in_word, spaces)
                        + counted_len(&token, in_word, spaces);
                    if reserved <= cap {
                        let after = truncate_to(&after, cap - reserved, in_word, spaces);
                        joined =
                            join_segments(&[before.as_str(), token.as_str(), after.as_str()]);
                    } else {
                        joined = truncate_to(&before, cap, in_word, spaces);
                    }
                }
            }
            joined
        } else {
            let allow = (base + self.remaining_length(agent)).max(0) as usize;
            let mut kept = truncate_to(text, allow, in_word, spaces);
            self.debit(agent, counted_len(&kept, in_word, spaces) as i64 - base);
            if let Some(cap) = max.per_talk {
                kept = truncate_to(&kept, cap as usize, in_word, spaces);
            }
            kept
        }
    }
}

/// Lowest byte-index occurrence of `@<name>` over any of the given names.
/// Ties on position resolve to the longest token so a name that prefixes
/// another never shadows it.
pub fn earliest_mention(text: &str, other_names: &[String]) -> Option<(usize, String)> {
    let mut best: Option<(usize, String)> = None;
    for name in other_names {
        if name.is_empty() {
            continue;
        }
        let token = format!("@{name}");
        if let Some(at) = text.find(&token) {
            let better = match &best {
                None => true,
                Some((idx, kept)) => at < *idx || (at == *idx && token.len() > kept.len()),
            };
            if better {
                best = Some((at, token));
            }
        }
    }
    best
}

fn join_segments(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use garou_types::{MaxCountSetting, MaxLengthSetting};

    fn setting(max_skip: u32, max_length: MaxLengthSetting) -> TalkSetting {
        TalkSetting {
            max_count: MaxCountSetting {
                per_agent: 10,
                per_day: 10,
            },
            max_length,
            max_skip,
        }
    }

    fn words(max: MaxLengthSetting) -> MaxLengthSetting {
        MaxLengthSetting {
            count_in_word: true,
            count_spaces: false,
            ..max
        }
    }

    #[test]
    fn counting_by_word_and_by_scalar() {
        assert_eq!(counted_len("a b  c", true, false), 3);
        assert_eq!(counted_len("a b  c", false, true), 6);
        assert_eq!(counted_len("a b  c", false, false), 3);
        assert_eq!(counted_len("狼が来た", false, false), 4);
    }

    #[test]
    fn truncation_keeps_text_within_budget_unchanged() {
        assert_eq!(truncate_to("a b c", 3, true, false), "a b c");
        assert_eq!(truncate_to("a b c d", 2, true, false), "a b");
        assert_eq!(truncate_to("abcdef", 4, false, true), "abcd");
        assert_eq!(truncate_to("ab cd ef", 3, false, false), "ab c");
    }

    #[test]
    fn skip_overflow_becomes_over() {
        let setting = setting(1, MaxLengthSetting::default());
        let mut budget = TurnBudget::new(&setting, &[1]);
        assert_eq!(budget.normalize(1, Reply::Skip), Reply::Skip);
        assert_eq!(budget.normalize(1, Reply::Skip), Reply::Over);
    }

    #[test]
    fn real_utterance_refills_skip_quota() {
        let setting = setting(1, MaxLengthSetting::default());
        let mut budget = TurnBudget::new(&setting, &[1]);
        assert_eq!(budget.normalize(1, Reply::Skip), Reply::Skip);
        assert_eq!(
            budget.normalize(1, Reply::Say("hi".into())),
            Reply::Say("hi".into())
        );
        assert_eq!(budget.normalize(1, Reply::Skip), Reply::Skip);
    }

    #[test]
    fn mention_splits_budgets_between_segments() {
        let setting = setting(
            0,
            words(MaxLengthSetting {
                base_length: Some(3),
                mention_length: Some(3),
                ..Default::default()
            }),
        );
        let mut budget = TurnBudget::new(&setting, &[1, 2]);
        let kept = budget.limit_text(1, "a b c @X d e f g", &["X".to_string()]);
        assert_eq!(kept, "a b c @X d e f");
    }

    #[test]
    fn earliest_mention_wins_by_byte_index() {
        let names = vec!["Bob".to_string(), "Ann".to_string()];
        let (at, token) = earliest_mention("talk to @Ann before @Bob", &names).unwrap();
        assert_eq!(token, "@Ann");
        assert_eq!(at, 8);
    }

    #[test]
    fn tied_mention_position_prefers_longer_name() {
        let names = vec!["Al".to_string(), "Alice".to_string()];
        let (_, token) = earliest_mention("hey @Alice!", &names).unwrap();
        assert_eq!(token, "@Alice");
    }

    #[test]
    fn overflow_past_base_debits_the_per_agent_allowance() {
        let setting = setting(
            0,
            words(MaxLengthSetting {
                per_agent: Some(5),
                base_length: Some(2),
                ..Default::default()
            }),
        );
        let mut budget = TurnBudget::new(&setting, &[1]);

        let kept = budget.limit_text(1, "one two three four five six", &[]);
        assert_eq!(kept, "one two three four five six");
        assert_eq!(budget.quotas_for(1).1, Some(1));

        let kept = budget.limit_text(1, "one two three four", &[]);
        assert_eq!(kept, "one two three");
        assert_eq!(budget.quotas_for(1).1, Some(0));
        assert!(!budget.can_speak(1));
    }

    #[test]
    fn per_talk_cap_shrinks_the_addressed_reply_first() {
        let setting = setting(
            0,
            words(MaxLengthSetting {
                base_length: Some(3),
                mention_length: Some(4),
                per_talk: Some(6),
                ..Default::default()
            }),
        );
        let mut budget = TurnBudget::new(&setting, &[1, 2]);
        let kept = budget.limit_text(1, "a b c @X d e f g", &["X".to_string()]);
        assert_eq!(kept, "a b c @X d e");
    }

    #[test]
    fn per_talk_cap_drops_the_mention_when_the_prefix_alone_fills_it() {
        let setting = setting(
            0,
            words(MaxLengthSetting {
                base_length: Some(4),
                mention_length: Some(4),
                per_talk: Some(3),
                ..Default::default()
            }),
        );
        let mut budget = TurnBudget::new(&setting, &[1, 2]);
        let kept = budget.limit_text(1, "a b c d @X e f", &["X".to_string()]);
        assert_eq!(kept, "a b c");
    }

    #[test]
    fn unlimited_phase_only_applies_the_per_talk_cap() {
        let setting = setting(
            0,
            MaxLengthSetting {
                per_talk: Some(4),
                count_in_word: false,
                count_spaces: true,
                ..Default::default()
            },
        );
        let mut budget = TurnBudget::new(&setting, &[1]);
        assert_eq!(budget.limit_text(1, "abcdef", &[]), "abcd");
        assert_eq!(budget.limit_text(1, "abc", &[]), "abc");
    }
}
