use std::collections::VecDeque;

use serde::Serialize;

const MAX_EVENTS: usize = 500;

#[derive(Serialize, Clone, Debug)]
pub struct EpisodeEvent {
    pub seq: u64,
    pub name: String,
    pub data: serde_json::Value,
    pub episode: u64,
    pub step: u32,
}

/// Recent gameplay events, oldest dropped first.
#[derive(Default, Clone, Debug)]
pub struct EpisodeEventBus {
    pub recent: VecDeque<EpisodeEvent>,
    pub dropped_events: u64,
    next_seq: u64,
    dropped_since_log: u64,
}

impl EpisodeEventBus {
    pub fn emit(
        &mut self,
        name: impl Into<String>,
        data: serde_json::Value,
        episode: u64,
        step: u32,
    ) {
        self.next_seq = self.next_seq.saturating_add(1);
        self.recent.push_back(EpisodeEvent {
            seq: self.next_seq,
            name: name.into(),
            data,
            episode,
            step,
        });
        if self.recent.len() > MAX_EVENTS {
            let excess = self.recent.len() - MAX_EVENTS;
            for _ in 0..excess {
                self.recent.pop_front();
            }
            self.dropped_events = self.dropped_events.saturating_add(excess as u64);
            self.dropped_since_log = self.dropped_since_log.saturating_add(excess as u64);
            if self.dropped_since_log >= MAX_EVENTS as u64 {
                self.dropped_since_log = 0;
                bevy::log::warn!(
                    "[HoleJump events] Dropped buffered events (total dropped: {})",
                    self.dropped_events
                );
            }
        }
    }

    pub fn last_seq(&self) -> u64 {
        self.next_seq
    }

    /// Events with a sequence number above `seq`, oldest first.
    pub fn since(&self, seq: u64) -> impl Iterator<Item = &EpisodeEvent> {
        self.recent.iter().filter(move |e| e.seq > seq)
    }
}
