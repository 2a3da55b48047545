use std::collections::VecDeque;

use serde::Serialize;

use crate::events::EpisodeEventBus;

const OUTCOME_WINDOW: usize = 100;
const MAX_SAMPLES: usize = 300;

/// Training-run telemetry derived from the episode event stream.
#[derive(Clone, Serialize, Default, Debug)]
pub struct EpisodeTelemetry {
    pub fall_locations: Vec<[f32; 3]>,
    pub episode_steps: Vec<u32>,
    pub jumps: u64,
    pub truncated: u64,
    #[serde(skip)]
    recent_outcomes: VecDeque<bool>,
    #[serde(skip)]
    last_seq: u64,
}

impl EpisodeTelemetry {
    pub fn ingest(&mut self, bus: &EpisodeEventBus) {
        for event in bus.since(self.last_seq) {
            match event.name.as_str() {
                "jump" => self.jumps += 1,
                "episode_fail" => {
                    if let Some(pos) = position(&event.data) {
                        push_capped(&mut self.fall_locations, pos);
                    }
                    self.finish(event.step, Some(false));
                }
                "episode_success" => self.finish(event.step, Some(true)),
                "episode_truncated" => {
                    self.truncated += 1;
                    self.finish(event.step, None);
                }
                _ => {}
            }
        }
        self.last_seq = bus.last_seq();
    }

    fn finish(&mut self, steps: u32, success: Option<bool>) {
        push_capped(&mut self.episode_steps, steps);
        if let Some(success) = success {
            self.recent_outcomes.push_back(success);
            if self.recent_outcomes.len() > OUTCOME_WINDOW {
                self.recent_outcomes.pop_front();
            }
        }
    }

    /// Success share over the last 100 decided episodes.
    pub fn rolling_success_rate(&self) -> Option<f32> {
        if self.recent_outcomes.is_empty() {
            return None;
        }
        let wins = self.recent_outcomes.iter().filter(|s| **s).count();
        Some(wins as f32 / self.recent_outcomes.len() as f32)
    }

    pub fn mean_episode_steps(&self) -> Option<f32> {
        if self.episode_steps.is_empty() {
            return None;
        }
        let total: u64 = self.episode_steps.iter().map(|s| *s as u64).sum();
        Some(total as f32 / self.episode_steps.len() as f32)
    }
}

fn push_capped<T>(samples: &mut Vec<T>, value: T) {
    samples.push(value);
    if samples.len() > MAX_SAMPLES {
        samples.remove(0);
    }
}

fn position(data: &serde_json::Value) -> Option<[f32; 3]> {
    let arr = data.get("position")?.as_array()?;
    let mut out = [0.0f32; 3];
    for (slot, v) in out.iter_mut().zip(arr) {
        *slot = v.as_f64()? as f32;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_tracks_outcomes_once() {
        let mut bus = EpisodeEventBus::default();
        let mut telemetry = EpisodeTelemetry::default();
        bus.emit("jump", serde_json::json!({}), 1, 2);
        bus.emit(
            "episode_fail",
            serde_json::json!({ "position": [1.0, -0.5, 2.0] }),
            1,
            10,
        );
        telemetry.ingest(&bus);
        bus.emit("episode_success", serde_json::json!({}), 2, 30);
        telemetry.ingest(&bus);
        telemetry.ingest(&bus);

        assert_eq!(telemetry.jumps, 1);
        assert_eq!(telemetry.fall_locations, vec![[1.0, -0.5, 2.0]]);
        assert_eq!(telemetry.episode_steps, vec![10, 30]);
        assert_eq!(telemetry.rolling_success_rate(), Some(0.5));
        assert_eq!(telemetry.mean_episode_steps(), Some(20.0));
    }

    #[test]
    fn truncation_is_not_an_outcome() {
        let mut bus = EpisodeEventBus::default();
        let mut telemetry = EpisodeTelemetry::default();
        bus.emit("episode_truncated", serde_json::json!({}), 1, 100);
        telemetry.ingest(&bus);
        assert_eq!(telemetry.truncated, 1);
        assert_eq!(telemetry.rolling_success_rate(), None);
        assert_eq!(telemetry.mean_episode_steps(), Some(100.0));
    }
}
