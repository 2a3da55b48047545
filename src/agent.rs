//! Per-step decision loop of the hole-jumping agent.
//!
//! The agent senses the floor with five probes, hands a 14-float observation
//! to whatever policy drives it, and applies the 3-float action it gets back.
//! Collision handlers and the off-floor check move it from `Active` to
//! `Terminal`; the episode controller brings it back.

use bevy::math::Vec3;
use serde::Serialize;

use crate::config::HoleJumpConfig;
use crate::episode::EpisodeStats;
use crate::physics_core::{self, Collider};
use crate::raycast::{raycast_any, RaycastAabb};

pub const OBSERVATION_SIZE: usize = 14;
pub const ACTION_SIZE: usize = 3;

pub const SUCCESS_REWARD: f32 = 1.0;
pub const FAIL_REWARD: f32 = -0.1;

/// Lateral offset of the four angled probes.
const PROBE_OFFSET: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation(pub [f32; OBSERVATION_SIZE]);

impl Observation {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn probes(&self) -> GroundProbes {
        GroundProbes {
            left: self.0[0] > 0.5,
            right: self.0[1] > 0.5,
            back: self.0[2] > 0.5,
            forward: self.0[3] > 0.5,
            down: self.0[4] > 0.5,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.0[5], self.0[6], self.0[7])
    }

    /// Unit vector from the target towards the agent.
    pub fn direction(&self) -> Vec3 {
        Vec3::new(self.0[8], self.0[9], self.0[10])
    }

    pub fn target(&self) -> Vec3 {
        Vec3::new(self.0[11], self.0[12], self.0[13])
    }
}

/// Two planar movement axes plus jump.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActionVector(pub [f32; ACTION_SIZE]);

impl ActionVector {
    pub fn new(move_x: f32, move_z: f32, jump: f32) -> Self {
        Self([move_x, move_z, jump])
    }

    pub fn from_slice(values: &[f32]) -> Result<Self, String> {
        let arr: [f32; ACTION_SIZE] = values.try_into().map_err(|_| {
            format!(
                "action vector must have {} components (got {})",
                ACTION_SIZE,
                values.len()
            )
        })?;
        Ok(Self(arr))
    }

    pub fn move_x(&self) -> f32 {
        self.0[0]
    }

    pub fn move_z(&self) -> f32 {
        self.0[1]
    }

    pub fn jump(&self) -> f32 {
        self.0[2]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroundProbes {
    pub left: bool,
    pub right: bool,
    pub back: bool,
    pub forward: bool,
    pub down: bool,
}

impl GroundProbes {
    /// Origin offset and direction of each probe, in observation order.
    pub fn rays() -> [(Vec3, Vec3); 5] {
        [
            (
                Vec3::new(-PROBE_OFFSET, 0.0, 0.0),
                Vec3::NEG_Y + Vec3::NEG_X * PROBE_OFFSET,
            ),
            (
                Vec3::new(PROBE_OFFSET, 0.0, 0.0),
                Vec3::NEG_Y + Vec3::X * PROBE_OFFSET,
            ),
            (
                Vec3::new(0.0, 0.0, -PROBE_OFFSET),
                Vec3::NEG_Y + Vec3::NEG_Z * PROBE_OFFSET,
            ),
            (
                Vec3::new(0.0, 0.0, PROBE_OFFSET),
                Vec3::NEG_Y + Vec3::Z * PROBE_OFFSET,
            ),
            (Vec3::ZERO, Vec3::NEG_Y),
        ]
    }

    pub fn sense(position: Vec3, tiles: &[RaycastAabb]) -> Self {
        let hits = Self::rays().map(|(offset, dir)| {
            raycast_any(position + offset, dir, f32::INFINITY, tiles.iter().copied())
        });
        Self {
            left: hits[0],
            right: hits[1],
            back: hits[2],
            forward: hits[3],
            down: hits[4],
        }
    }

    pub fn as_array(&self) -> [bool; 5] {
        [self.left, self.right, self.back, self.forward, self.down]
    }

    pub fn status_message(&self) -> String {
        format!(
            "down: {}  {},{},{},{}",
            label(self.down),
            label(self.left),
            label(self.right),
            label(self.back),
            label(self.forward)
        )
    }
}

fn label(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeOutcome {
    Success,
    Fail,
    /// Step limit reached; counts as neither success nor failure.
    Truncated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentPhase {
    Active,
    Terminal(EpisodeOutcome),
}

#[derive(Clone, Debug)]
pub struct HoleJumpAgent {
    pub position: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
    pub probes: GroundProbes,
    pub phase: AgentPhase,
    pub cumulative_reward: f32,
    pub step_count: u32,
    pending_reward: f32,
    pending_translation: Vec3,
}

impl Default for HoleJumpAgent {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            grounded: true,
            probes: GroundProbes::default(),
            phase: AgentPhase::Active,
            cumulative_reward: 0.0,
            step_count: 0,
            pending_reward: 0.0,
            pending_translation: Vec3::ZERO,
        }
    }
}

impl HoleJumpAgent {
    pub fn is_active(&self) -> bool {
        self.phase == AgentPhase::Active
    }

    pub fn outcome(&self) -> Option<EpisodeOutcome> {
        match self.phase {
            AgentPhase::Active => None,
            AgentPhase::Terminal(outcome) => Some(outcome),
        }
    }

    /// Clears episode-scoped state. Position is left to the caller.
    pub fn begin_episode(&mut self) {
        self.velocity = Vec3::ZERO;
        self.phase = AgentPhase::Active;
        self.cumulative_reward = 0.0;
        self.step_count = 0;
        self.pending_reward = 0.0;
        self.pending_translation = Vec3::ZERO;
    }

    pub fn add_reward(&mut self, reward: f32) {
        self.pending_reward += reward;
        self.cumulative_reward += reward;
    }

    /// Reward gathered since the previous call.
    pub fn take_reward(&mut self) -> f32 {
        std::mem::take(&mut self.pending_reward)
    }

    pub fn take_translation(&mut self) -> Vec3 {
        std::mem::take(&mut self.pending_translation)
    }

    /// Moves to `Terminal`. Later calls in the same episode are ignored.
    pub fn end_episode(&mut self, outcome: EpisodeOutcome) -> bool {
        if !self.is_active() {
            return false;
        }
        self.phase = AgentPhase::Terminal(outcome);
        true
    }

    pub fn collect_observations(&mut self, target: Vec3, tiles: &[RaycastAabb]) -> Observation {
        self.probes = GroundProbes::sense(self.position, tiles);
        let mut obs = [0.0f32; OBSERVATION_SIZE];
        for (slot, hit) in obs.iter_mut().zip(self.probes.as_array()) {
            *slot = if hit { 1.0 } else { 0.0 };
        }
        obs[5..8].copy_from_slice(&self.position.to_array());
        obs[8..11].copy_from_slice(&(self.position - target).normalize_or_zero().to_array());
        obs[11..14].copy_from_slice(&target.to_array());
        Observation(obs)
    }

    /// Queues the planar move, applies the jump impulse, then checks for a fall.
    /// Returns whether a jump fired.
    pub fn on_action_received(
        &mut self,
        action: ActionVector,
        config: &HoleJumpConfig,
        stats: &mut EpisodeStats,
    ) -> bool {
        if !self.is_active() {
            return false;
        }
        self.pending_translation += physics_core::planar_translation(
            action.move_x(),
            action.move_z(),
            config.move_speed,
            config.fixed_dt,
        );
        let jumped = physics_core::try_jump(
            self.grounded,
            action.jump(),
            config.jump_force,
            &mut self.velocity.y,
        );
        self.off_floor_check(config.fall_threshold, stats);
        jumped
    }

    /// Nothing under the agent and already below the floor plane.
    pub fn off_floor_check(&mut self, fall_threshold: f32, stats: &mut EpisodeStats) -> bool {
        if self.probes.down || self.position.y >= fall_threshold {
            return false;
        }
        if !self.end_episode(EpisodeOutcome::Fail) {
            return false;
        }
        stats.fail += 1;
        self.add_reward(FAIL_REWARD);
        true
    }

    pub fn on_collision_enter(&mut self, collider: Collider, stats: &mut EpisodeStats) {
        match collider {
            Collider::Target => {
                if self.end_episode(EpisodeOutcome::Success) {
                    stats.success += 1;
                    self.add_reward(SUCCESS_REWARD);
                }
            }
            Collider::Floor(_) => self.grounded = true,
        }
    }

    pub fn on_collision_exit(&mut self, collider: Collider) {
        if let Collider::Floor(_) = collider {
            self.grounded = false;
        }
    }

    pub fn truncate(&mut self, max_steps: u32) -> bool {
        if max_steps == 0 || self.step_count < max_steps {
            return false;
        }
        self.end_episode(EpisodeOutcome::Truncated)
    }
}
