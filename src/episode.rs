use bevy::math::Vec3;
use serde::Serialize;

use crate::agent::{
    ActionVector, EpisodeOutcome, HoleJumpAgent, Observation, ACTION_SIZE, OBSERVATION_SIZE,
};
use crate::config::HoleJumpConfig;
use crate::events::EpisodeEventBus;
use crate::floor::FloorGrid;
use crate::generation::{self, Rng};
use crate::physics_core::{
    self, Aabb3, CollisionEvent, ContactTracker, MotionParams, PhysicsCounters,
};
use crate::raycast::RaycastAabb;

/// Running totals for the life of the process. Owned by the environment and
/// lent to whatever reports them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EpisodeStats {
    pub episode: u64,
    pub success: u64,
    pub fail: u64,
}

impl EpisodeStats {
    pub fn outcomes(&self) -> u64 {
        self.success + self.fail
    }

    pub fn success_percent(&self) -> Option<f32> {
        let total = self.outcomes();
        if total == 0 {
            return None;
        }
        Some(self.success as f32 / total as f32 * 100.0)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    pub done: bool,
    pub outcome: Option<EpisodeOutcome>,
}

/// Gym-style surface for an external trainer.
pub trait Environment {
    fn observation_size(&self) -> usize;
    fn action_size(&self) -> usize;
    /// Starts a new episode and returns its first observation.
    fn reset(&mut self) -> Observation;
    /// Advances one decision step. After `done`, call `reset`.
    fn step(&mut self, action: ActionVector) -> StepResult;
}

pub struct HoleJumpEnv {
    config: HoleJumpConfig,
    pending_config: Option<HoleJumpConfig>,
    rng: Rng,
    pub floor: FloorGrid,
    pub agent: HoleJumpAgent,
    pub target: Vec3,
    pub stats: EpisodeStats,
    pub events: EpisodeEventBus,
    pub counters: PhysicsCounters,
    contacts: ContactTracker,
    tile_rays: Vec<RaycastAabb>,
    tile_boxes: Vec<(usize, Aabb3)>,
    solids: Vec<Aabb3>,
    floor_generation: u64,
    status: String,
}

impl HoleJumpEnv {
    /// Builds the first floor. The first episode still needs `reset`.
    pub fn new(config: HoleJumpConfig) -> Result<Self, String> {
        config.validate()?;
        let rng = Rng::new(config.seed);
        let floor = FloorGrid::empty(
            config.floor_count_x,
            config.floor_count_z,
            config.origin(),
            config.cell_size,
            config.tile_height,
        );
        let mut env = Self {
            config,
            pending_config: None,
            rng,
            floor,
            agent: HoleJumpAgent::default(),
            target: Vec3::ZERO,
            stats: EpisodeStats::default(),
            events: EpisodeEventBus::default(),
            counters: PhysicsCounters::default(),
            contacts: ContactTracker::default(),
            tile_rays: Vec::new(),
            tile_boxes: Vec::new(),
            solids: Vec::new(),
            floor_generation: 0,
            status: String::new(),
        };
        env.initialize();
        Ok(env)
    }

    fn initialize(&mut self) {
        let origin = self.config.origin();
        self.agent.position = origin;
        self.target = origin;
        self.make_floor();
    }

    pub fn config(&self) -> &HoleJumpConfig {
        &self.config
    }

    /// Swapped in at the start of the next episode.
    pub fn queue_config(&mut self, config: HoleJumpConfig) -> Result<(), String> {
        config.validate()?;
        self.pending_config = Some(config);
        Ok(())
    }

    /// Bumped every time the floor is rebuilt.
    pub fn floor_generation(&self) -> u64 {
        self.floor_generation
    }

    /// Last probe readout.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn tile_rays(&self) -> &[RaycastAabb] {
        &self.tile_rays
    }

    pub fn make_floor(&mut self) {
        let generated = generation::generate_floor(&self.config, &mut self.rng);
        self.floor = generated.grid;
        if let Some(spawn) = generated.agent_spawn {
            self.agent.position = spawn;
        }
        if let Some(spawn) = generated.target_spawn {
            self.target = spawn;
        }
        self.tile_boxes = self.floor.tile_aabbs().collect();
        self.solids = self.tile_boxes.iter().map(|&(_, aabb)| aabb).collect();
        self.tile_rays = self
            .tile_boxes
            .iter()
            .map(|&(id, aabb)| RaycastAabb { id, aabb })
            .collect();
        self.floor_generation = self.floor_generation.saturating_add(1);
    }

    pub fn begin_episode(&mut self) -> Observation {
        if let Some(config) = self.pending_config.take() {
            if config.seed != self.config.seed {
                self.rng = Rng::new(config.seed);
            }
            self.config = config;
        }
        self.make_floor();
        self.stats.episode += 1;
        self.agent.begin_episode();
        self.contacts.clear();
        self.events.emit(
            "episode_begin",
            serde_json::json!({
                "agent": self.agent.position.to_array(),
                "target": self.target.to_array(),
                "tiles": self.floor.tile_count(),
            }),
            self.stats.episode,
            0,
        );
        self.collect_observations()
    }

    pub fn collect_observations(&mut self) -> Observation {
        let obs = self.agent.collect_observations(self.target, &self.tile_rays);
        self.status = self.agent.probes.status_message();
        obs
    }

    fn physics_tick(&mut self) {
        let dt = self.config.fixed_dt;
        let mut velocity = self.agent.velocity;
        physics_core::apply_gravity(&mut velocity.y, self.config.gravity, dt);
        physics_core::apply_fast_fall(
            &mut velocity.y,
            self.config.gravity,
            self.config.fall_multiplier,
            dt,
        );

        let size = Vec3::splat(self.config.agent_size);
        let motion = physics_core::resolve_motion(
            &self.solids,
            MotionParams {
                position: self.agent.position,
                velocity,
                translation: self.agent.take_translation(),
                size,
                dt,
            },
            &mut self.counters,
        );
        self.agent.position = motion.position;
        self.agent.velocity = motion.velocity;

        let body = Aabb3::from_center(self.agent.position, size);
        let floor = physics_core::touching(&body, &self.tile_boxes, &mut self.counters);
        let target_box = Aabb3::from_center(self.target, Vec3::splat(self.config.target_size));
        let on_target = body.touches(&target_box);
        for event in self.contacts.update(floor, on_target) {
            match event {
                CollisionEvent::Enter(collider) => {
                    self.agent.on_collision_enter(collider, &mut self.stats)
                }
                CollisionEvent::Exit(collider) => self.agent.on_collision_exit(collider),
            }
        }
    }

    fn record_outcome(&mut self, outcome: EpisodeOutcome) {
        let name = match outcome {
            EpisodeOutcome::Success => "episode_success",
            EpisodeOutcome::Fail => "episode_fail",
            EpisodeOutcome::Truncated => "episode_truncated",
        };
        self.events.emit(
            name,
            serde_json::json!({
                "position": self.agent.position.to_array(),
                "reward": self.agent.cumulative_reward,
                "steps": self.agent.step_count,
            }),
            self.stats.episode,
            self.agent.step_count,
        );
    }
}

impl Environment for HoleJumpEnv {
    fn observation_size(&self) -> usize {
        OBSERVATION_SIZE
    }

    fn action_size(&self) -> usize {
        ACTION_SIZE
    }

    fn reset(&mut self) -> Observation {
        self.begin_episode()
    }

    fn step(&mut self, action: ActionVector) -> StepResult {
        if !self.agent.is_active() {
            return StepResult {
                observation: self.collect_observations(),
                reward: 0.0,
                done: true,
                outcome: self.agent.outcome(),
            };
        }

        let jumped = self
            .agent
            .on_action_received(action, &self.config, &mut self.stats);
        if jumped {
            self.events.emit(
                "jump",
                serde_json::json!({ "position": self.agent.position.to_array() }),
                self.stats.episode,
                self.agent.step_count,
            );
        }
        if self.agent.is_active() {
            self.physics_tick();
        }
        self.agent.step_count = self.agent.step_count.saturating_add(1);
        self.agent.truncate(self.config.max_steps);

        let observation = self.collect_observations();
        let outcome = self.agent.outcome();
        if let Some(outcome) = outcome {
            self.record_outcome(outcome);
        }
        StepResult {
            observation,
            reward: self.agent.take_reward(),
            done: outcome.is_some(),
            outcome,
        }
    }
}
