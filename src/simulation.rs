use bevy::prelude::*;
use serde::Serialize;

use crate::agent::{EpisodeOutcome, Observation};
use crate::config::HoleJumpConfig;
use crate::episode::{EpisodeStats, Environment, HoleJumpEnv};
use crate::input::VirtualInput;
use crate::policy::{self, Policy};
use crate::telemetry::EpisodeTelemetry;

/// Step limit for batch runs whose config leaves `max_steps` unset.
const BATCH_STEP_CAP: u32 = 5_000;

#[derive(Resource)]
pub struct SimulationEnv {
    pub env: HoleJumpEnv,
    pub observation: Observation,
}

#[derive(Resource)]
pub struct ActivePolicy(pub Box<dyn Policy>);

#[derive(Resource, Default)]
pub struct SimulationTelemetry(pub EpisodeTelemetry);

pub struct SimulationPlugin {
    pub config: HoleJumpConfig,
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let mut env = match HoleJumpEnv::new(self.config.clone()) {
            Ok(env) => env,
            Err(e) => {
                error!("[HoleJump] Cannot start simulation: {}", e);
                return;
            }
        };
        let observation = env.collect_observations();
        app.insert_resource(SimulationEnv { env, observation })
            .insert_resource(ActivePolicy(policy::build_policy(
                self.config.policy,
                self.config.seed,
            )))
            .insert_resource(SimulationTelemetry::default())
            .add_systems(Startup, begin_first_episode)
            .add_systems(Update, sync_fixed_timestep)
            .add_systems(FixedUpdate, step_agent);
    }
}

fn begin_first_episode(mut sim: ResMut<SimulationEnv>, policy: Res<ActivePolicy>) {
    sim.observation = sim.env.reset();
    info!(
        "[HoleJump] Episode {} started ({} tiles, policy: {})",
        sim.env.stats.episode,
        sim.env.floor.tile_count(),
        policy.0.name()
    );
}

/// A reloaded `fixed_dt` takes over once its episode has begun.
fn sync_fixed_timestep(sim: Res<SimulationEnv>, time: Option<ResMut<Time<Fixed>>>) {
    let Some(mut time) = time else { return };
    let dt = sim.env.config().fixed_dt as f64;
    if (time.timestep().as_secs_f64() - dt).abs() > 1e-9 {
        time.set_timestep_seconds(dt);
        info!("[HoleJump] Fixed timestep now {:.4}s", dt);
    }
}

fn step_agent(
    mut sim: ResMut<SimulationEnv>,
    mut policy: ResMut<ActivePolicy>,
    mut telemetry: ResMut<SimulationTelemetry>,
    input: Option<Res<VirtualInput>>,
) {
    if let Some(input) = input {
        policy.0.set_input(&input);
    }
    let action = policy.0.decide(&sim.observation);
    let result = sim.env.step(action);
    sim.observation = result.observation;
    if result.done {
        let stats = sim.env.stats;
        info!(
            "[HoleJump] Episode {} ended: {:?} after {} steps (reward {:.2}, success {}/{})",
            stats.episode,
            result.outcome,
            sim.env.agent.step_count,
            sim.env.agent.cumulative_reward,
            stats.success,
            stats.outcomes()
        );
        sim.observation = sim.env.reset();
    }
    telemetry.0.ingest(&sim.env.events);
}

#[derive(Serialize, Clone, Debug)]
pub struct EpisodeSummary {
    pub episode: u64,
    pub outcome: EpisodeOutcome,
    pub steps: u32,
    pub reward: f32,
}

#[derive(Serialize, Clone, Debug)]
pub struct SimulationResult {
    pub policy: String,
    pub episodes: Vec<EpisodeSummary>,
    pub stats: EpisodeStats,
    pub rolling_success_rate: Option<f32>,
    pub mean_episode_steps: Option<f32>,
    pub telemetry: EpisodeTelemetry,
    pub collision_checks: u64,
}

/// Runs whole episodes without the engine loop.
pub fn run_episodes(config: &HoleJumpConfig, episodes: u32) -> Result<SimulationResult, String> {
    let mut config = config.clone();
    if config.max_steps == 0 {
        config.max_steps = BATCH_STEP_CAP;
    }
    let mut env = HoleJumpEnv::new(config.clone())?;
    let mut policy = policy::build_policy(config.policy, config.seed);
    let mut telemetry = EpisodeTelemetry::default();
    let mut summaries = Vec::with_capacity(episodes as usize);

    for _ in 0..episodes {
        let mut obs = env.reset();
        loop {
            let result = env.step(policy.decide(&obs));
            obs = result.observation;
            if let Some(outcome) = result.outcome {
                summaries.push(EpisodeSummary {
                    episode: env.stats.episode,
                    outcome,
                    steps: env.agent.step_count,
                    reward: env.agent.cumulative_reward,
                });
                break;
            }
        }
        telemetry.ingest(&env.events);
    }

    Ok(SimulationResult {
        policy: policy.name().to_string(),
        episodes: summaries,
        stats: env.stats,
        rolling_success_rate: telemetry.rolling_success_rate(),
        mean_episode_steps: telemetry.mean_episode_steps(),
        telemetry,
        collision_checks: env.counters.collision_checks,
    })
}
