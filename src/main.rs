#![cfg_attr(target_arch = "wasm32", allow(dead_code))]

mod agent;
mod camera;
mod components;
mod config;
mod debug;
mod episode;
mod events;
#[cfg(not(target_arch = "wasm32"))]
mod file_watcher;
mod floor;
mod generation;
mod input;
mod physics_core;
mod policy;
mod raycast;
mod scene;
mod simulation;
mod telemetry;

use bevy::prelude::*;
use clap::Parser;
use components::HeadlessMode;
use config::{HoleJumpConfig, PolicyKind};

/// Command-line arguments for the HoleJump binary.
#[derive(Parser, Debug)]
#[command(name = "holejump")]
struct CliArgs {
    /// Run without a window.
    #[arg(long)]
    headless: bool,

    /// Run this many episodes outside the engine loop and print JSON results.
    #[arg(long)]
    episodes: Option<u32>,

    /// Policy driving the agent (heuristic, random, seek).
    #[arg(long, value_parser = parse_policy)]
    policy: Option<PolicyKind>,

    /// Seed for floor generation and the random policy.
    #[arg(long)]
    seed: Option<u64>,

    /// Reload the config file when it changes on disk.
    #[arg(long)]
    watch_config: bool,
}

fn parse_policy(label: &str) -> Result<PolicyKind, String> {
    PolicyKind::from_label(label).ok_or_else(|| format!("unknown policy: {label}"))
}

fn resolve_config(cli: &CliArgs) -> HoleJumpConfig {
    let mut cfg = config::load_config(&config::config_path());
    cfg.apply_env_overrides();
    if let Some(policy) = cli.policy {
        cfg.policy = policy;
    }
    if cli.seed.is_some() {
        cfg.seed = cli.seed;
    }
    if let Err(e) = cfg.validate() {
        eprintln!("[HoleJump] Invalid config after overrides ({e}); using defaults");
        cfg = HoleJumpConfig::default();
    }
    cfg
}

fn main() {
    let cli = CliArgs::parse();
    let cfg = resolve_config(&cli);

    if let Some(episodes) = cli.episodes {
        match simulation::run_episodes(&cfg, episodes) {
            Ok(result) => match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("[HoleJump] Failed to serialize results: {e}"),
            },
            Err(e) => {
                eprintln!("[HoleJump] Batch run failed: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let mut app = App::new();
    app.insert_resource(HeadlessMode(cli.headless));

    if cli.headless {
        // Headless mode: no window, no rendering, just the decision loop
        app.add_plugins(MinimalPlugins);
        println!("[HoleJump] Starting in HEADLESS mode");
    } else {
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "HoleJump".to_string(),
                resolution: (960.0, 540.0).into(),
                present_mode: bevy::window::PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }));
        app.insert_resource(ClearColor(Color::srgb(0.08, 0.1, 0.14)));
        println!("[HoleJump] Starting in WINDOWED mode (policy: {:?})", cfg.policy);
    }

    app.insert_resource(Time::<Fixed>::from_seconds(cfg.fixed_dt as f64))
        .insert_resource(cfg.clone())
        .add_plugins(input::InputPlugin)
        .add_plugins(simulation::SimulationPlugin { config: cfg })
        .add_plugins(scene::ScenePlugin)
        .add_plugins(camera::CameraPlugin)
        .add_plugins(debug::DebugPlugin);

    #[cfg(not(target_arch = "wasm32"))]
    if cli.watch_config {
        app.add_plugins(file_watcher::FileWatcherPlugin {
            path: config::config_path(),
        });
    }

    app.run();
}
