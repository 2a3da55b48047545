use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "holejump.json";

/// Largest floor the generator will lay out.
pub const MAX_GRID_CELLS: usize = 1_000_000;

/// Which policy drives the agent when no external trainer is attached.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Heuristic,
    Random,
    Seek,
}

impl PolicyKind {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "manual" => Some(Self::Heuristic),
            "random" => Some(Self::Random),
            "seek" | "seek_target" => Some(Self::Seek),
            _ => None,
        }
    }
}

/// Scenario tuning. Every field has a default so partial JSON files work.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoleJumpConfig {
    pub move_speed: f32,
    pub jump_force: f32,
    pub floor_count_x: usize,
    pub floor_count_z: usize,
    pub hole_probability: f32,
    pub cell_size: f32,
    pub tile_height: f32,
    pub agent_size: f32,
    pub target_size: f32,
    pub gravity: f32,
    pub fall_multiplier: f32,
    pub fall_threshold: f32,
    pub spawn_chance_percent: u32,
    pub fixed_dt: f32,
    /// Zero disables truncation.
    pub max_steps: u32,
    pub seed: Option<u64>,
    pub origin: [f32; 3],
    pub policy: PolicyKind,
}

impl Default for HoleJumpConfig {
    fn default() -> Self {
        Self {
            move_speed: 20.0,
            jump_force: 1.5,
            floor_count_x: 8,
            floor_count_z: 6,
            hole_probability: 0.15,
            cell_size: 1.0,
            tile_height: 1.0,
            agent_size: 1.0,
            target_size: 1.0,
            gravity: 9.81,
            fall_multiplier: 2.5,
            fall_threshold: 0.0,
            spawn_chance_percent: 10,
            fixed_dt: 0.02,
            max_steps: 0,
            seed: None,
            origin: [0.0, 0.0, 0.0],
            policy: PolicyKind::Heuristic,
        }
    }
}

impl HoleJumpConfig {
    pub fn origin(&self) -> Vec3 {
        Vec3::from_array(self.origin)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.floor_count_x == 0 || self.floor_count_z == 0 {
            return Err(format!(
                "floor grid must be at least 1x1 (got {}x{})",
                self.floor_count_x, self.floor_count_z
            ));
        }
        match self.floor_count_x.checked_mul(self.floor_count_z) {
            Some(cells) if cells <= MAX_GRID_CELLS => {}
            _ => {
                return Err(format!(
                    "floor grid {}x{} exceeds {} cells",
                    self.floor_count_x, self.floor_count_z, MAX_GRID_CELLS
                ))
            }
        }
        if !(0.0..=1.0).contains(&self.hole_probability) {
            return Err(format!(
                "hole_probability must be within [0, 1] (got {})",
                self.hole_probability
            ));
        }
        if self.spawn_chance_percent > 100 {
            return Err(format!(
                "spawn_chance_percent must be <= 100 (got {})",
                self.spawn_chance_percent
            ));
        }
        for (name, value) in [
            ("cell_size", self.cell_size),
            ("tile_height", self.tile_height),
            ("agent_size", self.agent_size),
            ("target_size", self.target_size),
            ("fixed_dt", self.fixed_dt),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be a positive number (got {value})"));
            }
        }
        if !self.gravity.is_finite() || self.gravity < 0.0 {
            return Err(format!("gravity must be non-negative (got {})", self.gravity));
        }
        Ok(())
    }

    /// Applies `HOLEJUMP_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(seed) = env_value("HOLEJUMP_SEED").and_then(|v| v.parse::<u64>().ok()) {
            self.seed = Some(seed);
        }
        if let Some(p) = env_value("HOLEJUMP_HOLE_PROBABILITY").and_then(|v| v.parse::<f32>().ok())
        {
            self.hole_probability = p;
        }
        if let Some(policy) = env_value("HOLEJUMP_POLICY").and_then(|v| PolicyKind::from_label(&v))
        {
            self.policy = policy;
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

pub fn config_path() -> String {
    env_value("HOLEJUMP_CONFIG").unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

pub fn parse_config(contents: &str) -> Result<HoleJumpConfig, String> {
    let cfg = serde_json::from_str::<HoleJumpConfig>(contents).map_err(|e| e.to_string())?;
    cfg.validate()?;
    Ok(cfg)
}

/// Reads the config file, falling back to defaults when it is missing or invalid.
pub fn load_config(path: &str) -> HoleJumpConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_config(&contents) {
            Ok(cfg) => {
                println!("[HoleJump] Loaded config from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("[HoleJump] Failed to load {}: {}", path, e);
                HoleJumpConfig::default()
            }
        },
        Err(_) => HoleJumpConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(HoleJumpConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = parse_config(r#"{ "floor_count_x": 4, "policy": "seek" }"#).unwrap();
        assert_eq!(cfg.floor_count_x, 4);
        assert_eq!(cfg.floor_count_z, 6);
        assert_eq!(cfg.policy, PolicyKind::Seek);
        assert!((cfg.hole_probability - 0.15).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_hole_probability() {
        let err = parse_config(r#"{ "hole_probability": 1.5 }"#).unwrap_err();
        assert!(err.contains("hole_probability"));
    }

    #[test]
    fn rejects_empty_grid() {
        let cfg = HoleJumpConfig {
            floor_count_z: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_oversized_grid() {
        let overflow = HoleJumpConfig {
            floor_count_x: usize::MAX / 2,
            floor_count_z: 3,
            ..Default::default()
        };
        assert!(overflow.validate().is_err());

        let huge = HoleJumpConfig {
            floor_count_x: 100_000,
            floor_count_z: 100_000,
            ..Default::default()
        };
        let err = huge.validate().unwrap_err();
        assert!(err.contains("exceeds"));

        let err = parse_config(r#"{ "floor_count_x": 2000, "floor_count_z": 2000 }"#).unwrap_err();
        assert!(err.contains("exceeds"));

        let at_limit = HoleJumpConfig {
            floor_count_x: 1000,
            floor_count_z: MAX_GRID_CELLS / 1000,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn policy_labels_parse() {
        assert_eq!(PolicyKind::from_label("Random"), Some(PolicyKind::Random));
        assert_eq!(PolicyKind::from_label("seek_target"), Some(PolicyKind::Seek));
        assert_eq!(PolicyKind::from_label("ppo"), None);
    }
}
