use bevy::math::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng as _, SeedableRng};

use crate::config::HoleJumpConfig;
use crate::floor::FloorGrid;

pub struct Rng(SmallRng);

impl Rng {
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(SmallRng::seed_from_u64(seed)),
            None => Self(SmallRng::from_entropy()),
        }
    }

    /// Uniform draw in [0, 100).
    pub fn percent(&mut self) -> f32 {
        self.0.gen_range(0.0..100.0)
    }

    /// Uniform draw in [-1, 1].
    pub fn signed(&mut self) -> f32 {
        self.0.gen_range(-1.0..=1.0)
    }

    pub fn chance(&mut self, p: f32) -> bool {
        self.0.gen::<f32>() < p
    }
}

#[derive(Clone, Debug)]
pub struct GeneratedFloor {
    pub grid: FloorGrid,
    /// `None` when no tile won the placement draw; callers keep the previous position.
    pub agent_spawn: Option<Vec3>,
    pub target_spawn: Option<Vec3>,
}

/// Lays out a fresh floor and picks agent/target spawns on placed tiles.
///
/// Cells are visited x-major. Each cell becomes a tile when its draw exceeds
/// `hole_probability * 100`. Every new tile may then claim the agent spawn, or
/// failing that the target spawn, each with `spawn_chance_percent` odds, so the
/// two never share a tile.
pub fn generate_floor(config: &HoleJumpConfig, rng: &mut Rng) -> GeneratedFloor {
    let mut grid = FloorGrid::empty(
        config.floor_count_x,
        config.floor_count_z,
        config.origin(),
        config.cell_size,
        config.tile_height,
    );
    let hole_threshold = config.hole_probability * 100.0;
    let spawn_chance = config.spawn_chance_percent as f32;

    let mut agent_spawn = None;
    let mut target_spawn = None;
    for x in 0..config.floor_count_x {
        for z in 0..config.floor_count_z {
            if rng.percent() <= hole_threshold {
                continue;
            }
            grid.set_tile(x as i32, z as i32, true);

            if agent_spawn.is_none() && rng.percent() < spawn_chance {
                agent_spawn = Some(grid.spawn_point(x, z));
            } else if target_spawn.is_none() && rng.percent() < spawn_chance {
                target_spawn = Some(grid.spawn_point(x, z));
            }
        }
    }

    GeneratedFloor {
        grid,
        agent_spawn,
        target_spawn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> HoleJumpConfig {
        HoleJumpConfig {
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn tile_count_never_exceeds_grid() {
        let cfg = config(1);
        let mut rng = Rng::new(cfg.seed);
        for _ in 0..200 {
            let floor = generate_floor(&cfg, &mut rng);
            assert!(floor.grid.tile_count() <= cfg.floor_count_x * cfg.floor_count_z);
        }
    }

    #[test]
    fn hole_rate_matches_probability() {
        let cfg = HoleJumpConfig {
            hole_probability: 0.3,
            ..config(7)
        };
        let mut rng = Rng::new(cfg.seed);
        let mut holes = 0usize;
        let mut cells = 0usize;
        for _ in 0..500 {
            let floor = generate_floor(&cfg, &mut rng);
            holes += floor.grid.hole_count();
            cells += floor.grid.cells.len();
        }
        let rate = holes as f32 / cells as f32;
        assert!((rate - 0.3).abs() < 0.02, "hole rate {rate}");
    }

    #[test]
    fn spawns_sit_on_tiles_and_differ() {
        let cfg = config(11);
        let mut rng = Rng::new(cfg.seed);
        for _ in 0..300 {
            let floor = generate_floor(&cfg, &mut rng);
            for spawn in [floor.agent_spawn, floor.target_spawn].into_iter().flatten() {
                let (x, z) = floor.grid.cell_at(spawn).expect("spawn inside grid");
                assert!(floor.grid.has_tile(x as i32, z as i32));
                assert_eq!(spawn.y, cfg.origin[1]);
            }
            if let (Some(a), Some(t)) = (floor.agent_spawn, floor.target_spawn) {
                assert_ne!(a, t);
            }
        }
    }

    #[test]
    fn same_seed_reproduces_layout() {
        let cfg = config(42);
        let mut a = Rng::new(cfg.seed);
        let mut b = Rng::new(cfg.seed);
        for _ in 0..10 {
            let fa = generate_floor(&cfg, &mut a);
            let fb = generate_floor(&cfg, &mut b);
            assert_eq!(fa.grid, fb.grid);
            assert_eq!(fa.agent_spawn, fb.agent_spawn);
            assert_eq!(fa.target_spawn, fb.target_spawn);
        }
    }

    #[test]
    fn zero_spawn_chance_leaves_spawns_unset() {
        let cfg = HoleJumpConfig {
            spawn_chance_percent: 0,
            ..config(3)
        };
        let floor = generate_floor(&cfg, &mut Rng::new(cfg.seed));
        assert!(floor.agent_spawn.is_none());
        assert!(floor.target_spawn.is_none());
    }

    #[test]
    fn no_holes_fills_grid() {
        let cfg = HoleJumpConfig {
            hole_probability: 0.0,
            ..config(5)
        };
        let floor = generate_floor(&cfg, &mut Rng::new(cfg.seed));
        assert_eq!(floor.grid.hole_count(), 0);
    }

    #[test]
    fn grid_follows_origin() {
        let cfg = HoleJumpConfig {
            hole_probability: 0.0,
            origin: [10.0, 2.0, -3.0],
            ..config(9)
        };
        let floor = generate_floor(&cfg, &mut Rng::new(cfg.seed));
        assert_eq!(floor.grid.tile_center(0, 0), Vec3::new(10.0, 1.0, -3.0));
    }
}
