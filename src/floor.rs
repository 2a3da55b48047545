use bevy::math::Vec3;

use crate::physics_core::Aabb3;

/// Floor layout for one episode. A cell either carries a tile or is a hole.
#[derive(Clone, Debug, PartialEq)]
pub struct FloorGrid {
    pub width: usize,
    pub depth: usize,
    pub cells: Vec<bool>,
    pub origin: Vec3,
    pub cell_size: f32,
    pub tile_height: f32,
}

impl FloorGrid {
    pub fn empty(width: usize, depth: usize, origin: Vec3, cell_size: f32, tile_height: f32) -> Self {
        Self {
            width,
            depth,
            cells: vec![false; width * depth],
            origin,
            cell_size,
            tile_height,
        }
    }

    fn index(&self, x: i32, z: i32) -> Option<usize> {
        let (x, z) = (usize::try_from(x).ok()?, usize::try_from(z).ok()?);
        (x < self.width && z < self.depth).then(|| z * self.width + x)
    }

    pub fn has_tile(&self, x: i32, z: i32) -> bool {
        self.index(x, z).map_or(false, |i| self.cells[i])
    }

    pub fn set_tile(&mut self, x: i32, z: i32, present: bool) {
        if let Some(i) = self.index(x, z) {
            self.cells[i] = present;
        }
    }

    pub fn tile_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    pub fn hole_count(&self) -> usize {
        self.cells.len() - self.tile_count()
    }

    /// Spawn point above cell (x, z), level with the grid origin.
    pub fn spawn_point(&self, x: usize, z: usize) -> Vec3 {
        Vec3::new(
            self.origin.x + x as f32 * self.cell_size,
            self.origin.y,
            self.origin.z + z as f32 * self.cell_size,
        )
    }

    /// Tile centre sits one unit below the spawn plane.
    pub fn tile_center(&self, x: usize, z: usize) -> Vec3 {
        self.spawn_point(x, z) - Vec3::Y
    }

    pub fn tile_aabb(&self, x: usize, z: usize) -> Aabb3 {
        Aabb3::from_center(
            self.tile_center(x, z),
            Vec3::new(self.cell_size, self.tile_height, self.cell_size),
        )
    }

    /// Cell whose footprint contains the world position, if it is inside the grid.
    pub fn cell_at(&self, pos: Vec3) -> Option<(usize, usize)> {
        let fx = ((pos.x - self.origin.x) / self.cell_size + 0.5).floor() as i32;
        let fz = ((pos.z - self.origin.z) / self.cell_size + 0.5).floor() as i32;
        self.index(fx, fz).map(|_| (fx as usize, fz as usize))
    }

    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.width)
            .flat_map(move |x| (0..self.depth).map(move |z| (x, z)))
            .filter(move |&(x, z)| self.cells[z * self.width + x])
    }

    pub fn tile_aabbs(&self) -> impl Iterator<Item = (usize, Aabb3)> + '_ {
        self.tiles()
            .map(move |(x, z)| (z * self.width + x, self.tile_aabb(x, z)))
    }

    pub fn tile_name(x: usize, z: usize) -> String {
        format!("floor{}_{}", x, z)
    }
}
