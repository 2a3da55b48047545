use bevy::math::Vec3;

use crate::physics_core::Aabb3;

/// A floor tile as seen by the ground probes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastAabb {
    pub id: usize,
    pub aabb: Aabb3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastHit {
    pub id: usize,
    pub point: Vec3,
    pub distance: f32,
}

const PARALLEL_EPS: f32 = 1e-6;

/// Entry/exit parameters of the ray against one pair of parallel planes.
/// `None` when the ray runs parallel to the slab and outside it.
fn slab_interval(origin: f32, dir: f32, lo: f32, hi: f32) -> Option<(f32, f32)> {
    if dir.abs() < PARALLEL_EPS {
        return (lo..=hi)
            .contains(&origin)
            .then_some((f32::NEG_INFINITY, f32::INFINITY));
    }
    let a = (lo - origin) / dir;
    let b = (hi - origin) / dir;
    Some((a.min(b), a.max(b)))
}

/// Distance along a unit-length ray to the first surface of `aabb`, or to the
/// exit face when the origin is already inside.
pub fn ray_aabb_distance(origin: Vec3, dir: Vec3, max_distance: f32, aabb: &Aabb3) -> Option<f32> {
    let (enter, exit) = (0..3).try_fold((0.0f32, max_distance.max(0.0)), |(near, far), axis| {
        let (t0, t1) = slab_interval(origin[axis], dir[axis], aabb.min[axis], aabb.max[axis])?;
        let span = (near.max(t0), far.min(t1));
        (span.0 <= span.1).then_some(span)
    })?;
    let t = if enter > 0.0 { enter } else { exit };
    (t >= 0.0 && t <= max_distance).then_some(t)
}

fn unit(direction: Vec3) -> Option<Vec3> {
    let len = direction.length();
    (len > 1e-4).then(|| direction / len)
}

/// Nearest tile hit along the ray.
pub fn nearest_hit(
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    targets: impl IntoIterator<Item = RaycastAabb>,
) -> Option<RaycastHit> {
    let dir = unit(direction)?;
    targets
        .into_iter()
        .filter_map(|t| {
            ray_aabb_distance(origin, dir, max_distance, &t.aabb).map(|distance| RaycastHit {
                id: t.id,
                point: origin + dir * distance,
                distance,
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

pub fn raycast_any(
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    targets: impl IntoIterator<Item = RaycastAabb>,
) -> bool {
    let Some(dir) = unit(direction) else {
        return false;
    };
    targets
        .into_iter()
        .any(|t| ray_aabb_distance(origin, dir, max_distance, &t.aabb).is_some())
}
