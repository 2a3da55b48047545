use std::collections::BTreeSet;

use bevy::math::Vec3;

/// Maximum downward speed, keeps a falling body from tunnelling through a tile in one tick.
pub const MAX_FALL_SPEED: f32 = 40.0;

/// Slack used for contact and overlap tests.
const CONTACT_EPSILON: f32 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    pub fn from_center(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Interpenetration. Faces resting against each other do not count.
    pub fn overlaps(&self, other: &Aabb3) -> bool {
        self.min.x < other.max.x - CONTACT_EPSILON
            && self.max.x > other.min.x + CONTACT_EPSILON
            && self.min.y < other.max.y - CONTACT_EPSILON
            && self.max.y > other.min.y + CONTACT_EPSILON
            && self.min.z < other.max.z - CONTACT_EPSILON
            && self.max.z > other.min.z + CONTACT_EPSILON
    }

    /// Overlap or face contact.
    pub fn touches(&self, other: &Aabb3) -> bool {
        self.min.x <= other.max.x + CONTACT_EPSILON
            && self.max.x >= other.min.x - CONTACT_EPSILON
            && self.min.y <= other.max.y + CONTACT_EPSILON
            && self.max.y >= other.min.y - CONTACT_EPSILON
            && self.min.z <= other.max.z + CONTACT_EPSILON
            && self.max.z >= other.min.z - CONTACT_EPSILON
    }
}

#[derive(Default, Clone, Copy, Debug)]
pub struct PhysicsCounters {
    pub collision_checks: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Collider {
    Floor(usize),
    Target,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionEvent {
    Enter(Collider),
    Exit(Collider),
}

/// Rigid-body integration under gravity.
pub fn apply_gravity(vy: &mut f32, gravity: f32, dt: f32) {
    *vy -= gravity * dt;
    *vy = vy.max(-MAX_FALL_SPEED);
}

/// Extra pull while descending so jumps do not float.
pub fn apply_fast_fall(vy: &mut f32, gravity: f32, fall_multiplier: f32, dt: f32) {
    if *vy < 0.0 {
        *vy -= gravity * fall_multiplier * dt;
        *vy = vy.max(-MAX_FALL_SPEED);
    }
}

pub fn planar_translation(move_x: f32, move_z: f32, speed: f32, dt: f32) -> Vec3 {
    Vec3::new(move_x * speed * dt, 0.0, move_z * speed * dt)
}

/// Velocity-change impulse. Only fires while grounded and with a non-zero jump input.
pub fn try_jump(grounded: bool, jump_input: f32, jump_force: f32, vy: &mut f32) -> bool {
    if !grounded || jump_input == 0.0 {
        return false;
    }
    *vy += jump_input * jump_force;
    true
}

#[derive(Clone, Copy, Debug)]
pub struct MotionParams {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Direct displacement applied this tick, on top of `velocity * dt`.
    pub translation: Vec3,
    pub size: Vec3,
    pub dt: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionResult {
    pub position: Vec3,
    pub velocity: Vec3,
}

fn collides_any(
    body: &Aabb3,
    solids: &[Aabb3],
    counters: &mut PhysicsCounters,
) -> Option<usize> {
    for (i, solid) in solids.iter().enumerate() {
        counters.collision_checks = counters.collision_checks.saturating_add(1);
        if body.overlaps(solid) {
            return Some(i);
        }
    }
    None
}

/// Axis-separated move: x, then z, then y with landing/ceiling snap.
pub fn resolve_motion(
    solids: &[Aabb3],
    params: MotionParams,
    counters: &mut PhysicsCounters,
) -> MotionResult {
    let MotionParams {
        mut position,
        mut velocity,
        translation,
        size,
        dt,
    } = params;
    let delta = translation + velocity * dt;

    for axis in [0usize, 2] {
        if delta[axis] == 0.0 {
            continue;
        }
        let mut moved = position;
        moved[axis] += delta[axis];
        if collides_any(&Aabb3::from_center(moved, size), solids, counters).is_none() {
            position = moved;
        } else {
            velocity[axis] = 0.0;
        }
    }

    if delta.y != 0.0 {
        let mut moved = position;
        moved.y += delta.y;
        let body = Aabb3::from_center(moved, size);
        let mut hit_top: Option<f32> = None;
        let mut hit_bottom: Option<f32> = None;
        for solid in solids {
            counters.collision_checks = counters.collision_checks.saturating_add(1);
            if body.overlaps(solid) {
                hit_top = Some(hit_top.map_or(solid.max.y, |t| t.max(solid.max.y)));
                hit_bottom = Some(hit_bottom.map_or(solid.min.y, |b| b.min(solid.min.y)));
            }
        }
        match (delta.y < 0.0, hit_top, hit_bottom) {
            (true, Some(top), _) => {
                moved.y = top + size.y * 0.5;
                velocity.y = 0.0;
            }
            (false, _, Some(bottom)) => {
                moved.y = bottom - size.y * 0.5;
                velocity.y = 0.0;
            }
            _ => {}
        }
        position = moved;
    }

    MotionResult { position, velocity }
}

/// Solids (by index) currently touching the body.
pub fn touching(body: &Aabb3, solids: &[(usize, Aabb3)], counters: &mut PhysicsCounters) -> BTreeSet<usize> {
    let mut out = BTreeSet::new();
    for (id, solid) in solids {
        counters.collision_checks = counters.collision_checks.saturating_add(1);
        if body.touches(solid) {
            out.insert(*id);
        }
    }
    out
}

/// Turns per-tick contact sets into enter/exit events.
#[derive(Default, Clone, Debug)]
pub struct ContactTracker {
    floor: BTreeSet<usize>,
    target: bool,
}

impl ContactTracker {
    pub fn clear(&mut self) {
        self.floor.clear();
        self.target = false;
    }

    /// Exits are reported before enters so a body crossing between tiles ends up grounded.
    pub fn update(&mut self, floor: BTreeSet<usize>, target: bool) -> Vec<CollisionEvent> {
        let mut events = Vec::new();
        for id in self.floor.difference(&floor) {
            events.push(CollisionEvent::Exit(Collider::Floor(*id)));
        }
        if self.target && !target {
            events.push(CollisionEvent::Exit(Collider::Target));
        }
        for id in floor.difference(&self.floor) {
            events.push(CollisionEvent::Enter(Collider::Floor(*id)));
        }
        if target && !self.target {
            events.push(CollisionEvent::Enter(Collider::Target));
        }
        self.floor = floor;
        self.target = target;
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(x: f32, z: f32) -> Aabb3 {
        Aabb3::from_center(Vec3::new(x, -1.0, z), Vec3::ONE)
    }

    #[test]
    fn fast_fall_only_when_descending() {
        let mut vy = 1.0;
        apply_fast_fall(&mut vy, 9.81, 2.5, 0.02);
        assert_eq!(vy, 1.0);
        let mut vy = -1.0;
        apply_fast_fall(&mut vy, 9.81, 2.5, 0.02);
        assert!((vy - (-1.0 - 9.81 * 2.5 * 0.02)).abs() < 1e-5);
    }

    #[test]
    fn gravity_clamps_to_max_fall_speed() {
        let mut vy = -MAX_FALL_SPEED + 0.01;
        apply_gravity(&mut vy, 9.81, 1.0);
        assert_eq!(vy, -MAX_FALL_SPEED);
    }

    #[test]
    fn jump_requires_ground_and_input() {
        let mut vy = 0.0;
        assert!(!try_jump(false, 1.0, 1.5, &mut vy));
        assert_eq!(vy, 0.0);
        assert!(!try_jump(true, 0.0, 1.5, &mut vy));
        assert_eq!(vy, 0.0);
        assert!(try_jump(true, 1.0, 1.5, &mut vy));
        assert!((vy - 1.5).abs() < 1e-6);
    }

    #[test]
    fn resolve_motion_lands_on_tile() {
        let mut counters = PhysicsCounters::default();
        let out = resolve_motion(
            &[tile(0.0, 0.0)],
            MotionParams {
                position: Vec3::new(0.0, 0.2, 0.0),
                velocity: Vec3::new(0.0, -20.0, 0.0),
                translation: Vec3::ZERO,
                size: Vec3::ONE,
                dt: 0.02,
            },
            &mut counters,
        );
        assert!(out.position.y.abs() < 1e-5);
        assert_eq!(out.velocity.y, 0.0);
        assert!(counters.collision_checks > 0);
    }

    #[test]
    fn resolve_motion_slides_across_floor() {
        let mut counters = PhysicsCounters::default();
        let out = resolve_motion(
            &[tile(0.0, 0.0), tile(1.0, 0.0)],
            MotionParams {
                position: Vec3::ZERO,
                velocity: Vec3::ZERO,
                translation: Vec3::new(0.4, 0.0, 0.0),
                size: Vec3::ONE,
                dt: 0.02,
            },
            &mut counters,
        );
        assert!((out.position.x - 0.4).abs() < 1e-5);
        assert_eq!(out.position.y, 0.0);
    }

    #[test]
    fn resolve_motion_falls_through_hole() {
        let mut counters = PhysicsCounters::default();
        let out = resolve_motion(
            &[tile(1.0, 0.0)],
            MotionParams {
                position: Vec3::ZERO,
                velocity: Vec3::new(0.0, -5.0, 0.0),
                translation: Vec3::ZERO,
                size: Vec3::ONE,
                dt: 0.02,
            },
            &mut counters,
        );
        assert!(out.position.y < 0.0);
    }

    #[test]
    fn wall_blocks_body_inside_hole() {
        let mut counters = PhysicsCounters::default();
        let out = resolve_motion(
            &[tile(1.0, 0.0)],
            MotionParams {
                position: Vec3::new(0.0, -1.0, 0.0),
                velocity: Vec3::ZERO,
                translation: Vec3::new(0.3, 0.0, 0.0),
                size: Vec3::ONE,
                dt: 0.02,
            },
            &mut counters,
        );
        assert_eq!(out.position.x, 0.0);
    }

    #[test]
    fn contact_tracker_reports_exit_before_enter() {
        let mut tracker = ContactTracker::default();
        let first = tracker.update(BTreeSet::from([0]), false);
        assert_eq!(first, vec![CollisionEvent::Enter(Collider::Floor(0))]);
        let second = tracker.update(BTreeSet::from([1]), true);
        assert_eq!(
            second,
            vec![
                CollisionEvent::Exit(Collider::Floor(0)),
                CollisionEvent::Enter(Collider::Floor(1)),
                CollisionEvent::Enter(Collider::Target),
            ]
        );
        assert!(tracker.update(BTreeSet::from([1]), true).is_empty());
    }

    #[test]
    fn resting_body_touches_but_does_not_overlap() {
        let body = Aabb3::from_center(Vec3::ZERO, Vec3::ONE);
        let floor = tile(0.0, 0.0);
        assert!(body.touches(&floor));
        assert!(!body.overlaps(&floor));
    }
}
