use bevy::math::Vec2;

use crate::agent::{ActionVector, Observation};
use crate::config::PolicyKind;
use crate::generation::Rng;
use crate::input::VirtualInput;

/// Anything that turns an observation into an action. The external trainer
/// sits behind this seam; the built-in policies cover manual play and smoke runs.
pub trait Policy: Send + Sync {
    fn name(&self) -> &'static str;

    fn decide(&mut self, obs: &Observation) -> ActionVector;

    /// Latest manual input. Only the heuristic policy listens.
    fn set_input(&mut self, _input: &VirtualInput) {}
}

/// Keyboard mapping: left/right on x, up/down on z, jump.
/// Later bindings win when both directions of an axis are held.
pub fn heuristic_action(input: &VirtualInput) -> ActionVector {
    let mut action = ActionVector::default();
    if input.pressed("left") {
        action.0[0] = -1.0;
    }
    if input.pressed("right") {
        action.0[0] = 1.0;
    }
    if input.pressed("up") {
        action.0[1] = 1.0;
    }
    if input.pressed("down") {
        action.0[1] = -1.0;
    }
    if input.pressed("jump") {
        action.0[2] = 1.0;
    }
    action
}

#[derive(Default)]
pub struct HeuristicPolicy {
    input: VirtualInput,
}

impl Policy for HeuristicPolicy {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn decide(&mut self, _obs: &Observation) -> ActionVector {
        heuristic_action(&self.input)
    }

    fn set_input(&mut self, input: &VirtualInput) {
        self.input = input.clone();
    }
}

pub struct RandomPolicy {
    rng: Rng,
    jump_chance: f32,
}

impl RandomPolicy {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: Rng::new(seed),
            jump_chance: 0.1,
        }
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn decide(&mut self, _obs: &Observation) -> ActionVector {
        let jump = if self.rng.chance(self.jump_chance) { 1.0 } else { 0.0 };
        ActionVector::new(self.rng.signed(), self.rng.signed(), jump)
    }
}

/// Walks straight at the target and hops when the leading probe sees a gap.
#[derive(Default)]
pub struct SeekTargetPolicy;

impl Policy for SeekTargetPolicy {
    fn name(&self) -> &'static str {
        "seek"
    }

    fn decide(&mut self, obs: &Observation) -> ActionVector {
        let away = obs.direction();
        let heading = Vec2::new(-away.x, -away.z).normalize_or_zero();
        if heading == Vec2::ZERO {
            return ActionVector::default();
        }
        let probes = obs.probes();
        let leading = if heading.x.abs() >= heading.y.abs() {
            if heading.x > 0.0 {
                probes.right
            } else {
                probes.left
            }
        } else if heading.y > 0.0 {
            probes.forward
        } else {
            probes.back
        };
        let jump = if probes.down && !leading { 1.0 } else { 0.0 };
        ActionVector::new(heading.x, heading.y, jump)
    }
}

pub fn build_policy(kind: PolicyKind, seed: Option<u64>) -> Box<dyn Policy> {
    match kind {
        PolicyKind::Heuristic => Box::new(HeuristicPolicy::default()),
        PolicyKind::Random => Box::new(RandomPolicy::new(seed.map(|s| s.wrapping_add(1)))),
        PolicyKind::Seek => Box::new(SeekTargetPolicy),
    }
}
