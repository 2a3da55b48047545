use bevy::prelude::*;

/// Marks the agent entity
#[derive(Component)]
pub struct AgentBody;

/// Marks the target entity
#[derive(Component)]
pub struct TargetMarker;

/// Floor tile spawned for the current episode, tagged so it can be cleared.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FloorTile {
    pub x: usize,
    pub z: usize,
}

#[derive(Resource, Clone, Copy, Default)]
pub struct HeadlessMode(pub bool);
