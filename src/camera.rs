use bevy::prelude::*;

use crate::components::HeadlessMode;
use crate::config::HoleJumpConfig;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_camera);
    }
}

/// Centre of the floor and a viewpoint that keeps the whole grid in frame.
pub fn camera_pose(config: &HoleJumpConfig) -> (Vec3, Vec3) {
    let span_x = (config.floor_count_x.saturating_sub(1)) as f32 * config.cell_size;
    let span_z = (config.floor_count_z.saturating_sub(1)) as f32 * config.cell_size;
    let center = config.origin() + Vec3::new(span_x * 0.5, -1.0, span_z * 0.5);
    let reach = span_x.max(span_z).max(1.0);
    let eye = center + Vec3::new(0.0, reach * 0.9, -reach * 0.9);
    (center, eye)
}

fn setup_camera(
    mut commands: Commands,
    headless: Res<HeadlessMode>,
    config: Option<Res<HoleJumpConfig>>,
) {
    if headless.0 {
        return;
    }
    let config = config.map(|c| c.clone()).unwrap_or_default();
    let (center, eye) = camera_pose(&config);
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(eye).looking_at(center, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 10.0, -6.0).looking_at(center, Vec3::Y),
    ));
}
