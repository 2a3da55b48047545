use bevy::prelude::*;

use crate::components::{AgentBody, FloorTile, HeadlessMode, TargetMarker};
use crate::config::HoleJumpConfig;
use crate::floor::FloorGrid;
use crate::simulation::SimulationEnv;

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SceneState::default())
            .add_systems(Startup, setup_scene_assets)
            .add_systems(PostStartup, spawn_actors)
            .add_systems(
                Update,
                (refresh_scene_assets, rebuild_floor, sync_actors).chain(),
            );
    }
}

#[derive(Resource, Default)]
pub struct SceneState {
    floor_generation: u64,
}

/// Sizes the meshes were built with.
#[derive(Clone, Copy, Debug, PartialEq)]
struct MeshSizes {
    cell_size: f32,
    tile_height: f32,
    agent_size: f32,
    target_size: f32,
}

impl MeshSizes {
    fn of(cfg: &HoleJumpConfig) -> Self {
        Self {
            cell_size: cfg.cell_size,
            tile_height: cfg.tile_height,
            agent_size: cfg.agent_size,
            target_size: cfg.target_size,
        }
    }
}

#[derive(Resource)]
struct SceneAssets {
    sizes: MeshSizes,
    tile_mesh: Handle<Mesh>,
    tile_material: Handle<StandardMaterial>,
    agent_mesh: Handle<Mesh>,
    agent_material: Handle<StandardMaterial>,
    target_mesh: Handle<Mesh>,
    target_material: Handle<StandardMaterial>,
}

fn build_meshes(assets: &mut SceneAssets, sizes: MeshSizes, meshes: &mut Assets<Mesh>) {
    assets.sizes = sizes;
    assets.tile_mesh = meshes.add(Cuboid::new(sizes.cell_size, sizes.tile_height, sizes.cell_size));
    assets.agent_mesh = meshes.add(Cuboid::from_length(sizes.agent_size));
    assets.target_mesh = meshes.add(Cuboid::from_length(sizes.target_size));
}

fn setup_scene_assets(
    mut commands: Commands,
    headless: Res<HeadlessMode>,
    sim: Option<Res<SimulationEnv>>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    materials: Option<ResMut<Assets<StandardMaterial>>>,
) {
    if headless.0 {
        return;
    }
    let (Some(sim), Some(mut meshes), Some(mut materials)) = (sim, meshes, materials) else {
        return;
    };
    let mut assets = SceneAssets {
        sizes: MeshSizes::of(sim.env.config()),
        tile_mesh: Handle::default(),
        tile_material: materials.add(Color::srgb(0.55, 0.57, 0.6)),
        agent_mesh: Handle::default(),
        agent_material: materials.add(Color::srgb(0.2, 0.4, 0.9)),
        target_mesh: Handle::default(),
        target_material: materials.add(Color::srgb(0.95, 0.75, 0.1)),
    };
    build_meshes(&mut assets, MeshSizes::of(sim.env.config()), &mut meshes);
    commands.insert_resource(assets);
}

/// Rebuilds meshes after a reloaded config changes any body or tile size.
/// Tiles pick the new mesh up when the floor is respawned in the same frame.
fn refresh_scene_assets(
    sim: Option<Res<SimulationEnv>>,
    assets: Option<ResMut<SceneAssets>>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    mut agents: Query<&mut Mesh3d, (With<AgentBody>, Without<TargetMarker>)>,
    mut targets: Query<&mut Mesh3d, (With<TargetMarker>, Without<AgentBody>)>,
) {
    let (Some(sim), Some(mut assets), Some(mut meshes)) = (sim, assets, meshes) else {
        return;
    };
    let sizes = MeshSizes::of(sim.env.config());
    if sizes == assets.sizes {
        return;
    }
    build_meshes(&mut assets, sizes, &mut meshes);
    for mut mesh in agents.iter_mut() {
        mesh.0 = assets.agent_mesh.clone();
    }
    for mut mesh in targets.iter_mut() {
        mesh.0 = assets.target_mesh.clone();
    }
    info!("[HoleJump] Scene meshes rebuilt for new sizes");
}

fn spawn_actors(
    mut commands: Commands,
    sim: Option<Res<SimulationEnv>>,
    assets: Option<Res<SceneAssets>>,
) {
    let Some(sim) = sim else { return };
    let mut agent = commands.spawn((
        AgentBody,
        Name::new("Agent"),
        Transform::from_translation(sim.env.agent.position),
    ));
    if let Some(assets) = &assets {
        agent.insert((
            Mesh3d(assets.agent_mesh.clone()),
            MeshMaterial3d(assets.agent_material.clone()),
        ));
    }
    let mut target = commands.spawn((
        TargetMarker,
        Name::new("Target"),
        Transform::from_translation(sim.env.target),
    ));
    if let Some(assets) = &assets {
        target.insert((
            Mesh3d(assets.target_mesh.clone()),
            MeshMaterial3d(assets.target_material.clone()),
        ));
    }
}

/// Clears every tagged tile and respawns the current layout after regeneration.
fn rebuild_floor(
    mut commands: Commands,
    mut state: ResMut<SceneState>,
    sim: Option<Res<SimulationEnv>>,
    assets: Option<Res<SceneAssets>>,
    tiles: Query<Entity, With<FloorTile>>,
) {
    let Some(sim) = sim else { return };
    let generation = sim.env.floor_generation();
    if generation == state.floor_generation {
        return;
    }
    state.floor_generation = generation;

    for entity in tiles.iter() {
        commands.entity(entity).despawn_recursive();
    }
    let floor = &sim.env.floor;
    for (x, z) in floor.tiles() {
        let mut tile = commands.spawn((
            FloorTile { x, z },
            Name::new(FloorGrid::tile_name(x, z)),
            Transform::from_translation(floor.tile_center(x, z)),
        ));
        if let Some(assets) = &assets {
            tile.insert((
                Mesh3d(assets.tile_mesh.clone()),
                MeshMaterial3d(assets.tile_material.clone()),
            ));
        }
    }
}

fn sync_actors(
    sim: Option<Res<SimulationEnv>>,
    mut agents: Query<&mut Transform, (With<AgentBody>, Without<TargetMarker>)>,
    mut targets: Query<&mut Transform, (With<TargetMarker>, Without<AgentBody>)>,
) {
    let Some(sim) = sim else { return };
    for mut transform in agents.iter_mut() {
        transform.translation = sim.env.agent.position;
    }
    for mut transform in targets.iter_mut() {
        transform.translation = sim.env.target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::Environment;
    use crate::simulation::SimulationPlugin;

    fn app(seed: u64) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(HeadlessMode(true))
            .add_plugins(SimulationPlugin {
                config: HoleJumpConfig {
                    seed: Some(seed),
                    ..Default::default()
                },
            })
            .add_plugins(ScenePlugin);
        app
    }

    fn tile_count(app: &mut App) -> usize {
        app.world_mut()
            .query_filtered::<Entity, With<FloorTile>>()
            .iter(app.world())
            .count()
    }

    #[test]
    fn floor_entities_follow_layout() {
        let mut app = app(31);
        app.update();
        let expected = app.world().resource::<SimulationEnv>().env.floor.tile_count();
        assert_eq!(tile_count(&mut app), expected);
    }

    #[test]
    fn regeneration_replaces_tiles() {
        let mut app = app(32);
        app.update();
        app.world_mut()
            .resource_mut::<SimulationEnv>()
            .env
            .reset();
        app.update();
        let expected = app.world().resource::<SimulationEnv>().env.floor.tile_count();
        assert_eq!(tile_count(&mut app), expected);
    }

    #[test]
    fn actors_track_simulation() {
        let mut app = app(33);
        app.update();
        app.world_mut().resource_mut::<SimulationEnv>().env.target = Vec3::new(5.0, 0.0, 2.0);
        app.update();
        let target = app
            .world_mut()
            .query_filtered::<&Transform, With<TargetMarker>>()
            .single(app.world())
            .translation;
        assert_eq!(target, app.world().resource::<SimulationEnv>().env.target);
    }

    #[test]
    fn reloaded_sizes_rebuild_meshes() {
        let mut app = app(34);
        let sizes = MeshSizes::of(app.world().resource::<SimulationEnv>().env.config());
        app.insert_resource(Assets::<Mesh>::default())
            .insert_resource(SceneAssets {
                sizes,
                tile_mesh: Handle::default(),
                tile_material: Handle::default(),
                agent_mesh: Handle::default(),
                agent_material: Handle::default(),
                target_mesh: Handle::default(),
                target_material: Handle::default(),
            });
        app.update();
        let agent_mesh = |app: &mut App| {
            app.world_mut()
                .query_filtered::<&Mesh3d, With<AgentBody>>()
                .single(app.world())
                .0
                .clone()
        };
        assert_eq!(agent_mesh(&mut app), Handle::default());

        let next = HoleJumpConfig {
            agent_size: 0.5,
            ..app.world().resource::<SimulationEnv>().env.config().clone()
        };
        let mut sim = app.world_mut().resource_mut::<SimulationEnv>();
        sim.env.queue_config(next).unwrap();
        sim.env.reset();
        app.update();

        let assets = app.world().resource::<SceneAssets>();
        assert_eq!(assets.sizes.agent_size, 0.5);
        let rebuilt = assets.agent_mesh.clone();
        assert_ne!(rebuilt, Handle::default());
        assert_eq!(agent_mesh(&mut app), rebuilt);
        assert!(app.world().resource::<Assets<Mesh>>().get(&rebuilt).is_some());
    }
}
