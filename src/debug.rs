use crate::agent::GroundProbes;
use crate::components::HeadlessMode;
use crate::episode::EpisodeStats;
use crate::input::{VirtualInput, TOGGLE_PROBES};
use crate::raycast;
use crate::simulation::SimulationEnv;
use bevy::gizmos::config::GizmoConfigStore;
use bevy::prelude::*;

/// Name the overlay text entity is looked up by.
pub const SCREEN_TEXT_NAME: &str = "txtDebug";

const MISS_RAY_LENGTH: f32 = 3.0;

#[derive(Resource, Clone)]
pub struct DebugOverlayConfig {
    pub show_probes: bool,
}

impl Default for DebugOverlayConfig {
    fn default() -> Self {
        Self { show_probes: true }
    }
}

/// Handle to the overlay text, resolved once at startup.
#[derive(Resource, Default)]
pub struct ScreenText {
    entity: Option<Entity>,
}

impl ScreenText {
    pub fn bind<'a>(
        named: impl IntoIterator<Item = (Entity, &'a Name)>,
    ) -> Result<Entity, String> {
        named
            .into_iter()
            .find(|(_, name)| name.as_str() == SCREEN_TEXT_NAME)
            .map(|(entity, _)| entity)
            .ok_or_else(|| format!("no entity named '{}'", SCREEN_TEXT_NAME))
    }

    pub fn is_bound(&self) -> bool {
        self.entity.is_some()
    }
}

pub fn format_status(stats: &EpisodeStats, msg: &str) -> String {
    match stats.success_percent() {
        None => format!("Episode={} | {}", stats.episode, msg),
        Some(pct) => format!(
            "Episode={}, Success={}, Fail={} %{} | {}",
            stats.episode,
            stats.success,
            stats.fail,
            pct.round() as i64,
            msg
        ),
    }
}

pub struct DebugPlugin;

impl Plugin for DebugPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(DebugOverlayConfig::default())
            .insert_resource(ScreenText::default())
            .add_systems(Startup, setup_screen_text)
            .add_systems(PostStartup, bind_screen_text)
            .add_systems(Update, (toggle_probe_rays, update_screen_text))
            .add_systems(
                Update,
                draw_probe_rays.run_if(resource_exists::<GizmoConfigStore>),
            );
    }
}

fn setup_screen_text(mut commands: Commands, headless: Res<HeadlessMode>) {
    if headless.0 {
        return;
    }
    commands.spawn((
        Name::new(SCREEN_TEXT_NAME),
        Text::new(""),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::srgba(0.95, 1.0, 0.98, 0.95)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(8.0),
            top: Val::Px(8.0),
            ..default()
        },
    ));
}

fn bind_screen_text(mut screen: ResMut<ScreenText>, names: Query<(Entity, &Name)>) {
    match ScreenText::bind(names.iter()) {
        Ok(entity) => screen.entity = Some(entity),
        Err(e) => warn!("[HoleJump debug] Screen text unavailable: {}", e),
    }
}

fn update_screen_text(
    screen: Res<ScreenText>,
    sim: Option<Res<SimulationEnv>>,
    mut texts: Query<&mut Text>,
) {
    let (Some(entity), Some(sim)) = (screen.entity, sim) else {
        return;
    };
    if let Ok(mut text) = texts.get_mut(entity) {
        text.0 = format_status(&sim.env.stats, sim.env.status());
    }
}

fn toggle_probe_rays(input: Option<Res<VirtualInput>>, mut config: ResMut<DebugOverlayConfig>) {
    if input.is_some_and(|i| i.just_pressed(TOGGLE_PROBES)) {
        config.show_probes = !config.show_probes;
        info!("[HoleJump debug] Probe rays {}", if config.show_probes { "on" } else { "off" });
    }
}

fn draw_probe_rays(
    config: Res<DebugOverlayConfig>,
    sim: Option<Res<SimulationEnv>>,
    mut gizmos: Gizmos,
) {
    let Some(sim) = sim else { return };
    if !config.show_probes {
        return;
    }
    let p = sim.env.agent.position;
    let tiles = sim.env.tile_rays();
    for (i, (offset, dir)) in GroundProbes::rays().into_iter().enumerate() {
        // last ray points straight down
        let color = if i == 4 {
            Color::srgb(1.0, 0.92, 0.0)
        } else {
            Color::srgb(1.0, 0.0, 1.0)
        };
        let origin = p + offset;
        match raycast::nearest_hit(origin, dir, f32::INFINITY, tiles.iter().copied()) {
            Some(hit) => gizmos.line(origin, hit.point, color),
            None => gizmos.ray(origin, dir * MISS_RAY_LENGTH, color),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_without_outcomes_shows_episode_only() {
        let stats = EpisodeStats {
            episode: 3,
            ..Default::default()
        };
        assert_eq!(format_status(&stats, "hi"), "Episode=3 | hi");
    }

    #[test]
    fn status_with_outcomes_shows_rounded_percent() {
        let stats = EpisodeStats {
            episode: 7,
            success: 2,
            fail: 1,
        };
        assert_eq!(
            format_status(&stats, "down: True  True,True,True,True"),
            "Episode=7, Success=2, Fail=1 %67 | down: True  True,True,True,True"
        );
    }

    #[test]
    fn bind_fails_without_named_entity() {
        let mut world = World::new();
        let other = world.spawn(Name::new("hud")).id();
        let names = [(other, Name::new("hud"))];
        assert!(ScreenText::bind(names.iter().map(|(e, n)| (*e, n))).is_err());
        let target = world.spawn(Name::new(SCREEN_TEXT_NAME)).id();
        let names = [(other, Name::new("hud")), (target, Name::new(SCREEN_TEXT_NAME))];
        assert_eq!(ScreenText::bind(names.iter().map(|(e, n)| (*e, n))), Ok(target));
    }

    #[test]
    fn debug_plugin_stays_unbound_in_headless_mode() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(HeadlessMode(true))
            .add_plugins(DebugPlugin);
        app.update();
        assert!(!app.world().resource::<ScreenText>().is_bound());
    }

    #[test]
    fn toggle_key_flips_probe_rays() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(HeadlessMode(true))
            .insert_resource(VirtualInput::default())
            .add_plugins(DebugPlugin);
        app.update();
        assert!(app.world().resource::<DebugOverlayConfig>().show_probes);

        app.world_mut().resource_mut::<VirtualInput>().press(TOGGLE_PROBES);
        app.update();
        assert!(!app.world().resource::<DebugOverlayConfig>().show_probes);

        // held key without a fresh press leaves the setting alone
        app.world_mut().resource_mut::<VirtualInput>().just_pressed.clear();
        app.update();
        assert!(!app.world().resource::<DebugOverlayConfig>().show_probes);
    }

    #[test]
    fn debug_plugin_binds_named_text() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(HeadlessMode(false))
            .add_plugins(DebugPlugin);
        app.update();
        assert!(app.world().resource::<ScreenText>().is_bound());
    }
}
