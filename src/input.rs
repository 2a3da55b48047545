use bevy::prelude::*;
use std::collections::HashSet;

/// Abstraction layer between raw input and the heuristic policy.
/// Keyboard (windowed) and tests both write to this.
#[derive(Resource, Default, Clone)]
pub struct VirtualInput {
    pub active: HashSet<String>,
    pub just_pressed: HashSet<String>,
}

impl VirtualInput {
    pub fn pressed(&self, action: &str) -> bool {
        self.active.contains(action)
    }

    /// True only on the frame the action went down.
    pub fn just_pressed(&self, action: &str) -> bool {
        self.just_pressed.contains(action)
    }

    pub fn press(&mut self, action: &str) {
        if self.active.insert(action.to_string()) {
            self.just_pressed.insert(action.to_string());
        }
    }
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(VirtualInput::default())
            .add_systems(
                PreUpdate,
                keyboard_to_virtual.run_if(resource_exists::<ButtonInput<KeyCode>>),
            )
            .add_systems(Last, clear_just_pressed);
    }
}

pub const TOGGLE_PROBES: &str = "toggle_probes";

const BINDINGS: &[(&str, &[KeyCode])] = &[
    ("left", &[KeyCode::ArrowLeft, KeyCode::KeyA]),
    ("right", &[KeyCode::ArrowRight, KeyCode::KeyD]),
    ("up", &[KeyCode::ArrowUp, KeyCode::KeyW]),
    ("down", &[KeyCode::ArrowDown, KeyCode::KeyS]),
    ("jump", &[KeyCode::Space]),
    (TOGGLE_PROBES, &[KeyCode::F1]),
];

/// Translate keyboard input to VirtualInput action names
fn keyboard_to_virtual(keyboard: Res<ButtonInput<KeyCode>>, mut vinput: ResMut<VirtualInput>) {
    vinput.active.clear();
    for &(action, keys) in BINDINGS {
        if keyboard.any_pressed(keys.iter().copied()) {
            vinput.active.insert(action.into());
        }
        if keyboard.any_just_pressed(keys.iter().copied()) {
            vinput.just_pressed.insert(action.into());
        }
    }
}

fn clear_just_pressed(mut vinput: ResMut<VirtualInput>) {
    vinput.just_pressed.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(ButtonInput::<KeyCode>::default())
            .add_plugins(InputPlugin);
        app
    }

    #[test]
    fn keyboard_maps_to_actions() {
        let mut app = app();
        let mut keys = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
        keys.press(KeyCode::ArrowLeft);
        keys.press(KeyCode::Space);
        app.update();
        let input = app.world().resource::<VirtualInput>();
        assert!(input.pressed("left"));
        assert!(input.pressed("jump"));
        assert!(!input.pressed("right"));
    }

    #[test]
    fn just_pressed_lasts_one_frame() {
        let mut app = app();
        app.add_systems(Update, |input: Res<VirtualInput>, mut seen: Local<u32>, mut commands: Commands| {
            if input.just_pressed(TOGGLE_PROBES) {
                *seen += 1;
                commands.insert_resource(ToggleCount(*seen));
            }
        });
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::F1);
        app.update();
        // still held, but no new edge
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .clear_just_pressed(KeyCode::F1);
        app.update();
        assert_eq!(app.world().resource::<ToggleCount>().0, 1);
        let input = app.world().resource::<VirtualInput>();
        assert!(input.pressed(TOGGLE_PROBES));
        assert!(!input.just_pressed(TOGGLE_PROBES));
    }

    #[derive(Resource)]
    struct ToggleCount(u32);
}
