use bevy::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use notify::{EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{self, HoleJumpConfig};
use crate::simulation::SimulationEnv;

/// Upper bound on reloads handled per frame; editors often emit bursts.
const MAX_RELOADS_PER_FRAME: usize = 8;

/// Reloads the scenario config when the file changes on disk. The new values
/// take effect when the next episode begins.
pub struct FileWatcherPlugin {
    pub path: String,
}

/// Raw contents of the config file after each write.
#[derive(Resource)]
pub struct ConfigReloads(pub Receiver<String>);

impl Plugin for FileWatcherPlugin {
    fn build(&self, app: &mut App) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let path = PathBuf::from(&self.path);
        std::thread::Builder::new()
            .name("holejump-config-watch".into())
            .spawn(move || watch_config_file(path, tx))
            .map_err(|e| error!("[HoleJump FileWatcher] Could not spawn watcher thread: {e}"))
            .ok();
        app.insert_resource(ConfigReloads(rx))
            .add_systems(Update, apply_config_reloads);
    }
}

fn watch_config_file(path: PathBuf, tx: Sender<String>) {
    let Some(file_name) = path.file_name().map(|n| n.to_owned()) else {
        eprintln!("[HoleJump FileWatcher] Not a file path: {}", path.display());
        return;
    };
    let dir = watch_dir(&path);

    let watched = file_name.clone();
    let handler = move |res: notify::Result<notify::Event>| {
        let Ok(event) = res else { return };
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }
        let changed = event
            .paths
            .iter()
            .find(|p| p.file_name() == Some(watched.as_os_str()));
        if let Some(content) = changed.and_then(|p| std::fs::read_to_string(p).ok()) {
            let _ = tx.send(content);
        }
    };

    let mut watcher = match notify::recommended_watcher(handler) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("[HoleJump FileWatcher] Watcher unavailable: {e}");
            return;
        }
    };
    // watch the directory so editors that replace the file are still seen
    if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
        eprintln!("[HoleJump FileWatcher] Cannot watch {}: {e}", dir.display());
        return;
    }
    println!("[HoleJump FileWatcher] Watching {}", path.display());

    // the watcher stops when dropped
    loop {
        std::thread::park_timeout(Duration::from_secs(3600));
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn apply_config_reloads(
    reloads: Res<ConfigReloads>,
    sim: Option<ResMut<SimulationEnv>>,
    mut shown: Option<ResMut<HoleJumpConfig>>,
) {
    let Some(mut sim) = sim else { return };
    for content in reloads.0.try_iter().take(MAX_RELOADS_PER_FRAME) {
        match apply_config(&mut sim, &content) {
            Ok(cfg) => {
                info!("[HoleJump FileWatcher] Config reloaded; applies next episode");
                if let Some(shown) = shown.as_mut() {
                    **shown = cfg;
                }
            }
            Err(e) => warn!("[HoleJump FileWatcher] Config rejected: {e}"),
        }
    }
}

/// Parses and queues a config for the next episode boundary.
fn apply_config(sim: &mut SimulationEnv, content: &str) -> Result<HoleJumpConfig, String> {
    let cfg = config::parse_config(content)?;
    sim.env.queue_config(cfg.clone())?;
    Ok(cfg)
}
