// Application state shared across command handlers
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::playback::Player;
use crate::playlist::Playlist;
use crate::settings::AppSettings;
use crate::transform::JobGate;

pub struct AppState {
    pub playlist: Mutex<Playlist>,
    pub player: Player,
    pub transform: JobGate,
    pub settings: Mutex<AppSettings>,
    pub app_dir: PathBuf,
}

impl AppState {
    pub fn new(player: Player, settings: AppSettings, app_dir: PathBuf) -> Self {
        Self {
            playlist: Mutex::new(Playlist::new()),
            player,
            transform: JobGate::new(),
            settings: Mutex::new(settings),
            app_dir,
        }
    }
}
