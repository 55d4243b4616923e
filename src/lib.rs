// Tinny - desktop playlist player with an external telephone-effect transformer
// Module declarations
mod commands;
mod library;
mod metadata;
mod playback;
mod playlist;
mod settings;
mod state;
mod transform;

use playback::{Player, PlayerEvent};
use settings::AppSettings;
use state::AppState;
use tauri::{Emitter, Manager};

#[derive(Clone, serde::Serialize)]
struct ProgressPayload {
    position_ms: i64,
    duration_ms: Option<i64>,
}

#[derive(Clone, serde::Serialize)]
struct TrackEndedPayload {
    path: String,
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            // Get app data directory
            let app_dir = app
                .path()
                .app_data_dir()
                .expect("Failed to get app data directory");

            let settings = AppSettings::load(&app_dir).unwrap_or_else(|e| {
                eprintln!("[Settings] {}", e);
                AppSettings::default()
            });

            // Playback engine; its events are forwarded to the frontend
            let handle = app.handle().clone();
            let player = Player::spawn(settings.playback.volume, move |event| match event {
                PlayerEvent::Progress {
                    position_ms,
                    duration_ms,
                } => {
                    let _ = handle.emit(
                        "playback-progress",
                        ProgressPayload {
                            position_ms,
                            duration_ms,
                        },
                    );
                }
                PlayerEvent::TrackEnded { path } => {
                    let _ = handle.emit(
                        "track-ended",
                        TrackEndedPayload {
                            path: path.to_string_lossy().to_string(),
                        },
                    );
                }
                PlayerEvent::Error { message } => {
                    let _ = handle.emit("playback-error", message);
                }
            });

            let app_state = AppState::new(player, settings, app_dir);
            app.manage(app_state);

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::add_file,
            commands::add_folder,
            commands::get_playlist,
            commands::select_track,
            commands::remove_track,
            commands::clear_playlist,
            commands::play,
            commands::pause,
            commands::stop,
            commands::next_track,
            commands::previous_track,
            commands::seek,
            commands::set_volume,
            commands::get_playback_status,
            commands::get_file_info,
            commands::reveal_in_folder,
            commands::transform_current_track,
            commands::get_transform_state,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
