// Tauri command handlers
use std::path::{Path, PathBuf};

use tauri::{AppHandle, Emitter, State};

use crate::library::scanner;
use crate::metadata::{self, TrackInfo};
use crate::playlist::{PlaylistView, Track};
use crate::state::AppState;
use crate::transform::{Dispatcher, JobState};

fn track_from_info(info: TrackInfo) -> Track {
    Track {
        path: info.path,
        name: info.name,
        title: info.title,
        artist: info.artist,
        duration_ms: info.duration_ms,
        size: info.size,
    }
}

// ===== Playlist Commands =====

#[tauri::command]
pub fn add_file(path: String, state: State<'_, AppState>) -> Result<PlaylistView, String> {
    let info = metadata::read_track_info(Path::new(&path))
        .map_err(|e| format!("Failed to read {}: {}", path, e))?;

    let mut playlist = state.playlist.lock();
    playlist.add(track_from_info(info));
    Ok(playlist.view())
}

#[derive(serde::Serialize)]
pub struct FolderImport {
    pub found: usize,
    pub added: usize,
    pub playlist: PlaylistView,
}

#[tauri::command]
pub async fn add_folder(
    directory: String,
    state: State<'_, AppState>,
) -> Result<FolderImport, String> {
    // Scanning and tag reading hit the filesystem hard; keep them off the
    // event loop.
    let tracks = tokio::task::spawn_blocking(move || -> Result<Vec<Track>, String> {
        let files =
            scanner::scan(&directory).map_err(|e| format!("Failed to scan directory: {}", e))?;

        Ok(files
            .iter()
            .filter_map(|file| match metadata::read_track_info(file) {
                Ok(info) => Some(track_from_info(info)),
                Err(e) => {
                    eprintln!("[Library] Skipping {}: {}", file.display(), e);
                    None
                }
            })
            .collect())
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))??;

    let mut playlist = state.playlist.lock();
    let found = tracks.len();
    let mut added = 0;
    for track in tracks {
        if playlist.add(track) {
            added += 1;
        }
    }

    Ok(FolderImport {
        found,
        added,
        playlist: playlist.view(),
    })
}

#[tauri::command]
pub fn get_playlist(state: State<'_, AppState>) -> PlaylistView {
    state.playlist.lock().view()
}

#[tauri::command]
pub fn select_track(index: usize, state: State<'_, AppState>) -> Result<PlaylistView, String> {
    let mut playlist = state.playlist.lock();
    let track = playlist
        .select(index)
        .ok_or_else(|| format!("No track at index {}", index))?;

    state.player.play(PathBuf::from(&track.path));
    Ok(playlist.view())
}

#[tauri::command]
pub fn remove_track(index: usize, state: State<'_, AppState>) -> Result<PlaylistView, String> {
    let mut playlist = state.playlist.lock();
    playlist.remove(index)?;
    Ok(playlist.view())
}

#[tauri::command]
pub fn clear_playlist(state: State<'_, AppState>) -> PlaylistView {
    state.player.stop();
    let mut playlist = state.playlist.lock();
    playlist.clear();
    playlist.view()
}

// ===== Playback Commands =====

#[tauri::command]
pub fn play(state: State<'_, AppState>) -> Result<PlaylistView, String> {
    let mut playlist = state.playlist.lock();
    if playlist.is_empty() {
        return Err("Add files to playlist first".to_string());
    }

    if state.player.is_paused() {
        state.player.resume();
        return Ok(playlist.view());
    }
    if state.player.is_playing() {
        return Ok(playlist.view());
    }

    // Nothing selected yet starts from the top
    let track = match playlist.current() {
        Some(track) => track.clone(),
        None => {
            playlist.advance();
            playlist
                .current()
                .cloned()
                .ok_or_else(|| "Playlist is empty".to_string())?
        }
    };

    state.player.play(PathBuf::from(&track.path));
    Ok(playlist.view())
}

#[tauri::command]
pub fn pause(state: State<'_, AppState>) -> Result<(), String> {
    state.player.pause();
    Ok(())
}

#[tauri::command]
pub fn stop(state: State<'_, AppState>) -> Result<(), String> {
    state.player.stop();
    Ok(())
}

#[tauri::command]
pub fn next_track(state: State<'_, AppState>) -> Result<PlaylistView, String> {
    let mut playlist = state.playlist.lock();
    if let Some(track) = playlist.advance() {
        state.player.play(PathBuf::from(&track.path));
    }
    Ok(playlist.view())
}

#[tauri::command]
pub fn previous_track(state: State<'_, AppState>) -> Result<PlaylistView, String> {
    let mut playlist = state.playlist.lock();
    if let Some(track) = playlist.step_back() {
        state.player.play(PathBuf::from(&track.path));
    }
    Ok(playlist.view())
}

#[tauri::command]
pub fn seek(position_ms: i64, state: State<'_, AppState>) -> Result<(), String> {
    state.player.seek(position_ms);
    Ok(())
}

#[tauri::command]
pub fn set_volume(volume: f32, state: State<'_, AppState>) -> Result<(), String> {
    state.player.set_volume(volume);

    // Remember the volume for the next session
    let mut settings = state.settings.lock();
    settings.playback.volume = volume.clamp(0.0, 1.0);
    settings.save(&state.app_dir)
}

#[derive(serde::Serialize)]
pub struct PlaybackStatus {
    pub is_playing: bool,
    pub is_paused: bool,
    pub position_ms: i64,
    pub duration_ms: Option<i64>,
    pub volume: f32,
    pub current_file: Option<String>,
}

#[tauri::command]
pub fn get_playback_status(state: State<'_, AppState>) -> PlaybackStatus {
    PlaybackStatus {
        is_playing: state.player.is_playing(),
        is_paused: state.player.is_paused(),
        position_ms: state.player.position_ms(),
        duration_ms: state.player.duration_ms(),
        volume: state.player.volume(),
        current_file: state
            .player
            .current_file()
            .map(|p| p.to_string_lossy().to_string()),
    }
}

// ===== File Commands =====

#[tauri::command]
pub fn get_file_info(path: String) -> Result<TrackInfo, String> {
    metadata::read_track_info(Path::new(&path))
        .map_err(|e| format!("Failed to read {}: {}", path, e))
}

#[tauri::command]
pub fn reveal_in_folder(path: String) -> Result<(), String> {
    tauri_plugin_opener::reveal_item_in_dir(&path)
        .map_err(|e| format!("Failed to reveal {}: {}", path, e))
}

// ===== Transform Commands =====

#[derive(serde::Serialize)]
pub struct TransformResponse {
    pub output_file: String,
    pub playlist: PlaylistView,
}

/// Run the external telephone transformer on the selected track and, once
/// it finishes, enqueue the produced file like any user-imported one.
#[tauri::command]
pub async fn transform_current_track(
    state: State<'_, AppState>,
    app: AppHandle,
) -> Result<TransformResponse, String> {
    let Some(track) = state.playlist.lock().current().cloned() else {
        return Err("Select a track first".to_string());
    };

    // One transform at a time; a second submission is refused, not queued.
    // The ticket marks the job failed if this handler bails out early.
    let Some(ticket) = state.transform.try_begin() else {
        return Err("A transformation is already running".to_string());
    };

    let dispatcher = Dispatcher::from_settings(&state.settings.lock().transformer);
    eprintln!("[Transform] Transforming {}", track.path);

    let outcome = match dispatcher.dispatch(Path::new(&track.path)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("[Transform] {}", e);
            ticket.fail();
            return Err(e.to_string());
        }
    };

    // Import the produced file exactly like a user-picked one.
    let output_path = outcome.output_path.clone();
    let info = tokio::task::spawn_blocking(move || metadata::read_track_info(&output_path))
        .await
        .map_err(|e| format!("Task join error: {}", e))
        .and_then(|read| {
            read.map_err(|e| {
                format!(
                    "Transformation finished but the output could not be imported: {}",
                    e
                )
            })
        });
    let info = match info {
        Ok(info) => info,
        Err(message) => {
            eprintln!("[Transform] {}", message);
            ticket.fail();
            return Err(message);
        }
    };

    let view = {
        let mut playlist = state.playlist.lock();
        // An output already present by exact path is not duplicated
        playlist.add(track_from_info(info));
        playlist.view()
    };
    ticket.succeed();

    let output_file = outcome.output_path.to_string_lossy().to_string();
    eprintln!("[Transform] Wrote {}", output_file);
    let _ = app.emit("playlist-updated", &view);

    Ok(TransformResponse {
        output_file,
        playlist: view,
    })
}

#[tauri::command]
pub fn get_transform_state(state: State<'_, AppState>) -> JobState {
    state.transform.state()
}
