// Settings management and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// External transformer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerSettings {
    /// Program to run, resolved through PATH or given as a full path
    pub program: String,
    /// Optional script handed to the program before the input/output paths
    pub script: Option<String>,
    /// Kill the transformer after this many seconds; unlimited when unset
    pub timeout_secs: Option<u64>,
    /// Require the predicted output file to exist before reporting success
    pub verify_output: bool,
}

impl Default for TransformerSettings {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            script: Some("telephone.py".to_string()),
            timeout_secs: None,
            verify_output: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Initial output volume, 0.0 - 1.0
    pub volume: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self { volume: 0.7 }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub version: i32, // Settings schema version for future migrations
    pub transformer: TransformerSettings,
    pub playback: PlaybackSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: 1,
            transformer: TransformerSettings::default(),
            playback: PlaybackSettings::default(),
        }
    }
}

impl AppSettings {
    pub fn settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self, String> {
        let path = Self::settings_path(app_dir);

        if !path.exists() {
            eprintln!("[Settings] No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings file: {}", e))?;

        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse settings: {}", e))?;

        eprintln!("[Settings] Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<(), String> {
        fs::create_dir_all(app_dir)
            .map_err(|e| format!("Failed to create settings directory: {}", e))?;

        let path = Self::settings_path(app_dir);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(&path, content)
            .map_err(|e| format!("Failed to write settings file: {}", e))?;

        eprintln!("[Settings] Saved settings to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppSettings::load(dir.path()).unwrap();
        assert_eq!(settings.transformer.program, "python");
        assert_eq!(settings.transformer.script.as_deref(), Some("telephone.py"));
        assert!(settings.transformer.timeout_secs.is_none());
        assert!(!settings.transformer.verify_output);
        assert_eq!(settings.playback.volume, 0.7);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = AppSettings::default();
        settings.transformer.program = "/opt/fx/telephone".to_string();
        settings.transformer.script = None;
        settings.transformer.timeout_secs = Some(120);
        settings.transformer.verify_output = true;
        settings.save(dir.path()).unwrap();

        let loaded = AppSettings::load(dir.path()).unwrap();
        assert_eq!(loaded.transformer.program, "/opt/fx/telephone");
        assert!(loaded.transformer.script.is_none());
        assert_eq!(loaded.transformer.timeout_secs, Some(120));
        assert!(loaded.transformer.verify_output);
    }

    #[test]
    fn missing_fields_take_their_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            AppSettings::settings_path(dir.path()),
            r#"{"version":1,"transformer":{"program":"ffmpeg"}}"#,
        )
        .unwrap();

        let loaded = AppSettings::load(dir.path()).unwrap();
        assert_eq!(loaded.transformer.program, "ffmpeg");
        assert_eq!(loaded.transformer.script.as_deref(), Some("telephone.py"));
        assert_eq!(loaded.playback.volume, 0.7);
    }
}
