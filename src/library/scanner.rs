use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use walkdir::WalkDir;

/// Audio file extensions the player imports
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a", "aac"];

/// True for files the player can add to the playlist
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .map(|extension| {
            let extension = extension.to_string_lossy().to_lowercase();
            AUDIO_EXTENSIONS.contains(&extension.as_str())
        })
        .unwrap_or(false)
}

/// Collect every audio file below a directory, in stable name order.
/// The walk is iterative and depth-unbounded; symlinks are not followed.
pub fn scan<P: AsRef<Path>>(directory: P) -> Result<Vec<PathBuf>> {
    let root = directory.as_ref();
    if !root.is_dir() {
        bail!("not a directory: {}", root.display());
    }

    let mut audio_files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() && is_audio_file(entry.path()) {
            audio_files.push(entry.path().to_path_buf());
        }
    }

    Ok(audio_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn finds_audio_files_in_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("sub").join("deeper");
        fs::create_dir_all(&deep).unwrap();

        touch(&dir.path().join("a.mp3"));
        touch(&dir.path().join("notes.txt"));
        touch(&deep.join("b.flac"));

        let found = scan(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|p| p.ends_with("a.mp3")));
        assert!(found.iter().any(|p| p.ends_with("b.flac")));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("loud.MP3"));
        touch(&dir.path().join("quiet.Ogg"));

        let found = scan(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn skips_files_without_an_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("README"));

        assert!(scan(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan(dir.path().join("nope")).is_err());
    }

    #[test]
    fn results_are_in_stable_name_order() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.wav"));
        touch(&dir.path().join("a.wav"));
        touch(&dir.path().join("c.wav"));

        let found = scan(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.wav", "b.wav", "c.wav"]);
    }
}
