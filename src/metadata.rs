// Track info for display and import: lofty first, id3 as a fallback for
// MP3 files with malformed tags, minimal info when both fail
use std::path::Path;

use anyhow::Result;
use id3::TagLike;
use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TrackInfo {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub title: String,
    pub artist: Option<String>,
    pub duration_ms: Option<i64>,
}

/// Read what the UI shows for a file. Fails only when the file itself is
/// unreadable; unreadable tags degrade to the file stem as the title.
pub fn read_track_info(path: &Path) -> Result<TrackInfo> {
    let size = std::fs::metadata(path)?.len();

    let (title, artist, duration_ms) = match read_tags(path) {
        Ok(tags) => tags,
        Err(e) => {
            eprintln!("[Metadata] Tag read failed for {}: {}", path.display(), e);
            (fallback_title(path), None, None)
        }
    };

    Ok(TrackInfo {
        name: file_name(path),
        path: path.to_string_lossy().to_string(),
        size,
        title,
        artist,
        duration_ms,
    })
}

fn read_tags(path: &Path) -> Result<(String, Option<String>, Option<i64>)> {
    match read_with_lofty(path) {
        Ok(tags) => Ok(tags),
        Err(e) => {
            let is_mp3 = path
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| s.eq_ignore_ascii_case("mp3"))
                .unwrap_or(false);
            if is_mp3 {
                // id3 is more lenient with malformed MP3 tags
                read_with_id3(path)
            } else {
                Err(e)
            }
        }
    }
}

fn read_with_lofty(path: &Path) -> Result<(String, Option<String>, Option<i64>)> {
    let tagged_file = Probe::open(path)?.guess_file_type()?.read()?;
    let tag = tagged_file.primary_tag().or(tagged_file.first_tag());

    let title = tag
        .and_then(|t| t.title().map(|s| s.to_string()))
        .unwrap_or_else(|| fallback_title(path));
    let artist = tag.and_then(|t| t.artist().map(|s| s.to_string()));
    let duration_ms = Some(tagged_file.properties().duration().as_millis() as i64);

    Ok((title, artist, duration_ms))
}

fn read_with_id3(path: &Path) -> Result<(String, Option<String>, Option<i64>)> {
    let tag = id3::Tag::read_from_path(path)?;

    let title = tag
        .title()
        .map(|s| s.to_string())
        .unwrap_or_else(|| fallback_title(path));
    let artist = tag.artist().map(|s| s.to_string());
    // Only available when the tag carries a TLEN frame, which is in ms
    let duration_ms = tag.duration().map(|ms| ms as i64);

    Ok((title, artist, duration_ms))
}

fn fallback_title(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown")
        .to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}
