// Playlist state, mutated only through these transitions
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub path: String,
    pub name: String,
    pub title: String,
    pub artist: Option<String>,
    pub duration_ms: Option<i64>,
    pub size: u64,
}

/// Snapshot handed to the frontend after every mutation.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistView {
    pub tracks: Vec<Track>,
    pub current: Option<usize>,
}

#[derive(Debug, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    current: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track unless one with the same path is already present.
    pub fn add(&mut self, track: Track) -> bool {
        if self.tracks.iter().any(|t| t.path == track.path) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn select(&mut self, index: usize) -> Option<&Track> {
        if index >= self.tracks.len() {
            return None;
        }
        self.current = Some(index);
        self.tracks.get(index)
    }

    /// Move to the next track, wrapping at the end. With no selection yet
    /// this starts at the first track.
    pub fn advance(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            self.current = None;
            return None;
        }
        let next = match self.current {
            Some(i) => (i + 1) % self.tracks.len(),
            None => 0,
        };
        self.current = Some(next);
        self.tracks.get(next)
    }

    /// Move to the previous track, wrapping at the start.
    pub fn step_back(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            self.current = None;
            return None;
        }
        let prev = match self.current {
            Some(0) | None => self.tracks.len() - 1,
            Some(i) => i - 1,
        };
        self.current = Some(prev);
        self.tracks.get(prev)
    }

    /// Remove a track by index. The selection follows the same track when
    /// possible and clears when the selected track itself is removed.
    pub fn remove(&mut self, index: usize) -> Result<Track, String> {
        if index >= self.tracks.len() {
            return Err(format!(
                "Index {} out of range (playlist has {} tracks)",
                index,
                self.tracks.len()
            ));
        }
        let track = self.tracks.remove(index);
        if let Some(ci) = self.current {
            if index < ci {
                self.current = Some(ci - 1);
            } else if index == ci {
                self.current = None;
            }
        }
        Ok(track)
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
    }

    pub fn view(&self) -> PlaylistView {
        PlaylistView {
            tracks: self.tracks.clone(),
            current: self.current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_track(name: &str) -> Track {
        Track {
            path: format!("/music/{}.mp3", name),
            name: format!("{}.mp3", name),
            title: name.to_string(),
            artist: None,
            duration_ms: Some(60_000),
            size: 1024,
        }
    }

    #[test]
    fn new_playlist_is_empty() {
        let pl = Playlist::new();
        assert!(pl.is_empty());
        assert!(pl.current().is_none());
    }

    #[test]
    fn add_refuses_duplicate_paths() {
        let mut pl = Playlist::new();
        assert!(pl.add(make_track("a")));
        assert!(pl.add(make_track("b")));
        assert!(!pl.add(make_track("a")));
        assert_eq!(pl.len(), 2);
    }

    #[test]
    fn advance_starts_at_the_first_track() {
        let mut pl = Playlist::new();
        pl.add(make_track("a"));
        pl.add(make_track("b"));
        assert_eq!(pl.advance().unwrap().title, "a");
    }

    #[test]
    fn advance_wraps_at_the_end() {
        let mut pl = Playlist::new();
        pl.add(make_track("a"));
        pl.add(make_track("b"));
        pl.select(1);
        assert_eq!(pl.advance().unwrap().title, "a");
    }

    #[test]
    fn step_back_wraps_at_the_start() {
        let mut pl = Playlist::new();
        pl.add(make_track("a"));
        pl.add(make_track("b"));
        pl.select(0);
        assert_eq!(pl.step_back().unwrap().title, "b");
    }

    #[test]
    fn step_back_without_selection_picks_the_last_track() {
        let mut pl = Playlist::new();
        pl.add(make_track("a"));
        pl.add(make_track("b"));
        assert_eq!(pl.step_back().unwrap().title, "b");
    }

    #[test]
    fn navigation_on_an_empty_playlist_is_a_no_op() {
        let mut pl = Playlist::new();
        assert!(pl.advance().is_none());
        assert!(pl.step_back().is_none());
        assert!(pl.current().is_none());
    }

    #[test]
    fn select_out_of_range_returns_none() {
        let mut pl = Playlist::new();
        pl.add(make_track("a"));
        assert!(pl.select(5).is_none());
        assert!(pl.current().is_none());
    }

    #[test]
    fn remove_adjusts_the_selection() {
        let mut pl = Playlist::new();
        pl.add(make_track("a"));
        pl.add(make_track("b"));
        pl.add(make_track("c"));
        pl.select(2);

        // Removing before the selection shifts it down.
        pl.remove(0).unwrap();
        assert_eq!(pl.current_index(), Some(1));

        // Removing the selected track clears the selection.
        pl.remove(1).unwrap();
        assert!(pl.current_index().is_none());
    }

    #[test]
    fn remove_out_of_range_errors() {
        let mut pl = Playlist::new();
        assert!(pl.remove(0).is_err());
    }

    #[test]
    fn clear_resets_the_selection() {
        let mut pl = Playlist::new();
        pl.add(make_track("a"));
        pl.select(0);
        pl.clear();
        assert!(pl.is_empty());
        assert!(pl.current().is_none());
    }
}
