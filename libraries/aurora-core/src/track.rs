use crate::ids::TrackId;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A playable track as seen by the engine
///
/// Owned by the catalog and shared with the engine behind an `Arc`. The only
/// state the engine writes is the "is playing" flag, which UIs observe to
/// highlight the current row.
#[derive(Debug)]
pub struct Track {
    pub id: TrackId,
    pub path: PathBuf,
    pub title: String,
    pub duration: Duration,
    is_playing: AtomicBool,
}

impl Track {
    /// Create a track with a generated ID, titled after its file name
    pub fn new(path: impl Into<PathBuf>, duration: Duration) -> Self {
        let path = path.into();
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Self::with_id(TrackId::generate(), path, title, duration)
    }

    pub fn with_id(
        id: TrackId,
        path: impl Into<PathBuf>,
        title: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            id,
            path: path.into(),
            title: title.into(),
            duration,
            is_playing: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::Acquire)
    }

    pub fn set_playing(&self, playing: bool) {
        self.is_playing.store(playing, Ordering::Release);
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_defaults_to_file_stem() {
        let track = Track::new("/music/Night Drive.flac", Duration::from_secs(1));
        assert_eq!(track.title, "Night Drive");
        assert_eq!(track.path(), Path::new("/music/Night Drive.flac"));
    }

    #[test]
    fn playing_flag_toggles() {
        let track = Track::new("a.wav", Duration::ZERO);
        assert!(!track.is_playing());
        track.set_playing(true);
        assert!(track.is_playing());
        track.set_playing(false);
        assert!(!track.is_playing());
    }

    #[test]
    fn equality_is_by_id() {
        let id = TrackId::new("same");
        let a = Track::with_id(id.clone(), "a.wav", "A", Duration::ZERO);
        let b = Track::with_id(id, "b.wav", "B", Duration::from_secs(3));
        assert_eq!(a, b);
    }
}
