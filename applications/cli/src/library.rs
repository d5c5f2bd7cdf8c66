//! Turning a music folder into a playlist

use aurora_audio::{DecodedSource, LocalSource};
use aurora_core::{Playlist, Track};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "aac", "m4a"];

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Audio files under `folder`, sorted by path
pub fn scan_folder(folder: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        anyhow::bail!("{} is not a directory", folder.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_audio_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

/// Probe each file and build a playlist named after the folder
///
/// Files that cannot be opened are skipped with a warning.
pub fn load_playlist(folder: &Path) -> anyhow::Result<Playlist> {
    let name = folder
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("Library")
        .to_string();

    let tracks: Vec<Arc<Track>> = scan_folder(folder)?
        .into_iter()
        .filter_map(|path| match LocalSource::open(&path, None, Duration::ZERO) {
            Ok(source) => Some(Arc::new(Track::new(path, source.duration()))),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                None
            }
        })
        .collect();

    tracing::info!(playlist = %name, tracks = tracks.len(), "Loaded folder");
    Ok(Playlist::from_tracks(name, tracks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_extensions() {
        assert!(is_audio_file(Path::new("a/b.FLAC")));
        assert!(is_audio_file(Path::new("song.mp3")));
        assert!(!is_audio_file(Path::new("cover.jpg")));
        assert!(!is_audio_file(Path::new("README")));
    }
}
