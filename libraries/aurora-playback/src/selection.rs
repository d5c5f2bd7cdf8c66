//! Next-track selection
//!
//! Sequential mode walks the playlist and wraps. Random mode draws uniformly,
//! optionally redrawing until it lands somewhere other than the current track.

use crate::types::{LoopMode, PlayerOptions, ShuffleMode};
use aurora_core::{Playlist, Track};
use rand::Rng;
use std::sync::Arc;

/// Pick the track to play after `current`
///
/// Returns `None` only when there is nothing to play at all.
pub fn next_track(
    current: Option<&Arc<Track>>,
    playlist: &Playlist,
    options: &PlayerOptions,
) -> Option<Arc<Track>> {
    next_track_with(current, playlist, options, &mut rand::thread_rng())
}

/// [`next_track`] with an explicit random source
pub fn next_track_with<R: Rng + ?Sized>(
    current: Option<&Arc<Track>>,
    playlist: &Playlist,
    options: &PlayerOptions,
    rng: &mut R,
) -> Option<Arc<Track>> {
    if options.loop_mode == LoopMode::SingleTrack {
        if let Some(current) = current {
            return Some(current.clone());
        }
    }

    let index = current.and_then(|t| playlist.index_of(&t.id));
    match options.shuffle_mode {
        ShuffleMode::None => {
            if playlist.is_empty() {
                return None;
            }
            // a track outside the playlist restarts it from the top
            let next = index.map_or(0, |i| (i + 1) % playlist.len());
            playlist.get(next)
        }
        ShuffleMode::Random => {
            let count = playlist.len();
            if count <= 1 {
                return current.cloned().or_else(|| playlist.get(0));
            }

            let avoid = options.shuffle_avoid_current_track;
            if avoid && count == 2 {
                if let Some(i) = index {
                    return playlist.get(1 - i);
                }
            }

            let mut draw = rng.gen_range(0..count);
            if avoid {
                while Some(draw) == index {
                    draw = rng.gen_range(0..count);
                }
            }
            playlist.get(draw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn create_test_track(name: &str) -> Arc<Track> {
        Arc::new(Track::new(format!("/music/{}.mp3", name), Duration::from_secs(180)))
    }

    fn playlist_of(names: &[&str]) -> (Playlist, Vec<Arc<Track>>) {
        let tracks: Vec<_> = names.iter().map(|n| create_test_track(n)).collect();
        (Playlist::from_tracks("test", tracks.clone()), tracks)
    }

    fn options(loop_mode: LoopMode, shuffle_mode: ShuffleMode, avoid: bool) -> PlayerOptions {
        PlayerOptions {
            loop_mode,
            shuffle_mode,
            shuffle_avoid_current_track: avoid,
            ..PlayerOptions::default()
        }
    }

    #[test]
    fn sequential_advances() {
        let (playlist, tracks) = playlist_of(&["x", "y", "z"]);
        let opts = options(LoopMode::Playlist, ShuffleMode::None, true);
        let next = next_track(Some(&tracks[0]), &playlist, &opts).unwrap();
        assert_eq!(next.id, tracks[1].id);
    }

    #[test]
    fn sequential_wraps_to_first() {
        let (playlist, tracks) = playlist_of(&["x", "y", "z"]);
        let opts = options(LoopMode::Playlist, ShuffleMode::None, true);
        let next = next_track(Some(&tracks[2]), &playlist, &opts).unwrap();
        assert_eq!(next.id, tracks[0].id);
    }

    #[test]
    fn single_track_loop_repeats_current() {
        let (playlist, tracks) = playlist_of(&["x", "y", "z"]);
        for shuffle in [ShuffleMode::None, ShuffleMode::Random] {
            let opts = options(LoopMode::SingleTrack, shuffle, true);
            let next = next_track(Some(&tracks[1]), &playlist, &opts).unwrap();
            assert_eq!(next.id, tracks[1].id);
        }
    }

    #[test]
    fn shuffle_with_two_tracks_is_deterministic() {
        let (playlist, tracks) = playlist_of(&["x", "y"]);
        let opts = options(LoopMode::Playlist, ShuffleMode::Random, true);
        for _ in 0..100 {
            let next = next_track(Some(&tracks[0]), &playlist, &opts).unwrap();
            assert_eq!(next.id, tracks[1].id);
        }
    }

    #[test]
    fn shuffle_avoids_current_track() {
        let (playlist, tracks) = playlist_of(&["a", "b", "c", "d"]);
        let opts = options(LoopMode::Playlist, ShuffleMode::Random, true);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let next = next_track_with(Some(&tracks[2]), &playlist, &opts, &mut rng).unwrap();
            assert_ne!(next.id, tracks[2].id);
        }
    }

    #[test]
    fn shuffle_without_avoidance_can_repeat() {
        let (playlist, tracks) = playlist_of(&["a", "b", "c"]);
        let opts = options(LoopMode::Playlist, ShuffleMode::Random, false);
        let mut rng = StdRng::seed_from_u64(1);
        let repeated = (0..300).any(|_| {
            next_track_with(Some(&tracks[0]), &playlist, &opts, &mut rng)
                .is_some_and(|t| t.id == tracks[0].id)
        });
        assert!(repeated);
    }

    #[test]
    fn shuffle_of_single_track_returns_current() {
        let (playlist, tracks) = playlist_of(&["only"]);
        let opts = options(LoopMode::Playlist, ShuffleMode::Random, true);
        let next = next_track(Some(&tracks[0]), &playlist, &opts).unwrap();
        assert_eq!(next.id, tracks[0].id);
    }

    #[test]
    fn empty_playlist_has_no_next_in_sequence() {
        let (playlist, tracks) = playlist_of(&[]);
        assert!(tracks.is_empty());
        let opts = options(LoopMode::Playlist, ShuffleMode::None, true);
        assert!(next_track(None, &playlist, &opts).is_none());
    }

    #[test]
    fn track_outside_playlist_restarts_sequence() {
        let (playlist, tracks) = playlist_of(&["x", "y"]);
        let stranger = create_test_track("stranger");
        let opts = options(LoopMode::Playlist, ShuffleMode::None, true);
        let next = next_track(Some(&stranger), &playlist, &opts).unwrap();
        assert_eq!(next.id, tracks[0].id);
    }
}
