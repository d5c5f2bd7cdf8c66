//! Aurora Playback
//!
//! Players that drive one output device from a playlist.
//!
//! - [`TrackPlayer`]: Stop/Play/Pause state machine for a single loaded track,
//!   with fade-deferred pause and stop and click-free track changes
//! - [`PlaylistPlayer`]: active playlist, play history, next-track selection
//!   and loop handling
//! - [`OutputDevice`]: what a hardware backend must provide
//!
//! All device calls run on one device-control thread ([`DeviceContext`]), so
//! public calls return as soon as the work is scheduled. Observe the outcome
//! through [`PlayerEvent`]s.
//!
//! # Example
//!
//! ```rust,no_run
//! use aurora_audio::SymphoniaDecoder;
//! use aurora_core::{Playlist, Track};
//! use aurora_playback::{OutputDevice, PlaylistPlayer, SharedOptions, TrackPlayer};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn run(device: Box<dyn OutputDevice>) -> aurora_playback::Result<()> {
//! let options = SharedOptions::default();
//! let player = TrackPlayer::new(device, Arc::new(SymphoniaDecoder::new()), options.clone())?;
//! let playlist_player = PlaylistPlayer::new(player, options);
//!
//! let track = Arc::new(Track::new("/music/song.flac", Duration::from_secs(200)));
//! let playlist = Arc::new(Playlist::from_tracks("Evening", vec![track.clone()]));
//! playlist_player.play(Some(track), Some(playlist), true, true)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod context;
pub mod error;
pub mod events;
pub mod history;
pub mod output;
pub mod playlist_player;
pub mod selection;
pub mod track_player;
pub mod types;

pub use context::{ContextHandle, DeviceContext};
pub use error::{PlaybackError, Result};
pub use events::{EventBus, PlayerEvent};
pub use history::{PlayHistory, DEFAULT_MAX_HISTORY};
pub use output::{DeviceState, OutputDevice, StopReason, StoppedHandler};
pub use playlist_player::{PlaylistPlayer, REWIND_THRESHOLD};
pub use selection::{next_track, next_track_with};
pub use track_player::TrackPlayer;
pub use types::{LoopMode, PlayState, PlayerOptions, SharedOptions, ShuffleMode};
