//! Player state and user options

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Track player state
///
/// Legal transitions: Stop→Play, Play→Pause, Pause→Play, Play→Stop, Pause→Stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayState {
    Stop,
    Pause,
    Play,
}

impl PlayState {
    pub fn can_transition_to(self, next: PlayState) -> bool {
        matches!(
            (self, next),
            (Self::Stop, Self::Play)
                | (Self::Play, Self::Pause)
                | (Self::Pause, Self::Play)
                | (Self::Play, Self::Stop)
                | (Self::Pause, Self::Stop)
        )
    }
}

/// What happens when a track ends on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Stop after the current track
    #[default]
    None,
    /// Repeat the current track
    SingleTrack,
    /// Continue through the playlist, wrapping at the end
    Playlist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShuffleMode {
    #[default]
    None,
    Random,
}

/// User-facing playback options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerOptions {
    pub loop_mode: LoopMode,
    pub shuffle_mode: ShuffleMode,
    /// Never shuffle onto the track that is already playing
    pub shuffle_avoid_current_track: bool,
    pub fade_enabled: bool,
    pub fade_duration_ms: u32,
}

impl PlayerOptions {
    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.fade_duration_ms))
    }
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            loop_mode: LoopMode::None,
            shuffle_mode: ShuffleMode::None,
            shuffle_avoid_current_track: true,
            fade_enabled: true,
            fade_duration_ms: 250,
        }
    }
}

/// Options shared between the application and the players
///
/// Cloning shares the same underlying record. Players read it at every
/// decision point, so changes apply to the next decision without restarting
/// anything.
#[derive(Debug, Clone, Default)]
pub struct SharedOptions(Arc<RwLock<PlayerOptions>>);

impl SharedOptions {
    pub fn new(options: PlayerOptions) -> Self {
        Self(Arc::new(RwLock::new(options)))
    }

    /// Copy of the current options
    pub fn get(&self) -> PlayerOptions {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn replace(&self, options: PlayerOptions) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = options;
    }

    pub fn update(&self, f: impl FnOnce(&mut PlayerOptions)) {
        f(&mut self.0.write().unwrap_or_else(PoisonError::into_inner));
    }
}
