//! Playlist session on top of a [`TrackPlayer`]
//!
//! Tracks the active playlist and the play history, picks the next track and
//! reacts to tracks ending on their own according to the loop mode.

use crate::error::Result;
use crate::events::PlayerEvent;
use crate::history::{PlayHistory, DEFAULT_MAX_HISTORY};
use crate::selection::next_track;
use crate::track_player::TrackPlayer;
use crate::types::{LoopMode, SharedOptions};
use aurora_core::{Playlist, Track};
use crossbeam_channel::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::Duration;

/// Past this point "previous" restarts the current track instead
pub const REWIND_THRESHOLD: Duration = Duration::from_secs(3);

struct Session {
    current: Option<Arc<Track>>,
    playlist: Option<Arc<Playlist>>,
    history: PlayHistory,
}

struct PlaylistInner {
    player: TrackPlayer,
    options: SharedOptions,
    session: Mutex<Session>,
}

pub struct PlaylistPlayer {
    inner: Arc<PlaylistInner>,
}

impl PlaylistPlayer {
    pub fn new(player: TrackPlayer, options: SharedOptions) -> Self {
        Self::with_history_limit(player, options, DEFAULT_MAX_HISTORY)
    }

    pub fn with_history_limit(player: TrackPlayer, options: SharedOptions, limit: usize) -> Self {
        let events = player.subscribe();
        let inner = Arc::new(PlaylistInner {
            player,
            options,
            session: Mutex::new(Session {
                current: None,
                playlist: None,
                history: PlayHistory::new(limit),
            }),
        });

        spawn_finish_listener(Arc::downgrade(&inner), events);
        Self { inner }
    }

    /// Make `track` current, loading it if it belongs to the playlist
    ///
    /// `playlist` replaces the active playlist when given. Switching to the
    /// track that is already current restarts it instead. A track outside the
    /// playlist is not loaded; a [`PlayerEvent::SwitchDropped`] is raised.
    ///
    /// Returns whether the track was handed to the track player.
    pub fn switch_track(
        &self,
        track: Arc<Track>,
        playlist: Option<Arc<Playlist>>,
        clear_history: bool,
        update_history: bool,
    ) -> Result<bool> {
        self.inner
            .switch_track(track, playlist, clear_history, update_history)
    }

    /// Optionally switch to `track`, then start playback
    pub fn play(
        &self,
        track: Option<Arc<Track>>,
        playlist: Option<Arc<Playlist>>,
        clear_history: bool,
        update_history: bool,
    ) -> Result<()> {
        self.inner
            .play(track, playlist, clear_history, update_history)
    }

    /// Resume whatever is loaded
    pub fn resume(&self) -> Result<()> {
        self.inner.player.play()
    }

    pub fn pause(&self) -> Result<()> {
        self.inner.player.pause(true)
    }

    pub fn stop(&self) -> Result<()> {
        self.inner.player.stop(true, true)
    }

    /// Go back one history entry, or restart the current track
    pub fn play_previous(&self) -> Result<()> {
        self.inner.play_previous()
    }

    /// Go forward in history, or on to a newly selected track
    pub fn play_next(&self) -> Result<()> {
        self.inner.play_next()
    }

    pub fn current_track(&self) -> Option<Arc<Track>> {
        self.inner.lock().current.clone()
    }

    pub fn current_playlist(&self) -> Option<Arc<Playlist>> {
        self.inner.lock().playlist.clone()
    }

    /// Snapshot of the play history
    pub fn history(&self) -> PlayHistory {
        self.inner.lock().history.clone()
    }

    pub fn options(&self) -> &SharedOptions {
        &self.inner.options
    }

    pub fn player(&self) -> &TrackPlayer {
        &self.inner.player
    }

    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.inner.player.subscribe()
    }
}

fn spawn_finish_listener(session: Weak<PlaylistInner>, events: Receiver<PlayerEvent>) {
    let spawned = thread::Builder::new()
        .name("aurora-playlist-events".into())
        .spawn(move || {
            // ends when the track player and its event bus are gone
            while let Ok(event) = events.recv() {
                if let PlayerEvent::TrackFinished { .. } = event {
                    let Some(inner) = session.upgrade() else {
                        break;
                    };
                    if let Err(e) = inner.on_track_finished() {
                        tracing::warn!("Failed to continue after track end: {}", e);
                    }
                }
            }
        });

    if let Err(e) = spawned {
        tracing::error!("Failed to spawn playlist event thread: {}", e);
    }
}

impl PlaylistInner {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn switch_track(
        &self,
        track: Arc<Track>,
        playlist: Option<Arc<Playlist>>,
        clear_history: bool,
        update_history: bool,
    ) -> Result<bool> {
        let mut session = self.lock();
        if let Some(playlist) = playlist {
            session.playlist = Some(playlist);
        }

        let is_current = session.current.as_ref().is_some_and(|c| c.id == track.id);
        if is_current && self.player.has_source() {
            self.player.seek(Duration::ZERO)?;
            return Ok(false);
        }

        if let Some(previous) = session.current.replace(track.clone()) {
            previous.set_playing(false);
        }
        track.set_playing(true);

        if clear_history {
            session.history.clear();
        }
        if update_history {
            session.history.push(track.clone());
        }

        let member = session
            .playlist
            .as_ref()
            .is_some_and(|p| p.contains(&track.id));
        if !member {
            tracing::warn!(track = %track.id, "Track is not in the active playlist, switch dropped");
            self.player.events().emit(PlayerEvent::SwitchDropped {
                track_id: track.id.clone(),
            });
            return Ok(false);
        }

        tracing::debug!(track = %track.title, "Switching track");
        self.player.change_source(track)?;
        Ok(true)
    }

    fn play(
        &self,
        track: Option<Arc<Track>>,
        playlist: Option<Arc<Playlist>>,
        clear_history: bool,
        update_history: bool,
    ) -> Result<()> {
        if let Some(track) = track {
            self.switch_track(track, playlist, clear_history, update_history)?;
            // the load failed and a play-failed event was raised
            if !self.player.has_source() {
                return Ok(());
            }
        }
        self.player.play()
    }

    fn play_previous(&self) -> Result<()> {
        let previous = {
            let mut session = self.lock();
            let rewind = self.player.position() > REWIND_THRESHOLD
                || !session.history.can_go_back();
            if rewind {
                None
            } else {
                session.history.back()
            }
        };

        match previous {
            Some(track) => self.play(Some(track), None, false, false),
            None => {
                if self.player.has_source() {
                    self.player.seek(Duration::ZERO)?;
                }
                Ok(())
            }
        }
    }

    fn play_next(&self) -> Result<()> {
        let (track, update_history) = {
            let mut session = self.lock();
            if let Some(track) = session.history.forward() {
                (Some(track), false)
            } else {
                let options = self.options.get();
                let next = session
                    .playlist
                    .as_ref()
                    .and_then(|p| next_track(session.current.as_ref(), p, &options));
                (next, true)
            }
        };

        match track {
            Some(track) => self.play(Some(track), None, false, update_history),
            None => {
                tracing::debug!("No next track to play");
                Ok(())
            }
        }
    }

    fn on_track_finished(&self) -> Result<()> {
        if self.options.get().loop_mode == LoopMode::None {
            return Ok(());
        }
        self.play_next()
    }
}
