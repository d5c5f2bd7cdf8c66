//! Ordered track collection with change notification

use crate::ids::{PlaylistId, TrackId};
use crate::track::Track;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Content change published to playlist subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistChange {
    Added { index: usize, track_id: TrackId },
    Removed { index: usize, track_id: TrackId },
    Moved { from: usize, to: usize },
    Cleared,
}

/// An ordered, index-addressable sequence of tracks
///
/// Interior mutability lets the catalog edit a playlist while the engine holds
/// an `Arc` to it. The engine itself only reads.
#[derive(Debug)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    tracks: RwLock<Vec<Arc<Track>>>,
    subscribers: Mutex<Vec<Sender<PlaylistChange>>>,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PlaylistId::generate(),
            name: name.into(),
            tracks: RwLock::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Build a playlist from an existing list of tracks
    pub fn from_tracks(name: impl Into<String>, tracks: Vec<Arc<Track>>) -> Self {
        let playlist = Self::new(name);
        *playlist.tracks.write().unwrap_or_else(PoisonError::into_inner) = tracks;
        playlist
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Arc<Track>> {
        self.read().get(index).cloned()
    }

    pub fn index_of(&self, id: &TrackId) -> Option<usize> {
        self.read().iter().position(|t| &t.id == id)
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.index_of(id).is_some()
    }

    /// Snapshot of the current contents
    pub fn tracks(&self) -> Vec<Arc<Track>> {
        self.read().clone()
    }

    pub fn push(&self, track: Arc<Track>) {
        let change = {
            let mut tracks = self.write();
            let track_id = track.id.clone();
            tracks.push(track);
            PlaylistChange::Added {
                index: tracks.len() - 1,
                track_id,
            }
        };
        self.publish(change);
    }

    /// Insert at `index`, clamped to the end of the list
    pub fn insert(&self, index: usize, track: Arc<Track>) {
        let change = {
            let mut tracks = self.write();
            let index = index.min(tracks.len());
            let track_id = track.id.clone();
            tracks.insert(index, track);
            PlaylistChange::Added { index, track_id }
        };
        self.publish(change);
    }

    pub fn remove(&self, index: usize) -> Option<Arc<Track>> {
        let removed = {
            let mut tracks = self.write();
            (index < tracks.len()).then(|| tracks.remove(index))
        };
        if let Some(track) = &removed {
            self.publish(PlaylistChange::Removed {
                index,
                track_id: track.id.clone(),
            });
        }
        removed
    }

    /// Move a track from one position to another; out-of-range indices are ignored
    pub fn move_track(&self, from: usize, to: usize) -> bool {
        {
            let mut tracks = self.write();
            if from >= tracks.len() || to >= tracks.len() {
                return false;
            }
            let track = tracks.remove(from);
            tracks.insert(to, track);
        }
        self.publish(PlaylistChange::Moved { from, to });
        true
    }

    pub fn clear(&self) {
        self.write().clear();
        self.publish(PlaylistChange::Cleared);
    }

    /// Subscribe to content changes
    ///
    /// Dropping the receiver unsubscribes on the next change.
    pub fn subscribe(&self) -> Receiver<PlaylistChange> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    fn publish(&self, change: PlaylistChange) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        tracing::trace!(playlist = %self.id, ?change, "Playlist changed");
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Track>>> {
        self.tracks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Track>>> {
        self.tracks.write().unwrap_or_else(PoisonError::into_inner)
    }
}
