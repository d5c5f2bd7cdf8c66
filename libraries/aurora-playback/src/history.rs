//! Play history with back/forward navigation
//!
//! Works like a browser history: moving back leaves later entries reachable
//! with "forward" until a new track is pushed, which discards them.

use aurora_core::Track;
use std::collections::VecDeque;
use std::sync::Arc;

pub const DEFAULT_MAX_HISTORY: usize = 50;

#[derive(Debug, Clone)]
pub struct PlayHistory {
    /// Oldest first
    tracks: VecDeque<Arc<Track>>,
    /// Index of the entry currently playing; `None` only when empty
    cursor: Option<usize>,
    max_size: usize,
}

impl PlayHistory {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            tracks: VecDeque::with_capacity(max_size),
            cursor: None,
            max_size,
        }
    }

    /// Append `track` after the cursor and move onto it
    ///
    /// Entries ahead of the cursor are dropped, and the oldest entries are
    /// evicted once the history is over its limit.
    pub fn push(&mut self, track: Arc<Track>) {
        if let Some(cursor) = self.cursor {
            self.tracks.truncate(cursor + 1);
        }
        self.tracks.push_back(track);
        while self.tracks.len() > self.max_size {
            self.tracks.pop_front();
        }
        self.cursor = Some(self.tracks.len() - 1);
    }

    pub fn current(&self) -> Option<&Arc<Track>> {
        self.cursor.and_then(|i| self.tracks.get(i))
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor.is_some_and(|i| i > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor.is_some_and(|i| i + 1 < self.tracks.len())
    }

    /// Step the cursor back and return the entry it lands on
    pub fn back(&mut self) -> Option<Arc<Track>> {
        if !self.can_go_back() {
            return None;
        }
        let cursor = self.cursor? - 1;
        self.cursor = Some(cursor);
        self.tracks.get(cursor).cloned()
    }

    /// Step the cursor forward and return the entry it lands on
    pub fn forward(&mut self) -> Option<Arc<Track>> {
        if !self.can_go_forward() {
            return None;
        }
        let cursor = self.cursor? + 1;
        self.cursor = Some(cursor);
        self.tracks.get(cursor).cloned()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.cursor = None;
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// All entries, oldest first
    pub fn tracks(&self) -> impl Iterator<Item = &Arc<Track>> {
        self.tracks.iter()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the limit, evicting from the front if needed
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size.max(1);
        let excess = self.tracks.len().saturating_sub(self.max_size);
        if excess == 0 {
            return;
        }
        self.tracks.drain(..excess);
        // an evicted cursor lands on the oldest surviving entry
        self.cursor = self.cursor.map(|i| i.saturating_sub(excess));
    }
}

impl Default for PlayHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}
