//! Player events
//!
//! Events fan out to any number of subscribers over unbounded channels, so
//! emitting never blocks the device-control thread. A subscriber that drops
//! its receiver is pruned on the next emit.

use crate::types::PlayState;
use aurora_core::TrackId;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerEvent {
    StateChanged {
        state: PlayState,
    },

    /// A new track's pipeline is attached to the device
    TrackChanged {
        track_id: TrackId,
        previous_track_id: Option<TrackId>,
    },

    /// The current track played to its end without a stop request
    TrackFinished {
        track_id: Option<TrackId>,
    },

    /// A track could not be decoded; the player stays stopped
    PlayFailed {
        track_id: TrackId,
        cause: String,
    },

    /// A switch was dropped because the track is not in the playlist
    SwitchDropped {
        track_id: TrackId,
    },

    /// The output device reported a failure (it has also stopped)
    DeviceError {
        message: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<PlayerEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn emit(&self, event: PlayerEvent) {
        tracing::trace!(?event, "Player event");
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_events() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.emit(PlayerEvent::StateChanged {
            state: PlayState::Play,
        });

        assert_eq!(
            a.try_recv().unwrap(),
            PlayerEvent::StateChanged {
                state: PlayState::Play
            }
        );
        assert!(b.try_recv().is_ok());
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let bus = EventBus::new();
        drop(bus.subscribe());
        bus.emit(PlayerEvent::TrackFinished { track_id: None });
        assert!(bus.subscribers.lock().unwrap().is_empty());
    }
}
