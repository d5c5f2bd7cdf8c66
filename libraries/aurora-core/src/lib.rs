//! Aurora Core
//!
//! Domain types shared by every Aurora crate.
//!
//! The playback engine never owns the catalog. It borrows [`Track`] references
//! (always behind an `Arc`) and holds a non-owning handle to the currently
//! selected [`Playlist`].
//!
//! # Example
//!
//! ```rust
//! use aurora_core::{Playlist, Track};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let intro = Arc::new(Track::new("/music/intro.flac", Duration::from_secs(95)));
//! let outro = Arc::new(Track::new("/music/outro.flac", Duration::from_secs(210)));
//!
//! let playlist = Playlist::new("Evening");
//! playlist.push(intro.clone());
//! playlist.push(outro.clone());
//!
//! assert_eq!(playlist.index_of(&outro.id), Some(1));
//! assert!(playlist.contains(&intro.id));
//! ```

#![forbid(unsafe_code)]

mod ids;
mod playlist;
mod track;

pub use ids::{PlaylistId, TrackId};
pub use playlist::{Playlist, PlaylistChange};
pub use track::Track;
