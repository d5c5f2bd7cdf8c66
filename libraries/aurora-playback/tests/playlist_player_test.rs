//! Playlist sessions: history navigation, loop modes and next-track policy

mod common;

use aurora_core::{Playlist, Track};
use aurora_playback::{
    LoopMode, PlayState, PlayerEvent, PlayerOptions, PlaylistPlayer, ShuffleMode,
};
use common::*;
use std::sync::Arc;
use std::time::Duration;

struct Session {
    player: PlaylistPlayer,
    device: MockHandle,
    events: crossbeam_channel::Receiver<PlayerEvent>,
    playlist: Arc<Playlist>,
    tracks: Vec<Arc<Track>>,
}

fn session(options: PlayerOptions, names: &[&str], duration_ms: u64) -> Session {
    let rig = rig(options);
    let tracks: Vec<_> = names.iter().map(|n| track(n, duration_ms)).collect();
    for t in &tracks {
        rig.decoder.register(t);
    }
    let playlist = Arc::new(Playlist::from_tracks("test", tracks.clone()));
    Session {
        player: PlaylistPlayer::new(rig.player, rig.options),
        device: rig.device,
        events: rig.events,
        playlist,
        tracks,
    }
}

fn current_id(session: &Session) -> Option<String> {
    session
        .player
        .current_track()
        .map(|t| t.id.as_str().to_string())
}

fn loaded_id(session: &Session) -> Option<String> {
    session
        .player
        .player()
        .current_track()
        .map(|t| t.id.as_str().to_string())
}

fn start(session: &Session, index: usize) {
    session
        .player
        .play(
            Some(session.tracks[index].clone()),
            Some(session.playlist.clone()),
            true,
            true,
        )
        .unwrap();
    settle(session.player.player());
}

fn is_track_changed_to(track: &Arc<Track>) -> impl Fn(&PlayerEvent) -> bool + '_ {
    move |event| matches!(event, PlayerEvent::TrackChanged { track_id, .. } if *track_id == track.id)
}

#[test]
fn test_play_loads_and_starts() {
    let s = session(no_fade(), &["x", "y", "z"], 1000);
    start(&s, 0);

    assert_eq!(s.player.player().state(), PlayState::Play);
    assert_eq!(loaded_id(&s).as_deref(), Some("x"));
    assert!(s.tracks[0].is_playing());
    assert_eq!(s.player.history().len(), 1);
    assert_eq!(
        s.player.current_playlist().map(|p| p.id.clone()),
        Some(s.playlist.id.clone())
    );
}

#[test]
fn test_play_next_walks_the_playlist() {
    let s = session(no_fade(), &["x", "y", "z"], 1000);
    start(&s, 0);

    s.player.play_next().unwrap();
    settle(s.player.player());
    assert_eq!(loaded_id(&s).as_deref(), Some("y"));
    assert!(!s.tracks[0].is_playing());
    assert!(s.tracks[1].is_playing());

    s.player.play_next().unwrap();
    s.player.play_next().unwrap();
    settle(s.player.player());
    assert_eq!(current_id(&s).as_deref(), Some("x"), "wraps to the start");
    assert_eq!(s.player.history().len(), 4);
}

#[test]
fn test_previous_navigates_history_then_forward_replays() {
    let s = session(no_fade(), &["x", "y", "z"], 1000);
    start(&s, 0);
    s.player.play_next().unwrap();
    settle(s.player.player());

    s.player.play_previous().unwrap();
    settle(s.player.player());
    assert_eq!(loaded_id(&s).as_deref(), Some("x"));
    assert_eq!(s.player.history().cursor(), Some(0));
    assert_eq!(s.player.history().len(), 2, "going back keeps the history");

    s.player.play_next().unwrap();
    settle(s.player.player());
    assert_eq!(loaded_id(&s).as_deref(), Some("y"));
    assert_eq!(s.player.history().len(), 2, "forward does not append");
}

#[test]
fn test_previous_past_threshold_restarts_track() {
    let s = session(no_fade(), &["x", "y"], 10_000);
    start(&s, 0);
    s.player.play_next().unwrap();
    settle(s.player.player());

    s.device.pump(3500);
    assert!(s.player.player().position() > Duration::from_secs(3));

    s.player.play_previous().unwrap();
    settle(s.player.player());
    assert_eq!(loaded_id(&s).as_deref(), Some("y"));
    assert_eq!(s.player.player().position(), Duration::ZERO);
}

#[test]
fn test_previous_without_history_restarts_track() {
    let s = session(no_fade(), &["x", "y"], 10_000);
    start(&s, 1);
    s.device.pump(500);

    s.player.play_previous().unwrap();
    settle(s.player.player());
    assert_eq!(loaded_id(&s).as_deref(), Some("y"));
    assert_eq!(s.player.player().position(), Duration::ZERO);
}

#[test]
fn test_switch_to_current_track_restarts_it() {
    let s = session(no_fade(), &["x", "y"], 10_000);
    start(&s, 0);
    s.device.pump(700);

    let switched = s
        .player
        .switch_track(s.tracks[0].clone(), None, false, true)
        .unwrap();
    assert!(!switched);
    assert_eq!(s.player.player().position(), Duration::ZERO);
    assert_eq!(s.player.history().len(), 1);
}

#[test]
fn test_switch_outside_playlist_is_dropped() {
    let s = session(no_fade(), &["x", "y"], 1000);
    let stranger = track("stranger", 1000);

    s.player
        .play(Some(stranger.clone()), Some(s.playlist.clone()), false, true)
        .unwrap();
    settle(s.player.player());

    assert!(loaded_id(&s).is_none());
    assert_eq!(s.player.player().state(), PlayState::Stop);
    assert!(drain_events(&s.events).contains(&PlayerEvent::SwitchDropped {
        track_id: stranger.id.clone()
    }));
}

#[test]
fn test_loop_playlist_continues_after_natural_end() {
    let options = PlayerOptions {
        loop_mode: LoopMode::Playlist,
        ..no_fade()
    };
    let s = session(options, &["x", "y"], 50);
    start(&s, 0);

    s.device.drain();
    wait_for(&s.events, is_track_changed_to(&s.tracks[1]));
    wait_for(&s.events, |e| {
        *e == PlayerEvent::StateChanged {
            state: PlayState::Play,
        }
    });

    assert_eq!(loaded_id(&s).as_deref(), Some("y"));
    assert_eq!(s.player.history().len(), 2);
}

#[test]
fn test_loop_single_track_repeats() {
    let options = PlayerOptions {
        loop_mode: LoopMode::SingleTrack,
        ..no_fade()
    };
    let s = session(options, &["x", "y"], 50);
    start(&s, 0);

    s.device.drain();
    wait_for(&s.events, |e| matches!(e, PlayerEvent::TrackFinished { .. }));
    let seen = wait_for(&s.events, |e| {
        *e == PlayerEvent::StateChanged {
            state: PlayState::Play,
        }
    });

    assert!(
        !seen.iter().any(|e| matches!(e, PlayerEvent::TrackChanged { .. })),
        "the same pipeline is reused"
    );
    assert_eq!(loaded_id(&s).as_deref(), Some("x"));
    assert_eq!(s.device.pump(10).len(), 20, "plays again from the top");
}

#[test]
fn test_no_loop_stops_after_track() {
    let s = session(no_fade(), &["x", "y"], 50);
    start(&s, 0);

    s.device.drain();
    wait_for(&s.events, |e| matches!(e, PlayerEvent::TrackFinished { .. }));
    std::thread::sleep(Duration::from_millis(100));
    settle(s.player.player());

    assert_eq!(s.player.player().state(), PlayState::Stop);
    assert_eq!(loaded_id(&s).as_deref(), Some("x"));
}

#[test]
fn test_shuffle_with_two_tracks_alternates() {
    let options = PlayerOptions {
        shuffle_mode: ShuffleMode::Random,
        shuffle_avoid_current_track: true,
        ..no_fade()
    };
    let s = session(options, &["x", "y"], 1000);
    start(&s, 0);

    for expected in ["y", "x", "y", "x"] {
        s.player.play_next().unwrap();
        settle(s.player.player());
        assert_eq!(loaded_id(&s).as_deref(), Some(expected));
    }
}

#[test]
fn test_options_change_applies_to_next_decision() {
    let s = session(no_fade(), &["x", "y", "z"], 50);
    start(&s, 0);

    s.player
        .options()
        .update(|o| o.loop_mode = LoopMode::Playlist);
    s.device.drain();
    wait_for(&s.events, is_track_changed_to(&s.tracks[1]));
}
