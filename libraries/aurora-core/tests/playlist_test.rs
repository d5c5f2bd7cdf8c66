use aurora_core::{Playlist, PlaylistChange, Track};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn create_test_track(name: &str) -> Arc<Track> {
    Arc::new(Track::new(format!("/music/{name}.flac"), Duration::from_secs(180)))
}

#[test]
fn index_of_follows_order() {
    let a = create_test_track("a");
    let b = create_test_track("b");
    let c = create_test_track("c");
    let playlist = Playlist::from_tracks("test", vec![a.clone(), b.clone(), c.clone()]);

    assert_eq!(playlist.len(), 3);
    assert_eq!(playlist.index_of(&a.id), Some(0));
    assert_eq!(playlist.index_of(&c.id), Some(2));
    assert_eq!(playlist.get(1).map(|t| t.id.clone()), Some(b.id.clone()));
}

#[test]
fn missing_track_is_not_a_member() {
    let playlist = Playlist::from_tracks("test", vec![create_test_track("a")]);
    let stranger = create_test_track("stranger");

    assert!(!playlist.contains(&stranger.id));
    assert_eq!(playlist.index_of(&stranger.id), None);
}

#[test]
fn subscribers_see_every_change() {
    let playlist = Playlist::new("test");
    let changes = playlist.subscribe();

    let a = create_test_track("a");
    let b = create_test_track("b");
    playlist.push(a.clone());
    playlist.insert(0, b.clone());
    assert!(playlist.move_track(0, 1));
    assert!(playlist.remove(0).is_some());
    playlist.clear();

    let received: Vec<_> = changes.try_iter().collect();
    assert_eq!(
        received,
        vec![
            PlaylistChange::Added {
                index: 0,
                track_id: a.id.clone()
            },
            PlaylistChange::Added {
                index: 0,
                track_id: b.id.clone()
            },
            PlaylistChange::Moved { from: 0, to: 1 },
            PlaylistChange::Removed {
                index: 0,
                track_id: a.id.clone()
            },
            PlaylistChange::Cleared,
        ]
    );
}

#[test]
fn dropped_subscriber_is_pruned() {
    let playlist = Playlist::new("test");
    drop(playlist.subscribe());
    let live = playlist.subscribe();

    playlist.push(create_test_track("a"));
    assert_eq!(live.try_iter().count(), 1);
}

#[test]
fn out_of_range_edits_are_ignored() {
    let playlist = Playlist::from_tracks("test", vec![create_test_track("a")]);
    let changes = playlist.subscribe();

    assert!(playlist.remove(5).is_none());
    assert!(!playlist.move_track(0, 3));
    assert_eq!(changes.try_iter().count(), 0);
    assert_eq!(playlist.len(), 1);
}

proptest! {
    #[test]
    fn index_of_matches_position(count in 1usize..20, pick in 0usize..20) {
        let tracks: Vec<_> = (0..count).map(|i| create_test_track(&i.to_string())).collect();
        let playlist = Playlist::from_tracks("prop", tracks.clone());
        let pick = pick % count;
        prop_assert_eq!(playlist.index_of(&tracks[pick].id), Some(pick));
    }
}
