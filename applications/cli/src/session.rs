//! Applying commands to a running player

use crate::command::{Command, HELP};
use aurora_playback::{LoopMode, PlayerEvent, PlaylistPlayer, ShuffleMode};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run one command against `player`, returning what to print
pub fn execute(player: &PlaylistPlayer, command: Command) -> anyhow::Result<(Flow, String)> {
    let track_player = player.player();
    let options = player.options();

    let message = match command {
        Command::Play => {
            if track_player.has_source() {
                player.resume()?;
            } else {
                player.play_next()?;
            }
            "Playing".to_string()
        }
        Command::Pause => {
            player.pause()?;
            "Paused".to_string()
        }
        Command::Stop => {
            player.stop()?;
            "Stopped".to_string()
        }
        Command::Next => {
            player.play_next()?;
            "Next track".to_string()
        }
        Command::Previous => {
            player.play_previous()?;
            "Previous track".to_string()
        }
        Command::Seek(position) => {
            let reached = track_player.seek(position)?;
            format!("Seeked to {}", format_time(reached))
        }
        Command::Volume(level) => {
            track_player.set_volume(level);
            format!("Volume {}", level)
        }
        Command::Mute => {
            track_player.set_muted(true);
            "Muted".to_string()
        }
        Command::Unmute => {
            track_player.set_muted(false);
            "Unmuted".to_string()
        }
        Command::Loop(mode) => {
            options.update(|o| o.loop_mode = mode);
            format!("Loop {}", loop_name(mode))
        }
        Command::Shuffle(on) => {
            options.update(|o| {
                o.shuffle_mode = if on {
                    ShuffleMode::Random
                } else {
                    ShuffleMode::None
                };
            });
            format!("Shuffle {}", if on { "on" } else { "off" })
        }
        Command::Fade(on) => {
            options.update(|o| o.fade_enabled = on);
            format!("Fade {}", if on { "on" } else { "off" })
        }
        Command::Status => status_line(player),
        Command::Help => HELP.to_string(),
        Command::Quit => {
            player.stop()?;
            return Ok((Flow::Quit, "Bye".to_string()));
        }
    };

    Ok((Flow::Continue, message))
}

fn loop_name(mode: LoopMode) -> &'static str {
    match mode {
        LoopMode::None => "none",
        LoopMode::SingleTrack => "track",
        LoopMode::Playlist => "playlist",
    }
}

pub fn format_time(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// One-line summary of what is playing
pub fn status_line(player: &PlaylistPlayer) -> String {
    let track_player = player.player();
    let options = player.options().get();
    let volume = track_player.volume();

    let track = match player.current_track() {
        Some(track) => format!(
            "{} [{} / {}]",
            track.title,
            format_time(track_player.position()),
            format_time(track.duration)
        ),
        None => "No track".to_string(),
    };

    format!(
        "{:?}: {} | vol {}{} | loop {} | shuffle {} | fade {}",
        track_player.state(),
        track,
        volume.level(),
        if volume.is_muted() { " (muted)" } else { "" },
        loop_name(options.loop_mode),
        if options.shuffle_mode == ShuffleMode::Random { "on" } else { "off" },
        if options.fade_enabled { "on" } else { "off" },
    )
}

/// Human-readable line for an event, if it is worth showing
pub fn describe_event(player: &PlaylistPlayer, event: &PlayerEvent) -> Option<String> {
    match event {
        PlayerEvent::TrackChanged { .. } => player
            .current_track()
            .map(|track| format!("Now playing: {}", track.title)),
        PlayerEvent::PlayFailed { track_id, cause } => {
            Some(format!("Cannot play {}: {}", track_id, cause))
        }
        PlayerEvent::SwitchDropped { track_id } => {
            Some(format!("Track {} is not in the playlist", track_id))
        }
        PlayerEvent::DeviceError { message } => Some(format!("Output error: {}", message)),
        PlayerEvent::StateChanged { .. } | PlayerEvent::TrackFinished { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_formatting() {
        assert_eq!(format_time(Duration::ZERO), "0:00");
        assert_eq!(format_time(Duration::from_secs(65)), "1:05");
        assert_eq!(format_time(Duration::from_millis(3_599_900)), "59:59");
    }
}
