//! Interactive commands read from stdin

use aurora_playback::LoopMode;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  play | pause | stop        transport
  next | prev                move through the playlist
  seek <secs>                jump within the current track
  vol <0-100> | mute | unmute
  loop <none|track|playlist>
  shuffle <on|off>
  fade <on|off>
  status | help | quit";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Seek(Duration),
    Volume(u8),
    Mute,
    Unmute,
    Loop(LoopMode),
    Shuffle(bool),
    Fade(bool),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (try 'help')")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("Invalid argument for '{command}': {value}")]
    InvalidArgument { command: &'static str, value: String },
}

fn on_off(command: &'static str, value: &str) -> Result<bool, CommandError> {
    match value {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(CommandError::InvalidArgument {
            command,
            value: value.to_string(),
        }),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default().to_lowercase();
        let arg = words.next();

        let require = |command: &'static str| arg.ok_or(CommandError::MissingArgument(command));
        let invalid = |command: &'static str, value: &str| CommandError::InvalidArgument {
            command,
            value: value.to_string(),
        };

        match name.as_str() {
            "play" | "p" => Ok(Self::Play),
            "pause" => Ok(Self::Pause),
            "stop" => Ok(Self::Stop),
            "next" | "n" => Ok(Self::Next),
            "prev" | "previous" => Ok(Self::Previous),
            "seek" => {
                let value = require("seek")?;
                let seconds: f64 = value.parse().map_err(|_| invalid("seek", value))?;
                if !seconds.is_finite() || seconds < 0.0 {
                    return Err(invalid("seek", value));
                }
                Ok(Self::Seek(Duration::from_secs_f64(seconds)))
            }
            "vol" | "volume" => {
                let value = require("vol")?;
                match value.parse::<u8>() {
                    Ok(level) if level <= 100 => Ok(Self::Volume(level)),
                    _ => Err(invalid("vol", value)),
                }
            }
            "mute" => Ok(Self::Mute),
            "unmute" => Ok(Self::Unmute),
            "loop" => {
                let value = require("loop")?;
                let mode = match value {
                    "none" | "off" => LoopMode::None,
                    "track" | "one" => LoopMode::SingleTrack,
                    "playlist" | "all" => LoopMode::Playlist,
                    _ => return Err(invalid("loop", value)),
                };
                Ok(Self::Loop(mode))
            }
            "shuffle" => Ok(Self::Shuffle(on_off("shuffle", require("shuffle")?)?)),
            "fade" => Ok(Self::Fade(on_off("fade", require("fade")?)?)),
            "status" | "s" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            _ => Err(CommandError::Unknown(name)),
        }
    }
}
