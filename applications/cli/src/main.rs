//! Aurora - terminal folder player
use anyhow::Context;
use aurora_audio::SymphoniaDecoder;
use aurora_audio_desktop::{list_available_backends, list_devices, CpalOutputDevice};
use aurora_cli::session::{describe_event, execute, Flow};
use aurora_cli::{library, AppConfig, Command};
use aurora_playback::{PlaylistPlayer, SharedOptions, TrackPlayer};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "aurora")]
#[command(about = "Play a music folder from the terminal", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./aurora.toml when present)
    #[arg(short, long, env = "AURORA_CONFIG")]
    config: Option<PathBuf>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Folder to play
    #[arg(required_unless_present_any = ["list_devices", "print_config"])]
    folder: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "aurora=info,aurora_cli=info,aurora_playback=info,aurora_audio=info,aurora_audio_desktop=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    if cli.list_devices {
        return print_devices();
    }
    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let folder = cli.folder.context("No folder given")?;
    run(&config, &folder)
}

fn print_devices() -> anyhow::Result<()> {
    for backend in list_available_backends() {
        println!("{}:", backend.name());
        for device in list_devices(backend)? {
            println!(
                "  {}{} ({} Hz, {} ch)",
                device.name,
                if device.is_default { " [default]" } else { "" },
                device.sample_rate,
                device.channels
            );
        }
    }
    Ok(())
}

fn run(config: &AppConfig, folder: &std::path::Path) -> anyhow::Result<()> {
    let playlist = Arc::new(library::load_playlist(folder)?);
    let Some(first) = playlist.get(0) else {
        anyhow::bail!("No playable files in {}", folder.display());
    };

    let device = CpalOutputDevice::open(config.output.device_config())
        .context("Failed to open output device")?;
    let decoder = SymphoniaDecoder::with_sample_rate(device.sample_rate());

    let options = SharedOptions::new(config.player);
    let track_player = TrackPlayer::new(Box::new(device), Arc::new(decoder), options.clone())?;
    track_player.set_volume(config.output.volume);
    for (index, band) in config.equalizer.iter().enumerate() {
        if !track_player.set_equalizer_band(index, *band) {
            tracing::warn!(index, "Ignoring equalizer band beyond the default set");
        }
    }

    let player = Arc::new(PlaylistPlayer::with_history_limit(
        track_player,
        options,
        config.history_limit,
    ));

    let events = player.subscribe();
    let printer = Arc::downgrade(&player);
    thread::Builder::new()
        .name("aurora-cli-events".to_string())
        .spawn(move || {
            for event in events {
                let Some(player) = printer.upgrade() else {
                    break;
                };
                if let Some(line) = describe_event(&player, &event) {
                    println!("{}", line);
                }
            }
        })?;

    println!("{} tracks in '{}'. Type 'help' for commands.", playlist.len(), playlist.name);
    player.play(Some(first), Some(playlist), true, true)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match execute(&player, command) {
            Ok((flow, message)) => {
                println!("{}", message);
                if flow == Flow::Quit {
                    break;
                }
            }
            Err(e) => println!("Error: {:#}", e),
        }
        stdout.flush()?;
    }

    player.player().flush()?;
    player.player().dispose()?;
    Ok(())
}
