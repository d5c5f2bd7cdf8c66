//! Player configuration
use aurora_audio::EqualizerBand;
use aurora_audio_desktop::{AudioBackend, DeviceConfig, ShareMode};
use aurora_playback::{PlayerOptions, DEFAULT_MAX_HISTORY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "aurora.toml";

/// Prefix for environment overrides, e.g. `AURORA__PLAYER__LOOP_MODE=playlist`
pub const ENV_PREFIX: &str = "AURORA";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub history_limit: usize,

    pub player: PlayerOptions,
    pub output: OutputSettings,

    /// Bands applied over the default set, by index
    pub equalizer: Vec<EqualizerBand>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_MAX_HISTORY,
            player: PlayerOptions::default(),
            output: OutputSettings::default(),
            equalizer: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    pub backend: AudioBackend,

    /// Exact device name; the backend default when unset
    pub device_name: Option<String>,

    pub share_mode: ShareMode,
    pub latency_ms: Option<u32>,

    /// Initial volume, 0-100
    pub volume: u8,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            backend: AudioBackend::default(),
            device_name: None,
            share_mode: ShareMode::default(),
            latency_ms: None,
            volume: 100,
        }
    }
}

impl OutputSettings {
    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            backend: self.backend,
            device_name: self.device_name.clone(),
            share_mode: self.share_mode,
            latency_ms: self.latency_ms,
        }
    }
}

impl AppConfig {
    /// Load from `path` (or `aurora.toml` if present), then the environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`AppConfig::load`], reading overrides from `env` instead of the
    /// process environment when given
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> anyhow::Result<Self> {
        let mut settings = config::Config::builder();

        settings = match path {
            Some(path) => settings.add_source(config::File::from(path.to_path_buf())),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                settings.add_source(config::File::from(default_path).required(false))
            }
        };

        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.output.volume > 100 {
            anyhow::bail!("output.volume must be 0-100, got {}", self.output.volume);
        }
        if self.history_limit == 0 {
            anyhow::bail!("history_limit must be at least 1");
        }
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
