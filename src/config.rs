use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;

use crate::{app::Cli, visibility::LazyMargin};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub lazy_margin_viewports: f64,

    pub lazy_margin_px: Option<f64>,

    pub fallback_grace_ms: u64,

    pub select_delay_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            lazy_margin_viewports: 2.0,
            lazy_margin_px: None,
            fallback_grace_ms: 2500,
            select_delay_ms: 50,
        }
    }
}

impl PlaybackConfig {
    pub fn lazy_margin(&self) -> LazyMargin {
        match self.lazy_margin_px {
            Some(px) => LazyMargin::Pixels(px),
            None => LazyMargin::Viewports(self.lazy_margin_viewports),
        }
    }

    pub fn fallback_grace(&self) -> Duration {
        Duration::from_millis(self.fallback_grace_ms)
    }

    pub fn select_delay(&self) -> Duration {
        Duration::from_millis(self.select_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    pub warmup_videos: usize,
    pub preload_images: usize,
    pub warmup_delay_ms: u64,
    pub warmup_pause_ms: u64,
    pub warmup_pause_step_ms: u64,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            warmup_videos: 3,
            preload_images: 4,
            warmup_delay_ms: 30,
            warmup_pause_ms: 200,
            warmup_pause_step_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(flatten)]
    pub playback: PlaybackConfig,

    #[serde(flatten)]
    pub preload: PreloadConfig,
}

impl Config {
    pub fn read(file: &mut impl Read) -> anyhow::Result<Self> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read config file")?;

        let config = toml::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn read_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut file = File::open(path).context("Failed to open config file")?;
        Self::read(&mut file)
    }

    pub fn from_cli_args(args: &Cli) -> anyhow::Result<Self> {
        let config = match &args.config {
            Some(config_path) => Self::read_path(config_path)?,
            None => {
                let default_config = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_config.exists() {
                    log::info!("Using default config file {DEFAULT_CONFIG_PATH}");
                    Self::read_path(default_config)?
                } else {
                    log::warn!("No config file found; using default config");
                    Config::default()
                }
            }
        };
        Ok(config)
    }
}
