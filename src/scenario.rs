use std::{fs::File, io::Read, path::Path};

use anyhow::Context;
use serde::Deserialize;

use crate::{
    media::{MediaSignal, ReadyState, Span},
    preload::PageImage,
    source::SourcePair,
    unlock::Gesture,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewportSpec {
    pub height: f64,
    pub scroll_y: f64,
}

impl Default for ViewportSpec {
    fn default() -> Self {
        Self {
            height: 800.0,
            scroll_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EnvironmentSpec {
    pub intersection_observer: bool,
    pub audio_context: bool,
    pub audible_autoplay: bool,
}

impl Default for EnvironmentSpec {
    fn default() -> Self {
        Self {
            intersection_observer: true,
            audio_context: true,
            audible_autoplay: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoSpec {
    pub top: f64,
    pub height: f64,

    #[serde(default)]
    pub src_webm: Option<String>,

    #[serde(default)]
    pub src_mp4: Option<String>,

    #[serde(default)]
    pub fallback_webm: Option<String>,

    #[serde(default)]
    pub fallback_mp4: Option<String>,

    #[serde(default)]
    pub poster: Option<String>,
}

impl VideoSpec {
    pub fn span(&self) -> Span {
        Span::new(self.top, self.top + self.height)
    }

    pub fn primary(&self) -> SourcePair {
        SourcePair::new(self.src_webm.clone(), self.src_mp4.clone())
    }

    pub fn fallback(&self) -> Option<SourcePair> {
        let pair = SourcePair::new(self.fallback_webm.clone(), self.fallback_mp4.clone());
        (!pair.is_empty()).then_some(pair)
    }

    pub fn is_candidate(&self) -> bool {
        !self.primary().is_empty() || self.fallback().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "e")]
pub enum ScriptAction {
    #[serde(rename = "page::scroll")]
    Scroll { y: f64 },

    #[serde(rename = "page::resize")]
    Resize { height: f64 },

    #[serde(rename = "page::orientation")]
    OrientationChange { height: f64 },

    #[serde(rename = "page::dom_ready")]
    DomReady,

    #[serde(rename = "page::load")]
    Load,

    #[serde(rename = "user::gesture")]
    Gesture { kind: Gesture },

    #[serde(rename = "media::signal")]
    Signal { video: usize, signal: MediaSignal },

    #[serde(rename = "media::ready")]
    Ready { video: usize, state: ReadyState },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptEvent {
    pub at_ms: u64,

    #[serde(flatten)]
    pub action: ScriptAction,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub viewport: ViewportSpec,
    pub environment: EnvironmentSpec,
    pub videos: Vec<VideoSpec>,
    pub images: Vec<PageImage>,
    pub events: Vec<ScriptEvent>,
}

impl Scenario {
    pub fn read(file: &mut impl Read) -> anyhow::Result<Self> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read scenario file")?;

        let mut scenario: Scenario =
            toml::from_str(&contents).context("Failed to parse scenario file")?;
        scenario.events.sort_by_key(|event| event.at_ms);
        Ok(scenario)
    }

    pub fn read_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .with_context(|| format!("Failed to open scenario file {}", path.display()))?;
        Self::read(&mut file)
    }
}
