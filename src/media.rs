use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReadyState {
    #[serde(rename = "nothing")]
    HaveNothing,

    #[serde(rename = "metadata")]
    HaveMetadata,

    #[serde(rename = "current")]
    HaveCurrentData,

    #[serde(rename = "future")]
    HaveFutureData,

    #[serde(rename = "enough")]
    HaveEnoughData,
}

impl ReadyState {
    /// Enough data to pause without a visible stutter on the next resume.
    pub fn can_pause_cleanly(self) -> bool {
        self >= ReadyState::HaveCurrentData
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    Refused,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaSignal {
    #[serde(rename = "error")]
    Error,

    #[serde(rename = "stalled")]
    Stalled,

    #[serde(rename = "abort")]
    Abort,

    #[serde(rename = "emptied")]
    Emptied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerFormat {
    #[serde(rename = "webm")]
    Webm,

    #[serde(rename = "mp4")]
    Mp4,
}

impl ContainerFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ContainerFormat::Webm => "video/webm",
            ContainerFormat::Mp4 => "video/mp4",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    pub url: String,
    pub format: ContainerFormat,
}

/// Vertical extent of an element. Document or client coordinates depending on context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub top: f64,
    pub bottom: f64,
}

impl Span {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    pub fn contains(&self, y: f64) -> bool {
        self.top <= y && self.bottom >= y
    }

    pub fn intersects(&self, other: &Span) -> bool {
        self.top <= other.bottom && self.bottom >= other.top
    }

    pub fn is_valid(&self) -> bool {
        self.top.is_finite() && self.bottom.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_y: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(scroll_y: f64, height: f64) -> Self {
        Self { scroll_y, height }
    }

    pub fn midpoint(&self) -> f64 {
        self.height / 2.0
    }

    pub fn to_client(&self, span: Span) -> Span {
        Span::new(span.top - self.scroll_y, span.bottom - self.scroll_y)
    }

    pub fn expanded(&self, margin: f64) -> Span {
        Span::new(self.scroll_y - margin, self.scroll_y + self.height + margin)
    }
}

pub trait MediaElement {
    fn replace_sources(&mut self, sources: &[SourceDescriptor]);

    fn has_sources(&self) -> bool;

    fn load(&mut self);

    fn play(&mut self) -> PlayOutcome;

    fn pause(&mut self) -> anyhow::Result<()>;

    fn set_muted(&mut self, muted: bool);

    fn muted(&self) -> bool;

    fn set_volume(&mut self, volume: f64);

    fn volume(&self) -> f64;

    fn paused(&self) -> bool;

    fn current_time(&self) -> Duration;

    fn ready_state(&self) -> ReadyState;

    fn layout_span(&self) -> Span;

    fn poster(&self) -> Option<&str>;

    fn apply_autoplay_baseline(&mut self);

    fn is_audible(&self) -> bool {
        !self.muted() && self.volume() > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_order_ready_states() {
        assert!(ReadyState::HaveNothing < ReadyState::HaveMetadata);
        assert!(ReadyState::HaveEnoughData > ReadyState::HaveFutureData);
        assert!(!ReadyState::HaveMetadata.can_pause_cleanly());
        assert!(ReadyState::HaveCurrentData.can_pause_cleanly());
    }

    #[test]
    fn should_convert_spans_to_client_coordinates() {
        // given
        let viewport = Viewport::new(1000.0, 800.0);

        // when
        let client = viewport.to_client(Span::new(1200.0, 1500.0));

        // then
        assert_eq!(client, Span::new(200.0, 500.0));
        assert_eq!(viewport.midpoint(), 400.0);
        assert_eq!(viewport.expanded(1600.0), Span::new(-600.0, 3400.0));
    }

    #[test]
    fn should_treat_touching_spans_as_intersecting() {
        let a = Span::new(0.0, 100.0);
        assert!(a.intersects(&Span::new(100.0, 200.0)));
        assert!(!a.intersects(&Span::new(100.5, 200.0)));
    }
}
