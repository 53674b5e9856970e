use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use anyhow::anyhow;

use crate::{
    media::{MediaElement, PlayOutcome, ReadyState, SourceDescriptor, Span},
    preload::{PreloadAdvisor, PreloadHint},
    unlock::{AudioContext, AudioContextState, UnmuteBadge},
};

#[derive(Debug, Default)]
pub struct SimPolicy {
    audible_allowed: Cell<bool>,
    audible_now: Cell<usize>,
    audible_peak: Cell<usize>,
}

impl SimPolicy {
    pub fn new(audible_allowed: bool) -> Rc<Self> {
        Rc::new(Self {
            audible_allowed: Cell::new(audible_allowed),
            ..Self::default()
        })
    }

    pub fn audible_allowed(&self) -> bool {
        self.audible_allowed.get()
    }

    pub fn activate(&self) {
        self.audible_allowed.set(true);
    }

    fn track_audible(&self, audible: bool) {
        let now = if audible {
            self.audible_now.get() + 1
        } else {
            self.audible_now.get().saturating_sub(1)
        };
        self.audible_now.set(now);
        if now > self.audible_peak.get() {
            log::trace!("{now} elements playing audibly");
            self.audible_peak.set(now);
        }
    }

    // Highest number of elements that were ever playing audibly at the same instant.
    #[cfg(test)]
    pub fn audible_peak(&self) -> usize {
        self.audible_peak.get()
    }
}

#[derive(Debug)]
pub struct SimElement {
    span: Span,
    poster: Option<String>,
    policy: Rc<SimPolicy>,
    sources: Vec<SourceDescriptor>,
    muted: bool,
    volume: f64,
    paused: bool,
    ready_state: ReadyState,
    position: Duration,
    loads: u32,
    play_requests: u32,
    fail_pause: bool,
    counted_audible: bool,
}

impl SimElement {
    pub fn new(span: Span, policy: Rc<SimPolicy>) -> Self {
        Self {
            span,
            poster: None,
            policy,
            sources: Vec::new(),
            muted: false,
            volume: 1.0,
            paused: true,
            ready_state: ReadyState::HaveNothing,
            position: Duration::ZERO,
            loads: 0,
            play_requests: 0,
            fail_pause: false,
            counted_audible: false,
        }
    }

    pub fn with_poster(mut self, poster: impl Into<String>) -> Self {
        self.poster = Some(poster.into());
        self
    }

    pub fn set_ready_state(&mut self, ready_state: ReadyState) {
        self.ready_state = ready_state;
    }

    pub fn set_fail_pause(&mut self, fail_pause: bool) {
        self.fail_pause = fail_pause;
    }

    pub fn advance(&mut self, elapsed: Duration) {
        if !self.paused {
            self.position += elapsed;
        }
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn loads(&self) -> u32 {
        self.loads
    }

    #[cfg(test)]
    pub fn play_requests(&self) -> u32 {
        self.play_requests
    }

    fn sync_audible(&mut self) {
        let audible = self.is_audible() && !self.paused;
        if audible != self.counted_audible {
            self.counted_audible = audible;
            self.policy.track_audible(audible);
        }
    }
}

impl MediaElement for SimElement {
    fn replace_sources(&mut self, sources: &[SourceDescriptor]) {
        self.sources = sources.to_vec();
    }

    fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    fn load(&mut self) {
        self.loads += 1;
        self.position = Duration::ZERO;
        self.ready_state = ReadyState::HaveNothing;
        self.paused = true;
        self.sync_audible();
    }

    fn play(&mut self) -> PlayOutcome {
        self.play_requests += 1;
        log::trace!("Play request #{}", self.play_requests);
        if self.sources.is_empty() {
            return PlayOutcome::Failed;
        }
        if self.is_audible() && !self.policy.audible_allowed() {
            self.paused = true;
            self.sync_audible();
            return PlayOutcome::Refused;
        }
        self.paused = false;
        self.sync_audible();
        PlayOutcome::Started
    }

    fn pause(&mut self) -> anyhow::Result<()> {
        if self.fail_pause {
            return Err(anyhow!("Element refused to pause"));
        }
        self.paused = true;
        self.sync_audible();
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.sync_audible();
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
        self.sync_audible();
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> Duration {
        self.position
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn layout_span(&self) -> Span {
        self.span
    }

    fn poster(&self) -> Option<&str> {
        self.poster.as_deref()
    }

    fn apply_autoplay_baseline(&mut self) {
        self.muted = true;
        self.sync_audible();
    }
}

#[derive(Debug)]
pub struct SimAudioContext {
    state: AudioContextState,
    policy: Rc<SimPolicy>,
}

impl SimAudioContext {
    pub fn new(policy: Rc<SimPolicy>) -> Self {
        let state = if policy.audible_allowed() {
            AudioContextState::Running
        } else {
            AudioContextState::Suspended
        };
        Self { state, policy }
    }
}

impl AudioContext for SimAudioContext {
    fn state(&self) -> AudioContextState {
        self.state
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        if !self.policy.audible_allowed() {
            return Err(anyhow!("Audio context cannot resume without user activation"));
        }
        self.state = AudioContextState::Running;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingAdvisor {
    hints: Rc<RefCell<Vec<PreloadHint>>>,
}

impl RecordingAdvisor {
    pub fn hints(&self) -> Vec<PreloadHint> {
        self.hints.borrow().clone()
    }
}

impl PreloadAdvisor for RecordingAdvisor {
    fn preload(&mut self, hint: PreloadHint) {
        log::info!("Preload hint: {} {}", hint.kind, hint.href);
        self.hints.borrow_mut().push(hint);
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimBadge {
    visible: Rc<Cell<bool>>,
}

impl SimBadge {
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }
}

impl UnmuteBadge for SimBadge {
    fn show(&mut self) {
        log::info!("Showing unmute badge");
        self.visible.set(true);
    }

    fn hide(&mut self) {
        if self.visible.replace(false) {
            log::info!("Removing unmute badge");
        }
    }
}
