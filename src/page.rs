use std::time::Duration;

use serde::Serialize;

use crate::{
    candidate::{CandidateId, CandidateSet},
    config::Config,
    coordinator::{Activation, AudioStatus, PlaybackCoordinator},
    fallback::FallbackMonitor,
    media::{MediaElement, MediaSignal, ReadyState, Viewport},
    preload::{PageImage, PreloadAdvisor, Preloader},
    selector::{CenterSelector, FrameScheduler, SelectTrigger},
    source::{Attachment, SourcePair},
    timer::TimerQueue,
    unlock::{AudioContext, AudioUnlockGate, Gesture, UnmuteBadge},
    visibility::VisibilityGate,
};

pub struct Capabilities {
    pub intersection_observer: bool,
    pub audio_context: Option<Box<dyn AudioContext>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageEvent {
    Scroll { y: f64 },
    Resize { height: f64 },
    OrientationChange { height: f64 },
    DomReady,
    Load,
    Gesture(Gesture),
    Media { candidate: CandidateId, signal: MediaSignal },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageTask {
    Select(SelectTrigger),
    WarmUp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSnapshot {
    pub id: CandidateId,
    pub attachment: Attachment,
    pub muted: bool,
    pub volume: f64,
    pub paused: bool,
    pub position_ms: u64,
    pub ready_state: ReadyState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSnapshot {
    pub active: Option<CandidateId>,
    pub audio: AudioStatus,
    pub audio_unlocked: bool,
    pub candidates: Vec<CandidateSnapshot>,
}

pub struct Page<E> {
    viewport: Viewport,
    candidates: CandidateSet<E>,
    images: Vec<PageImage>,
    config: Config,
    tasks: TimerQueue<PageTask>,
    visibility: VisibilityGate,
    fallback: FallbackMonitor,
    unlock: AudioUnlockGate,
    badge: Box<dyn UnmuteBadge>,
    selector: CenterSelector,
    frames: FrameScheduler,
    coordinator: PlaybackCoordinator,
    preloader: Preloader,
    dom_ready: bool,
    loaded: bool,
}

impl<E: MediaElement> Page<E> {
    pub fn new(
        viewport: Viewport,
        candidates: impl IntoIterator<Item = (E, SourcePair, Option<SourcePair>)>,
        images: Vec<PageImage>,
        capabilities: Capabilities,
        config: Config,
        advisor: Box<dyn PreloadAdvisor>,
        badge: Box<dyn UnmuteBadge>,
    ) -> Self {
        let candidates = CandidateSet::new(candidates);
        log::info!("Found {} video candidates", candidates.len());
        Self {
            viewport,
            candidates,
            images,
            visibility: VisibilityGate::new(
                capabilities.intersection_observer,
                config.playback.lazy_margin(),
            ),
            fallback: FallbackMonitor::new(config.playback.fallback_grace()),
            unlock: AudioUnlockGate::probe(capabilities.audio_context),
            badge,
            selector: CenterSelector,
            frames: FrameScheduler::default(),
            coordinator: PlaybackCoordinator::new(),
            preloader: Preloader::new(config.preload.clone(), advisor),
            tasks: TimerQueue::new(),
            config,
            dom_ready: false,
            loaded: false,
        }
    }

    pub fn candidates(&self) -> &CandidateSet<E> {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut CandidateSet<E> {
        &mut self.candidates
    }

    pub fn active(&self) -> Option<CandidateId> {
        self.coordinator.active()
    }

    pub fn is_audio_unlocked(&self) -> bool {
        self.unlock.is_unlocked()
    }

    pub fn start(&mut self, now: Duration) {
        for candidate in self.candidates.iter_mut() {
            candidate.element_mut().apply_autoplay_baseline();
        }
        let attached = self.visibility.start(&self.viewport, &mut self.candidates);
        self.guard_attached(&attached, now);
    }

    pub fn handle(&mut self, event: PageEvent, now: Duration) {
        log::debug!("Handling {event:?} at {}ms", now.as_millis());
        match event {
            PageEvent::Scroll { y } => {
                self.viewport.scroll_y = y;
                self.on_layout(SelectTrigger::Scroll, now);
            }
            PageEvent::Resize { height } => {
                self.viewport.height = height;
                self.on_layout(SelectTrigger::Resize, now);
            }
            PageEvent::OrientationChange { height } => {
                self.viewport.height = height;
                self.on_layout(SelectTrigger::OrientationChange, now);
            }
            PageEvent::DomReady => self.on_dom_ready(now),
            PageEvent::Load => self.on_load(now),
            PageEvent::Gesture(gesture) => self.on_gesture(gesture),
            PageEvent::Media { candidate, signal } => {
                self.fallback
                    .on_signal(candidate, signal, &mut self.candidates);
            }
        }
    }

    fn on_layout(&mut self, trigger: SelectTrigger, now: Duration) {
        let attached = self.visibility.on_layout(&self.viewport, &mut self.candidates);
        self.guard_attached(&attached, now);
        self.request_selection(trigger);
    }

    fn on_dom_ready(&mut self, now: Duration) {
        if std::mem::replace(&mut self.dom_ready, true) {
            return;
        }
        if !self.unlock.is_unlocked() {
            self.badge.show();
        }
        let warmup_delay = Duration::from_millis(self.config.preload.warmup_delay_ms);
        self.tasks.schedule(now + warmup_delay, PageTask::WarmUp);
        self.tasks.schedule(
            now + self.config.playback.select_delay(),
            PageTask::Select(SelectTrigger::DomReady),
        );
    }

    fn on_load(&mut self, now: Duration) {
        if std::mem::replace(&mut self.loaded, true) {
            return;
        }
        self.tasks.schedule(
            now + self.config.playback.select_delay(),
            PageTask::Select(SelectTrigger::Load),
        );
    }

    fn on_gesture(&mut self, gesture: Gesture) {
        if self.unlock.on_gesture(gesture) {
            self.badge.hide();
            if self.coordinator.state().audio == AudioStatus::MutedPending {
                self.request_selection(SelectTrigger::AudioUnlocked);
            }
        }
    }

    fn request_selection(&mut self, trigger: SelectTrigger) {
        if self.frames.request(trigger) {
            log::trace!("Requesting animation frame for {trigger:?}");
        }
    }

    pub fn wants_frame(&self) -> bool {
        self.frames.is_pending()
    }

    pub fn on_animation_frame(&mut self, now: Duration) {
        if !self.frames.begin_frame() {
            return;
        }
        let best = self.selector.recompute(&self.viewport, &self.candidates);
        let was_unlocked = self.unlock.is_unlocked();
        let report = self
            .coordinator
            .activate(best, &mut self.candidates, &mut self.unlock);
        self.guard_attached(&report.attached, now);
        if let Activation::Muted(outcome) = report.activation {
            log::debug!("Active candidate playing muted ({outcome:?})");
        }
        if !was_unlocked && self.unlock.is_unlocked() {
            self.badge.hide();
        }
    }

    fn guard_attached(&mut self, attached: &[CandidateId], now: Duration) {
        for &id in attached {
            self.fallback.guard(id, now);
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        [
            self.tasks.next_deadline(),
            self.fallback.next_deadline(),
            self.preloader.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn advance(&mut self, now: Duration) {
        while let Some(task) = self.tasks.pop_due(now) {
            match task {
                PageTask::Select(trigger) => self.request_selection(trigger),
                PageTask::WarmUp => {
                    let attached = self.preloader.warm_up(
                        now,
                        self.coordinator.active(),
                        &mut self.candidates,
                        &self.images,
                    );
                    self.guard_attached(&attached, now);
                }
            }
        }
        self.fallback.on_tick(now, &mut self.candidates);
        self.preloader
            .on_tick(now, self.coordinator.active(), &mut self.candidates);
    }

    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            active: self.coordinator.active(),
            audio: self.coordinator.state().audio,
            audio_unlocked: self.unlock.is_unlocked(),
            candidates: self
                .candidates
                .iter()
                .map(|candidate| {
                    let element = candidate.element();
                    CandidateSnapshot {
                        id: candidate.id(),
                        attachment: candidate.attachment(),
                        muted: element.muted(),
                        volume: element.volume(),
                        paused: element.paused(),
                        position_ms: element.current_time().as_millis() as u64,
                        ready_state: element.ready_state(),
                    }
                })
                .collect(),
        }
    }
}
