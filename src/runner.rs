use std::{collections::VecDeque, rc::Rc, time::Duration};

use anyhow::Context;
use serde::Serialize;

use crate::{
    candidate::CandidateId,
    config::Config,
    media::Viewport,
    page::{Capabilities, Page, PageEvent, PageSnapshot},
    preload::PreloadHint,
    scenario::{Scenario, ScriptAction, ScriptEvent},
    sim::{RecordingAdvisor, SimAudioContext, SimBadge, SimElement, SimPolicy},
    unlock::AudioContext,
};

pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub ended_at_ms: u64,
    pub badge_visible: bool,
    pub preload_hints: Vec<PreloadHint>,
    pub page: PageSnapshot,
}

pub struct Simulation {
    page: Page<SimElement>,
    policy: Rc<SimPolicy>,
    advisor: RecordingAdvisor,
    badge: SimBadge,
    video_ids: Vec<Option<CandidateId>>,
    events: VecDeque<ScriptEvent>,
    now: Duration,
    frame_due: Option<Duration>,
}

impl Simulation {
    pub fn new(scenario: Scenario, config: Config) -> Self {
        let policy = SimPolicy::new(scenario.environment.audible_autoplay);
        let advisor = RecordingAdvisor::default();
        let badge = SimBadge::default();

        let mut video_ids = Vec::with_capacity(scenario.videos.len());
        let mut candidates = vec![];
        for video in &scenario.videos {
            if !video.is_candidate() {
                video_ids.push(None);
                continue;
            }
            video_ids.push(Some(CandidateId(candidates.len())));
            let mut element = SimElement::new(video.span(), Rc::clone(&policy));
            if let Some(poster) = &video.poster {
                element = element.with_poster(poster.clone());
            }
            candidates.push((element, video.primary(), video.fallback()));
        }

        let audio_context = scenario.environment.audio_context.then(|| {
            Box::new(SimAudioContext::new(Rc::clone(&policy))) as Box<dyn AudioContext>
        });
        let capabilities = Capabilities {
            intersection_observer: scenario.environment.intersection_observer,
            audio_context,
        };
        let page = Page::new(
            Viewport::new(scenario.viewport.scroll_y, scenario.viewport.height),
            candidates,
            scenario.images,
            capabilities,
            config,
            Box::new(advisor.clone()),
            Box::new(badge.clone()),
        );

        Self {
            page,
            policy,
            advisor,
            badge,
            video_ids,
            events: scenario.events.into(),
            now: Duration::ZERO,
            frame_due: None,
        }
    }

    fn next_instant(&self) -> Option<Duration> {
        let next_event = self
            .events
            .front()
            .map(|event| Duration::from_millis(event.at_ms).max(self.now));
        [next_event, self.page.next_deadline(), self.frame_due]
            .into_iter()
            .flatten()
            .min()
    }

    fn next_frame_after(now: Duration) -> Duration {
        let interval = FRAME_INTERVAL.as_millis() as u64;
        let now_ms = now.as_millis() as u64;
        Duration::from_millis((now_ms / interval + 1) * interval)
    }

    fn advance_to(&mut self, at: Duration) {
        let elapsed = at.saturating_sub(self.now);
        for candidate in self.page.candidates_mut().iter_mut() {
            candidate.element_mut().advance(elapsed);
        }
        self.now = at;

        while self
            .events
            .front()
            .is_some_and(|event| Duration::from_millis(event.at_ms) <= at)
        {
            if let Some(event) = self.events.pop_front() {
                self.apply(event.action);
            }
        }

        self.page.advance(at);

        if self.frame_due == Some(at) {
            self.frame_due = None;
            self.page.on_animation_frame(at);
        }
        if self.page.wants_frame() && self.frame_due.is_none() {
            self.frame_due = Some(Self::next_frame_after(at));
        }
    }

    fn candidate(&self, video: usize) -> Option<CandidateId> {
        let id = self.video_ids.get(video).copied().flatten();
        if id.is_none() {
            log::warn!("Scenario refers to video {video}, which is not a playback candidate");
        }
        id
    }

    fn apply(&mut self, action: ScriptAction) {
        let now = self.now;
        let event = match action {
            ScriptAction::Scroll { y } => PageEvent::Scroll { y },
            ScriptAction::Resize { height } => PageEvent::Resize { height },
            ScriptAction::OrientationChange { height } => PageEvent::OrientationChange { height },
            ScriptAction::DomReady => PageEvent::DomReady,
            ScriptAction::Load => PageEvent::Load,
            ScriptAction::Gesture { kind } => {
                self.policy.activate();
                PageEvent::Gesture(kind)
            }
            ScriptAction::Signal { video, signal } => {
                let Some(candidate) = self.candidate(video) else {
                    return;
                };
                PageEvent::Media { candidate, signal }
            }
            ScriptAction::Ready { video, state } => {
                let Some(id) = self.candidate(video) else {
                    return;
                };
                if let Some(candidate) = self.page.candidates_mut().get_mut(id) {
                    log::debug!("Candidate {id} reached {state:?}");
                    candidate.element_mut().set_ready_state(state);
                }
                return;
            }
        };
        self.page.handle(event, now);
    }

    pub async fn run(mut self, speed: Option<f64>) -> anyhow::Result<Report> {
        self.page.start(self.now);
        log::info!(
            "Starting scenario with {} candidates and {} scripted events",
            self.page.candidates().len(),
            self.events.len()
        );

        let mut last_active = self.page.active();
        while let Some(next) = self.next_instant() {
            if let Some(speed) = speed.filter(|speed| *speed > 0.0) {
                let scaled = next.saturating_sub(self.now).as_secs_f64() / speed;
                let wait = Duration::try_from_secs_f64(scaled)
                    .with_context(|| format!("Cannot replay at speed {speed}"))?;
                tokio::time::sleep(wait).await;
            }
            self.advance_to(next);

            let active = self.page.active();
            if active != last_active {
                if let Some(id) = active {
                    log::info!("[{}ms] Candidate {id} is now active", next.as_millis());
                }
                last_active = active;
            }
        }

        Ok(self.report())
    }

    pub fn report(&self) -> Report {
        Report {
            ended_at_ms: self.now.as_millis() as u64,
            badge_visible: self.badge.is_visible(),
            preload_hints: self.advisor.hints(),
            page: self.page.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{coordinator::AudioStatus, source::Attachment};

    use super::*;

    const MOBILE_SCENARIO: &str = r#"
[viewport]
height = 1000

[[videos]]
top = 0
height = 800
src_webm = "a.webm"
src_mp4 = "a.mp4"
poster = "a.jpg"

[[videos]]
top = 1000
height = 800
src_mp4 = "b.mp4"
fallback_mp4 = "b-orig.mp4"

[[videos]]
top = 2000
height = 800
fallback_mp4 = "c-orig.mp4"

[[images]]
top = 10
src = "hero.png"

[[events]]
at_ms = 0
e = "page::dom_ready"

[[events]]
at_ms = 200
e = "media::ready"
video = 0
state = "enough"

[[events]]
at_ms = 300
e = "media::signal"
video = 1
signal = "stalled"

[[events]]
at_ms = 1000
e = "page::scroll"
y = 1000

[[events]]
at_ms = 1500
e = "user::gesture"
kind = "click"

[[events]]
at_ms = 2000
e = "page::scroll"
y = 2000
"#;

    fn scenario(source: &str) -> Scenario {
        Scenario::read(&mut Cursor::new(source)).unwrap()
    }

    #[tokio::test]
    async fn should_replay_mobile_scenario() {
        // given
        let simulation = Simulation::new(scenario(MOBILE_SCENARIO), Config::default());

        // when
        let report = simulation.run(None).await.unwrap();

        // then
        assert_eq!(report.page.active, Some(CandidateId(2)));
        assert_eq!(report.page.audio, AudioStatus::Audible);
        assert!(report.page.audio_unlocked);
        assert!(!report.badge_visible);

        let candidates = &report.page.candidates;
        assert_eq!(candidates[1].attachment, Attachment::Fallback);
        assert_eq!(candidates[2].attachment, Attachment::Fallback);
        assert!(candidates[0].muted);
        assert!(candidates[1].muted);
        assert!(!candidates[2].muted);

        let hrefs: Vec<&str> = report.preload_hints.iter().map(|h| h.href.as_str()).collect();
        assert_eq!(hrefs, vec!["a.jpg", "a.mp4", "b.mp4", "hero.png"]);
    }

    #[tokio::test]
    async fn should_stay_muted_without_gesture() {
        // given
        let source = r#"
[[videos]]
top = 0
height = 800
src_mp4 = "a.mp4"

[[events]]
at_ms = 0
e = "page::load"
"#;
        let simulation = Simulation::new(scenario(source), Config::default());

        // when
        let report = simulation.run(None).await.unwrap();

        // then
        assert_eq!(report.page.active, Some(CandidateId(0)));
        assert_eq!(report.page.audio, AudioStatus::MutedPending);
        assert!(!report.page.audio_unlocked);
        assert!(report.page.candidates[0].muted);
        assert!(!report.page.candidates[0].paused);
    }

    #[tokio::test]
    async fn should_play_audibly_where_autoplay_is_allowed() {
        // given
        let source = r#"
[environment]
audible_autoplay = true

[[videos]]
top = 0
height = 800
src_mp4 = "a.mp4"

[[events]]
at_ms = 0
e = "page::dom_ready"
"#;
        let simulation = Simulation::new(scenario(source), Config::default());

        // when
        let report = simulation.run(None).await.unwrap();

        // then
        assert_eq!(report.page.audio, AudioStatus::Audible);
        assert!(!report.page.candidates[0].muted);
        assert!(!report.badge_visible);
    }

    #[tokio::test]
    async fn should_finish_empty_scenario() {
        let report = Simulation::new(Scenario::default(), Config::default())
            .run(None)
            .await
            .unwrap();
        assert_eq!(report.page.active, None);
        assert!(report.page.candidates.is_empty());
    }

    #[tokio::test]
    async fn should_reject_speed_too_slow_to_schedule() {
        // given
        let source = r#"
[[events]]
at_ms = 100
e = "page::load"
"#;
        let simulation = Simulation::new(scenario(source), Config::default());

        // when
        let result = simulation.run(Some(1e-300)).await;

        // then
        assert!(result.is_err());
    }

    #[test]
    fn should_align_frames_to_interval() {
        assert_eq!(
            Simulation::next_frame_after(Duration::from_millis(0)),
            Duration::from_millis(16)
        );
        assert_eq!(
            Simulation::next_frame_after(Duration::from_millis(16)),
            Duration::from_millis(32)
        );
        assert_eq!(
            Simulation::next_frame_after(Duration::from_millis(50)),
            Duration::from_millis(64)
        );
    }
}
