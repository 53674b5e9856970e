use serde::Serialize;

use crate::{
    candidate::{CandidateId, CandidateSet},
    media::{MediaElement, PlayOutcome},
    source::{attach, Variant},
    unlock::AudioUnlockGate,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AudioStatus {
    #[default]
    #[serde(rename = "none")]
    None,

    #[serde(rename = "audible")]
    Audible,

    #[serde(rename = "muted_pending")]
    MutedPending,
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    pub active: Option<CandidateId>,
    pub audio: AudioStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Idle,
    Unchanged,
    Audible,
    Muted(PlayOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub activation: Activation,
    pub attached: Vec<CandidateId>,
}

#[derive(Debug, Default)]
pub struct PlaybackCoordinator {
    state: PlaybackState,
}

impl PlaybackCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn active(&self) -> Option<CandidateId> {
        self.state.active
    }

    pub fn activate<E: MediaElement>(
        &mut self,
        best: Option<CandidateId>,
        candidates: &mut CandidateSet<E>,
        gate: &mut AudioUnlockGate,
    ) -> ActivationReport {
        let mut attached = vec![];
        let Some(best) = best.filter(|id| candidates.get(*id).is_some()) else {
            return ActivationReport {
                activation: Activation::Idle,
                attached,
            };
        };

        if let Some(candidate) = candidates.get_mut(best) {
            if !candidate.element().has_sources() {
                log::debug!("Force-attaching sources for selected candidate {best}");
                for variant in [Variant::Primary, Variant::Fallback] {
                    if attach(candidate, variant).changed_state() {
                        attached.push(best);
                    }
                    if candidate.element().has_sources() {
                        break;
                    }
                }
                attached.dedup();
            }
        }

        if self.is_settled(best, candidates, gate) {
            return ActivationReport {
                activation: Activation::Unchanged,
                attached,
            };
        }

        for candidate in candidates.iter_mut().filter(|c| c.id() != best) {
            candidate.silence();
        }

        let Some(candidate) = candidates.get_mut(best) else {
            return ActivationReport {
                activation: Activation::Idle,
                attached,
            };
        };
        if self.state.active != Some(best) {
            log::info!("Activating candidate {best}");
        }
        self.state.active = Some(best);

        let element = candidate.element_mut();
        element.set_muted(false);
        element.set_volume(1.0);
        let activation = match element.play() {
            PlayOutcome::Started => {
                gate.confirm_audible();
                self.state.audio = AudioStatus::Audible;
                Activation::Audible
            }
            refusal => {
                log::debug!("Audible playback of candidate {best} not allowed ({refusal:?}); playing muted");
                element.set_muted(true);
                element.set_volume(0.0);
                let muted = element.play();
                if muted != PlayOutcome::Started {
                    log::debug!("Muted playback of candidate {best} also failed: {muted:?}");
                }
                self.state.audio = AudioStatus::MutedPending;
                Activation::Muted(muted)
            }
        };

        ActivationReport {
            activation,
            attached,
        }
    }

    /// Already active and playing, and either audible or waiting for an unlock
    /// that has not happened yet.
    fn is_settled<E: MediaElement>(
        &self,
        best: CandidateId,
        candidates: &CandidateSet<E>,
        gate: &AudioUnlockGate,
    ) -> bool {
        if self.state.active != Some(best) {
            return false;
        }
        let Some(element) = candidates.get(best).map(|c| c.element()) else {
            return false;
        };
        if element.paused() {
            return false;
        }
        match self.state.audio {
            AudioStatus::Audible => element.is_audible(),
            AudioStatus::MutedPending => !gate.is_unlocked(),
            AudioStatus::None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{rc::Rc, time::Duration};

    use crate::{
        media::{ReadyState, Span},
        sim::{SimAudioContext, SimElement, SimPolicy},
        source::{Attachment, SourcePair},
        unlock::Gesture,
    };

    use super::*;

    fn mp4(name: &str) -> SourcePair {
        SourcePair::new(None, Some(name.to_string()))
    }

    fn page(policy: &Rc<SimPolicy>, count: usize) -> CandidateSet<SimElement> {
        CandidateSet::new((0..count).map(|i| {
            let top = i as f64 * 1000.0;
            let mut element = SimElement::new(Span::new(top, top + 400.0), Rc::clone(policy));
            element.apply_autoplay_baseline();
            (element, mp4(&format!("{i}.mp4")), None)
        }))
    }

    fn gate(policy: &Rc<SimPolicy>) -> AudioUnlockGate {
        AudioUnlockGate::probe(Some(Box::new(SimAudioContext::new(Rc::clone(policy)))))
    }

    fn audible_count(candidates: &CandidateSet<SimElement>) -> usize {
        candidates.iter().filter(|c| c.element().is_audible()).count()
    }

    #[test]
    fn should_make_only_best_audible() {
        // given
        let policy = SimPolicy::new(true);
        let mut candidates = page(&policy, 3);
        let mut gate = gate(&policy);
        let mut coordinator = PlaybackCoordinator::new();

        // when
        let report = coordinator.activate(Some(CandidateId(1)), &mut candidates, &mut gate);

        // then
        assert_eq!(report.activation, Activation::Audible);
        assert_eq!(report.attached, vec![CandidateId(1)]);
        assert_eq!(coordinator.active(), Some(CandidateId(1)));
        assert_eq!(audible_count(&candidates), 1);
        assert!(candidates.get(CandidateId(1)).unwrap().element().is_audible());
    }

    #[test]
    fn should_never_overlap_audio_across_switches() {
        // given
        let policy = SimPolicy::new(true);
        let mut candidates = page(&policy, 4);
        let mut gate = gate(&policy);
        let mut coordinator = PlaybackCoordinator::new();

        for id in [0, 2, 1, 3, 3, 0, 2] {
            // when
            coordinator.activate(Some(CandidateId(id)), &mut candidates, &mut gate);

            // then
            assert_eq!(audible_count(&candidates), 1, "after activating {id}");
            assert!(candidates
                .get(CandidateId(id))
                .unwrap()
                .element()
                .is_audible());
        }
    }

    #[test]
    fn should_silence_others_before_unmuting_best() {
        // given
        let policy = SimPolicy::new(true);
        let mut candidates = page(&policy, 4);
        let mut gate = gate(&policy);
        let mut coordinator = PlaybackCoordinator::new();
        for candidate in candidates.iter_mut() {
            candidate.element_mut().set_fail_pause(true);
        }

        // when
        for id in [0, 2, 1, 3, 0, 3, 2] {
            coordinator.activate(Some(CandidateId(id)), &mut candidates, &mut gate);
        }

        // then
        assert_eq!(policy.audible_peak(), 1);
        assert_eq!(audible_count(&candidates), 1);
    }

    #[test]
    fn should_pause_previous_only_when_buffered() {
        // given
        let policy = SimPolicy::new(true);
        let mut candidates = page(&policy, 3);
        let mut gate = gate(&policy);
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.activate(Some(CandidateId(0)), &mut candidates, &mut gate);
        coordinator.activate(Some(CandidateId(1)), &mut candidates, &mut gate);
        candidates
            .get_mut(CandidateId(0))
            .unwrap()
            .element_mut()
            .set_ready_state(ReadyState::HaveEnoughData);
        candidates
            .get_mut(CandidateId(1))
            .unwrap()
            .element_mut()
            .set_ready_state(ReadyState::HaveMetadata);

        // when
        coordinator.activate(Some(CandidateId(2)), &mut candidates, &mut gate);

        // then
        let first = candidates.get(CandidateId(0)).unwrap().element();
        let second = candidates.get(CandidateId(1)).unwrap().element();
        assert!(first.paused());
        assert!(!second.paused());
        assert!(second.muted());
    }

    #[test]
    fn should_not_restart_when_already_active() {
        // given
        let policy = SimPolicy::new(true);
        let mut candidates = page(&policy, 2);
        let mut gate = gate(&policy);
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.activate(Some(CandidateId(0)), &mut candidates, &mut gate);
        let requests = candidates.get(CandidateId(0)).unwrap().element().play_requests();

        // when
        let report = coordinator.activate(Some(CandidateId(0)), &mut candidates, &mut gate);

        // then
        assert_eq!(report.activation, Activation::Unchanged);
        assert!(report.attached.is_empty());
        let element = candidates.get(CandidateId(0)).unwrap().element();
        assert_eq!(element.play_requests(), requests);
        assert_eq!(element.loads(), 1);
    }

    #[test]
    fn should_force_fallback_for_candidate_without_primary() {
        // given
        let policy = SimPolicy::new(true);
        let element = SimElement::new(Span::new(0.0, 400.0), Rc::clone(&policy));
        let mut candidates =
            CandidateSet::new(vec![(element, SourcePair::default(), Some(mp4("orig.mp4")))]);
        let mut gate = gate(&policy);
        let mut coordinator = PlaybackCoordinator::new();

        // when
        let report = coordinator.activate(Some(CandidateId(0)), &mut candidates, &mut gate);

        // then
        let candidate = candidates.get(CandidateId(0)).unwrap();
        assert_eq!(candidate.attachment(), Attachment::Fallback);
        assert_eq!(candidate.element().sources()[0].url, "orig.mp4");
        assert_eq!(report.activation, Activation::Audible);
        assert_eq!(report.attached, vec![CandidateId(0)]);
    }

    #[test]
    fn should_fall_back_to_muted_playback_until_unlocked() {
        // given
        let policy = SimPolicy::new(false);
        let mut candidates = page(&policy, 2);
        let mut gate = gate(&policy);
        let mut coordinator = PlaybackCoordinator::new();
        assert!(!gate.is_unlocked());

        // when
        let refused = coordinator.activate(Some(CandidateId(0)), &mut candidates, &mut gate);

        // then
        assert_eq!(refused.activation, Activation::Muted(PlayOutcome::Started));
        assert_eq!(coordinator.state().audio, AudioStatus::MutedPending);
        let element = candidates.get(CandidateId(0)).unwrap().element();
        assert!(element.muted());
        assert!(!element.paused());
        assert_eq!(audible_count(&candidates), 0);

        // when
        let again = coordinator.activate(Some(CandidateId(0)), &mut candidates, &mut gate);

        // then
        assert_eq!(again.activation, Activation::Unchanged);
    }

    #[test]
    fn should_become_audible_after_gesture_without_restart() {
        // given
        let policy = SimPolicy::new(false);
        let mut candidates = page(&policy, 2);
        let mut gate = gate(&policy);
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.activate(Some(CandidateId(0)), &mut candidates, &mut gate);
        candidates
            .get_mut(CandidateId(0))
            .unwrap()
            .element_mut()
            .advance(Duration::from_secs(3));

        // when
        policy.activate();
        gate.on_gesture(Gesture::Click);
        let report = coordinator.activate(Some(CandidateId(0)), &mut candidates, &mut gate);

        // then
        assert_eq!(report.activation, Activation::Audible);
        assert_eq!(coordinator.state().audio, AudioStatus::Audible);
        let element = candidates.get(CandidateId(0)).unwrap().element();
        assert!(element.is_audible());
        assert!(!element.paused());
        assert_eq!(element.current_time(), Duration::from_secs(3));
        assert_eq!(element.loads(), 1);
    }

    #[test]
    fn should_confirm_unlock_on_audible_start() {
        // given
        let policy = SimPolicy::new(false);
        let mut candidates = page(&policy, 1);
        let mut gate = AudioUnlockGate::probe(None);
        let mut coordinator = PlaybackCoordinator::new();
        policy.activate();

        // when
        coordinator.activate(Some(CandidateId(0)), &mut candidates, &mut gate);

        // then
        assert!(gate.is_unlocked());
    }

    #[test]
    fn should_ignore_missing_best() {
        // given
        let policy = SimPolicy::new(true);
        let mut candidates = page(&policy, 1);
        let mut gate = gate(&policy);
        let mut coordinator = PlaybackCoordinator::new();

        // when
        let none = coordinator.activate(None, &mut candidates, &mut gate);
        let unknown = coordinator.activate(Some(CandidateId(7)), &mut candidates, &mut gate);

        // then
        assert_eq!(none.activation, Activation::Idle);
        assert_eq!(unknown.activation, Activation::Idle);
        assert_eq!(coordinator.active(), None);
    }
}
