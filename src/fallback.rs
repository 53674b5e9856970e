use std::{collections::HashMap, time::Duration};

use crate::{
    candidate::{CandidateId, CandidateSet},
    media::{MediaElement, MediaSignal, PlayOutcome, ReadyState},
    source::{attach, Attachment, Variant},
    timer::{TimerId, TimerQueue},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Signal(MediaSignal),
    GraceElapsed,
}

#[derive(Debug)]
struct Guard {
    deadline: Option<TimerId>,
}

#[derive(Debug)]
pub struct FallbackMonitor {
    grace: Duration,
    guards: HashMap<CandidateId, Guard>,
    deadlines: TimerQueue<CandidateId>,
}

impl FallbackMonitor {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            guards: HashMap::new(),
            deadlines: TimerQueue::new(),
        }
    }

    pub fn guard(&mut self, id: CandidateId, now: Duration) -> bool {
        if self.guards.contains_key(&id) {
            return false;
        }
        let deadline = self.deadlines.schedule(now + self.grace, id);
        self.guards.insert(
            id,
            Guard {
                deadline: Some(deadline),
            },
        );
        true
    }

    pub fn is_guarding(&self, id: CandidateId) -> bool {
        self.guards.contains_key(&id)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.deadlines.next_deadline()
    }

    pub fn on_signal<E: MediaElement>(
        &mut self,
        id: CandidateId,
        signal: MediaSignal,
        candidates: &mut CandidateSet<E>,
    ) -> bool {
        if !self.is_guarding(id) {
            log::debug!("Ignoring {signal:?} from unguarded candidate {id}");
            return false;
        }
        self.try_switch(id, Trigger::Signal(signal), candidates)
    }

    pub fn on_tick<E: MediaElement>(
        &mut self,
        now: Duration,
        candidates: &mut CandidateSet<E>,
    ) -> Vec<CandidateId> {
        let mut switched = vec![];
        while let Some(id) = self.deadlines.pop_due(now) {
            if let Some(guard) = self.guards.get_mut(&id) {
                guard.deadline = None;
            }
            if self.try_switch(id, Trigger::GraceElapsed, candidates) {
                switched.push(id);
            }
        }
        switched
    }

    fn try_switch<E: MediaElement>(
        &mut self,
        id: CandidateId,
        trigger: Trigger,
        candidates: &mut CandidateSet<E>,
    ) -> bool {
        let Some(candidate) = candidates.get_mut(id) else {
            return false;
        };
        if candidate.attachment() == Attachment::Fallback || !candidate.has_fallback() {
            return false;
        }
        if trigger == Trigger::GraceElapsed
            && candidate.element().ready_state() >= ReadyState::HaveCurrentData
        {
            return false;
        }

        log::info!("Candidate {id} switching to fallback sources after {trigger:?}");
        attach(candidate, Variant::Fallback);
        if let Some(deadline) = self.guards.get_mut(&id).and_then(|guard| guard.deadline.take()) {
            self.deadlines.cancel(deadline);
        }

        match candidate.element_mut().play() {
            PlayOutcome::Started => {}
            outcome => log::debug!("Resume after fallback on candidate {id}: {outcome:?}"),
        }
        true
    }
}
