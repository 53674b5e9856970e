use crate::{
    candidate::{CandidateId, CandidateSet},
    media::{MediaElement, Span, Viewport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectTrigger {
    Scroll,
    Resize,
    OrientationChange,
    Load,
    DomReady,
    AudioUnlocked,
}

pub fn center_distance(span: Span, midpoint: f64) -> f64 {
    if span.contains(midpoint) {
        return 0.0;
    }
    f64::min((span.top - midpoint).abs(), (span.bottom - midpoint).abs())
}

#[derive(Debug, Default)]
pub struct CenterSelector;

impl CenterSelector {
    /// Picks the candidate nearest the viewport's vertical midpoint. Ties go to
    /// the earliest candidate in scan order.
    pub fn recompute<E: MediaElement>(
        &self,
        viewport: &Viewport,
        candidates: &CandidateSet<E>,
    ) -> Option<CandidateId> {
        let midpoint = viewport.midpoint();
        let mut best: Option<(CandidateId, f64)> = None;
        for candidate in candidates.iter() {
            let span = candidate.client_span(viewport);
            if !span.is_valid() {
                continue;
            }
            let distance = center_distance(span, midpoint);
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((candidate.id(), distance));
            }
        }
        best.map(|(id, _)| id)
    }
}

#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: bool,
}

impl FrameScheduler {
    pub fn request(&mut self, trigger: SelectTrigger) -> bool {
        if self.pending {
            log::trace!("Selection already pending; coalescing {trigger:?}");
            return false;
        }
        self.pending = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Clears the in-flight flag at the start of a frame. Returns whether a
    /// recomputation should run.
    pub fn begin_frame(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}
