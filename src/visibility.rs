use std::collections::BTreeSet;

use crate::{
    candidate::{CandidateId, CandidateSet},
    media::{MediaElement, Viewport},
    source::{attach, Variant},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LazyMargin {
    Pixels(f64),
    Viewports(f64),
}

impl LazyMargin {
    pub fn resolve(self, viewport: &Viewport) -> f64 {
        match self {
            LazyMargin::Pixels(px) => px,
            LazyMargin::Viewports(factor) => viewport.height * factor,
        }
    }
}

#[derive(Debug)]
pub struct VisibilityGate {
    supported: bool,
    margin: LazyMargin,
    observed: BTreeSet<CandidateId>,
}

impl VisibilityGate {
    pub fn new(supported: bool, margin: LazyMargin) -> Self {
        Self {
            supported,
            margin,
            observed: BTreeSet::new(),
        }
    }

    pub fn observe(&mut self, id: CandidateId) {
        self.observed.insert(id);
    }

    #[cfg(test)]
    pub fn is_observing(&self, id: CandidateId) -> bool {
        self.observed.contains(&id)
    }

    pub fn start<E: MediaElement>(
        &mut self,
        viewport: &Viewport,
        candidates: &mut CandidateSet<E>,
    ) -> Vec<CandidateId> {
        if !self.supported {
            log::info!(
                "Intersection observation unavailable; attaching all {} candidates eagerly",
                candidates.len()
            );
            let mut attached = vec![];
            for candidate in candidates.iter_mut() {
                if attach(candidate, Variant::Primary).changed_state() {
                    attached.push(candidate.id());
                }
            }
            return attached;
        }
        for id in candidates.ids() {
            self.observe(id);
        }
        self.on_layout(viewport, candidates)
    }

    pub fn on_layout<E: MediaElement>(
        &mut self,
        viewport: &Viewport,
        candidates: &mut CandidateSet<E>,
    ) -> Vec<CandidateId> {
        if self.observed.is_empty() {
            return vec![];
        }
        let region = viewport.expanded(self.margin.resolve(viewport));

        let mut attached = vec![];
        let mut intersecting = vec![];
        for &id in &self.observed {
            let Some(candidate) = candidates.get_mut(id) else {
                continue;
            };
            let span = candidate.element().layout_span();
            if !span.is_valid() || !span.intersects(&region) {
                continue;
            }
            intersecting.push(id);
            if attach(candidate, Variant::Primary).changed_state() {
                attached.push(id);
            }
        }
        for id in intersecting {
            self.observed.remove(&id);
        }
        attached
    }
}
