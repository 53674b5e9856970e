use std::fmt;

use serde::Serialize;

use crate::{
    media::{MediaElement, Span, Viewport},
    source::{Attachment, SourcePair},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CandidateId(pub usize);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub struct MediaCandidate<E> {
    id: CandidateId,
    element: E,
    primary: SourcePair,
    fallback: Option<SourcePair>,
    attachment: Attachment,
}

impl<E: MediaElement> MediaCandidate<E> {
    pub fn new(
        id: CandidateId,
        element: E,
        primary: SourcePair,
        fallback: Option<SourcePair>,
    ) -> Self {
        Self {
            id,
            element,
            primary,
            fallback: fallback.filter(|pair| !pair.is_empty()),
            attachment: Attachment::Unattached,
        }
    }

    pub fn id(&self) -> CandidateId {
        self.id
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn element_mut(&mut self) -> &mut E {
        &mut self.element
    }

    pub fn primary(&self) -> &SourcePair {
        &self.primary
    }

    pub fn fallback(&self) -> Option<&SourcePair> {
        self.fallback.as_ref()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn attachment(&self) -> Attachment {
        self.attachment
    }

    pub(crate) fn mark_attached(&mut self, attachment: Attachment) {
        debug_assert!(attachment > self.attachment);
        self.attachment = attachment;
    }

    pub fn poster(&self) -> Option<&str> {
        self.element.poster()
    }

    pub fn client_span(&self, viewport: &Viewport) -> Span {
        viewport.to_client(self.element.layout_span())
    }

    pub fn silence(&mut self) {
        self.element.set_volume(0.0);
        self.element.set_muted(true);
        if self.element.ready_state().can_pause_cleanly() {
            if let Err(err) = self.element.pause() {
                log::debug!("Failed to pause candidate {}: {err:?}", self.id);
            }
        }
    }
}

#[derive(Debug)]
pub struct CandidateSet<E> {
    candidates: Vec<MediaCandidate<E>>,
}

impl<E: MediaElement> CandidateSet<E> {
    pub fn new(candidates: impl IntoIterator<Item = (E, SourcePair, Option<SourcePair>)>) -> Self {
        let candidates = candidates
            .into_iter()
            .enumerate()
            .map(|(index, (element, primary, fallback))| {
                MediaCandidate::new(CandidateId(index), element, primary, fallback)
            })
            .collect();
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn get(&self, id: CandidateId) -> Option<&MediaCandidate<E>> {
        self.candidates.get(id.0)
    }

    pub fn get_mut(&mut self, id: CandidateId) -> Option<&mut MediaCandidate<E>> {
        self.candidates.get_mut(id.0)
    }

    pub fn ids(&self) -> impl Iterator<Item = CandidateId> {
        (0..self.candidates.len()).map(CandidateId)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaCandidate<E>> {
        self.candidates.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MediaCandidate<E>> {
        self.candidates.iter_mut()
    }

    pub fn by_position(&self) -> Vec<CandidateId> {
        let mut ids: Vec<CandidateId> = self.ids().collect();
        ids.sort_by(|a, b| {
            let a = self.candidates[a.0].element.layout_span().top;
            let b = self.candidates[b.0].element.layout_span().top;
            a.total_cmp(&b)
        });
        ids
    }
}
