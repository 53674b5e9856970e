use serde::Serialize;

use crate::{
    candidate::MediaCandidate,
    media::{ContainerFormat, MediaElement, SourceDescriptor},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Attachment {
    #[default]
    #[serde(rename = "unattached")]
    Unattached,

    #[serde(rename = "primary")]
    Primary,

    #[serde(rename = "fallback")]
    Fallback,
}

impl From<Variant> for Attachment {
    fn from(value: Variant) -> Self {
        match value {
            Variant::Primary => Attachment::Primary,
            Variant::Fallback => Attachment::Fallback,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePair {
    pub webm: Option<String>,
    pub mp4: Option<String>,
}

impl SourcePair {
    pub fn new(webm: Option<String>, mp4: Option<String>) -> Self {
        Self { webm, mp4 }
    }

    pub fn is_empty(&self) -> bool {
        self.webm.is_none() && self.mp4.is_none()
    }

    pub fn descriptors(&self) -> Vec<SourceDescriptor> {
        let webm = self.webm.iter().map(|url| SourceDescriptor {
            url: url.clone(),
            format: ContainerFormat::Webm,
        });
        let mp4 = self.mp4.iter().map(|url| SourceDescriptor {
            url: url.clone(),
            format: ContainerFormat::Mp4,
        });
        webm.chain(mp4).collect()
    }

    pub fn preferred_href(&self) -> Option<&str> {
        self.mp4.as_deref().or(self.webm.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Unchanged,
    Empty,
    Attached,
}

impl AttachOutcome {
    pub fn changed_state(self) -> bool {
        !matches!(self, AttachOutcome::Unchanged)
    }
}

pub fn attach<E: MediaElement>(candidate: &mut MediaCandidate<E>, variant: Variant) -> AttachOutcome {
    let target = Attachment::from(variant);
    if candidate.attachment() >= target {
        return AttachOutcome::Unchanged;
    }

    let sources = match variant {
        Variant::Primary => candidate.primary().descriptors(),
        Variant::Fallback => candidate
            .fallback()
            .map(SourcePair::descriptors)
            .unwrap_or_default(),
    };
    candidate.mark_attached(target);

    if sources.is_empty() {
        log::debug!(
            "Candidate {} has no {variant:?} sources; marking as attempted",
            candidate.id()
        );
        return AttachOutcome::Empty;
    }

    for source in &sources {
        log::debug!(
            "Candidate {} {variant:?} source: {} ({})",
            candidate.id(),
            source.url,
            source.format.mime_type()
        );
    }
    let element = candidate.element_mut();
    element.replace_sources(&sources);
    element.load();
    AttachOutcome::Attached
}
