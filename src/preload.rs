use std::{collections::HashSet, fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    candidate::{CandidateId, CandidateSet},
    config::PreloadConfig,
    media::{MediaElement, PlayOutcome},
    source::{attach, Variant},
    timer::TimerQueue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PreloadKind {
    #[serde(rename = "image")]
    Image,

    #[serde(rename = "video")]
    Video,
}

impl fmt::Display for PreloadKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PreloadKind::Image => f.write_str("image"),
            PreloadKind::Video => f.write_str("video"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadHint {
    pub kind: PreloadKind,
    pub href: String,
}

pub trait PreloadAdvisor {
    fn preload(&mut self, hint: PreloadHint);
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageImage {
    pub top: f64,

    #[serde(default)]
    pub src: Option<String>,

    #[serde(default)]
    pub data_src: Option<String>,
}

impl PageImage {
    pub fn href(&self) -> Option<&str> {
        self.src.as_deref().or(self.data_src.as_deref())
    }
}

pub struct Preloader {
    config: PreloadConfig,
    advisor: Box<dyn PreloadAdvisor>,
    issued: HashSet<(PreloadKind, String)>,
    pauses: TimerQueue<CandidateId>,
    warmed: bool,
}

impl fmt::Debug for Preloader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Preloader")
            .field("config", &self.config)
            .field("issued", &self.issued.len())
            .field("pauses", &self.pauses.len())
            .field("warmed", &self.warmed)
            .finish()
    }
}

impl Preloader {
    pub fn new(config: PreloadConfig, advisor: Box<dyn PreloadAdvisor>) -> Self {
        Self {
            config,
            advisor,
            issued: HashSet::new(),
            pauses: TimerQueue::new(),
            warmed: false,
        }
    }

    fn hint(&mut self, kind: PreloadKind, href: &str) {
        if !self.issued.insert((kind, href.to_string())) {
            return;
        }
        self.advisor.preload(PreloadHint {
            kind,
            href: href.to_string(),
        });
    }

    pub fn warm_up<E: MediaElement>(
        &mut self,
        now: Duration,
        active: Option<CandidateId>,
        candidates: &mut CandidateSet<E>,
        images: &[PageImage],
    ) -> Vec<CandidateId> {
        if std::mem::replace(&mut self.warmed, true) {
            return vec![];
        }
        let attached = self.warm_up_videos(now, active, candidates);
        self.preload_images(images);
        attached
    }

    fn warm_up_videos<E: MediaElement>(
        &mut self,
        now: Duration,
        active: Option<CandidateId>,
        candidates: &mut CandidateSet<E>,
    ) -> Vec<CandidateId> {
        let mut attached = vec![];
        let leading = candidates.by_position();
        for (index, id) in leading.into_iter().take(self.config.warmup_videos).enumerate() {
            let Some(candidate) = candidates.get_mut(id) else {
                continue;
            };
            if !candidate.element().has_sources()
                && attach(candidate, Variant::Primary).changed_state()
            {
                attached.push(id);
            }

            if active != Some(id) {
                let element = candidate.element_mut();
                element.set_muted(true);
                element.set_volume(0.0);
                match element.play() {
                    PlayOutcome::Started => {
                        let delay = self.config.warmup_pause_ms
                            + self.config.warmup_pause_step_ms * index as u64;
                        self.pauses.schedule(now + Duration::from_millis(delay), id);
                    }
                    outcome => log::debug!("Warm-up play of candidate {id}: {outcome:?}"),
                }
            }

            if let Some(poster) = candidate.poster().map(str::to_string) {
                self.hint(PreloadKind::Image, &poster);
            }
            if let Some(href) = candidate.primary().preferred_href().map(str::to_string) {
                self.hint(PreloadKind::Video, &href);
            }
        }
        attached
    }

    fn preload_images(&mut self, images: &[PageImage]) {
        let mut leading: Vec<&PageImage> = images.iter().filter(|img| img.href().is_some()).collect();
        leading.sort_by(|a, b| a.top.total_cmp(&b.top));
        for image in leading.into_iter().take(self.config.preload_images) {
            if let Some(href) = image.href() {
                self.hint(PreloadKind::Image, href);
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pauses.next_deadline()
    }

    pub fn on_tick<E: MediaElement>(
        &mut self,
        now: Duration,
        active: Option<CandidateId>,
        candidates: &mut CandidateSet<E>,
    ) {
        while let Some(id) = self.pauses.pop_due(now) {
            if active == Some(id) {
                log::debug!("Skipping warm-up pause of now-active candidate {id}");
                continue;
            }
            let Some(candidate) = candidates.get_mut(id) else {
                continue;
            };
            if let Err(err) = candidate.element_mut().pause() {
                log::debug!("Failed to pause warmed-up candidate {id}: {err:?}");
            }
        }
    }
}
