use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioContextState {
    #[serde(rename = "running")]
    Running,

    #[serde(rename = "suspended")]
    Suspended,

    #[serde(rename = "closed")]
    Closed,
}

pub trait AudioContext {
    fn state(&self) -> AudioContextState;

    fn resume(&mut self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gesture {
    #[serde(rename = "pointerdown")]
    PointerDown,

    #[serde(rename = "touchstart")]
    TouchStart,

    #[serde(rename = "click")]
    Click,

    #[serde(rename = "keydown")]
    KeyDown,
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Gesture::PointerDown => "pointerdown",
            Gesture::TouchStart => "touchstart",
            Gesture::Click => "click",
            Gesture::KeyDown => "keydown",
        };
        f.write_str(name)
    }
}

pub trait UnmuteBadge {
    fn show(&mut self);

    fn hide(&mut self);
}

pub struct AudioUnlockGate {
    unlocked: bool,
    listening: bool,
    context: Option<Box<dyn AudioContext>>,
}

impl fmt::Debug for AudioUnlockGate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AudioUnlockGate")
            .field("unlocked", &self.unlocked)
            .field("listening", &self.listening)
            .field("context", &self.context.as_ref().map(|ctx| ctx.state()))
            .finish()
    }
}

impl AudioUnlockGate {
    pub fn probe(context: Option<Box<dyn AudioContext>>) -> Self {
        let unlocked = context
            .as_ref()
            .is_some_and(|ctx| ctx.state() == AudioContextState::Running);
        if context.is_none() {
            log::debug!("No audio context available; waiting for a gesture to unlock audio");
        }
        log::debug!("Audio initially {}", if unlocked { "unlocked" } else { "locked" });
        Self {
            unlocked,
            listening: true,
            context,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn unlock(&mut self) {
        if let Some(context) = self.context.as_mut() {
            if context.state() != AudioContextState::Running {
                if let Err(err) = context.resume() {
                    log::debug!("Failed to resume audio context: {err:?}");
                }
            }
        }
        if !self.unlocked {
            log::info!("Audio unlocked");
        }
        self.unlocked = true;
    }

    pub fn on_gesture(&mut self, gesture: Gesture) -> bool {
        if !self.listening {
            return false;
        }
        log::debug!("Handling first user gesture ({gesture})");
        self.listening = false;
        self.unlock();
        true
    }

    pub fn confirm_audible(&mut self) {
        if !self.unlocked {
            log::info!("Audible playback permitted without a gesture; audio unlocked");
            self.unlocked = true;
        }
    }
}
