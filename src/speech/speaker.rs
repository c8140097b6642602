//! Feedback speaker: one announcement at a time
//!
//! The speaker holds at most one synthesis task. A new announcement
//! cancels the one in flight; announcements made while a single input is
//! being handled collapse into one slot, and only the last reaches the
//! synthesizer when the control loop calls `flush`.

use tracing::{debug, warn};

use super::synthesizer::{SpeechTask, Synthesizer, VoiceParams};

pub struct FeedbackSpeaker {
    synthesizer: Option<Box<dyn Synthesizer>>,
    params: VoiceParams,
    muted: bool,
    /// Superseded by the next `announce`, submitted by `flush`
    pending: Option<SpeechTask>,
    /// Submitted to the synthesizer and not yet cancelled
    in_flight: Option<SpeechTask>,
    next_id: u64,
}

impl FeedbackSpeaker {
    /// Create a speaker; an unavailable synthesizer is treated as absent
    pub fn new(synthesizer: Option<Box<dyn Synthesizer>>, params: VoiceParams) -> Self {
        let synthesizer = synthesizer.filter(|s| {
            let available = s.is_available();
            debug!(backend = s.name(), available, "probed speech synthesizer");
            available
        });

        Self {
            synthesizer,
            params,
            muted: false,
            pending: None,
            in_flight: None,
            next_id: 0,
        }
    }

    /// Whether spoken feedback is possible on this device
    pub fn is_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Queue `text` for speaking, superseding anything outstanding
    ///
    /// Returns normally when muted or when no synthesizer exists.
    pub fn announce(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.muted {
            debug!(%text, "muted, skipping announcement");
            return;
        }
        let Some(synthesizer) = self.synthesizer.as_mut() else {
            return;
        };

        if let Some(task) = self.in_flight.take() {
            debug!(task = task.id, "cancelling in-flight speech");
            synthesizer.cancel();
        }

        self.next_id += 1;
        let task = SpeechTask {
            id: self.next_id,
            text,
            params: self.params,
        };

        if let Some(superseded) = self.pending.replace(task) {
            debug!(task = superseded.id, "announcement superseded before speaking");
        }
    }

    /// Submit the pending announcement, if any
    pub fn flush(&mut self) {
        let Some(task) = self.pending.take() else {
            return;
        };
        let Some(synthesizer) = self.synthesizer.as_mut() else {
            return;
        };

        match synthesizer.speak(&task) {
            Ok(()) => self.in_flight = Some(task),
            Err(e) => warn!(?e, task = task.id, "failed to speak announcement"),
        }
    }

    /// Set the mute flag; muting silences speech immediately
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if muted {
            self.silence();
        }
    }

    /// Drop pending speech and cancel whatever is being spoken
    pub fn silence(&mut self) {
        self.pending = None;
        if let Some(task) = self.in_flight.take() {
            debug!(task = task.id, "silencing speech");
            if let Some(synthesizer) = self.synthesizer.as_mut() {
                synthesizer.cancel();
            }
        }
    }
}
