//! Recording fakes for the speech capabilities

use std::sync::Arc;

use parking_lot::Mutex;

use super::recognizer::{Recognizer, RecognizerSink};
use super::synthesizer::{SpeechTask, Synthesizer};
use crate::error::{Result, VoiceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthCall {
    Speak(String),
    Cancel,
}

/// Synthesizer that records every call
#[derive(Clone)]
pub struct FakeSynthesizer {
    available: bool,
    calls: Arc<Mutex<Vec<SynthCall>>>,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self {
            available: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<SynthCall> {
        self.calls.lock().clone()
    }

    /// Texts passed to `speak`, in order
    pub fn spoken(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                SynthCall::Speak(text) => Some(text.clone()),
                SynthCall::Cancel => None,
            })
            .collect()
    }
}

impl Synthesizer for FakeSynthesizer {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&mut self, task: &SpeechTask) -> Result<()> {
        self.calls.lock().push(SynthCall::Speak(task.text.clone()));
        Ok(())
    }

    fn cancel(&mut self) {
        self.calls.lock().push(SynthCall::Cancel);
    }
}

#[derive(Default)]
struct FakeRecognizerState {
    reject_start: Option<String>,
    sink: Option<RecognizerSink>,
    starts: usize,
    stops: usize,
}

/// Recognizer that hands its sink to the test
///
/// The last sink stays reachable after `stop`, so tests can deliver
/// straggling events for a finished session.
#[derive(Clone)]
pub struct FakeRecognizer {
    available: bool,
    state: Arc<Mutex<FakeRecognizerState>>,
}

impl FakeRecognizer {
    pub fn new() -> Self {
        Self {
            available: true,
            state: Arc::new(Mutex::new(FakeRecognizerState::default())),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn reject_next_start(&self, reason: &str) {
        self.state.lock().reject_start = Some(reason.to_string());
    }

    pub fn sink(&self) -> RecognizerSink {
        self.state
            .lock()
            .sink
            .clone()
            .expect("recognizer was never started")
    }

    pub fn starts(&self) -> usize {
        self.state.lock().starts
    }

    pub fn stops(&self) -> usize {
        self.state.lock().stops
    }
}

impl Recognizer for FakeRecognizer {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn start(&mut self, sink: RecognizerSink) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(reason) = state.reject_start.take() {
            return Err(VoiceError::StartFailure(reason));
        }
        state.starts += 1;
        state.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.state.lock().stops += 1;
    }
}
