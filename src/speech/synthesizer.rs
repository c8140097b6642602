//! Speech synthesis capability and backends

use std::process::{Child, Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{Result, VoiceError};

/// espeak's own default speaking rate in words per minute
const ESPEAK_DEFAULT_WPM: f32 = 175.0;

/// Fixed voice parameters applied to every announcement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    /// 1.0 is normal speed; feedback runs slightly slower
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// A single synthesis request
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechTask {
    pub id: u64,
    pub text: String,
    pub params: VoiceParams,
}

/// Text-to-speech capability
pub trait Synthesizer: Send {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Side-effect-free probe for device support
    fn is_available(&self) -> bool;

    /// Start speaking `task` without waiting for it to finish
    fn speak(&mut self, task: &SpeechTask) -> Result<()>;

    /// Silence whatever is currently being spoken
    fn cancel(&mut self);
}

/// Synthesizer backed by the `espeak` command line tool
pub struct EspeakSynthesizer {
    program: String,
    available: bool,
    child: Option<Child>,
}

impl EspeakSynthesizer {
    pub fn new() -> Self {
        Self::with_program("espeak")
    }

    /// Use a specific binary, e.g. `espeak-ng`
    pub fn with_program(program: impl Into<String>) -> Self {
        let program = program.into();
        let available = probe_program(&program);
        if !available {
            warn!(%program, "speech synthesizer not found");
        }

        Self {
            program,
            available,
            child: None,
        }
    }
}

impl Default for EspeakSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer for EspeakSynthesizer {
    fn name(&self) -> &'static str {
        "espeak"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&mut self, task: &SpeechTask) -> Result<()> {
        // Reap a previous utterance that finished on its own
        if let Some(mut child) = self.child.take() {
            let _ = child.try_wait();
        }

        let child = Command::new(&self.program)
            .args(espeak_args(task))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        debug!(task = task.id, pid = child.id(), "espeak started");
        self.child = Some(child);
        Ok(())
    }

    fn cancel(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if let Ok(None) = child.try_wait() {
            if let Err(e) = child.kill() {
                warn!(?e, "failed to stop espeak");
            }
        }
        let _ = child.wait();
    }
}

impl Drop for EspeakSynthesizer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Map normalized voice parameters onto espeak's flags
fn espeak_args(task: &SpeechTask) -> Vec<String> {
    let words_per_minute = (ESPEAK_DEFAULT_WPM * task.params.rate).round() as u32;
    let pitch = (50.0 * task.params.pitch).round().clamp(0.0, 99.0) as u32;
    let amplitude = (100.0 * task.params.volume).round().clamp(0.0, 200.0) as u32;

    vec![
        "-s".to_string(),
        words_per_minute.to_string(),
        "-p".to_string(),
        pitch.to_string(),
        "-a".to_string(),
        amplitude.to_string(),
        task.text.clone(),
    ]
}

fn probe_program(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Synthesizer that only logs what would have been spoken
#[derive(Debug, Default)]
pub struct LogSynthesizer {
    speaking: Option<u64>,
}

impl LogSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Synthesizer for LogSynthesizer {
    fn name(&self) -> &'static str {
        "log"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn speak(&mut self, task: &SpeechTask) -> Result<()> {
        info!(
            task = task.id,
            text = %task.text,
            rate = task.params.rate,
            pitch = task.params.pitch,
            volume = task.params.volume,
            "speaking"
        );
        self.speaking = Some(task.id);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.speaking.take() {
            debug!(task, "speech cancelled");
        }
    }
}
