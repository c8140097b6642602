//! Configuration loading and management

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::speech::{
    ConsoleRecognizer, EspeakSynthesizer, LogSynthesizer, Recognizer, Synthesizer, VoiceParams,
};

/// Which speech recognition capability to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerBackend {
    /// Each stdin line is a transcript
    Console,
    /// No recognition on this device
    None,
}

impl FromStr for RecognizerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "none" => Ok(Self::None),
            other => bail!("unknown recognizer backend {other:?} (expected console or none)"),
        }
    }
}

/// Which speech synthesis capability to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesizerBackend {
    Espeak,
    /// Log announcements instead of speaking them
    Log,
    None,
}

impl FromStr for SynthesizerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "espeak" => Ok(Self::Espeak),
            "log" => Ok(Self::Log),
            "none" => Ok(Self::None),
            other => bail!("unknown synthesizer backend {other:?} (expected espeak, log or none)"),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    pub recognizer: RecognizerBackend,

    pub synthesizer: SynthesizerBackend,

    /// Voice used for every announcement
    pub voice: VoiceParams,

    /// Repeats of the same command inside this window are dispatched once
    pub repeat_window: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("companion-voice");

        let socket_path = lookup("COMPANION_VOICE_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let recognizer = lookup("COMPANION_VOICE_RECOGNIZER")
            .map(|v| v.parse::<RecognizerBackend>())
            .transpose()
            .context("invalid COMPANION_VOICE_RECOGNIZER")?
            .unwrap_or(RecognizerBackend::Console);

        let synthesizer = lookup("COMPANION_VOICE_SYNTHESIZER")
            .map(|v| v.parse::<SynthesizerBackend>())
            .transpose()
            .context("invalid COMPANION_VOICE_SYNTHESIZER")?
            .unwrap_or(SynthesizerBackend::Espeak);

        let defaults = VoiceParams::default();
        let voice = VoiceParams {
            rate: parse_param(&lookup, "COMPANION_VOICE_RATE", defaults.rate, 0.1..=10.0)?,
            pitch: parse_param(&lookup, "COMPANION_VOICE_PITCH", defaults.pitch, 0.0..=2.0)?,
            volume: parse_param(&lookup, "COMPANION_VOICE_VOLUME", defaults.volume, 0.0..=1.0)?,
        };

        let repeat_window_ms = match lookup("COMPANION_VOICE_REPEAT_WINDOW_MS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid COMPANION_VOICE_REPEAT_WINDOW_MS: {v:?}"))?,
            None => 1500,
        };

        Ok(Self {
            socket_path,
            data_dir,
            recognizer,
            synthesizer,
            voice,
            repeat_window: Duration::from_millis(repeat_window_ms),
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Instantiate the configured recognizer, if any
    pub fn build_recognizer(&self) -> Option<Box<dyn Recognizer>> {
        match self.recognizer {
            RecognizerBackend::Console => Some(Box::new(ConsoleRecognizer::new())),
            RecognizerBackend::None => None,
        }
    }

    /// Instantiate the configured synthesizer, if any
    pub fn build_synthesizer(&self) -> Option<Box<dyn Synthesizer>> {
        match self.synthesizer {
            SynthesizerBackend::Espeak => Some(Box::new(EspeakSynthesizer::new())),
            SynthesizerBackend::Log => Some(Box::new(LogSynthesizer::new())),
            SynthesizerBackend::None => None,
        }
    }
}

fn parse_param<F>(lookup: &F, key: &str, default: f32, range: RangeInclusive<f32>) -> Result<f32>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    let value: f32 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid {key}: {raw:?}"))?;
    if !range.contains(&value) {
        bail!("{key} must be within {:?}, got {value}", range);
    }
    Ok(value)
}
