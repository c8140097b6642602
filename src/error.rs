//! Error types for the voice navigation core
//!
//! Every error here is recovered locally: the session falls back to Idle
//! and the user is told what happened. None of them end the process.

use thiserror::Error;

/// Voice navigation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    /// The device lacks speech recognition support
    #[error("speech recognition is not available on this device")]
    CapabilityUnavailable,

    /// The recognizer rejected a start request
    #[error("recognizer failed to start: {0}")]
    StartFailure(String),

    /// Asynchronous failure reported mid-session
    #[error("recognition error: {code}")]
    RecognitionError { code: String },

    /// The synthesizer could not speak an utterance
    #[error("speech synthesis error: {0}")]
    Synthesis(String),

    /// Internal channel closed
    #[error("channel error: {0}")]
    Channel(String),
}

impl VoiceError {
    /// Whether the user can simply try again
    ///
    /// Resuming after any of these is an explicit user action; nothing
    /// is retried automatically.
    pub fn is_recoverable(&self) -> bool {
        match self {
            VoiceError::CapabilityUnavailable => false,
            VoiceError::StartFailure(_) => true,
            VoiceError::RecognitionError { .. } => true,
            VoiceError::Synthesis(_) => true,
            VoiceError::Channel(_) => false,
        }
    }

    /// Get a user-friendly description of the error
    pub fn user_message(&self) -> String {
        match self {
            VoiceError::CapabilityUnavailable => {
                "Your device doesn't support speech recognition.".to_string()
            }
            VoiceError::StartFailure(_) => "Please try again or restart the app.".to_string(),
            VoiceError::RecognitionError { code } => {
                format!("Error: {code}. Tap the microphone to try again.")
            }
            VoiceError::Synthesis(_) => "Spoken feedback is unavailable right now.".to_string(),
            VoiceError::Channel(_) => {
                "Internal communication error. Please restart the app.".to_string()
            }
        }
    }
}

/// Result type alias for voice operations
pub type Result<T> = std::result::Result<T, VoiceError>;
