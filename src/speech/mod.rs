//! Speech capabilities and spoken feedback
//!
//! Recognition and synthesis are external capabilities behind the
//! `Recognizer` and `Synthesizer` traits. The `FeedbackSpeaker` owns the
//! single in-flight synthesis task and the mute flag.

mod recognizer;
mod speaker;
mod synthesizer;

#[cfg(test)]
pub mod testing;

pub use recognizer::{ConsoleRecognizer, Recognizer, RecognizerEvent, RecognizerEventKind, RecognizerSink};
pub use speaker::FeedbackSpeaker;
pub use synthesizer::{EspeakSynthesizer, LogSynthesizer, Synthesizer, VoiceParams};
