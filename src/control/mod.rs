//! UI control surface
//!
//! The `VoiceNavigator` is the single owner of the session, the speaker
//! and the transcript. User actions and recognizer events reach it through
//! one channel and are handled strictly in arrival order.

mod navigator;

pub use navigator::{CommandInfo, ControlAction, ControlStatus, Input, VoiceNavigator};
