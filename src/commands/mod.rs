//! Command vocabulary and transcript matching
//!
//! The registry is a fixed, ordered list of spoken phrases. The matcher
//! scans a transcript for every phrase it contains; several commands can
//! fire from one utterance.

mod matcher;
mod registry;

pub use matcher::match_commands;
pub use registry::{lookup, CommandEntry, CommandId};
