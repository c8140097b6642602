//! Fire-all substring matcher
//!
//! Every registry entry whose phrase occurs in the transcript fires, in
//! registry order. A transcript containing "call emergency" therefore
//! yields both `emergency` and `call-emergency`; callers must tolerate
//! the duplicate dispatch.

use super::registry::{lookup, CommandId};

/// Lower-case the transcript and trim surrounding whitespace
pub fn normalize(transcript: &str) -> String {
    transcript.trim().to_lowercase()
}

/// Find every command whose phrase occurs in `transcript`
pub fn match_commands(transcript: &str) -> Vec<CommandId> {
    let normalized = normalize(transcript);
    if normalized.is_empty() {
        return Vec::new();
    }

    lookup()
        .iter()
        .filter(|entry| normalized.contains(entry.phrase))
        .map(|entry| entry.id)
        .collect()
}
