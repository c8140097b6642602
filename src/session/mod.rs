//! Recognition session state machine
//!
//! Owns the lifecycle of a continuous listening session:
//! - Idle: not listening
//! - Listening: recognizer started, events accepted for the current generation
//! - Error: transient, entered on a recognizer failure on the way back to Idle

mod machine;

pub use machine::{Generation, SessionManager, SessionState, SessionUpdate, StartOutcome};
