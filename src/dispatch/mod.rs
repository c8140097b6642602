//! Navigation dispatcher
//!
//! The host-side end of the `on_command` callback: maps matched commands
//! to tab switches and the emergency-call simulation.

mod navigation;

pub use navigation::{NavigationDispatcher, Tab};
