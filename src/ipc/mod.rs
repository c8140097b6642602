//! IPC module for daemon-UI communication
//!
//! The UI shell drives the control surface and subscribes to its events
//! over a Unix domain socket.

pub(crate) mod protocol;
mod server;

pub use server::Server;
