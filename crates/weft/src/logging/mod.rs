//! Logger setup for hosts and tools built on the engine.
//!
//! The engine itself only emits through the `log` facade; nothing here is
//! needed to load documents.

mod init;

pub use init::{init_logging, LoggingConfig};
