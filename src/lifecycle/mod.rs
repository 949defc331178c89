//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Build pool → Start health monitor → Watch config
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Shutdown::trigger → listeners wake
//!     → Stop health monitor (awaited) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful shutdown
//!     SIGHUP → config reload
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownListener};
