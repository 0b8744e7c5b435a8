//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build route table → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C or trigger → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error (config, unroutable handler) is fatal
//! - Per-request failures never end the process

pub mod shutdown;

pub use shutdown::{signalled, Shutdown};
