//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields)
//!
//! Dispatcher (once per request):
//!     → logging.rs AccessLogger (host, timestamp, method, path, status, protocol)
//! ```

pub mod logging;

pub use logging::{AccessLogEntry, AccessLogger, NullAccessLogger, TracingAccessLogger};
