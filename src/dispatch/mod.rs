//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → Route        (Router::resolve; NoRoute falls back to the default provider)
//!     → Instantiate  (fresh provider per request)
//!     → PreRequest   (may replace the provider)
//!     → Invoke       (post_init or static_post_init, then the handler)
//!     → [Recover]    (rollback, default provider's internal_server_error)
//!     → Post-process (coerce, encode, post_request; skipped for static assets)
//!     → CSP headers  (always)
//!     → Override     (override_response; skipped for static assets)
//!     → Finalize     (access log, Emission)
//! ```
//!
//! # Design Decisions
//! - Synchronous: the transport decides which thread a request runs on
//! - Per-request failures and panics end in a response, never past `handle`
//! - No timeouts or retries at this layer

pub mod context;
pub mod dispatcher;

pub use context::DispatchContext;
pub use dispatcher::Dispatcher;
