//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, body buffering)
//!     → request.rs (Request object for providers)
//!     → [dispatcher runs the lifecycle]
//!     → response.rs + encoding.rs (coerce, encode, Emission)
//!     → Send to client
//!
//! Stream routes:
//!     websocket.rs (one endpoint per bound StreamHandler)
//! ```

pub mod encoding;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::{CookieOptions, Request, SameSite};
pub use response::{Content, ContentKind, Emission, Reply, Response};
pub use server::HttpServer;
pub use websocket::StreamEndpoints;
