//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteSpec[] + ProviderResolver
//!     → router.rs (bind handler names to providers, bind stream routes)
//!     → matcher.rs (compile anchored patterns)
//!     → table.rs (freeze as immutable RouteTable)
//!
//! Incoming Request (url, method, host)
//!     → router.rs (ordered scan)
//!     → Return: Resolved or NoRoute
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (declaration order), no specificity rules

pub mod matcher;
pub mod router;
pub mod table;

pub use matcher::RoutePattern;
pub use router::{Resolved, RouteSpec, RouteTarget, Router, StreamBinder};
pub use table::{HostPattern, MethodSet, RouteEntry, RouteTable};
