//! Request routing and dispatch for page-provider web applications.
//!
//! A `Router` is compiled once from declared routes and a list of provider
//! types; a `Dispatcher` then drives every request through a fixed lifecycle
//! of provider hooks and returns an `Emission` for the transport.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod provider;
pub mod routing;

pub use config::AppConfig;
pub use dispatch::Dispatcher;
pub use error::{HandlerError, RouteError};
pub use http::{HttpServer, Request, Response, StreamEndpoints};
pub use lifecycle::Shutdown;
pub use provider::{
    BasePage, HandlerResult, Outcome, Provider, ProviderContext, ProviderKind, ProviderType,
};
pub use routing::{RouteSpec, Router};
