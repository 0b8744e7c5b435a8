//! Error taxonomy.
//!
//! # Categories
//! - `RouteError::UnknownHandler` / `InvalidPattern` / `EmptyMethodSet`: fatal at startup,
//!   the application must not come up with an unroutable route table
//! - `RouteError::NoRoute`: recoverable, the dispatcher falls back to the default provider
//! - `HandlerError`: terminal for one request, converted into an error response
//! - `RequestError`: the transport answers 400 without dispatching
//!
//! Configuration file errors live in `config::loader::ConfigError`.

use thiserror::Error;

/// Errors raised while building or consulting the route table.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A declared route names a handler that no provider implements.
    #[error("no provider implements handler '{handler}'")]
    UnknownHandler { handler: String },

    /// A path or host pattern failed to compile.
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A route was declared with an explicit but empty method list.
    #[error("route '{pattern}' declares an empty method set")]
    EmptyMethodSet { pattern: String },

    /// No entry in the route table matches the request.
    #[error("{url} cannot be handled")]
    NoRoute { url: String },
}

/// Requests refused before they reach the dispatcher.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The percent-decoded path is not UTF-8.
    #[error("request path '{path}' is not valid UTF-8 once decoded")]
    InvalidPath { path: String },
}

/// Failures raised by providers while serving a single request.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// Generic handler failure.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The provider was asked for a handler it does not expose.
    #[error("provider has no handler named '{0}'")]
    UnknownHandler(String),

    /// Client supplied arguments the handler could not use.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A panic escaped a handler, hook or provider constructor.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The rollback hook itself failed.
    #[error("rollback failed: {0}")]
    Rollback(String),
}

impl HandlerError {
    /// Build a `Panicked` error from a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        HandlerError::Panicked(message)
    }
}
