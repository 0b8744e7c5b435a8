//! Handler providers.
//!
//! # Data Flow
//! ```text
//! ProviderType[] + default ProviderType
//!     → resolver.rs (first provider exposing a handler name, at build time)
//!     → registry.rs (shared instances for stream routes)
//!
//! Per request:
//!     ProviderType::instantiate(ProviderContext)
//!     → Box<dyn Provider> (owned by one DispatchContext)
//! ```
//!
//! # Design Decisions
//! - Handler names are declared statically (`ProviderKind::HANDLERS`), no runtime probing
//! - Every lifecycle hook is declared on `Provider` with a no-op default
//! - Handlers return an explicit `Outcome` instead of signalling via errors

pub mod base;
pub mod registry;
pub mod resolver;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::HandlerError;
use crate::http::request::Request;
use crate::http::response::{Reply, Response};

pub use base::BasePage;
pub use registry::{ProviderInstanceRegistry, StreamHandler};
pub use resolver::ProviderResolver;

/// Handler name used until routing succeeds.
pub const NOT_FOUND_HANDLER: &str = "_NotFound";

/// Handler name of the static asset handler. Skips post-processing.
pub const STATIC_HANDLER: &str = "Static";

/// Result of invoking a handler.
#[derive(Debug)]
pub enum Outcome {
    /// Regular return value, post-processed by the dispatcher.
    Normal(Reply),
    /// Response supplied directly, bypassing further handler logic.
    ImmediateResponse(Response),
    /// The handler asked for a code reload; rendered as a diagnostic.
    ReloadRequested(String),
}

impl Outcome {
    /// Wrap anything convertible into a reply.
    pub fn normal(reply: impl Into<Reply>) -> Self {
        Outcome::Normal(reply.into())
    }
}

pub type HandlerResult = Result<Outcome, HandlerError>;

/// Process-wide values every provider is constructed with.
#[derive(Debug)]
pub struct Environment {
    pub config: Arc<AppConfig>,
    pub root: PathBuf,
}

impl Environment {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let root = PathBuf::from(&config.server.root);
        Self { config, root }
    }
}

/// Everything a provider instance is built from.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    request: Option<Arc<Request>>,
    env: Arc<Environment>,
    host_args: Vec<String>,
}

impl ProviderContext {
    /// Context for a provider serving one HTTP request.
    pub fn for_request(request: Arc<Request>, env: Arc<Environment>, host_args: Vec<String>) -> Self {
        Self {
            request: Some(request),
            env,
            host_args,
        }
    }

    /// Context for a shared instance with no request bound (stream routes).
    pub fn detached(env: Arc<Environment>) -> Self {
        Self {
            request: None,
            env,
            host_args: Vec::new(),
        }
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_deref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.env.config
    }

    /// Application root path.
    pub fn root(&self) -> &Path {
        &self.env.root
    }

    /// Captures from the route's host pattern.
    pub fn host_args(&self) -> &[String] {
        &self.host_args
    }

    pub fn debug(&self) -> bool {
        self.env.config.server.debug
    }
}

/// Converts a boxed provider into a trait object.
///
/// Blanket-implemented; lets `pre_request` hand back `self` by default.
pub trait IntoDynProvider {
    fn into_dyn(self: Box<Self>) -> Box<dyn Provider>;
}

impl<T: Provider> IntoDynProvider for T {
    fn into_dyn(self: Box<Self>) -> Box<dyn Provider> {
        self
    }
}

/// A set of named request handlers plus optional lifecycle hooks.
///
/// Hooks that a provider does not override are no-ops, so a provider
/// without hooks goes through the lifecycle exactly like one whose hooks
/// return their input unchanged.
pub trait Provider: IntoDynProvider + Send + 'static {
    /// Invoke the handler called `handler` with positional captures.
    fn invoke(&mut self, handler: &str, args: &[String]) -> HandlerResult;

    /// Runs right after construction. May return a replacement provider.
    fn pre_request(self: Box<Self>) -> Box<dyn Provider> {
        self.into_dyn()
    }

    /// General initialization before a handler runs.
    fn post_init(&mut self) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Cheap initialization used instead of `post_init` for static assets.
    fn static_post_init(&mut self) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Internal post-processing, after content encoding.
    fn post_request(&mut self, response: Response) -> Response {
        response
    }

    /// Undo in-flight work after a failed invocation.
    fn rollback(&mut self) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Attach security headers. Runs for every request.
    fn csp_headers(&mut self, _response: &mut Response) {}

    /// Public post-processing hook; its return value is the final response.
    fn override_response(&mut self, response: Response) -> Response {
        response
    }

    /// Render the internal-server-error page for `error`.
    fn internal_server_error(&mut self, _error: &HandlerError) -> Response {
        Response::internal_error()
    }
}

/// A provider type with a static name and handler list.
pub trait ProviderKind: Provider + Sized {
    const NAME: &'static str;
    const HANDLERS: &'static [&'static str];

    fn new(ctx: ProviderContext) -> Self;
}

fn construct<P: ProviderKind>(ctx: ProviderContext) -> Box<dyn Provider> {
    Box::new(P::new(ctx))
}

/// Type-erased handle on a `ProviderKind`: its name, handlers and constructor.
#[derive(Clone, Copy)]
pub struct ProviderType {
    name: &'static str,
    handlers: &'static [&'static str],
    construct: fn(ProviderContext) -> Box<dyn Provider>,
}

impl ProviderType {
    pub fn of<P: ProviderKind>() -> Self {
        Self {
            name: P::NAME,
            handlers: P::HANDLERS,
            construct: construct::<P>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn handlers(&self) -> &'static [&'static str] {
        self.handlers
    }

    /// Returns true if this provider declares `handler`.
    pub fn exposes(&self, handler: &str) -> bool {
        self.handlers.iter().any(|h| *h == handler)
    }

    pub fn instantiate(&self, ctx: ProviderContext) -> Box<dyn Provider> {
        (self.construct)(ctx)
    }
}

impl fmt::Debug for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderType")
            .field("name", &self.name)
            .field("handlers", &self.handlers)
            .finish()
    }
}

impl PartialEq for ProviderType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
