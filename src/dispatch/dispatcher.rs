//! Per-request lifecycle.
//!
//! # Responsibilities
//! - Resolve the route, falling back to the default provider on `NoRoute`
//! - Build a fresh provider per request and drive its hooks in order
//! - Convert handler failures (errors and panics) into an error response
//!   after a best-effort rollback
//! - Encode the body, log the request, produce the `Emission`
//!
//! # Design Decisions
//! - The route table and registry are only read here, so a failing request
//!   cannot corrupt shared state
//! - Every hook call is panic-guarded; a panicking hook is logged and skipped

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;

use crate::config::AppConfig;
use crate::dispatch::context::DispatchContext;
use crate::error::{HandlerError, RouteError};
use crate::http::encoding::encode_response;
use crate::http::request::Request;
use crate::http::response::{Emission, Response};
use crate::observability::logging::{
    AccessLogEntry, AccessLogger, NullAccessLogger, TracingAccessLogger,
};
use crate::provider::{
    Environment, Outcome, Provider, ProviderContext, ProviderResolver, ProviderType,
};
use crate::routing::{RouteSpec, Router};

/// Turns requests into emissions. Cheap to share behind an `Arc`.
pub struct Dispatcher {
    router: Arc<Router>,
    env: Arc<Environment>,
    logger: Arc<dyn AccessLogger>,
}

impl Dispatcher {
    pub fn new(router: Router, env: Arc<Environment>) -> Self {
        let logger: Arc<dyn AccessLogger> = if env.config.observability.access_log {
            Arc::new(TracingAccessLogger)
        } else {
            Arc::new(NullAccessLogger)
        };
        Self {
            router: Arc::new(router),
            env,
            logger,
        }
    }

    /// Build the router and the dispatcher in one go.
    ///
    /// `default` is consulted last when resolving handler names and serves
    /// not-found and internal-error responses.
    pub fn build(
        routes: Vec<RouteSpec>,
        providers: Vec<ProviderType>,
        default: ProviderType,
        config: Arc<AppConfig>,
    ) -> Result<Self, RouteError> {
        let env = Arc::new(Environment::new(config));
        let router = Router::build(routes, ProviderResolver::new(providers, default), &env)?;
        tracing::info!(
            routes = router.table().len(),
            stream_providers = router.registry().len(),
            "Route table built"
        );
        Ok(Self::new(router, env))
    }

    pub fn with_logger(mut self, logger: Arc<dyn AccessLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn env(&self) -> &Arc<Environment> {
        &self.env
    }

    /// Run the full lifecycle for one request. Never panics on handler failure.
    pub fn handle(&self, request: Request) -> Emission {
        let span = tracing::debug_span!("dispatch", method = %request.method(), path = %request.path());
        let _enter = span.enter();

        let mut ctx = DispatchContext::new(Arc::new(request));
        let provider_type = self.route(&mut ctx);

        let invoked = panic::catch_unwind(AssertUnwindSafe(|| self.invoke(&mut ctx, &provider_type)));
        let response = match invoked {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => self.recover(&mut ctx, error),
            Err(payload) => self.recover(&mut ctx, HandlerError::from_panic(payload)),
        };
        ctx.response = Some(response);

        if !ctx.is_static() {
            self.post_process(&mut ctx);
        }
        self.apply_csp(&mut ctx);
        if !ctx.is_static() {
            self.apply_override(&mut ctx);
        }
        self.finalize(ctx)
    }

    fn route(&self, ctx: &mut DispatchContext) -> Arc<ProviderType> {
        let request = &ctx.request;
        match self
            .router
            .resolve(request.path(), request.method(), request.host())
        {
            Ok(resolved) => {
                ctx.handler = resolved.handler;
                ctx.args = resolved.args;
                ctx.host_args = resolved.host_args;
                resolved.provider
            }
            Err(e) => {
                tracing::debug!(error = %e, "No route matched, using default provider");
                self.router.default_provider().clone()
            }
        }
    }

    fn provider_context(&self, ctx: &DispatchContext) -> ProviderContext {
        ProviderContext::for_request(ctx.request.clone(), self.env.clone(), ctx.host_args.clone())
    }

    fn invoke(
        &self,
        ctx: &mut DispatchContext,
        provider_type: &ProviderType,
    ) -> Result<Response, HandlerError> {
        let is_static = ctx.is_static();
        let instance = provider_type.instantiate(self.provider_context(ctx));
        let provider = ctx.provider.insert(instance.pre_request());

        if is_static {
            provider.static_post_init()?;
        } else {
            provider.post_init()?;
        }

        match provider.invoke(&ctx.handler, &ctx.args)? {
            Outcome::Normal(reply) => Ok(reply.into_response()),
            Outcome::ImmediateResponse(response) => Ok(response),
            Outcome::ReloadRequested(message) => {
                tracing::warn!(handler = %ctx.handler, message = %message, "Reload requested");
                Ok(Response::text(format!("Reload requested: {}", message)))
            }
        }
    }

    fn recover(&self, ctx: &mut DispatchContext, error: HandlerError) -> Response {
        tracing::error!(
            handler = %ctx.handler,
            path = %ctx.request.path(),
            error = %error,
            "Request handling failed"
        );

        if let Some(provider) = ctx.provider.as_mut() {
            if let Err(e) = roll_back(provider.as_mut()) {
                tracing::warn!(error = %e, "Rollback failed");
            }
        }

        let default = self.router.default_provider().clone();
        let provider_ctx = self.provider_context(ctx);
        let recovered = guarded("internal_server_error", || {
            let mut provider = default.instantiate(provider_ctx);
            let response = provider.internal_server_error(&error);
            (provider, response)
        });
        match recovered {
            Some((provider, response)) => {
                ctx.provider = Some(provider);
                response
            }
            None => {
                ctx.provider = None;
                Response::internal_error()
            }
        }
    }

    fn post_process(&self, ctx: &mut DispatchContext) {
        let Some(mut response) = ctx.response.take() else {
            return;
        };
        encode_response(&mut response);
        if let Some(provider) = ctx.provider.as_mut() {
            response = guarded("post_request", || provider.post_request(response))
                .unwrap_or_else(Response::internal_error);
        }
        ctx.response = Some(response);
    }

    fn apply_csp(&self, ctx: &mut DispatchContext) {
        if let (Some(provider), Some(response)) = (ctx.provider.as_mut(), ctx.response.as_mut()) {
            guarded("csp_headers", || provider.csp_headers(response));
        }
    }

    fn apply_override(&self, ctx: &mut DispatchContext) {
        let Some(provider) = ctx.provider.as_mut() else {
            return;
        };
        let Some(response) = ctx.response.take() else {
            return;
        };
        let response = guarded("override_response", || provider.override_response(response))
            .unwrap_or_else(Response::internal_error);
        ctx.response = Some(response);
    }

    fn finalize(&self, ctx: DispatchContext) -> Emission {
        let DispatchContext {
            request,
            provider,
            response,
            ..
        } = ctx;
        drop(provider);

        let response = response.unwrap_or_else(Response::internal_error);
        let entry = AccessLogEntry {
            host: request.host().to_string(),
            timestamp: Utc::now(),
            method: request.method().to_string(),
            path: request.path().to_string(),
            status: response.status().as_u16(),
            protocol: request.protocol().to_string(),
        };
        guarded("access_log", || self.logger.log(&entry));

        response.into_emission(request.take_set_cookies())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("root", &self.env.root)
            .finish()
    }
}

/// Run `f`, turning a panic into `None` (logged).
fn guarded<T>(stage: &'static str, f: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let error = HandlerError::from_panic(payload);
            tracing::error!(stage, error = %error, "Lifecycle hook panicked");
            None
        }
    }
}

/// Undo a failed request's side effects. Errors and panics both come back
/// as `HandlerError::Rollback`.
fn roll_back(provider: &mut dyn Provider) -> Result<(), HandlerError> {
    match panic::catch_unwind(AssertUnwindSafe(|| provider.rollback())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HandlerError::Rollback(e.to_string())),
        Err(payload) => Err(HandlerError::Rollback(
            HandlerError::from_panic(payload).to_string(),
        )),
    }
}
