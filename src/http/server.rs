//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: stream endpoints plus a catch-all dispatch handler
//! - Wire up middleware (tracing, request id, timeout)
//! - Buffer the request body and hand the request to the dispatcher
//! - Turn the dispatcher's `Emission` into the wire response

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::dispatch::Dispatcher;
use crate::http::request::Request;
use crate::http::websocket::{self, StreamEndpoints};
use crate::lifecycle::shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_bytes: usize,
}

/// HTTP transport in front of a `Dispatcher`.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
}

impl HttpServer {
    /// Create a server for `dispatcher`, serving the stream handlers
    /// collected in `streams` as websocket endpoints.
    pub fn new(dispatcher: Dispatcher, streams: &StreamEndpoints) -> Self {
        let config = dispatcher.env().config.clone();
        let state = AppState {
            dispatcher: Arc::new(dispatcher),
            max_body_bytes: config.server.max_body_bytes,
        };
        let router = Self::build_router(&config, state, streams);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState, streams: &StreamEndpoints) -> Router {
        let mut router: Router<AppState> = Router::new();
        for (path, handler) in streams.endpoints() {
            tracing::info!(path = %path, handler = handler.handler_name(), "Mounting stream endpoint");
            router = router.route(
                &path,
                get(move |ws: WebSocketUpgrade| async move {
                    ws.on_upgrade(move |socket| websocket::serve_stream(socket, handler))
                }),
            );
        }

        let mut router = router.fallback(dispatch_handler).with_state(state);
        if config.server.request_timeout_secs > 0 {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )));
        }
        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until Ctrl+C or a message on `shutdown_rx`.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown::signalled(shutdown_rx).await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for embedding or in-process testing.
    pub fn into_router(self) -> Router {
        self.router
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Catch-all handler: every non-stream request goes through the dispatcher.
async fn dispatch_handler(State(state): State<AppState>, request: axum::extract::Request) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Rejected request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let request = match Request::from_parts(&parts, body, remote) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected request path");
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };
    let dispatcher = state.dispatcher.clone();
    match tokio::task::spawn_blocking(move || dispatcher.handle(request)).await {
        Ok(emission) => emission.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
