//! Websocket endpoints for stream routes.
//!
//! # Responsibilities
//! - Collect stream handlers bound at route-table build time
//! - Serve each one as a websocket endpoint
//!
//! # Data Flow
//! ```text
//! Client ←──── text frames ────→ serve_stream ──→ StreamHandler::call (shared provider)
//! ```
//!
//! # Design Decisions
//! - One text frame is one handler call; the frame is the only argument
//! - Handler calls run on the blocking pool, like per-request dispatch
//! - Binary, ping and pong frames are ignored

use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket};

use crate::provider::{Outcome, StreamHandler};

/// Collects stream handlers and the paths they are served on.
#[derive(Clone, Default)]
pub struct StreamEndpoints {
    endpoints: Arc<Mutex<Vec<(String, StreamHandler)>>>,
}

impl StreamEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// A binder for `RouteSpec::stream` that serves the handler at `path`.
    pub fn at(&self, path: impl Into<String>) -> impl FnOnce(StreamHandler) + Send + 'static {
        let endpoints = self.endpoints.clone();
        let path = path.into();
        move |handler| {
            tracing::debug!(path = %path, handler = handler.handler_name(), "Registered stream endpoint");
            endpoints
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push((path, handler));
        }
    }

    pub fn endpoints(&self) -> Vec<(String, StreamHandler)> {
        self.endpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.endpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for StreamEndpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let paths: Vec<String> = self.endpoints().into_iter().map(|(p, _)| p).collect();
        f.debug_struct("StreamEndpoints").field("paths", &paths).finish()
    }
}

/// Serve one websocket session against `handler`.
pub async fn serve_stream(mut socket: WebSocket, handler: StreamHandler) {
    tracing::debug!(handler = handler.handler_name(), "Stream session opened");

    while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "Stream receive failed");
                break;
            }
        };

        let call = handler.clone();
        let reply = match tokio::task::spawn_blocking(move || call.call(&[text])).await {
            Ok(Ok(outcome)) => outcome_text(outcome),
            Ok(Err(e)) => {
                tracing::warn!(handler = handler.handler_name(), error = %e, "Stream handler failed");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Stream handler task failed");
                break;
            }
        };

        if let Some(reply) = reply {
            if socket.send(Message::Text(reply.into())).await.is_err() {
                break;
            }
        }
    }

    tracing::debug!(handler = handler.handler_name(), "Stream session closed");
}

fn outcome_text(outcome: Outcome) -> Option<String> {
    match outcome {
        Outcome::Normal(reply) => reply.into_response().take_content().into_text(),
        Outcome::ImmediateResponse(mut response) => response.take_content().into_text(),
        Outcome::ReloadRequested(message) => Some(message),
    }
}
