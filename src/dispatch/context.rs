//! Per-request dispatch state.

use std::sync::Arc;

use crate::http::request::Request;
use crate::http::response::Response;
use crate::provider::{Provider, NOT_FOUND_HANDLER, STATIC_HANDLER};

/// State of one request moving through the lifecycle.
///
/// Owned by a single `Dispatcher::handle` call and dropped once the
/// response is emitted.
pub struct DispatchContext {
    pub request: Arc<Request>,
    pub handler: String,
    pub args: Vec<String>,
    pub host_args: Vec<String>,
    pub provider: Option<Box<dyn Provider>>,
    pub response: Option<Response>,
}

impl DispatchContext {
    pub fn new(request: Arc<Request>) -> Self {
        Self {
            request,
            handler: NOT_FOUND_HANDLER.to_string(),
            args: Vec::new(),
            host_args: Vec::new(),
            provider: None,
            response: None,
        }
    }

    pub fn is_static(&self) -> bool {
        self.handler == STATIC_HANDLER
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("path", &self.request.path())
            .field("handler", &self.handler)
            .field("args", &self.args)
            .field("host_args", &self.host_args)
            .field("has_provider", &self.provider.is_some())
            .field("response", &self.response.as_ref().map(|r| r.status()))
            .finish()
    }
}
