//! The stock default provider.
//!
//! # Responsibilities
//! - `_NotFound`: 404 page naming the requested path
//! - `Static`: files below `<root>/static/`
//! - `internal_server_error`: 500 page, with error detail only in debug mode
//!
//! Application providers can embed a `BasePage` and delegate handler names
//! they do not know to it.

use std::path::{Component, Path, PathBuf};

use axum::http::StatusCode;

use crate::error::HandlerError;
use crate::http::encoding::escape_html;
use crate::http::response::{Content, Response};
use crate::provider::{
    HandlerResult, Outcome, Provider, ProviderContext, ProviderKind, NOT_FOUND_HANDLER,
    STATIC_HANDLER,
};

/// Directory below the application root that static assets are served from.
pub const STATIC_DIR: &str = "static";

const STATIC_MAX_AGE_SECS: u32 = 3600;

#[derive(Debug)]
pub struct BasePage {
    ctx: ProviderContext,
}

impl BasePage {
    pub fn context(&self) -> &ProviderContext {
        &self.ctx
    }

    pub fn not_found(&self) -> Response {
        let path = self.ctx.request().map(|r| r.path()).unwrap_or_default();
        Response::html(format!(
            "<!DOCTYPE html><html><head><title>404 Not Found</title></head>\
             <body><h1>Page not found</h1><p>The requested page {} could not be found.</p></body></html>",
            escape_html(path)
        ))
        .with_status(StatusCode::NOT_FOUND)
    }

    /// Serve `relative` from the static directory.
    pub fn static_asset(&self, relative: &str) -> Response {
        let Some(path) = resolve_static(self.ctx.root(), relative) else {
            tracing::debug!(path = %relative, "Rejected static asset path");
            return self.not_found();
        };
        match std::fs::read(&path) {
            Ok(bytes) => {
                let mime = mime_guess::from_path(&path).first_or_octet_stream();
                Response::new()
                    .with_content_type(mime.essence_str())
                    .with_header("Cache-Control", format!("public, max-age={}", STATIC_MAX_AGE_SECS))
                    .with_content(Content::Bytes(bytes))
            }
            Err(e) => {
                tracing::debug!(path = ?path, error = %e, "Static asset not readable");
                self.not_found()
            }
        }
    }

    fn error_page(&self, error: &HandlerError) -> Response {
        let detail = if self.ctx.debug() {
            format!("<pre>{}</pre>", escape_html(&error.to_string()))
        } else {
            String::new()
        };
        Response::html(format!(
            "<!DOCTYPE html><html><head><title>500 Internal Server Error</title></head>\
             <body><h1>Internal Server Error</h1><p>The server could not complete your request.</p>{}</body></html>",
            detail
        ))
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Map a request-relative path onto the static directory, refusing anything
/// that would leave it.
fn resolve_static(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = root.join(STATIC_DIR);
    let mut pushed = false;
    for component in Path::new(relative.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                pushed = true;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    pushed.then_some(path)
}

impl Provider for BasePage {
    fn invoke(&mut self, handler: &str, args: &[String]) -> HandlerResult {
        match handler {
            NOT_FOUND_HANDLER => Ok(Outcome::normal(self.not_found())),
            STATIC_HANDLER => {
                let relative = args.first().map(String::as_str).unwrap_or_default();
                Ok(Outcome::normal(self.static_asset(relative)))
            }
            other => Err(HandlerError::UnknownHandler(other.to_string())),
        }
    }

    fn internal_server_error(&mut self, error: &HandlerError) -> Response {
        self.error_page(error)
    }
}

impl ProviderKind for BasePage {
    const NAME: &'static str = "BasePage";
    const HANDLERS: &'static [&'static str] = &[NOT_FOUND_HANDLER, STATIC_HANDLER];

    fn new(ctx: ProviderContext) -> Self {
        Self { ctx }
    }
}
