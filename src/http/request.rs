//! Request object handed to providers.
//!
//! # Responsibilities
//! - Expose method, path, query, host, protocol, headers and body
//! - Parse cookies from the `Cookie` header
//! - Queue `Set-Cookie` mutations made by handlers
//!
//! # Design Decisions
//! - Method is normalized to uppercase on construction
//! - The path is percent-decoded once, here; routing and static lookup see the
//!   decoded form
//! - Host falls back to the URI authority when no `Host` header is present
//! - Cookie mutations are queued on the request and merged into the
//!   response by the dispatcher, so handlers never touch the response for them

use std::net::SocketAddr;
use std::sync::Mutex;

use axum::body::Bytes;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use percent_encoding::percent_decode_str;

use crate::error::RequestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Attributes for a cookie set by a handler.
#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: Some("/".to_string()),
            max_age: None,
            http_only: true,
            secure: false,
            same_site: Some(SameSite::Lax),
        }
    }
}

#[derive(Debug)]
pub struct Request {
    method: String,
    path: String,
    query: String,
    host: String,
    protocol: String,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    set_cookies: Mutex<Vec<String>>,
}

impl Request {
    /// Build a request from a method and a path with optional query string.
    ///
    /// Invalid UTF-8 in the decoded path is replaced rather than rejected.
    pub fn new(method: impl AsRef<str>, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            path: percent_decode_str(path).decode_utf8_lossy().into_owned(),
            query: query.to_string(),
            host: String::new(),
            protocol: "HTTP/1.1".to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            set_cookies: Mutex::new(Vec::new()),
        }
    }

    /// Build a request from transport parts and a buffered body.
    pub fn from_parts(
        parts: &Parts,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
    ) -> Result<Self, RequestError> {
        let raw_path = parts.uri.path();
        let path = percent_decode_str(raw_path)
            .decode_utf8()
            .map_err(|_| RequestError::InvalidPath {
                path: raw_path.to_string(),
            })?
            .into_owned();
        let host = parts
            .headers
            .get(axum::http::header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        Ok(Self {
            method: parts.method.as_str().to_ascii_uppercase(),
            path,
            query: parts.uri.query().unwrap_or_default().to_string(),
            host,
            protocol: format!("{:?}", parts.version),
            headers: parts.headers.clone(),
            body,
            remote_addr,
            set_cookies: Mutex::new(Vec::new()),
        })
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        if let Ok(value) = HeaderValue::from_str(&host) {
            self.headers.insert(axum::http::header::HOST, value);
        }
        self.host = host;
        self
    }

    /// Add a header. Invalid names or values are dropped with a warning.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "Ignoring invalid request header"),
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Decoded query arguments, in order, repeated keys kept.
    pub fn query_args(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .into_owned()
            .collect()
    }

    /// First value of query argument `name`.
    pub fn query_arg(&self, name: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Decoded `application/x-www-form-urlencoded` body.
    pub fn form_args(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(&self.body).into_owned().collect()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// All cookies sent by the client.
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.headers
            .get_all(axum::http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let value = value.trim().trim_matches('"');
                Some((name.trim().to_string(), value.to_string()))
            })
            .collect()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Queue a `Set-Cookie` header for the response.
    pub fn set_cookie(&self, name: &str, value: &str, options: &CookieOptions) {
        let mut cookie = format!("{}={}", name, value);
        if let Some(path) = &options.path {
            cookie.push_str(&format!("; Path={}", path));
        }
        if let Some(max_age) = options.max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }
        if options.http_only {
            cookie.push_str("; HttpOnly");
        }
        if options.secure {
            cookie.push_str("; Secure");
        }
        if let Some(same_site) = options.same_site {
            let value = match same_site {
                SameSite::Strict => "Strict",
                SameSite::Lax => "Lax",
                SameSite::None => "None",
            };
            cookie.push_str(&format!("; SameSite={}", value));
        }
        self.push_set_cookie(cookie);
    }

    /// Queue an expiring `Set-Cookie` header that removes `name`.
    pub fn delete_cookie(&self, name: &str) {
        self.push_set_cookie(format!(
            "{}=deleted; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            name
        ));
    }

    /// Drain the queued `Set-Cookie` values.
    pub fn take_set_cookies(&self) -> Vec<String> {
        let mut queued = self
            .set_cookies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *queued)
    }

    fn push_set_cookie(&self, cookie: String) {
        self.set_cookies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(cookie);
    }
}
