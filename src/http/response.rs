//! Response objects.
//!
//! # Responsibilities
//! - Hold status, headers, content type, charset and body
//! - Coerce raw handler return values into a full response
//! - Turn a finished response into the `Emission` handed to the transport
//!
//! # Design Decisions
//! - The body keeps track of whether it is already encoded (`Content::Safe`)
//!   so encoders never double-escape
//! - The content type lives in one place: a `Content-Type` header set through
//!   the header API is parsed into `content_type` and `charset`
//! - Textual bodies are emitted in `charset`; an unknown label falls back to UTF-8

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CONTENT_TYPE: &str = "text/html";
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Response body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Content {
    /// No body set yet. Emitted as an empty string.
    #[default]
    Empty,
    /// Raw text, encoded for the response's content type before emission.
    Text(String),
    /// Text already in the encoded form of the response's content type.
    Safe(String),
    /// Structured value, serialized by the JSON encoder.
    Json(serde_json::Value),
    /// Binary payload, emitted untouched.
    Bytes(Vec<u8>),
}

impl Content {
    pub fn is_empty(&self) -> bool {
        match self {
            Content::Empty => true,
            Content::Text(s) | Content::Safe(s) => s.is_empty(),
            Content::Json(_) => false,
            Content::Bytes(b) => b.is_empty(),
        }
    }

    /// Best-effort textual form, `None` for an unset body.
    pub fn into_text(self) -> Option<String> {
        match self {
            Content::Empty => None,
            Content::Text(s) | Content::Safe(s) => Some(s),
            Content::Json(v) => Some(v.to_string()),
            Content::Bytes(b) => Some(String::from_utf8_lossy(&b).into_owned()),
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        match self {
            Content::Empty => Vec::new(),
            Content::Text(s) | Content::Safe(s) => s.into_bytes(),
            Content::Json(v) => v.to_string().into_bytes(),
            Content::Bytes(b) => b,
        }
    }
}

/// Content type classification used to pick an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Plain,
    Json,
    Other,
}

impl ContentKind {
    pub fn of(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "text/html" | "application/xhtml+xml" => ContentKind::Html,
            "text/plain" => ContentKind::Plain,
            "application/json" => ContentKind::Json,
            e if e.ends_with("+json") => ContentKind::Json,
            _ => ContentKind::Other,
        }
    }

    fn is_textual(self, content_type: &str) -> bool {
        self != ContentKind::Other || content_type.starts_with("text/")
    }
}

/// What a handler may hand back: a full response or a raw value.
#[derive(Debug)]
pub enum Reply {
    Response(Response),
    Content(Content),
}

impl Reply {
    /// Coerce into a full response. Raw values get the default content
    /// type, except structured values which become JSON.
    pub fn into_response(self) -> Response {
        match self {
            Reply::Response(response) => response,
            Reply::Content(content @ Content::Json(_)) => {
                Response::new().with_content_type("application/json").with_content(content)
            }
            Reply::Content(content) => Response::new().with_content(content),
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}

impl From<Content> for Reply {
    fn from(content: Content) -> Self {
        Reply::Content(content)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Content(Content::Text(text))
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Content(Content::Text(text.to_string()))
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Reply::Content(Content::Json(value))
    }
}

/// A structured HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    content_type: String,
    charset: String,
    content: Content,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Empty `200 OK` HTML response.
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            content: Content::Empty,
        }
    }

    /// HTML response with trusted markup.
    pub fn html(markup: impl Into<String>) -> Self {
        Self::new().with_content(Content::Safe(markup.into()))
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new()
            .with_content_type("text/plain")
            .with_content(Content::Text(body.into()))
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::new()
            .with_content_type("application/json")
            .with_content(Content::Json(value))
    }

    /// Temporary redirect (307) to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::redirect_with(location, StatusCode::TEMPORARY_REDIRECT)
    }

    pub fn redirect_with(location: impl Into<String>, status: StatusCode) -> Self {
        let location = location.into();
        Self::new()
            .with_status(status)
            .with_header("Location", location.clone())
            .with_content(Content::Text(location))
    }

    /// Last-resort 500 response that needs no provider.
    pub fn internal_error() -> Self {
        Self::text("Internal Server Error").with_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Append a header. Repeated names are kept, except `Content-Type`,
    /// which replaces the response's content type.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if is_content_type(&name) {
            self.assign_content_type(&value.into());
            return;
        }
        self.headers.push((name, value.into()));
    }

    /// Replace every header called `name` (case-insensitive) with one value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if is_content_type(&name) {
            self.assign_content_type(&value.into());
            return;
        }
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Split `text/plain; charset=latin1` into content type and charset.
    fn assign_content_type(&mut self, value: &str) {
        let mut parts = value.split(';');
        let mime = parts.next().unwrap_or_default().trim();
        if !mime.is_empty() {
            self.content_type = mime.to_string();
        }
        for param in parts {
            if let Some((key, charset)) = param.split_once('=') {
                if key.trim().eq_ignore_ascii_case("charset") {
                    self.charset = charset.trim().trim_matches('"').to_string();
                }
            }
        }
    }

    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    pub fn content_kind(&self) -> ContentKind {
        ContentKind::of(&self.content_type)
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn set_charset(&mut self, charset: impl Into<String>) {
        self.charset = charset.into();
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn set_content(&mut self, content: Content) {
        self.content = content;
    }

    pub fn take_content(&mut self) -> Content {
        std::mem::take(&mut self.content)
    }

    /// Final status, headers and body bytes for the transport.
    ///
    /// `set_cookies` are appended as `Set-Cookie` headers.
    pub fn into_emission(self, set_cookies: Vec<String>) -> Emission {
        let textual = ContentKind::of(&self.content_type).is_textual(&self.content_type);
        let (body, content_type) = if textual {
            let (body, charset) = encode_in_charset(self.content, &self.charset);
            (body, format!("{}; charset={}", self.content_type, charset))
        } else {
            (self.content.into_bytes(), self.content_type)
        };

        let mut headers = self.headers;
        headers.push(("Content-Type".to_string(), content_type));
        headers.extend(set_cookies.into_iter().map(|c| ("Set-Cookie".to_string(), c)));

        Emission {
            status: self.status,
            headers,
            body,
        }
    }
}

fn is_content_type(name: &str) -> bool {
    name.eq_ignore_ascii_case("content-type")
}

/// Body bytes in `charset`, and the charset label that matches them.
fn encode_in_charset(content: Content, charset: &str) -> (Vec<u8>, String) {
    if let Content::Bytes(bytes) = content {
        return (bytes, charset.to_string());
    }
    let Some(encoding) = Encoding::for_label(charset.trim().as_bytes()) else {
        tracing::warn!(charset = %charset, "Unknown charset, emitting utf-8");
        return (content.into_bytes(), DEFAULT_CHARSET.to_string());
    };
    if encoding == UTF_8 {
        return (content.into_bytes(), charset.to_string());
    }

    let text = content.into_text().unwrap_or_default();
    let (bytes, used, unmappable) = encoding.encode(&text);
    if unmappable {
        tracing::debug!(charset = %charset, "Unmappable characters written as numeric references");
    }
    // UTF-16 labels encode as UTF-8.
    let label = if used == encoding {
        charset.to_string()
    } else {
        used.name().to_ascii_lowercase()
    };
    (bytes.into_owned(), label)
}

/// The (status, headers, body) triple consumed by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Emission {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl IntoResponse for Emission {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for (name, value) in self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping invalid response header"),
            }
        }
        response
    }
}
