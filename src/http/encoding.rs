//! Content encoders.
//!
//! One encoder per content kind. An encoder turns raw content into the
//! safe form for that kind and leaves content that is already safe alone.

use crate::http::response::{Content, ContentKind, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    Html,
    Plain,
    Json,
}

impl Encoder {
    /// Encoder for a content kind, if any.
    pub fn for_kind(kind: ContentKind) -> Option<Self> {
        match kind {
            ContentKind::Html => Some(Encoder::Html),
            ContentKind::Plain => Some(Encoder::Plain),
            ContentKind::Json => Some(Encoder::Json),
            ContentKind::Other => None,
        }
    }

    pub fn encode(self, content: Content) -> Content {
        match (self, content) {
            (_, c @ (Content::Empty | Content::Safe(_) | Content::Bytes(_))) => c,
            (Encoder::Html, Content::Text(s)) => Content::Safe(escape_html(&s)),
            (Encoder::Html, Content::Json(v)) => Content::Safe(escape_html(&v.to_string())),
            (Encoder::Plain, Content::Text(s)) => Content::Safe(s),
            (Encoder::Plain, Content::Json(v)) => Content::Safe(v.to_string()),
            (Encoder::Json, Content::Json(v)) => Content::Safe(v.to_string()),
            (Encoder::Json, Content::Text(s)) => {
                Content::Safe(serde_json::Value::String(s).to_string())
            }
        }
    }
}

/// Encode the response body for its content type in place.
pub fn encode_response(response: &mut Response) {
    if let Some(encoder) = Encoder::for_kind(response.content_kind()) {
        let content = response.take_content();
        response.set_content(encoder.encode(content));
    }
}

/// Escape text for an HTML body or a quoted attribute, quotes included.
pub fn escape_html(input: &str) -> String {
    html_escape::encode_quoted_attribute(input).into_owned()
}
