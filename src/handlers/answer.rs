//! Plivo answer URL
//!
//! Plivo requests this URL when a call is answered and executes the XML it
//! returns. The `<Stream>` element tells Plivo to open a bidirectional
//! media stream to our WebSocket route.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::state::AppState;

/// Answer handler
///
/// Accepts both GET and POST since Plivo can be configured to use either.
pub async fn answer_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let stream_url = state.config.stream_url(host);
    info!(%stream_url, "Answering call with media stream");

    let xml = stream_xml(&stream_url, &state.config.stream_content_type());
    ([(header::CONTENT_TYPE, "application/xml")], xml).into_response()
}

/// Build the Plivo XML that starts a bidirectional stream.
pub fn stream_xml(stream_url: &str, content_type: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "\n<Response>\n",
            r#"    <Stream bidirectional="true" keepCallAlive="true" contentType="{}">{}</Stream>"#,
            "\n</Response>\n"
        ),
        xml_escape(content_type),
        xml_escape(stream_url)
    )
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_xml() {
        let xml = stream_xml("wss://voice.example.com/stream", "audio/x-mulaw;rate=8000");
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(
            r#"<Stream bidirectional="true" keepCallAlive="true" contentType="audio/x-mulaw;rate=8000">wss://voice.example.com/stream</Stream>"#
        ));
        assert!(xml.trim_end().ends_with("</Response>"));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(
            xml_escape(r#"ws://h/s?a=1&b="2"<>'"#),
            "ws://h/s?a=1&amp;b=&quot;2&quot;&lt;&gt;&apos;"
        );
    }
}
