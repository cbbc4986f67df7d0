/*
 * mod.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Postino, an asynchronous SMTP submission client.
 *
 * Postino is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Postino is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Postino.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Encoded message model. The MIME encoder is an external collaborator; this
//! crate consumes its output: ordered headers plus either a body, a
//! restartable byte stream, or child parts with a boundary.

mod stream;

pub use stream::{write_message, write_part_body, MemoryStream, RestartableStream, SpooledStream};

use std::sync::Arc;

/// Content of one part. A tagged variant; downstream code dispatches on the
/// tag.
pub enum PartContent {
    /// Text body, already transfer-encoded by the encoder; emitted verbatim.
    Text(String),
    /// In-memory binary content; emitted as 76-character base64 lines.
    Binary(Vec<u8>),
    /// Restartable byte stream; emitted as 76-character base64 lines. Read
    /// twice when DKIM signing is enabled (body hash, then DATA).
    Stream(Arc<dyn RestartableStream>),
    /// Nested parts framed by the deterministic boundary.
    Multipart {
        boundary: String,
        children: Vec<EncodedPart>,
    },
}

/// One encoded MIME part: ordered header pairs plus content.
pub struct EncodedPart {
    /// Header name/value pairs in insertion order. Values may carry folded
    /// continuation lines (`\r\n` + WSP).
    pub headers: Vec<(String, String)>,
    pub content: PartContent,
}

impl EncodedPart {
    /// Leaf part with a text body. Line endings are normalized to CRLF once
    /// here, so every later pass (signing, transmission) sees identical
    /// bytes.
    pub fn leaf_text(headers: Vec<(String, String)>, body: impl Into<String>) -> Self {
        Self {
            headers,
            content: PartContent::Text(normalize_crlf(&body.into())),
        }
    }

    pub fn leaf_binary(headers: Vec<(String, String)>, content: Vec<u8>) -> Self {
        Self {
            headers,
            content: PartContent::Binary(content),
        }
    }

    pub fn leaf_stream(headers: Vec<(String, String)>, stream: Arc<dyn RestartableStream>) -> Self {
        Self {
            headers,
            content: PartContent::Stream(stream),
        }
    }

    pub fn multipart(
        headers: Vec<(String, String)>,
        boundary: impl Into<String>,
        children: Vec<EncodedPart>,
    ) -> Self {
        Self {
            headers,
            content: PartContent::Multipart {
                boundary: boundary.into(),
                children,
            },
        }
    }

    /// First value of the named header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of the named header, in appearance order.
    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Insert a header at the given position (used to prepend the
    /// `DKIM-Signature` headers in configuration order).
    pub fn insert_header(&mut self, index: usize, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(index, (name.into(), value.into()));
    }
}

/// Convert bare LF (and stray CR) line breaks to CRLF.
fn normalize_crlf(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                out.push_str("\r\n");
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' => out.push_str("\r\n"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_line_endings() {
        assert_eq!(normalize_crlf("a\nb"), "a\r\nb");
        assert_eq!(normalize_crlf("a\r\nb"), "a\r\nb");
        assert_eq!(normalize_crlf("a\rb"), "a\r\nb");
        assert_eq!(normalize_crlf("a\n"), "a\r\n");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let part = EncodedPart::leaf_text(
            vec![
                ("From".into(), "a@example.com".into()),
                ("Received".into(), "one".into()),
                ("Received".into(), "two".into()),
            ],
            "body",
        );
        assert_eq!(part.header("from"), Some("a@example.com"));
        let received: Vec<&str> = part.headers_named("received").collect();
        assert_eq!(received, vec!["one", "two"]);
        assert_eq!(part.header("subject"), None);
    }

    #[test]
    fn insert_header_prepends() {
        let mut part = EncodedPart::leaf_text(vec![("From".into(), "a@b".into())], "x");
        part.insert_header(0, "DKIM-Signature", "v=1");
        assert_eq!(part.headers[0].0, "DKIM-Signature");
        assert_eq!(part.headers[1].0, "From");
    }
}
