/*
 * reply.rs
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

//! Incremental SMTP reply parser (RFC 5321 §4.2).
//!
//! Replies are one or more `\d{3}[- ]text` lines; `-` marks a continuation
//! line, a space (or a bare three-digit line) terminates the reply. The
//! parser is fed raw socket bytes and pops complete replies; pipelined
//! callers pop as many replies as commands written.

use crate::error::{MailError, Result};

/// One complete server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    /// Text of each line, in order, without code or separator.
    pub lines: Vec<String>,
    /// The reply verbatim, lines joined with `\n` (CRLF stripped). Capability
    /// parsing consumes this form.
    blob: String,
}

impl Reply {
    /// 2xx.
    pub fn is_positive(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx (e.g. 354 after DATA, 334 SASL challenge).
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// 5xx.
    pub fn is_permanent_failure(&self) -> bool {
        self.code >= 500
    }

    /// All line texts joined with a space; for error messages.
    pub fn message(&self) -> String {
        self.lines.join(" ")
    }

    /// Text of the last line.
    pub fn last_line(&self) -> &str {
        self.lines.last().map(|s| s.as_str()).unwrap_or("")
    }

    pub fn blob(&self) -> &str {
        &self.blob
    }
}

/// Accumulates bytes and yields complete replies.
#[derive(Debug, Default)]
pub struct ReplyParser {
    buf: Vec<u8>,
    /// Raw lines of the reply being assembled.
    pending_raw: Vec<String>,
    pending_texts: Vec<String>,
    pending_code: Option<u16>,
}

impl ReplyParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw socket bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// True when buffered bytes remain unconsumed (an incomplete line or the
    /// start of an unrequested reply).
    pub fn has_buffered_input(&self) -> bool {
        !self.buf.is_empty() || self.pending_code.is_some()
    }

    /// Pop the next complete reply, or `None` when more bytes are needed.
    pub fn next_reply(&mut self) -> Result<Option<Reply>> {
        while let Some(line) = self.take_line() {
            if let Some(reply) = self.feed_line(&line)? {
                return Ok(Some(reply));
            }
        }
        Ok(None)
    }

    /// Extract one CRLF-terminated line from the buffer, without CRLF.
    fn take_line(&mut self) -> Option<String> {
        let end = self.buf.windows(2).position(|w| w == b"\r\n")?;
        let line: Vec<u8> = self.buf.drain(..end + 2).take(end).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    fn feed_line(&mut self, line: &str) -> Result<Option<Reply>> {
        if line.len() < 3 || !line.as_bytes()[..3].iter().all(u8::is_ascii_digit) {
            return Err(MailError::Protocol(format!("malformed reply line: {:?}", line)));
        }
        let code: u16 = line[..3]
            .parse()
            .map_err(|_| MailError::Protocol(format!("bad reply code in {:?}", line)))?;
        let (continuation, text) = match line.as_bytes().get(3) {
            None => (false, ""),
            Some(b'-') => (true, &line[4..]),
            Some(b' ') => (false, &line[4..]),
            Some(_) => {
                return Err(MailError::Protocol(format!(
                    "bad reply separator in {:?}",
                    line
                )))
            }
        };
        if let Some(pending) = self.pending_code {
            if pending != code {
                return Err(MailError::Protocol(format!(
                    "reply code changed mid-reply: {} then {}",
                    pending, code
                )));
            }
        } else {
            self.pending_code = Some(code);
        }
        self.pending_raw.push(line.to_string());
        self.pending_texts.push(text.to_string());
        if continuation {
            return Ok(None);
        }
        let reply = Reply {
            code,
            lines: std::mem::take(&mut self.pending_texts),
            blob: std::mem::take(&mut self.pending_raw).join("\n"),
        };
        self.pending_code = None;
        Ok(Some(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(input: &str) -> Reply {
        let mut parser = ReplyParser::new();
        parser.push(input.as_bytes());
        parser.next_reply().unwrap().unwrap()
    }

    #[test]
    fn single_line_reply() {
        let reply = parse_one("220 smtp.example.com ESMTP\r\n");
        assert_eq!(reply.code, 220);
        assert_eq!(reply.lines, vec!["smtp.example.com ESMTP"]);
        assert!(reply.is_positive());
    }

    #[test]
    fn multi_line_reply() {
        let reply = parse_one(
            "250-smtp.example.com Hello\r\n250-SIZE 10485760\r\n250-PIPELINING\r\n250 8BITMIME\r\n",
        );
        assert_eq!(reply.code, 250);
        assert_eq!(reply.lines.len(), 4);
        assert_eq!(
            reply.blob(),
            "250-smtp.example.com Hello\n250-SIZE 10485760\n250-PIPELINING\n250 8BITMIME"
        );
    }

    #[test]
    fn bare_code_terminates() {
        let reply = parse_one("250\r\n");
        assert_eq!(reply.code, 250);
        assert_eq!(reply.lines, vec![""]);
    }

    #[test]
    fn incremental_feed() {
        let mut parser = ReplyParser::new();
        parser.push(b"25");
        assert!(parser.next_reply().unwrap().is_none());
        parser.push(b"0-first\r\n250 se");
        assert!(parser.next_reply().unwrap().is_none());
        parser.push(b"cond\r\n");
        let reply = parser.next_reply().unwrap().unwrap();
        assert_eq!(reply.lines, vec!["first", "second"]);
    }

    #[test]
    fn two_pipelined_replies() {
        let mut parser = ReplyParser::new();
        parser.push(b"250 ok 1\r\n250 ok 2\r\n");
        let first = parser.next_reply().unwrap().unwrap();
        let second = parser.next_reply().unwrap().unwrap();
        assert_eq!(first.lines, vec!["ok 1"]);
        assert_eq!(second.lines, vec!["ok 2"]);
        assert!(parser.next_reply().unwrap().is_none());
    }

    #[test]
    fn code_change_mid_reply_is_protocol_error() {
        let mut parser = ReplyParser::new();
        parser.push(b"250-one\r\n550 two\r\n");
        assert!(parser.next_reply().is_err());
    }

    #[test]
    fn garbage_is_protocol_error() {
        let mut parser = ReplyParser::new();
        parser.push(b"hello world\r\n");
        assert!(parser.next_reply().is_err());
    }

    #[test]
    fn severity_helpers() {
        assert!(parse_one("354 go ahead\r\n").is_intermediate());
        assert!(parse_one("554 no\r\n").is_permanent_failure());
        assert!(!parse_one("220 hi\r\n").is_permanent_failure());
    }
}
