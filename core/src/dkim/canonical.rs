/*
 * canonical.rs
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

//! RFC 6376 §3.4 canonicalization, `simple` and `relaxed`, for headers and
//! bodies.

use crate::config::Canonicalization;

fn is_wsp(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Canonicalize one header field to the form hashed into the signature,
/// without the trailing CRLF (the caller appends it for signed headers but
/// not for the `DKIM-Signature` header itself).
///
/// `simple` presents the header exactly as transmitted (`Name: Value`);
/// `relaxed` lowercases the name, unfolds continuations, collapses WSP runs
/// and trims, yielding `name:value`.
pub fn canonicalize_header(algo: Canonicalization, name: &str, value: &str) -> String {
    match algo {
        Canonicalization::Simple => format!("{}: {}", name, value),
        Canonicalization::Relaxed => {
            let mut out = String::with_capacity(name.len() + value.len() + 1);
            out.push_str(name.to_lowercase().trim());
            out.push(':');

            // Unfold: CRLF followed by WSP becomes a single space.
            let unfolded = value.replace("\r\n", "");
            let mut last_was_wsp = false;
            let mut body = String::with_capacity(unfolded.len());
            for c in unfolded.chars() {
                if c == ' ' || c == '\t' {
                    if !last_was_wsp {
                        body.push(' ');
                    }
                    last_was_wsp = true;
                } else {
                    body.push(c);
                    last_was_wsp = false;
                }
            }
            out.push_str(body.trim());
            out
        }
    }
}

/// Canonicalize a message body.
///
/// Both algorithms ignore trailing empty lines and guarantee a final CRLF on
/// a non-empty body. `simple` of an empty body is a lone CRLF; `relaxed` of
/// an empty body is empty.
pub fn canonicalize_body(algo: Canonicalization, body: &[u8]) -> Vec<u8> {
    let mut lines = split_lines(body);

    if algo == Canonicalization::Relaxed {
        for line in &mut lines {
            *line = reduce_wsp(line);
        }
    }

    while lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }

    if lines.is_empty() {
        return match algo {
            Canonicalization::Simple => b"\r\n".to_vec(),
            Canonicalization::Relaxed => Vec::new(),
        };
    }

    let mut out = Vec::with_capacity(body.len() + 2);
    for line in &lines {
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Split on CRLF; a trailing CRLF does not produce an empty final line.
fn split_lines(body: &[u8]) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + 1 < body.len() {
        if body[i] == b'\r' && body[i + 1] == b'\n' {
            lines.push(body[start..i].to_vec());
            start = i + 2;
            i += 2;
        } else {
            i += 1;
        }
    }
    if start < body.len() {
        lines.push(body[start..].to_vec());
    }
    lines
}

/// Collapse interior WSP runs to one space and strip trailing WSP.
fn reduce_wsp(line: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    let mut run = false;
    for &b in line {
        if is_wsp(b) {
            run = true;
        } else {
            if run && !out.is_empty() {
                out.push(b' ');
            }
            run = false;
            out.push(b);
        }
    }
    // A line of only WSP reduces to empty; leading WSP becomes one space
    // only when followed by content.
    if out.is_empty() {
        return out;
    }
    let leading_wsp = line.first().copied().map_or(false, is_wsp);
    if leading_wsp {
        let mut with_lead = Vec::with_capacity(out.len() + 1);
        with_lead.push(b' ');
        with_lead.extend_from_slice(&out);
        return with_lead;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use Canonicalization::{Relaxed, Simple};

    #[test]
    fn simple_header_is_verbatim() {
        assert_eq!(
            canonicalize_header(Simple, "Subject", "Hello  World "),
            "Subject: Hello  World "
        );
    }

    #[test]
    fn relaxed_header_lowercases_and_collapses() {
        assert_eq!(
            canonicalize_header(Relaxed, "SUBJECT", " Hello \t World  "),
            "subject:Hello World"
        );
    }

    #[test]
    fn relaxed_header_unfolds_continuations() {
        assert_eq!(
            canonicalize_header(Relaxed, "To", "a@example.com,\r\n\tb@example.com"),
            "to:a@example.com, b@example.com"
        );
    }

    // RFC 6376 §3.4.5 example, relaxed/relaxed side.
    #[test]
    fn rfc6376_relaxed_example() {
        assert_eq!(canonicalize_header(Relaxed, "A", " X\r\n"), "a:X");
        assert_eq!(canonicalize_header(Relaxed, "B ", " Y\t\r\n\tZ  \r\n"), "b:Y Z");
        let body = b" C \r\nD \t E\r\n\r\n\r\n";
        assert_eq!(canonicalize_body(Relaxed, body), b" C\r\nD E\r\n".to_vec());
    }

    // RFC 6376 §3.4.5 example, simple/simple side (body only).
    #[test]
    fn rfc6376_simple_example() {
        let body = b" C \r\nD \t E\r\n\r\n\r\n";
        assert_eq!(canonicalize_body(Simple, body), b" C \r\nD \t E\r\n".to_vec());
    }

    #[test]
    fn simple_body_empty_is_crlf() {
        assert_eq!(canonicalize_body(Simple, b""), b"\r\n".to_vec());
        assert_eq!(canonicalize_body(Simple, b"\r\n\r\n"), b"\r\n".to_vec());
    }

    #[test]
    fn relaxed_body_empty_is_empty() {
        assert_eq!(canonicalize_body(Relaxed, b""), Vec::<u8>::new());
        assert_eq!(canonicalize_body(Relaxed, b"\r\n \r\n\t\r\n"), Vec::<u8>::new());
    }

    #[test]
    fn body_without_trailing_crlf_gets_one() {
        assert_eq!(canonicalize_body(Simple, b"abc"), b"abc\r\n".to_vec());
        assert_eq!(canonicalize_body(Relaxed, b"abc"), b"abc\r\n".to_vec());
    }

    #[test]
    fn relaxed_body_is_idempotent() {
        let body = b"line  one \r\n\tline two\r\n\r\n";
        let once = canonicalize_body(Relaxed, body);
        let twice = canonicalize_body(Relaxed, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn simple_body_preserves_interior_empty_lines() {
        let body = b"a\r\n\r\nb\r\n\r\n\r\n";
        assert_eq!(canonicalize_body(Simple, body), b"a\r\n\r\nb\r\n".to_vec());
    }
}
