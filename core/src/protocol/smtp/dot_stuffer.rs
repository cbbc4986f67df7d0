/*
 * dot_stuffer.rs
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

//! Dot stuffing for SMTP DATA (RFC 5321 §4.5.2: lines starting with `.` get
//! an extra `.`), plus the `CRLF . CRLF` terminator.

/// Streaming dot-stuffer. Instead of walking byte by byte, each chunk is
/// forwarded in segments that run up to and including the next LF; the only
/// insertion is an extra `.` when a segment opens a line with one. The
/// message start counts as a line start, and a line starts after any LF
/// (message bodies are CRLF-normalized before they reach the wire).
pub struct DotStuffer {
    at_line_start: bool,
    /// Last two bytes forwarded; decides how the terminator is glued on.
    tail: [u8; 2],
}

impl Default for DotStuffer {
    fn default() -> Self {
        Self {
            at_line_start: true,
            tail: [0, 0],
        }
    }
}

impl DotStuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a chunk; `out` receives each slice to transmit.
    pub fn process_chunk<F>(&mut self, chunk: &[u8], mut out: F)
    where
        F: FnMut(&[u8]),
    {
        let mut rest = chunk;
        while !rest.is_empty() {
            if self.at_line_start && rest[0] == b'.' {
                out(b".");
            }
            let stop = match rest.iter().position(|&b| b == b'\n') {
                Some(lf) => {
                    self.at_line_start = true;
                    lf + 1
                }
                None => {
                    self.at_line_start = false;
                    rest.len()
                }
            };
            let (segment, remainder) = rest.split_at(stop);
            out(segment);
            self.remember(segment);
            rest = remainder;
        }
    }

    /// Emit the terminator, completing a dangling CR or supplying a missing
    /// CRLF first so the `.` always sits on its own line.
    pub fn end_message<F>(&mut self, mut out: F)
    where
        F: FnMut(&[u8]),
    {
        match self.tail {
            [b'\r', b'\n'] => out(b".\r\n"),
            [_, b'\r'] => out(b"\n.\r\n"),
            _ => out(b"\r\n.\r\n"),
        }
        self.at_line_start = true;
        self.tail = [0, 0];
    }

    fn remember(&mut self, segment: &[u8]) {
        match segment {
            [] => {}
            [only] => self.tail = [self.tail[1], *only],
            [.., prev, last] => self.tail = [*prev, *last],
        }
    }
}
