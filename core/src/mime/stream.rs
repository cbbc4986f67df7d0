/*
 * stream.rs
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

//! Wire serialization of an encoded part tree, and restartable byte sources.
//!
//! The DKIM signer and the DATA phase both consume [`write_part_body`], so
//! the hashed byte sequence is the transmitted byte sequence by
//! construction. Attachments are emitted as 76-character base64 lines fed
//! from 57-byte chunks of the raw source (RFC 5322 §2.1.1 line limits).

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::config::StreamCache;
use crate::mime::{EncodedPart, PartContent};

/// Raw bytes per base64 line: 57 bytes encode to 76 characters.
const BASE64_LINE_INPUT: usize = 57;

/// A byte source that can be opened any number of times, each open yielding
/// the full content from the start. DKIM signing reads an attachment once
/// for the body hash and once more for transmission.
pub trait RestartableStream: Send + Sync {
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;
}

/// In-memory restartable source.
pub struct MemoryStream {
    content: Vec<u8>,
}

impl MemoryStream {
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }
}

impl RestartableStream for MemoryStream {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.content.clone())))
    }
}

/// Makes a one-shot reader restartable by draining it into a cache up front:
/// memory by default, or a temporary file (prefix `postino-spool-`, removed
/// on drop) when the config flag selects the file cache.
pub struct SpooledStream {
    cache: SpoolCache,
}

enum SpoolCache {
    Memory(Vec<u8>),
    // File handle kept open so the spool survives even if the path is
    // unlinked; Mutex because open() rewinds a shared handle to clone it.
    File(Mutex<File>),
}

impl SpooledStream {
    /// Drain `source` into the selected cache.
    pub fn cache(mut source: impl Read, mode: StreamCache) -> io::Result<Self> {
        match mode {
            StreamCache::Memory => {
                let mut content = Vec::new();
                source.read_to_end(&mut content)?;
                Ok(Self {
                    cache: SpoolCache::Memory(content),
                })
            }
            StreamCache::TempFile => {
                let mut spool = tempfile::Builder::new()
                    .prefix("postino-spool-")
                    .tempfile()?;
                io::copy(&mut source, &mut spool)?;
                spool.flush()?;
                // Keep only the handle; the path entry is removed now and
                // the data lives until the handle is dropped.
                let file = spool.into_file();
                Ok(Self {
                    cache: SpoolCache::File(Mutex::new(file)),
                })
            }
        }
    }
}

impl RestartableStream for SpooledStream {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        match &self.cache {
            SpoolCache::Memory(content) => Ok(Box::new(Cursor::new(content.clone()))),
            SpoolCache::File(file) => {
                let mut guard = file.lock().expect("spool lock");
                guard.seek(SeekFrom::Start(0))?;
                let mut clone = guard.try_clone()?;
                clone.seek(SeekFrom::Start(0))?;
                Ok(Box::new(clone))
            }
        }
    }
}

/// Emit the complete message for one part: headers, blank separator, body.
pub fn write_message<F>(part: &EncodedPart, out: &mut F) -> io::Result<()>
where
    F: FnMut(&[u8]),
{
    write_headers(part, out);
    out(b"\r\n");
    write_part_body(part, out)
}

fn write_headers<F>(part: &EncodedPart, out: &mut F)
where
    F: FnMut(&[u8]),
{
    for (name, value) in &part.headers {
        out(name.as_bytes());
        out(b": ");
        out(value.as_bytes());
        out(b"\r\n");
    }
}

/// Emit the body of a part exactly as it goes on the wire (pre dot-stuffing).
///
/// Leaf text is emitted verbatim; binary and stream content as base64 lines.
/// A multipart emits, per child, `--boundary CRLF`, the child's headers and
/// blank line, the child's body, and a CRLF, closing with `--boundary-- CRLF`.
pub fn write_part_body<F>(part: &EncodedPart, out: &mut F) -> io::Result<()>
where
    F: FnMut(&[u8]),
{
    match &part.content {
        PartContent::Text(body) => {
            out(body.as_bytes());
            Ok(())
        }
        PartContent::Binary(content) => {
            write_base64_lines(&mut content.as_slice(), out)
        }
        PartContent::Stream(stream) => {
            let mut reader = stream.open()?;
            write_base64_lines(&mut reader, out)
        }
        PartContent::Multipart { boundary, children } => {
            for child in children {
                out(b"--");
                out(boundary.as_bytes());
                out(b"\r\n");
                write_headers(child, out);
                out(b"\r\n");
                write_part_body(child, out)?;
                out(b"\r\n");
            }
            out(b"--");
            out(boundary.as_bytes());
            out(b"--\r\n");
            Ok(())
        }
    }
}

/// Read 57-byte chunks and emit one 76-character base64 line per chunk.
fn write_base64_lines<F>(reader: &mut dyn Read, out: &mut F) -> io::Result<()>
where
    F: FnMut(&[u8]),
{
    let mut chunk = [0u8; BASE64_LINE_INPUT];
    loop {
        let mut filled = 0;
        while filled < chunk.len() {
            let n = reader.read(&mut chunk[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(());
        }
        let line = BASE64.encode(&chunk[..filled]);
        out(line.as_bytes());
        out(b"\r\n");
        if filled < chunk.len() {
            return Ok(());
        }
    }
}
