/*
 * connection.rs
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

//! One SMTP connection: socket lifecycle, command/reply framing, pipelined
//! command groups, in-place TLS upgrade, QUIT and hard shutdown.
//!
//! Commands are strictly serialized: every write awaits exactly its replies
//! before the next write, which `&mut self` enforces at compile time. A
//! complete reply sitting in the buffer when no command is in flight is an
//! `UnexpectedReply` error and poisons the connection.

use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace};

use crate::error::{MailError, Result};
use crate::net::{connect_implicit_tls, connect_plain, PlainStream, TlsStreamWrapper};
use crate::protocol::smtp::capabilities::Capabilities;
use crate::protocol::smtp::reply::{Reply, ReplyParser};

/// Connection lifecycle. Fresh→Handshaking→Ready happens exactly once; after
/// that the connection alternates InUse↔Ready until QuitSent→Closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Fresh,
    Handshaking,
    Ready,
    InUse,
    QuitSent,
    Closed,
}

#[derive(Debug)]
enum SmtpStream {
    Plain(PlainStream),
    Tls(TlsStreamWrapper),
}

#[derive(Debug)]
pub struct SmtpConnection {
    stream: Option<SmtpStream>,
    parser: ReplyParser,
    state: ConnState,
    quit_sent: bool,
    is_shutdown: bool,
    /// Idle deadline; `None` means no TTL.
    expiration: Option<Instant>,
    pub(crate) capabilities: Capabilities,
    host: String,
    trust_all: bool,
    id: u64,
}

impl SmtpConnection {
    /// Open a TCP (or implicit-TLS) connection. No protocol bytes are
    /// exchanged yet; the greeting is read by the starter.
    pub async fn open(host: &str, port: u16, ssl: bool, trust_all: bool, id: u64) -> Result<Self> {
        let stream = if ssl {
            SmtpStream::Tls(
                connect_implicit_tls(host, port, trust_all)
                    .await
                    .map_err(MailError::ConnectFailed)?,
            )
        } else {
            SmtpStream::Plain(
                connect_plain(host, port)
                    .await
                    .map_err(MailError::ConnectFailed)?,
            )
        };
        debug!(id, host, port, ssl, "smtp connection opened");
        Ok(Self {
            stream: Some(stream),
            parser: ReplyParser::new(),
            state: ConnState::Fresh,
            quit_sent: false,
            is_shutdown: false,
            expiration: None,
            capabilities: Capabilities::default(),
            host: host.to_string(),
            trust_all,
            id,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn set_state(&mut self, state: ConnState) {
        self.state = state;
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_tls(&self) -> bool {
        matches!(self.stream, Some(SmtpStream::Tls(_)))
    }

    /// A connection is valid while no QUIT has been sent and its idle TTL
    /// has not elapsed.
    pub fn is_valid(&self) -> bool {
        if self.quit_sent || self.is_shutdown {
            return false;
        }
        match self.expiration {
            None => true,
            Some(deadline) => Instant::now() <= deadline,
        }
    }

    /// Arm (or clear) the idle TTL; called when the connection goes back to
    /// the pool.
    pub fn refresh_expiration(&mut self, ttl: Option<Duration>) {
        self.expiration = ttl.map(|t| Instant::now() + t);
    }

    async fn read_some(&mut self) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| MailError::Protocol("connection is closed".into()))?;
        let mut buf = [0u8; 4096];
        let res = match stream {
            SmtpStream::Plain(s) => s.read(&mut buf).await,
            SmtpStream::Tls(s) => s.read(&mut buf).await,
        };
        let n = res.map_err(|e| self.fail(MailError::Io(e)))?;
        if n == 0 {
            return Err(self.fail(MailError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            ))));
        }
        self.parser.push(&buf[..n]);
        Ok(())
    }

    /// Read exactly one reply. Used for the greeting and after each command.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        loop {
            match self.parser.next_reply() {
                Ok(Some(reply)) => {
                    trace!(id = self.id, code = reply.code, "S: {}", reply.blob());
                    return Ok(reply);
                }
                Ok(None) => self.read_some().await?,
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    async fn write_all_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| MailError::Protocol("connection is closed".into()))?;
        let res = match stream {
            SmtpStream::Plain(s) => s.write_all(bytes).await,
            SmtpStream::Tls(s) => s.write_all(bytes).await,
        };
        res.map_err(|e| self.fail(MailError::Io(e)))
    }

    async fn flush_raw(&mut self) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| MailError::Protocol("connection is closed".into()))?;
        let res = match stream {
            SmtpStream::Plain(s) => s.flush().await,
            SmtpStream::Tls(s) => s.flush().await,
        };
        res.map_err(|e| self.fail(MailError::Io(e)))
    }

    /// A reply buffered while no command is in flight means the server and
    /// client have lost sync.
    fn check_no_stray_reply(&mut self) -> Result<()> {
        match self.parser.next_reply() {
            Ok(Some(reply)) if !self.quit_sent => {
                let err = MailError::UnexpectedReply(reply.blob().to_string());
                Err(self.fail(err))
            }
            Err(e) => Err(self.fail(e)),
            _ => Ok(()),
        }
    }

    /// Write one command line and await its reply. `mask_from` redacts the
    /// line from that character index in the debug log (credentials).
    pub async fn command(&mut self, line: &str, mask_from: Option<usize>) -> Result<Reply> {
        self.check_no_stray_reply()?;
        debug!(id = self.id, "C: {}", mask(line, mask_from));
        self.write_all_raw(line.as_bytes()).await?;
        self.write_all_raw(b"\r\n").await?;
        self.flush_raw().await?;
        self.read_reply().await
    }

    /// PIPELINING: write all lines as one payload, then read one reply per
    /// line, matched positionally. The caller must have checked the
    /// capability.
    pub async fn pipeline_commands(&mut self, lines: &[String]) -> Result<Vec<Reply>> {
        self.check_no_stray_reply()?;
        let mut payload = String::with_capacity(lines.iter().map(|l| l.len() + 2).sum());
        for line in lines {
            debug!(id = self.id, "C: {}", line);
            payload.push_str(line);
            payload.push_str("\r\n");
        }
        self.write_all_raw(payload.as_bytes()).await?;
        self.flush_raw().await?;
        let mut replies = Vec::with_capacity(lines.len());
        for _ in lines {
            replies.push(self.read_reply().await?);
        }
        Ok(replies)
    }

    /// Raw body bytes during DATA; failures are `BodyWriteFailed`.
    pub async fn write_body_chunk(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all_raw(bytes).await.map_err(|e| match e {
            MailError::Io(io) => MailError::BodyWriteFailed(io),
            other => other,
        })
    }

    pub async fn flush_body(&mut self) -> Result<()> {
        self.flush_raw().await.map_err(|e| match e {
            MailError::Io(io) => MailError::BodyWriteFailed(io),
            other => other,
        })
    }

    /// In-place STARTTLS upgrade. The 220 reply to STARTTLS must already be
    /// consumed; no plaintext bytes may remain buffered.
    pub async fn upgrade_tls(&mut self) -> Result<()> {
        if self.parser.has_buffered_input() {
            return Err(self.fail(MailError::Protocol(
                "plaintext bytes buffered across STARTTLS".into(),
            )));
        }
        match self.stream.take() {
            Some(SmtpStream::Plain(plain)) => {
                match plain.upgrade_to_tls(&self.host, self.trust_all).await {
                    Ok(tls) => {
                        debug!(id = self.id, "TLS established");
                        self.stream = Some(SmtpStream::Tls(tls));
                        Ok(())
                    }
                    Err(e) => {
                        self.is_shutdown = true;
                        self.state = ConnState::Closed;
                        Err(MailError::ConnectFailed(e))
                    }
                }
            }
            Some(tls @ SmtpStream::Tls(_)) => {
                self.stream = Some(tls);
                Err(MailError::Protocol("connection is already TLS".into()))
            }
            None => Err(MailError::Protocol("connection is closed".into())),
        }
    }

    /// RSET before reusing a pooled connection.
    pub async fn rset(&mut self) -> Result<()> {
        let reply = self.command("RSET", None).await?;
        if reply.is_positive() {
            Ok(())
        } else {
            Err(MailError::Protocol(format!(
                "RSET failed: {} {}",
                reply.code,
                reply.message()
            )))
        }
    }

    /// Polite close: QUIT, best-effort read of the goodbye, then shutdown.
    /// Completes regardless of what the peer does.
    pub async fn quit_close(&mut self) {
        if !self.quit_sent && !self.is_shutdown {
            self.quit_sent = true;
            self.state = ConnState::QuitSent;
            debug!(id = self.id, "C: QUIT");
            let quit_ok = self.write_all_raw(b"QUIT\r\n").await.is_ok()
                && self.flush_raw().await.is_ok();
            if quit_ok {
                let _ = self.read_reply().await;
            }
        }
        self.shutdown().await;
    }

    /// Hard close of the socket. Idempotent.
    pub async fn shutdown(&mut self) {
        if self.is_shutdown {
            return;
        }
        self.is_shutdown = true;
        self.state = ConnState::Closed;
        if let Some(stream) = self.stream.as_mut() {
            let _ = match stream {
                SmtpStream::Plain(s) => s.shutdown().await,
                SmtpStream::Tls(s) => s.shutdown().await,
            };
        }
        self.stream = None;
        debug!(id = self.id, "connection shut down");
    }

    /// Mark broken and hand the error back; socket errors always poison the
    /// connection.
    fn fail(&mut self, err: MailError) -> MailError {
        self.is_shutdown = true;
        self.state = ConnState::Closed;
        self.stream = None;
        err
    }
}

/// Redact a command line from `mask_from` for logging.
fn mask(line: &str, mask_from: Option<usize>) -> String {
    match mask_from {
        Some(idx) if line.len() > idx => format!("{}***", &line[..idx]),
        _ => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_redacts_tail() {
        assert_eq!(mask("AUTH PLAIN AGZvbwBiYXI=", Some(11)), "AUTH PLAIN ***");
        assert_eq!(mask("AUTH CRAM-MD5", None), "AUTH CRAM-MD5");
        assert_eq!(mask("EHLO x", Some(100)), "EHLO x");
    }
}
