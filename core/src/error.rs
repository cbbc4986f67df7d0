/*
 * error.rs
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

//! Client errors. Every error carries a stable [`ErrorKind`] so callers and
//! tests can match on the failure class without string comparison.

use std::io;

use thiserror::Error;

/// Stable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or inconsistent configuration (includes DKIM option validation).
    ConfigInvalid,
    /// TCP or TLS connect error.
    ConnectFailed,
    /// Non-2xx or malformed server greeting.
    GreetingFailed,
    /// STARTTLS required but not offered by the server.
    TlsRequired,
    /// No usable SASL mechanism, or every candidate was rejected.
    AuthFailed,
    /// Non-2xx reply to MAIL FROM.
    SenderRejected,
    /// Every recipient was rejected (or any, when rcpt errors are not allowed).
    RecipientRejected,
    /// Message exceeds the server-advertised SIZE.
    MessageTooLarge,
    /// Non-3xx to DATA, or non-2xx after the terminating dot.
    DataRejected,
    /// Socket or stream failure while transmitting the message body.
    BodyWriteFailed,
    /// DKIM private key could not be decoded or signature init failed.
    DkimKeyInvalid,
    /// DKIM hashing or signing failed.
    DkimSignFailure,
    /// The pool has been closed.
    PoolClosed,
    /// Pool acquisition timed out.
    PoolAcquireTimeout,
    /// A reply arrived while no command was awaiting one.
    UnexpectedReply,
    /// Malformed reply or other protocol violation.
    Protocol,
    /// Underlying socket I/O error outside the DATA phase.
    Io,
}

/// Error type for all client operations.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("connect failed: {0}")]
    ConnectFailed(#[source] io::Error),

    #[error("greeting failed: {0}")]
    GreetingFailed(String),

    #[error("STARTTLS required but not supported by server")]
    TlsRequired,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("sender rejected: {code} {message}")]
    SenderRejected { code: u16, message: String },

    #[error("recipients rejected: {code} {message}")]
    RecipientRejected { code: u16, message: String },

    #[error("message size {size} exceeds server limit {limit}")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("DATA rejected: {code} {message}")]
    DataRejected { code: u16, message: String },

    #[error("body write failed: {0}")]
    BodyWriteFailed(#[source] io::Error),

    #[error("invalid DKIM key: {0}")]
    DkimKeyInvalid(String),

    #[error("DKIM signing failed: {0}")]
    DkimSignFailure(String),

    #[error("connection pool closed")]
    PoolClosed,

    #[error("timed out waiting for a pooled connection")]
    PoolAcquireTimeout,

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl MailError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MailError::ConfigInvalid(_) => ErrorKind::ConfigInvalid,
            MailError::ConnectFailed(_) => ErrorKind::ConnectFailed,
            MailError::GreetingFailed(_) => ErrorKind::GreetingFailed,
            MailError::TlsRequired => ErrorKind::TlsRequired,
            MailError::AuthFailed(_) => ErrorKind::AuthFailed,
            MailError::SenderRejected { .. } => ErrorKind::SenderRejected,
            MailError::RecipientRejected { .. } => ErrorKind::RecipientRejected,
            MailError::MessageTooLarge { .. } => ErrorKind::MessageTooLarge,
            MailError::DataRejected { .. } => ErrorKind::DataRejected,
            MailError::BodyWriteFailed(_) => ErrorKind::BodyWriteFailed,
            MailError::DkimKeyInvalid(_) => ErrorKind::DkimKeyInvalid,
            MailError::DkimSignFailure(_) => ErrorKind::DkimSignFailure,
            MailError::PoolClosed => ErrorKind::PoolClosed,
            MailError::PoolAcquireTimeout => ErrorKind::PoolAcquireTimeout,
            MailError::UnexpectedReply(_) => ErrorKind::UnexpectedReply,
            MailError::Protocol(_) => ErrorKind::Protocol,
            MailError::Io(_) => ErrorKind::Io,
        }
    }

    /// True when the error means the connection can no longer be trusted and
    /// must be evicted from the pool. Application-level rejections leave the
    /// session consistent; the connection is recycled after those.
    pub fn is_connection_fatal(&self) -> bool {
        match self.kind() {
            ErrorKind::SenderRejected
            | ErrorKind::RecipientRejected
            | ErrorKind::MessageTooLarge
            | ErrorKind::DataRejected
            | ErrorKind::ConfigInvalid
            | ErrorKind::DkimKeyInvalid
            | ErrorKind::DkimSignFailure => false,
            _ => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, MailError>;
