/*
 * lib.rs
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

//! Postino: an asynchronous SMTP submission client with DKIM signing.
//!
//! The client speaks the RFC 5321 submission dialogue (EHLO, STARTTLS, SASL
//! AUTH, MAIL/RCPT/DATA, RSET, QUIT) over a bounded pool of keep-alive
//! connections, and can sign outgoing messages per RFC 6376 before
//! transmission. Message construction is external: the client consumes an
//! [`mime::EncodedPart`] tree produced by a MIME encoder.

pub mod client;
pub mod config;
pub mod dkim;
pub mod error;
pub mod message;
pub mod mime;
pub mod net;
pub mod protocol;
pub mod sasl;

pub use client::MailClient;
pub use config::{
    Canonicalization, DkimSignAlgorithm, DkimSignOptions, LoginOption, MailConfig, StartTlsOption,
    StreamCache,
};
pub use error::{ErrorKind, MailError};
pub use message::{MailMessage, SendResult};
