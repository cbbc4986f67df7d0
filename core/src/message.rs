/*
 * message.rs
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

//! Outgoing message envelope and send result.

use crate::mime::EncodedPart;

/// One message to submit: the envelope plus the externally encoded part
/// tree. Envelope addresses are bare `local@domain` forms.
pub struct MailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    /// Envelope sender for MAIL FROM when it differs from `from`.
    pub bounce_address: Option<String>,
    pub part: EncodedPart,
}

impl MailMessage {
    pub fn new(from: impl Into<String>, to: Vec<String>, part: EncodedPart) -> Self {
        Self {
            from: from.into(),
            to,
            cc: Vec::new(),
            bcc: Vec::new(),
            bounce_address: None,
            part,
        }
    }

    pub fn with_cc(mut self, cc: Vec<String>) -> Self {
        self.cc = cc;
        self
    }

    pub fn with_bcc(mut self, bcc: Vec<String>) -> Self {
        self.bcc = bcc;
        self
    }

    pub fn with_bounce_address(mut self, address: impl Into<String>) -> Self {
        self.bounce_address = Some(address.into());
        self
    }

    /// MAIL FROM sender: the bounce address when set, else `from`.
    pub fn envelope_sender(&self) -> &str {
        self.bounce_address.as_deref().unwrap_or(&self.from)
    }

    /// RCPT TO order: To, then Cc, then Bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .map(String::as_str)
    }
}

/// Outcome of a successful send.
#[derive(Debug, Clone)]
pub struct SendResult {
    /// Value of the message's `Message-ID` header, when present.
    pub message_id: Option<String>,
    /// Recipients the server accepted, in RCPT order.
    pub accepted_recipients: Vec<String>,
    /// Recipients rejected but skipped under `allow_rcpt_errors`, with the
    /// server's reply text.
    pub rejected_recipients: Vec<(String, String)>,
}
