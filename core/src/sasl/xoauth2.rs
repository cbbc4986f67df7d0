/*
 * xoauth2.rs
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

//! XOAUTH2 SASL mechanism for Gmail and Outlook submission.
//!
//! Single-shot: the initial client response is
//!
//! ```text
//! base64("user=" {user} "\x01" "auth=Bearer " {access_token} "\x01\x01")
//! ```
//!
//! On failure the server sends a JSON error blob as a 334 challenge; the
//! client answers with an empty line to collect the final 5xx.
//!
//! See <https://developers.google.com/gmail/imap/xoauth2-protocol>

use super::{AuthMechanism, Credentials, SaslError};

pub struct XOAuth2Mechanism {
    user: String,
    access_token: String,
}

impl XOAuth2Mechanism {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            user: credentials.username.clone(),
            access_token: credentials.secret.clone(),
        }
    }
}

impl AuthMechanism for XOAuth2Mechanism {
    fn name(&self) -> &'static str {
        "XOAUTH2"
    }

    fn initial_response(&mut self) -> Result<Option<Vec<u8>>, SaslError> {
        Ok(Some(
            format!(
                "user={}\x01auth=Bearer {}\x01\x01",
                self.user, self.access_token
            )
            .into_bytes(),
        ))
    }

    fn next_step(&mut self, _challenge: &[u8]) -> Result<Vec<u8>, SaslError> {
        // Error challenge: reply empty so the server issues its final status.
        Ok(Vec::new())
    }
}
