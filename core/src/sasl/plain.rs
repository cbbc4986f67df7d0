/*
 * plain.rs
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

//! PLAIN SASL (RFC 4616). Requires TLS.

use super::{AuthMechanism, Credentials, SaslError};

/// PLAIN sends everything in the initial response:
/// NUL authzid NUL authcid NUL password (UTF-8), base64 on the wire.
pub struct PlainMechanism {
    authcid: String,
    password: String,
}

impl PlainMechanism {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            authcid: credentials.username.clone(),
            password: credentials.secret.clone(),
        }
    }
}

impl AuthMechanism for PlainMechanism {
    fn name(&self) -> &'static str {
        "PLAIN"
    }

    fn initial_response(&mut self) -> Result<Option<Vec<u8>>, SaslError> {
        Ok(Some(
            format!("\0{}\0{}", self.authcid, self.password).into_bytes(),
        ))
    }

    fn next_step(&mut self, _challenge: &[u8]) -> Result<Vec<u8>, SaslError> {
        Err(SaslError::invalid("PLAIN does not accept challenges"))
    }
}
