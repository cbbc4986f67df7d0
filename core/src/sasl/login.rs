/*
 * login.rs
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

//! Legacy LOGIN mechanism. Two challenges ("Username:", "Password:"),
//! answered in order. Requires TLS.

use super::{AuthMechanism, Credentials, SaslError};

pub struct LoginMechanism {
    username: String,
    password: String,
    username_sent: bool,
}

impl LoginMechanism {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            username: credentials.username.clone(),
            password: credentials.secret.clone(),
            username_sent: false,
        }
    }
}

impl AuthMechanism for LoginMechanism {
    fn name(&self) -> &'static str {
        "LOGIN"
    }

    fn initial_response(&mut self) -> Result<Option<Vec<u8>>, SaslError> {
        Ok(None)
    }

    fn next_step(&mut self, challenge: &[u8]) -> Result<Vec<u8>, SaslError> {
        // Servers vary in prompt wording; answer positionally but sanity-check
        // the prompt when it is recognizable.
        let prompt = String::from_utf8_lossy(challenge).to_lowercase();
        if !self.username_sent {
            if prompt.contains("password") {
                return Err(SaslError::invalid("LOGIN asked for password first"));
            }
            self.username_sent = true;
            Ok(self.username.clone().into_bytes())
        } else {
            Ok(self.password.clone().into_bytes())
        }
    }
}
