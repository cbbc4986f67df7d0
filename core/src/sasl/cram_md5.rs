/*
 * cram_md5.rs
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

//! CRAM-MD5 (RFC 2195): respond to the server's timestamp challenge with
//! `username SP hex(HMAC-MD5(password, challenge))`.

use hmac::{Hmac, Mac};

use super::{bytes_to_hex, AuthMechanism, Credentials, SaslError};

type HmacMd5 = Hmac<md5::Md5>;

pub struct CramMd5Mechanism {
    username: String,
    password: String,
}

impl CramMd5Mechanism {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            username: credentials.username.clone(),
            password: credentials.secret.clone(),
        }
    }
}

impl AuthMechanism for CramMd5Mechanism {
    fn name(&self) -> &'static str {
        "CRAM-MD5"
    }

    fn initial_response(&mut self) -> Result<Option<Vec<u8>>, SaslError> {
        Ok(None)
    }

    fn next_step(&mut self, challenge: &[u8]) -> Result<Vec<u8>, SaslError> {
        let mut mac = HmacMd5::new_from_slice(self.password.as_bytes())
            .map_err(|_| SaslError::invalid("invalid HMAC key"))?;
        mac.update(challenge);
        let digest = mac.finalize().into_bytes();
        let response = format!("{} {}", self.username, bytes_to_hex(&digest));
        Ok(response.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 2195 §2 example: user "tim", password "tanstaaftanstaaf".
    #[test]
    fn rfc2195_example() {
        let mut m = CramMd5Mechanism::new(&Credentials {
            username: "tim".into(),
            secret: "tanstaaftanstaaf".into(),
        });
        let response = m
            .next_step(b"<1896.697170952@postoffice.reston.mci.net>")
            .unwrap();
        assert_eq!(
            String::from_utf8(response).unwrap(),
            "tim b913a602c7eda7a495b4e6e7334d3890"
        );
    }

    #[test]
    fn no_initial_response() {
        let mut m = CramMd5Mechanism::new(&Credentials {
            username: "u".into(),
            secret: "p".into(),
        });
        assert!(m.initial_response().unwrap().is_none());
    }
}
