/*
 * mod.rs
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

//! SASL client mechanisms for SMTP AUTH: PLAIN, LOGIN, CRAM-MD5, DIGEST-MD5,
//! XOAUTH2.
//!
//! Every mechanism is a step machine behind [`AuthMechanism`]: an optional
//! initial response sent on the AUTH line itself, then one response per 334
//! challenge. Mechanisms produce and consume raw bytes; the SMTP layer owns
//! the base64 framing.

mod cram_md5;
mod digest_md5;
mod login;
mod mechanism;
mod plain;
mod xoauth2;

pub use cram_md5::CramMd5Mechanism;
pub use digest_md5::DigestMd5Mechanism;
pub use login::LoginMechanism;
pub use mechanism::Mechanism;
pub use plain::PlainMechanism;
pub use xoauth2::XOAuth2Mechanism;

/// SASL step error.
#[derive(Debug)]
pub struct SaslError {
    pub message: String,
}

impl SaslError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self { message: msg.into() }
    }
}

impl std::fmt::Display for SaslError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SaslError {}

/// Credentials for one authentication attempt. For XOAUTH2 the secret is the
/// OAuth2 access token.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

/// One SASL mechanism instance, scoped to a single AUTH exchange.
pub trait AuthMechanism: Send {
    /// Wire name (e.g. `CRAM-MD5`).
    fn name(&self) -> &'static str;

    /// Raw initial response to put on the `AUTH <name>` line, or `None` when
    /// the mechanism waits for the first challenge.
    fn initial_response(&mut self) -> Result<Option<Vec<u8>>, SaslError>;

    /// Respond to a decoded 334 challenge.
    fn next_step(&mut self, challenge: &[u8]) -> Result<Vec<u8>, SaslError>;
}

/// Instantiate a mechanism. `host` feeds DIGEST-MD5's digest-uri.
pub fn create_mechanism(
    mechanism: Mechanism,
    credentials: &Credentials,
    host: &str,
) -> Box<dyn AuthMechanism> {
    match mechanism {
        Mechanism::Plain => Box::new(PlainMechanism::new(credentials)),
        Mechanism::Login => Box::new(LoginMechanism::new(credentials)),
        Mechanism::CramMd5 => Box::new(CramMd5Mechanism::new(credentials)),
        Mechanism::DigestMd5 => Box::new(DigestMd5Mechanism::new(credentials, host)),
        Mechanism::XOAuth2 => Box::new(XOAuth2Mechanism::new(credentials)),
    }
}

pub(crate) fn bytes_to_hex(b: &[u8]) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut s = String::with_capacity(b.len() * 2);
    for &x in b {
        s.push(HEX[(x >> 4) as usize] as char);
        s.push(HEX[(x & 15) as usize] as char);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_names_match_wire_names() {
        let creds = Credentials {
            username: "user".into(),
            secret: "pass".into(),
        };
        for mechanism in Mechanism::all() {
            let m = create_mechanism(*mechanism, &creds, "mail.example.com");
            assert_eq!(m.name(), mechanism.name());
        }
    }

    #[test]
    fn hex_lowercase() {
        assert_eq!(bytes_to_hex(&[0x00, 0xab, 0xff]), "00abff");
    }
}
