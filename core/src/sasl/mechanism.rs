/*
 * mechanism.rs
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

//! SASL mechanism names and metadata.

/// Supported SASL mechanisms (client-side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mechanism {
    /// PLAIN (RFC 4616) – requires TLS.
    Plain,
    /// Legacy LOGIN – requires TLS.
    Login,
    /// CRAM-MD5 (RFC 2195) – challenge-response.
    CramMd5,
    /// DIGEST-MD5 (RFC 2831) – challenge-response.
    DigestMd5,
    /// XOAUTH2 – OAuth2 bearer token (Gmail, Outlook). Single-shot.
    XOAuth2,
}

impl Mechanism {
    pub fn name(&self) -> &'static str {
        match self {
            Mechanism::Plain => "PLAIN",
            Mechanism::Login => "LOGIN",
            Mechanism::CramMd5 => "CRAM-MD5",
            Mechanism::DigestMd5 => "DIGEST-MD5",
            Mechanism::XOAuth2 => "XOAUTH2",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "PLAIN" => Some(Mechanism::Plain),
            "LOGIN" => Some(Mechanism::Login),
            "CRAM-MD5" => Some(Mechanism::CramMd5),
            "DIGEST-MD5" => Some(Mechanism::DigestMd5),
            "XOAUTH2" => Some(Mechanism::XOAuth2),
            _ => None,
        }
    }

    /// Mechanisms that send credentials without a digest and so should only
    /// run over TLS.
    pub fn requires_tls(&self) -> bool {
        matches!(self, Mechanism::Plain | Mechanism::Login | Mechanism::XOAuth2)
    }

    pub fn is_challenge_response(&self) -> bool {
        matches!(self, Mechanism::CramMd5 | Mechanism::DigestMd5)
    }

    /// Every mechanism, digest mechanisms first. This is the local
    /// preference order for password authentication; XOAUTH2 is only selected
    /// through its dedicated login policy.
    pub fn all() -> &'static [Mechanism] {
        &[
            Mechanism::DigestMd5,
            Mechanism::CramMd5,
            Mechanism::Plain,
            Mechanism::Login,
            Mechanism::XOAuth2,
        ]
    }

    /// Candidates for password-based login, in preference order.
    pub fn password_candidates() -> &'static [Mechanism] {
        &[
            Mechanism::DigestMd5,
            Mechanism::CramMd5,
            Mechanism::Plain,
            Mechanism::Login,
        ]
    }
}

impl std::fmt::Display for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_names() {
        for m in Mechanism::all() {
            assert_eq!(Mechanism::from_name(m.name()), Some(*m));
        }
        assert_eq!(Mechanism::from_name("cram-md5"), Some(Mechanism::CramMd5));
        assert_eq!(Mechanism::from_name("GSSAPI"), None);
    }

    #[test]
    fn digest_mechanisms_preferred() {
        let candidates = Mechanism::password_candidates();
        assert_eq!(candidates[0], Mechanism::DigestMd5);
        assert!(!candidates.contains(&Mechanism::XOAuth2));
    }
}
