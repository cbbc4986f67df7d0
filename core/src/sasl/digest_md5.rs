/*
 * digest_md5.rs
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

//! DIGEST-MD5 (RFC 2831). Two rounds: digest-challenge → digest-response,
//! then response-auth (`rspauth`) → empty response. Only `qop=auth` is
//! implemented; integrity/confidentiality layers are not negotiated.

use md5::{Digest, Md5};
use rand::RngCore;

use super::{bytes_to_hex, AuthMechanism, Credentials, SaslError};

enum Step {
    Initial,
    /// Digest-response sent; expecting rspauth.
    Responded { expected_rspauth: String },
    Done,
}

pub struct DigestMd5Mechanism {
    username: String,
    password: String,
    /// For digest-uri: `smtp/<host>`.
    host: String,
    step: Step,
}

impl DigestMd5Mechanism {
    pub fn new(credentials: &Credentials, host: &str) -> Self {
        Self {
            username: credentials.username.clone(),
            password: credentials.secret.clone(),
            host: host.to_string(),
            step: Step::Initial,
        }
    }

    fn generate_cnonce() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes_to_hex(&bytes)
    }
}

impl AuthMechanism for DigestMd5Mechanism {
    fn name(&self) -> &'static str {
        "DIGEST-MD5"
    }

    fn initial_response(&mut self) -> Result<Option<Vec<u8>>, SaslError> {
        Ok(None)
    }

    fn next_step(&mut self, challenge: &[u8]) -> Result<Vec<u8>, SaslError> {
        match &self.step {
            Step::Initial => {
                let text = std::str::from_utf8(challenge)
                    .map_err(|_| SaslError::invalid("digest-challenge not UTF-8"))?;
                let directives = parse_directives(text);
                let nonce = directives
                    .iter()
                    .find(|(k, _)| k == "nonce")
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| SaslError::invalid("missing nonce in digest-challenge"))?;
                // First advertised realm, or empty.
                let realm = directives
                    .iter()
                    .find(|(k, _)| k == "realm")
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default();
                if let Some((_, qop)) = directives.iter().find(|(k, _)| k == "qop") {
                    if !qop.split(',').any(|q| q.trim() == "auth") {
                        return Err(SaslError::invalid("server does not offer qop=auth"));
                    }
                }

                let cnonce = Self::generate_cnonce();
                let nc = "00000001";
                let digest_uri = format!("smtp/{}", self.host);
                let response = compute_response(
                    &self.username,
                    &realm,
                    &self.password,
                    &nonce,
                    &cnonce,
                    nc,
                    &digest_uri,
                );
                let expected_rspauth = compute_rspauth(
                    &self.username,
                    &realm,
                    &self.password,
                    &nonce,
                    &cnonce,
                    nc,
                    &digest_uri,
                );

                let mut out = format!(
                    "charset=utf-8,username=\"{}\",",
                    self.username
                );
                if !realm.is_empty() {
                    out.push_str(&format!("realm=\"{}\",", realm));
                }
                out.push_str(&format!(
                    "nonce=\"{}\",nc={},cnonce=\"{}\",digest-uri=\"{}\",response={},qop=auth",
                    nonce, nc, cnonce, digest_uri, response
                ));

                self.step = Step::Responded { expected_rspauth };
                Ok(out.into_bytes())
            }
            Step::Responded { expected_rspauth } => {
                let text = std::str::from_utf8(challenge)
                    .map_err(|_| SaslError::invalid("response-auth not UTF-8"))?;
                let directives = parse_directives(text);
                let rspauth = directives
                    .iter()
                    .find(|(k, _)| k == "rspauth")
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| SaslError::invalid("missing rspauth in response-auth"))?;
                if rspauth != *expected_rspauth {
                    return Err(SaslError::invalid("rspauth mismatch"));
                }
                self.step = Step::Done;
                Ok(Vec::new())
            }
            Step::Done => Err(SaslError::invalid("DIGEST-MD5 exchange already complete")),
        }
    }
}

/// Parse `key=value` directives, values optionally quoted. Duplicate keys are
/// kept in order (realm may repeat).
fn parse_directives(input: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut rest = input.trim();
    while !rest.is_empty() {
        let eq = match rest.find('=') {
            Some(i) => i,
            None => break,
        };
        let key = rest[..eq].trim().to_ascii_lowercase();
        rest = &rest[eq + 1..];
        let value;
        if let Some(stripped) = rest.strip_prefix('"') {
            let end = stripped.find('"').unwrap_or(stripped.len());
            value = stripped[..end].to_string();
            rest = stripped.get(end + 1..).unwrap_or("");
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            value = rest[..end].trim().to_string();
            rest = rest.get(end..).unwrap_or("");
        }
        out.push((key, value));
        rest = rest.trim_start_matches(',').trim_start();
    }
    out
}

fn md5_raw(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// HEX(H(A1)) per RFC 2831 §2.1.2.1: A1 is the raw 16-byte
/// H(user:realm:pass) concatenated with `:nonce:cnonce`.
fn ha1_hex(username: &str, realm: &str, password: &str, nonce: &str, cnonce: &str) -> String {
    let inner = md5_raw(format!("{}:{}:{}", username, realm, password).as_bytes());
    let mut a1 = Vec::with_capacity(16 + nonce.len() + cnonce.len() + 2);
    a1.extend_from_slice(&inner);
    a1.extend_from_slice(format!(":{}:{}", nonce, cnonce).as_bytes());
    bytes_to_hex(&md5_raw(&a1))
}

fn response_hex(ha1: &str, nonce: &str, nc: &str, cnonce: &str, ha2: &str) -> String {
    let kd = format!("{}:{}:{}:{}:auth:{}", ha1, nonce, nc, cnonce, ha2);
    bytes_to_hex(&md5_raw(kd.as_bytes()))
}

/// digest-response `response=` value (A2 = "AUTHENTICATE:" digest-uri).
fn compute_response(
    username: &str,
    realm: &str,
    password: &str,
    nonce: &str,
    cnonce: &str,
    nc: &str,
    digest_uri: &str,
) -> String {
    let ha1 = ha1_hex(username, realm, password, nonce, cnonce);
    let ha2 = bytes_to_hex(&md5_raw(format!("AUTHENTICATE:{}", digest_uri).as_bytes()));
    response_hex(&ha1, nonce, nc, cnonce, &ha2)
}

/// Expected `rspauth=` value (A2 = ":" digest-uri).
fn compute_rspauth(
    username: &str,
    realm: &str,
    password: &str,
    nonce: &str,
    cnonce: &str,
    nc: &str,
    digest_uri: &str,
) -> String {
    let ha1 = ha1_hex(username, realm, password, nonce, cnonce);
    let ha2 = bytes_to_hex(&md5_raw(format!(":{}", digest_uri).as_bytes()));
    response_hex(&ha1, nonce, nc, cnonce, &ha2)
}
