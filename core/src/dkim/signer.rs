/*
 * signer.rs
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

//! DKIM signer (RFC 6376): body hash over the wire byte sequence, tag-list
//! construction, and the RSA header signature.
//!
//! The body hash consumes the same serialization the DATA phase transmits
//! (pre dot-stuffing), so signed bytes and wire bytes cannot drift apart.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::{DkimSignAlgorithm, DkimSignOptions};
use crate::dkim::canonical::{canonicalize_body, canonicalize_header};
use crate::dkim::qp::dkim_quoted_printable;
use crate::error::{MailError, Result};
use crate::mime::{write_part_body, EncodedPart};

/// Signer for one [`DkimSignOptions`] entry. Construction validates the
/// options and decodes the private key; signing is then infallible except
/// for stream I/O.
#[derive(Debug)]
pub struct DkimSigner {
    options: DkimSignOptions,
    private_key: RsaPrivateKey,
}

impl DkimSigner {
    pub fn new(options: DkimSignOptions) -> Result<Self> {
        options.validate()?;
        let private_key = load_private_key(&options.private_key_pkcs8)?;
        debug!(sdid = %options.sdid, selector = %options.selector, "DKIM signer ready");
        Ok(Self {
            options,
            private_key,
        })
    }

    pub fn options(&self) -> &DkimSignOptions {
        &self.options
    }

    /// Produce the `DKIM-Signature` header value for this message. The
    /// caller inserts it at the top of the headers before transmission.
    pub fn sign(&self, part: &EncodedPart) -> Result<String> {
        let bh = self.body_hash(part)?;
        let now = Utc::now().timestamp();
        let tag_list = self.build_tag_list(part, &bh, now);
        let signing_input = self.signing_input(part, &tag_list);
        let signature = self.rsa_sign(&signing_input)?;
        Ok(format!("{}{}", tag_list, BASE64.encode(signature)))
    }

    /// `bh=`: hash of the canonicalized body, truncated to `body_limit`
    /// bytes when configured.
    fn body_hash(&self, part: &EncodedPart) -> Result<String> {
        let mut body = Vec::new();
        write_part_body(part, &mut |b: &[u8]| body.extend_from_slice(b))
            .map_err(|e| MailError::DkimSignFailure(format!("body stream failed: {}", e)))?;
        let mut canonical = canonicalize_body(self.options.body_canonic, &body);
        if self.options.body_limit >= 0 {
            canonical.truncate(self.options.body_limit as usize);
        }
        Ok(BASE64.encode(self.digest(&canonical)))
    }

    /// Tag list in fixed order, every tag terminated by `"; "`, ending with
    /// the empty `b=` the signature is appended to.
    fn build_tag_list(&self, part: &EncodedPart, bh: &str, now: i64) -> String {
        let o = &self.options;
        let mut tags = String::new();
        tags.push_str("v=1; ");
        tags.push_str(&format!("a={}; ", o.sign_algo.dkim_name()));
        tags.push_str(&format!(
            "c={}/{}; ",
            o.header_canonic.dkim_name(),
            o.body_canonic.dkim_name()
        ));
        tags.push_str(&format!("d={}; ", dkim_quoted_printable(&o.sdid, false)));
        if let Some(auid) = &o.auid {
            tags.push_str(&format!("i={}; ", dkim_quoted_printable(auid, false)));
        }
        tags.push_str(&format!("s={}; ", dkim_quoted_printable(&o.selector, false)));
        tags.push_str(&format!("h={}; ", o.signed_headers.join(":")));
        if o.body_limit > 0 {
            tags.push_str(&format!("l={}; ", o.body_limit));
        }
        if o.signature_timestamp || o.expire_seconds > 0 {
            tags.push_str(&format!("t={}; ", now));
        }
        if o.expire_seconds > 0 {
            tags.push_str(&format!("x={}; ", now + o.expire_seconds));
        }
        if !o.copied_headers.is_empty() {
            let copies: Vec<String> = o
                .copied_headers
                .iter()
                .filter_map(|name| {
                    part.header(name)
                        .map(|value| format!("{}:{}", name, dkim_quoted_printable(value, true)))
                })
                .collect();
            if !copies.is_empty() {
                tags.push_str(&format!("z={}; ", copies.join("|")));
            }
        }
        tags.push_str(&format!("bh={}; ", bh));
        tags.push_str("b=");
        tags
    }

    /// Bytes the RSA signature covers: each signed header canonicalized and
    /// CRLF-terminated, in `h=` order (all occurrences, appearance order;
    /// absent headers contribute nothing), then the canonicalized
    /// `DKIM-Signature` header with empty `b=` and no trailing CRLF.
    fn signing_input(&self, part: &EncodedPart, tag_list: &str) -> Vec<u8> {
        let algo = self.options.header_canonic;
        let mut input = Vec::new();
        for signed_name in &self.options.signed_headers {
            for (name, value) in part
                .headers
                .iter()
                .filter(|(n, _)| n.eq_ignore_ascii_case(signed_name))
            {
                input.extend_from_slice(canonicalize_header(algo, name, value).as_bytes());
                input.extend_from_slice(b"\r\n");
            }
        }
        input.extend_from_slice(
            canonicalize_header(algo, "DKIM-Signature", tag_list).as_bytes(),
        );
        input
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self.options.sign_algo {
            DkimSignAlgorithm::RsaSha1 => Sha1::digest(data).to_vec(),
            DkimSignAlgorithm::RsaSha256 => Sha256::digest(data).to_vec(),
        }
    }

    fn rsa_sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let digest = self.digest(data);
        let padding = match self.options.sign_algo {
            DkimSignAlgorithm::RsaSha1 => Pkcs1v15Sign::new::<Sha1>(),
            DkimSignAlgorithm::RsaSha256 => Pkcs1v15Sign::new::<Sha256>(),
        };
        self.private_key
            .sign(padding, &digest)
            .map_err(|e| MailError::DkimSignFailure(e.to_string()))
    }
}

/// Decode a PKCS#8 private key from DER or PEM bytes; PKCS#1 PEM is accepted
/// as a fallback for keys generated by older openssl.
fn load_private_key(bytes: &[u8]) -> Result<RsaPrivateKey> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        if text.contains("-----BEGIN") {
            return RsaPrivateKey::from_pkcs8_pem(text)
                .or_else(|_| RsaPrivateKey::from_pkcs1_pem(text))
                .map_err(|e| MailError::DkimKeyInvalid(e.to_string()));
        }
    }
    RsaPrivateKey::from_pkcs8_der(bytes).map_err(|e| MailError::DkimKeyInvalid(e.to_string()))
}
