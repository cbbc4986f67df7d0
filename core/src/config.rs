/*
 * config.rs
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

//! Client and DKIM configuration records. Immutable after the client is
//! constructed; validation happens in [`MailConfig::validate`] and
//! [`DkimSignOptions::validate`].

use crate::error::{MailError, Result};

/// STARTTLS negotiation policy for plain connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartTlsOption {
    /// Never issue STARTTLS.
    Disabled,
    /// Upgrade when the server advertises the capability.
    #[default]
    Optional,
    /// Fail with `TlsRequired` unless the upgrade succeeds.
    Required,
}

/// Authentication policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginOption {
    /// Never authenticate.
    Disabled,
    /// Authenticate when credentials are set and the server offers AUTH.
    #[default]
    None,
    /// Fail with `AuthFailed` unless authentication succeeds.
    Required,
    /// Authenticate with XOAUTH2 (password field carries the access token).
    Xoauth2,
}

/// Where a non-restartable attachment stream is cached between the DKIM
/// body-hash pass and the DATA pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamCache {
    /// Buffer in memory (default).
    #[default]
    Memory,
    /// Spill to a temporary file, deleted when the message is dropped.
    TempFile,
}

/// SMTP submission client configuration.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub starttls: StartTlsOption,
    /// Implicit TLS from the first byte (SMTPS, usually port 465).
    pub ssl: bool,
    pub login: LoginOption,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Hostname announced in EHLO/HELO. Resolved from the machine when unset.
    pub own_hostname: Option<String>,
    pub max_pool_size: usize,
    pub keep_alive: bool,
    pub keep_alive_timeout_secs: u64,
    pub pool_cleaner_period_ms: u64,
    pub pool_acquire_timeout_ms: u64,
    /// Continue when individual recipients are rejected; at least one must
    /// still be accepted.
    pub allow_rcpt_errors: bool,
    /// Skip certificate verification. Testing only.
    pub trust_all: bool,
    /// Hostname verification algorithm. `None` selects the rustls default.
    pub hostname_verification_algorithm: Option<String>,
    pub enable_dkim: bool,
    /// One signature is produced per entry, in order.
    pub dkim_options: Vec<DkimSignOptions>,
    /// Cache policy for replaying non-restartable attachment streams.
    pub stream_cache: StreamCache,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            starttls: StartTlsOption::default(),
            ssl: false,
            login: LoginOption::default(),
            username: None,
            password: None,
            own_hostname: None,
            max_pool_size: 10,
            keep_alive: true,
            keep_alive_timeout_secs: 300,
            pool_cleaner_period_ms: 8000,
            pool_acquire_timeout_ms: 10_000,
            allow_rcpt_errors: false,
            trust_all: false,
            hostname_verification_algorithm: None,
            enable_dkim: false,
            dkim_options: Vec::new(),
            stream_cache: StreamCache::default(),
        }
    }
}

impl MailConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_starttls(mut self, starttls: StartTlsOption) -> Self {
        self.starttls = starttls;
        self
    }

    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    pub fn with_login(mut self, login: LoginOption) -> Self {
        self.login = login;
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_own_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.own_hostname = Some(hostname.into());
        self
    }

    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_keep_alive_timeout_secs(mut self, secs: u64) -> Self {
        self.keep_alive_timeout_secs = secs;
        self
    }

    pub fn with_allow_rcpt_errors(mut self, allow: bool) -> Self {
        self.allow_rcpt_errors = allow;
        self
    }

    pub fn with_trust_all(mut self, trust_all: bool) -> Self {
        self.trust_all = trust_all;
        self
    }

    pub fn with_dkim(mut self, options: DkimSignOptions) -> Self {
        self.enable_dkim = true;
        self.dkim_options.push(options);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(MailError::ConfigInvalid("host must be set".into()));
        }
        if self.max_pool_size == 0 {
            return Err(MailError::ConfigInvalid("maxPoolSize must be at least 1".into()));
        }
        if self.ssl && self.starttls != StartTlsOption::Disabled {
            return Err(MailError::ConfigInvalid(
                "ssl and starttls are mutually exclusive".into(),
            ));
        }
        if self.login == LoginOption::Required && (self.username.is_none() || self.password.is_none()) {
            return Err(MailError::ConfigInvalid(
                "login REQUIRED but no credentials configured".into(),
            ));
        }
        if self.enable_dkim {
            if self.dkim_options.is_empty() {
                return Err(MailError::ConfigInvalid(
                    "PubSecKeyOptions must be specified to perform sign".into(),
                ));
            }
            for options in &self.dkim_options {
                options.validate()?;
            }
        }
        Ok(())
    }
}

/// DKIM signature algorithm (RFC 6376 §3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DkimSignAlgorithm {
    RsaSha1,
    #[default]
    RsaSha256,
}

impl DkimSignAlgorithm {
    /// Name used in the `a=` tag.
    pub fn dkim_name(&self) -> &'static str {
        match self {
            DkimSignAlgorithm::RsaSha1 => "rsa-sha1",
            DkimSignAlgorithm::RsaSha256 => "rsa-sha256",
        }
    }
}

/// Canonicalization algorithm (RFC 6376 §3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Canonicalization {
    Simple,
    #[default]
    Relaxed,
}

impl Canonicalization {
    pub fn dkim_name(&self) -> &'static str {
        match self {
            Canonicalization::Simple => "simple",
            Canonicalization::Relaxed => "relaxed",
        }
    }
}

/// Headers that must never appear in `h=` (RFC 6376 §5.4 advice).
const FORBIDDEN_SIGNED_HEADERS: &[&str] =
    &["return-path", "received", "comments", "keywords", "dkim-signature"];

/// Options for one DKIM signature. A message gets one `DKIM-Signature`
/// header per configured instance.
#[derive(Debug, Clone)]
pub struct DkimSignOptions {
    pub sign_algo: DkimSignAlgorithm,
    /// PKCS#8 private key, DER or PEM bytes.
    pub private_key_pkcs8: Vec<u8>,
    /// Signing domain identifier (`d=`).
    pub sdid: String,
    /// Selector (`s=`).
    pub selector: String,
    /// Agent or user identifier (`i=`). Must end in `@sdid` or `.sdid`.
    pub auid: Option<String>,
    pub header_canonic: Canonicalization,
    pub body_canonic: Canonicalization,
    /// Headers to sign, in `h=` order. Must contain `from`.
    pub signed_headers: Vec<String>,
    /// Headers copied into the `z=` tag.
    pub copied_headers: Vec<String>,
    /// Body length limit (`l=`) in bytes of the canonicalized body; negative
    /// means no limit.
    pub body_limit: i64,
    /// Signature lifetime; emits `t=` and `x=` when positive.
    pub expire_seconds: i64,
    /// Emit `t=` even without an expiry.
    pub signature_timestamp: bool,
}

impl Default for DkimSignOptions {
    fn default() -> Self {
        Self {
            sign_algo: DkimSignAlgorithm::default(),
            private_key_pkcs8: Vec::new(),
            sdid: String::new(),
            selector: String::new(),
            auid: None,
            header_canonic: Canonicalization::default(),
            body_canonic: Canonicalization::default(),
            signed_headers: ["from", "reply-to", "subject", "date", "to", "cc"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            copied_headers: Vec::new(),
            body_limit: -1,
            expire_seconds: -1,
            signature_timestamp: false,
        }
    }
}

impl DkimSignOptions {
    pub fn validate(&self) -> Result<()> {
        if self.private_key_pkcs8.is_empty() {
            return Err(MailError::ConfigInvalid(
                "PubSecKeyOptions must be specified to perform sign".into(),
            ));
        }
        if self.sdid.is_empty() {
            return Err(MailError::ConfigInvalid("sdid must be specified".into()));
        }
        if self.selector.is_empty() {
            return Err(MailError::ConfigInvalid("selector must be specified".into()));
        }
        if !self
            .signed_headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case("from"))
        {
            return Err(MailError::ConfigInvalid(
                "signed header fields must contain from".into(),
            ));
        }
        for header in &self.signed_headers {
            if FORBIDDEN_SIGNED_HEADERS
                .iter()
                .any(|f| header.eq_ignore_ascii_case(f))
            {
                return Err(MailError::ConfigInvalid(format!(
                    "header {} must not be signed",
                    header
                )));
            }
        }
        if let Some(auid) = &self.auid {
            let at_domain = format!("@{}", self.sdid);
            let dot_domain = format!(".{}", self.sdid);
            if !auid.ends_with(&at_domain) && !auid.ends_with(&dot_domain) {
                return Err(MailError::ConfigInvalid(
                    "Identity domain mismatch, expected is: [xx]@[xx.]sdid".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn with_private_key(mut self, key: Vec<u8>) -> Self {
        self.private_key_pkcs8 = key;
        self
    }

    pub fn with_sdid(mut self, sdid: impl Into<String>) -> Self {
        self.sdid = sdid.into();
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    pub fn with_auid(mut self, auid: impl Into<String>) -> Self {
        self.auid = Some(auid.into());
        self
    }

    pub fn with_sign_algo(mut self, algo: DkimSignAlgorithm) -> Self {
        self.sign_algo = algo;
        self
    }

    pub fn with_canonicalization(mut self, header: Canonicalization, body: Canonicalization) -> Self {
        self.header_canonic = header;
        self.body_canonic = body;
        self
    }

    pub fn with_signed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_copied_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.copied_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_body_limit(mut self, limit: i64) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn with_expire_seconds(mut self, secs: i64) -> Self {
        self.expire_seconds = secs;
        self
    }

    pub fn with_signature_timestamp(mut self, enabled: bool) -> Self {
        self.signature_timestamp = enabled;
        self
    }
}
