/*
 * client.rs
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

//! Top-level client: validation, own-hostname resolution, DKIM signing, and
//! pool-backed message submission.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::MailConfig;
use crate::dkim::DkimSigner;
use crate::error::{MailError, Result};
use crate::message::{MailMessage, SendResult};
use crate::protocol::smtp::auth::StickyAuth;
use crate::protocol::smtp::connection::{ConnState, SmtpConnection};
use crate::protocol::smtp::pool::{ConnectionPool, RSET_MAX_RETRY};
use crate::protocol::smtp::send_session;
use crate::protocol::smtp::starter::SmtpStarter;

/// Process-wide registry for [`MailClient::shared`], keyed by pool name.
static SHARED_CLIENTS: OnceLock<Mutex<HashMap<String, Arc<MailClient>>>> = OnceLock::new();

/// SMTP submission client over a bounded connection pool.
///
/// Cheap to share behind an `Arc`; every `send` borrows a pooled connection
/// for the duration of one message.
#[derive(Debug)]
pub struct MailClient {
    config: MailConfig,
    pool: ConnectionPool,
    signers: Arc<Vec<DkimSigner>>,
    sticky_auth: StickyAuth,
    resolved_hostname: OnceCell<String>,
}

impl MailClient {
    /// Validate the configuration, decode DKIM keys, and set up the pool.
    /// No connection is opened until the first send.
    pub fn new(config: MailConfig) -> Result<Self> {
        config.validate()?;
        let mut signers = Vec::with_capacity(config.dkim_options.len());
        if config.enable_dkim {
            for options in &config.dkim_options {
                signers.push(DkimSigner::new(options.clone())?);
            }
        }
        let pool = ConnectionPool::new(config.clone());
        Ok(Self {
            config,
            pool,
            signers: Arc::new(signers),
            sticky_auth: StickyAuth::default(),
            resolved_hostname: OnceCell::new(),
        })
    }

    /// Fetch-or-create a process-shared client under `name`. The registry is
    /// a lazily initialized map behind a single mutex; a `name` is bound to
    /// the configuration of its first caller.
    pub fn shared(name: &str, config: MailConfig) -> Result<Arc<MailClient>> {
        let registry = SHARED_CLIENTS.get_or_init(|| Mutex::new(HashMap::new()));
        let mut guard = registry.lock().expect("shared client registry lock");
        if let Some(client) = guard.get(name) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(Self::new(config)?);
        guard.insert(name.to_string(), Arc::clone(&client));
        Ok(client)
    }

    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    /// Live connections in the pool (idle + in use).
    pub fn conn_count(&self) -> usize {
        self.pool.conn_count()
    }

    /// Submit one message: acquire a connection (handshaking or RSETting as
    /// needed), apply the configured DKIM signatures, run the send session,
    /// and recycle or evict per the outcome.
    pub async fn send(&self, message: MailMessage) -> Result<SendResult> {
        if message.from.trim().is_empty() {
            return Err(MailError::ConfigInvalid("sender address is not present".into()));
        }
        if message.recipients().next().is_none() {
            return Err(MailError::ConfigInvalid("no recipient addresses".into()));
        }

        let mut conn = self.checkout().await?;

        let message = if self.signers.is_empty() {
            message
        } else {
            // RSA signing is CPU-bound; run it off the event loop.
            let signers = Arc::clone(&self.signers);
            let signed = tokio::task::spawn_blocking(move || sign_message(&signers, message))
                .await
                .map_err(|e| MailError::DkimSignFailure(e.to_string()));
            match signed {
                Ok(Ok(message)) => message,
                Ok(Err(e)) | Err(e) => {
                    // Nothing went over the wire; the connection is fine.
                    self.pool.recycle(conn).await;
                    return Err(e);
                }
            }
        };

        match send_session::send(&mut conn, &message, self.config.allow_rcpt_errors).await {
            Ok(result) => {
                self.pool.recycle(conn).await;
                Ok(result)
            }
            Err(e) => {
                if e.is_connection_fatal() {
                    self.pool.evict(conn, false).await;
                } else {
                    self.pool.recycle(conn).await;
                }
                Err(e)
            }
        }
    }

    /// Close the pool; queued waiters fail with `PoolClosed` and idle
    /// connections are QUIT-closed.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Obtain a Ready connection: fresh ones get the full handshake, reused
    /// ones an RSET. A failed RSET discards the connection and tries again,
    /// bounded by `RSET_MAX_RETRY`.
    async fn checkout(&self) -> Result<SmtpConnection> {
        let own_hostname = self.own_hostname().await;
        let mut last_err: Option<MailError> = None;
        for attempt in 0..RSET_MAX_RETRY {
            let mut conn = self.pool.acquire().await?;
            if conn.state() == ConnState::Fresh {
                let starter = SmtpStarter::new(&self.config, &own_hostname, &self.sticky_auth);
                match starter.start(&mut conn).await {
                    Ok(()) => {
                        conn.set_state(ConnState::InUse);
                        return Ok(conn);
                    }
                    Err(e) => {
                        // Auth and handshake failures always evict.
                        self.pool.evict(conn, false).await;
                        return Err(e);
                    }
                }
            }
            match conn.rset().await {
                Ok(()) => {
                    conn.set_state(ConnState::InUse);
                    return Ok(conn);
                }
                Err(e) => {
                    debug!(attempt, error = %e, "RSET failed; discarding pooled connection");
                    self.pool.evict(conn, true).await;
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| MailError::Protocol("RSET retries exhausted".into())))
    }

    /// EHLO hostname: configured value, else the machine hostname resolved
    /// once on the blocking pool and cached.
    async fn own_hostname(&self) -> String {
        if let Some(hostname) = &self.config.own_hostname {
            return hostname.clone();
        }
        self.resolved_hostname
            .get_or_init(|| async {
                tokio::task::spawn_blocking(|| {
                    gethostname::gethostname().to_string_lossy().into_owned()
                })
                .await
                .unwrap_or_else(|_| "localhost".to_string())
            })
            .await
            .clone()
    }
}

fn sign_message(signers: &[DkimSigner], mut message: MailMessage) -> Result<MailMessage> {
    // One DKIM-Signature per configured options entry, inserted at the top
    // of the headers in configuration order.
    for (index, signer) in signers.iter().enumerate() {
        let value = signer.sign(&message.part)?;
        message.part.insert_header(index, "DKIM-Signature", value);
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mime::EncodedPart;

    fn client() -> MailClient {
        let mut config = MailConfig::new("127.0.0.1", 2525);
        config.keep_alive = false;
        MailClient::new(config).unwrap()
    }

    fn part() -> EncodedPart {
        EncodedPart::leaf_text(vec![("From".into(), "f@example.com".into())], "x")
    }

    #[tokio::test]
    async fn rejects_message_without_sender() {
        let message = MailMessage::new("", vec!["to@example.com".into()], part());
        let err = client().send(message).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[tokio::test]
    async fn rejects_message_without_recipients() {
        let message = MailMessage::new("f@example.com", vec![], part());
        let err = client().send(message).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn shared_registry_returns_same_instance() {
        let mut config = MailConfig::new("127.0.0.1", 2525);
        config.keep_alive = false;
        let a = MailClient::shared("registry-test", config.clone()).unwrap();
        let b = MailClient::shared("registry-test", config).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
