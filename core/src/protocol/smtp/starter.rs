/*
 * starter.rs
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

//! Post-connect handshake: greeting → EHLO (HELO fallback) → optional
//! STARTTLS + re-EHLO → optional AUTH → Ready.

use tracing::debug;

use crate::config::{LoginOption, MailConfig, StartTlsOption};
use crate::error::{MailError, Result};
use crate::protocol::smtp::auth::{self, StickyAuth};
use crate::protocol::smtp::capabilities::Capabilities;
use crate::protocol::smtp::connection::{ConnState, SmtpConnection};

pub struct SmtpStarter<'a> {
    config: &'a MailConfig,
    /// Hostname announced in EHLO/HELO.
    own_hostname: &'a str,
    /// Mechanism remembered from earlier successful logins on this pool.
    sticky_auth: &'a StickyAuth,
}

impl<'a> SmtpStarter<'a> {
    pub fn new(config: &'a MailConfig, own_hostname: &'a str, sticky_auth: &'a StickyAuth) -> Self {
        Self {
            config,
            own_hostname,
            sticky_auth,
        }
    }

    /// Run the full handshake on a fresh connection; leaves it Ready.
    pub async fn start(&self, conn: &mut SmtpConnection) -> Result<()> {
        conn.set_state(ConnState::Handshaking);

        let greeting = conn.read_reply().await?;
        if !greeting.is_positive() {
            return Err(MailError::GreetingFailed(format!(
                "{} {}",
                greeting.code,
                greeting.message()
            )));
        }
        debug!(greeting = %greeting.message(), "server greeting");

        self.ehlo(conn).await?;

        let want_tls = !conn.is_tls()
            && match self.config.starttls {
                StartTlsOption::Disabled => false,
                StartTlsOption::Optional => conn.capabilities.starttls,
                StartTlsOption::Required => true,
            };
        if want_tls {
            if !conn.capabilities.starttls {
                return Err(MailError::TlsRequired);
            }
            let reply = conn.command("STARTTLS", None).await?;
            if !reply.is_positive() {
                return Err(MailError::TlsRequired);
            }
            conn.upgrade_tls().await?;
            // Pre-TLS capabilities no longer apply.
            self.ehlo(conn).await?;
        }

        if self.config.login != LoginOption::Disabled {
            if let (Some(username), Some(password)) =
                (self.config.username.clone(), self.config.password.clone())
            {
                auth::authenticate(
                    conn,
                    self.config,
                    &username,
                    &password,
                    self.sticky_auth,
                )
                .await?;
            } else if self.config.login == LoginOption::Required {
                return Err(MailError::AuthFailed(
                    "login required but no credentials configured".into(),
                ));
            }
        }

        conn.set_state(ConnState::Ready);
        Ok(())
    }

    /// EHLO, falling back to HELO when the server rejects it with 5xx. HELO
    /// advertises no extensions, so the capability set stays empty.
    async fn ehlo(&self, conn: &mut SmtpConnection) -> Result<()> {
        let reply = conn
            .command(&format!("EHLO {}", self.own_hostname), None)
            .await?;
        if reply.is_positive() {
            conn.capabilities = Capabilities::parse(&reply);
            return Ok(());
        }
        if !reply.is_permanent_failure() {
            return Err(MailError::GreetingFailed(format!(
                "EHLO failed: {} {}",
                reply.code,
                reply.message()
            )));
        }
        let reply = conn
            .command(&format!("HELO {}", self.own_hostname), None)
            .await?;
        if !reply.is_positive() {
            return Err(MailError::GreetingFailed(format!(
                "HELO failed: {} {}",
                reply.code,
                reply.message()
            )));
        }
        conn.capabilities = Capabilities::default();
        Ok(())
    }
}
