/*
 * auth.rs
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

//! SMTP AUTH driver: selects candidate SASL mechanisms from the EHLO
//! intersection, runs each step machine over the wire, falls through on 5xx,
//! and remembers the first mechanism that worked for later connections.
//!
//! Credential-bearing lines are masked after the `AUTH <name> ` prefix in
//! the debug log; challenge responses are masked entirely.

use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::debug;

use crate::config::{LoginOption, MailConfig};
use crate::error::{MailError, Result};
use crate::sasl::{create_mechanism, Credentials, Mechanism};
use crate::protocol::smtp::connection::SmtpConnection;
use crate::protocol::smtp::reply::Reply;

/// Mechanism remembered across connections of one pool; the first successful
/// mechanism is tried first on later handshakes.
#[derive(Debug, Default)]
pub struct StickyAuth {
    inner: Mutex<Option<Mechanism>>,
}

impl StickyAuth {
    pub fn get(&self) -> Option<Mechanism> {
        *self.inner.lock().expect("sticky auth lock")
    }

    fn set(&self, mechanism: Mechanism) {
        *self.inner.lock().expect("sticky auth lock") = Some(mechanism);
    }
}

/// Candidate mechanisms: local preference order intersected with the server's
/// AUTH list, with the sticky default (if any) moved to the front.
fn candidates(
    config: &MailConfig,
    conn: &SmtpConnection,
    sticky: &StickyAuth,
) -> Vec<Mechanism> {
    let locally_supported: &[Mechanism] = if config.login == LoginOption::Xoauth2 {
        &[Mechanism::XOAuth2]
    } else {
        Mechanism::password_candidates()
    };
    let mut list: Vec<Mechanism> = locally_supported
        .iter()
        .copied()
        .filter(|m| conn.capabilities.supports_auth(m.name()))
        .collect();
    if let Some(default) = sticky.get() {
        if let Some(pos) = list.iter().position(|m| *m == default) {
            let preferred = list.remove(pos);
            list.insert(0, preferred);
        }
    }
    list
}

/// Authenticate the connection, or fail with `AuthFailed` once every
/// candidate is exhausted.
pub async fn authenticate(
    conn: &mut SmtpConnection,
    config: &MailConfig,
    username: &str,
    password: &str,
    sticky: &StickyAuth,
) -> Result<()> {
    let candidates = candidates(config, conn, sticky);
    if candidates.is_empty() {
        if config.login == LoginOption::Required || config.login == LoginOption::Xoauth2 {
            return Err(MailError::AuthFailed(format!(
                "no supported AUTH mechanism offered (server: {})",
                conn.capabilities.auth.join(" ")
            )));
        }
        debug!("no common AUTH mechanism; continuing unauthenticated");
        return Ok(());
    }

    let credentials = Credentials {
        username: username.to_string(),
        secret: password.to_string(),
    };
    let mut last_failure = String::new();

    for mechanism in candidates {
        match try_mechanism(conn, mechanism, &credentials).await? {
            Outcome::Success => {
                sticky.set(mechanism);
                debug!(mechanism = mechanism.name(), "authenticated");
                return Ok(());
            }
            Outcome::Rejected(message) => {
                debug!(mechanism = mechanism.name(), %message, "mechanism rejected");
                last_failure = message;
            }
        }
    }
    Err(MailError::AuthFailed(if last_failure.is_empty() {
        "all mechanisms rejected".into()
    } else {
        last_failure
    }))
}

enum Outcome {
    Success,
    /// Server said 5xx; try the next mechanism.
    Rejected(String),
}

async fn try_mechanism(
    conn: &mut SmtpConnection,
    mechanism: Mechanism,
    credentials: &Credentials,
) -> Result<Outcome> {
    let mut machine = create_mechanism(mechanism, credentials, conn.host());

    let initial = machine
        .initial_response()
        .map_err(|e| MailError::AuthFailed(e.to_string()))?;
    let command = match initial {
        Some(raw) => format!("AUTH {} {}", mechanism.name(), BASE64.encode(raw)),
        None => format!("AUTH {}", mechanism.name()),
    };
    // Redact everything after "AUTH <name> ".
    let mask_from = format!("AUTH {} ", mechanism.name()).len();
    let mut reply = conn.command(&command, Some(mask_from)).await?;

    loop {
        if reply.is_positive() {
            return Ok(Outcome::Success);
        }
        if reply.is_permanent_failure() {
            return Ok(Outcome::Rejected(format!(
                "{}: {} {}",
                mechanism.name(),
                reply.code,
                reply.message()
            )));
        }
        if reply.code != 334 {
            return Err(MailError::Protocol(format!(
                "unexpected AUTH reply: {} {}",
                reply.code,
                reply.message()
            )));
        }
        reply = match step(conn, &mut *machine, &reply).await? {
            Some(next) => next,
            None => return Ok(Outcome::Rejected(format!("{}: step failed", mechanism.name()))),
        };
    }
}

/// Decode the 334 challenge, run one mechanism step, send the base64
/// response. A local step failure aborts the exchange with `*` (RFC 4954
/// §4) and yields `None` so the caller can fall through.
async fn step(
    conn: &mut SmtpConnection,
    machine: &mut dyn crate::sasl::AuthMechanism,
    challenge_reply: &Reply,
) -> Result<Option<Reply>> {
    let challenge = BASE64
        .decode(challenge_reply.last_line().trim())
        .map_err(|e| MailError::Protocol(format!("bad base64 in AUTH challenge: {}", e)))?;
    match machine.next_step(&challenge) {
        Ok(response) => {
            let line = BASE64.encode(response);
            let reply = conn.command(&line, Some(0)).await?;
            Ok(Some(reply))
        }
        Err(e) => {
            debug!(error = %e, "SASL step failed; aborting exchange");
            let _ = conn.command("*", None).await?;
            Ok(None)
        }
    }
}
