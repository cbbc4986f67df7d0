/*
 * send_session.rs
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

//! The send state machine: MAIL FROM → RCPT TO… → DATA → dot-stuffed body →
//! terminating dot. One linear pass over one Ready connection; no two steps
//! ever overlap on a connection.
//!
//! RCPT commands are grouped into a single pipelined write when the server
//! advertises PIPELINING, and issued one at a time otherwise.

use tracing::debug;

use crate::error::{MailError, Result};
use crate::message::{MailMessage, SendResult};
use crate::mime::write_message;
use crate::protocol::smtp::connection::SmtpConnection;
use crate::protocol::smtp::dot_stuffer::DotStuffer;
use crate::protocol::smtp::reply::Reply;

const BODY_CHUNK: usize = 8192;

/// Drive one message through one Ready connection.
pub async fn send(
    conn: &mut SmtpConnection,
    message: &MailMessage,
    allow_rcpt_errors: bool,
) -> Result<SendResult> {
    // Materialize the wire form up front: the SIZE precheck and the MAIL
    // FROM SIZE parameter both need the exact byte count.
    let mut wire = Vec::new();
    write_message(&message.part, &mut |b: &[u8]| wire.extend_from_slice(b))
        .map_err(MailError::BodyWriteFailed)?;

    let advertised_size = conn.capabilities.size;
    if advertised_size > 0 && wire.len() > advertised_size {
        // The connection did not see a byte of this message; it stays valid.
        return Err(MailError::MessageTooLarge {
            size: wire.len(),
            limit: advertised_size,
        });
    }

    mail_from(conn, message, wire.len()).await?;
    let (accepted, rejected) = rcpt_to(conn, message, allow_rcpt_errors).await?;

    let reply = conn.command("DATA", None).await?;
    if !reply.is_intermediate() {
        return Err(MailError::DataRejected {
            code: reply.code,
            message: reply.message(),
        });
    }

    transmit_body(conn, &wire).await?;

    let reply = conn.read_reply().await?;
    if !reply.is_positive() {
        // Message refused after the dot; the session itself is consistent.
        return Err(MailError::DataRejected {
            code: reply.code,
            message: reply.message(),
        });
    }
    debug!(accepted = accepted.len(), "message accepted");

    Ok(SendResult {
        message_id: message.part.header("Message-ID").map(str::to_string),
        accepted_recipients: accepted,
        rejected_recipients: rejected,
    })
}

async fn mail_from(conn: &mut SmtpConnection, message: &MailMessage, size: usize) -> Result<()> {
    let mut line = format!("MAIL FROM:<{}>", message.envelope_sender());
    if conn.capabilities.size > 0 {
        line.push_str(&format!(" SIZE={}", size));
    }
    if conn.capabilities.eight_bit_mime {
        line.push_str(" BODY=8BITMIME");
    }
    let reply = conn.command(&line, None).await?;
    if !reply.is_positive() {
        return Err(MailError::SenderRejected {
            code: reply.code,
            message: reply.message(),
        });
    }
    Ok(())
}

async fn rcpt_to(
    conn: &mut SmtpConnection,
    message: &MailMessage,
    allow_rcpt_errors: bool,
) -> Result<(Vec<String>, Vec<(String, String)>)> {
    let recipients: Vec<String> = message.recipients().map(str::to_string).collect();
    if recipients.is_empty() {
        return Err(MailError::RecipientRejected {
            code: 0,
            message: "no recipients".into(),
        });
    }

    let replies: Vec<(String, Reply)> = if conn.capabilities.pipelining && recipients.len() > 1 {
        let lines: Vec<String> = recipients
            .iter()
            .map(|r| format!("RCPT TO:<{}>", r))
            .collect();
        let replies = conn.pipeline_commands(&lines).await?;
        recipients.into_iter().zip(replies).collect()
    } else {
        let mut out = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let reply = conn
                .command(&format!("RCPT TO:<{}>", recipient), None)
                .await?;
            if !reply.is_positive() && !allow_rcpt_errors {
                return Err(MailError::RecipientRejected {
                    code: reply.code,
                    message: reply.message(),
                });
            }
            out.push((recipient, reply));
        }
        out
    };

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    let mut last_failure = (0u16, String::new());
    for (recipient, reply) in replies {
        if reply.is_positive() {
            accepted.push(recipient);
        } else {
            last_failure = (reply.code, reply.message());
            if !allow_rcpt_errors {
                return Err(MailError::RecipientRejected {
                    code: last_failure.0,
                    message: last_failure.1,
                });
            }
            debug!(%recipient, code = reply.code, "recipient rejected; continuing");
            rejected.push((recipient, reply.message()));
        }
    }
    if accepted.is_empty() {
        return Err(MailError::RecipientRejected {
            code: last_failure.0,
            message: last_failure.1,
        });
    }
    Ok((accepted, rejected))
}

/// Stream the wire bytes with dot-stuffing applied, then the terminator.
async fn transmit_body(conn: &mut SmtpConnection, wire: &[u8]) -> Result<()> {
    let mut stuffer = DotStuffer::new();
    let mut buf = Vec::with_capacity(BODY_CHUNK + 16);
    for chunk in wire.chunks(BODY_CHUNK) {
        buf.clear();
        stuffer.process_chunk(chunk, |s| buf.extend_from_slice(s));
        conn.write_body_chunk(&buf).await?;
    }
    buf.clear();
    stuffer.end_message(|s| buf.extend_from_slice(s));
    conn.write_body_chunk(&buf).await?;
    conn.flush_body().await
}
