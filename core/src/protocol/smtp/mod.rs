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

//! SMTP submission protocol: reply parsing, capabilities, the connection and
//! its handshake, authentication, pooling, and the send state machine.

pub mod auth;
pub mod capabilities;
pub mod connection;
pub mod dot_stuffer;
pub mod pool;
pub mod reply;
pub mod send_session;
pub mod starter;

pub use capabilities::Capabilities;
pub use connection::{ConnState, SmtpConnection};
pub use pool::{ConnectionPool, RSET_MAX_RETRY};
pub use reply::{Reply, ReplyParser};
pub use starter::SmtpStarter;
