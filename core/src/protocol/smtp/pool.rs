/*
 * pool.rs
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

//! Bounded connection pool with keep-alive and eviction.
//!
//! Invariant: live connections (idle + checked out) never exceed
//! `max_pool_size`. Acquisition beyond the bound queues FIFO; a released
//! connection or freed slot is handed directly to the oldest waiter, so
//! arrival order is service order. A single mutex guards membership,
//! counters, and the waiter queue; it is never held across an await.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::MailConfig;
use crate::error::{MailError, Result};
use crate::protocol::smtp::connection::{ConnState, SmtpConnection};

/// Attempts at reusing (or replacing) a pooled connection whose RSET fails
/// before the failure is surfaced.
pub const RSET_MAX_RETRY: usize = 5;

/// What a waiter receives when capacity frees up.
#[derive(Debug)]
enum Grant {
    /// A recycled, still-valid connection.
    Conn(SmtpConnection),
    /// Permission to open a fresh connection within the bound.
    Slot,
}

#[derive(Debug)]
struct PoolState {
    idle: VecDeque<SmtpConnection>,
    /// Idle + checked-out connections.
    total: usize,
    waiters: VecDeque<oneshot::Sender<Grant>>,
    closed: bool,
    cleaner: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct PoolShared {
    config: MailConfig,
    state: Mutex<PoolState>,
    next_id: AtomicU64,
}

/// Bounded pool of SMTP connections to one server.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    shared: Arc<PoolShared>,
}

impl ConnectionPool {
    pub fn new(config: MailConfig) -> Self {
        let shared = Arc::new(PoolShared {
            config,
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                total: 0,
                waiters: VecDeque::new(),
                closed: false,
                cleaner: None,
            }),
            next_id: AtomicU64::new(1),
        });
        let pool = Self { shared };
        pool.ensure_cleaner();
        pool
    }

    /// Number of live connections (idle + checked out).
    pub fn conn_count(&self) -> usize {
        self.shared.state.lock().expect("pool lock").total
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().expect("pool lock").closed
    }

    /// Acquire a connection: an idle one when available, a fresh one within
    /// the bound, otherwise wait FIFO up to the configured timeout.
    ///
    /// Fresh connections come back in `Fresh` state (handshake pending);
    /// reused ones are `Ready`.
    pub async fn acquire(&self) -> Result<SmtpConnection> {
        self.ensure_cleaner();
        let timeout = Duration::from_millis(self.shared.config.pool_acquire_timeout_ms);
        let deadline = Instant::now() + timeout;

        loop {
            enum Action {
                Got(SmtpConnection),
                Open,
                Wait(oneshot::Receiver<Grant>),
            }

            let mut expired = Vec::new();
            let action = {
                let mut st = self.shared.state.lock().expect("pool lock");
                if st.closed {
                    return Err(MailError::PoolClosed);
                }
                let mut got = None;
                while let Some(conn) = st.idle.pop_front() {
                    if conn.is_valid() {
                        got = Some(conn);
                        break;
                    }
                    st.total -= 1;
                    expired.push(conn);
                }
                match got {
                    Some(conn) => Action::Got(conn),
                    None if st.total < self.shared.config.max_pool_size => {
                        st.total += 1;
                        Action::Open
                    }
                    None => {
                        let (tx, rx) = oneshot::channel();
                        st.waiters.push_back(tx);
                        Action::Wait(rx)
                    }
                }
            };
            for conn in expired {
                spawn_quit(conn);
            }

            match action {
                Action::Got(mut conn) => {
                    conn.set_state(ConnState::InUse);
                    return Ok(conn);
                }
                Action::Open => return self.open_new().await,
                Action::Wait(mut rx) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let grant = match tokio::time::timeout(remaining, &mut rx).await {
                        Ok(Ok(grant)) => grant,
                        // Sender dropped without a grant: the pool closed.
                        Ok(Err(_)) => return Err(MailError::PoolClosed),
                        Err(_) => match rx.try_recv() {
                            // Granted in the same instant the timer fired.
                            Ok(grant) => grant,
                            Err(_) => return Err(MailError::PoolAcquireTimeout),
                        },
                    };
                    match grant {
                        Grant::Conn(conn) if conn.is_valid() => {
                            let mut conn = conn;
                            conn.set_state(ConnState::InUse);
                            return Ok(conn);
                        }
                        Grant::Conn(conn) => {
                            self.evict(conn, false).await;
                            continue;
                        }
                        Grant::Slot => return self.open_new().await,
                    }
                }
            }
        }
    }

    async fn open_new(&self) -> Result<SmtpConnection> {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let config = &self.shared.config;
        match SmtpConnection::open(&config.host, config.port, config.ssl, config.trust_all, id).await
        {
            Ok(conn) => Ok(conn),
            Err(e) => {
                // The reserved slot either passes to the next waiter (which
                // will fail fast on the same dead server) or is released.
                self.hand_slot_or_release();
                Err(e)
            }
        }
    }

    /// Return a connection after a successful send. Valid connections go
    /// back to the pool (or straight to the oldest waiter) with a refreshed
    /// TTL; everything else is evicted.
    pub async fn recycle(&self, mut conn: SmtpConnection) {
        let keep = self.shared.config.keep_alive && conn.is_valid() && !self.is_closed();
        if !keep {
            self.evict(conn, true).await;
            return;
        }
        conn.set_state(ConnState::Ready);
        conn.refresh_expiration(Some(Duration::from_secs(
            self.shared.config.keep_alive_timeout_secs,
        )));

        let leftover = {
            let mut st = self.shared.state.lock().expect("pool lock");
            if st.closed {
                Some(conn)
            } else {
                let mut conn = Some(conn);
                while let Some(waiter) = st.waiters.pop_front() {
                    match waiter.send(Grant::Conn(conn.take().expect("grant present"))) {
                        Ok(()) => break,
                        Err(Grant::Conn(back)) => conn = Some(back),
                        Err(Grant::Slot) => unreachable!("sent a connection"),
                    }
                }
                if let Some(conn) = conn.take() {
                    st.idle.push_back(conn);
                }
                None
            }
        };
        if let Some(conn) = leftover {
            self.evict(conn, true).await;
        }
    }

    /// Drop a checked-out connection from the pool. `polite` closes with
    /// QUIT; otherwise the socket is torn down immediately.
    pub async fn evict(&self, mut conn: SmtpConnection, polite: bool) {
        debug!(id = conn.id(), polite, "evicting connection");
        self.hand_slot_or_release();
        if polite {
            conn.quit_close().await;
        } else {
            conn.shutdown().await;
        }
    }

    /// Free one slot: hand it to the oldest live waiter, else decrement.
    fn hand_slot_or_release(&self) {
        let mut st = self.shared.state.lock().expect("pool lock");
        loop {
            match st.waiters.pop_front() {
                Some(waiter) => {
                    if waiter.send(Grant::Slot).is_ok() {
                        return;
                    }
                }
                None => {
                    st.total -= 1;
                    return;
                }
            }
        }
    }

    /// Close the pool: fail queued waiters, QUIT every idle connection,
    /// stop the cleaner. Checked-out connections are evicted when recycled.
    pub async fn close(&self) {
        let (idle, waiters, cleaner) = {
            let mut st = self.shared.state.lock().expect("pool lock");
            st.closed = true;
            st.total -= st.idle.len();
            (
                std::mem::take(&mut st.idle),
                std::mem::take(&mut st.waiters),
                st.cleaner.take(),
            )
        };
        if let Some(handle) = cleaner {
            handle.abort();
        }
        // Dropping the senders fails every waiter with PoolClosed.
        drop(waiters);
        for mut conn in idle {
            conn.quit_close().await;
        }
        debug!("pool closed");
    }

    /// Arm the cleaner task once, when keep-alive is on and a runtime is
    /// available (construction may happen outside one).
    fn ensure_cleaner(&self) {
        if !self.shared.config.keep_alive {
            return;
        }
        {
            let st = self.shared.state.lock().expect("pool lock");
            if st.closed || st.cleaner.is_some() {
                return;
            }
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => return,
        };
        let weak: Weak<PoolShared> = Arc::downgrade(&self.shared);
        let period = Duration::from_millis(self.shared.config.pool_cleaner_period_ms.max(1));
        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                let shared = match weak.upgrade() {
                    Some(s) => s,
                    None => break,
                };
                let expired: Vec<SmtpConnection> = {
                    let mut st = shared.state.lock().expect("pool lock");
                    if st.closed {
                        break;
                    }
                    let mut keep = VecDeque::with_capacity(st.idle.len());
                    let mut out = Vec::new();
                    while let Some(conn) = st.idle.pop_front() {
                        if conn.is_valid() {
                            keep.push_back(conn);
                        } else {
                            st.total -= 1;
                            out.push(conn);
                        }
                    }
                    st.idle = keep;
                    out
                };
                for mut conn in expired {
                    debug!(id = conn.id(), "keep-alive expired; closing");
                    conn.quit_close().await;
                }
            }
        });
        let mut st = self.shared.state.lock().expect("pool lock");
        if st.closed || st.cleaner.is_some() {
            handle.abort();
        } else {
            st.cleaner = Some(handle);
        }
    }
}

impl Drop for PoolShared {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().expect("pool lock").cleaner.take() {
            handle.abort();
        }
    }
}

fn spawn_quit(mut conn: SmtpConnection) {
    tokio::spawn(async move {
        conn.quit_close().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_pool_is_empty_and_open() {
        // No runtime needed while keep_alive is off (no cleaner task).
        let pool = ConnectionPool::new(MailConfig::new("localhost", 2525).with_keep_alive(false));
        assert_eq!(pool.conn_count(), 0);
        assert!(!pool.is_closed());
    }

    #[tokio::test]
    async fn acquire_against_dead_server_is_connect_failed() {
        let mut config = MailConfig::new("127.0.0.1", 1);
        config.keep_alive = false;
        let pool = ConnectionPool::new(config);
        let err = pool.acquire().await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConnectFailed);
        assert_eq!(pool.conn_count(), 0);
    }

    #[tokio::test]
    async fn close_rejects_new_acquires() {
        let mut config = MailConfig::new("127.0.0.1", 1);
        config.keep_alive = false;
        let pool = ConnectionPool::new(config);
        pool.close().await;
        let err = pool.acquire().await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::PoolClosed);
    }
}
