//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Lock-free metrics for the bulletin board server
//!
//! [`ServerMetrics`] is owned by the server and queried through
//! [`MetricsSnapshot`]. The dispatcher additionally reports through the
//! `metrics` facade so an installed recorder can export the same events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free server metrics
///
/// All metrics are stored as atomics and can be accessed concurrently
/// without locks. Use the `snapshot()` method to get a view of all metrics
/// at a point in time.
#[derive(Debug)]
pub struct ServerMetrics {
    // Sessions
    sessions_opened: AtomicU64,
    sessions_closed: AtomicU64,
    rejected_connections: AtomicU64,

    // Commands
    commands: AtomicU64,
    protocol_errors: AtomicU64,
    domain_errors: AtomicU64,

    // Notifications
    notifications_delivered: AtomicU64,
    notifications_dropped: AtomicU64,

    // Timing (stored as nanoseconds)
    total_session_duration_ns: AtomicU64,

    started_at: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            sessions_opened: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
            commands: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            domain_errors: AtomicU64::new(0),
            notifications_delivered: AtomicU64::new(0),
            notifications_dropped: AtomicU64::new(0),
            total_session_duration_ns: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record a new session
    pub fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session being torn down
    pub fn session_closed(&self, duration: Duration) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
        self.total_session_duration_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Record a connection refused at the connection limit or for lack of a pair
    pub fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Sessions currently alive
    pub fn active_sessions(&self) -> u64 {
        self.sessions_opened
            .load(Ordering::Relaxed)
            .saturating_sub(self.sessions_closed.load(Ordering::Relaxed))
    }

    /// Record one executed command
    pub fn command(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a malformed command
    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a well-formed command the board state refused
    pub fn domain_error(&self) {
        self.domain_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record fan-out results
    pub fn notifications(&self, delivered: usize, dropped: usize) {
        self.notifications_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.notifications_dropped
            .fetch_add(dropped as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            domain_errors: self.domain_errors.load(Ordering::Relaxed),
            notifications_delivered: self.notifications_delivered.load(Ordering::Relaxed),
            notifications_dropped: self.notifications_dropped.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
            avg_session_duration: self.average_session_duration(),
        }
    }

    fn average_session_duration(&self) -> Duration {
        let closed = self.sessions_closed.load(Ordering::Relaxed);
        if closed == 0 {
            return Duration::ZERO;
        }
        let total_ns = self.total_session_duration_ns.load(Ordering::Relaxed);
        Duration::from_nanos(total_ns / closed)
    }
}

/// A snapshot of server metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Sessions created since server start
    pub sessions_opened: u64,
    /// Sessions torn down since server start
    pub sessions_closed: u64,
    /// Connections refused before becoming sessions
    pub rejected_connections: u64,
    /// Commands executed
    pub commands: u64,
    /// Malformed commands
    pub protocol_errors: u64,
    /// Refused commands
    pub domain_errors: u64,
    /// Notifications queued for delivery
    pub notifications_delivered: u64,
    /// Notifications dropped on full or closed queues
    pub notifications_dropped: u64,
    /// Server uptime
    pub uptime: Duration,
    /// Average lifetime of closed sessions
    pub avg_session_duration: Duration,
}

impl MetricsSnapshot {
    /// Sessions currently alive
    pub fn active_sessions(&self) -> u64 {
        self.sessions_opened.saturating_sub(self.sessions_closed)
    }

    /// Commands per second over the uptime
    pub fn commands_per_sec(&self) -> f64 {
        if self.uptime.is_zero() {
            return 0.0;
        }
        self.commands as f64 / self.uptime.as_secs_f64()
    }

    /// Protocol and domain errors together
    pub fn total_errors(&self) -> u64 {
        self.protocol_errors + self.domain_errors
    }

    /// Share of notifications that were dropped, 0.0 to 1.0
    pub fn drop_rate(&self) -> f64 {
        let total = self.notifications_delivered + self.notifications_dropped;
        if total == 0 {
            return 0.0;
        }
        self.notifications_dropped as f64 / total as f64
    }
}
