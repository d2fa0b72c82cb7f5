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

//! Lock-free metrics for the Telnet server
//!
//! Every update is kept in local atomics for [`ServerMetrics::snapshot`] and
//! also reported through the `metrics` facade, so an installed recorder sees
//! the same numbers under `termgate.*` names.

use metrics::{counter, gauge, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free server metrics
///
/// All metrics are stored as atomics and can be accessed concurrently
/// without locks. Use the `snapshot()` method to get a view of all metrics
/// at a point in time.
#[derive(Debug)]
pub struct ServerMetrics {
    // Connection counts
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    rejected_connections: AtomicU64,

    // Throughput
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,

    // Errors
    connection_errors: AtomicU64,
    negotiation_timeouts: AtomicU64,
    application_errors: AtomicU64,

    // Timing (stored as nanoseconds)
    total_connection_duration_ns: AtomicU64,

    // Server start time
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
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            negotiation_timeouts: AtomicU64::new(0),
            application_errors: AtomicU64::new(0),
            total_connection_duration_ns: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    // Connection tracking

    /// Record a new connection being opened
    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        counter!("termgate.connections.total").increment(1);
        gauge!("termgate.connections.active").increment(1.0);
    }

    /// Record a connection being closed
    pub fn connection_closed(&self, duration: Duration) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
        self.total_connection_duration_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        gauge!("termgate.connections.active").decrement(1.0);
        histogram!("termgate.connections.duration").record(duration.as_secs_f64());
    }

    /// Record a connection refused because the server was full
    pub fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
        counter!("termgate.connections.rejected").increment(1);
    }

    /// Get the current number of active connections
    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Get the total number of connections since server start
    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    // Throughput tracking

    /// Record bytes sent
    pub fn bytes_sent(&self, count: u64) {
        self.bytes_sent.fetch_add(count, Ordering::Relaxed);
        counter!("termgate.bytes.sent").increment(count);
    }

    /// Record bytes received
    pub fn bytes_received(&self, count: u64) {
        self.bytes_received.fetch_add(count, Ordering::Relaxed);
        counter!("termgate.bytes.received").increment(count);
    }

    // Error tracking

    /// Record a connection error
    pub fn connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
        counter!("termgate.errors.connection").increment(1);
    }

    /// Record a negotiation that ended by timeout rather than a TTYPE report
    pub fn negotiation_timeout(&self) {
        self.negotiation_timeouts.fetch_add(1, Ordering::Relaxed);
        counter!("termgate.negotiation.timeouts").increment(1);
    }

    /// Record an application failure or panic
    pub fn application_error(&self) {
        self.application_errors.fetch_add(1, Ordering::Relaxed);
        counter!("termgate.errors.application").increment(1);
    }

    // Snapshot

    /// Get a snapshot of all metrics
    ///
    /// Counters are read one by one, so a snapshot taken while connections
    /// are busy may mix slightly different moments.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            negotiation_timeouts: self.negotiation_timeouts.load(Ordering::Relaxed),
            application_errors: self.application_errors.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
            avg_connection_duration: self.average_connection_duration(),
        }
    }

    fn average_connection_duration(&self) -> Duration {
        let total = self.total_connections.load(Ordering::Relaxed);
        let active = self.active_connections.load(Ordering::Relaxed);
        let closed = total.saturating_sub(active);
        if closed == 0 {
            return Duration::ZERO;
        }
        let total_ns = self.total_connection_duration_ns.load(Ordering::Relaxed);
        Duration::from_nanos(total_ns / closed)
    }
}

/// A snapshot of server metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total connections since server start
    pub total_connections: u64,
    /// Current active connections
    pub active_connections: u64,
    /// Connections refused because of the connection limit
    pub rejected_connections: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Total connection errors
    pub connection_errors: u64,
    /// Negotiations that fell back after the timeout
    pub negotiation_timeouts: u64,
    /// Application failures and panics
    pub application_errors: u64,
    /// Server uptime
    pub uptime: Duration,
    /// Average duration of closed connections
    pub avg_connection_duration: Duration,
}

impl MetricsSnapshot {
    /// Calculate bytes per second (sent)
    pub fn bytes_sent_per_sec(&self) -> f64 {
        if self.uptime.is_zero() {
            return 0.0;
        }
        self.bytes_sent as f64 / self.uptime.as_secs_f64()
    }

    /// Calculate bytes per second (received)
    pub fn bytes_received_per_sec(&self) -> f64 {
        if self.uptime.is_zero() {
            return 0.0;
        }
        self.bytes_received as f64 / self.uptime.as_secs_f64()
    }

    /// Calculate total error count
    pub fn total_errors(&self) -> u64 {
        self.connection_errors + self.application_errors
    }
}
