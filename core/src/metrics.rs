//! # ServerQueue Metrics
//!
//! Lock-free counters updated on the handler hot paths with atomic
//! increments. The broker periodically turns them into a
//! [`MetricsSnapshot`] and logs it as JSON through `tracing`.
//!
//! In a closed run without failures `items_put == items_taken + queue_len`,
//! which makes the snapshot useful for checking conservation of items.

use crate::protocol::Role;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Keep hot counters on separate cache lines
#[repr(align(64))]
#[derive(Debug, Default)]
struct CacheLineAligned<T>(T);

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    pub throughput: ThroughputMetrics,
    pub broker: BrokerMetrics,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, queue_len: usize, capacity: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
            queue_len,
            capacity,
            items_put: self.throughput.items_put(),
            items_taken: self.throughput.items_taken(),
            acks_sent: self.throughput.acks_sent(),
            active_producers: self.broker.active_connections(Role::Producer),
            active_consumers: self.broker.active_connections(Role::Consumer),
            total_connections: self.broker.total_connections(),
            protocol_errors: self.broker.protocol_errors.load(Ordering::Relaxed),
            io_errors: self.broker.io_errors.load(Ordering::Relaxed),
            interrupted: self.broker.interrupted.load(Ordering::Relaxed),
        }
    }

    /// Log one snapshot
    pub fn report(&self, queue_len: usize, capacity: usize) {
        let snapshot = self.snapshot(queue_len, capacity);
        match serde_json::to_string(&snapshot) {
            Ok(json) => info!(target: "serverqueue::metrics", "{}", json),
            Err(e) => info!(target: "serverqueue::metrics", "{:?} ({})", snapshot, e),
        }
    }
}

/// Item flow through the queue
#[derive(Debug, Default)]
pub struct ThroughputMetrics {
    items_put: CacheLineAligned<AtomicU64>,
    items_taken: CacheLineAligned<AtomicU64>,
    acks_sent: AtomicU64,
}

impl ThroughputMetrics {
    #[inline(always)]
    pub fn record_put(&self) {
        self.items_put.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_taken(&self) {
        self.items_taken.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_ack(&self) {
        self.acks_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn items_put(&self) -> u64 {
        self.items_put.0.load(Ordering::Relaxed)
    }

    pub fn items_taken(&self) -> u64 {
        self.items_taken.0.load(Ordering::Relaxed)
    }

    pub fn acks_sent(&self) -> u64 {
        self.acks_sent.load(Ordering::Relaxed)
    }
}

/// Connection lifecycle and failure counters
#[derive(Debug, Default)]
pub struct BrokerMetrics {
    active_producers: AtomicUsize,
    active_consumers: AtomicUsize,
    total_connections: AtomicU64,
    protocol_errors: AtomicU64,
    io_errors: AtomicU64,
    interrupted: AtomicU64,
}

impl BrokerMetrics {
    fn active(&self, role: Role) -> &AtomicUsize {
        match role {
            Role::Producer => &self.active_producers,
            Role::Consumer => &self.active_consumers,
        }
    }

    pub fn connection_opened(&self, role: Role) {
        self.active(role).fetch_add(1, Ordering::AcqRel);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self, role: Role) {
        self.active(role).fetch_sub(1, Ordering::AcqRel);
    }

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn io_error(&self) {
        self.io_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn interrupted(&self) {
        self.interrupted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_connections(&self, role: Role) -> usize {
        self.active(role).load(Ordering::Acquire)
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp_ms: u64,
    pub queue_len: usize,
    pub capacity: usize,
    pub items_put: u64,
    pub items_taken: u64,
    pub acks_sent: u64,
    pub active_producers: usize,
    pub active_consumers: usize,
    pub total_connections: u64,
    pub protocol_errors: u64,
    pub io_errors: u64,
    pub interrupted: u64,
}
