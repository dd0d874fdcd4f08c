//! Real-time engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Connections ever opened
    pub connections_total: AtomicU64,
    /// Connections currently open
    pub connections_active: AtomicU64,
    /// Outbound deliveries
    pub messages_sent: AtomicU64,
    /// Inbound frames
    pub messages_received: AtomicU64,
    /// Accepted student joins
    pub student_joins: AtomicU64,
    /// Joins refused because the student holds a shutdown record
    pub joins_refused: AtomicU64,
    /// Presence entries removed after a grace period
    pub grace_disconnects: AtomicU64,
    /// Remote shutdowns performed
    pub shutdowns: AtomicU64,
    /// Successful power-ons
    pub power_ons: AtomicU64,
    /// Power-ons rejected because the window had closed
    pub power_on_rejections: AtomicU64,
    /// Records flagged expired
    pub expirations: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection was opened.
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// A connection was closed.
    pub fn connection_closed(&self) {
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
    }

    /// Record `count` outbound deliveries.
    pub fn messages_sent(&self, count: u64) {
        self.messages_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one inbound frame.
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment a counter by one.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            student_joins: self.student_joins.load(Ordering::Relaxed),
            joins_refused: self.joins_refused.load(Ordering::Relaxed),
            grace_disconnects: self.grace_disconnects.load(Ordering::Relaxed),
            shutdowns: self.shutdowns.load(Ordering::Relaxed),
            power_ons: self.power_ons.load(Ordering::Relaxed),
            power_on_rejections: self.power_on_rejections.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Connections ever opened
    pub connections_total: u64,
    /// Connections currently open
    pub connections_active: u64,
    /// Outbound deliveries
    pub messages_sent: u64,
    /// Inbound frames
    pub messages_received: u64,
    /// Accepted student joins
    pub student_joins: u64,
    /// Refused student joins
    pub joins_refused: u64,
    /// Grace-period removals
    pub grace_disconnects: u64,
    /// Remote shutdowns
    pub shutdowns: u64,
    /// Successful power-ons
    pub power_ons: u64,
    /// Rejected power-ons
    pub power_on_rejections: u64,
    /// Expired records
    pub expirations: u64,
}
