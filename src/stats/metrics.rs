//! Statistics and metrics for the bus router

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Router-wide counters
///
/// Updated lock-free from every connection task.
#[derive(Debug)]
pub struct BusStats {
    started_at: Instant,
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    rejected_connections: AtomicU64,
    registrations: AtomicU64,
    frames_routed: AtomicU64,
    frames_unroutable: AtomicU64,
    frames_dropped: AtomicU64,
    bytes_forwarded: AtomicU64,
}

/// Point-in-time copy of [`BusStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusStatsSnapshot {
    /// Connections ever accepted
    pub total_connections: u64,
    /// Connections currently open
    pub active_connections: u64,
    /// Connections refused by the connection limit
    pub rejected_connections: u64,
    /// Successful `sinit` registrations
    pub registrations: u64,
    /// Frames relayed to a registered connection
    pub frames_routed: u64,
    /// Frames whose destination was not registered
    pub frames_unroutable: u64,
    /// Frames lost to full or closed outbound queues
    pub frames_dropped: u64,
    /// Wire bytes relayed
    pub bytes_forwarded: u64,
    /// Time since the router started
    pub uptime: Duration,
}

impl BusStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
            registrations: AtomicU64::new(0),
            frames_routed: AtomicU64::new(0),
            frames_unroutable: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            bytes_forwarded: AtomicU64::new(0),
        }
    }

    pub(crate) fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn registered(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn routed(&self, bytes: usize) {
        self.frames_routed.fetch_add(1, Ordering::Relaxed);
        self.bytes_forwarded.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn unroutable(&self) {
        self.frames_unroutable.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counters
    pub fn snapshot(&self) -> BusStatsSnapshot {
        BusStatsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
            frames_routed: self.frames_routed.load(Ordering::Relaxed),
            frames_unroutable: self.frames_unroutable.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            bytes_forwarded: self.bytes_forwarded.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for BusStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let snap = BusStats::new().snapshot();
        assert_eq!(snap.total_connections, 0);
        assert_eq!(snap.active_connections, 0);
        assert_eq!(snap.frames_routed, 0);
        assert_eq!(snap.bytes_forwarded, 0);
    }

    #[test]
    fn test_connection_accounting() {
        let stats = BusStats::new();
        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();
        stats.connection_rejected();

        let snap = stats.snapshot();
        assert_eq!(snap.total_connections, 2);
        assert_eq!(snap.active_connections, 1);
        assert_eq!(snap.rejected_connections, 1);
    }

    #[test]
    fn test_frame_accounting() {
        let stats = BusStats::new();
        stats.routed(20);
        stats.routed(30);
        stats.unroutable();
        stats.dropped();
        stats.registered();

        let snap = stats.snapshot();
        assert_eq!(snap.frames_routed, 2);
        assert_eq!(snap.bytes_forwarded, 50);
        assert_eq!(snap.frames_unroutable, 1);
        assert_eq!(snap.frames_dropped, 1);
        assert_eq!(snap.registrations, 1);
    }
}
