//! Bus statistics

pub mod metrics;

pub use metrics::{BusStats, BusStatsSnapshot};
