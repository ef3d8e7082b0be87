//! Metrics for the rating ledger
//!
//! Prometheus counters and histograms for game intake and statistics reads.

pub mod collector;

pub use collector::{IntakeMetrics, MetricsCollector, MetricsTimer, PerformanceMetrics};
