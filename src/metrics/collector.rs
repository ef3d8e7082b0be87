//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the rating ledger: announce
//! throughput and failures, team creation, conflict retries and the time
//! spent in the rating kernel and statistics reads.

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the ledger
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Game intake metrics
    intake_metrics: IntakeMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Game intake metrics
#[derive(Clone)]
pub struct IntakeMetrics {
    /// Games committed
    pub games_announced_total: IntCounter,

    /// Rejected or failed announces by error kind
    pub announce_failures_total: IntCounterVec,

    /// Teams created by the resolver
    pub teams_created_total: IntCounter,

    /// Announce transactions re-run after a team conflict
    pub team_conflict_retries_total: IntCounter,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// End-to-end announce time
    pub announce_duration: Histogram,

    /// Rating kernel time per update
    pub rating_update_duration: Histogram,

    /// Statistics read time by operation
    pub statistics_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let intake_metrics = IntakeMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            intake_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get intake metrics
    pub fn intake(&self) -> &IntakeMetrics {
        &self.intake_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a committed game
    pub fn record_game_announced(&self, duration: Duration) {
        self.intake_metrics.games_announced_total.inc();
        self.performance_metrics
            .announce_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a failed announce
    pub fn record_announce_failure(&self, kind: &str, duration: Duration) {
        self.intake_metrics
            .announce_failures_total
            .with_label_values(&[kind])
            .inc();
        self.performance_metrics
            .announce_duration
            .observe(duration.as_secs_f64());
    }

    pub fn record_teams_created(&self, count: u64) {
        self.intake_metrics.teams_created_total.inc_by(count);
    }

    pub fn record_team_conflict_retry(&self) {
        self.intake_metrics.team_conflict_retries_total.inc();
    }

    /// Record rating calculation duration
    pub fn record_rating_update(&self, duration: Duration) {
        self.performance_metrics
            .rating_update_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a statistics read
    pub fn record_statistics(&self, operation: &str, duration: Duration) {
        self.performance_metrics
            .statistics_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl IntakeMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let games_announced_total = IntCounter::new(
            "rating_ledger_games_announced_total",
            "Total games recorded",
        )?;
        registry.register(Box::new(games_announced_total.clone()))?;

        let announce_failures_total = IntCounterVec::new(
            Opts::new(
                "rating_ledger_announce_failures_total",
                "Total announces rejected or failed",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(announce_failures_total.clone()))?;

        let teams_created_total = IntCounter::new(
            "rating_ledger_teams_created_total",
            "Total teams created on first use",
        )?;
        registry.register(Box::new(teams_created_total.clone()))?;

        let team_conflict_retries_total = IntCounter::new(
            "rating_ledger_team_conflict_retries_total",
            "Total announce retries caused by concurrent team creation",
        )?;
        registry.register(Box::new(team_conflict_retries_total.clone()))?;

        Ok(Self {
            games_announced_total,
            announce_failures_total,
            teams_created_total,
            team_conflict_retries_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let announce_duration = Histogram::with_opts(
            HistogramOpts::new(
                "rating_ledger_announce_duration_seconds",
                "Time spent recording a game",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(announce_duration.clone()))?;

        let rating_update_duration = Histogram::with_opts(
            HistogramOpts::new(
                "rating_ledger_rating_update_duration_seconds",
                "Time spent in the rating kernel",
            )
            .buckets(vec![0.000_001, 0.000_01, 0.0001, 0.001, 0.01]),
        )?;
        registry.register(Box::new(rating_update_duration.clone()))?;

        let statistics_duration = HistogramVec::new(
            HistogramOpts::new(
                "rating_ledger_statistics_duration_seconds",
                "Time spent computing statistics",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(statistics_duration.clone()))?;

        Ok(Self {
            announce_duration,
            rating_update_duration,
            statistics_duration,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
