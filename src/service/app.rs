//! Ledger service wiring
//!
//! `LedgerService` owns one instance of every engine component, built from
//! an `AppConfig` around a store, a player directory and a clock supplied
//! by the caller.

use crate::config::{validate_config, AppConfig};
use crate::directory::PlayerDirectory;
use crate::error::Result as LedgerResult;
use crate::ledger::GameIntake;
use crate::metrics::MetricsCollector;
use crate::query::QueryFacade;
use crate::rating::{RatingKernel, TrueSkillKernel};
use crate::stats::{FairnessEntry, HeadToHead, RecentSummary, StatisticsEngine, WeeklyStats};
use crate::store::Store;
use crate::types::{CompetitionId, PlayerId};
use crate::utils::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Season replay error: {message}")]
    Replay { message: String },
}

/// Everything the statistics engine knows about one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerReport {
    pub player_id: PlayerId,
    pub competition_id: CompetitionId,
    pub head2head: Vec<HeadToHead>,
    pub fairness: Vec<FairnessEntry>,
    pub recent: RecentSummary,
    pub longest_streak: usize,
    pub current_streak: usize,
    pub weekly: Vec<WeeklyStats>,
}

/// The assembled engine
pub struct LedgerService {
    config: AppConfig,
    store: Arc<dyn Store>,
    directory: Arc<dyn PlayerDirectory>,
    metrics: Arc<MetricsCollector>,
    intake: GameIntake,
    queries: QueryFacade,
    stats: StatisticsEngine,
}

impl LedgerService {
    /// Validate the configuration and build every component
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        directory: Arc<dyn PlayerDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServiceError> {
        validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        info!(
            "Initializing {} - mu0={}, sigma0={:.3}, eligibility={:?}",
            config.service.name,
            config.rating.initial_mu,
            config.rating.initial_sigma,
            config.engine.eligibility
        );

        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let kernel: Arc<dyn RatingKernel> = Arc::new(
            TrueSkillKernel::new(config.rating).map_err(|e| {
                ServiceError::Initialization {
                    message: format!("Failed to create rating kernel: {}", e),
                }
            })?,
        );

        let intake = GameIntake::new(
            store.clone(),
            directory.clone(),
            kernel.clone(),
            clock,
            metrics.clone(),
            config.engine.clone(),
        );
        let queries = QueryFacade::new(
            store.clone(),
            kernel.initial_rating(),
            config.engine.latest_games_limit,
        );
        let stats = StatisticsEngine::new(
            store.clone(),
            kernel,
            metrics.clone(),
            config.engine.latest_games_limit,
            config.engine.recent_games_count,
        );

        Ok(Self {
            config,
            store,
            directory,
            metrics,
            intake,
            queries,
            stats,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn intake(&self) -> &GameIntake {
        &self.intake
    }

    pub fn queries(&self) -> &QueryFacade {
        &self.queries
    }

    pub fn stats(&self) -> &StatisticsEngine {
        &self.stats
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    /// Display names for a set of players, unknown ids omitted
    pub async fn display_names(
        &self,
        player_ids: &[PlayerId],
    ) -> LedgerResult<BTreeMap<PlayerId, String>> {
        self.directory.display_names(player_ids).await
    }

    /// Collect every per-player statistic in one report
    pub async fn player_report(
        &self,
        player_id: &str,
        competition_id: CompetitionId,
    ) -> LedgerResult<PlayerReport> {
        Ok(PlayerReport {
            player_id: player_id.to_string(),
            competition_id,
            head2head: self.stats.head2head(player_id, competition_id).await?,
            fairness: self.stats.fairness(player_id, competition_id).await?,
            recent: self.stats.recent(player_id, competition_id, None).await?,
            longest_streak: self.stats.longest_streak(player_id, competition_id).await?,
            current_streak: self.stats.current_streak(player_id, competition_id).await?,
            weekly: self.stats.weekly_for(player_id, competition_id).await?,
        })
    }
}
