//! Statistics over recorded games
//!
//! Every operation here is a pure read. Empty data yields empty results,
//! zero streaks or the prior score, never an error.

pub mod streaks;
pub mod trajectory;
pub mod weekly;

pub use streaks::{leading_run, longest_run};
pub use trajectory::{Trajectory, TrajectoryPoint};
pub use weekly::{weekly_stats, WeeklyStats};

use crate::error::{LedgerError, Result};
use crate::ledger::HistoryLedger;
use crate::metrics::MetricsCollector;
use crate::query::QueryFacade;
use crate::rating::RatingKernel;
use crate::store::Store;
use crate::types::{CompetitionId, Game, PlayerId, Rating, Team, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The actor's record against one opposing team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub opponent: Team,
    /// Opponent's current mu in the competition
    pub opponent_mu: f64,
    pub wins: u32,
    pub defeats: u32,
    /// Draw probability in percent between the actor's side of the latest
    /// meeting and the opponent, both at their current ratings
    pub fairness: f64,
    /// Most recent first
    pub games: Vec<Game>,
}

/// Draw probability against one other player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessEntry {
    pub player_id: PlayerId,
    pub opponent_mu: f64,
    /// Percent, 0..=100
    pub fairness: f64,
}

/// Wins and defeats over a window of games
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentSummary {
    pub wins: u32,
    pub defeats: u32,
    /// Most recent first
    pub games: Vec<Game>,
}

/// Read-only statistics per player and competition
#[derive(Clone)]
pub struct StatisticsEngine {
    store: Arc<dyn Store>,
    queries: QueryFacade,
    kernel: Arc<dyn RatingKernel>,
    metrics: Arc<MetricsCollector>,
    recent_games_count: usize,
}

impl StatisticsEngine {
    pub fn new(
        store: Arc<dyn Store>,
        kernel: Arc<dyn RatingKernel>,
        metrics: Arc<MetricsCollector>,
        latest_games_limit: usize,
        recent_games_count: usize,
    ) -> Self {
        let queries = QueryFacade::new(store.clone(), kernel.initial_rating(), latest_games_limit);
        Self {
            store,
            queries,
            kernel,
            metrics,
            recent_games_count,
        }
    }

    fn history(&self) -> &HistoryLedger {
        self.queries.history()
    }

    /// Per-opponent record of the actor, strongest opponent first
    pub async fn head2head(
        &self,
        actor: &str,
        competition_id: CompetitionId,
    ) -> Result<Vec<HeadToHead>> {
        let timer = self.metrics.start_timer();
        let games = self.queries.games_played_by(actor, competition_id).await?;

        // Opponents in order of the most recent meeting
        let mut order: Vec<TeamId> = Vec::new();
        let mut grouped: HashMap<TeamId, (Team, TeamId, Vec<Game>)> = HashMap::new();
        for game in games {
            let (Some(own), Some(opponent)) = (game.team_of(actor), game.opponent_of(actor)) else {
                continue;
            };
            let (own_id, opponent) = (own.id, opponent.clone());
            let entry = grouped.entry(opponent.id).or_insert_with(|| {
                order.push(opponent.id);
                (opponent, own_id, Vec::new())
            });
            entry.2.push(game);
        }

        let mut records = Vec::with_capacity(order.len());
        for opponent_id in order {
            let Some((opponent, own_id, games)) = grouped.remove(&opponent_id) else {
                continue;
            };
            let opponent_rating = self.queries.team_rating(competition_id, opponent.id).await?;
            let own_rating = self.queries.team_rating(competition_id, own_id).await?;
            let wins = games.iter().filter(|game| game.is_won_by(actor)).count() as u32;

            records.push(HeadToHead {
                opponent,
                opponent_mu: opponent_rating.mu,
                wins,
                defeats: games.len() as u32 - wins,
                fairness: self.kernel.quality(own_rating, opponent_rating) * 100.0,
                games,
            });
        }

        records.sort_by(|a, b| {
            b.opponent_mu
                .total_cmp(&a.opponent_mu)
                .then(a.opponent.id.cmp(&b.opponent.id))
        });

        self.metrics.record_statistics("head2head", timer.stop());
        Ok(records)
    }

    /// Draw probability against every other eligible player with a score
    pub async fn fairness(
        &self,
        actor: &str,
        competition_id: CompetitionId,
    ) -> Result<Vec<FairnessEntry>> {
        let timer = self.metrics.start_timer();
        let competition = self
            .queries
            .competition(competition_id)
            .await?
            .ok_or(LedgerError::UnknownCompetition { competition_id })?;

        let actor_rating = self.solo_rating(actor, competition_id).await?;
        let mut entries = Vec::new();
        for player_id in competition.players.iter().filter(|id| id.as_str() != actor) {
            let Some(score) = self.queries.score_of(player_id, competition_id).await? else {
                debug!("Skipping {} in fairness: no score yet", player_id);
                continue;
            };
            entries.push(FairnessEntry {
                player_id: player_id.clone(),
                opponent_mu: score.mu,
                fairness: self.kernel.quality(actor_rating, score.rating()) * 100.0,
            });
        }

        entries.sort_by(|a, b| b.opponent_mu.total_cmp(&a.opponent_mu));

        self.metrics.record_statistics("fairness", timer.stop());
        Ok(entries)
    }

    /// Wins and defeats over the actor's last `count` games
    pub async fn recent(
        &self,
        actor: &str,
        competition_id: CompetitionId,
        count: Option<usize>,
    ) -> Result<RecentSummary> {
        let timer = self.metrics.start_timer();
        let count = count.unwrap_or(self.recent_games_count);

        let games: Vec<Game> = self
            .queries
            .games_played_by(actor, competition_id)
            .await?
            .into_iter()
            .take(count)
            .collect();
        let wins = games.iter().filter(|game| game.is_won_by(actor)).count() as u32;

        self.metrics.record_statistics("recent", timer.stop());
        Ok(RecentSummary {
            wins,
            defeats: games.len() as u32 - wins,
            games,
        })
    }

    /// Longest run of consecutive wins
    pub async fn longest_streak(
        &self,
        actor: &str,
        competition_id: CompetitionId,
    ) -> Result<usize> {
        let timer = self.metrics.start_timer();
        let results = self.results(actor, competition_id).await?;
        self.metrics.record_statistics("longest_streak", timer.stop());
        Ok(longest_run(&results))
    }

    /// Wins since the actor's last defeat
    pub async fn current_streak(
        &self,
        actor: &str,
        competition_id: CompetitionId,
    ) -> Result<usize> {
        let timer = self.metrics.start_timer();
        let results = self.results(actor, competition_id).await?;
        self.metrics.record_statistics("current_streak", timer.stop());
        Ok(leading_run(&results))
    }

    /// Weekly buckets of the given games from the actor's point of view
    pub fn weekly(&self, actor: &str, games: &[Game]) -> Vec<WeeklyStats> {
        weekly_stats(actor, games)
    }

    /// Weekly buckets of every game in the competition
    pub async fn weekly_for(
        &self,
        actor: &str,
        competition_id: CompetitionId,
    ) -> Result<Vec<WeeklyStats>> {
        let timer = self.metrics.start_timer();
        let games = self.queries.games(competition_id).await?;
        let stats = weekly_stats(actor, &games);
        self.metrics.record_statistics("weekly", timer.stop());
        Ok(stats)
    }

    /// Per-player skill and position after each of the last `count` games
    pub async fn latest_results_by_player(
        &self,
        competition_id: CompetitionId,
        count: usize,
        offset: usize,
    ) -> Result<Trajectory> {
        let timer = self.metrics.start_timer();
        let competition = self
            .queries
            .competition(competition_id)
            .await?
            .ok_or(LedgerError::UnknownCompetition { competition_id })?;

        let trajectory = trajectory::reconstruct(
            self.store.as_ref(),
            self.history(),
            &competition,
            count,
            offset,
            self.kernel.initial_rating().mu,
        )
        .await?;

        self.metrics
            .record_statistics("latest_results_by_player", timer.stop());
        Ok(trajectory)
    }

    /// Win flags of the actor's games, most recent first
    async fn results(&self, actor: &str, competition_id: CompetitionId) -> Result<Vec<bool>> {
        Ok(self
            .queries
            .games_played_by(actor, competition_id)
            .await?
            .iter()
            .map(|game| game.is_won_by(actor))
            .collect())
    }

    async fn solo_rating(&self, player_id: &str, competition_id: CompetitionId) -> Result<Rating> {
        Ok(self
            .queries
            .score_of(player_id, competition_id)
            .await?
            .map_or(self.kernel.initial_rating(), |score| score.rating()))
    }
}
