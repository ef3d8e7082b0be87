//! Competition-scoped read adapters
//!
//! Thin wrappers over the store for the questions callers ask most: who
//! played what, what is a player's score, and how does the table look.

use crate::error::Result;
use crate::ledger::{HistoryEntry, HistoryLedger};
use crate::store::{GameOrder, HistoryBound, Store};
use crate::types::{
    Competition, CompetitionId, Game, GameId, PlayerId, Rating, Score, Team, TeamId,
    TeamSignature,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// One row of a competition table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1 = highest mu
    pub rank: usize,
    pub team: Team,
    pub score: Score,
}

/// Read-only access to games, scores and history
#[derive(Clone)]
pub struct QueryFacade {
    store: Arc<dyn Store>,
    history: HistoryLedger,
    initial: Rating,
    latest_games_limit: usize,
}

impl QueryFacade {
    pub fn new(store: Arc<dyn Store>, initial: Rating, latest_games_limit: usize) -> Self {
        let history = HistoryLedger::new(store.clone());
        Self {
            store,
            history,
            initial,
            latest_games_limit,
        }
    }

    pub async fn competition(&self, competition_id: CompetitionId) -> Result<Option<Competition>> {
        self.store.competition(competition_id).await
    }

    pub async fn competition_by_name(&self, name: &str) -> Result<Option<Competition>> {
        self.store.competition_by_name(name).await
    }

    /// Games of the competition the player took part in, newest first
    pub async fn games_played_by(
        &self,
        player_id: &str,
        competition_id: CompetitionId,
    ) -> Result<Vec<Game>> {
        self.store.games_for_player(competition_id, player_id).await
    }

    /// Score of the player's single-player team
    pub async fn score_of(
        &self,
        player_id: &str,
        competition_id: CompetitionId,
    ) -> Result<Option<Score>> {
        let players: BTreeSet<PlayerId> = std::iter::once(player_id.to_string()).collect();
        match self
            .store
            .team_by_signature(&TeamSignature::from_players(&players))
            .await?
        {
            Some(team) if team.is_solo() => self.store.score(competition_id, team.id).await,
            _ => Ok(None),
        }
    }

    /// Latest post-game score of any team containing the player
    ///
    /// With `before_game`, only games recorded before that one count.
    /// Returns `default` when the player has no history in the competition.
    pub async fn last_score_for_player(
        &self,
        player_id: &str,
        competition_id: CompetitionId,
        default: f64,
        before_game: Option<GameId>,
    ) -> Result<f64> {
        let bound = before_game.map_or(HistoryBound::Unbounded, HistoryBound::BeforeGame);
        Ok(self
            .history
            .latest_for_player(competition_id, player_id, bound)
            .await?
            .map_or(default, |row| row.score))
    }

    /// Teams ordered by current score, highest first
    pub async fn leaderboard(
        &self,
        competition_id: CompetitionId,
    ) -> Result<Vec<LeaderboardEntry>> {
        let scores = self.store.scores(competition_id).await?;
        let mut entries = Vec::with_capacity(scores.len());

        for score in scores {
            match self.store.team(score.team_id).await? {
                Some(team) => entries.push(LeaderboardEntry {
                    rank: entries.len() + 1,
                    team,
                    score,
                }),
                None => debug!("Skipping score of unknown team {}", score.team_id),
            }
        }

        Ok(entries)
    }

    /// Most recent games, by date then id; `None` uses the configured page size
    pub async fn latest_games(
        &self,
        competition_id: CompetitionId,
        limit: Option<usize>,
    ) -> Result<Vec<Game>> {
        let limit = limit.unwrap_or(self.latest_games_limit);
        self.store
            .games(competition_id, GameOrder::Newest, 0, Some(limit))
            .await
    }

    /// Every game of the competition, most recently recorded first
    pub async fn games(&self, competition_id: CompetitionId) -> Result<Vec<Game>> {
        self.store
            .games(competition_id, GameOrder::Recorded, 0, None)
            .await
    }

    /// The last history rows with their games
    pub async fn latest_history(
        &self,
        competition_id: CompetitionId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        self.history.latest(competition_id, limit).await
    }

    /// Current score of a team, or the prior if it has not played yet
    pub async fn team_rating(
        &self,
        competition_id: CompetitionId,
        team_id: TeamId,
    ) -> Result<Rating> {
        Ok(self
            .store
            .score(competition_id, team_id)
            .await?
            .map_or(self.initial, |score| score.rating()))
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    pub fn initial_rating(&self) -> Rating {
        self.initial
    }
}
