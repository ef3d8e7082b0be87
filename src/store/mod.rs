//! Storage interface for teams, scores, games and historical scores
//!
//! This module defines the transactional store the engine is written
//! against. Reads go through [`Store`] and only ever observe committed data;
//! writes happen inside a [`Transaction`] that is either committed as a whole
//! or dropped without effect.

pub mod memory;

pub use memory::InMemoryStore;

use crate::error::Result;
use crate::types::{
    Competition, CompetitionId, Game, GameId, HistoricalScore, HistoricalScoreId, PlayerId, Score,
    Team, TeamId, TeamSignature,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Ordering for game listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOrder {
    /// Most recent date first, ties broken by id
    Newest,
    /// Highest id first (recording order)
    Recorded,
}

/// Upper bound on historical score lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryBound {
    Unbounded,
    /// Rows with an identifier less than or equal to this one
    AtOrBefore(HistoricalScoreId),
    /// Rows of games recorded before this game
    BeforeGame(GameId),
}

/// A game waiting to be recorded
#[derive(Debug, Clone)]
pub struct NewGame {
    pub winner: Team,
    pub loser: Team,
    pub date: DateTime<Utc>,
    pub competitions: Vec<CompetitionId>,
}

/// A historical score row waiting to be appended
#[derive(Debug, Clone)]
pub struct NewHistoricalScore {
    pub game_id: GameId,
    pub competition_id: CompetitionId,
    pub team_id: TeamId,
    pub score: f64,
}

/// Read side of the store plus the entry point for transactions
#[async_trait]
pub trait Store: Send + Sync {
    /// Start a write transaction
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    async fn competition(&self, competition_id: CompetitionId) -> Result<Option<Competition>>;

    async fn competition_by_name(&self, name: &str) -> Result<Option<Competition>>;

    async fn team(&self, team_id: TeamId) -> Result<Option<Team>>;

    /// The team with exactly this player set
    async fn team_by_signature(&self, signature: &TeamSignature) -> Result<Option<Team>>;

    /// All teams the player is a member of
    async fn teams_with_player(&self, player_id: &str) -> Result<Vec<Team>>;

    async fn score(&self, competition_id: CompetitionId, team_id: TeamId) -> Result<Option<Score>>;

    /// Every score in the competition, highest mu first
    async fn scores(&self, competition_id: CompetitionId) -> Result<Vec<Score>>;

    async fn game(&self, game_id: GameId) -> Result<Option<Game>>;

    /// A page of the competition's games
    async fn games(
        &self,
        competition_id: CompetitionId,
        order: GameOrder,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Game>>;

    /// Games of the competition the player took part in, newest first
    async fn games_for_player(
        &self,
        competition_id: CompetitionId,
        player_id: &str,
    ) -> Result<Vec<Game>>;

    /// The last `limit` rows of the competition, highest identifier first
    async fn latest_history(
        &self,
        competition_id: CompetitionId,
        limit: usize,
    ) -> Result<Vec<HistoricalScore>>;

    /// Most recent row of any of `team_ids` within the bound
    async fn latest_history_for_teams(
        &self,
        competition_id: CompetitionId,
        team_ids: &[TeamId],
        bound: HistoryBound,
    ) -> Result<Option<HistoricalScore>>;

    /// All rows of the given games in the competition, ascending identifier
    async fn history_for_games(
        &self,
        competition_id: CompetitionId,
        game_ids: &[GameId],
    ) -> Result<Vec<HistoricalScore>>;

    /// All rows of a team in the competition, ascending identifier
    async fn history_for_team(
        &self,
        competition_id: CompetitionId,
        team_id: TeamId,
    ) -> Result<Vec<HistoricalScore>>;

    async fn history_count(&self, competition_id: CompetitionId) -> Result<usize>;
}

/// A unit of work; dropping it without `commit` discards every write
#[async_trait]
pub trait Transaction: Send {
    async fn competition(&mut self, competition_id: CompetitionId) -> Result<Option<Competition>>;

    async fn find_team(&mut self, signature: &TeamSignature) -> Result<Option<Team>>;

    /// Insert a team; fails with `ConcurrentTeamConflict` if the player set already exists
    async fn insert_team(&mut self, players: &BTreeSet<PlayerId>) -> Result<Team>;

    async fn score(&mut self, competition_id: CompetitionId, team_id: TeamId)
        -> Result<Option<Score>>;

    async fn put_score(&mut self, score: Score) -> Result<()>;

    async fn insert_game(&mut self, game: NewGame) -> Result<Game>;

    /// Append a row; identifiers increase strictly in append order
    async fn append_history(&mut self, row: NewHistoricalScore) -> Result<HistoricalScore>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
