//! Append-only history of post-game scores
//!
//! Every recorded game leaves exactly two rows per competition it counts
//! toward, winner first. Row identifiers are the only clock statistics rely
//! on: "the state before game G" is everything with a smaller identifier.

use crate::error::{LedgerError, Result};
use crate::store::{HistoryBound, NewHistoricalScore, Store, Transaction};
use crate::types::{CompetitionId, Game, GameId, HistoricalScore, HistoricalScoreId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A history row joined with the game that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub row: HistoricalScore,
    pub game: Game,
}

impl HistoryEntry {
    pub fn is_win(&self) -> bool {
        self.game.winner.id == self.row.team_id
    }
}

/// Read and append access to the history ledger
#[derive(Clone)]
pub struct HistoryLedger {
    store: Arc<dyn Store>,
}

impl HistoryLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append a row inside the announce transaction
    pub async fn append(
        &self,
        tx: &mut dyn Transaction,
        game_id: GameId,
        competition_id: CompetitionId,
        team_id: TeamId,
        score: f64,
    ) -> Result<HistoricalScore> {
        tx.append_history(NewHistoricalScore {
            game_id,
            competition_id,
            team_id,
            score,
        })
        .await
    }

    /// The last `limit` rows of a competition with their games, newest first
    pub async fn latest(
        &self,
        competition_id: CompetitionId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let rows = self.store.latest_history(competition_id, limit).await?;
        let mut games: HashMap<GameId, Game> = HashMap::new();
        let mut entries = Vec::with_capacity(rows.len());

        for row in rows {
            if !games.contains_key(&row.game_id) {
                let game = self.store.game(row.game_id).await?.ok_or_else(|| {
                    LedgerError::store(format!(
                        "history row {} references missing game {}",
                        row.id, row.game_id
                    ))
                })?;
                games.insert(row.game_id, game);
            }
            let game = games[&row.game_id].clone();
            entries.push(HistoryEntry { row, game });
        }

        Ok(entries)
    }

    /// Most recent row of the team with an identifier at or below `boundary`
    pub async fn latest_for_team_before(
        &self,
        competition_id: CompetitionId,
        team_id: TeamId,
        boundary: HistoricalScoreId,
    ) -> Result<Option<HistoricalScore>> {
        self.store
            .latest_history_for_teams(
                competition_id,
                &[team_id],
                HistoryBound::AtOrBefore(boundary),
            )
            .await
    }

    /// Most recent row of any team containing the player, within `bound`
    pub async fn latest_for_player(
        &self,
        competition_id: CompetitionId,
        player_id: &str,
        bound: HistoryBound,
    ) -> Result<Option<HistoricalScore>> {
        let team_ids: Vec<TeamId> = self
            .store
            .teams_with_player(player_id)
            .await?
            .into_iter()
            .map(|team| team.id)
            .collect();

        if team_ids.is_empty() {
            return Ok(None);
        }

        self.store
            .latest_history_for_teams(competition_id, &team_ids, bound)
            .await
    }

    /// The single row a game produced for a team
    pub async fn for_game_and_team(
        &self,
        game_id: GameId,
        competition_id: CompetitionId,
        team_id: TeamId,
    ) -> Result<HistoricalScore> {
        let mut rows: Vec<HistoricalScore> = self
            .store
            .history_for_games(competition_id, &[game_id])
            .await?
            .into_iter()
            .filter(|row| row.team_id == team_id)
            .collect();

        match rows.len() {
            1 => Ok(rows.remove(0)),
            0 => Err(LedgerError::store(format!(
                "no history row for game {} and team {} in competition {}",
                game_id, team_id, competition_id
            ))
            .into()),
            n => Err(LedgerError::store(format!(
                "{} history rows for game {} and team {} in competition {}",
                n, game_id, team_id, competition_id
            ))
            .into()),
        }
    }

    /// Rows of many games keyed by (game, team)
    pub async fn for_games(
        &self,
        competition_id: CompetitionId,
        game_ids: &[GameId],
    ) -> Result<HashMap<(GameId, TeamId), HistoricalScore>> {
        Ok(self
            .store
            .history_for_games(competition_id, game_ids)
            .await?
            .into_iter()
            .map(|row| ((row.game_id, row.team_id), row))
            .collect())
    }

    /// All rows of a team, oldest first
    pub async fn for_team(
        &self,
        competition_id: CompetitionId,
        team_id: TeamId,
    ) -> Result<Vec<HistoricalScore>> {
        self.store.history_for_team(competition_id, team_id).await
    }

    pub async fn count(&self, competition_id: CompetitionId) -> Result<usize> {
        self.store.history_count(competition_id).await
    }
}
