//! In-memory store implementation
//!
//! A single `tokio` read/write lock guards the whole state. A transaction
//! holds the write lock from `begin` until it is committed or dropped, which
//! serializes writers (and with them team creation) while readers only ever
//! see committed state. Writes are staged inside the transaction and applied
//! in one step on commit.

use crate::error::{LedgerError, Result};
use crate::store::{
    GameOrder, HistoryBound, NewGame, NewHistoricalScore, Store, Transaction,
};
use crate::types::{
    Competition, CompetitionId, Game, GameId, HistoricalScore, HistoricalScoreId, PlayerId, Score,
    Team, TeamId, TeamSignature,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

#[derive(Debug)]
struct StoreState {
    competitions: HashMap<CompetitionId, Competition>,
    teams: BTreeMap<TeamId, Team>,
    /// Unique index on the canonical player set
    team_index: HashMap<TeamSignature, TeamId>,
    scores: HashMap<(CompetitionId, TeamId), Score>,
    games: BTreeMap<GameId, Game>,
    history: BTreeMap<HistoricalScoreId, HistoricalScore>,
    next_team_id: TeamId,
    next_game_id: GameId,
    next_history_id: HistoricalScoreId,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            competitions: HashMap::new(),
            teams: BTreeMap::new(),
            team_index: HashMap::new(),
            scores: HashMap::new(),
            games: BTreeMap::new(),
            history: BTreeMap::new(),
            next_team_id: 1,
            next_game_id: 1,
            next_history_id: 1,
        }
    }
}

impl StoreState {
    fn history_in_bound(&self, row: &HistoricalScore, bound: HistoryBound) -> bool {
        match bound {
            HistoryBound::Unbounded => true,
            HistoryBound::AtOrBefore(id) => row.id <= id,
            HistoryBound::BeforeGame(game_id) => row.game_id < game_id,
        }
    }
}

/// In-memory store for tests, replays and single-process deployments
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a competition; competitions are owned by the caller
    pub async fn insert_competition(&self, competition: Competition) {
        let mut state = self.state.write().await;
        state.competitions.insert(competition.id, competition);
    }

    pub async fn team_count(&self) -> usize {
        self.state.read().await.teams.len()
    }

    pub async fn game_count(&self) -> usize {
        self.state.read().await.games.len()
    }

    pub async fn score_count(&self) -> usize {
        self.state.read().await.scores.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let state = self.state.clone().write_owned().await;
        Ok(Box::new(InMemoryTransaction {
            state,
            staged: Staged::default(),
        }))
    }

    async fn competition(&self, competition_id: CompetitionId) -> Result<Option<Competition>> {
        let state = self.state.read().await;
        Ok(state.competitions.get(&competition_id).cloned())
    }

    async fn competition_by_name(&self, name: &str) -> Result<Option<Competition>> {
        let state = self.state.read().await;
        Ok(state
            .competitions
            .values()
            .find(|competition| competition.name == name)
            .cloned())
    }

    async fn team(&self, team_id: TeamId) -> Result<Option<Team>> {
        let state = self.state.read().await;
        Ok(state.teams.get(&team_id).cloned())
    }

    async fn team_by_signature(&self, signature: &TeamSignature) -> Result<Option<Team>> {
        let state = self.state.read().await;
        Ok(state
            .team_index
            .get(signature)
            .and_then(|id| state.teams.get(id))
            .cloned())
    }

    async fn teams_with_player(&self, player_id: &str) -> Result<Vec<Team>> {
        let state = self.state.read().await;
        Ok(state
            .teams
            .values()
            .filter(|team| team.contains(player_id))
            .cloned()
            .collect())
    }

    async fn score(&self, competition_id: CompetitionId, team_id: TeamId) -> Result<Option<Score>> {
        let state = self.state.read().await;
        Ok(state.scores.get(&(competition_id, team_id)).cloned())
    }

    async fn scores(&self, competition_id: CompetitionId) -> Result<Vec<Score>> {
        let state = self.state.read().await;
        let mut scores: Vec<Score> = state
            .scores
            .values()
            .filter(|score| score.competition_id == competition_id)
            .cloned()
            .collect();

        scores.sort_by(|a, b| b.mu.total_cmp(&a.mu).then(a.team_id.cmp(&b.team_id)));
        Ok(scores)
    }

    async fn game(&self, game_id: GameId) -> Result<Option<Game>> {
        let state = self.state.read().await;
        Ok(state.games.get(&game_id).cloned())
    }

    async fn games(
        &self,
        competition_id: CompetitionId,
        order: GameOrder,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Game>> {
        let state = self.state.read().await;
        let mut games: Vec<&Game> = state
            .games
            .values()
            .rev()
            .filter(|game| game.counts_toward(competition_id))
            .collect();

        if order == GameOrder::Newest {
            games.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        }

        Ok(games
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn games_for_player(
        &self,
        competition_id: CompetitionId,
        player_id: &str,
    ) -> Result<Vec<Game>> {
        let state = self.state.read().await;
        let mut games: Vec<Game> = state
            .games
            .values()
            .filter(|game| game.counts_toward(competition_id) && game.involves(player_id))
            .cloned()
            .collect();

        games.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(games)
    }

    async fn latest_history(
        &self,
        competition_id: CompetitionId,
        limit: usize,
    ) -> Result<Vec<HistoricalScore>> {
        let state = self.state.read().await;
        Ok(state
            .history
            .values()
            .rev()
            .filter(|row| row.competition_id == competition_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn latest_history_for_teams(
        &self,
        competition_id: CompetitionId,
        team_ids: &[TeamId],
        bound: HistoryBound,
    ) -> Result<Option<HistoricalScore>> {
        let state = self.state.read().await;
        let teams: HashSet<TeamId> = team_ids.iter().copied().collect();

        Ok(state
            .history
            .values()
            .rev()
            .filter(|row| row.competition_id == competition_id && teams.contains(&row.team_id))
            .find(|row| state.history_in_bound(row, bound))
            .cloned())
    }

    async fn history_for_games(
        &self,
        competition_id: CompetitionId,
        game_ids: &[GameId],
    ) -> Result<Vec<HistoricalScore>> {
        let state = self.state.read().await;
        let games: HashSet<GameId> = game_ids.iter().copied().collect();

        Ok(state
            .history
            .values()
            .filter(|row| row.competition_id == competition_id && games.contains(&row.game_id))
            .cloned()
            .collect())
    }

    async fn history_for_team(
        &self,
        competition_id: CompetitionId,
        team_id: TeamId,
    ) -> Result<Vec<HistoricalScore>> {
        let state = self.state.read().await;
        Ok(state
            .history
            .values()
            .filter(|row| row.competition_id == competition_id && row.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn history_count(&self, competition_id: CompetitionId) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state
            .history
            .values()
            .filter(|row| row.competition_id == competition_id)
            .count())
    }
}

/// Writes not yet visible to readers
#[derive(Debug, Default)]
struct Staged {
    teams: Vec<Team>,
    scores: HashMap<(CompetitionId, TeamId), Score>,
    games: Vec<Game>,
    history: Vec<HistoricalScore>,
}

struct InMemoryTransaction {
    state: OwnedRwLockWriteGuard<StoreState>,
    staged: Staged,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn competition(&mut self, competition_id: CompetitionId) -> Result<Option<Competition>> {
        Ok(self.state.competitions.get(&competition_id).cloned())
    }

    async fn find_team(&mut self, signature: &TeamSignature) -> Result<Option<Team>> {
        if let Some(team) = self
            .staged
            .teams
            .iter()
            .find(|team| &team.signature() == signature)
        {
            return Ok(Some(team.clone()));
        }

        Ok(self
            .state
            .team_index
            .get(signature)
            .and_then(|id| self.state.teams.get(id))
            .cloned())
    }

    async fn insert_team(&mut self, players: &BTreeSet<PlayerId>) -> Result<Team> {
        if players.is_empty() {
            return Err(LedgerError::store("cannot insert a team without players").into());
        }

        let signature = TeamSignature::from_players(players);
        if self.find_team(&signature).await?.is_some() {
            return Err(LedgerError::ConcurrentTeamConflict {
                signature: signature.to_string(),
            }
            .into());
        }

        let team = Team {
            id: self.state.next_team_id + self.staged.teams.len() as TeamId,
            players: players.clone(),
        };
        self.staged.teams.push(team.clone());
        Ok(team)
    }

    async fn score(
        &mut self,
        competition_id: CompetitionId,
        team_id: TeamId,
    ) -> Result<Option<Score>> {
        let key = (competition_id, team_id);
        Ok(self
            .staged
            .scores
            .get(&key)
            .or_else(|| self.state.scores.get(&key))
            .cloned())
    }

    async fn put_score(&mut self, score: Score) -> Result<()> {
        self.staged
            .scores
            .insert((score.competition_id, score.team_id), score);
        Ok(())
    }

    async fn insert_game(&mut self, game: NewGame) -> Result<Game> {
        let game = Game {
            id: self.state.next_game_id + self.staged.games.len() as GameId,
            winner: game.winner,
            loser: game.loser,
            date: game.date,
            competitions: game.competitions,
        };
        self.staged.games.push(game.clone());
        Ok(game)
    }

    async fn append_history(&mut self, row: NewHistoricalScore) -> Result<HistoricalScore> {
        let row = HistoricalScore {
            id: self.state.next_history_id + self.staged.history.len() as HistoricalScoreId,
            game_id: row.game_id,
            competition_id: row.competition_id,
            team_id: row.team_id,
            score: row.score,
        };
        self.staged.history.push(row.clone());
        Ok(row)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { mut state, staged } = *self;

        debug!(
            "Committing transaction - teams: {}, scores: {}, games: {}, history rows: {}",
            staged.teams.len(),
            staged.scores.len(),
            staged.games.len(),
            staged.history.len()
        );

        state.next_team_id += staged.teams.len() as TeamId;
        for team in staged.teams {
            state.team_index.insert(team.signature(), team.id);
            state.teams.insert(team.id, team);
        }

        state.scores.extend(staged.scores);

        state.next_game_id += staged.games.len() as GameId;
        for game in staged.games {
            state.games.insert(game.id, game);
        }

        state.next_history_id += staged.history.len() as HistoricalScoreId;
        for row in staged.history {
            state.history.insert(row.id, row);
        }

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        debug!(
            "Rolling back transaction - {} staged history rows discarded",
            self.staged.history.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn players(ids: &[&str]) -> BTreeSet<PlayerId> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let team = tx.insert_team(&players(&["alice"])).await.unwrap();
        assert_eq!(team.id, 1);
        tx.commit().await.unwrap();

        let found = store
            .team_by_signature(&team.signature())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, team);
        assert_eq!(store.teams_with_player("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_transaction_leaves_no_trace() {
        let store = InMemoryStore::new();
        let competition = Competition::new("league", Utc::now());
        let competition_id = competition.id;
        store.insert_competition(competition).await;

        {
            let mut tx = store.begin().await.unwrap();
            let winner = tx.insert_team(&players(&["alice"])).await.unwrap();
            let loser = tx.insert_team(&players(&["bob"])).await.unwrap();
            let game = tx
                .insert_game(NewGame {
                    winner: winner.clone(),
                    loser,
                    date: Utc::now(),
                    competitions: vec![competition_id],
                })
                .await
                .unwrap();
            tx.append_history(NewHistoricalScore {
                game_id: game.id,
                competition_id,
                team_id: winner.id,
                score: 1010.0,
            })
            .await
            .unwrap();
            tx.put_score(Score::initial(
                competition_id,
                winner.id,
                crate::types::Rating::new(1000.0, 333.0),
            ))
            .await
            .unwrap();
        }

        assert_eq!(store.team_count().await, 0);
        assert_eq!(store.game_count().await, 0);
        assert_eq!(store.score_count().await, 0);
        assert_eq!(store.history_count(competition_id).await.unwrap(), 0);

        // Identifiers are not consumed by a discarded transaction
        let mut tx = store.begin().await.unwrap();
        let team = tx.insert_team(&players(&["carol"])).await.unwrap();
        assert_eq!(team.id, 1);
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_team_is_a_conflict() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_team(&players(&["alice", "bob"])).await.unwrap();
        let err = tx
            .insert_team(&players(&["bob", "alice"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::ConcurrentTeamConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_team_requires_exact_player_set() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_team(&players(&["alice", "bob"])).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let solo_signature = TeamSignature::from_players(&players(&["alice"]));
        assert!(tx.find_team(&solo_signature).await.unwrap().is_none());
        let exact = TeamSignature::from_players(&players(&["bob", "alice"]));
        assert!(tx.find_team(&exact).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_history_ids_increase_across_transactions() {
        let store = InMemoryStore::new();
        let competition_id = uuid::Uuid::new_v4();
        let mut ids = Vec::new();

        for game_id in 1..=3 {
            let mut tx = store.begin().await.unwrap();
            for team_id in [1, 2] {
                let row = tx
                    .append_history(NewHistoricalScore {
                        game_id,
                        competition_id,
                        team_id,
                        score: 1000.0,
                    })
                    .await
                    .unwrap();
                ids.push(row.id);
            }
            tx.commit().await.unwrap();
        }

        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        let latest = store.latest_history(competition_id, 2).await.unwrap();
        assert_eq!(latest.iter().map(|row| row.id).collect::<Vec<_>>(), vec![6, 5]);

        let before = store
            .latest_history_for_teams(competition_id, &[1], HistoryBound::AtOrBefore(4))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before.id, 3);

        let before_game = store
            .latest_history_for_teams(competition_id, &[2], HistoryBound::BeforeGame(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before_game.id, 2);

        assert!(store
            .latest_history_for_teams(competition_id, &[2], HistoryBound::BeforeGame(1))
            .await
            .unwrap()
            .is_none());
    }
}
