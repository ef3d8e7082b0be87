//! Test fixtures shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rating_ledger::config::AppConfig;
use rating_ledger::error::{LedgerError, Result};
use rating_ledger::service::LedgerService;
use rating_ledger::store::{
    GameOrder, HistoryBound, InMemoryStore, NewGame, NewHistoricalScore, Store, Transaction,
};
use rating_ledger::types::{
    Competition, CompetitionId, Game, GameId, HistoricalScore, Player, PlayerId, Score, Team,
    TeamId, TeamSignature,
};
use rating_ledger::utils::{Clock, ManualClock};
use rating_ledger::StaticPlayerDirectory;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Players known to the directory; all but "frank" are eligible in the league
pub const PLAYERS: [(&str, &str); 6] = [
    ("alice", "Alice"),
    ("bob", "Bob"),
    ("carol", "Carol"),
    ("dave", "Dave"),
    ("erin", "Erin"),
    ("frank", "Frank"),
];

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 18, 0, 0).unwrap()
}

pub fn test_directory() -> StaticPlayerDirectory {
    StaticPlayerDirectory::with_players(PLAYERS.iter().map(|(id, name)| Player::new(*id, *name)))
}

pub fn player_set(ids: &[&str]) -> BTreeSet<PlayerId> {
    ids.iter().map(|id| id.to_string()).collect()
}

/// A ledger over an in-memory store with a manual clock
pub struct TestLedger {
    pub store: InMemoryStore,
    pub clock: Arc<ManualClock>,
    pub service: LedgerService,
    /// alice, bob, carol, dave and erin
    pub league: CompetitionId,
    /// Everyone
    pub cup: CompetitionId,
}

impl TestLedger {
    /// Announce a league game one minute after the previous one
    pub async fn play(&self, winners: &[&str], losers: &[&str]) -> Game {
        self.clock.advance(Duration::minutes(1));
        self.service
            .intake()
            .announce(winners.iter().copied(), losers.iter().copied(), self.league)
            .await
            .unwrap()
    }

    pub async fn score(&self, competition_id: CompetitionId, team_id: TeamId) -> Score {
        self.store
            .score(competition_id, team_id)
            .await
            .unwrap()
            .unwrap()
    }
}

async fn seed_competitions(store: &InMemoryStore) -> (CompetitionId, CompetitionId) {
    let league = Competition::new("league", base_time())
        .with_players(["alice", "bob", "carol", "dave", "erin"]);
    let cup = Competition::new("cup", base_time())
        .with_players(PLAYERS.iter().map(|(id, _)| id.to_string()));
    let ids = (league.id, cup.id);

    store.insert_competition(league).await;
    store.insert_competition(cup).await;
    ids
}

pub async fn create_test_ledger() -> TestLedger {
    create_test_ledger_with(AppConfig::default()).await
}

pub async fn create_test_ledger_with(config: AppConfig) -> TestLedger {
    let store = InMemoryStore::new();
    let (league, cup) = seed_competitions(&store).await;
    let clock = Arc::new(ManualClock::new(base_time()));

    let service = LedgerService::new(
        config,
        Arc::new(store.clone()),
        Arc::new(test_directory()),
        clock.clone(),
    )
    .unwrap();

    TestLedger {
        store,
        clock,
        service,
        league,
        cup,
    }
}

/// A service over a [`FlakyStore`]
pub struct FlakyLedger {
    pub service: LedgerService,
    pub store: Arc<FlakyStore>,
    pub league: CompetitionId,
    pub cup: CompetitionId,
}

/// A service over a store that fails the first `conflicts` team inserts
pub async fn create_flaky_ledger(
    conflicts: u32,
) -> (LedgerService, Arc<FlakyStore>, CompetitionId) {
    let ledger = create_flaky_ledger_with(conflicts).await;
    (ledger.service, ledger.store, ledger.league)
}

pub async fn create_flaky_ledger_with(conflicts: u32) -> FlakyLedger {
    let inner = InMemoryStore::new();
    let (league, cup) = seed_competitions(&inner).await;
    let store = Arc::new(FlakyStore::new(inner, conflicts));
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(base_time()));

    let service = LedgerService::new(
        AppConfig::default(),
        store.clone(),
        Arc::new(test_directory()),
        clock,
    )
    .unwrap();

    FlakyLedger {
        service,
        store,
        league,
        cup,
    }
}

/// Store wrapper that reports a concurrent team creation on the first
/// `conflicts` team inserts, as if another writer had won the race.
/// It can also fail one history append per transaction.
pub struct FlakyStore {
    inner: InMemoryStore,
    conflicts: Arc<AtomicU32>,
    /// 1-based append within a transaction that fails; 0 = never
    failing_append: Arc<AtomicU32>,
}

impl FlakyStore {
    pub fn new(inner: InMemoryStore, conflicts: u32) -> Self {
        Self {
            inner,
            conflicts: Arc::new(AtomicU32::new(conflicts)),
            failing_append: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Make the `nth` history append of every later transaction fail
    pub fn fail_history_append(&self, nth: u32) {
        self.failing_append.store(nth, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn inject_conflicts(&self, conflicts: u32) {
        self.conflicts.store(conflicts, Ordering::SeqCst);
    }

    pub fn conflicts_remaining(&self) -> u32 {
        self.conflicts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        Ok(Box::new(FlakyTransaction {
            inner: self.inner.begin().await?,
            conflicts: self.conflicts.clone(),
            failing_append: self.failing_append.load(Ordering::SeqCst),
            appends: 0,
        }))
    }

    async fn competition(&self, competition_id: CompetitionId) -> Result<Option<Competition>> {
        self.inner.competition(competition_id).await
    }

    async fn competition_by_name(&self, name: &str) -> Result<Option<Competition>> {
        self.inner.competition_by_name(name).await
    }

    async fn team(&self, team_id: TeamId) -> Result<Option<Team>> {
        self.inner.team(team_id).await
    }

    async fn team_by_signature(&self, signature: &TeamSignature) -> Result<Option<Team>> {
        self.inner.team_by_signature(signature).await
    }

    async fn teams_with_player(&self, player_id: &str) -> Result<Vec<Team>> {
        self.inner.teams_with_player(player_id).await
    }

    async fn score(&self, competition_id: CompetitionId, team_id: TeamId) -> Result<Option<Score>> {
        self.inner.score(competition_id, team_id).await
    }

    async fn scores(&self, competition_id: CompetitionId) -> Result<Vec<Score>> {
        self.inner.scores(competition_id).await
    }

    async fn game(&self, game_id: GameId) -> Result<Option<Game>> {
        self.inner.game(game_id).await
    }

    async fn games(
        &self,
        competition_id: CompetitionId,
        order: GameOrder,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Game>> {
        self.inner.games(competition_id, order, offset, limit).await
    }

    async fn games_for_player(
        &self,
        competition_id: CompetitionId,
        player_id: &str,
    ) -> Result<Vec<Game>> {
        self.inner.games_for_player(competition_id, player_id).await
    }

    async fn latest_history(
        &self,
        competition_id: CompetitionId,
        limit: usize,
    ) -> Result<Vec<HistoricalScore>> {
        self.inner.latest_history(competition_id, limit).await
    }

    async fn latest_history_for_teams(
        &self,
        competition_id: CompetitionId,
        team_ids: &[TeamId],
        bound: HistoryBound,
    ) -> Result<Option<HistoricalScore>> {
        self.inner
            .latest_history_for_teams(competition_id, team_ids, bound)
            .await
    }

    async fn history_for_games(
        &self,
        competition_id: CompetitionId,
        game_ids: &[GameId],
    ) -> Result<Vec<HistoricalScore>> {
        self.inner.history_for_games(competition_id, game_ids).await
    }

    async fn history_for_team(
        &self,
        competition_id: CompetitionId,
        team_id: TeamId,
    ) -> Result<Vec<HistoricalScore>> {
        self.inner.history_for_team(competition_id, team_id).await
    }

    async fn history_count(&self, competition_id: CompetitionId) -> Result<usize> {
        self.inner.history_count(competition_id).await
    }
}

struct FlakyTransaction {
    inner: Box<dyn Transaction>,
    conflicts: Arc<AtomicU32>,
    failing_append: u32,
    appends: u32,
}

#[async_trait]
impl Transaction for FlakyTransaction {
    async fn competition(&mut self, competition_id: CompetitionId) -> Result<Option<Competition>> {
        self.inner.competition(competition_id).await
    }

    async fn find_team(&mut self, signature: &TeamSignature) -> Result<Option<Team>> {
        self.inner.find_team(signature).await
    }

    async fn insert_team(&mut self, players: &BTreeSet<PlayerId>) -> Result<Team> {
        let injected = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if injected {
            return Err(LedgerError::ConcurrentTeamConflict {
                signature: TeamSignature::from_players(players).to_string(),
            }
            .into());
        }
        self.inner.insert_team(players).await
    }

    async fn score(
        &mut self,
        competition_id: CompetitionId,
        team_id: TeamId,
    ) -> Result<Option<Score>> {
        self.inner.score(competition_id, team_id).await
    }

    async fn put_score(&mut self, score: Score) -> Result<()> {
        self.inner.put_score(score).await
    }

    async fn insert_game(&mut self, game: NewGame) -> Result<Game> {
        self.inner.insert_game(game).await
    }

    async fn append_history(&mut self, row: NewHistoricalScore) -> Result<HistoricalScore> {
        self.appends += 1;
        if self.appends == self.failing_append {
            return Err(LedgerError::store("disk full").into());
        }
        self.inner.append_history(row).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}
