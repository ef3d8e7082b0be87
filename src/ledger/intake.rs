//! Game intake
//!
//! The only write path of the ledger. An announce validates the two player
//! sets, then in one transaction resolves both teams, records the game and
//! for every competition it counts toward updates both scores and appends
//! the two history rows. Nothing is visible until the transaction commits.

use crate::config::{EligibilityPolicy, EngineSettings};
use crate::directory::PlayerDirectory;
use crate::error::{error_kind, ledger_error, LedgerError, Result, Side};
use crate::ledger::history::HistoryLedger;
use crate::ledger::resolver::{normalize_players, TeamResolver};
use crate::ledger::scores::ScoreBook;
use crate::metrics::MetricsCollector;
use crate::rating::RatingKernel;
use crate::store::{NewGame, Store, Transaction};
use crate::types::{CompetitionId, Game, PlayerId, Score, Team, TeamSignature};
use crate::utils::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A game and the teams the announce had to create
struct Recorded {
    game: Game,
    teams_created: u64,
}

/// Records announced games and updates ratings
#[derive(Clone)]
pub struct GameIntake {
    store: Arc<dyn Store>,
    directory: Arc<dyn PlayerDirectory>,
    kernel: Arc<dyn RatingKernel>,
    clock: Arc<dyn Clock>,
    metrics: Arc<MetricsCollector>,
    settings: EngineSettings,
    resolver: TeamResolver,
    scores: ScoreBook,
    history: HistoryLedger,
}

impl GameIntake {
    pub fn new(
        store: Arc<dyn Store>,
        directory: Arc<dyn PlayerDirectory>,
        kernel: Arc<dyn RatingKernel>,
        clock: Arc<dyn Clock>,
        metrics: Arc<MetricsCollector>,
        settings: EngineSettings,
    ) -> Self {
        let resolver = TeamResolver::new(settings.max_resolve_attempts);
        let scores = ScoreBook::new(kernel.initial_rating());
        let history = HistoryLedger::new(store.clone());

        Self {
            store,
            directory,
            kernel,
            clock,
            metrics,
            settings,
            resolver,
            scores,
            history,
        }
    }

    /// Record that `winners` beat `losers` in a single competition
    pub async fn announce<W, L, P, Q>(
        &self,
        winners: W,
        losers: L,
        competition_id: CompetitionId,
    ) -> Result<Game>
    where
        W: IntoIterator<Item = P>,
        P: Into<PlayerId>,
        L: IntoIterator<Item = Q>,
        Q: Into<PlayerId>,
    {
        self.announce_in(winners, losers, &[competition_id]).await
    }

    /// Record that `winners` beat `losers` in every listed competition
    ///
    /// Duplicate competitions are counted once. On error no game, team,
    /// score or history row is written.
    pub async fn announce_in<W, L, P, Q>(
        &self,
        winners: W,
        losers: L,
        competitions: &[CompetitionId],
    ) -> Result<Game>
    where
        W: IntoIterator<Item = P>,
        P: Into<PlayerId>,
        L: IntoIterator<Item = Q>,
        Q: Into<PlayerId>,
    {
        let timer = self.metrics.start_timer();
        let winners = normalize_players(winners, Side::Winner);
        let losers = normalize_players(losers, Side::Loser);

        let result = match (winners, losers) {
            (Ok(winners), Ok(losers)) => self.try_announce(&winners, &losers, competitions).await,
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        match &result {
            Ok(game) => {
                self.metrics.record_game_announced(timer.stop());
                info!(
                    "Game {} recorded: [{}] beat [{}] in {} competition(s)",
                    game.id,
                    game.winner.signature(),
                    game.loser.signature(),
                    game.competitions.len()
                );
            }
            Err(e) => {
                let kind = error_kind(e);
                self.metrics.record_announce_failure(kind, timer.stop());
                warn!("Announce rejected ({}): {}", kind, e);
            }
        }

        result
    }

    /// Find or create the team for a player set outside of any announce
    pub async fn resolve_team<I, P>(&self, players: I) -> Result<(Team, bool)>
    where
        I: IntoIterator<Item = P>,
        P: Into<PlayerId>,
    {
        let players = normalize_players(players, Side::Winner)?;
        let (team, created) = self
            .resolver
            .resolve_committed(self.store.as_ref(), &players, Side::Winner)
            .await?;
        if created {
            self.metrics.record_teams_created(1);
        }
        Ok((team, created))
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    async fn try_announce(
        &self,
        winners: &BTreeSet<PlayerId>,
        losers: &BTreeSet<PlayerId>,
        competitions: &[CompetitionId],
    ) -> Result<Game> {
        if winners == losers {
            return Err(LedgerError::SameTeams {
                team: TeamSignature::from_players(winners).to_string(),
            }
            .into());
        }

        if let Some(player_id) = winners.intersection(losers).next() {
            return Err(LedgerError::OverlappingTeams {
                player_id: player_id.clone(),
            }
            .into());
        }

        for player_id in winners.iter().chain(losers.iter()) {
            if self.directory.player(player_id).await?.is_none() {
                return Err(LedgerError::UnknownPlayer {
                    player_id: player_id.clone(),
                }
                .into());
            }
        }

        let mut unique = Vec::with_capacity(competitions.len());
        for competition_id in competitions {
            if !unique.contains(competition_id) {
                unique.push(*competition_id);
            }
        }
        if unique.is_empty() {
            return Err(LedgerError::NoCompetition.into());
        }

        let mut attempt = 1;
        loop {
            match self.record(winners, losers, &unique).await {
                Ok(recorded) => {
                    if recorded.teams_created > 0 {
                        self.metrics.record_teams_created(recorded.teams_created);
                    }
                    return Ok(recorded.game);
                }
                Err(e) => {
                    let retryable = ledger_error(&e).map_or(false, LedgerError::is_retryable);
                    if !retryable || attempt >= self.resolver.max_attempts() {
                        return Err(e);
                    }
                    self.metrics.record_team_conflict_retry();
                    warn!(
                        "Announce attempt {}/{} hit a team conflict, retrying: {}",
                        attempt,
                        self.resolver.max_attempts(),
                        e
                    );
                    attempt += 1;
                }
            }
        }
    }

    /// One attempt at the announce transaction
    async fn record(
        &self,
        winners: &BTreeSet<PlayerId>,
        losers: &BTreeSet<PlayerId>,
        competitions: &[CompetitionId],
    ) -> Result<Recorded> {
        let mut tx = self.store.begin().await?;

        match self.record_in(tx.as_mut(), winners, losers, competitions).await {
            Ok(recorded) => {
                tx.commit().await?;
                Ok(recorded)
            }
            Err(e) => {
                if let Err(rollback_error) = tx.rollback().await {
                    error!("Failed to roll back announce transaction: {}", rollback_error);
                }
                Err(e)
            }
        }
    }

    async fn record_in(
        &self,
        tx: &mut dyn Transaction,
        winners: &BTreeSet<PlayerId>,
        losers: &BTreeSet<PlayerId>,
        competitions: &[CompetitionId],
    ) -> Result<Recorded> {
        for &competition_id in competitions {
            let competition = tx
                .competition(competition_id)
                .await?
                .ok_or(LedgerError::UnknownCompetition { competition_id })?;

            if self.settings.eligibility == EligibilityPolicy::Enforce {
                if let Some(player_id) = winners
                    .iter()
                    .chain(losers.iter())
                    .find(|player_id| !competition.is_eligible(player_id))
                {
                    return Err(LedgerError::IneligiblePlayer {
                        player_id: player_id.clone(),
                        competition_id,
                    }
                    .into());
                }
            }
        }

        let (winner, winner_created) = self.resolver.resolve(tx, winners, Side::Winner).await?;
        let (loser, loser_created) = self.resolver.resolve(tx, losers, Side::Loser).await?;
        if winner.id == loser.id {
            return Err(LedgerError::SameTeams {
                team: winner.signature().to_string(),
            }
            .into());
        }

        let game = tx
            .insert_game(NewGame {
                winner,
                loser,
                date: self.clock.now(),
                competitions: competitions.to_vec(),
            })
            .await?;

        for &competition_id in competitions {
            self.rate(tx, &game, competition_id).await?;
        }

        Ok(Recorded {
            game,
            teams_created: u64::from(winner_created) + u64::from(loser_created),
        })
    }

    /// Update both scores of one competition and append the two history rows
    async fn rate(
        &self,
        tx: &mut dyn Transaction,
        game: &Game,
        competition_id: CompetitionId,
    ) -> Result<()> {
        let winner_score = self
            .scores
            .get_or_init(tx, competition_id, game.winner.id)
            .await?;
        let loser_score = self
            .scores
            .get_or_init(tx, competition_id, game.loser.id)
            .await?;

        let timer = self.metrics.start_timer();
        let (winner_post, loser_post) = self
            .kernel
            .update(winner_score.rating(), loser_score.rating())?;
        self.metrics.record_rating_update(timer.stop());

        debug!(
            "Game {} in {}: team {} {:.2} -> {:.2}, team {} {:.2} -> {:.2}",
            game.id,
            competition_id,
            game.winner.id,
            winner_score.mu,
            winner_post.mu,
            game.loser.id,
            loser_score.mu,
            loser_post.mu
        );

        self.scores
            .commit(
                tx,
                Score {
                    mu: winner_post.mu,
                    sigma: winner_post.sigma,
                    wins: winner_score.wins + 1,
                    ..winner_score
                },
            )
            .await?;
        self.scores
            .commit(
                tx,
                Score {
                    mu: loser_post.mu,
                    sigma: loser_post.sigma,
                    defeats: loser_score.defeats + 1,
                    ..loser_score
                },
            )
            .await?;

        self.history
            .append(tx, game.id, competition_id, game.winner.id, winner_post.mu)
            .await?;
        self.history
            .append(tx, game.id, competition_id, game.loser.id, loser_post.mu)
            .await?;

        Ok(())
    }
}
