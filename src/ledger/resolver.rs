//! Team resolution
//!
//! Maps an unordered player set to its unique team, creating the team on
//! first use. Two announces that name the same players in a different order
//! always land on the same team.

use crate::error::{ledger_error, LedgerError, Result, Side};
use crate::store::{Store, Transaction};
use crate::types::{PlayerId, Team, TeamSignature};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Normalize raw player ids into the canonical set for one side of a game
pub fn normalize_players<I, P>(players: I, side: Side) -> Result<BTreeSet<PlayerId>>
where
    I: IntoIterator<Item = P>,
    P: Into<PlayerId>,
{
    let players: BTreeSet<PlayerId> = players.into_iter().map(Into::into).collect();
    if players.is_empty() {
        return Err(LedgerError::EmptyTeam { side }.into());
    }
    Ok(players)
}

/// Resolves player sets to teams
#[derive(Debug, Clone)]
pub struct TeamResolver {
    max_attempts: u32,
}

impl TeamResolver {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Find or create the team for `players` inside an open transaction
    ///
    /// `side` only labels the error for an empty set.
    ///
    /// # Returns
    /// The team and whether it was created by this call
    pub async fn resolve(
        &self,
        tx: &mut dyn Transaction,
        players: &BTreeSet<PlayerId>,
        side: Side,
    ) -> Result<(Team, bool)> {
        if players.is_empty() {
            return Err(LedgerError::EmptyTeam { side }.into());
        }

        let signature = TeamSignature::from_players(players);
        if let Some(team) = tx.find_team(&signature).await? {
            return Ok((team, false));
        }

        let team = tx.insert_team(players).await?;
        debug!("Created team {} for players [{}]", team.id, signature);
        Ok((team, true))
    }

    /// Find or create a team in its own transaction
    ///
    /// A concurrent creation of the same player set is retried and then
    /// resolves to the team the other writer created.
    pub async fn resolve_committed(
        &self,
        store: &dyn Store,
        players: &BTreeSet<PlayerId>,
        side: Side,
    ) -> Result<(Team, bool)> {
        let mut attempt = 1;
        loop {
            let mut tx = store.begin().await?;
            match self.resolve(tx.as_mut(), players, side).await {
                Ok(resolved) => {
                    tx.commit().await?;
                    return Ok(resolved);
                }
                Err(e) => {
                    tx.rollback().await?;
                    let retryable = ledger_error(&e).map_or(false, LedgerError::is_retryable);
                    if !retryable || attempt >= self.max_attempts {
                        return Err(e);
                    }
                    warn!(
                        "Team creation conflict on attempt {}/{}: {}",
                        attempt, self.max_attempts, e
                    );
                    attempt += 1;
                }
            }
        }
    }

    /// Read-only lookup of the team with exactly these players
    pub async fn find(
        &self,
        store: &dyn Store,
        players: &BTreeSet<PlayerId>,
    ) -> Result<Option<Team>> {
        store
            .team_by_signature(&TeamSignature::from_players(players))
            .await
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for TeamResolver {
    fn default() -> Self {
        Self::new(3)
    }
}
