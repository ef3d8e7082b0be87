//! Season replay
//!
//! Loads a season file (players, competitions and an ordered list of games)
//! into an in-memory ledger and announces every game in order. The clock is
//! set to each game's date before it is announced, so replaying the same
//! file always produces the same ledger.

use crate::config::AppConfig;
use crate::directory::StaticPlayerDirectory;
use crate::error::{error_kind, Result as LedgerResult};
use crate::service::app::{LedgerService, ServiceError};
use crate::store::InMemoryStore;
use crate::types::{Competition, CompetitionId, Player, PlayerId};
use crate::utils::{Clock, ManualClock};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A competition as written in a season file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonCompetition {
    pub name: String,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    /// Eligible players; empty means every player of the season
    #[serde(default)]
    pub players: Vec<PlayerId>,
}

/// A game as written in a season file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonGame {
    pub winners: Vec<PlayerId>,
    pub losers: Vec<PlayerId>,
    /// Competition names; empty means every competition of the season
    #[serde(default)]
    pub competitions: Vec<String>,
    /// Defaults to one minute after the previous game
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Contents of a season file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonFile {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub competitions: Vec<SeasonCompetition>,
    #[serde(default)]
    pub games: Vec<SeasonGame>,
}

impl SeasonFile {
    /// Read a season from disk; `.json` files are JSON, anything else TOML
    pub fn from_path(path: &Path) -> Result<Self, ServiceError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ServiceError::Replay {
            message: format!("Failed to read season file {}: {}", path.display(), e),
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        let season = if is_json {
            Self::from_json_str(&raw)?
        } else {
            Self::from_toml_str(&raw)?
        };
        season.validate()?;
        Ok(season)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ServiceError> {
        serde_json::from_str(raw).map_err(|e| ServiceError::Replay {
            message: format!("Invalid JSON season: {}", e),
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ServiceError> {
        toml::from_str(raw).map_err(|e| ServiceError::Replay {
            message: format!("Invalid TOML season: {}", e),
        })
    }

    /// Structural checks; rating rules are left to game intake
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.competitions.is_empty() {
            return Err(replay_error("season declares no competitions"));
        }

        let mut names = BTreeSet::new();
        for competition in &self.competitions {
            if !names.insert(competition.name.as_str()) {
                return Err(replay_error(format!(
                    "competition '{}' is declared twice",
                    competition.name
                )));
            }
        }

        for (index, game) in self.games.iter().enumerate() {
            if let Some(name) = game
                .competitions
                .iter()
                .find(|name| !names.contains(name.as_str()))
            {
                return Err(replay_error(format!(
                    "game #{} references unknown competition '{}'",
                    index + 1,
                    name
                )));
            }
        }

        Ok(())
    }
}

fn replay_error(message: impl Into<String>) -> ServiceError {
    ServiceError::Replay {
        message: message.into(),
    }
}

/// Outcome of a replay
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub recorded: usize,
    /// Rejected games by error kind
    pub rejected: BTreeMap<String, usize>,
}

impl ReplaySummary {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// An in-memory ledger seeded from a season file
pub struct SeasonReplay {
    service: LedgerService,
    clock: Arc<ManualClock>,
    competitions: BTreeMap<String, CompetitionId>,
}

impl SeasonReplay {
    /// Build the ledger and register the season's players and competitions
    pub async fn load(config: AppConfig, season: &SeasonFile) -> Result<Self, ServiceError> {
        season.validate()?;

        let store = InMemoryStore::new();
        let all_players: Vec<PlayerId> = season.players.iter().map(|p| p.id.clone()).collect();

        let mut competitions = BTreeMap::new();
        for declared in &season.competitions {
            let eligible = if declared.players.is_empty() {
                all_players.clone()
            } else {
                declared.players.clone()
            };
            let mut competition =
                Competition::new(declared.name.clone(), declared.start).with_players(eligible);
            competition.end = declared.end;

            competitions.insert(declared.name.clone(), competition.id);
            store.insert_competition(competition).await;
        }

        let start = season
            .competitions
            .iter()
            .map(|competition| competition.start)
            .min()
            .unwrap_or_else(Utc::now);
        let clock = Arc::new(ManualClock::new(start));
        let directory = StaticPlayerDirectory::with_players(season.players.iter().cloned());

        let service = LedgerService::new(
            config,
            Arc::new(store),
            Arc::new(directory),
            clock.clone(),
        )?;

        info!(
            "Season loaded - {} players, {} competitions, {} games",
            season.players.len(),
            season.competitions.len(),
            season.games.len()
        );

        Ok(Self {
            service,
            clock,
            competitions,
        })
    }

    /// Announce every game of the season in file order
    ///
    /// Rejected games are logged and counted; store failures stop the replay.
    pub async fn run(&self, season: &SeasonFile) -> LedgerResult<ReplaySummary> {
        let mut summary = ReplaySummary::default();

        for (index, game) in season.games.iter().enumerate() {
            let date = game
                .date
                .unwrap_or_else(|| self.clock.now() + Duration::minutes(1));
            self.clock.set(date);

            let competitions = self.competitions_of(game);
            match self
                .service
                .intake()
                .announce_in(
                    game.winners.iter().cloned(),
                    game.losers.iter().cloned(),
                    &competitions,
                )
                .await
            {
                Ok(recorded) => {
                    debug!("Replayed game #{} as game {}", index + 1, recorded.id);
                    summary.recorded += 1;
                }
                Err(e) => {
                    let kind = error_kind(&e);
                    if kind == "STORE_FAILURE" {
                        return Err(e);
                    }
                    warn!("Skipping game #{}: {}", index + 1, e);
                    *summary.rejected.entry(kind.to_string()).or_default() += 1;
                }
            }
        }

        info!(
            "Season replayed - {} games recorded, {} rejected",
            summary.recorded,
            summary.rejected_total()
        );
        Ok(summary)
    }

    pub fn service(&self) -> &LedgerService {
        &self.service
    }

    pub fn competition_id(&self, name: &str) -> Option<CompetitionId> {
        self.competitions.get(name).copied()
    }

    /// Declared competition names with their identifiers
    pub fn competitions(&self) -> &BTreeMap<String, CompetitionId> {
        &self.competitions
    }

    fn competitions_of(&self, game: &SeasonGame) -> Vec<CompetitionId> {
        if game.competitions.is_empty() {
            return self.competitions.values().copied().collect();
        }
        game.competitions
            .iter()
            .filter_map(|name| self.competitions.get(name).copied())
            .collect()
    }
}
