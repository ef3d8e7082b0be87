//! Common types used throughout the rating ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillratings::trueskill::TrueSkillRating;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Opaque identifier owned by the identity system
pub type PlayerId = String;

/// Unique identifier for teams
pub type TeamId = u64;

/// Unique identifier for games
pub type GameId = u64;

/// Monotonic identifier of a historical score row
pub type HistoricalScoreId = u64;

/// Unique identifier for competitions
pub type CompetitionId = Uuid;

/// Gaussian skill estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub mu: f64,
    pub sigma: f64,
}

impl Rating {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }

    pub fn is_finite(&self) -> bool {
        self.mu.is_finite() && self.sigma.is_finite()
    }
}

impl From<TrueSkillRating> for Rating {
    fn from(rating: TrueSkillRating) -> Self {
        Self {
            mu: rating.rating,
            sigma: rating.uncertainty,
        }
    }
}

impl From<Rating> for TrueSkillRating {
    fn from(rating: Rating) -> Self {
        Self {
            rating: rating.mu,
            uncertainty: rating.sigma,
        }
    }
}

/// A player as known by the player directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Canonical key of a player set: the sorted, deduplicated player ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamSignature(Vec<PlayerId>);

impl TeamSignature {
    pub fn from_players(players: &BTreeSet<PlayerId>) -> Self {
        Self(players.iter().cloned().collect())
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.0
    }
}

impl std::fmt::Display for TeamSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

/// An immutable, non-empty set of players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub players: BTreeSet<PlayerId>,
}

impl Team {
    pub fn signature(&self) -> TeamSignature {
        TeamSignature::from_players(&self.players)
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.players.contains(player_id)
    }

    pub fn is_solo(&self) -> bool {
        self.players.len() == 1
    }

    /// Member display names joined with " / ", falling back to the raw id
    pub fn label(&self, names: &BTreeMap<PlayerId, String>) -> String {
        self.players
            .iter()
            .map(|id| names.get(id).map(String::as_str).unwrap_or(id.as_str()))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// A competition; created externally, read by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    /// Players eligible to play in this competition
    pub players: BTreeSet<PlayerId>,
}

impl Competition {
    pub fn new(name: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start,
            end: None,
            players: BTreeSet::new(),
        }
    }

    pub fn with_players<I, P>(mut self, players: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PlayerId>,
    {
        self.players.extend(players.into_iter().map(Into::into));
        self
    }

    pub fn is_eligible(&self, player_id: &str) -> bool {
        self.players.contains(player_id)
    }

    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && self.end.map_or(true, |end| at < end)
    }
}

/// Current rating of a team within a competition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub competition_id: CompetitionId,
    pub team_id: TeamId,
    pub mu: f64,
    pub sigma: f64,
    pub wins: u32,
    pub defeats: u32,
}

impl Score {
    pub fn initial(competition_id: CompetitionId, team_id: TeamId, prior: Rating) -> Self {
        Self {
            competition_id,
            team_id,
            mu: prior.mu,
            sigma: prior.sigma,
            wins: 0,
            defeats: 0,
        }
    }

    pub fn rating(&self) -> Rating {
        Rating::new(self.mu, self.sigma)
    }

    pub fn games_played(&self) -> u32 {
        self.wins + self.defeats
    }
}

/// An announced game; immutable once recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub winner: Team,
    pub loser: Team,
    pub date: DateTime<Utc>,
    pub competitions: Vec<CompetitionId>,
}

impl Game {
    pub fn involves(&self, player_id: &str) -> bool {
        self.winner.contains(player_id) || self.loser.contains(player_id)
    }

    pub fn is_won_by(&self, player_id: &str) -> bool {
        self.winner.contains(player_id)
    }

    pub fn counts_toward(&self, competition_id: CompetitionId) -> bool {
        self.competitions.contains(&competition_id)
    }

    /// Team the player played on in this game
    pub fn team_of(&self, player_id: &str) -> Option<&Team> {
        if self.winner.contains(player_id) {
            Some(&self.winner)
        } else if self.loser.contains(player_id) {
            Some(&self.loser)
        } else {
            None
        }
    }

    /// The side the player was not on
    pub fn opponent_of(&self, player_id: &str) -> Option<&Team> {
        if self.winner.contains(player_id) {
            Some(&self.loser)
        } else if self.loser.contains(player_id) {
            Some(&self.winner)
        } else {
            None
        }
    }

    pub fn describe(&self, names: &BTreeMap<PlayerId, String>) -> String {
        format!("{} beats {}", self.winner.label(names), self.loser.label(names))
    }
}

/// Post-game rating snapshot of a team in a competition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalScore {
    pub id: HistoricalScoreId,
    pub game_id: GameId,
    pub competition_id: CompetitionId,
    pub team_id: TeamId,
    /// Post-game mu
    pub score: f64,
}
