//! Error types for the rating ledger
//!
//! Fallible operations return the crate-wide anyhow `Result`; domain failures
//! are carried as [`LedgerError`] and can be recovered with `downcast_ref`.

use crate::types::{CompetitionId, PlayerId};

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Which side of a game a player set was announced for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Winner,
    Loser,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Winner => write!(f, "winner"),
            Side::Loser => write!(f, "loser"),
        }
    }
}

/// Custom error types for rating and history scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Winner and loser resolve to the same team: {team}")]
    SameTeams { team: String },

    #[error("The {side} player set is empty")]
    EmptyTeam { side: Side },

    #[error("Player {player_id} appears on both sides of the game")]
    OverlappingTeams { player_id: PlayerId },

    #[error("Unknown player: {player_id}")]
    UnknownPlayer { player_id: PlayerId },

    #[error("Player {player_id} is not eligible in competition {competition_id}")]
    IneligiblePlayer {
        player_id: PlayerId,
        competition_id: CompetitionId,
    },

    #[error("Unknown competition: {competition_id}")]
    UnknownCompetition { competition_id: CompetitionId },

    #[error("A game must count toward at least one competition")]
    NoCompetition,

    #[error("Concurrent creation of team [{signature}]")]
    ConcurrentTeamConflict { signature: String },

    #[error("Store failure: {message}")]
    StoreFailure { message: String },

    #[error("Rating calculation failed: {reason}")]
    RatingCalculationFailed { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl LedgerError {
    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::SameTeams { .. } => "SAME_TEAMS",
            LedgerError::EmptyTeam { .. } => "EMPTY_TEAM",
            LedgerError::OverlappingTeams { .. } => "OVERLAPPING_TEAMS",
            LedgerError::UnknownPlayer { .. } => "UNKNOWN_PLAYER",
            LedgerError::IneligiblePlayer { .. } => "INELIGIBLE_PLAYER",
            LedgerError::UnknownCompetition { .. } => "UNKNOWN_COMPETITION",
            LedgerError::NoCompetition => "NO_COMPETITION",
            LedgerError::ConcurrentTeamConflict { .. } => "CONCURRENT_TEAM_CONFLICT",
            LedgerError::StoreFailure { .. } => "STORE_FAILURE",
            LedgerError::RatingCalculationFailed { .. } => "RATING_CALCULATION_FAILED",
            LedgerError::ConfigurationError { .. } => "CONFIGURATION_ERROR",
        }
    }

    /// Only team conflicts are worth re-running the announce transaction for
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrentTeamConflict { .. })
    }

    pub fn store(message: impl Into<String>) -> Self {
        LedgerError::StoreFailure {
            message: message.into(),
        }
    }
}

/// Classify an anyhow error, if it carries a [`LedgerError`]
pub fn ledger_error(error: &anyhow::Error) -> Option<&LedgerError> {
    error.downcast_ref::<LedgerError>()
}

/// Label used for failure metrics; errors from outside the ledger count as store failures
pub fn error_kind(error: &anyhow::Error) -> &'static str {
    ledger_error(error)
        .map(LedgerError::kind)
        .unwrap_or("STORE_FAILURE")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        let err = LedgerError::SameTeams {
            team: "alice".to_string(),
        };
        assert_eq!(err.kind(), "SAME_TEAMS");
        assert!(!err.is_retryable());

        let conflict = LedgerError::ConcurrentTeamConflict {
            signature: "alice,bob".to_string(),
        };
        assert!(conflict.is_retryable());
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = LedgerError::EmptyTeam { side: Side::Loser }.into();
        assert_eq!(
            ledger_error(&err),
            Some(&LedgerError::EmptyTeam { side: Side::Loser })
        );
        assert_eq!(error_kind(&err), "EMPTY_TEAM");

        let foreign = anyhow::anyhow!("disk on fire");
        assert!(ledger_error(&foreign).is_none());
        assert_eq!(error_kind(&foreign), "STORE_FAILURE");
    }
}
