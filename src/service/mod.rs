//! Service layer for the rating ledger
//!
//! This module assembles the engine components into a `LedgerService` and
//! provides the season replay used by the command line binary.

pub mod app;
pub mod replay;

pub use app::{LedgerService, PlayerReport, ServiceError};
pub use replay::{ReplaySummary, SeasonCompetition, SeasonFile, SeasonGame, SeasonReplay};
