//! The write side of the engine and its history
//!
//! This module provides team resolution, current scores, the append-only
//! history of post-game scores and the game intake that ties them together
//! in one transaction.

pub mod history;
pub mod intake;
pub mod resolver;
pub mod scores;

pub use history::{HistoryEntry, HistoryLedger};
pub use intake::GameIntake;
pub use resolver::{normalize_players, TeamResolver};
pub use scores::ScoreBook;
