//! Rating Ledger - TrueSkill rating and history engine
//!
//! This crate records decisive team-vs-team games, keeps a TrueSkill rating
//! per team and competition, stores an append-only history of post-game
//! scores and derives player statistics from it.

pub mod config;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod query;
pub mod rating;
pub mod service;
pub mod stats;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{LedgerError, Result};
pub use types::*;

// Re-export key components
pub use directory::{PlayerDirectory, StaticPlayerDirectory};
pub use ledger::GameIntake;
pub use query::{LeaderboardEntry, QueryFacade};
pub use service::LedgerService;
pub use stats::StatisticsEngine;
pub use store::{InMemoryStore, Store};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
