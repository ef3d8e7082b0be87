//! Configuration management for the rating ledger
//!
//! This module handles configuration loading from TOML files and environment
//! variables, validation, and default values for the engine.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, EligibilityPolicy, EngineSettings, ServiceSettings};
pub use rating::RatingConfig;
