//! Rating kernel built on the TrueSkill algorithm
//!
//! This module provides the pure rating update and draw-quality functions
//! consumed by game intake and statistics.

pub mod kernel;
pub mod trueskill;

// Re-export commonly used types
pub use kernel::RatingKernel;
pub use trueskill::TrueSkillKernel;
