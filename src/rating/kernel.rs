//! Rating kernel trait
//!
//! The kernel is the pure part of the engine: given two priors and an outcome
//! it produces two posteriors. Implementations must be deterministic and
//! free of side effects so that replaying the same games yields the same
//! ratings.

use crate::config::RatingConfig;
use crate::types::Rating;

/// Pure 1-vs-1 rating update
pub trait RatingKernel: Send + Sync {
    /// Posterior ratings after `winner` beat `loser`
    ///
    /// # Returns
    /// `(winner_post, loser_post)`; an error if the update is not finite
    fn update(&self, winner: Rating, loser: Rating) -> crate::error::Result<(Rating, Rating)>;

    /// Probability that a game between `a` and `b` would be drawn, in [0, 1]
    fn quality(&self, a: Rating, b: Rating) -> f64;

    /// Prior for a team's first game in a competition
    fn initial_rating(&self) -> Rating;

    /// Parameters the kernel was built with
    fn config(&self) -> RatingConfig;
}
