//! TrueSkill rating kernel
//!
//! This module provides the concrete rating kernel using the TrueSkill
//! implementation from the skillratings crate.

use crate::config::RatingConfig;
use crate::error::LedgerError;
use crate::rating::kernel::RatingKernel;
use crate::types::Rating;
use skillratings::trueskill::{match_quality, trueskill, TrueSkillConfig, TrueSkillRating};
use skillratings::Outcomes;

/// TrueSkill 1-vs-1 kernel
#[derive(Debug, Clone)]
pub struct TrueSkillKernel {
    config: RatingConfig,
    trueskill_config: TrueSkillConfig,
}

impl TrueSkillKernel {
    /// Create a new TrueSkill kernel
    pub fn new(config: RatingConfig) -> crate::error::Result<Self> {
        config.validate()?;

        let trueskill_config = TrueSkillConfig {
            draw_probability: config.draw_probability,
            beta: config.beta,
            default_dynamics: config.tau,
        };

        Ok(Self {
            config,
            trueskill_config,
        })
    }
}

impl RatingKernel for TrueSkillKernel {
    fn update(&self, winner: Rating, loser: Rating) -> crate::error::Result<(Rating, Rating)> {
        if !winner.is_finite() || !loser.is_finite() {
            return Err(LedgerError::RatingCalculationFailed {
                reason: format!("non-finite prior {:?} / {:?}", winner, loser),
            }
            .into());
        }

        let winner_prior: TrueSkillRating = winner.into();
        let loser_prior: TrueSkillRating = loser.into();

        let (winner_post, loser_post) = trueskill(
            &winner_prior,
            &loser_prior,
            &Outcomes::WIN,
            &self.trueskill_config,
        );
        let (winner_post, loser_post): (Rating, Rating) = (winner_post.into(), loser_post.into());

        if !winner_post.is_finite() || !loser_post.is_finite() {
            return Err(LedgerError::RatingCalculationFailed {
                reason: format!(
                    "non-finite posterior for priors {:?} / {:?}",
                    winner, loser
                ),
            }
            .into());
        }

        Ok((winner_post, loser_post))
    }

    fn quality(&self, a: Rating, b: Rating) -> f64 {
        let quality = match_quality(&a.into(), &b.into(), &self.trueskill_config);
        if quality.is_finite() {
            quality.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn initial_rating(&self) -> Rating {
        self.config.initial_rating()
    }

    fn config(&self) -> RatingConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel() -> TrueSkillKernel {
        TrueSkillKernel::new(RatingConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = RatingConfig::default();
        config.beta = 0.0;
        assert!(TrueSkillKernel::new(config).is_err());
    }

    #[test]
    fn test_winner_gains_loser_drops() {
        let kernel = kernel();
        let prior = kernel.initial_rating();

        let (winner, loser) = kernel.update(prior, prior).unwrap();

        assert!(winner.mu > prior.mu);
        assert!(loser.mu < prior.mu);
        assert!(winner.sigma < prior.sigma);
        assert!(loser.sigma < prior.sigma);
        // Symmetric priors move symmetrically
        assert!(((winner.mu - prior.mu) - (prior.mu - loser.mu)).abs() < 1e-9);
    }

    #[test]
    fn test_textbook_values() {
        // Reference numbers for mu=25, sigma=25/3, beta=25/6, tau=25/300, draw=0.1
        let kernel = TrueSkillKernel::new(RatingConfig::unscaled()).unwrap();
        let prior = kernel.initial_rating();

        let (winner, loser) = kernel.update(prior, prior).unwrap();

        assert!((winner.mu - 29.396).abs() < 0.05);
        assert!((winner.sigma - 7.171).abs() < 0.05);
        assert!((loser.mu - 20.604).abs() < 0.05);
        assert!((loser.sigma - 7.171).abs() < 0.05);
    }

    #[test]
    fn test_upset_moves_more_than_expected_win() {
        let kernel = kernel();
        let strong = Rating::new(1200.0, 150.0);
        let weak = Rating::new(800.0, 150.0);

        let (strong_after, _) = kernel.update(strong, weak).unwrap();
        let (weak_after, _) = kernel.update(weak, strong).unwrap();

        assert!(weak_after.mu - weak.mu > strong_after.mu - strong.mu);
    }

    #[test]
    fn test_update_is_deterministic() {
        let kernel = kernel();
        let a = Rating::new(1040.5, 290.1);
        let b = Rating::new(980.25, 301.7);

        let first = kernel.update(a, b).unwrap();
        let second = kernel.update(a, b).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_quality() {
        let kernel = kernel();
        let even = kernel.quality(Rating::new(1000.0, 100.0), Rating::new(1000.0, 100.0));
        let uneven = kernel.quality(Rating::new(1400.0, 100.0), Rating::new(700.0, 100.0));

        assert!(even > uneven);
        assert!((0.0..=1.0).contains(&even));
        assert!((0.0..=1.0).contains(&uneven));
        // Quality is symmetric
        let reversed = kernel.quality(Rating::new(700.0, 100.0), Rating::new(1400.0, 100.0));
        assert!((uneven - reversed).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_prior_is_an_error() {
        let kernel = kernel();
        let result = kernel.update(Rating::new(f64::NAN, 100.0), kernel.initial_rating());
        assert!(result.is_err());
    }
}
