//! Rating system configuration

use crate::error::{LedgerError, Result};
use crate::types::Rating;
use serde::{Deserialize, Serialize};

/// Scale applied to the textbook TrueSkill constants
pub const DEFAULT_SCALE: f64 = 40.0;

/// TrueSkill priors and constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Mean skill of a team's first game (MU0)
    pub initial_mu: f64,
    /// Standard deviation of a team's first game (SIGMA0)
    pub initial_sigma: f64,
    /// Performance variance around skill
    pub beta: f64,
    /// Dynamics factor added to sigma before each update
    pub tau: f64,
    /// Draw probability used by the factor graph
    pub draw_probability: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self::scaled(DEFAULT_SCALE)
    }
}

impl RatingConfig {
    /// Textbook TrueSkill: mu 25, sigma 25/3
    pub fn unscaled() -> Self {
        Self::scaled(1.0)
    }

    /// TrueSkill constants multiplied by `scale`
    pub fn scaled(scale: f64) -> Self {
        let initial_mu = 25.0 * scale;
        let initial_sigma = initial_mu / 3.0;
        Self {
            initial_mu,
            initial_sigma,
            beta: initial_sigma / 2.0,
            tau: initial_sigma / 100.0,
            draw_probability: 0.1,
        }
    }

    pub fn initial_rating(&self) -> Rating {
        Rating::new(self.initial_mu, self.initial_sigma)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("initial_mu", self.initial_mu),
            ("initial_sigma", self.initial_sigma),
            ("beta", self.beta),
            ("tau", self.tau),
            ("draw_probability", self.draw_probability),
        ];
        for (name, value) in values {
            if !value.is_finite() {
                return Err(config_error(format!("{} must be finite", name)));
            }
        }

        if self.initial_sigma <= 0.0 {
            return Err(config_error("Initial sigma must be positive"));
        }
        if self.beta <= 0.0 {
            return Err(config_error("Beta must be positive"));
        }
        if self.tau < 0.0 {
            return Err(config_error("Tau must be non-negative"));
        }
        if !(0.0..1.0).contains(&self.draw_probability) {
            return Err(config_error("Draw probability must be in [0, 1)"));
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> anyhow::Error {
    LedgerError::ConfigurationError {
        message: message.into(),
    }
    .into()
}
