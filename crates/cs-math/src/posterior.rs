//! Beta-Binomial posterior summaries for day-level Bernoulli series.
//!
//! The estimator is configured once at startup with a prior and an interval
//! strategy, then applied statelessly per scope. Both strategies share the
//! same posterior mean; they differ only in how the 95% central credible
//! interval is computed.

use std::fmt;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::beta::{beta_inv_cdf, beta_mean, beta_var};

/// Z-score for the 95% normal-approximation interval.
const Z_95: f64 = 1.96;

static APPROX_WARNING: Once = Once::new();

/// Errors from posterior computation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PosteriorError {
    /// Prior parameters must both be strictly positive.
    #[error("prior alpha/beta must be > 0, got alpha={alpha} beta={beta}")]
    InvalidPrior { alpha: f64, beta: f64 },

    /// The success count exceeded the trial count.
    #[error("successes ({successes}) must not exceed trials ({trials})")]
    SuccessesExceedTrials { trials: u32, successes: u32 },
}

/// A Beta prior over a Bernoulli probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaPrior {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaPrior {
    /// The Jeffreys prior Beta(0.5, 0.5): symmetric and uninformative.
    pub const JEFFREYS: Self = Self {
        alpha: 0.5,
        beta: 0.5,
    };
}

impl Default for BetaPrior {
    fn default() -> Self {
        Self::JEFFREYS
    }
}

/// How the 95% credible interval is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalMethod {
    /// Exact Beta quantiles at 2.5% / 97.5%.
    Exact,
    /// Normal approximation (mean ± 1.96·σ), clamped to [0, 1].
    NormalApprox,
}

impl IntervalMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::NormalApprox => "normal_approx",
        }
    }
}

impl fmt::Display for IntervalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IntervalMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "normal_approx" | "normal-approx" => Ok(Self::NormalApprox),
            other => Err(format!("invalid interval method: {other}")),
        }
    }
}

/// Summary of a Beta posterior over a Bernoulli probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    pub trials: u32,
    pub successes: u32,
    pub alpha: f64,
    pub beta: f64,
    pub mean: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

/// Stateless posterior estimator: prior + interval strategy, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct PosteriorEstimator {
    prior: BetaPrior,
    method: IntervalMethod,
}

impl PosteriorEstimator {
    /// Creates an estimator after validating the prior.
    pub fn new(prior: BetaPrior, method: IntervalMethod) -> Result<Self, PosteriorError> {
        if prior.alpha.is_nan() || prior.beta.is_nan() || prior.alpha <= 0.0 || prior.beta <= 0.0 {
            return Err(PosteriorError::InvalidPrior {
                alpha: prior.alpha,
                beta: prior.beta,
            });
        }
        Ok(Self { prior, method })
    }

    pub const fn method(&self) -> IntervalMethod {
        self.method
    }

    pub const fn prior(&self) -> BetaPrior {
        self.prior
    }

    /// Computes the posterior summary for `successes` out of `trials` days.
    ///
    /// Returns `Ok(None)` when `trials == 0`: with no observed days the
    /// probability is undefined ("insufficient data"), not zero.
    pub fn summarize(
        &self,
        trials: u32,
        successes: u32,
    ) -> Result<Option<PosteriorSummary>, PosteriorError> {
        if successes > trials {
            return Err(PosteriorError::SuccessesExceedTrials { trials, successes });
        }
        if trials == 0 {
            return Ok(None);
        }

        let alpha = self.prior.alpha + f64::from(successes);
        let beta = self.prior.beta + f64::from(trials - successes);
        let mean = beta_mean(alpha, beta);

        let (low, high) = match self.method {
            IntervalMethod::Exact => {
                let low = beta_inv_cdf(0.025, alpha, beta);
                let high = beta_inv_cdf(0.975, alpha, beta);
                if low.is_nan() || high.is_nan() {
                    normal_approx_interval(alpha, beta)
                } else {
                    (low, high)
                }
            }
            IntervalMethod::NormalApprox => {
                APPROX_WARNING.call_once(|| {
                    tracing::warn!(
                        "using normal approximation for Beta credible intervals; \
                         bounds may differ from exact quantiles for small samples"
                    );
                });
                normal_approx_interval(alpha, beta)
            }
        };

        Ok(Some(PosteriorSummary {
            trials,
            successes,
            alpha,
            beta,
            mean,
            ci_low: low.clamp(0.0, 1.0),
            ci_high: high.clamp(0.0, 1.0),
        }))
    }
}

/// Clamped normal-approximation interval for Beta(alpha, beta).
fn normal_approx_interval(alpha: f64, beta: f64) -> (f64, f64) {
    let mean = beta_mean(alpha, beta);
    let sd = beta_var(alpha, beta).sqrt();
    ((mean - Z_95 * sd).max(0.0), (mean + Z_95 * sd).min(1.0))
}
