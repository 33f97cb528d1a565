//! Numerics for the checkstats posterior estimator.
//!
//! Day-level "check present" outcomes are modeled as Bernoulli trials with a
//! conjugate Beta prior, so every posterior here is analytic (no sampling).
//! The crate provides:
//! - numerically stable `log_gamma`/`log_beta` primitives
//! - Beta distribution mean/variance/CDF/quantile
//! - the `PosteriorEstimator` with exact and normal-approximation credible
//!   interval strategies

pub mod beta;
pub mod posterior;
pub mod stable;

pub use beta::{beta_cdf, beta_inv_cdf, beta_mean, beta_var};
pub use posterior::{BetaPrior, IntervalMethod, PosteriorEstimator, PosteriorSummary};
pub use stable::{log_beta, log_gamma};
