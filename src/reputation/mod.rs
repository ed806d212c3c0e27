//! Reputation
//!
//! The seven-metric composite trust score. Computation is read-only;
//! persisting the cached score on the user document is a separate step.

pub mod trust;

pub use trust::{TrustScoreBreakdown, TrustScoreEngine};
