//! # modelaudit-metrics
//!
//! The built-in quality heuristics: documentation ramp-up, bus factor, code
//! quality, device fit, licensing, performance claims, dataset and code
//! documentation, dataset quality, and review coverage.
//!
//! [`default_registry`] wires them up in reporting order.

pub mod metrics;
pub mod rater;
pub mod readme;

pub use metrics::{
    BusFactor, CodeQuality, DatasetAndCode, DatasetQuality, HubReviewSource, License, Linter,
    PerformanceClaims, RampUpTime, ReviewSource, Reviewedness, SizeScore,
};
pub use rater::{GenAiRater, Rater, Rating, parse_rating};

use modelaudit_core::{MetricRegistry, RegistryError};
use std::sync::Arc;

/// Names of the built-in metrics, in registration order.
pub const BUILTIN_METRICS: [&str; 9] = [
    RampUpTime::NAME,
    BusFactor::NAME,
    CodeQuality::NAME,
    SizeScore::NAME,
    License::NAME,
    PerformanceClaims::NAME,
    DatasetAndCode::NAME,
    DatasetQuality::NAME,
    Reviewedness::NAME,
];

/// A registry holding every built-in metric.
pub fn default_registry(
    rater: Arc<dyn Rater>,
    reviews: Arc<dyn ReviewSource>,
) -> Result<MetricRegistry, RegistryError> {
    MetricRegistry::new()
        .with(Arc::new(RampUpTime))?
        .with(Arc::new(BusFactor))?
        .with(Arc::new(CodeQuality::default()))?
        .with(Arc::new(SizeScore))?
        .with(Arc::new(License::new(rater.clone())))?
        .with(Arc::new(PerformanceClaims::new(rater.clone())))?
        .with(Arc::new(DatasetAndCode::new(rater)))?
        .with(Arc::new(DatasetQuality))?
        .with(Arc::new(Reviewedness::new(reviews)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use modelaudit_core::adapters::github::{PullRequest, Review};
    use modelaudit_core::{FetchError, Metric, MetricError, RepoView};

    struct NoRater;

    #[async_trait]
    impl Rater for NoRater {
        async fn rate(&self, _prompt: &str) -> Result<Rating, MetricError> {
            Err(MetricError::rater("offline"))
        }
    }

    struct NoReviews;

    #[async_trait]
    impl ReviewSource for NoReviews {
        async fn open_repository(&self, url: &str) -> Result<RepoView, FetchError> {
            Err(FetchError::NotFound { url: url.into() })
        }
        async fn pull_requests(&self, _: &str, _: &str) -> Result<Vec<PullRequest>, FetchError> {
            Ok(Vec::new())
        }
        async fn pull_request(&self, _: &str, _: &str, n: u64) -> Result<PullRequest, FetchError> {
            Err(FetchError::NotFound { url: format!("pr {n}") })
        }
        async fn reviews(&self, _: &str, _: &str, _: u64) -> Result<Vec<Review>, FetchError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_default_registry_order() {
        let registry = default_registry(Arc::new(NoRater), Arc::new(NoReviews)).unwrap();
        assert_eq!(registry.names(), BUILTIN_METRICS.to_vec());
        let size = registry.get("size_score").unwrap();
        assert_eq!(size.failure_value(), modelaudit_core::MetricValue::zero_devices());
    }
}
