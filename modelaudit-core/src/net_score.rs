//! Net score: the weighted composite of a finished result set.

use crate::config::{WeightNormalization, reference_weights};
use crate::engine::panic_message;
use crate::error::AggregateError;
use crate::metric::{DEVICE_METRIC, MetricResult, MetricValue, NET_SCORE, ResultSet, Score};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;
use tracing::{debug, warn};

/// Metric name → non-negative weight. Missing metrics weigh 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable(BTreeMap<String, f64>);

impl WeightTable {
    pub fn new(weights: BTreeMap<String, f64>) -> Self {
        Self(weights)
    }

    /// The standard table (license 0.20, ramp-up and bus factor 0.15 each,
    /// everything else 0.10).
    pub fn reference() -> Self {
        Self(reference_weights())
    }

    pub fn weight(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl From<BTreeMap<String, f64>> for WeightTable {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}

/// Reduces a result set to the `net_score` entry.
///
/// The device metric contributes the mean of its device map; every other
/// metric contributes its scalar. A value of the wrong shape for its name is
/// skipped.
#[derive(Debug, Clone)]
pub struct NetScoreAggregator {
    weights: WeightTable,
    normalization: WeightNormalization,
    device_metric: String,
}

impl NetScoreAggregator {
    pub fn new(weights: WeightTable, normalization: WeightNormalization) -> Self {
        Self {
            weights,
            normalization,
            device_metric: DEVICE_METRIC.to_string(),
        }
    }

    /// Treat `name` instead of `size_score` as the device metric.
    pub fn with_device_metric(mut self, name: impl Into<String>) -> Self {
        self.device_metric = name.into();
        self
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Compute the composite. Never fails: any aggregation error, including a
    /// panic, yields 0.0 with the reason in `details.error`.
    pub fn aggregate(&self, results: &ResultSet) -> MetricResult {
        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.weighted_sum(results)))
            .unwrap_or_else(|payload| {
                Err(AggregateError::Panicked {
                    message: panic_message(payload.as_ref()),
                })
            });
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(score) => {
                debug!(net_score = ?score.value, latency_ms, "Net score aggregated");
                MetricResult::from_score(NET_SCORE, score, latency_ms)
            }
            Err(err) => {
                warn!(error = %err, "Net score aggregation failed");
                MetricResult::failure(NET_SCORE, MetricValue::Score(0.0), latency_ms, err)
            }
        }
    }

    /// Aggregate and insert the result under `net_score`.
    pub fn apply(&self, results: &mut ResultSet) -> MetricResult {
        let net = self.aggregate(results);
        results.insert(net.clone());
        net
    }

    fn weighted_sum(&self, results: &ResultSet) -> Result<Score, AggregateError> {
        let mut total = 0.0_f64;
        let mut applied = 0.0_f64;
        let mut skipped = Vec::new();

        for result in results.iter().filter(|r| r.name != NET_SCORE) {
            let weight = self.weights.weight(&result.name);
            let is_device_metric = result.name == self.device_metric;
            let contribution = match (&result.value, is_device_metric) {
                (MetricValue::Devices(map), true) => device_mean(&result.name, map)?,
                (MetricValue::Score(v), false) => Some(*v),
                _ => None,
            };
            let Some(contribution) = contribution else {
                debug!(metric = %result.name, "Skipping malformed value in net score");
                skipped.push(result.name.clone());
                continue;
            };
            total += weight * contribution;
            applied += weight;
        }

        if !total.is_finite() {
            return Err(AggregateError::NonFiniteTotal);
        }

        let value = match self.normalization {
            WeightNormalization::Absolute => total,
            WeightNormalization::AppliedWeights if applied > 0.0 => total / applied,
            WeightNormalization::AppliedWeights => 0.0,
        };

        let mut score = Score::new(value).with_detail("applied_weight", applied);
        if !skipped.is_empty() {
            score = score.with_detail("skipped", skipped);
        }
        Ok(score)
    }
}

impl Default for NetScoreAggregator {
    fn default() -> Self {
        Self::new(WeightTable::reference(), WeightNormalization::Absolute)
    }
}

/// Mean of a device map. `Ok(None)` marks a malformed map (empty or with a
/// non-finite entry) that contributes nothing.
fn device_mean(name: &str, map: &BTreeMap<String, f64>) -> Result<Option<f64>, AggregateError> {
    if map.is_empty() || map.values().any(|v| !v.is_finite()) {
        return Ok(None);
    }
    let sum: f64 = map.values().sum();
    let mean = sum / map.len() as f64;
    if !mean.is_finite() {
        return Err(AggregateError::NonFiniteMean {
            metric: name.to_string(),
        });
    }
    Ok(Some(mean))
}
