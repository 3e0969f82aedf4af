//! Metric interface: the trait every quality heuristic implements, plus the
//! value types that flow from metrics through the engine into a result set.

use crate::error::MetricError;
use crate::resources::ModelDescriptor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the composite entry added to a result set after aggregation.
pub const NET_SCORE: &str = "net_score";

/// Name of the device-capacity metric, the only entry whose value is a
/// device map.
pub const DEVICE_METRIC: &str = "size_score";

/// Keys of the device-capacity map, in reporting order.
pub const DEVICES: [&str; 4] = ["raspberry_pi", "jetson_nano", "desktop_pc", "aws_server"];

/// Free-form diagnostic payload attached to a result.
pub type Details = serde_json::Map<String, serde_json::Value>;

/// The value a metric produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// A plain score, normally in `[0, 1]`.
    Score(f64),
    /// Per-device suitability scores.
    Devices(BTreeMap<String, f64>),
}

impl MetricValue {
    /// The all-zero device map used when the device-capacity metric fails.
    pub fn zero_devices() -> Self {
        MetricValue::Devices(DEVICES.iter().map(|d| (d.to_string(), 0.0)).collect())
    }

    pub fn as_score(&self) -> Option<f64> {
        match self {
            MetricValue::Score(v) => Some(*v),
            MetricValue::Devices(_) => None,
        }
    }

    pub fn as_devices(&self) -> Option<&BTreeMap<String, f64>> {
        match self {
            MetricValue::Devices(map) => Some(map),
            MetricValue::Score(_) => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Score(v)
    }
}

/// What a metric's `compute` returns. The engine adds the name and latency.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub value: MetricValue,
    pub details: Details,
}

impl Score {
    pub fn new(value: impl Into<MetricValue>) -> Self {
        Self {
            value: value.into(),
            details: Details::new(),
        }
    }

    /// Attach one detail entry.
    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// A degraded score carrying an `error` detail.
    pub fn degraded(value: impl Into<MetricValue>, error: impl std::fmt::Display) -> Self {
        Self::new(value).with_detail("error", error.to_string())
    }
}

/// A finished metric evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub name: String,
    pub value: MetricValue,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub details: Details,
}

impl MetricResult {
    pub fn from_score(name: impl Into<String>, score: Score, latency_ms: u64) -> Self {
        Self {
            name: name.into(),
            value: score.value,
            latency_ms,
            details: score.details,
        }
    }

    /// Placeholder result for a metric whose computation failed.
    pub fn failure(
        name: impl Into<String>,
        value: MetricValue,
        latency_ms: u64,
        error: impl std::fmt::Display,
    ) -> Self {
        let mut details = Details::new();
        details.insert("error".into(), error.to_string().into());
        Self {
            name: name.into(),
            value,
            latency_ms,
            details,
        }
    }

    /// The `error` detail, if any.
    pub fn error(&self) -> Option<&str> {
        self.details.get("error").and_then(|v| v.as_str())
    }
}

/// Results of one evaluation, keyed and iterated by metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    results: BTreeMap<String, MetricResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result under its own name, replacing any previous entry.
    pub fn insert(&mut self, result: MetricResult) -> Option<MetricResult> {
        self.results.insert(result.name.clone(), result)
    }

    pub fn get(&self, name: &str) -> Option<&MetricResult> {
        self.results.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.results.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricResult> {
        self.results.values()
    }
}

impl FromIterator<MetricResult> for ResultSet {
    fn from_iter<I: IntoIterator<Item = MetricResult>>(iter: I) -> Self {
        let mut set = ResultSet::new();
        for result in iter {
            set.insert(result);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a MetricResult;
    type IntoIter = std::collections::btree_map::Values<'a, String, MetricResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.values()
    }
}

/// The core trait for all quality metrics.
///
/// Implementations must not keep per-evaluation state in `self`: one instance
/// is shared by every concurrent evaluation.
#[async_trait]
pub trait Metric: Send + Sync {
    /// Unique name for this metric. Doubles as its weight-table key.
    fn name(&self) -> &str;

    /// Value reported when `compute` errors or panics.
    fn failure_value(&self) -> MetricValue {
        MetricValue::Score(0.0)
    }

    /// Compute the score for a model. Fetch problems should be folded into a
    /// degraded `Score`; an `Err` is treated as an unexpected failure.
    async fn compute(&self, model: &ModelDescriptor) -> Result<Score, MetricError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_serializes_untagged() {
        assert_eq!(serde_json::to_value(MetricValue::Score(0.5)).unwrap(), json!(0.5));
        let zero = MetricValue::zero_devices();
        assert_eq!(
            serde_json::to_value(&zero).unwrap(),
            json!({"aws_server": 0.0, "desktop_pc": 0.0, "jetson_nano": 0.0, "raspberry_pi": 0.0})
        );
    }

    #[test]
    fn test_failure_result_carries_error() {
        let r = MetricResult::failure("license", MetricValue::Score(0.0), 3, "boom");
        assert_eq!(r.error(), Some("boom"));
        assert_eq!(r.latency_ms, 3);
    }

    #[test]
    fn test_result_set_is_name_ordered() {
        let set: ResultSet = ["zeta", "alpha", "mid"]
            .iter()
            .map(|n| MetricResult::from_score(*n, Score::new(1.0), 0))
            .collect();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_score_builders() {
        let s = Score::degraded(0.0, "no README").with_detail("source", "model");
        assert_eq!(s.details["error"], json!("no README"));
        assert_eq!(s.details["source"], json!("model"));
    }
}
