//! Dataset quality from repository metadata: documentation, licensing,
//! freshness, community engagement and worked examples.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use modelaudit_core::{Metadata, MetricError, ModelDescriptor, Score};
use serde_json::Value;
use tracing::{debug, info, warn};

pub struct DatasetQuality;

impl DatasetQuality {
    pub const NAME: &'static str = "dataset_quality";
}

/// The five weighted components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetComponents {
    pub documentation: f64,
    pub license: f64,
    pub freshness: f64,
    pub community: f64,
    pub example_code: f64,
}

impl DatasetComponents {
    pub fn from_metadata(meta: &Metadata, now: DateTime<Utc>) -> Self {
        Self {
            documentation: documentation_score(meta),
            license: license_score(meta),
            freshness: freshness_score(meta, now),
            community: community_score(meta),
            example_code: example_code_score(meta),
        }
    }

    /// Weighted total rounded to three decimals.
    pub fn total(&self) -> f64 {
        let raw = 0.3 * self.documentation
            + 0.2 * self.license
            + 0.2 * self.freshness
            + 0.2 * self.community
            + 0.1 * self.example_code;
        (raw * 1000.0).round() / 1000.0
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn count(meta: &Metadata, key: &str) -> f64 {
    meta.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Fraction of `description`, `license` and `homepage` that are present.
pub fn documentation_score(meta: &Metadata) -> f64 {
    let fields = ["description", "license", "homepage"];
    let present = fields.iter().filter(|f| truthy(meta.get(**f))).count();
    present as f64 / fields.len() as f64
}

/// 1.0 when a named license object is present.
pub fn license_score(meta: &Metadata) -> f64 {
    let named = meta
        .get("license")
        .and_then(|l| l.get("name"))
        .is_some_and(|name| truthy(Some(name)));
    if named { 1.0 } else { 0.0 }
}

/// Recency of `updated_at`: within six months 1.0, within eighteen 0.5,
/// older 0.2. Missing or unparseable dates score 0.5.
pub fn freshness_score(meta: &Metadata, now: DateTime<Utc>) -> f64 {
    let Some(raw) = meta.get("updated_at").and_then(Value::as_str) else {
        return 0.5;
    };
    let Ok(updated) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ") else {
        return 0.5;
    };
    match (now - updated.and_utc()).num_days() {
        ..=183 => 1.0,
        184..=548 => 0.5,
        _ => 0.2,
    }
}

pub fn community_score(meta: &Metadata) -> f64 {
    0.5 * (count(meta, "stargazers_count") / 100.0).min(1.0)
        + 0.2 * (count(meta, "forks_count") / 50.0).min(1.0)
        + 0.2 * (count(meta, "watchers_count") / 100.0).min(1.0)
        + 0.1 * (count(meta, "subscribers_count") / 20.0).min(1.0)
}

/// 1.0 when any topic mentions examples or tutorials.
pub fn example_code_score(meta: &Metadata) -> f64 {
    let has_examples = meta
        .get("topics")
        .and_then(Value::as_array)
        .is_some_and(|topics| {
            topics
                .iter()
                .filter_map(Value::as_str)
                .any(|t| t.contains("example") || t.contains("tutorial"))
        });
    if has_examples { 1.0 } else { 0.0 }
}

#[async_trait]
impl modelaudit_core::Metric for DatasetQuality {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn compute(&self, model: &ModelDescriptor) -> Result<Score, MetricError> {
        let Some(dataset) = &model.dataset else {
            warn!("No dataset provided for dataset quality");
            return Ok(Score::degraded(0.0, "No dataset provided"));
        };
        info!(dataset = dataset.url(), "Computing dataset quality");

        let meta = match dataset.fetch_metadata().await {
            Ok(meta) => meta,
            Err(e) => {
                warn!(dataset = dataset.url(), error = %e, "Dataset metadata unavailable");
                return Ok(Score::degraded(0.0, e));
            }
        };

        let parts = DatasetComponents::from_metadata(&meta, Utc::now());
        let value = parts.total();
        debug!(?parts, value, "Dataset quality sub-scores");

        Ok(Score::new(value)
            .with_detail("documentation", parts.documentation)
            .with_detail("license", parts.license)
            .with_detail("freshness", parts.freshness)
            .with_detail("community", parts.community)
            .with_detail("example_code", parts.example_code))
    }
}
