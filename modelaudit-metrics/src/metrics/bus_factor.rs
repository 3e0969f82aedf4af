//! Bus factor: how many people keep the project alive, discounted by how long
//! ago anything was touched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modelaudit_core::{Metadata, MetricError, ModelDescriptor, Resource, Score};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Contributor count that earns the full base score.
const FULL_CONTRIBUTORS: f64 = 10.0;
/// Days for the recency factor to halve.
const HALF_LIFE_DAYS: f64 = 365.0;

pub struct BusFactor;

impl BusFactor {
    pub const NAME: &'static str = "bus_factor";
}

/// `(base_score, recency_score, final_score)` for a contributor count and the
/// freshest known modification time. An unknown date does not discount.
pub fn bus_factor_score(
    contributors: u64,
    freshest: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (f64, f64, f64) {
    let base = (contributors as f64 / FULL_CONTRIBUTORS).min(1.0);
    let recency = match freshest {
        Some(date) => {
            let days = (now - date).num_days().max(0) as f64;
            (-std::f64::consts::LN_2 * days / HALF_LIFE_DAYS).exp()
        }
        None => 1.0,
    };
    (base, recency, (base * recency).clamp(0.0, 1.0))
}

/// Contributors from code metadata: `num_contributors`, then `contributors`
/// (a count or a list), defaulting to 1.
pub fn contributor_count(meta: Option<&Metadata>) -> u64 {
    let Some(meta) = meta else { return 1 };
    ["num_contributors", "contributors"]
        .iter()
        .find_map(|key| match meta.get(*key) {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::Array(items)) => Some(items.len() as u64),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(1)
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn string_field<'a>(meta: Option<&'a Metadata>, keys: &[&str]) -> Option<&'a str> {
    let meta = meta?;
    keys.iter().find_map(|k| meta.get(*k).and_then(Value::as_str))
}

async fn metadata_of(resource: Option<&Arc<dyn Resource>>) -> Option<Arc<Metadata>> {
    let resource = resource?;
    match resource.fetch_metadata().await {
        Ok(meta) => Some(meta),
        Err(e) => {
            debug!(url = resource.url(), error = %e, "Metadata unavailable for bus factor");
            None
        }
    }
}

#[async_trait]
impl modelaudit_core::Metric for BusFactor {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn compute(&self, model: &ModelDescriptor) -> Result<Score, MetricError> {
        info!(model = model.model.url(), "Computing bus factor");

        let model_meta = metadata_of(Some(&model.model)).await;
        let dataset_meta = metadata_of(model.dataset.as_ref()).await;
        let code_meta = metadata_of(model.code.as_ref()).await;

        let last_model = string_field(model_meta.as_deref(), &["lastModified"]);
        let last_dataset = string_field(dataset_meta.as_deref(), &["lastModified"]);
        let last_commit = string_field(code_meta.as_deref(), &["pushed_at", "updated_at"]);

        let freshest = [last_commit, last_model, last_dataset]
            .into_iter()
            .flatten()
            .filter_map(parse_date)
            .max();
        let contributors = contributor_count(code_meta.as_deref());
        let (base, recency, value) = bus_factor_score(contributors, freshest, Utc::now());

        debug!(contributors, ?freshest, base, recency, value, "Bus factor sub-scores");

        Ok(Score::new(value)
            .with_detail("contributors", contributors)
            .with_detail("base_score", base)
            .with_detail("recency_score", recency)
            .with_detail("lastModified_model", last_model)
            .with_detail("lastModified_dataset", last_dataset)
            .with_detail("last_commit_date", last_commit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use modelaudit_core::{LocalResource, Metric, ResourceKind};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_score_halves_after_a_year() {
        let (base, recency, value) = bus_factor_score(10, Some(now() - Duration::days(365)), now());
        assert_eq!(base, 1.0);
        assert!((recency - 0.5).abs() < 1e-9);
        assert!((value - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_date_and_future_dates_do_not_discount() {
        assert_eq!(bus_factor_score(5, None, now()), (0.5, 1.0, 0.5));
        let (_, recency, _) = bus_factor_score(5, Some(now() + Duration::days(30)), now());
        assert_eq!(recency, 1.0);
    }

    #[test]
    fn test_contributor_count_sources() {
        let meta = |v: serde_json::Value| v.as_object().cloned().unwrap();
        assert_eq!(contributor_count(None), 1);
        assert_eq!(contributor_count(Some(&meta(json!({"num_contributors": 7})))), 7);
        assert_eq!(contributor_count(Some(&meta(json!({"num_contributors": null, "contributors": [1, 2, 3]})))), 3);
        assert_eq!(contributor_count(Some(&meta(json!({"stars": 3})))), 1);
    }

    #[tokio::test]
    async fn test_compute_uses_freshest_date() {
        let recent = (Utc::now() - Duration::days(1)).to_rfc3339();
        let model = LocalResource::new("https://huggingface.co/org/m", ResourceKind::Model)
            .with_metadata(json!({"lastModified": "2019-01-01T00:00:00.000Z"}));
        let code = LocalResource::new("https://github.com/org/repo", ResourceKind::Code)
            .with_metadata(json!({"num_contributors": 20, "pushed_at": recent}));
        let descriptor = ModelDescriptor::new(Arc::new(model)).with_code(Arc::new(code));

        let score = BusFactor.compute(&descriptor).await.unwrap();
        let value = score.value.as_score().unwrap();
        assert!(value > 0.99 && value <= 1.0, "got {value}");
        assert_eq!(score.details["contributors"], 20);
        assert_eq!(score.details["lastModified_dataset"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_compute_without_metadata() {
        let model = LocalResource::unavailable("https://huggingface.co/org/m", ResourceKind::Model);
        let score = BusFactor
            .compute(&ModelDescriptor::new(Arc::new(model)))
            .await
            .unwrap();
        assert!((score.value.as_score().unwrap() - 0.1).abs() < 1e-9);
    }
}
