//! Size score: how comfortably the model's weights fit on each target device.

use super::{model_files, scan_view};
use async_trait::async_trait;
use modelaudit_core::{
    DEVICE_METRIC, DEVICES, FetchError, MetricError, MetricValue, ModelDescriptor, RepoView, Score,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Usable bytes per device, in the order of [`DEVICES`].
pub const DEVICE_BUDGETS: [(&str, f64); 4] = [
    ("raspberry_pi", 0.75e9),
    ("jetson_nano", 2.5e9),
    ("desktop_pc", 8.0e9),
    ("aws_server", 16.0e9),
];

/// Below this fraction of the budget a device scores 1.0.
const COMFORTABLE: f64 = 0.25;
/// At or above this fraction of the budget a device scores 0.0.
const EXHAUSTED: f64 = 1.5;

pub struct SizeScore;

impl SizeScore {
    pub const NAME: &'static str = DEVICE_METRIC;
}

/// Suitability for one device: `1 − smoothstep` over the budget ratio.
pub fn device_score(total_bytes: f64, budget: f64) -> f64 {
    let ratio = total_bytes / budget;
    let t = ((ratio - COMFORTABLE) / (EXHAUSTED - COMFORTABLE)).clamp(0.0, 1.0);
    1.0 - t * t * (3.0 - 2.0 * t)
}

pub fn device_scores(total_bytes: u64) -> BTreeMap<String, f64> {
    debug_assert_eq!(DEVICE_BUDGETS.map(|(d, _)| d), DEVICES);
    DEVICE_BUDGETS
        .iter()
        .map(|(device, budget)| (device.to_string(), device_score(total_bytes as f64, *budget)))
        .collect()
}

/// Total bytes and count of the top-level weight files.
pub fn weight_totals(view: &RepoView) -> Result<(u64, usize), FetchError> {
    let files = model_files(view)?;
    let mut total: u64 = 0;
    for file in &files {
        total = total.saturating_add(view.size_bytes(file)?);
    }
    Ok((total, files.len()))
}

/// Device scores for a scan outcome. A failed scan reports zero devices.
pub fn score_totals(totals: Result<(u64, usize), FetchError>) -> Score {
    let (total, num_files) = match totals {
        Ok(totals) => totals,
        Err(e) => {
            warn!(error = %e, "Model files could not be measured");
            return Score::degraded(MetricValue::zero_devices(), e);
        }
    };
    let scores = device_scores(total);
    debug!(total_bytes = total, files = num_files, ?scores, "Size sub-scores");

    Score::new(MetricValue::Devices(scores))
        .with_detail("total_bytes", total)
        .with_detail("num_files", num_files)
}

#[async_trait]
impl modelaudit_core::Metric for SizeScore {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn failure_value(&self) -> MetricValue {
        MetricValue::zero_devices()
    }

    async fn compute(&self, model: &ModelDescriptor) -> Result<Score, MetricError> {
        info!(model = model.model.url(), "Computing size score");

        let view = match model.model.open_files(None).await {
            Ok(view) => view,
            Err(e) => {
                warn!(error = %e, "Model files unavailable for size score");
                return Ok(Score::degraded(MetricValue::zero_devices(), e));
            }
        };

        let totals = scan_view(Self::NAME, view, weight_totals).await?;
        Ok(score_totals(totals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelaudit_core::{LocalResource, Metric, ResourceKind};
    use std::sync::Arc;

    #[test]
    fn test_device_score_curve() {
        assert_eq!(device_score(0.0, 1.0), 1.0);
        assert_eq!(device_score(0.25, 1.0), 1.0);
        assert_eq!(device_score(1.5, 1.0), 0.0);
        assert_eq!(device_score(10.0, 1.0), 0.0);
        // Midpoint of the ramp.
        assert!((device_score(0.875, 1.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_device_scores_are_monotonic_in_budget() {
        let scores = device_scores(2_000_000_000);
        assert_eq!(scores.len(), 4);
        assert!(scores["raspberry_pi"] <= scores["jetson_nano"]);
        assert!(scores["jetson_nano"] <= scores["desktop_pc"]);
        assert!(scores["desktop_pc"] <= scores["aws_server"]);
        assert_eq!(scores["aws_server"], 1.0);
        assert_eq!(scores["raspberry_pi"], 0.0);
    }

    #[tokio::test]
    async fn test_small_model_fits_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.bin"), vec![0u8; 1024]).unwrap();
        std::fs::write(dir.path().join("notes.txt"), vec![0u8; 4096]).unwrap();
        let model = LocalResource::new("https://huggingface.co/org/m", ResourceKind::Model)
            .with_root(dir.path());

        let score = SizeScore
            .compute(&ModelDescriptor::new(Arc::new(model)))
            .await
            .unwrap();
        let devices = score.value.as_devices().unwrap();
        assert!(devices.values().all(|v| *v == 1.0));
        assert_eq!(score.details["total_bytes"], 1024);
    }

    #[test]
    fn test_failed_scan_degrades_to_zero_devices() {
        let score = score_totals(Err(FetchError::NotFound {
            url: "pytorch_model.bin".into(),
        }));
        assert_eq!(score.value, MetricValue::zero_devices());
        assert!(score.details["error"].as_str().unwrap().contains("pytorch_model.bin"));
        assert!(!score.details.contains_key("total_bytes"));
    }

    #[tokio::test]
    async fn test_unreachable_model_reports_zero_devices() {
        let model = LocalResource::unavailable("https://huggingface.co/org/m", ResourceKind::Model);
        let score = SizeScore
            .compute(&ModelDescriptor::new(Arc::new(model)))
            .await
            .unwrap();
        assert_eq!(score.value, MetricValue::zero_devices());
        assert!(score.details.contains_key("error"));
    }
}
