//! The built-in metrics, one module per heuristic.

pub mod bus_factor;
pub mod code_quality;
pub mod dataset_and_code;
pub mod dataset_quality;
pub mod license;
pub mod performance;
pub mod ramp_up_time;
pub mod reviewedness;
pub mod size;

pub use bus_factor::BusFactor;
pub use code_quality::{CodeQuality, Linter};
pub use dataset_and_code::DatasetAndCode;
pub use dataset_quality::DatasetQuality;
pub use license::License;
pub use performance::PerformanceClaims;
pub use ramp_up_time::RampUpTime;
pub use reviewedness::{HubReviewSource, ReviewSource, Reviewedness};
pub use size::SizeScore;

use modelaudit_core::{FetchError, MetricError, RepoView};

/// Top-level weight files counted as "model files".
pub const MODEL_FILE_PATTERNS: [&str; 5] = ["*.bin", "*.h5", "*.pt", "*.onnx", "*.tflite"];

/// Top-level model weight files in a view, sorted and deduplicated.
pub(crate) fn model_files(view: &RepoView) -> Result<Vec<std::path::PathBuf>, FetchError> {
    let mut files = Vec::new();
    for pattern in MODEL_FILE_PATTERNS {
        files.extend(view.glob(pattern)?);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Run filesystem work over a view on the blocking pool. The outer error is
/// a lost task; the inner one is the fetch failure for the metric to handle.
pub(crate) async fn scan_view<T, F>(
    metric: &str,
    view: RepoView,
    work: F,
) -> Result<Result<T, FetchError>, MetricError>
where
    T: Send + 'static,
    F: FnOnce(&RepoView) -> Result<T, FetchError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&view))
        .await
        .map_err(|e| MetricError::computation(metric, format!("File scan aborted: {e}")))
}
