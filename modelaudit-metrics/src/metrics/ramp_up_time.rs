//! Ramp-up time: how quickly a newcomer can start using the model, judged by
//! README length and the number of ready-to-load weight files.

use super::{model_files, scan_view};
use crate::readme::README;
use async_trait::async_trait;
use modelaudit_core::{MetricError, ModelDescriptor, Score};
use tracing::{debug, info, warn};

/// README length (in characters) that earns the full documentation sub-score.
const FULL_README_CHARS: f64 = 5000.0;
/// Weight-file count that earns the full model sub-score.
const FULL_MODEL_FILES: f64 = 10.0;

pub struct RampUpTime;

impl RampUpTime {
    pub const NAME: &'static str = "ramp_up_time";
}

/// `(readme_score, models_score)`.
pub fn sub_scores(readme_chars: usize, model_files: usize) -> (f64, f64) {
    (
        (readme_chars as f64 / FULL_README_CHARS).min(1.0),
        (model_files as f64 / FULL_MODEL_FILES).min(1.0),
    )
}

#[async_trait]
impl modelaudit_core::Metric for RampUpTime {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn compute(&self, model: &ModelDescriptor) -> Result<Score, MetricError> {
        info!(model = model.model.url(), "Computing ramp-up time");

        let view = match model.model.open_files(None).await {
            Ok(view) => view,
            Err(e) => {
                warn!(error = %e, "Model files unavailable for ramp-up time");
                return Ok(Score::degraded(0.0, e));
            }
        };

        let readme_chars = view
            .read_text(README)
            .map(|text| text.chars().count())
            .unwrap_or(0);
        let num_models = match scan_view(Self::NAME, view, |v| model_files(v)).await? {
            Ok(files) => files.len(),
            Err(e) => {
                warn!(error = %e, "Model files could not be listed");
                return Ok(Score::degraded(0.0, e).with_detail("readme_length", readme_chars));
            }
        };
        let (readme_score, models_score) = sub_scores(readme_chars, num_models);
        let value = 0.6 * readme_score + 0.4 * models_score;

        debug!(readme_chars, num_models, readme_score, models_score, value, "Ramp-up sub-scores");

        Ok(Score::new(value)
            .with_detail("readme_length", readme_chars)
            .with_detail("num_models", num_models)
            .with_detail("readme_score", readme_score)
            .with_detail("models_score", models_score))
    }
}
