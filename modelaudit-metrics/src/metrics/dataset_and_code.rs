//! Dataset and code documentation: whether the READMEs name their training
//! data and show runnable examples.

use crate::rater::Rater;
use crate::readme::{combine_ratings, rate_documents, try_readme};
use async_trait::async_trait;
use modelaudit_core::{MetricError, ModelDescriptor, Score};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct DatasetAndCode {
    rater: Arc<dyn Rater>,
}

impl DatasetAndCode {
    pub const NAME: &'static str = "dataset_and_code_score";

    pub fn new(rater: Arc<dyn Rater>) -> Self {
        Self { rater }
    }

    pub fn prompt(readme: &str) -> String {
        format!(
            "You are a strict rater. Output ONLY JSON.\n\n\
             Task:\n\
             - Assess the README for dataset documentation and example code.\n\
             - Look for named datasets, links, preprocessing details, splits and runnable \
             examples (scripts, notebooks, commands).\n\n\
             Buckets (pick one):\n\
             - 0.00: no dataset information and no example code.\n\
             - 0.50: mentions a dataset or shows a minimal example with sparse details.\n\
             - 0.75: both present but incomplete.\n\
             - 1.00: a well documented dataset and clear runnable examples.\n\n\
             Output:\n\
             {{\"score\": 0.00 | 0.50 | 0.75 | 1.00, \"justification\": \"<short explanation>\"}}\n\n\
             README text:\n{readme}"
        )
    }
}

#[async_trait]
impl modelaudit_core::Metric for DatasetAndCode {
    fn name(&self) -> &str {
        Self::NAME
    }

    /// Rates the model card and the code README; the dataset is judged through
    /// how they document it.
    async fn compute(&self, model: &ModelDescriptor) -> Result<Score, MetricError> {
        info!(model = model.model.url(), "Computing dataset and code score");

        let model_readme = try_readme(model.model.as_ref()).await;
        let code_readme = match &model.code {
            Some(code) => try_readme(code.as_ref()).await,
            None => None,
        };

        let documents = vec![("model", model_readme), ("code", code_readme)];
        let (scores, details) =
            match rate_documents(Self::NAME, self.rater.as_ref(), documents, Self::prompt).await {
                Ok(rated) => rated,
                Err(e) => {
                    warn!(error = %e, "Dataset and code rating failed");
                    return Ok(Score::degraded(0.0, e));
                }
            };
        let value = combine_ratings(&scores);
        debug!(?scores, value, "Dataset and code rated");

        Ok(Score {
            value: value.into(),
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rater::Rating;
    use modelaudit_core::{LocalResource, Metric, ResourceKind};

    struct Zero;

    #[async_trait]
    impl Rater for Zero {
        async fn rate(&self, prompt: &str) -> Result<Rating, MetricError> {
            assert!(prompt.contains("runnable"));
            Ok(Rating::new(0.0, "nothing"))
        }
    }

    #[tokio::test]
    async fn test_all_zero_ratings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "just a model").unwrap();
        let model = LocalResource::new("https://huggingface.co/o/m", ResourceKind::Model)
            .with_root(dir.path());
        let score = DatasetAndCode::new(Arc::new(Zero))
            .compute(&ModelDescriptor::new(Arc::new(model)))
            .await
            .unwrap();
        assert_eq!(score.value.as_score(), Some(0.0));
        assert_eq!(score.details["model"]["justification"], "nothing");
        assert_eq!(score.details["code"]["justification"], "README not found");
    }
}
