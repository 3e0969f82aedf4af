//! Performance claims: whether the model and code READMEs back their claims
//! with benchmarks and numbers.

use crate::rater::Rater;
use crate::readme::{combine_ratings, rate_documents, try_readme};
use async_trait::async_trait;
use modelaudit_core::{MetricError, ModelDescriptor, Score};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PerformanceClaims {
    rater: Arc<dyn Rater>,
}

impl PerformanceClaims {
    pub const NAME: &'static str = "performance_claims";

    pub fn new(rater: Arc<dyn Rater>) -> Self {
        Self { rater }
    }

    pub fn prompt(readme: &str) -> String {
        format!(
            "You are a strict evaluator. Read the README and output ONLY JSON.\n\n\
             Definition:\n\
             - Performance claims are any evidence of evaluation: benchmarks, metrics, \
             result tables, dataset mentions or links to papers and results.\n\n\
             Buckets (pick one):\n\
             - 0.00: no claims at all.\n\
             - 0.50: vague language such as \"good results\".\n\
             - 0.75: names a dataset, benchmark or metric (GLUE, F1) without numbers or links.\n\
             - 1.00: concrete evidence such as numerical results, result tables, \
             explicit comparisons or links.\n\n\
             Output format:\n\
             {{\"score\": 0.00 | 0.50 | 0.75 | 1.00, \"justification\": \"<short explanation>\"}}\n\n\
             Examples:\n\
             - \"92% accuracy on CIFAR-10\" gives {{\"score\": 1.00, \"justification\": \"Concrete number\"}}\n\
             - \"Evaluated on GLUE, strong results\" gives {{\"score\": 0.75, \"justification\": \"Benchmark, no numbers\"}}\n\
             - \"Good performance\" gives {{\"score\": 0.50, \"justification\": \"Vague claim\"}}\n\n\
             README text:\n{readme}"
        )
    }
}

#[async_trait]
impl modelaudit_core::Metric for PerformanceClaims {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn compute(&self, model: &ModelDescriptor) -> Result<Score, MetricError> {
        info!(model = model.model.url(), "Computing performance claims");

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
                    warn!(error = %e, "Performance claims rating failed");
                    return Ok(Score::degraded(0.0, e));
                }
            };
        let value = combine_ratings(&scores);
        debug!(?scores, value, "Performance claims rated");

        Ok(Score {
            value: value.into(),
            details,
        })
    }
}
