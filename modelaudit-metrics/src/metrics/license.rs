//! License clarity and LGPL-2.1 compatibility, rated from the model card.

use crate::rater::{Rater, Rating};
use crate::readme::try_readme;
use async_trait::async_trait;
use modelaudit_core::{MetricError, ModelDescriptor, Score};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct License {
    rater: Arc<dyn Rater>,
}

impl License {
    pub const NAME: &'static str = "license";

    pub fn new(rater: Arc<dyn Rater>) -> Self {
        Self { rater }
    }

    pub fn prompt(readme: &str) -> String {
        format!(
            "You are a strict license rater. Output ONLY JSON.\n\n\
             Task:\n\
             - Read the README and identify the license.\n\
             - Judge how clearly it is stated and whether it is compatible with LGPLv2.1.\n\n\
             Buckets (pick one):\n\
             - 0.00: no license information.\n\
             - 0.50: a license is mentioned but ambiguous or hard to find.\n\
             - 0.75: a clear OSI license whose compatibility is uncertain.\n\
             - 1.00: clear, explicit and compatible (for example Apache-2.0 or MIT).\n\n\
             Output:\n\
             {{\"score\": 0.00 | 0.50 | 0.75 | 1.00, \"justification\": \"<short explanation>\"}}\n\n\
             README text:\n{readme}"
        )
    }
}

#[async_trait]
impl modelaudit_core::Metric for License {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn compute(&self, model: &ModelDescriptor) -> Result<Score, MetricError> {
        info!(model = model.model.url(), "Computing license");

        let Some(readme) = try_readme(model.model.as_ref())
            .await
            .filter(|t| !t.trim().is_empty())
        else {
            warn!("No README found for license");
            return Ok(Score::new(0.0).with_detail("model", Rating::missing_readme().to_value()));
        };

        let rating = match self.rater.rate(&Self::prompt(&readme)).await {
            Ok(rating) => rating,
            Err(e) => {
                warn!(error = %e, "License rating failed");
                return Ok(Score::degraded(0.0, e));
            }
        };
        debug!(score = rating.score, justification = %rating.justification, "License rated");

        Ok(Score::new(rating.score).with_detail("model", rating.to_value()))
    }
}
