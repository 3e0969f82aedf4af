//! README access and the rating helpers shared by the LLM-backed metrics.

use crate::rater::{Rater, Rating};
use modelaudit_core::{Details, MetricError, Resource};
use tracing::{debug, warn};

pub const README: &str = "README.md";

/// `README.md` of a resource, or `None` if it cannot be fetched.
pub async fn try_readme(resource: &dyn Resource) -> Option<String> {
    let allow = vec![README.to_string()];
    match resource.open_files(Some(&allow)).await {
        Ok(view) => view.read_text(README).ok(),
        Err(e) => {
            debug!(url = resource.url(), error = %e, "README unavailable");
            None
        }
    }
}

/// 0.0 if every rating is zero, 1.0 if every rating is at least 0.9,
/// otherwise the mean. An empty slice is 0.0.
pub fn combine_ratings(scores: &[f64]) -> f64 {
    if scores.is_empty() || scores.iter().all(|s| *s == 0.0) {
        0.0
    } else if scores.iter().all(|s| *s >= 0.9) {
        1.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Rate each labelled document with `prompt`. A missing document is recorded
/// as a zero rating. Rater errors propagate.
pub async fn rate_documents(
    metric: &str,
    rater: &dyn Rater,
    documents: Vec<(&str, Option<String>)>,
    prompt: fn(&str) -> String,
) -> Result<(Vec<f64>, Details), MetricError> {
    let mut scores = Vec::with_capacity(documents.len());
    let mut details = Details::new();
    for (label, text) in documents {
        let rating = match text.filter(|t| !t.trim().is_empty()) {
            Some(text) => rater.rate(&prompt(&text)).await?,
            None => {
                warn!(metric, document = label, "No README found");
                Rating::missing_readme()
            }
        };
        scores.push(rating.score);
        details.insert(label.to_string(), rating.to_value());
    }
    Ok((scores, details))
}
