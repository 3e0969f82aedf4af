//! Metrics engine. Runs registered metrics against a model descriptor and
//! collects one result per metric, isolating failures.
//!
//! Every metric runs in its own task. A metric that returns an error or
//! panics is replaced by its placeholder value with `details.error` set; the
//! other metrics and the evaluation as a whole are unaffected.

use crate::config::EngineConfig;
use crate::error::MetricError;
use crate::metric::{Metric, MetricResult, ResultSet};
use crate::registry::MetricRegistry;
use crate::resources::ModelDescriptor;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

pub struct MetricsEngine {
    registry: Arc<MetricRegistry>,
    config: EngineConfig,
}

impl MetricsEngine {
    pub fn new(registry: Arc<MetricRegistry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Metrics selected by `include`, in registry order. Unknown names in
    /// `include` are ignored.
    fn selected(&self, include: Option<&HashSet<String>>) -> Vec<Arc<dyn Metric>> {
        self.registry
            .iter()
            .filter(|m| include.is_none_or(|set| set.contains(m.name())))
            .cloned()
            .collect()
    }

    /// Compute every selected metric for `model`.
    ///
    /// The result set has exactly one entry per selected metric, whether it
    /// succeeded or not.
    pub async fn compute_all_metrics(
        &self,
        model: &ModelDescriptor,
        include: Option<&HashSet<String>>,
    ) -> ResultSet {
        let metrics = self.selected(include);
        let start = Instant::now();
        info!(
            model = %model.model.url(),
            metrics = metrics.len(),
            parallel = self.config.parallel,
            "Computing metrics"
        );

        let results = if self.config.parallel {
            self.run_parallel(metrics, model).await
        } else {
            let mut results = ResultSet::new();
            for metric in metrics {
                results.insert(run_isolated(metric.as_ref(), model).await);
            }
            results
        };

        let failed = results.iter().filter(|r| r.error().is_some()).count();
        info!(
            model = %model.model.url(),
            duration_ms = elapsed_ms(start),
            degraded = failed,
            "Metrics complete"
        );
        results
    }

    async fn run_parallel(&self, metrics: Vec<Arc<dyn Metric>>, model: &ModelDescriptor) -> ResultSet {
        let semaphore = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let mut handles = Vec::with_capacity(metrics.len());

        for metric in metrics {
            let sem = semaphore.clone();
            let model = model.clone();
            let dispatched = Instant::now();
            let fallback = (metric.name().to_string(), metric.failure_value());
            let handle = tokio::spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = sem.acquire_owned().await.ok();
                run_isolated(metric.as_ref(), &model).await
            });
            handles.push((handle, dispatched, fallback));
        }

        let mut results = ResultSet::new();
        for (handle, dispatched, (name, placeholder)) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    let err = MetricError::Join {
                        metric: name.clone(),
                        message: join_err.to_string(),
                    };
                    error!(metric = %name, error = %err, "Metric task failed");
                    MetricResult::failure(name, placeholder, elapsed_ms(dispatched), err)
                }
            };
            results.insert(result);
        }
        results
    }
}

/// Run one metric, converting an error or panic into its placeholder result.
/// Latency covers only this metric's own computation.
pub async fn run_isolated(metric: &dyn Metric, model: &ModelDescriptor) -> MetricResult {
    let name = metric.name().to_string();
    debug!(metric = %name, "Metric started");
    let start = Instant::now();
    let outcome = AssertUnwindSafe(metric.compute(model)).catch_unwind().await;
    let latency_ms = elapsed_ms(start);

    match outcome {
        Ok(Ok(score)) => {
            if let Some(reason) = score.details.get("error") {
                warn!(metric = %name, latency_ms, reason = %reason, "Metric degraded");
            } else {
                debug!(metric = %name, latency_ms, value = ?score.value, "Metric finished");
            }
            MetricResult::from_score(name, score, latency_ms)
        }
        Ok(Err(err)) => {
            error!(metric = %name, latency_ms, error = %err, "Metric failed");
            MetricResult::failure(name, metric.failure_value(), latency_ms, err)
        }
        Err(payload) => {
            let err = MetricError::Panicked {
                metric: name.clone(),
                message: panic_message(payload.as_ref()),
            };
            error!(metric = %name, latency_ms, error = %err, "Metric panicked");
            MetricResult::failure(name, metric.failure_value(), latency_ms, err)
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
