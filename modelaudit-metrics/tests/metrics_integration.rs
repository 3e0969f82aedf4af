//! The built-in registry evaluated end to end against local fixtures, with a
//! scripted rater and an in-memory review history.

use async_trait::async_trait;
use modelaudit_core::adapters::github::{PullRequest, Review};
use modelaudit_core::{
    EngineConfig, FetchError, LocalResource, MetricError, MetricValue, MetricsEngine,
    ModelDescriptor, NetScoreAggregator, RepoView, ResourceKind, flatten_to_ndjson,
};
use modelaudit_metrics::{BUILTIN_METRICS, Rater, Rating, ReviewSource, default_registry};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Always answers with a fenced JSON reply, as chat models often do.
struct Scripted {
    calls: AtomicUsize,
}

#[async_trait]
impl Rater for Scripted {
    async fn rate(&self, _prompt: &str) -> Result<Rating, MetricError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(modelaudit_metrics::parse_rating(
            "```json\n{\"score\": 1.0, \"justification\": \"clear\"}\n```",
        ))
    }
}

struct OneReviewedPull {
    root: PathBuf,
}

#[async_trait]
impl ReviewSource for OneReviewedPull {
    async fn open_repository(&self, _url: &str) -> Result<RepoView, FetchError> {
        Ok(RepoView::borrowed(self.root.clone()))
    }

    async fn pull_requests(&self, _: &str, _: &str) -> Result<Vec<PullRequest>, FetchError> {
        Ok(serde_json::from_value(json!([
            {"number": 7, "state": "closed", "merged_at": "2024-03-01T00:00:00Z", "additions": 2}
        ]))
        .unwrap())
    }

    async fn pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest, FetchError> {
        Err(FetchError::NotFound {
            url: format!("{owner}/{repo}#{number}"),
        })
    }

    async fn reviews(&self, _: &str, _: &str, _: u64) -> Result<Vec<Review>, FetchError> {
        Ok(serde_json::from_value(json!([{"state": "APPROVED"}])).unwrap())
    }
}

struct Fixture {
    _model_dir: tempfile::TempDir,
    code_dir: tempfile::TempDir,
    descriptor: ModelDescriptor,
}

fn fixture() -> Fixture {
    let model_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        model_dir.path().join("README.md"),
        format!("{}\nCode lives at https://github.com/acme/tiny\n", "# Tiny\n".repeat(10)),
    )
    .unwrap();
    std::fs::write(model_dir.path().join("pytorch_model.bin"), vec![0u8; 2048]).unwrap();

    let code_dir = tempfile::tempdir().unwrap();
    std::fs::write(code_dir.path().join("train.py"), "import torch\nprint('hi')\n").unwrap();

    let model = LocalResource::new("https://huggingface.co/acme/tiny", ResourceKind::Model)
        .with_root(model_dir.path())
        .with_metadata(json!({"lastModified": chrono::Utc::now().to_rfc3339()}));
    let dataset = LocalResource::new("https://github.com/acme/tiny-data", ResourceKind::Dataset)
        .with_metadata(json!({
            "description": "tiny",
            "license": {"name": "MIT License"},
            "homepage": "https://acme.test",
        }));

    Fixture {
        descriptor: ModelDescriptor::new(Arc::new(model)).with_dataset(Arc::new(dataset)),
        _model_dir: model_dir,
        code_dir,
    }
}

fn engine(fixture: &Fixture, rater: Arc<Scripted>) -> MetricsEngine {
    let reviews = Arc::new(OneReviewedPull {
        root: fixture.code_dir.path().to_path_buf(),
    });
    let registry = default_registry(rater, reviews).unwrap();
    MetricsEngine::new(Arc::new(registry), EngineConfig::default())
}

#[tokio::test]
async fn test_builtin_metrics_end_to_end() {
    let fixture = fixture();
    let rater = Arc::new(Scripted {
        calls: AtomicUsize::new(0),
    });
    let mut results = engine(&fixture, rater.clone())
        .compute_all_metrics(&fixture.descriptor, None)
        .await;

    let names: HashSet<&str> = results.names().collect();
    assert_eq!(names, BUILTIN_METRICS.into_iter().collect::<HashSet<_>>());

    // Only the model README exists, so each README-pair metric rates once.
    assert_eq!(rater.calls.load(Ordering::SeqCst), 3);
    let score = |name: &str| results.get(name).unwrap().value.as_score().unwrap();
    assert_eq!(score("license"), 1.0);
    assert_eq!(score("performance_claims"), 0.5);
    assert_eq!(score("dataset_and_code_score"), 0.5);

    assert_eq!(score("code_quality"), 0.0);
    assert_eq!(
        results.get("code_quality").unwrap().error(),
        Some("No code URL provided")
    );
    // 2 reviewed additions over 2 lines of code.
    assert_eq!(score("reviewedness"), 1.0);
    assert!(score("bus_factor") > 0.09 && score("bus_factor") <= 0.1);

    let size = results.get("size_score").unwrap().value.clone();
    assert!(matches!(&size, MetricValue::Devices(m) if m.values().all(|v| *v == 1.0)));

    let net = NetScoreAggregator::default().apply(&mut results);
    let net = net.value.as_score().unwrap();
    assert!((0.0..=1.0).contains(&net), "net score {net}");

    let record = flatten_to_ndjson(&results);
    assert_eq!(record.len(), 20);
    assert!(record["reviewedness_latency"].is_u64());
}

#[tokio::test]
async fn test_selection_runs_only_named_metrics() {
    let fixture = fixture();
    let rater = Arc::new(Scripted {
        calls: AtomicUsize::new(0),
    });
    let include: HashSet<String> = ["size_score", "dataset_quality"]
        .into_iter()
        .map(String::from)
        .collect();
    let results = engine(&fixture, rater.clone())
        .compute_all_metrics(&fixture.descriptor, Some(&include))
        .await;

    assert_eq!(results.names().collect::<Vec<_>>(), vec!["dataset_quality", "size_score"]);
    assert_eq!(rater.calls.load(Ordering::SeqCst), 0);
    // documentation 1.0, license 1.0, freshness 0.5 (no date), no community or topics
    assert_eq!(results.get("dataset_quality").unwrap().value, MetricValue::Score(0.6));
}
