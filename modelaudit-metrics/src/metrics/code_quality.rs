//! Code quality: static analysis of the linked codebase plus its popularity.

use async_trait::async_trait;
use modelaudit_core::{Metadata, MetricError, ModelDescriptor, Score};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// An external checker run from the repository root.
#[derive(Debug, Clone)]
pub struct Linter {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl Linter {
    pub fn new(name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn flake8() -> Self {
        Self::new("flake8", "flake8", &["."])
    }

    pub fn mypy() -> Self {
        Self::new("mypy", "mypy", &["--strict", "."])
    }

    /// Run in `root` and score the outcome. A linter that cannot be started
    /// is an error; a failing run is scored from its output volume.
    pub async fn score(&self, root: &Path) -> std::io::Result<f64> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .current_dir(root)
            .kill_on_drop(true)
            .output()
            .await?;
        if output.status.success() {
            return Ok(1.0);
        }
        let lines = count_newlines(&output.stdout) + count_newlines(&output.stderr);
        Ok(lint_score(lines))
    }
}

fn count_newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|b| **b == b'\n').count()
}

/// Score for a failing linter run that printed `lines` lines.
pub fn lint_score(lines: usize) -> f64 {
    match lines {
        0 => 1.0,
        1..=9 => 0.8,
        10..=49 => 0.6,
        _ => 0.4,
    }
}

/// Popularity from GitHub stars, GitLab stars or Hugging Face likes.
pub fn stars_score(meta: &Metadata) -> f64 {
    let raw = ["stargazers_count", "star_count", "likes"]
        .iter()
        .find_map(|key| meta.get(*key))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    match raw {
        i64::MIN..=0 => 0.0,
        1..=49 => 0.5,
        _ => 1.0,
    }
}

pub struct CodeQuality {
    linters: Vec<Linter>,
}

impl CodeQuality {
    pub const NAME: &'static str = "code_quality";

    pub fn new(linters: Vec<Linter>) -> Self {
        Self { linters }
    }
}

impl Default for CodeQuality {
    fn default() -> Self {
        Self::new(vec![Linter::flake8(), Linter::mypy()])
    }
}

#[async_trait]
impl modelaudit_core::Metric for CodeQuality {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn compute(&self, model: &ModelDescriptor) -> Result<Score, MetricError> {
        let Some(code) = &model.code else {
            warn!("No code URL provided for code quality");
            return Ok(Score::degraded(0.0, "No code URL provided"));
        };
        info!(code = code.url(), "Computing code quality");

        let view = match code.open_files(None).await {
            Ok(view) => view,
            Err(e) => {
                warn!(code = code.url(), error = %e, "Codebase unavailable");
                return Ok(Score::degraded(0.0, e));
            }
        };

        let mut score = Score::new(0.0);
        let mut components = Vec::with_capacity(self.linters.len() + 1);
        for linter in &self.linters {
            let value = match linter.score(view.root()).await {
                Ok(v) => v,
                Err(e) => {
                    warn!(linter = %linter.name, error = %e, "Linter could not run");
                    score = score.with_detail(&format!("{}_error", linter.name), e.to_string());
                    0.0
                }
            };
            score = score.with_detail(&linter.name, value);
            components.push(value);
        }

        let stars = match code.fetch_metadata().await {
            Ok(meta) => stars_score(&meta),
            Err(e) => {
                debug!(code = code.url(), error = %e, "Metadata unavailable for popularity");
                score = score.with_detail("stars_error", e.to_string());
                0.0
            }
        };
        components.push(stars);

        let value = components.iter().sum::<f64>() / components.len() as f64;
        debug!(?components, value, "Code quality sub-scores");

        score.value = value.into();
        Ok(score.with_detail("stars", stars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelaudit_core::{LocalResource, Metric, ResourceKind};
    use serde_json::json;
    use std::sync::Arc;

    fn sh(name: &str, script: &str) -> Linter {
        Linter::new(name, "sh", &["-c", script])
    }

    #[test]
    fn test_lint_score_buckets() {
        assert_eq!(lint_score(0), 1.0);
        assert_eq!(lint_score(9), 0.8);
        assert_eq!(lint_score(10), 0.6);
        assert_eq!(lint_score(49), 0.6);
        assert_eq!(lint_score(50), 0.4);
    }

    #[test]
    fn test_stars_score() {
        let meta = |v: Value| v.as_object().cloned().unwrap();
        assert_eq!(stars_score(&meta(json!({}))), 0.0);
        assert_eq!(stars_score(&meta(json!({"stargazers_count": 12}))), 0.5);
        assert_eq!(stars_score(&meta(json!({"star_count": 50}))), 1.0);
        assert_eq!(stars_score(&meta(json!({"likes": 0}))), 0.0);
    }

    #[tokio::test]
    async fn test_without_code_resource() {
        let model = LocalResource::new("https://huggingface.co/org/m", ResourceKind::Model);
        let score = CodeQuality::default()
            .compute(&ModelDescriptor::new(Arc::new(model)))
            .await
            .unwrap();
        assert_eq!(score.value.as_score(), Some(0.0));
        assert_eq!(score.details["error"], "No code URL provided");
    }

    #[tokio::test]
    async fn test_linters_and_stars() {
        let dir = tempfile::tempdir().unwrap();
        let code = LocalResource::new("https://github.com/org/repo", ResourceKind::Code)
            .with_root(dir.path())
            .with_metadata(json!({"stargazers_count": 120}));
        let model = LocalResource::new("https://huggingface.co/org/m", ResourceKind::Model);
        let descriptor = ModelDescriptor::new(Arc::new(model)).with_code(Arc::new(code));

        let metric = CodeQuality::new(vec![
            sh("clean", "exit 0"),
            sh("noisy", "printf 'a\\nb\\nc\\n'; exit 1"),
            Linter::new("absent", "modelaudit-no-such-linter", &[]),
        ]);
        let score = metric.compute(&descriptor).await.unwrap();

        assert_eq!(score.details["clean"], 1.0);
        assert_eq!(score.details["noisy"], 0.8);
        assert_eq!(score.details["absent"], 0.0);
        assert!(score.details.contains_key("absent_error"));
        assert_eq!(score.details["stars"], 1.0);
        let value = score.value.as_score().unwrap();
        assert!((value - (1.0 + 0.8 + 0.0 + 1.0) / 4.0).abs() < 1e-9);
    }
}
