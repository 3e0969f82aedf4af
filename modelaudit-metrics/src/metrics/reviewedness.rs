//! Reviewedness: the share of a repository's code that arrived through pull
//! requests someone actually reviewed.
//!
//! The repository is the code resource when it is on GitHub, otherwise the
//! first GitHub link found in the model card. Lines of code are counted over
//! the cloned tree; reviewed lines are the additions of merged pull requests
//! with at least one approval or change request.
//!
//! Reports `-1` when no repository can be found or accessed.

use crate::readme::try_readme;
use async_trait::async_trait;
use modelaudit_core::adapters::github::{PullRequest, Review};
use modelaudit_core::urls::HubUrl;
use modelaudit_core::{FetchError, Hub, MetricError, ModelDescriptor, RepoView, Score};
use regex::Regex;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Pull request list pages (of 100) fetched per repository.
pub const DEFAULT_PR_PAGES: usize = 10;

/// Files above this size are not source code.
const MAX_SOURCE_BYTES: u64 = 10 * 1024 * 1024;

const SKIP_DIRS: &[&str] = &[
    ".git", ".svn", ".hg", "__pycache__", "node_modules", ".pytest_cache", ".mypy_cache",
    ".venv", "venv", "env", "dist", "build", ".tox", ".coverage", "htmlcov",
];

const BINARY_EXTENSIONS: &[&str] = &[
    "bin", "h5", "pt", "pth", "onnx", "tflite", "safetensors", "pb", "ckpt", "pkl", "pickle",
    "pyc", "pyo", "pyd", "so", "dylib", "dll", "exe", "o", "a", "lib", "zip", "tar", "gz", "tgz",
    "rar", "7z", "pdf", "doc", "docx", "xls", "xlsx", "mp4", "avi", "mov", "mp3", "wav", "jpg",
    "jpeg", "png", "gif", "bmp", "tiff", "npy", "npz", "hdf5",
];

/// Model metadata fields that may carry model-card prose.
const CARD_FIELDS: &[&str] = &["description", "model_summary", "summary", "card_data"];

static GITHUB_REPO: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^\w.@/-])(?:https?://)?(?:www\.)?github\.com/([\w.-]+)/([\w.-]+)").ok()
});

/// Where repository contents and review history come from.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn open_repository(&self, url: &str) -> Result<RepoView, FetchError>;

    async fn pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>, FetchError>;

    async fn pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest, FetchError>;

    async fn reviews(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Review>, FetchError>;
}

/// Live source: git clone for contents, the GitHub REST API for reviews.
pub struct HubReviewSource {
    hub: Arc<Hub>,
    max_pages: usize,
}

impl HubReviewSource {
    pub fn new(hub: Arc<Hub>, max_pages: usize) -> Self {
        Self { hub, max_pages }
    }
}

#[async_trait]
impl ReviewSource for HubReviewSource {
    async fn open_repository(&self, url: &str) -> Result<RepoView, FetchError> {
        self.hub.codebases.open(url, None).await
    }

    async fn pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>, FetchError> {
        self.hub.github.pull_requests(owner, repo, self.max_pages).await
    }

    async fn pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest, FetchError> {
        self.hub.github.pull_request(owner, repo, number).await
    }

    async fn reviews(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Review>, FetchError> {
        self.hub.github.reviews(owner, repo, number).await
    }
}

pub struct Reviewedness {
    source: Arc<dyn ReviewSource>,
}

impl Reviewedness {
    pub const NAME: &'static str = "reviewedness";

    pub fn new(source: Arc<dyn ReviewSource>) -> Self {
        Self { source }
    }

    async fn locate_repository(&self, model: &ModelDescriptor) -> Option<String> {
        if let Some(code) = &model.code
            && code.url().to_ascii_lowercase().contains("github.com")
        {
            return Some(code.url().to_string());
        }

        let mut texts = Vec::new();
        if let Some(readme) = try_readme(model.model.as_ref()).await {
            texts.push(readme);
        }
        match model.model.fetch_metadata().await {
            Ok(meta) => texts.extend(CARD_FIELDS.iter().filter_map(|f| card_text(meta.get(*f)))),
            Err(e) => debug!(error = %e, "Model metadata unavailable for repository lookup"),
        }

        texts
            .iter()
            .find_map(|text| extract_github_urls(text).into_iter().next())
    }
}

fn card_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => map.get("content").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// GitHub repositories mentioned in free text, normalized to
/// `https://github.com/<owner>/<repo>`, in order of first appearance.
pub fn extract_github_urls(text: &str) -> Vec<String> {
    let Some(pattern) = GITHUB_REPO.as_ref() else {
        return Vec::new();
    };
    let mut urls: Vec<String> = Vec::new();
    for caps in pattern.captures_iter(text) {
        let owner = &caps[1];
        let repo = caps[2].trim_end_matches('.');
        let repo = repo.strip_suffix(".git").unwrap_or(repo);
        if owner.is_empty() || repo.is_empty() {
            continue;
        }
        let url = format!("https://github.com/{owner}/{repo}");
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

fn is_skipped_dir(name: &str) -> bool {
    SKIP_DIRS.contains(&name) || name.ends_with(".egg-info")
}

fn is_source_file(path: &Path, len: u64) -> bool {
    let dotfile = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_none_or(|n| n.starts_with('.'));
    let binary = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| BINARY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
    !dotfile && !binary && len <= MAX_SOURCE_BYTES
}

fn line_count(bytes: &[u8]) -> u64 {
    let newlines = bytes.iter().filter(|b| **b == b'\n').count() as u64;
    match bytes.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

/// Lines of source under `root`, skipping VCS and build directories,
/// dotfiles, binaries and weight files, and anything over 10 MiB.
pub fn count_loc(root: &Path) -> u64 {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !e.file_name().to_str().is_some_and(is_skipped_dir)
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.metadata()
                .map(|m| is_source_file(e.path(), m.len()))
                .unwrap_or(false)
        })
        .filter_map(|e| std::fs::read(e.path()).ok())
        .map(|bytes| line_count(&bytes))
        .sum()
}

fn access_failure(url: &str, err: &FetchError) -> Score {
    let score = Score::new(-1.0).with_detail("url", url);
    match err {
        FetchError::NotFound { .. } => score.with_detail("error", format!("Repository not found: {err}")),
        FetchError::RateLimited { .. } | FetchError::Auth { .. } => score
            .with_detail(
                "error",
                format!("GitHub rate limit or access denied: {err}. Consider setting a GitHub token."),
            )
            .with_detail("rate_limited", true),
        _ => score.with_detail("error", format!("Could not access repository: {err}")),
    }
}

#[async_trait]
impl modelaudit_core::Metric for Reviewedness {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn compute(&self, model: &ModelDescriptor) -> Result<Score, MetricError> {
        info!(model = model.model.url(), "Computing reviewedness");

        let Some(url) = self.locate_repository(model).await else {
            warn!("No GitHub repository found in model card or code URL");
            return Ok(Score::degraded(-1.0, "No GitHub repository found in model card or code URL"));
        };
        let Ok(HubUrl::GitHub { owner, repo, .. }) = HubUrl::parse(&url) else {
            warn!(url = %url, "Could not parse GitHub URL");
            return Ok(Score::degraded(-1.0, "Could not parse GitHub URL").with_detail("url", url));
        };
        info!(owner = %owner, repo = %repo, "Evaluating reviewedness");

        let view = match self.source.open_repository(&url).await {
            Ok(view) => view,
            Err(e) => {
                warn!(url = %url, error = %e, "Repository unavailable");
                return Ok(access_failure(&url, &e));
            }
        };
        let loc_total = tokio::task::spawn_blocking(move || count_loc(view.root()))
            .await
            .map_err(|e| MetricError::computation(Self::NAME, format!("LOC count aborted: {e}")))?;
        debug!(loc_total, "Counted lines of code");

        if loc_total == 0 {
            return Ok(Score::new(0.0)
                .with_detail("loc_total", 0)
                .with_detail("loc_reviewed", 0)
                .with_detail("reason", "No code found in repository"));
        }

        let pulls = match self.source.pull_requests(&owner, &repo).await {
            Ok(pulls) => pulls,
            Err(e) => {
                warn!(error = %e, "Pull requests unavailable");
                return Ok(Score::degraded(-1.0, format!("Could not fetch pull requests: {e}"))
                    .with_detail("loc_total", loc_total)
                    .with_detail("url", url));
            }
        };

        let mut loc_reviewed: u64 = 0;
        let mut merged = 0usize;
        let mut reviewed = Vec::new();
        for pr in pulls.iter().filter(|pr| pr.is_merged()) {
            merged += 1;
            let additions = match pr.additions {
                Some(n) => n,
                None => match self.source.pull_request(&owner, &repo, pr.number).await {
                    Ok(detail) => detail.additions.unwrap_or(0),
                    Err(e) => {
                        warn!(pr = pr.number, error = %e, "Pull request detail unavailable");
                        0
                    }
                },
            };
            match self.source.reviews(&owner, &repo, pr.number).await {
                Ok(reviews) if reviews.iter().any(Review::is_substantive) => {
                    debug!(pr = pr.number, additions, "Reviewed pull request");
                    loc_reviewed += additions;
                    reviewed.push(json!({"pr_number": pr.number, "additions": additions}));
                }
                Ok(_) => {}
                Err(e) => warn!(pr = pr.number, error = %e, "Reviews unavailable"),
            }
        }

        let value = (loc_reviewed as f64 / loc_total as f64).min(1.0);
        info!(
            owner = %owner,
            repo = %repo,
            merged,
            reviewed = reviewed.len(),
            loc_reviewed,
            loc_total,
            value,
            "Reviewedness computed"
        );

        Ok(Score::new(value)
            .with_detail("loc_total", loc_total)
            .with_detail("loc_reviewed", loc_reviewed)
            .with_detail("total_merged_prs", merged)
            .with_detail("reviewed_prs", reviewed.len())
            .with_detail("reviewed_pr_details", reviewed))
    }
}
