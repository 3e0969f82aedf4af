//! GitHub REST client: repository metadata, contributors, and pull request
//! review data.

use super::http::{ApiClient, bearer};
use crate::config::HubConfig;
use crate::error::FetchError;
use crate::resources::Metadata;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const PER_PAGE: usize = 100;

/// A pull request as listed by `/pulls`. Additions are only present on the
/// detail endpoint, so they are optional here.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub additions: Option<u64>,
    #[serde(default)]
    pub deletions: Option<u64>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.state == "closed" && self.merged_at.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub state: String,
}

impl Review {
    /// Approvals and change requests count as a real review; comments do not.
    pub fn is_substantive(&self) -> bool {
        matches!(
            self.state.to_ascii_uppercase().as_str(),
            "APPROVED" | "CHANGES_REQUESTED"
        )
    }
}

#[derive(Clone)]
pub struct GitHubClient {
    api: ApiClient,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api: ApiClient, config: &HubConfig) -> Self {
        Self {
            api,
            base_url: config.github_api_url.trim_end_matches('/').to_string(),
            token: config.github_token(),
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("Accept", "application/vnd.github+json".to_string())];
        headers.extend(bearer(self.token.as_deref()));
        headers
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    async fn get(&self, path: &str) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        self.api.get_json(&url, &self.headers()).await
    }

    /// Repository metadata with a `num_contributors` field added. A failure
    /// to count contributors leaves the field null.
    pub async fn metadata(&self, owner: &str, repo: &str) -> Result<Metadata, FetchError> {
        let path = format!("/repos/{owner}/{repo}");
        let Value::Object(mut map) = self.get(&path).await? else {
            return Err(FetchError::schema(
                format!("{}{path}", self.base_url),
                "expected an object for repository metadata",
            ));
        };
        let contributors = match self.contributor_count(owner, repo).await {
            Ok(n) => n.map(Value::from).unwrap_or(Value::Null),
            Err(e) => {
                debug!(owner, repo, error = %e, "Contributor count unavailable");
                Value::Null
            }
        };
        map.insert("num_contributors".into(), contributors);
        Ok(map)
    }

    /// Number of contributors on the first page (at most 100).
    pub async fn contributor_count(&self, owner: &str, repo: &str) -> Result<Option<u64>, FetchError> {
        let data = self
            .get(&format!("/repos/{owner}/{repo}/contributors?per_page={PER_PAGE}"))
            .await?;
        Ok(data.as_array().map(|a| a.len() as u64))
    }

    /// All pull requests in any state, following pagination up to `max_pages`.
    pub async fn pull_requests(
        &self,
        owner: &str,
        repo: &str,
        max_pages: usize,
    ) -> Result<Vec<PullRequest>, FetchError> {
        let mut all = Vec::new();
        for page in 1..=max_pages.max(1) {
            let path =
                format!("/repos/{owner}/{repo}/pulls?state=all&per_page={PER_PAGE}&page={page}");
            let url = format!("{}{path}", self.base_url);
            let data = self.get(&path).await?;
            let batch: Vec<PullRequest> = serde_json::from_value(data)
                .map_err(|e| FetchError::schema(url, format!("pull request list: {e}")))?;
            let len = batch.len();
            all.extend(batch);
            if len < PER_PAGE {
                break;
            }
        }
        debug!(owner, repo, count = all.len(), "Listed pull requests");
        Ok(all)
    }

    pub async fn pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest, FetchError> {
        let path = format!("/repos/{owner}/{repo}/pulls/{number}");
        let url = format!("{}{path}", self.base_url);
        let data = self.get(&path).await?;
        serde_json::from_value(data).map_err(|e| FetchError::schema(url, e.to_string()))
    }

    pub async fn reviews(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Review>, FetchError> {
        let path = format!("/repos/{owner}/{repo}/pulls/{number}/reviews?per_page={PER_PAGE}");
        let url = format!("{}{path}", self.base_url);
        let data = self.get(&path).await?;
        serde_json::from_value(data).map_err(|e| FetchError::schema(url, e.to_string()))
    }
}
