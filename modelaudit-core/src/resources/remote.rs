//! Shared plumbing for hub-backed resources: URL dispatch and memoized
//! metadata.

use super::{Metadata, RepoView};
use crate::adapters::Hub;
use crate::error::FetchError;
use crate::urls::{HfRepoKind, HubUrl};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

pub(crate) struct Remote {
    url: String,
    parsed: Option<HubUrl>,
    hub: Arc<Hub>,
    metadata: OnceCell<Arc<Metadata>>,
}

impl Remote {
    /// `accept` decides which parsed URLs this resource kind supports.
    pub(crate) fn new(url: &str, hub: Arc<Hub>, accept: impl Fn(&HubUrl) -> bool) -> Self {
        let parsed = HubUrl::parse(url).ok().filter(|u| accept(u));
        Self {
            url: url.trim().to_string(),
            parsed,
            hub,
            metadata: OnceCell::new(),
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn parsed(&self) -> Option<&HubUrl> {
        self.parsed.as_ref()
    }

    fn target(&self) -> Result<&HubUrl, FetchError> {
        self.parsed
            .as_ref()
            .ok_or_else(|| FetchError::unsupported(&self.url))
    }

    /// Fetch once; concurrent callers wait on the same request. Errors are
    /// not cached, so a later call tries again.
    pub(crate) async fn metadata(&self) -> Result<Arc<Metadata>, FetchError> {
        self.metadata
            .get_or_try_init(|| async {
                debug!(url = %self.url, "Fetching metadata");
                let map = match self.target()? {
                    HubUrl::HuggingFace { kind, repo_id, .. } => {
                        self.hub.hf.metadata(*kind, repo_id).await?
                    }
                    HubUrl::GitHub { owner, repo, .. } => {
                        self.hub.github.metadata(owner, repo).await?
                    }
                    HubUrl::GitLab { path, .. } => self.hub.gitlab.metadata(path).await?,
                };
                Ok::<_, FetchError>(Arc::new(map))
            })
            .await
            .cloned()
    }

    pub(crate) async fn open(&self, allow_patterns: Option<&[String]>) -> Result<RepoView, FetchError> {
        match self.target()? {
            HubUrl::HuggingFace {
                kind: kind @ (HfRepoKind::Model | HfRepoKind::Dataset),
                repo_id,
                revision,
            } => {
                self.hub
                    .hf
                    .snapshot(*kind, repo_id, revision.as_deref(), allow_patterns)
                    .await
            }
            _ => self.hub.codebases.open(&self.url, allow_patterns).await,
        }
    }
}
