use super::remote::Remote;
use super::{Metadata, RepoView, Resource, ResourceKind};
use crate::adapters::Hub;
use crate::error::FetchError;
use crate::urls::{HfRepoKind, HubUrl};
use async_trait::async_trait;
use std::sync::Arc;

/// Source code: a GitHub or GitLab repository, or a Hugging Face space.
pub struct CodeResource {
    remote: Remote,
}

impl CodeResource {
    pub fn new(url: &str, hub: Arc<Hub>) -> Self {
        Self {
            remote: Remote::new(url, hub, |u| {
                !matches!(
                    u,
                    HubUrl::HuggingFace {
                        kind: HfRepoKind::Model | HfRepoKind::Dataset,
                        ..
                    }
                )
            }),
        }
    }

    pub fn is_github(&self) -> bool {
        matches!(self.remote.parsed(), Some(HubUrl::GitHub { .. }))
    }
}

#[async_trait]
impl Resource for CodeResource {
    fn url(&self) -> &str {
        self.remote.url()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Code
    }

    async fn fetch_metadata(&self) -> Result<Arc<Metadata>, FetchError> {
        self.remote.metadata().await
    }

    async fn open_files(&self, allow_patterns: Option<&[String]>) -> Result<RepoView, FetchError> {
        self.remote.open(allow_patterns).await
    }
}
