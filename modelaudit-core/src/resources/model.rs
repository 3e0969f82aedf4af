use super::remote::Remote;
use super::{Metadata, RepoView, Resource, ResourceKind};
use crate::adapters::Hub;
use crate::error::FetchError;
use crate::urls::{HfRepoKind, HubUrl};
use async_trait::async_trait;
use std::sync::Arc;

/// A Hugging Face model repository.
pub struct ModelResource {
    remote: Remote,
}

impl ModelResource {
    pub fn new(url: &str, hub: Arc<Hub>) -> Self {
        Self {
            remote: Remote::new(url, hub, |u| {
                matches!(
                    u,
                    HubUrl::HuggingFace {
                        kind: HfRepoKind::Model,
                        ..
                    }
                )
            }),
        }
    }

    /// `owner/name` id on the hub, when the URL was recognized.
    pub fn repo_id(&self) -> Option<&str> {
        match self.remote.parsed() {
            Some(HubUrl::HuggingFace { repo_id, .. }) => Some(repo_id),
            _ => None,
        }
    }
}

#[async_trait]
impl Resource for ModelResource {
    fn url(&self) -> &str {
        self.remote.url()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Model
    }

    async fn fetch_metadata(&self) -> Result<Arc<Metadata>, FetchError> {
        self.remote.metadata().await
    }

    async fn open_files(&self, allow_patterns: Option<&[String]>) -> Result<RepoView, FetchError> {
        self.remote.open(allow_patterns).await
    }
}
