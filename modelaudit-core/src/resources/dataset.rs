use super::remote::Remote;
use super::{Metadata, RepoView, Resource, ResourceKind};
use crate::adapters::Hub;
use crate::error::FetchError;
use crate::urls::{HfRepoKind, HubUrl};
use async_trait::async_trait;
use std::sync::Arc;

/// A dataset hosted as a Hugging Face dataset or a GitHub repository.
pub struct DatasetResource {
    remote: Remote,
}

impl DatasetResource {
    pub fn new(url: &str, hub: Arc<Hub>) -> Self {
        Self {
            remote: Remote::new(url, hub, |u| {
                matches!(
                    u,
                    HubUrl::HuggingFace {
                        kind: HfRepoKind::Dataset,
                        ..
                    } | HubUrl::GitHub { .. }
                )
            }),
        }
    }
}

#[async_trait]
impl Resource for DatasetResource {
    fn url(&self) -> &str {
        self.remote.url()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Dataset
    }

    async fn fetch_metadata(&self) -> Result<Arc<Metadata>, FetchError> {
        self.remote.metadata().await
    }

    async fn open_files(&self, allow_patterns: Option<&[String]>) -> Result<RepoView, FetchError> {
        self.remote.open(allow_patterns).await
    }
}
