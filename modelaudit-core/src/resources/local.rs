use super::{Metadata, RepoView, Resource, ResourceKind};
use crate::error::FetchError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// A resource backed by in-memory metadata and an optional local directory.
///
/// Used for offline evaluation of checked-out repositories and in tests.
#[derive(Debug, Clone)]
pub struct LocalResource {
    url: String,
    kind: ResourceKind,
    metadata: Option<Arc<Metadata>>,
    root: Option<PathBuf>,
}

impl LocalResource {
    pub fn new(url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            url: url.into(),
            kind,
            metadata: Some(Arc::new(Metadata::new())),
            root: None,
        }
    }

    /// A resource whose metadata and files are both unreachable.
    pub fn unavailable(url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            metadata: None,
            ..Self::new(url, kind)
        }
    }

    /// Metadata from a JSON object. Non-object values yield empty metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        let map = match metadata {
            Value::Object(map) => map,
            _ => Metadata::new(),
        };
        self.metadata = Some(Arc::new(map));
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }
}

#[async_trait]
impl Resource for LocalResource {
    fn url(&self) -> &str {
        &self.url
    }

    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn fetch_metadata(&self) -> Result<Arc<Metadata>, FetchError> {
        self.metadata.clone().ok_or_else(|| FetchError::NotFound {
            url: self.url.clone(),
        })
    }

    async fn open_files(&self, _allow_patterns: Option<&[String]>) -> Result<RepoView, FetchError> {
        match &self.root {
            Some(root) if root.is_dir() => Ok(RepoView::borrowed(root.clone())),
            _ => Err(FetchError::NotFound {
                url: self.url.clone(),
            }),
        }
    }
}
