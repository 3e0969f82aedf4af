//! Resource handles for the artifacts of one model package: the model itself,
//! an optional dataset, and an optional codebase.

pub mod code;
pub mod dataset;
pub mod local;
pub mod model;
mod remote;
pub mod repo_view;

pub use code::CodeResource;
pub use dataset::DatasetResource;
pub use local::LocalResource;
pub use model::ModelResource;
pub use repo_view::RepoView;

use crate::error::FetchError;
use async_trait::async_trait;
use std::sync::Arc;

/// Key/value metadata as reported by a hub or forge.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Model,
    Dataset,
    Code,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Model => write!(f, "model"),
            ResourceKind::Dataset => write!(f, "dataset"),
            ResourceKind::Code => write!(f, "code"),
        }
    }
}

/// A remote (or local) artifact metrics can inspect.
#[async_trait]
pub trait Resource: Send + Sync {
    fn url(&self) -> &str;

    fn kind(&self) -> ResourceKind;

    /// Repository metadata. Implementations memoize successful fetches.
    async fn fetch_metadata(&self) -> Result<Arc<Metadata>, FetchError>;

    /// Materialize files matching `allow_patterns` (or the resource's default
    /// allow list) and return a view over them.
    async fn open_files(&self, allow_patterns: Option<&[String]>) -> Result<RepoView, FetchError>;
}

/// The resources of one evaluation. Cloning is cheap.
#[derive(Clone)]
pub struct ModelDescriptor {
    pub model: Arc<dyn Resource>,
    pub dataset: Option<Arc<dyn Resource>>,
    pub code: Option<Arc<dyn Resource>>,
}

impl ModelDescriptor {
    pub fn new(model: Arc<dyn Resource>) -> Self {
        Self {
            model,
            dataset: None,
            code: None,
        }
    }

    pub fn with_dataset(mut self, dataset: Arc<dyn Resource>) -> Self {
        self.dataset = Some(dataset);
        self
    }

    pub fn with_code(mut self, code: Arc<dyn Resource>) -> Self {
        self.code = Some(code);
        self
    }

    /// Short display name of the model repository.
    pub fn name(&self) -> String {
        crate::urls::display_name(self.model.url())
    }
}

impl std::fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("model", &self.model.url())
            .field("dataset", &self.dataset.as_ref().map(|d| d.url()))
            .field("code", &self.code.as_ref().map(|c| c.url()))
            .finish()
    }
}

/// Shorthand for wrapping a pattern slice into owned strings.
pub fn patterns(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
