//! Hugging Face hub client: repository metadata, file listings, and allow-list
//! snapshots materialized into a temporary directory.

use super::http::{ApiClient, Download, bearer};
use crate::config::HubConfig;
use crate::error::FetchError;
use crate::resources::{Metadata, RepoView};
use crate::urls::HfRepoKind;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::Value;
use tracing::{debug, info};

/// Files fetched for a model when the caller gives no allow list.
pub const MODEL_ALLOW: &[&str] = &[
    "README.md",
    "README.*",
    "config.json",
    "model_index.json",
    "tokenizer.*",
    "vocab.*",
    "pytorch_model.bin",
    "tf_model.h5",
];

/// Files fetched for a dataset when the caller gives no allow list.
pub const DATASET_ALLOW: &[&str] = &["README.md", "README.*", "dataset_info.json", "data/*"];

/// One file in a hub repository listing.
#[derive(Debug, Clone, PartialEq)]
pub struct HubFile {
    pub path: String,
    pub size: u64,
}

#[derive(Clone)]
pub struct HfClient {
    api: ApiClient,
    base_url: String,
    token: Option<String>,
    max_model_file_bytes: u64,
    max_dataset_file_bytes: u64,
}

impl HfClient {
    pub fn new(api: ApiClient, config: &HubConfig) -> Self {
        Self {
            api,
            base_url: config.huggingface_url.trim_end_matches('/').to_string(),
            token: config.hf_token(),
            max_model_file_bytes: config.max_model_file_bytes,
            max_dataset_file_bytes: config.max_dataset_file_bytes,
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        bearer(self.token.as_deref())
    }

    /// Metadata from `/api/{models|datasets|spaces}/{id}`.
    ///
    /// The hub does not report contributors, so `num_contributors` is set to
    /// null to keep the shape uniform with the forge adapters.
    pub async fn metadata(&self, kind: HfRepoKind, repo_id: &str) -> Result<Metadata, FetchError> {
        let url = format!("{}/api/{}/{}", self.base_url, kind.api_segment(), repo_id);
        let data = self.api.get_json(&url, &self.headers()).await?;
        let Value::Object(mut map) = data else {
            return Err(FetchError::schema(
                url,
                format!("expected an object for {} metadata", kind.api_segment()),
            ));
        };
        map.insert("num_contributors".into(), Value::Null);
        Ok(map)
    }

    /// Recursive file listing at a revision.
    pub async fn list_files(
        &self,
        kind: HfRepoKind,
        repo_id: &str,
        revision: &str,
    ) -> Result<Vec<HubFile>, FetchError> {
        let url = format!(
            "{}/api/{}/{}/tree/{}?recursive=true",
            self.base_url,
            kind.api_segment(),
            repo_id,
            urlencoding::encode(revision)
        );
        let data = self.api.get_json(&url, &self.headers()).await?;
        let entries = data
            .as_array()
            .ok_or_else(|| FetchError::schema(&url, "expected an array for tree listing"))?;
        Ok(entries
            .iter()
            .filter(|e| e.get("type").and_then(Value::as_str) == Some("file"))
            .filter_map(|e| {
                let path = e.get("path")?.as_str()?.to_string();
                // LFS pointers report the real object size separately.
                let size = e
                    .pointer("/lfs/size")
                    .and_then(Value::as_u64)
                    .or_else(|| e.get("size").and_then(Value::as_u64))
                    .unwrap_or(0);
                Some(HubFile { path, size })
            })
            .collect())
    }

    fn resolve_url(&self, kind: HfRepoKind, repo_id: &str, revision: &str, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        format!(
            "{}/{}{}/resolve/{}/{}",
            self.base_url,
            kind.url_prefix(),
            repo_id,
            urlencoding::encode(revision),
            encoded.join("/")
        )
    }

    /// Default allow list and size limit for a repository kind.
    pub fn defaults_for(&self, kind: HfRepoKind) -> (&'static [&'static str], u64) {
        match kind {
            HfRepoKind::Model => (MODEL_ALLOW, self.max_model_file_bytes),
            HfRepoKind::Dataset => (DATASET_ALLOW, self.max_dataset_file_bytes),
            HfRepoKind::Space => (super::SPACE_ALLOW, self.max_dataset_file_bytes),
        }
    }

    /// Download every file matching the allow list into a temporary directory.
    ///
    /// Files larger than the kind's byte limit are skipped.
    pub async fn snapshot(
        &self,
        kind: HfRepoKind,
        repo_id: &str,
        revision: Option<&str>,
        allow_patterns: Option<&[String]>,
    ) -> Result<RepoView, FetchError> {
        let revision = revision.unwrap_or("main");
        let (default_allow, max_bytes) = self.defaults_for(kind);
        let patterns: Vec<String> = match allow_patterns {
            Some(p) if !p.is_empty() => p.to_vec(),
            _ => default_allow.iter().map(|s| s.to_string()).collect(),
        };
        let allow = build_allow_set(&patterns)?;

        let listing = self.list_files(kind, repo_id, revision).await?;
        let dir = tempfile::Builder::new().prefix("modelaudit_").tempdir()?;
        let mut fetched = 0usize;
        let mut skipped = 0usize;

        for file in listing.iter().filter(|f| allow.is_match(&f.path)) {
            if file.size > max_bytes {
                skipped += 1;
                continue;
            }
            let dest = dir.path().join(&file.path);
            let url = self.resolve_url(kind, repo_id, revision, &file.path);
            match self.api.download(&url, &self.headers(), &dest, max_bytes).await? {
                Download::Written(bytes) => {
                    debug!(repo = %repo_id, path = %file.path, bytes, "Fetched file");
                    fetched += 1;
                }
                Download::TooLarge => skipped += 1,
            }
        }

        info!(
            repo = %repo_id,
            kind = kind.api_segment(),
            fetched,
            skipped,
            "Snapshot materialized"
        );
        Ok(RepoView::owned(dir))
    }
}

/// Allow patterns follow shell-glob rules where `*` may cross directories.
pub fn build_allow_set(patterns: &[String]) -> Result<GlobSet, FetchError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| FetchError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| FetchError::Pattern {
        pattern: patterns.join(","),
        message: e.to_string(),
    })
}
