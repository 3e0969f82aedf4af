//! Recognition of model hub and git forge URLs.

use crate::error::FetchError;
use url::Url;

/// Kind of Hugging Face repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HfRepoKind {
    Model,
    Dataset,
    Space,
}

impl HfRepoKind {
    /// Path segment used by the hub API (`/api/{segment}/{id}`).
    pub fn api_segment(self) -> &'static str {
        match self {
            HfRepoKind::Model => "models",
            HfRepoKind::Dataset => "datasets",
            HfRepoKind::Space => "spaces",
        }
    }

    /// Prefix used in web and file-resolve URLs. Models have none.
    pub fn url_prefix(self) -> &'static str {
        match self {
            HfRepoKind::Model => "",
            HfRepoKind::Dataset => "datasets/",
            HfRepoKind::Space => "spaces/",
        }
    }
}

/// A parsed repository location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubUrl {
    HuggingFace {
        kind: HfRepoKind,
        repo_id: String,
        revision: Option<String>,
    },
    GitHub {
        owner: String,
        repo: String,
        revision: Option<String>,
    },
    GitLab {
        /// Full namespace path, e.g. `group/subgroup/project`.
        path: String,
        revision: Option<String>,
    },
}

impl HubUrl {
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let url = Url::parse(raw.trim()).map_err(|_| FetchError::unsupported(raw))?;
        let host = url
            .host_str()
            .map(|h| h.to_ascii_lowercase())
            .ok_or_else(|| FetchError::unsupported(raw))?;
        let parts: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        if host == "huggingface.co" || host.ends_with(".huggingface.co") {
            let (kind, rest) = match parts.first() {
                Some(&"datasets") => (HfRepoKind::Dataset, &parts[1..]),
                Some(&"spaces") => (HfRepoKind::Space, &parts[1..]),
                _ => (HfRepoKind::Model, &parts[..]),
            };
            let repo_id = match rest {
                [owner, name, ..] if !is_rev_marker(name) => format!("{owner}/{name}"),
                // Legacy single-segment model ids such as `bert-base-uncased`.
                [name, ..] if kind == HfRepoKind::Model => (*name).to_string(),
                _ => return Err(FetchError::unsupported(raw)),
            };
            return Ok(HubUrl::HuggingFace {
                kind,
                repo_id,
                revision: extract_revision(&parts),
            });
        }

        if host == "github.com" || host.ends_with(".github.com") {
            return match parts.as_slice() {
                [owner, repo, ..] => Ok(HubUrl::GitHub {
                    owner: (*owner).to_string(),
                    repo: repo.trim_end_matches(".git").to_string(),
                    revision: extract_revision(&parts),
                }),
                _ => Err(FetchError::unsupported(raw)),
            };
        }

        if host == "gitlab.com" || host.ends_with(".gitlab.com") {
            // Everything before GitLab's `/-/` separator is the project path.
            let path: Vec<&str> = parts.iter().copied().take_while(|p| *p != "-").collect();
            if path.len() < 2 {
                return Err(FetchError::unsupported(raw));
            }
            let path = path.join("/");
            return Ok(HubUrl::GitLab {
                path: path.trim_end_matches(".git").to_string(),
                revision: extract_revision(&parts),
            });
        }

        Err(FetchError::unsupported(raw))
    }

    /// Short repository name (last path component of the id).
    pub fn name(&self) -> &str {
        match self {
            HubUrl::HuggingFace { repo_id, .. } => {
                repo_id.rsplit('/').next().unwrap_or(repo_id)
            }
            HubUrl::GitHub { repo, .. } => repo,
            HubUrl::GitLab { path, .. } => path.rsplit('/').next().unwrap_or(path),
        }
    }

    pub fn revision(&self) -> Option<&str> {
        match self {
            HubUrl::HuggingFace { revision, .. }
            | HubUrl::GitHub { revision, .. }
            | HubUrl::GitLab { revision, .. } => revision.as_deref(),
        }
    }
}

fn is_rev_marker(segment: &str) -> bool {
    matches!(segment, "tree" | "blob" | "resolve")
}

/// The segment after the first `tree`, `blob` or `resolve` marker.
fn extract_revision(parts: &[&str]) -> Option<String> {
    parts
        .windows(2)
        .find(|w| is_rev_marker(w[0]))
        .map(|w| w[1].to_string())
}

/// Best-effort short name for any URL, used to label output records.
pub fn display_name(raw: &str) -> String {
    match HubUrl::parse(raw) {
        Ok(hub) => hub.name().to_string(),
        Err(_) => raw
            .trim()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(raw)
            .to_string(),
    }
}
