//! Materializes source repositories: Hugging Face spaces through the hub
//! snapshot, GitHub and GitLab through a shallow git clone.

use super::huggingface::HfClient;
use crate::config::HubConfig;
use crate::error::FetchError;
use crate::resources::RepoView;
use crate::urls::{HfRepoKind, HubUrl};
use std::path::Path;
use tracing::{debug, info};

/// Files fetched for a Hugging Face space when the caller gives no allow list.
pub const SPACE_ALLOW: &[&str] = &["app.*", "requirements*.txt", "runtime.txt", "*.py", "README.*"];

#[derive(Clone)]
pub struct CodebaseOpener {
    hf: HfClient,
    github_token: Option<String>,
    gitlab_token: Option<String>,
    clone_depth: i32,
}

impl CodebaseOpener {
    pub fn new(hf: HfClient, config: &HubConfig) -> Self {
        Self {
            hf,
            github_token: config.github_token(),
            gitlab_token: config.gitlab_token(),
            clone_depth: config.clone_depth,
        }
    }

    /// Open the codebase behind `url`.
    ///
    /// Allow patterns only narrow hub snapshots; git clones always contain the
    /// whole tree.
    pub async fn open(&self, url: &str, allow_patterns: Option<&[String]>) -> Result<RepoView, FetchError> {
        match HubUrl::parse(url)? {
            HubUrl::HuggingFace {
                kind: HfRepoKind::Space,
                repo_id,
                revision,
            } => {
                self.hf
                    .snapshot(HfRepoKind::Space, &repo_id, revision.as_deref(), allow_patterns)
                    .await
            }
            HubUrl::GitHub {
                owner,
                repo,
                revision,
            } => {
                let remote = format!("https://github.com/{owner}/{repo}.git");
                let creds = self
                    .github_token
                    .clone()
                    .map(|t| ("x-access-token".to_string(), t));
                self.clone_remote(remote, revision, creds).await
            }
            HubUrl::GitLab { path, revision } => {
                let remote = format!("https://gitlab.com/{path}.git");
                let creds = self.gitlab_token.clone().map(|t| ("oauth2".to_string(), t));
                self.clone_remote(remote, revision, creds).await
            }
            HubUrl::HuggingFace { .. } => Err(FetchError::unsupported(url)),
        }
    }

    async fn clone_remote(
        &self,
        remote: String,
        revision: Option<String>,
        creds: Option<(String, String)>,
    ) -> Result<RepoView, FetchError> {
        let depth = self.clone_depth;
        let dir = tempfile::Builder::new().prefix("modelaudit_").tempdir()?;
        let dest = dir.path().join("repo");
        let dest_for_task = dest.clone();
        let url = remote.clone();
        tokio::task::spawn_blocking(move || {
            clone_repo(&remote, revision.as_deref(), creds, depth, &dest_for_task)
        })
        .await
        .map_err(|e| FetchError::Git {
            url: url.clone(),
            message: format!("clone task failed: {e}"),
        })??;
        info!(url = %url, "Cloned repository");
        Ok(RepoView::owned_at(dir, dest))
    }
}

/// Clone `remote` into `dest`. A depth of 0 fetches full history.
///
/// When a revision is given, it is first tried as a branch of a shallow
/// clone; tags and commits fall back to a full clone plus checkout.
pub fn clone_repo(
    remote: &str,
    revision: Option<&str>,
    creds: Option<(String, String)>,
    depth: i32,
    dest: &Path,
) -> Result<(), FetchError> {
    let git_err = |e: git2::Error| FetchError::Git {
        url: remote.to_string(),
        message: e.message().to_string(),
    };

    let attempt = build_clone(creds.clone(), depth, revision).clone(remote, dest);
    let repo = match (attempt, revision) {
        (Ok(repo), _) => repo,
        (Err(e), Some(rev)) => {
            debug!(remote, rev, error = %e, "Branch clone failed, trying full clone");
            if dest.exists() {
                std::fs::remove_dir_all(dest)?;
            }
            let repo = build_clone(creds, 0, None)
                .clone(remote, dest)
                .map_err(git_err)?;
            checkout(&repo, rev).map_err(git_err)?;
            repo
        }
        (Err(e), None) => return Err(classify_git_error(remote, e)),
    };
    debug!(remote, path = %repo.path().display(), "Clone complete");
    Ok(())
}

fn build_clone(creds: Option<(String, String)>, depth: i32, branch: Option<&str>) -> git2::build::RepoBuilder<'static> {
    let mut callbacks = git2::RemoteCallbacks::new();
    if let Some((user, token)) = creds {
        callbacks.credentials(move |_url, _username, _allowed| {
            git2::Cred::userpass_plaintext(&user, &token)
        });
    }
    let mut fetch = git2::FetchOptions::new();
    fetch.remote_callbacks(callbacks);
    if depth > 0 {
        fetch.depth(depth);
    }
    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch);
    if let Some(branch) = branch {
        builder.branch(branch);
    }
    builder
}

fn checkout(repo: &git2::Repository, rev: &str) -> Result<(), git2::Error> {
    let object = repo.revparse_single(rev)?;
    repo.checkout_tree(&object, Some(git2::build::CheckoutBuilder::new().force()))?;
    repo.set_head_detached(object.id())
}

fn classify_git_error(remote: &str, e: git2::Error) -> FetchError {
    let message = e.message().to_string();
    match e.class() {
        git2::ErrorClass::Http if message.contains("404") => FetchError::NotFound {
            url: remote.to_string(),
        },
        git2::ErrorClass::Http | git2::ErrorClass::Net | git2::ErrorClass::Ssl => {
            FetchError::Network {
                url: remote.to_string(),
                message,
            }
        }
        _ if e.code() == git2::ErrorCode::Auth => FetchError::Auth {
            url: remote.to_string(),
            status: 401,
        },
        _ => FetchError::Git {
            url: remote.to_string(),
            message,
        },
    }
}
