//! Adapters for the external services that hold model artifacts: the Hugging
//! Face hub, GitHub, and GitLab.

pub mod codebase;
pub mod github;
pub mod gitlab;
pub mod http;
pub mod huggingface;

pub use codebase::{CodebaseOpener, SPACE_ALLOW};
pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use http::ApiClient;
pub use huggingface::{DATASET_ALLOW, HfClient, MODEL_ALLOW};

use crate::config::{HubConfig, RetryConfig};
use crate::error::FetchError;
use std::future::Future;
use std::time::Duration;

/// Every adapter a resource may need, sharing one HTTP connection pool.
#[derive(Clone)]
pub struct Hub {
    pub hf: HfClient,
    pub github: GitHubClient,
    pub gitlab: GitLabClient,
    pub codebases: CodebaseOpener,
    pub config: HubConfig,
}

impl Hub {
    pub fn new(config: HubConfig, retry: RetryConfig) -> Result<Self, FetchError> {
        let api = ApiClient::new(Duration::from_secs(config.request_timeout_secs), retry)?;
        let hf = HfClient::new(api.clone(), &config);
        Ok(Self {
            github: GitHubClient::new(api.clone(), &config),
            gitlab: GitLabClient::new(api, &config),
            codebases: CodebaseOpener::new(hf.clone(), &config),
            hf,
            config,
        })
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("huggingface_url", &self.config.huggingface_url)
            .field("github_api_url", &self.config.github_api_url)
            .field("gitlab_api_url", &self.config.gitlab_api_url)
            .finish()
    }
}

/// Execute an async operation with exponential backoff retry on transient errors.
///
/// Retries network failures, 5xx responses and rate limiting (respecting the
/// server's `Retry-After`). Everything else returns immediately.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T, FetchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !e.is_retryable() || attempt >= config.max_retries {
                    return Err(e);
                }
                let backoff_ms = compute_backoff(config, attempt, &e);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    backoff_ms = backoff_ms,
                    error = %e,
                    "Retrying after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
        }
    }
}

/// Compute backoff delay, respecting rate limit retry-after values.
fn compute_backoff(config: &RetryConfig, attempt: u32, err: &FetchError) -> u64 {
    let computed = compute_exponential_backoff(config, attempt);
    if let FetchError::RateLimited {
        retry_after_secs, ..
    } = err
    {
        return (retry_after_secs * 1000).max(computed);
    }
    computed
}

fn compute_exponential_backoff(config: &RetryConfig, attempt: u32) -> u64 {
    let base = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped = base.min(config.max_backoff_ms as f64) as u64;
    if config.jitter {
        // Up to 25% extra.
        capped + (capped as f64 * 0.25 * jitter_fraction()) as u64
    } else {
        capped
    }
}

fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 1,
            backoff_multiplier: 2.0,
            max_backoff_ms: 5,
            jitter: false,
        }
    }

    #[test]
    fn test_exponential_backoff() {
        let config = RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 1000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 3000,
            jitter: false,
        };
        assert_eq!(compute_exponential_backoff(&config, 0), 1000);
        assert_eq!(compute_exponential_backoff(&config, 1), 2000);
        assert_eq!(compute_exponential_backoff(&config, 2), 3000);
    }

    #[test]
    fn test_rate_limit_uses_server_value() {
        let config = RetryConfig {
            jitter: false,
            ..RetryConfig::default()
        };
        let err = FetchError::RateLimited {
            url: "u".into(),
            retry_after_secs: 30,
        };
        assert_eq!(compute_backoff(&config, 0, &err), 30_000);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_server_error() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_retry(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FetchError::Server {
                        url: "u".into(),
                        status: 503,
                    })
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_retry(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FetchError::NotFound { url: "u".into() }) }
        })
        .await;
        assert!(matches!(result, Err(FetchError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_retry(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(FetchError::Network {
                    url: "u".into(),
                    message: "reset".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
