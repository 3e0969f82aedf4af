//! Configuration system for modelaudit.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! explicit/workspace config file -> environment -> overrides. Secrets such as
//! hub tokens are read from the environment, which `dotenvy` may populate from
//! a `config.env` file first.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub engine: EngineConfig,
    pub scoring: ScoringConfig,
    pub hub: HubConfig,
    pub retry: RetryConfig,
    pub rater: RaterConfig,
}

/// Metrics engine scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Run metrics concurrently. `false` runs them one by one in registry order.
    pub parallel: bool,
    /// Maximum metrics in flight. 0 means the host's available parallelism.
    pub max_concurrent: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_concurrent: 0,
        }
    }
}

impl EngineConfig {
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Concrete semaphore size.
    pub fn effective_concurrency(&self) -> usize {
        if self.max_concurrent > 0 {
            self.max_concurrent
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }
}

/// How the composite score treats weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightNormalization {
    /// Weighted sum as is.
    #[default]
    Absolute,
    /// Weighted sum divided by the sum of weights that were applied.
    AppliedWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: BTreeMap<String, f64>,
    pub normalization: WeightNormalization,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: reference_weights(),
            normalization: WeightNormalization::Absolute,
        }
    }
}

/// The reference weight table. Sums to 1.0.
pub fn reference_weights() -> BTreeMap<String, f64> {
    [
        ("license", 0.20),
        ("ramp_up_time", 0.15),
        ("bus_factor", 0.15),
        ("dataset_and_code_score", 0.10),
        ("dataset_quality", 0.10),
        ("code_quality", 0.10),
        ("performance_claims", 0.10),
        ("size_score", 0.10),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Hub and forge endpoints plus fetch limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub huggingface_url: String,
    pub github_api_url: String,
    pub gitlab_api_url: String,
    /// Environment variable holding a Hugging Face token.
    pub hf_token_env: String,
    pub github_token_env: String,
    pub gitlab_token_env: String,
    pub request_timeout_secs: u64,
    /// Snapshot files above this size are skipped for models.
    pub max_model_file_bytes: u64,
    /// Snapshot files above this size are skipped for datasets and spaces.
    pub max_dataset_file_bytes: u64,
    /// Depth for shallow git clones.
    pub clone_depth: i32,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            huggingface_url: "https://huggingface.co".into(),
            github_api_url: "https://api.github.com".into(),
            gitlab_api_url: "https://gitlab.com/api/v4".into(),
            hf_token_env: "HF_TOKEN".into(),
            github_token_env: "GITHUB_TOKEN".into(),
            gitlab_token_env: "GITLAB_TOKEN".into(),
            request_timeout_secs: 30,
            max_model_file_bytes: 512 * 1024 * 1024,
            max_dataset_file_bytes: 512 * 1024,
            clone_depth: 1,
        }
    }
}

impl HubConfig {
    pub fn hf_token(&self) -> Option<String> {
        read_token(&self.hf_token_env)
    }

    pub fn github_token(&self) -> Option<String> {
        read_token(&self.github_token_env)
    }

    pub fn gitlab_token(&self) -> Option<String> {
        read_token(&self.gitlab_token_env)
    }
}

fn read_token(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Exponential backoff for transient HTTP failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 1000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 30_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// LLM rater used by the documentation metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaterConfig {
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f64,
}

impl Default for RaterConfig {
    fn default() -> Self {
        Self {
            base_url: "https://genai.rcac.purdue.edu/api".into(),
            model: "llama3.1:latest".into(),
            api_key_env: "PURDUE_GENAI_API_KEY".into(),
            timeout_secs: 30,
            temperature: 0.0,
        }
    }
}

impl RaterConfig {
    pub fn api_key(&self) -> Option<String> {
        read_token(&self.api_key_env)
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Name of the dotenv-style secrets file read before the environment layer.
pub const SECRETS_FILE: &str = "config.env";

/// Load `config.env` from the working directory if present. Variables already
/// set in the process environment win.
pub fn load_secrets_file(dir: Option<&Path>) -> Option<PathBuf> {
    let path = dir.unwrap_or_else(|| Path::new(".")).join(SECRETS_FILE);
    if path.is_file() {
        match dotenvy::from_path(&path) {
            Ok(()) => return Some(path),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to read secrets file"),
        }
    }
    None
}

/// User-level config file location (`~/.config/modelaudit/config.toml` on Linux).
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "modelaudit", "modelaudit")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration.
///
/// Precedence, highest first:
/// 1. Explicit overrides
/// 2. Environment variables (`MODELAUDIT_ENGINE__PARALLEL=false`, ...)
/// 3. Explicit config file, or `modelaudit.toml` in the workspace
/// 4. User config
/// 5. Built-in defaults
pub fn load_config(
    config_file: Option<&Path>,
    workspace: Option<&Path>,
    overrides: Option<&AuditConfig>,
) -> Result<AuditConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AuditConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    match config_file {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            if let Some(ws) = workspace {
                let ws_config = ws.join("modelaudit.toml");
                if ws_config.exists() {
                    figment = figment.merge(Toml::file(&ws_config));
                }
            }
        }
    }

    figment = figment.merge(Env::prefixed("MODELAUDIT_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: AuditConfig = figment.extract().map_err(Box::new)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &AuditConfig) -> Result<(), ConfigError> {
    if let Some((name, w)) = config
        .scoring
        .weights
        .iter()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(ConfigError::Invalid {
            message: format!("weight for '{name}' must be a non-negative number, got {w}"),
        });
    }
    if config.retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::Invalid {
            message: "retry.backoff_multiplier must be >= 1.0".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reference_weights_sum_to_one() {
        let total: f64 = reference_weights().values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(reference_weights().len(), 8);
        assert!(!reference_weights().contains_key("reviewedness"));
    }

    #[test]
    fn test_defaults() {
        let config = AuditConfig::default();
        assert!(config.engine.parallel);
        assert!(config.engine.effective_concurrency() >= 1);
        assert_eq!(config.scoring.normalization, WeightNormalization::Absolute);
        assert_eq!(config.hub.max_model_file_bytes, 536_870_912);
        assert_eq!(config.hub.max_dataset_file_bytes, 524_288);
        assert_eq!(
            config.rater.completions_url(),
            "https://genai.rcac.purdue.edu/api/chat/completions"
        );
    }

    #[test]
    fn test_load_config_with_overrides() {
        let mut overrides = AuditConfig::default();
        overrides.engine.max_concurrent = 3;
        overrides.scoring.normalization = WeightNormalization::AppliedWeights;
        let config = load_config(None, None, Some(&overrides)).unwrap();
        assert_eq!(config.engine.max_concurrent, 3);
        assert_eq!(config.engine.effective_concurrency(), 3);
        assert_eq!(
            config.scoring.normalization,
            WeightNormalization::AppliedWeights
        );
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.toml");
        std::fs::write(
            &path,
            r#"
[engine]
parallel = false

[scoring]
normalization = "applied_weights"

[scoring.weights]
license = 0.5
bus_factor = 0.5

[rater]
model = "llama3.2:latest"
"#,
        )
        .unwrap();
        let config = load_config(Some(&path), None, None).unwrap();
        assert!(!config.engine.parallel);
        assert_eq!(config.rater.model, "llama3.2:latest");
        assert_eq!(config.rater.api_key_env, "PURDUE_GENAI_API_KEY");
        assert_eq!(config.scoring.weights.get("license"), Some(&0.5));
    }

    #[test]
    fn test_workspace_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("modelaudit.toml"),
            "[hub]\nclone_depth = 5\n",
        )
        .unwrap();
        let config = load_config(None, Some(dir.path()), None).unwrap();
        assert_eq!(config.hub.clone_depth, 5);
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml")), None, None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut overrides = AuditConfig::default();
        overrides.scoring.weights.insert("license".into(), -1.0);
        let err = load_config(None, None, Some(&overrides)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_secrets_file_loading() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_secrets_file(Some(dir.path())).is_none());
        std::fs::write(
            dir.path().join(SECRETS_FILE),
            "MODELAUDIT_TEST_SECRET_VALUE=abc123\n",
        )
        .unwrap();
        assert!(load_secrets_file(Some(dir.path())).is_some());
        assert_eq!(
            std::env::var("MODELAUDIT_TEST_SECRET_VALUE").as_deref(),
            Ok("abc123")
        );
    }
}
