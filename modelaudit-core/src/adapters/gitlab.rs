//! GitLab REST client for project metadata.

use super::http::ApiClient;
use crate::config::HubConfig;
use crate::error::FetchError;
use crate::resources::Metadata;
use serde_json::Value;
use tracing::debug;

#[derive(Clone)]
pub struct GitLabClient {
    api: ApiClient,
    base_url: String,
    token: Option<String>,
}

impl GitLabClient {
    pub fn new(api: ApiClient, config: &HubConfig) -> Self {
        Self {
            api,
            base_url: config.gitlab_api_url.trim_end_matches('/').to_string(),
            token: config.gitlab_token(),
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        self.token
            .iter()
            .map(|t| ("PRIVATE-TOKEN", t.clone()))
            .collect()
    }

    fn project_url(&self, path: &str) -> String {
        format!("{}/projects/{}", self.base_url, urlencoding::encode(path))
    }

    /// Project metadata with `num_contributors` added (null if unavailable).
    pub async fn metadata(&self, path: &str) -> Result<Metadata, FetchError> {
        let url = self.project_url(path);
        let Value::Object(mut map) = self.api.get_json(&url, &self.headers()).await? else {
            return Err(FetchError::schema(url, "expected an object for project metadata"));
        };
        let contributors_url = format!("{url}/repository/contributors");
        let contributors = match self.api.get_json(&contributors_url, &self.headers()).await {
            Ok(Value::Array(list)) => Value::from(list.len() as u64),
            Ok(_) => Value::Null,
            Err(e) => {
                debug!(project = path, error = %e, "Contributor count unavailable");
                Value::Null
            }
        };
        map.insert("num_contributors".into(), contributors);
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use std::time::Duration;

    #[test]
    fn test_project_url_is_encoded() {
        let api = ApiClient::new(Duration::from_secs(1), RetryConfig::none()).unwrap();
        let client = GitLabClient::new(api, &HubConfig::default());
        assert_eq!(
            client.project_url("group/sub/project"),
            "https://gitlab.com/api/v4/projects/group%2Fsub%2Fproject"
        );
    }
}
