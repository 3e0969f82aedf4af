//! Thin JSON-over-HTTP client shared by the hub adapters.

use super::with_retry;
use crate::config::RetryConfig;
use crate::error::FetchError;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Outcome of a streamed download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Download {
    Written(u64),
    /// The body exceeded the byte limit; nothing was kept.
    TooLarge,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    retry: RetryConfig,
}

impl ApiClient {
    pub fn new(timeout: Duration, retry: RetryConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("modelaudit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, retry })
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// GET a URL and decode the JSON body, retrying transient failures.
    pub async fn get_json(&self, url: &str, headers: &[(&str, String)]) -> Result<Value, FetchError> {
        with_retry(&self.retry, || self.get_json_once(url, headers)).await
    }

    async fn get_json_once(&self, url: &str, headers: &[(&str, String)]) -> Result<Value, FetchError> {
        debug!(url = %url, "GET");
        let response = self.send(url, headers).await?;
        let text = response.text().await.map_err(|e| network(url, e))?;
        serde_json::from_str(&text)
            .map_err(|e| FetchError::schema(url, format!("invalid JSON body: {e}")))
    }

    /// Stream a response body into `dest`, giving up once it passes `max_bytes`.
    pub async fn download(
        &self,
        url: &str,
        headers: &[(&str, String)],
        dest: &Path,
        max_bytes: u64,
    ) -> Result<Download, FetchError> {
        with_retry(&self.retry, || self.download_once(url, headers, dest, max_bytes)).await
    }

    async fn download_once(
        &self,
        url: &str,
        headers: &[(&str, String)],
        dest: &Path,
        max_bytes: u64,
    ) -> Result<Download, FetchError> {
        let mut response = self.send(url, headers).await?;
        if response.content_length().is_some_and(|len| len > max_bytes) {
            return Ok(Download::TooLarge);
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(|e| network(url, e))? {
            written += chunk.len() as u64;
            if written > max_bytes {
                drop(file);
                tokio::fs::remove_file(dest).await?;
                return Ok(Download::TooLarge);
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(Download::Written(written))
    }

    async fn send(&self, url: &str, headers: &[(&str, String)]) -> Result<reqwest::Response, FetchError> {
        let mut request = self.http.get(url);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        let response = request.send().await.map_err(|e| network(url, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(FetchError::from_status(url, status.as_u16(), &body, retry_after))
    }
}

fn network(url: &str, e: reqwest::Error) -> FetchError {
    FetchError::Network {
        url: url.to_string(),
        message: e.to_string(),
    }
}

/// Seconds from a `Retry-After` header, if it is numeric.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get("retry-after").and_then(|v| v.to_str().ok())?;
    value
        .trim()
        .parse::<u64>()
        .ok()
        .or_else(|| value.trim().parse::<f64>().ok().map(|s| s.ceil().max(0.0) as u64))
}

/// Bearer authorization header, when a token is configured.
pub fn bearer(token: Option<&str>) -> Vec<(&'static str, String)> {
    token
        .map(|t| vec![("Authorization", format!("Bearer {t}"))])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert("retry-after", HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(12));
        headers.insert("retry-after", HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after(&headers), Some(2));
        headers.insert(
            "retry-after",
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_bearer() {
        assert!(bearer(None).is_empty());
        assert_eq!(bearer(Some("t"))[0].1, "Bearer t");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = ApiClient::new(Duration::from_secs(2), RetryConfig::none()).unwrap();
        let err = client
            .get_json("http://127.0.0.1:1/api/models/x", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
