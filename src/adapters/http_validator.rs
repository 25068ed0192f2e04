use crate::config::toml_config::ValidatorConfig;
use crate::domain::model::{Locator, SourceIdentity};
use crate::domain::ports::Validator;
use crate::utils::error::{ImportError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const SNIPPET_LIMIT: usize = 500;

/// 遠端驗證失敗的原因；文字內容會被用來分類錯誤
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Received an invalid response from the server.")]
    InvalidResponse,

    #[error("Server returned an invalid status code: {0}.")]
    InvalidStatusCode(u16),

    #[error("Failed to decode JSON (Content-Type: {content_type}): {source}\nData Snippet:\n{snippet}")]
    Decoding {
        content_type: String,
        snippet: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Required fields are missing or empty.")]
    MissingRequiredFields,
}

/// 只取來源清單的識別欄位，其他內容忽略
#[derive(Debug, Deserialize)]
struct ManifestHeader {
    #[serde(default)]
    name: String,
    #[serde(default)]
    identifier: String,
}

/// 以 HTTP GET 下載來源清單並確認其識別欄位
#[derive(Debug, Clone)]
pub struct HttpValidator {
    client: Client,
}

impl HttpValidator {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ValidatorConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                ImportError::InvalidConfigValueError {
                    field: "validator.headers".to_string(),
                    value: key.clone(),
                    reason: e.to_string(),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ImportError::InvalidConfigValueError {
                    field: format!("validator.headers.{}", key),
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Validator for HttpValidator {
    type Error = FetchError;

    async fn validate_locator(&self, locator: &Locator) -> std::result::Result<SourceIdentity, FetchError> {
        tracing::debug!("Fetching source manifest: {}", locator);

        let response = self
            .client
            .get(locator.canonical())
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::InvalidStatusCode(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let body = response.bytes().await.map_err(FetchError::Network)?;
        let body = body.strip_prefix(UTF8_BOM).unwrap_or(&body[..]);
        if body.is_empty() {
            return Err(FetchError::InvalidResponse);
        }

        let header: ManifestHeader =
            serde_json::from_slice(body).map_err(|source| FetchError::Decoding {
                content_type,
                snippet: String::from_utf8_lossy(&body[..body.len().min(SNIPPET_LIMIT)]).into_owned(),
                source,
            })?;

        if header.name.trim().is_empty() || header.identifier.trim().is_empty() {
            return Err(FetchError::MissingRequiredFields);
        }

        Ok(SourceIdentity {
            name: header.name,
            identifier: header.identifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classify::classify_error;
    use crate::core::normalize::normalize;
    use crate::domain::model::ErrorCategory;
    use httpmock::prelude::*;

    fn validator() -> HttpValidator {
        HttpValidator::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_manifest_returns_identity() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/repo.json");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "name": "Example Repo",
                    "identifier": "com.example.repo",
                    "apps": [{"name": "ignored"}]
                }));
        });

        let locator = normalize(&server.url("/repo.json")).unwrap();
        let identity = validator().validate_locator(&locator).await.unwrap();

        mock.assert();
        assert_eq!(identity.name, "Example Repo");
        assert_eq!(identity.identifier, "com.example.repo");
    }

    #[tokio::test]
    async fn test_bom_prefixed_manifest_is_accepted() {
        let server = MockServer::start();
        let mut body = UTF8_BOM.to_vec();
        body.extend_from_slice(br#"{"name":"Bom","identifier":"bom.repo"}"#);
        server.mock(|when, then| {
            when.method(GET).path("/bom.json");
            then.status(200).body(body);
        });

        let locator = normalize(&server.url("/bom.json")).unwrap();
        let identity = validator().validate_locator(&locator).await.unwrap();
        assert_eq!(identity.identifier, "bom.repo");
    }

    #[tokio::test]
    async fn test_not_found_is_non_retryable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.json");
            then.status(404);
        });

        let locator = normalize(&server.url("/missing.json")).unwrap();
        let err = validator().validate_locator(&locator).await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidStatusCode(404)));
        let (_, retryable) = classify_error(&err);
        assert!(!retryable);
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/flaky.json");
            then.status(503);
        });

        let locator = normalize(&server.url("/flaky.json")).unwrap();
        let err = validator().validate_locator(&locator).await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidStatusCode(503)));
        assert!(classify_error(&err).1);
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/partial.json");
            then.status(200).json_body(serde_json::json!({"name": "", "apps": []}));
        });

        let locator = normalize(&server.url("/partial.json")).unwrap();
        let err = validator().validate_locator(&locator).await.unwrap_err();
        assert!(matches!(err, FetchError::MissingRequiredFields));
    }

    #[tokio::test]
    async fn test_non_json_body_reports_snippet() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/page");
            then.status(200)
                .header("Content-Type", "text/html")
                .body("<html>hello</html>");
        });

        let locator = normalize(&server.url("/page")).unwrap();
        let err = validator().validate_locator(&locator).await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Content-Type: text/html"));
        assert!(message.contains("<html>hello</html>"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let locator = normalize("http://127.0.0.1:1/repo.json").unwrap();
        let err = validator().validate_locator(&locator).await.unwrap_err();

        assert!(matches!(err, FetchError::Network(_)));
        assert_eq!(classify_error(&err), (ErrorCategory::Network, true));
    }

    #[test]
    fn test_invalid_header_in_config_is_rejected() {
        let mut config = ValidatorConfig::default();
        config
            .headers
            .insert("bad header".to_string(), "value".to_string());
        assert!(HttpValidator::from_config(&config).is_err());
    }
}
