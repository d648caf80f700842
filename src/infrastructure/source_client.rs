use crate::infrastructure::error::{InfraError, SourceKind};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote(Url),
    Local(PathBuf),
}

impl SourceLocation {
    /// `http(s)://` and `file://` URLs are taken as-is; anything else is a
    /// path, resolved against `base_dir` when relative.
    pub fn resolve(raw: &str, base_dir: &Path, kind: SourceKind) -> Result<Self, InfraError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(InfraError::InvalidConfig(format!("{kind} source must not be empty")));
        }

        if let Ok(url) = Url::parse(raw) {
            match url.scheme() {
                "http" | "https" => return Ok(Self::Remote(url)),
                "file" => {
                    let path = url.to_file_path().map_err(|_| {
                        InfraError::InvalidConfig(format!("{kind} source '{raw}' is not a local path"))
                    })?;
                    return Ok(Self::Local(path));
                }
                // Windows drive letters parse as a one-letter scheme.
                scheme if scheme.len() > 1 => {
                    return Err(InfraError::InvalidConfig(format!(
                        "{kind} source '{raw}' uses unsupported scheme '{scheme}'"
                    )));
                }
                _ => {}
            }
        }

        let path = PathBuf::from(raw);
        if path.is_absolute() {
            Ok(Self::Local(path))
        } else {
            Ok(Self::Local(base_dir.join(path)))
        }
    }
}

#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn fetch_text(
        &self,
        kind: SourceKind,
        location: &SourceLocation,
    ) -> Result<String, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestSourceClient {
    client: Client,
}

impl ReqwestSourceClient {
    pub fn new(timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder().timeout(timeout).build().map_err(|error| {
            InfraError::InvalidConfig(format!("failed to build http client: {error}"))
        })?;
        Ok(Self { client })
    }

    fn http_error(kind: SourceKind, status: reqwest::StatusCode) -> InfraError {
        InfraError::SourceUnavailable {
            kind,
            message: format!("http {}", status.as_u16()),
        }
    }

    async fn fetch_remote(&self, kind: SourceKind, url: &Url) -> Result<String, InfraError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|error| InfraError::SourceUnavailable {
                kind,
                message: if error.is_timeout() {
                    format!("request timed out: {error}")
                } else {
                    format!("network error: {error}")
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::http_error(kind, status));
        }

        response
            .text()
            .await
            .map_err(|error| InfraError::SourceUnavailable {
                kind,
                message: format!("network error while reading body: {error}"),
            })
    }

    async fn fetch_local(kind: SourceKind, path: &Path) -> Result<String, InfraError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|error| InfraError::SourceUnavailable {
                kind,
                message: format!("cannot read {}: {error}", path.display()),
            })
    }
}

#[async_trait]
impl SourceClient for ReqwestSourceClient {
    async fn fetch_text(
        &self,
        kind: SourceKind,
        location: &SourceLocation,
    ) -> Result<String, InfraError> {
        match location {
            SourceLocation::Remote(url) => self.fetch_remote(kind, url).await,
            SourceLocation::Local(path) => Self::fetch_local(kind, path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_dir() -> PathBuf {
        std::env::temp_dir().join("dayplanner-source-tests")
    }

    #[test]
    fn resolve_keeps_http_urls() {
        let location = SourceLocation::resolve(
            "https://example.com/planner/schedule.json",
            &base_dir(),
            SourceKind::Schedule,
        )
        .expect("resolve url");
        assert!(matches!(location, SourceLocation::Remote(url) if url.host_str() == Some("example.com")));
    }

    #[test]
    fn resolve_joins_relative_paths() {
        let location = SourceLocation::resolve("calendar.json", &base_dir(), SourceKind::Calendar)
            .expect("resolve path");
        assert_eq!(location, SourceLocation::Local(base_dir().join("calendar.json")));
    }

    #[test]
    fn resolve_rejects_empty_and_unknown_schemes() {
        assert!(SourceLocation::resolve("  ", &base_dir(), SourceKind::Feed).is_err());
        assert!(SourceLocation::resolve("ftp://example.com/feed.ics", &base_dir(), SourceKind::Feed).is_err());
    }

    #[tokio::test]
    async fn missing_local_file_is_source_unavailable() {
        let client = ReqwestSourceClient::new(Duration::from_secs(1)).expect("client");
        let location = SourceLocation::Local(base_dir().join("does-not-exist.ics"));
        let result = client.fetch_text(SourceKind::Feed, &location).await;
        assert!(matches!(
            result,
            Err(InfraError::SourceUnavailable {
                kind: SourceKind::Feed,
                ..
            })
        ));
    }
}
