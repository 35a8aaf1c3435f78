//! HTTP fetcher backed by reqwest.
//!
//! Remote trust is configurable: system roots, an extra PEM certificate
//! (for TLS-intercepting proxies), or no verification at all.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::Fetcher;

/// Errors from remote fetches
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load certificate {path}: {reason}")]
    Certificate { path: PathBuf, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// How remote TLS certificates are verified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TrustPolicy {
    /// Accept any certificate
    Disabled,
    /// System root store
    SystemDefault,
    /// System roots plus a PEM certificate file
    CustomCertificate(PathBuf),
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self::SystemDefault
    }
}

impl FromStr for TrustPolicy {
    type Err = String;

    /// `true`/`default` → system roots, `false`/`disabled` → no checks,
    /// anything else is a certificate path
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("trust policy cannot be empty".to_string());
        }
        Ok(match trimmed.to_lowercase().as_str() {
            "true" | "default" => Self::SystemDefault,
            "false" | "disabled" => Self::Disabled,
            _ => Self::CustomCertificate(PathBuf::from(trimmed)),
        })
    }
}

impl fmt::Display for TrustPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::SystemDefault => write!(f, "default"),
            Self::CustomCertificate(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<TrustPolicy> for String {
    fn from(policy: TrustPolicy) -> Self {
        policy.to_string()
    }
}

impl TryFrom<String> for TrustPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Fetcher over HTTP(S)
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client honouring the trust policy
    pub fn new(trust: &TrustPolicy, timeout: Duration) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .user_agent(concat!("signcorpus/", env!("CARGO_PKG_VERSION")));

        builder = match trust {
            TrustPolicy::Disabled => builder.danger_accept_invalid_certs(true),
            TrustPolicy::SystemDefault => builder,
            TrustPolicy::CustomCertificate(path) => {
                let pem = std::fs::read(path).map_err(|e| FetchError::Certificate {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                    FetchError::Certificate {
                        path: path.clone(),
                        reason: e.to_string(),
                    }
                })?;
                builder.add_root_certificate(cert)
            }
        };

        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let request_err = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn stream_to(&self, url: &str, part: &Path) -> Result<u64, FetchError> {
        let write_err = |source| FetchError::Write {
            path: part.to_path_buf(),
            source,
        };

        let response = self.get(url).await?;
        let mut file = fs::File::create(part).await.map_err(write_err)?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
            file.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(write_err)?;
        Ok(written)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }

    /// Streams into `<dest>.part` and renames on success
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let mut part = dest.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);

        match self.stream_to(url, &part).await {
            Ok(written) => {
                fs::rename(&part, dest)
                    .await
                    .map_err(|source| FetchError::Write {
                        path: dest.to_path_buf(),
                        source,
                    })?;
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&part).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_trust_policy_parsing() {
        assert_eq!("true".parse::<TrustPolicy>().unwrap(), TrustPolicy::SystemDefault);
        assert_eq!("False".parse::<TrustPolicy>().unwrap(), TrustPolicy::Disabled);
        assert_eq!(
            "/etc/ssl/proxy.crt".parse::<TrustPolicy>().unwrap(),
            TrustPolicy::CustomCertificate(PathBuf::from("/etc/ssl/proxy.crt"))
        );
        assert!("  ".parse::<TrustPolicy>().is_err());
    }

    #[test]
    fn test_missing_certificate_is_reported() {
        let trust = TrustPolicy::CustomCertificate(PathBuf::from("/nonexistent/ca.pem"));
        let result = HttpFetcher::new(&trust, Duration::from_secs(5));
        assert!(matches!(result, Err(FetchError::Certificate { .. })));
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video/a.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"frames".to_vec()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.mp4");
        let fetcher = HttpFetcher::new(&TrustPolicy::SystemDefault, Duration::from_secs(5)).unwrap();

        let written = fetcher
            .download(&format!("{}/video/a.mp4", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(written, 6);
        assert_eq!(std::fs::read(&dest).unwrap(), b"frames");
        assert!(!temp.path().join("a.mp4.part").exists());
    }

    #[tokio::test]
    async fn test_error_status_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("b.mp4");
        let fetcher = HttpFetcher::new(&TrustPolicy::SystemDefault, Duration::from_secs(5)).unwrap();

        let result = fetcher
            .download(&format!("{}/video/b.mp4", server.uri()), &dest)
            .await;

        assert!(matches!(result, Err(FetchError::Status { status: 503, .. })));
        assert!(!dest.exists());
        assert!(!temp.path().join("b.mp4.part").exists());
    }
}
