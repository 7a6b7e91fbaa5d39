//! Pickup serviceability lookups.
//!
//! The prefix rule in [`recraft_core::pincode`] answers locally. When a remote
//! lookup service is configured the same question goes over HTTP instead, and
//! the answer has the same shape either way. Malformed codes are rejected
//! locally in both modes and never leave the process.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use recraft_core::{Pincode, Serviceability, classify};

use crate::config::ServiceabilityConfig;

/// Path of the lookup endpoint on a remote service.
pub const CHECK_PATH: &str = "/api/check-pincode";

/// Errors from a remote lookup. Distinct from a "not serviceable" answer.
#[derive(Debug, Error)]
pub enum ServiceabilityError {
    /// The lookup did not answer within the configured timeout.
    #[error("serviceability lookup timed out")]
    Timeout,

    /// Transport-level failure.
    #[error("serviceability lookup failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an unexpected status.
    #[error("serviceability lookup returned HTTP {0}")]
    Status(StatusCode),

    /// The service answered with a body that is not a serviceability result.
    #[error("serviceability lookup returned an invalid body: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured base URL cannot be joined with the lookup path.
    #[error("invalid serviceability URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Answers "is pickup available for this pincode?".
#[derive(Clone, Debug)]
pub enum ServiceabilityChecker {
    /// Apply the built-in prefix rule.
    Local,
    /// Ask a remote lookup service.
    Remote(RemoteChecker),
}

impl ServiceabilityChecker {
    /// Build the checker described by `config`: remote when a URL is set,
    /// local otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ServiceabilityError` if the HTTP client cannot be built or the
    /// URL is unusable.
    pub fn from_config(config: &ServiceabilityConfig) -> Result<Self, ServiceabilityError> {
        match &config.api_url {
            Some(base) => Ok(Self::Remote(RemoteChecker::new(
                base,
                config.api_token.clone(),
                config.timeout,
            )?)),
            None => Ok(Self::Local),
        }
    }

    /// Classify `raw`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceabilityError` only for remote lookups that fail.
    #[tracing::instrument(skip(self), fields(mode = self.mode()))]
    pub async fn check(&self, raw: &str) -> Result<Serviceability, ServiceabilityError> {
        let Ok(code) = Pincode::parse(raw) else {
            return Ok(Serviceability::invalid_format(raw));
        };
        match self {
            Self::Local => Ok(classify(code.as_str())),
            Self::Remote(remote) => remote.check(&code).await,
        }
    }

    const fn mode(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote(_) => "remote",
        }
    }
}

/// HTTP client for a remote lookup service.
#[derive(Clone)]
pub struct RemoteChecker {
    inner: Arc<RemoteCheckerInner>,
}

struct RemoteCheckerInner {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<SecretString>,
}

impl std::fmt::Debug for RemoteChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteChecker")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("token", &self.inner.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl RemoteChecker {
    /// Create a client for the service at `base`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceabilityError` if the client cannot be built.
    pub fn new(
        base: &Url,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ServiceabilityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ReCraft/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            inner: Arc::new(RemoteCheckerInner {
                client,
                endpoint: base.join(CHECK_PATH)?,
                token,
            }),
        })
    }

    async fn check(&self, code: &Pincode) -> Result<Serviceability, ServiceabilityError> {
        let mut url = self.inner.endpoint.clone();
        url.query_pairs_mut().append_pair("code", code.as_str());

        let mut request = self.inner.client.get(url);
        if let Some(token) = &self.inner.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(timeout_or_http)?;
        let status = response.status();

        // A 400 is the service rejecting the format; answer like the local rule.
        if status == StatusCode::BAD_REQUEST {
            return Ok(Serviceability::invalid_format(code.as_str()));
        }
        if !status.is_success() {
            tracing::warn!(status = %status, "serviceability service returned non-success status");
            return Err(ServiceabilityError::Status(status));
        }

        let body = response.text().await.map_err(timeout_or_http)?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn timeout_or_http(err: reqwest::Error) -> ServiceabilityError {
    if err.is_timeout() {
        ServiceabilityError::Timeout
    } else {
        ServiceabilityError::Http(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::extract::Query;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct CodeQuery {
        code: String,
    }

    async fn serve(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Url::parse(&format!("http://{addr}")).unwrap()
    }

    #[tokio::test]
    async fn test_local_rule() {
        let checker = ServiceabilityChecker::Local;
        assert!(checker.check("560001").await.unwrap().serviceable);
        assert!(!checker.check("110001").await.unwrap().serviceable);
        assert!(checker.check("abc").await.unwrap().is_format_rejection());
    }

    #[tokio::test]
    async fn test_remote_uses_same_shape_and_token() {
        let router = Router::new().route(
            CHECK_PATH,
            get(|headers: HeaderMap, Query(q): Query<CodeQuery>| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|h| h.to_str().ok())
                    == Some("Bearer lookup-token");
                Json(Serviceability {
                    serviceable: authorized,
                    code: q.code,
                    region: Some("Remote Region".to_owned()),
                    message: "from remote".to_owned(),
                })
            }),
        );
        let base = serve(router).await;
        let checker = ServiceabilityChecker::Remote(
            RemoteChecker::new(
                &base,
                Some(SecretString::from("lookup-token")),
                Duration::from_secs(5),
            )
            .unwrap(),
        );

        let result = checker.check(" 110001 ").await.unwrap();
        assert!(result.serviceable);
        assert_eq!(result.code, "110001");
        assert_eq!(result.region.as_deref(), Some("Remote Region"));
    }

    #[tokio::test]
    async fn test_remote_never_sees_malformed_codes() {
        // Nothing listens here; a request would fail.
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let checker = ServiceabilityChecker::Remote(
            RemoteChecker::new(&base, None, Duration::from_secs(1)).unwrap(),
        );
        assert!(checker.check("12").await.unwrap().is_format_rejection());
    }

    #[tokio::test]
    async fn test_remote_timeout_is_an_error() {
        let router = Router::new().route(
            CHECK_PATH,
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let base = serve(router).await;
        let checker = ServiceabilityChecker::Remote(
            RemoteChecker::new(&base, None, Duration::from_millis(100)).unwrap(),
        );
        assert!(matches!(
            checker.check("560001").await,
            Err(ServiceabilityError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_remote_server_error_is_distinct_from_not_serviceable() {
        let router = Router::new().route(
            CHECK_PATH,
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let base = serve(router).await;
        let checker = ServiceabilityChecker::Remote(
            RemoteChecker::new(&base, None, Duration::from_secs(5)).unwrap(),
        );
        assert!(matches!(
            checker.check("560001").await,
            Err(ServiceabilityError::Status(StatusCode::SERVICE_UNAVAILABLE))
        ));
    }
}
