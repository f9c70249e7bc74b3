use std::env;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, header};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{RAG_REQUEST_DURATION, RAG_REQUEST_ERRORS, RAG_REQUESTS};
use crate::types::{AskRequest, AskResponse};

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Port the backend listens on, next to the host serving the client.
pub const DEFAULT_API_PORT: u16 = 8000;

/// Environment variable overriding the backend base URL.
pub const API_URL_ENV: &str = "APEX_RAG_API_URL";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the backend base URL for a client served from `host`.
///
/// The backend is assumed co-located with the serving host on port 8000
/// under `/api`. With no host, `localhost` is used.
pub fn resolve_api_base_url(host: Option<&str>, https: bool) -> String {
    let scheme = if https { "https" } else { "http" };
    let host = host.map(str::trim).filter(|h| !h.is_empty()).unwrap_or("localhost");
    format!("{scheme}://{host}:{DEFAULT_API_PORT}/api")
}

/// Validates a base URL and strips any trailing slash.
pub(crate) fn normalize_base_url(base_url: &str) -> Result<String> {
    let parsed = Url::parse(base_url)?;
    if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::validation(
            format!("not an http(s) base URL: {base_url}"),
            Some("api_url".to_string()),
        ));
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

/// Client for the RAG backend's `/ask` endpoint.
#[derive(Debug, Clone)]
pub struct RagClient {
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl RagClient {
    /// Create a new client.
    ///
    /// The base URL can be provided directly or read from the
    /// `APEX_RAG_API_URL` environment variable; otherwise
    /// [`DEFAULT_API_URL`] is used.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        };
        let base_url = normalize_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The backend base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Ask the backend a question.
    ///
    /// One round trip, no retry. Any non-success status or transport
    /// failure is reported as [`Error::Retrieval`].
    pub async fn ask(&self, request: &AskRequest) -> Result<AskResponse> {
        let url = format!("{}/ask", self.base_url);
        RAG_REQUESTS.click();
        let started = Instant::now();
        tracing::debug!(%url, top_k = request.top_k, "querying RAG backend");

        let result = self.send_ask(&url, request).await;
        RAG_REQUEST_DURATION.add(started.elapsed().as_secs_f64());
        if let Err(err) = &result {
            RAG_REQUEST_ERRORS.click();
            tracing::debug!(error = %err, "RAG backend query failed");
        }
        result
    }

    async fn send_ask(&self, url: &str, request: &AskRequest) -> Result<AskResponse> {
        let response = self
            .client
            .post(url)
            .headers(self.default_headers())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::retrieval(
                        format!(
                            "backend query timed out after {:.1}s",
                            self.timeout.as_secs_f64()
                        ),
                        None,
                        Some(Box::new(e)),
                    )
                } else if e.is_connect() {
                    Error::retrieval("backend unreachable", None, Some(Box::new(e)))
                } else {
                    Error::retrieval(format!("request failed: {}", e), None, Some(Box::new(e)))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::retrieval(
                "backend query failed",
                Some(status.as_u16()),
                None,
            ));
        }

        response.json::<AskResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}
