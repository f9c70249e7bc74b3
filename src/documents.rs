//! Client for the backend's `/documents` resource.

use std::path::Path;
use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use url::Url;

use crate::client::normalize_base_url;
use crate::error::{Error, Result};
use crate::observability::{DOCUMENT_REQUEST_ERRORS, DOCUMENT_REQUESTS};
use crate::types::{Document, DocumentMetadata, format_file_size};

/// Timeout for listing documents; the listing is expected to be fast.
pub const LIST_TIMEOUT: Duration = Duration::from_secs(2);

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest file accepted for upload, 50 MB.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// File extensions accepted for upload.
pub const UPLOAD_EXTENSIONS: [&str; 4] = ["pdf", "docx", "pptx", "txt"];

/// Checks that a file of `len` bytes at `path` may be uploaded.
///
/// Only PDF, DOCX, PPTX and plain-text files up to [`MAX_UPLOAD_BYTES`] are
/// accepted. The type is judged by extension, ignoring case.
pub fn validate_upload_file(path: &Path, len: u64) -> Result<()> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !UPLOAD_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::validation(
            format!(
                "unsupported file type: {} (accepted: pdf, docx, pptx, txt)",
                path.display()
            ),
            Some("file".to_string()),
        ));
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(Error::validation(
            format!(
                "file too large: {} is {} (limit {})",
                path.display(),
                format_file_size(len),
                format_file_size(MAX_UPLOAD_BYTES)
            ),
            Some("file".to_string()),
        ));
    }
    Ok(())
}

/// Lists, uploads, edits, deletes and downloads backend documents.
#[derive(Debug, Clone)]
pub struct DocumentClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    list_timeout: Duration,
}

impl DocumentClient {
    /// Creates a client for the backend at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeouts(base_url, DEFAULT_TIMEOUT, LIST_TIMEOUT)
    }

    /// Creates a client with custom timeouts for transfers and listings.
    pub fn with_timeouts(base_url: &str, timeout: Duration, list_timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(&normalize_base_url(base_url)?)?;
        let client = ReqwestClient::builder().build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;
        Ok(Self {
            client,
            base_url,
            timeout,
            list_timeout,
        })
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Builds `{base}/documents[/{id}][/{suffix}]` with the id percent-encoded.
    fn endpoint(&self, id: Option<&str>, suffix: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::url(format!("cannot extend {}", self.base_url), None))?;
            segments.pop_if_empty().push("documents");
            if let Some(id) = id {
                segments.push(id);
            }
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    /// Lists every document, normalized for display.
    pub async fn list(&self) -> Result<Vec<Document>> {
        let url = self.endpoint(None, None)?;
        let request = self.client.get(url).timeout(self.list_timeout);
        let response = self.execute("list", request).await?;
        let documents: Vec<Document> = response.json().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse document list: {}", e),
                Some(Box::new(e)),
            )
        })?;
        tracing::debug!(count = documents.len(), "listed documents");
        Ok(documents)
    }

    /// Finds document `id` in the listing.
    pub async fn find(&self, id: &str) -> Result<Document> {
        self.list()
            .await?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::not_found(format!("no document with id {id}"), None))
    }

    /// Uploads the file at `path` with `metadata`.
    ///
    /// `category` and `owner` are required, and the file must pass
    /// [`validate_upload_file`].
    pub async fn upload(&self, path: &Path, metadata: &DocumentMetadata) -> Result<()> {
        if let Some(field) = metadata.missing_required_field() {
            return Err(Error::validation(
                format!("{field} is required to upload a document"),
                Some(field.to_string()),
            ));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::validation(
                    format!("not a file: {}", path.display()),
                    Some("file".to_string()),
                )
            })?;
        let len = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?
            .len();
        validate_upload_file(path, len)?;
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;

        let mut form = Form::new().part("file", Part::bytes(content).file_name(file_name.clone()));
        for (key, value) in metadata.form_fields() {
            form = form.text(key, value);
        }
        let url = self.endpoint(Some("upload"), None)?;
        let request = self.client.post(url).timeout(self.timeout).multipart(form);
        self.execute("upload", request).await?;
        tracing::info!(file = %file_name, "uploaded document");
        Ok(())
    }

    /// Replaces the metadata of document `id`.
    pub async fn update(&self, id: &str, metadata: &DocumentMetadata) -> Result<()> {
        let url = self.endpoint(Some(id), None)?;
        let request = self.client.put(url).timeout(self.timeout).json(metadata);
        self.execute("update", request).await?;
        tracing::info!(id, "updated document metadata");
        Ok(())
    }

    /// Deletes document `id`.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let url = self.endpoint(Some(id), None)?;
        let request = self.client.delete(url).timeout(self.timeout);
        self.execute("delete", request).await?;
        tracing::info!(id, "deleted document");
        Ok(())
    }

    /// Downloads the content of document `id`.
    pub async fn download(&self, id: &str) -> Result<Bytes> {
        let url = self.endpoint(Some(id), Some("download"))?;
        let request = self.client.get(url).timeout(self.timeout);
        let response = self.execute("download", request).await?;
        response.bytes().await.map_err(|e| {
            Error::http_client(
                format!("Failed to read download: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    async fn execute(&self, operation: &'static str, request: RequestBuilder) -> Result<Response> {
        DOCUMENT_REQUESTS.click();
        let started = Instant::now();
        let result = self.send(request).await;
        tracing::debug!(
            operation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "document request finished"
        );
        if result.is_err() {
            DOCUMENT_REQUEST_ERRORS.click();
        }
        result
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::http_client("document request timed out", Some(Box::new(e)))
            } else if e.is_connect() {
                Error::http_client("backend unreachable", Some(Box::new(e)))
            } else {
                Error::http_client(format!("request failed: {}", e), Some(Box::new(e)))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body
        };
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::not_found(message, None));
        }
        Err(Error::api(status.as_u16(), message))
    }
}
