//! Clio API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication. API
//! calls are retried on 429 per [`DocumentApiPolicy`]; byte uploads are not,
//! since their body stream is consumed by the first attempt.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use docferry_auth::{AuthError, TokenProvider};
use docferry_model::{ByteStream, DestinationId, InitiatedUpload, ParentType, PutTarget};
use docferry_retry::{DocumentApiPolicy, HttpFailure, RetryConfig};
use docferry_transfer::UploadPart;
use futures_util::Stream;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::types::{
    Created, Document, Envelope, FinalizeVersion, NewDocument, NewFolder, ParentRef,
};

pub const DEFAULT_BASE_URL: &str = "https://eu.app.clio.com";

const FOLDER_FIELDS: &str = "id,type,name,parent{id,type,name}";
const DOCUMENT_FIELDS: &str = "id,latest_document_version{uuid,put_url,put_headers,multiparts}";
const FINALIZE_FIELDS: &str = "id,latest_document_version{fully_uploaded}";

/// Errors from the Clio client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api {
        status: u16,
        body: String,
        retry_after: Option<String>,
        rate_limit_reset: Option<String>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("upload failed: {0}")]
    Upload(u16),

    #[error("invalid upload header: {0}")]
    InvalidHeader(String),

    #[error("document {0} was issued without upload targets")]
    MissingTargets(DestinationId),
}

impl HttpFailure for Error {
    fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn retry_after(&self) -> Option<&str> {
        match self {
            Error::Api { retry_after, .. } => retry_after.as_deref(),
            _ => None,
        }
    }

    fn rate_limit_reset(&self) -> Option<&str> {
        match self {
            Error::Api {
                rate_limit_reset, ..
            } => rate_limit_reset.as_deref(),
            _ => None,
        }
    }
}

/// Clio API client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    retry: RetryConfig,
}

impl Client {
    /// Creates a client that authenticates with tokens from `tokens`.
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Result<Self, Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            tokens,
            retry: RetryConfig::critical(),
        })
    }

    /// Sets a custom base URL (regional deployments, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the retry budget for API calls.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sends an authenticated JSON request, retrying rate-limited responses.
    async fn send_json<B, T>(
        &self,
        method: Method,
        endpoint: &str,
        fields: &str,
        body: &B,
    ) -> Result<T, Error>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        docferry_retry::execute(endpoint, &self.retry, &DocumentApiPolicy, || {
            self.send_once(method.clone(), &url, fields, body)
        })
        .await
    }

    async fn send_once<B, T>(
        &self,
        method: Method,
        url: &str,
        fields: &str,
        body: &B,
    ) -> Result<T, Error>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .request(method, url)
            .query(&[("fields", fields)])
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Creates a folder and returns its id.
    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: DestinationId,
        parent_type: ParentType,
    ) -> Result<DestinationId, Error> {
        let body = Envelope {
            data: NewFolder {
                name,
                parent: ParentRef::new(parent_id, parent_type),
            },
        };
        let created: Envelope<Created> = self
            .send_json(Method::POST, "/api/v4/folders.json", FOLDER_FIELDS, &body)
            .await?;
        info!(name, id = created.data.id, "created folder");
        Ok(created.data.id)
    }

    /// Creates a document and obtains its upload targets.
    ///
    /// With `parts`, the document is created as a multipart upload and one
    /// target is issued per part.
    pub async fn initiate_upload(
        &self,
        name: &str,
        parent_id: DestinationId,
        parent_type: ParentType,
        parts: Option<&[UploadPart]>,
    ) -> Result<InitiatedUpload, Error> {
        let body = Envelope {
            data: NewDocument {
                name,
                parent: ParentRef::new(parent_id, parent_type),
                multiparts: parts,
            },
        };
        let created: Envelope<Document> = self
            .send_json(Method::POST, "/api/v4/documents", DOCUMENT_FIELDS, &body)
            .await?;
        let id = created.data.id;
        let upload = created
            .data
            .into_initiated()
            .ok_or(Error::MissingTargets(id))?;
        info!(name, id, "created document");
        Ok(upload)
    }

    /// `PUT`s a byte stream of exactly `content_length` bytes to a
    /// pre-signed target.
    ///
    /// The length is sent up front; object stores refuse chunked uploads.
    pub async fn upload_bytes(
        &self,
        target: &PutTarget,
        body: ByteStream,
        content_length: u64,
    ) -> Result<(), Error> {
        let mut headers = HeaderMap::new();
        for (name, value) in &target.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::InvalidHeader(name.as_str().to_string()))?;
            headers.insert(name, value);
        }
        headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));

        let resp = self
            .http
            .put(&target.url)
            .headers(headers)
            .body(reqwest::Body::wrap_stream(SyncStream(Mutex::new(body))))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Upload(status.as_u16()));
        }
        debug!(status = status.as_u16(), "uploaded bytes");
        Ok(())
    }

    /// Marks the uploaded version of a document as complete.
    pub async fn finalize_upload(
        &self,
        document_id: DestinationId,
        upload_uuid: &str,
    ) -> Result<(), Error> {
        let body = Envelope {
            data: FinalizeVersion {
                uuid: upload_uuid,
                fully_uploaded: true,
            },
        };
        let _: serde_json::Value = self
            .send_json(
                Method::PATCH,
                &format!("/api/v4/documents/{document_id}"),
                FINALIZE_FIELDS,
                &body,
            )
            .await?;
        info!(id = document_id, "finalized document upload");
        Ok(())
    }
}

/// Maps a non-success response to [`Error::Api`], keeping rate-limit headers.
async fn check_status(resp: Response) -> Result<Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let header = |name: &str| {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let retry_after = header("retry-after");
    let rate_limit_reset = header("x-ratelimit-reset");
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        body,
        retry_after,
        rate_limit_reset,
    })
}

/// Gives a `Send`-only byte stream the `Sync` bound request bodies need.
struct SyncStream(Mutex<ByteStream>);

impl Stream for SyncStream {
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let inner = match self.get_mut().0.get_mut() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.as_mut().poll_next(cx)
    }
}
