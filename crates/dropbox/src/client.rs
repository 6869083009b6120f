//! Dropbox API client.

use std::sync::Arc;

use docferry_auth::{AuthError, TokenProvider};
use docferry_model::{ByteRange, ByteStream, ListPage};
use docferry_retry::{HttpFailure, RetryConfig, StoragePolicy};
use futures_util::TryStreamExt;
use reqwest::header::RANGE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::types::{ListFolderArg, ListFolderContinueArg, ListFolderResult, PathArg, TemporaryLink};

pub const DEFAULT_API_URL: &str = "https://api.dropboxapi.com";

/// Errors from the Dropbox client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api {
        status: u16,
        body: String,
        retry_after: Option<String>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
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
        None
    }
}

/// Dropbox API client.
pub struct Client {
    http: reqwest::Client,
    api_url: String,
    tokens: Arc<dyn TokenProvider>,
    retry: RetryConfig,
}

impl Client {
    /// Creates a client that authenticates with tokens from `tokens`.
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Result<Self, Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            api_url: DEFAULT_API_URL.to_string(),
            tokens,
            retry: RetryConfig::critical(),
        })
    }

    /// Sets a custom API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the retry budget for API calls.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Performs an authenticated RPC-style POST with a JSON body, retrying
    /// rate-limited responses.
    async fn rpc<A, T>(&self, endpoint: &str, arg: &A) -> Result<T, Error>
    where
        A: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.api_url, endpoint);
        docferry_retry::execute(endpoint, &self.retry, &StoragePolicy, || {
            self.post_json(&url, arg)
        })
        .await
    }

    async fn post_json<A, T>(&self, url: &str, arg: &A) -> Result<T, Error>
    where
        A: Serialize + Sync,
        T: DeserializeOwned,
    {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(arg)
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetches one page of the recursive listing under `root`.
    ///
    /// Pass the cursor of the previous page to continue; `None` starts over.
    pub async fn list_page(&self, root: &str, cursor: Option<&str>) -> Result<ListPage, Error> {
        let result: ListFolderResult = match cursor {
            None => {
                let arg = ListFolderArg {
                    path: root,
                    recursive: true,
                    include_media_info: false,
                    include_deleted: false,
                };
                self.rpc("/2/files/list_folder", &arg).await?
            }
            Some(cursor) => {
                self.rpc("/2/files/list_folder/continue", &ListFolderContinueArg { cursor })
                    .await?
            }
        };
        debug!(
            root,
            entries = result.entries.len(),
            has_more = result.has_more,
            "listed page"
        );
        Ok(result.into())
    }

    /// Returns a short-lived direct download link for a file.
    pub async fn temporary_link(&self, path: &str) -> Result<String, Error> {
        let link: TemporaryLink = self
            .rpc("/2/files/get_temporary_link", &PathArg { path })
            .await?;
        Ok(link.link)
    }

    /// Opens a byte stream over a file, optionally limited to `range`.
    ///
    /// The link lookup is retried; the download itself is not.
    pub async fn download(&self, path: &str, range: Option<ByteRange>) -> Result<ByteStream, Error> {
        let link = self.temporary_link(path).await?;
        let mut req = self.http.get(&link);
        if let Some(range) = range {
            req = req.header(RANGE, range.header_value());
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
                retry_after: None,
            });
        }
        info!(path, range = ?range, "opened download stream");
        Ok(Box::pin(resp.bytes_stream().map_err(std::io::Error::other)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docferry_auth::StaticTokenProvider;
    use docferry_model::EntryKind;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, format!("http://127.0.0.1:{port}"))
    }

    /// Answers one request per canned response, in order, capturing each
    /// raw request.
    fn serve(
        listener: TcpListener,
        responses: Vec<String>,
    ) -> (Arc<Mutex<Vec<String>>>, tokio::task::JoinHandle<()>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();

        let handle = tokio::spawn(async move {
            for resp in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let raw = read_request(&mut stream).await;
                captured.lock().unwrap().push(raw);
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (seen, handle)
    }

    async fn mock_server(
        responses: Vec<String>,
    ) -> (String, Arc<Mutex<Vec<String>>>, tokio::task::JoinHandle<()>) {
        let (listener, url) = bind().await;
        let (seen, handle) = serve(listener, responses);
        (url, seen, handle)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut raw = Vec::new();
        let mut buf = vec![0u8; 8192];
        loop {
            let n = stream.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw);
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let want = text[..head_end]
                .to_ascii_lowercase()
                .lines()
                .find_map(|l| l.strip_prefix("content-length:").map(|v| v.trim().to_string()))
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0);
            if raw.len() - head_end - 4 >= want {
                break;
            }
        }
        String::from_utf8_lossy(&raw).into_owned()
    }

    fn response(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n{extra_headers}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    fn client(url: &str) -> Client {
        Client::new(Arc::new(StaticTokenProvider::new("test-token")))
            .unwrap()
            .with_api_url(url)
            .with_retry(RetryConfig {
                max_retries: 2,
                base_delay: Duration::from_millis(10),
            })
    }

    #[tokio::test]
    async fn list_page_sends_recursive_listing() {
        let body = r#"{"entries":[
            {".tag":"folder","name":"Evidence","path_lower":"/leads/smith/evidence","id":"id:1"},
            {".tag":"file","name":"a.pdf","path_lower":"/leads/smith/evidence/a.pdf","id":"id:2","size":5}
        ],"cursor":"c1","has_more":true}"#;
        let (url, seen, handle) = mock_server(vec![response("200 OK", "", body)]).await;

        let page = client(&url).list_page("/Leads/Smith", None).await.unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].kind, EntryKind::Folder);
        assert_eq!(page.cursor.as_deref(), Some("c1"));

        let requests = seen.lock().unwrap().clone();
        let req = &requests[0];
        assert!(req.starts_with("POST /2/files/list_folder "));
        assert!(req.to_ascii_lowercase().contains("authorization: bearer test-token"));
        assert!(req.contains(r#""recursive":true"#));
        assert!(req.contains(r#""path":"/Leads/Smith""#));
        handle.abort();
    }

    #[tokio::test]
    async fn list_page_continues_with_cursor() {
        let body = r#"{"entries":[],"cursor":"c2","has_more":false}"#;
        let (url, seen, handle) = mock_server(vec![response("200 OK", "", body)]).await;

        let page = client(&url).list_page("/leads", Some("c1")).await.unwrap();
        assert!(page.cursor.is_none());

        let requests = seen.lock().unwrap().clone();
        let req = &requests[0];
        assert!(req.starts_with("POST /2/files/list_folder/continue "));
        assert!(req.contains(r#""cursor":"c1""#));
        handle.abort();
    }

    #[tokio::test]
    async fn rate_limited_call_is_retried() {
        let body = r#"{"entries":[],"cursor":"c","has_more":false}"#;
        let (url, seen, handle) = mock_server(vec![
            response("429 Too Many Requests", "Retry-After: 0\r\n", "{}"),
            response("503 Service Unavailable", "", "{}"),
            response("200 OK", "", body),
        ])
        .await;

        let page = client(&url).list_page("/leads", None).await.unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(seen.lock().unwrap().len(), 3);
        handle.abort();
    }

    #[tokio::test]
    async fn path_error_is_not_retried() {
        let (url, seen, handle) = mock_server(vec![response(
            "409 Conflict",
            "",
            r#"{"error_summary":"path/not_found/"}"#,
        )])
        .await;

        let err = client(&url).list_page("/missing", None).await.unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("not_found"));
        assert_eq!(seen.lock().unwrap().len(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn download_requests_range_from_temporary_link() {
        let (listener, url) = bind().await;
        let link_body = format!(r#"{{"link":"{url}/dl/file","metadata":{{}}}}"#);
        let data = "HTTP/1.1 206 Partial Content\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello";
        let (seen, handle) = serve(
            listener,
            vec![response("200 OK", "", &link_body), data.to_string()],
        );

        let stream = client(&url)
            .download("/leads/a.pdf", Some(ByteRange { start: 10, end: 14 }))
            .await
            .unwrap();
        let chunks: Vec<_> = stream.try_collect().await.unwrap();
        let bytes: Vec<u8> = chunks.concat();
        assert_eq!(bytes, b"hello");

        let requests = seen.lock().unwrap().clone();
        assert!(requests[0].starts_with("POST /2/files/get_temporary_link "));
        assert!(requests[0].contains(r#""path":"/leads/a.pdf""#));
        assert!(requests[1].starts_with("GET /dl/file "));
        assert!(requests[1].to_ascii_lowercase().contains("range: bytes=10-14"));
        handle.abort();
    }

    #[tokio::test]
    async fn download_failure_is_reported() {
        let (listener, url) = bind().await;
        let link_body = format!(r#"{{"link":"{url}/dl/file"}}"#);
        let (_seen, handle) = serve(
            listener,
            vec![
                response("200 OK", "", &link_body),
                response("404 Not Found", "", "gone"),
            ],
        );

        let err = match client(&url).download("/leads/a.pdf", None).await {
            Ok(_) => panic!("expected download error"),
            Err(e) => e,
        };
        assert_eq!(err.status(), Some(404));
        handle.abort();
    }
}
