use super::error::ApiError;
use super::request::{PostDraft, StoryDraft};
use super::response::{DataEnvelope, ErrorBody, LikesBody, PageEnvelope};
use super::{FeedApi, Page};
use crate::config::Config;
use crate::model::{Comment, Post, Story};
use crate::util::validate_base_url;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Upper bound on configured read retries; keeps the backoff finite.
const MAX_RETRIES: u32 = 8;
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// REST transport for the community backend.
///
/// Reads (`GET`) are retried on transient failures with exponential backoff;
/// writes are sent exactly once so a retry can never double-toggle a like or
/// create a post twice.
pub struct HttpFeedApi {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpFeedApi {
    /// Create a transport for `base_url`, attaching `token` as a bearer token.
    pub fn new(base_url: &str, token: Option<SecretString>) -> Result<Self, ApiError> {
        let base_url = validate_base_url(base_url).map_err(|e| ApiError::Request(e.to_string()))?;

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        })
    }

    /// Build a transport from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Ok(Self::new(&config.api_base_url, config.auth_token())?
            .with_timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .with_max_retries(config.max_retries))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read retries after the first attempt, capped at `MAX_RETRIES`.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.min(MAX_RETRIES);
        self
    }

    /// Base delay for read retries; attempt `n` waits `base * 2^n`.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Request(format!("cannot append path to {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn page_endpoint(&self, collection: &str, page: u32, limit: u32) -> Result<Url, ApiError> {
        let mut url = self.endpoint(&[collection])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send one request and return the body of a successful response.
    async fn execute(&self, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout)??;

        let status = response.status();
        if !status.is_success() {
            let message = tokio::time::timeout(self.timeout, read_limited_bytes(response))
                .await
                .ok()
                .and_then(Result::ok)
                .and_then(|body| serde_json::from_slice::<ErrorBody>(&body).ok())
                .and_then(|body| body.message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        tokio::time::timeout(self.timeout, read_limited_bytes(response))
            .await
            .map_err(|_| ApiError::Timeout)?
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.execute(request).await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// GET with retry on transient failures.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let mut retry_count = 0;

        loop {
            match self.send_json(self.request(Method::GET, url.clone())).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retry_count < self.max_retries => {
                    let delay = self
                        .retry_base_delay
                        .saturating_mul(2u32.saturating_pow(retry_count));
                    tracing::debug!(
                        url = %url,
                        error = %e,
                        retry = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying read after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<T>, ApiError> {
        let url = self.page_endpoint(collection, page, limit)?;
        let envelope: PageEnvelope<T> = self.get_json(url).await?;
        tracing::debug!(
            collection,
            page,
            received = envelope.data.len(),
            meta = ?envelope.pagination,
            "Fetched page"
        );
        Ok(Page {
            items: envelope.data,
            has_more: envelope.pagination.and_then(|m| m.has_more),
        })
    }

    async fn toggle_like(&self, collection: &str, id: &str) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint(&[collection, id, "like"])?;
        let envelope: DataEnvelope<LikesBody> =
            self.send_json(self.request(Method::PUT, url)).await?;
        Ok(envelope.data.likes)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&[collection, id])?;
        self.execute(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

#[async_trait]
impl FeedApi for HttpFeedApi {
    async fn list_posts(&self, page: u32, limit: u32) -> Result<Page<Post>, ApiError> {
        self.list("posts", page, limit).await
    }

    async fn list_stories(&self, page: u32, limit: u32) -> Result<Page<Story>, ApiError> {
        self.list("stories", page, limit).await
    }

    async fn get_story(&self, id: &str) -> Result<Story, ApiError> {
        let url = self.endpoint(&["stories", id])?;
        let envelope: DataEnvelope<Story> = self.get_json(url).await?;
        Ok(envelope.data)
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<Post, ApiError> {
        let url = self.endpoint(&["posts"])?;
        let request = self.request(Method::POST, url).multipart(draft.to_form()?);
        let envelope: DataEnvelope<Post> = self.send_json(request).await?;
        Ok(envelope.data)
    }

    async fn create_story(&self, draft: &StoryDraft) -> Result<Story, ApiError> {
        let url = self.endpoint(&["stories"])?;
        let request = self.request(Method::POST, url).multipart(draft.to_form()?);
        let envelope: DataEnvelope<Story> = self.send_json(request).await?;
        Ok(envelope.data)
    }

    async fn like_post(&self, id: &str) -> Result<Vec<String>, ApiError> {
        self.toggle_like("posts", id).await
    }

    async fn like_story(&self, id: &str) -> Result<Vec<String>, ApiError> {
        self.toggle_like("stories", id).await
    }

    async fn add_comment(&self, post_id: &str, content: &str) -> Result<Comment, ApiError> {
        let url = self.endpoint(&["posts", post_id, "comments"])?;
        let request = self
            .request(Method::POST, url)
            .json(&serde_json::json!({ "content": content }));
        let envelope: DataEnvelope<Comment> = self.send_json(request).await?;
        Ok(envelope.data)
    }

    async fn delete_post(&self, id: &str) -> Result<(), ApiError> {
        self.delete("posts", id).await
    }

    async fn delete_story(&self, id: &str) -> Result<(), ApiError> {
        self.delete("stories", id).await
    }
}

/// Read a response body, refusing anything larger than `MAX_RESPONSE_SIZE`.
async fn read_limited_bytes(response: reqwest::Response) -> Result<Vec<u8>, ApiError> {
    if let Some(len) = response.content_length() {
        if len as usize > MAX_RESPONSE_SIZE {
            return Err(ApiError::Decode(format!("response too large ({len} bytes)")));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > MAX_RESPONSE_SIZE {
            return Err(ApiError::Decode("response too large".to_string()));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
