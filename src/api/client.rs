use std::{borrow::Cow, io::Read, time::Duration};

use async_trait::async_trait;
use flate2::read::GzDecoder;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::{config::ApiConfig, domain::FetchDescriptor};

use super::{
    retry::{retry_bounded, RetryOutcome},
    wire::ApiResponse,
    FetchOutcome, PostFetcher,
};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("failed to decompress response body")]
    Decompress(#[from] std::io::Error),
    #[error("failed to decode response body")]
    Decode(#[from] serde_json::Error),
}

/// Stack Exchange API client that retries empty results and reports advertised backoff.
pub struct ApiFetcher {
    http: Client,
    config: ApiConfig,
}

impl ApiFetcher {
    pub fn new(http: Client, config: ApiConfig) -> Self {
        Self { http, config }
    }

    fn request_url(&self, descriptor: &FetchDescriptor) -> Url {
        let mut url = descriptor.url.clone();
        if let Some(key) = &self.config.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        url
    }

    async fn fetch_once(&self, url: &Url) -> Result<ApiResponse, FetchError> {
        let response = self
            .http
            .get(url.clone())
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        // the API reports throttling and bad parameters in a JSON envelope with a 4xx status
        let parsed = decode_body(&bytes)
            .map_err(FetchError::from)
            .and_then(|body| serde_json::from_slice::<ApiResponse>(&body).map_err(FetchError::from));
        match parsed {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(FetchError::Status(status)),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl PostFetcher for ApiFetcher {
    async fn fetch(&self, descriptor: &FetchDescriptor) -> FetchOutcome {
        let url = self.request_url(descriptor);
        let last_backoff: Mutex<Option<u64>> = Mutex::new(None);

        let outcome = retry_bounded(
            self.config.max_attempts,
            self.config.retry_interval,
            |attempt| {
                let url = &url;
                let last_backoff = &last_backoff;
                async move {
                    let response = match self.fetch_once(url).await {
                        Ok(response) => response,
                        Err(err) => {
                            tracing::warn!(
                                target: "fetcher",
                                error = %err,
                                attempt,
                                site = %descriptor.site,
                                post_id = descriptor.post_id,
                                "API request failed"
                            );
                            return None;
                        }
                    };

                    if let Some(seconds) = response.backoff {
                        *last_backoff.lock() = Some(seconds);
                    }
                    if let Some(error_id) = response.error_id {
                        tracing::warn!(
                            target: "fetcher",
                            error_id,
                            error_name = response.error_name.as_deref().unwrap_or("-"),
                            message = response.error_message.as_deref().unwrap_or("-"),
                            attempt,
                            "API returned an error"
                        );
                    }
                    tracing::debug!(
                        target: "fetcher",
                        attempt,
                        items = response.items.len(),
                        quota_remaining = response.quota_remaining,
                        "API response"
                    );

                    let item = response.items.into_iter().next();
                    if item.is_none() {
                        tracing::debug!(
                            target: "fetcher",
                            attempt,
                            site = %descriptor.site,
                            post_id = descriptor.post_id,
                            "empty result, will retry"
                        );
                    }
                    item
                }
            },
        )
        .await;

        let post = match outcome {
            RetryOutcome::Success(item) => Some(item.into_post()),
            RetryOutcome::Exhausted => {
                tracing::warn!(
                    target: "fetcher",
                    attempts = self.config.max_attempts,
                    site = %descriptor.site,
                    post_id = descriptor.post_id,
                    kind = descriptor.kind.label(),
                    "giving up on post after empty results"
                );
                None
            }
        };

        let backoff = last_backoff.into_inner().map(Duration::from_secs);
        FetchOutcome { post, backoff }
    }
}

fn decode_body(bytes: &[u8]) -> std::io::Result<Cow<'_, [u8]>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }
    let mut decoded = Vec::with_capacity(bytes.len() * 4);
    GzDecoder::new(bytes).read_to_end(&mut decoded)?;
    Ok(Cow::Owned(decoded))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{write::GzEncoder, Compression};
    use serde_json::json;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::domain::PostKind;

    fn test_config(base_url: String) -> ApiConfig {
        ApiConfig {
            base_url,
            api_key: Some("secret".into()),
            max_attempts: 6,
            retry_interval: Duration::from_millis(5),
            request_timeout: Duration::from_secs(5),
        }
    }

    fn question_item() -> serde_json::Value {
        json!({
            "title": "Cheap nike shoes",
            "body_markdown": "visit\r\nnow",
            "owner": {"reputation": 1},
            "link": "https://stackoverflow.com/q/42"
        })
    }

    fn fetcher_for(server: &MockServer) -> (ApiFetcher, FetchDescriptor) {
        let config = test_config(server.uri());
        let descriptor =
            FetchDescriptor::new(&config.base_url, "stackoverflow", 42, PostKind::Question).unwrap();
        (ApiFetcher::new(Client::new(), config), descriptor)
    }

    #[tokio::test]
    async fn returns_item_from_sixth_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/questions/42"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .up_to_n_times(5)
            .expect(5)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/questions/42"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": [question_item()], "backoff": 3})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (fetcher, descriptor) = fetcher_for(&server);
        let outcome = fetcher.fetch(&descriptor).await;

        let post = outcome.post.expect("post from sixth attempt");
        assert_eq!(post.body, "Cheap nike shoes\nvisit\nnow");
        assert_eq!(post.author_reputation, 1);
        assert_eq!(post.permalink, "https://stackoverflow.com/q/42");
        assert_eq!(outcome.backoff, Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn gives_up_after_six_empty_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/questions/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(6)
            .mount(&server)
            .await;

        let (fetcher, descriptor) = fetcher_for(&server);
        let outcome = fetcher.fetch(&descriptor).await;

        assert!(outcome.post.is_none());
        assert!(outcome.backoff.is_none());
    }

    #[tokio::test]
    async fn server_error_counts_as_an_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/questions/42"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/questions/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [question_item()]})))
            .expect(1)
            .mount(&server)
            .await;

        let (fetcher, descriptor) = fetcher_for(&server);
        let outcome = fetcher.fetch(&descriptor).await;

        assert!(outcome.post.is_some());
        assert!(outcome.backoff.is_none());
    }

    #[tokio::test]
    async fn decodes_gzip_body_without_content_encoding() {
        let payload = serde_json::to_vec(&json!({"items": [question_item()], "backoff": 10})).unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&payload).unwrap();
        let compressed = encoder.finish().unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/questions/42"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(compressed))
            .expect(1)
            .mount(&server)
            .await;

        let (fetcher, descriptor) = fetcher_for(&server);
        let outcome = fetcher.fetch(&descriptor).await;

        assert_eq!(outcome.post.unwrap().permalink, "https://stackoverflow.com/q/42");
        assert_eq!(outcome.backoff, Some(Duration::from_secs(10)));
    }

    #[test]
    fn key_is_appended_only_when_configured() {
        let mut config = test_config("https://api.stackexchange.com/2.2".into());
        let descriptor =
            FetchDescriptor::new(&config.base_url, "stackoverflow", 42, PostKind::Question).unwrap();

        let fetcher = ApiFetcher::new(Client::new(), config.clone());
        let url = fetcher.request_url(&descriptor);
        assert!(url.query_pairs().any(|(k, v)| k == "key" && v == "secret"));

        config.api_key = None;
        let fetcher = ApiFetcher::new(Client::new(), config);
        assert!(!fetcher.request_url(&descriptor).query_pairs().any(|(k, _)| k == "key"));
    }
}
