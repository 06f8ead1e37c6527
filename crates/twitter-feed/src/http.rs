use crate::prelude::*;
use async_trait::async_trait;
use easy_ext::ext;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use reqwest_middleware::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub(crate) mod prelude {
    pub(crate) use super::RequestBuilderExt;
}

pub(crate) type Client = reqwest_middleware::ClientWithMiddleware;

/// The header the provider uses to announce when an exhausted rate-limit
/// window opens again (unix seconds).
const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

/// Fallback wait when a 429 response carries no usable reset header.
const RATE_LIMIT_FALLBACK_WAIT: Duration = Duration::from_secs(60);

pub(crate) fn create_client() -> Client {
    reqwest_middleware::ClientBuilder::new(reqwest::Client::new())
        .with(ObservingMiddleware)
        .with_init(|request_builder: RequestBuilder| {
            request_builder.header(
                "User-Agent",
                concat!("tweetfeed/", env!("CARGO_PKG_VERSION")),
            )
        })
        .build()
}

struct ObservingMiddleware;

#[async_trait]
impl reqwest_middleware::Middleware for ObservingMiddleware {
    async fn handle(
        &self,
        request: reqwest::Request,
        extensions: &mut task_local_extensions::Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let method = request.method().clone();
        let url = request.url().clone();

        let start = Instant::now();
        let result = next.run(request, extensions).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), ?elapsed, "network request finished");
            }
            Err(err) => {
                warn!(%method, %url, ?elapsed, err = %err.display_chain(), "network request failed");
            }
        }

        result
    }
}

/// Errors at the layer of the HTTP API
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error("HTTP request failed")]
    Request { source: reqwest_middleware::Error },

    #[error("failed to read the HTTP response body")]
    ReadPayload { source: reqwest::Error },

    #[error("HTTP request failed (HTTP status code: {status}):\n{body}")]
    BadResponseStatusCode { status: StatusCode, body: String },

    #[error("received an unexpected response JSON object")]
    UnexpectedResponseJsonShape { source: serde_json::Error },
}

impl HttpClientError {
    pub(crate) fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::BadResponseStatusCode { status, .. } if *status == StatusCode::UNAUTHORIZED
        )
    }
}

#[ext(RequestBuilderExt)]
#[async_trait]
pub(crate) impl RequestBuilder {
    /// Sends the request and returns an error for error response status
    /// codes. A 429 is not an error here: the provider's rate limits are
    /// waited out transparently and the request is reissued once the window
    /// resets.
    async fn try_send(self) -> Result<reqwest::Response, HttpClientError> {
        let mut request = self;

        let response = loop {
            let next_attempt = request.try_clone();

            let response = request
                .send()
                .await
                .map_err(|source| HttpClientError::Request { source })?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                break response;
            }

            // A streaming-body request is not replayable. There are none in
            // this crate, but don't loop forever if one appears.
            let Some(reissue) = next_attempt else {
                break response;
            };

            let wait = rate_limit_reset_wait(response.headers());
            warn!(
                wait_secs = wait.as_secs(),
                "rate limit exhausted, waiting for the window to reset"
            );
            tokio::time::sleep(wait).await;

            request = reissue;
        };

        let status = response.status();

        if !status.is_client_error() && !status.is_server_error() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_else(|err| {
            format!(
                "could not collect the error response body: {}",
                err.display_chain()
            )
        });

        Err(HttpClientError::BadResponseStatusCode { status, body })
    }

    async fn read_json<Res: DeserializeOwned>(self) -> Result<Res, HttpClientError> {
        let bytes = self
            .try_send()
            .await?
            .bytes()
            .await
            .map_err(|source| HttpClientError::ReadPayload { source })?;

        serde_json::from_slice(&bytes).map_err(|err| {
            match std::str::from_utf8(&bytes) {
                Ok(response_body) => warn!(%response_body, "bad JSON response"),
                Err(utf8_decode_err) => warn!(
                    response_body = ?bytes,
                    ?utf8_decode_err,
                    "bad JSON response"
                ),
            };
            HttpClientError::UnexpectedResponseJsonShape { source: err }
        })
    }
}

/// How long to sleep before reissuing a rate-limited request. A reset
/// instant in the past means the window already reopened; a second of slack
/// is kept so the reissue lands after the boundary.
fn rate_limit_reset_wait(headers: &HeaderMap) -> Duration {
    let reset_at = headers
        .get(RATE_LIMIT_RESET_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    let Some(reset_at) = reset_at else {
        return RATE_LIMIT_FALLBACK_WAIT;
    };

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("BUG: system clock is set before the unix epoch")
        .as_secs();

    Duration::from_secs(reset_at.saturating_sub(now)) + Duration::from_secs(1)
}
