//! OpenRouter chat-completions client.
//!
//! Sends `POST /api/v1/chat/completions` with `stream: true` and hands back
//! the live response once upstream has answered with a success status.

use reqwest::{Client, Response};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ChatMessage, CompletionRequest, RelayError};

/// Default OpenRouter chat-completions endpoint.
pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Serialize)]
struct UpstreamBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// Client for the upstream completion endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: Client,
    url: String,
}

impl OpenRouterClient {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Start a streamed completion.
    ///
    /// Returns the upstream response with its body unread. On a non-success
    /// status the error body is read for the log and dropped. Cancelling
    /// `cancel` at any point before this returns aborts the upstream request.
    pub async fn open(
        &self,
        api_key: &str,
        referer: &str,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<Response, RelayError> {
        let send = self
            .http
            .post(&self.url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", referer)
            .json(&UpstreamBody {
                model: &request.model,
                messages: &request.messages,
                stream: true,
            })
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RelayError::Cancelled),
            result = send => result?,
        };

        let status = response.status();
        if status.is_success() {
            debug!(model = %request.model, status = status.as_u16(), "upstream stream opened");
            return Ok(response);
        }

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RelayError::Cancelled),
            text = response.text() => text.unwrap_or_else(|_| "<no body>".to_string()),
        };
        warn!(
            model = %request.model,
            status = status.as_u16(),
            body = %body,
            "upstream completion request failed"
        );
        Err(RelayError::Upstream {
            status: status.as_u16(),
        })
    }
}
