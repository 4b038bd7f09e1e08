use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::item::ItemKind;

/// Something that turns a per-kind prompt over `segment_text` into raw model text.
///
/// One call in, one result out, no shared mutable state, so decorators such as
/// [`RetryingClient`] can wrap any implementation.
pub trait GenerationClient: Send + Sync {
    fn generate(
        &self,
        kind: ItemKind,
        segment_text: &str,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

impl<G: GenerationClient> GenerationClient for &G {
    async fn generate(&self, kind: ItemKind, segment_text: &str) -> Result<String, GenerationError> {
        (**self).generate(kind, segment_text).await
    }
}

// ── OpenAI-compatible chat completions ──

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

impl GenerationClient for OpenAiClient {
    async fn generate(&self, kind: ItemKind, segment_text: &str) -> Result<String, GenerationError> {
        let prompt = kind.prompt(segment_text);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: &prompt }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Request {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        debug!(kind = %kind, choices = parsed.choices.len(), "Model response received");
        content_of(parsed)
    }
}

/// First choice's content with surrounding whitespace stripped.
fn content_of(response: ChatResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

// ── Retry decorator ──

/// Retries transient failures of the wrapped client with exponential backoff.
/// With `max_retries == 0` every call passes straight through.
pub struct RetryingClient<G> {
    inner: G,
    max_retries: u32,
    base_backoff: Duration,
}

impl<G: GenerationClient> RetryingClient<G> {
    pub fn new(inner: G, max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_backoff,
        }
    }
}

impl<G: GenerationClient> GenerationClient for RetryingClient<G> {
    async fn generate(&self, kind: ItemKind, segment_text: &str) -> Result<String, GenerationError> {
        let mut attempt = 0u32;
        loop {
            match self.inner.generate(kind, segment_text).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let backoff = self.base_backoff * 2u32.pow(attempt);
                    warn!(
                        "Generation failed for {} (attempt {}/{}): {}; backing off {:.1}s",
                        kind,
                        attempt + 1,
                        self.max_retries,
                        e,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Flaky {
        responses: Mutex<VecDeque<Result<String, GenerationError>>>,
        calls: Mutex<usize>,
    }

    impl Flaky {
        fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl GenerationClient for Flaky {
        async fn generate(&self, _kind: ItemKind, _text: &str) -> Result<String, GenerationError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GenerationError::EmptyResponse))
        }
    }

    fn rate_limited() -> Result<String, GenerationError> {
        Err(GenerationError::Request { status: 429, message: "slow down".into() })
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let inner = Flaky::new(vec![rate_limited(), rate_limited(), Ok("A) ok".into())]);
        let client = RetryingClient::new(&inner, 3, Duration::from_millis(1));
        let out = client.generate(ItemKind::MultipleChoice, "text").await.unwrap();
        assert_eq!(out, "A) ok");
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let inner = Flaky::new(vec![rate_limited(), rate_limited(), rate_limited()]);
        let client = RetryingClient::new(&inner, 1, Duration::from_millis(1));
        let err = client.generate(ItemKind::TrueFalse, "text").await.unwrap_err();
        assert!(matches!(err, GenerationError::Request { status: 429, .. }));
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let inner = Flaky::new(vec![
            Err(GenerationError::Request { status: 401, message: "bad key".into() }),
            Ok("never reached".into()),
        ]);
        let client = RetryingClient::new(&inner, 5, Duration::from_millis(1));
        assert!(client.generate(ItemKind::FillBlank, "text").await.is_err());
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn zero_retries_is_pass_through() {
        let inner = Flaky::new(vec![rate_limited(), Ok("later".into())]);
        let client = RetryingClient::new(&inner, 0, Duration::from_millis(1));
        assert!(client.generate(ItemKind::FillBlank, "text").await.is_err());
        assert_eq!(inner.calls(), 1);
    }

    #[test]
    fn content_is_trimmed_and_blank_is_empty() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"\n  A) Chlorophyll captures light \n"}}]}"#,
        )
        .unwrap();
        assert_eq!(content_of(resp).unwrap(), "A) Chlorophyll captures light");

        let blank: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"   "}}]}"#).unwrap();
        assert!(matches!(content_of(blank), Err(GenerationError::EmptyResponse)));

        let none: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(content_of(none), Err(GenerationError::EmptyResponse)));
    }

    #[test]
    fn endpoint_joins_base_without_double_slash() {
        let c = OpenAiClient::new("http://localhost:8080/v1/", "k", "m", Duration::from_secs(1)).unwrap();
        assert_eq!(c.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
