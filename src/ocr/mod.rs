//! Vision-model OCR client.
//!
//! Builds one chat-completions payload per request (prompt plus the capture
//! re-encoded as a base64 JPEG data URL) and performs the HTTP call with a
//! bounded, fixed-delay retry. There is no backoff schedule: the bottleneck
//! is a single external call with no contention to back off from. Transport
//! errors, non-2xx statuses and well-formed responses without the expected
//! content field are all retryable within the budget; the terminal outcome
//! is an `OcrOutcome`, produced exactly once per request.
//!
//! Authorization uses a bearer credential read from the environment variable
//! named in `OcrConfig`. An absent credential is not validated here; it
//! surfaces as an authentication failure from the remote service.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::capture::CapturedImage;

/// Upper bound for the model's generated transcription.
const MAX_COMPLETION_TOKENS: u32 = 1000;
/// Low temperature: transcription, not prose.
const TEMPERATURE: f32 = 0.2;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("response is missing the generated text")]
    MissingContent,
    #[error("failed to encode capture as JPEG: {0}")]
    ImageEncoding(#[from] image::ImageError),
}

/// One recognition attempt's inputs. Constructed fresh per processing
/// attempt and never mutated.
#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub image: Arc<CapturedImage>,
    pub prompt: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

/// Terminal outcome of one `OcrRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    Success(String),
    Failure {
        reason: String,
        attempts_exhausted: bool,
    },
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
}

// --- Wire types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// --- Client ---

#[derive(Debug, Clone)]
pub struct OcrClient {
    client: Client,
    config: OcrConfig,
}

impl OcrClient {
    pub fn new(config: OcrConfig) -> Result<Self, OcrError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    /// Recognizes text in the request's capture. Attempts the call up to
    /// `max_retries` times (inclusive of the first; a zero budget still gets
    /// one attempt), sleeping `retry_delay` between attempts, and returns the
    /// first success or the last failure with the budget marked exhausted.
    pub async fn recognize(&self, request: &OcrRequest) -> OcrOutcome {
        let image_data_url = match encode_jpeg_data_url(&request.image) {
            Ok(url) => url,
            Err(e) => {
                return OcrOutcome::Failure {
                    reason: e.to_string(),
                    attempts_exhausted: false,
                }
            }
        };

        let payload = ChatRequest {
            model: &self.config.model,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: &request.prompt,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image_data_url,
                        },
                    },
                ],
            }],
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
        };

        let api_key = std::env::var(&self.config.api_key_env).unwrap_or_default();
        let attempts = request.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(request.retry_delay).await;
            }

            match self.attempt(&payload, &api_key).await {
                Ok(text) => {
                    debug!(attempt, "OCR attempt succeeded");
                    return OcrOutcome::Success(text);
                }
                Err(e) => {
                    warn!(attempt, max = attempts, error = %e, "OCR attempt failed");
                    last_error = e.to_string();
                }
            }
        }

        OcrOutcome::Failure {
            reason: last_error,
            attempts_exhausted: true,
        }
    }

    async fn attempt(&self, payload: &ChatRequest<'_>, api_key: &str) -> Result<String, OcrError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error response".to_string());
            return Err(OcrError::Status { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(OcrError::MissingContent)
    }
}

/// Re-encodes the capture as a lossy JPEG and wraps it in a base64 data URL.
/// Alpha is dropped; JPEG has no use for it.
fn encode_jpeg_data_url(capture: &CapturedImage) -> Result<String, OcrError> {
    let rgb = capture.image.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new(&mut Cursor::new(&mut jpeg)).encode_image(&rgb)?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: String, api_key_env: &str) -> OcrClient {
        OcrClient::new(OcrConfig {
            base_url,
            model: "gpt-4o-mini".to_string(),
            api_key_env: api_key_env.to_string(),
        })
        .unwrap()
    }

    fn test_request(max_retries: u32) -> OcrRequest {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            100,
            100,
            Rgba([255, 0, 0, 255]),
        ));
        OcrRequest {
            image: Arc::new(CapturedImage::new(image)),
            prompt: "Extract all text.".to_string(),
            max_retries,
            retry_delay: Duration::ZERO,
        }
    }

    fn success_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": text}}]
        })
    }

    #[tokio::test]
    async fn returns_text_on_first_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("HELLO")))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri(), "SNAPTEXT_TEST_KEY_UNSET");
        let outcome = client.recognize(&test_request(3)).await;
        assert_eq!(outcome, OcrOutcome::Success("HELLO".to_string()));
    }

    #[tokio::test]
    async fn always_failing_service_exhausts_the_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let client = test_client(server.uri(), "SNAPTEXT_TEST_KEY_UNSET");
        let outcome = client.recognize(&test_request(3)).await;

        match outcome {
            OcrOutcome::Failure {
                reason,
                attempts_exhausted,
            } => {
                assert!(attempts_exhausted);
                assert!(reason.contains("500"), "unexpected reason: {reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn stops_retrying_after_the_first_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("transient"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("SECOND")))
            .mount(&server)
            .await;

        let client = test_client(server.uri(), "SNAPTEXT_TEST_KEY_UNSET");
        let outcome = client.recognize(&test_request(3)).await;

        assert_eq!(outcome, OcrOutcome::Success("SECOND".to_string()));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_content_field_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("RECOVERED")))
            .mount(&server)
            .await;

        let client = test_client(server.uri(), "SNAPTEXT_TEST_KEY_UNSET");
        let outcome = client.recognize(&test_request(2)).await;

        assert_eq!(outcome, OcrOutcome::Success("RECOVERED".to_string()));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn zero_budget_still_performs_one_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("ONE")))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri(), "SNAPTEXT_TEST_KEY_UNSET");
        let outcome = client.recognize(&test_request(0)).await;
        assert_eq!(outcome, OcrOutcome::Success("ONE".to_string()));
    }

    #[tokio::test]
    async fn sends_bearer_credential_and_vision_payload() {
        std::env::set_var("SNAPTEXT_TEST_KEY_AUTH", "test-api-key");

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("OK")))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri(), "SNAPTEXT_TEST_KEY_AUTH");
        let request = test_request(1);
        let outcome = client.recognize(&request).await;
        assert_eq!(outcome, OcrOutcome::Success("OK".to_string()));

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 1000);
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "Extract all text.");
        assert_eq!(content[1]["type"], "image_url");
        let url = content[1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }
}
