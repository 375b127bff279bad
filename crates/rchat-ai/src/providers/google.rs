//! Google Generative AI (Gemini) gateway

use crate::{
    error::{Error, GatewayError, Result},
    providers::ResponseGateway,
    stream::{ReplyEvent, ReplyStream, collect_reply},
    types::{FinishReason, GatewayConfig, GenerationConfig, Usage},
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

/// Environment variables consulted for the API key, in order
pub const API_KEY_ENV_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Gemini client implementing [`ResponseGateway`]
pub struct GeminiGateway {
    client: reqwest::Client,
    api_key: HeaderValue,
    config: GatewayConfig,
}

impl std::fmt::Debug for GeminiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GeminiGateway {
    /// Create a gateway with an explicit API key
    pub fn new(api_key: impl Into<String>, config: GatewayConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::InvalidApiKey);
        }
        // Header, not query string: transport errors print the request URL
        let mut api_key =
            HeaderValue::from_str(api_key.trim()).map_err(|_| Error::InvalidApiKey)?;
        api_key.set_sensitive(true);
        config.generation.validate()?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            config,
        })
    }

    /// The configuration this gateway sends with every request
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Stream a reply to a single prompt
    pub fn stream(&self, prompt: &str) -> Result<ReplyStream> {
        let request = build_request(prompt, &self.config.generation);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-goog-api-key"),
            self.api_key.clone(),
        );

        let request_builder = self
            .client
            .post(self.endpoint())
            .headers(headers)
            .json(&request);

        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source)))
    }
}

#[async_trait]
impl ResponseGateway for GeminiGateway {
    async fn send(&self, prompt: &str) -> std::result::Result<String, GatewayError> {
        if prompt.trim().is_empty() {
            return Err(GatewayError::InputInvalid("prompt is empty".into()));
        }

        tracing::debug!(
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            "sending prompt"
        );

        let reply = collect_reply(self.stream(prompt)?).await;
        match &reply {
            Ok(text) => tracing::debug!(reply_chars = text.chars().count(), "reply received"),
            Err(e) => tracing::warn!(error = %e, "gateway request failed"),
        }
        reply.map_err(GatewayError::from)
    }
}

fn build_request(prompt: &str, generation: &GenerationConfig) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart {
                text: prompt.to_string(),
            }],
        }],
        generation_config: GeminiGenerationConfig {
            temperature: generation.temperature,
            top_p: generation.top_p,
            top_k: generation.top_k,
            max_output_tokens: generation.max_output_tokens,
            response_mime_type: generation.response_format.mime_type().to_string(),
        },
    }
}

/// What one SSE data frame contributed to the reply
#[derive(Debug, Default, PartialEq)]
struct DecodedChunk {
    deltas: Vec<String>,
    finish_reason: Option<String>,
    usage: Option<Usage>,
}

fn decode_chunk(data: &str) -> std::result::Result<DecodedChunk, ReplyEvent> {
    let response = match serde_json::from_str::<GeminiStreamResponse>(data) {
        Ok(response) => response,
        Err(e) => {
            return Err(match serde_json::from_str::<GeminiErrorResponse>(data) {
                Ok(body) => body.error.into_event(),
                Err(_) => ReplyEvent::Error {
                    status: None,
                    message: format!("Failed to parse chunk: {}", e),
                },
            });
        }
    };

    if let Some(error) = response.error {
        return Err(error.into_event());
    }

    let mut chunk = DecodedChunk::default();
    for candidate in response.candidates {
        if let Some(content) = candidate.content {
            chunk.deltas.extend(
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .filter(|text| !text.is_empty()),
            );
        }
        if candidate.finish_reason.is_some() {
            chunk.finish_reason = candidate.finish_reason;
        }
    }
    chunk.usage = response.usage_metadata.map(|usage| Usage {
        prompt: usage.prompt_token_count.unwrap_or(0),
        reply: usage.candidates_token_count.unwrap_or(0),
    });
    Ok(chunk)
}

async fn error_from_response(status: reqwest::StatusCode, response: reqwest::Response) -> ReplyEvent {
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<GeminiErrorResponse>(&body) {
        Ok(parsed) => parsed.error.into_event(),
        Err(_) => ReplyEvent::Error {
            status: Some(status.as_u16().to_string()),
            message: if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            },
        },
    }
}

fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = ReplyEvent> {
    stream! {
        let mut finish_reason: Option<String> = None;
        let mut usage = Usage::default();

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data.trim().is_empty() {
                        continue;
                    }
                    match decode_chunk(&msg.data) {
                        Ok(chunk) => {
                            for delta in chunk.deltas {
                                yield ReplyEvent::TextDelta { delta };
                            }
                            if chunk.finish_reason.is_some() {
                                finish_reason = chunk.finish_reason;
                            }
                            if let Some(u) = chunk.usage {
                                usage = u;
                            }
                        }
                        Err(error_event) => {
                            event_source.close();
                            yield error_event;
                            return;
                        }
                    }
                }
                // The server closing the stream is the normal end of a reply.
                // Without close() the event source would reconnect.
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    event_source.close();
                    yield error_from_response(status, response).await;
                    return;
                }
                Err(reqwest_eventsource::Error::Transport(e)) => {
                    event_source.close();
                    yield ReplyEvent::Error {
                        status: None,
                        message: e.without_url().to_string(),
                    };
                    return;
                }
                Err(e) => {
                    event_source.close();
                    yield ReplyEvent::Error {
                        status: None,
                        message: e.to_string(),
                    };
                    return;
                }
            }
        }
        event_source.close();

        yield ReplyEvent::Done {
            finish_reason: finish_reason.as_deref().map(FinishReason::from_gemini),
            usage,
        };
    }
}

// Request types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: String,
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    code: Option<u16>,
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiError {
    fn into_event(self) -> ReplyEvent {
        let status = self
            .status
            .or_else(|| self.code.map(|code| code.to_string()));
        ReplyEvent::Error {
            status,
            message: self.message,
        }
    }
}
