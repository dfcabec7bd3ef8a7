use anyhow::Result;
use futures::stream::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use tracing::debug;

use crate::config::AiConfig;
use crate::models::chat::ChatMessage;
use crate::utils::error::ApiError;

pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Upstream generative-AI seam. Every feature handler talks to this trait,
/// never to the HTTP client directly.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
    async fn generate_stream(&self, messages: &[ChatMessage]) -> Result<TextStream>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChoiceChunk>,
}

#[derive(Debug, Deserialize)]
struct ChoiceChunk {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Incremental decoder for SSE-framed completion deltas.
/// A network read may carry several `data:` lines, or cut one in half;
/// complete lines yield their deltas immediately, the trailing partial line
/// is buffered until the next read.
struct SseDeltaDecoder {
    buffer: String,
    done: bool,
}

impl SseDeltaDecoder {
    fn new() -> Self {
        Self {
            buffer: String::new(),
            done: false,
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one network chunk, returning every delta completed by it.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.done {
            return deltas;
        }

        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end();

            let Some(json_str) = line.strip_prefix("data: ") else {
                continue;
            };
            if json_str == "[DONE]" {
                self.done = true;
                self.buffer.clear();
                break;
            }

            if let Ok(chunk) = serde_json::from_str::<ChatCompletionChunk>(json_str) {
                if let Some(content) = chunk.choices.first().and_then(|c| c.delta.content.as_ref())
                {
                    if !content.is_empty() {
                        deltas.push(content.clone());
                    }
                }
            }
        }

        deltas
    }
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct AiService {
    client: Client,
    config: AiConfig,
}

impl AiService {
    pub fn new(config: AiConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_seconds))
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }

    fn request(&self, messages: Vec<ChatMessage>, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream,
        }
    }

    /// Generate completion without streaming (wait for full response)
    pub async fn generate_chat(&self, messages: Vec<ChatMessage>) -> Result<String, ApiError> {
        debug!("Starting chat generation with {} messages", messages.len());

        let request = self.request(messages, false);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::AiError(format!("Failed to call AI API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::AiError(format!(
                "AI API error: {} - {}",
                status, body
            )));
        }

        #[derive(Deserialize)]
        struct ChatCompletionResponse {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct Message {
            content: String,
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::AiError(format!("Failed to parse AI response: {}", e)))?;

        chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| ApiError::AiError("No choices returned from AI API".to_string()))
    }

    /// Generate completion with streaming (SSE-framed deltas)
    pub async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String, ApiError>> + Send>>, ApiError> {
        debug!("Starting chat stream with {} messages", messages.len());

        let request = self.request(messages, true);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::AiError(format!("Failed to call AI API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::AiError(format!(
                "AI API error: {} - {}",
                status, body
            )));
        }

        let stream = response.bytes_stream();

        // Parse SSE framing: "data: {...}\n\n", terminated by "data: [DONE]".
        // Upstreams batch several events per network read and split events
        // across reads, so decoding is incremental: every complete line in a
        // chunk is parsed and queued, partial lines carry over.
        let parsed_stream = futures::stream::unfold(
            (stream, SseDeltaDecoder::new(), VecDeque::<String>::new()),
            |(mut stream, mut decoder, mut pending)| async move {
                use futures::StreamExt;

                loop {
                    if let Some(delta) = pending.pop_front() {
                        return Some((Ok(delta), (stream, decoder, pending)));
                    }
                    if decoder.is_done() {
                        return None;
                    }

                    match stream.next().await {
                        Some(Ok(bytes)) => pending.extend(decoder.push(&bytes)),
                        Some(Err(e)) => {
                            return Some((
                                Err(ApiError::AiError(format!("Stream error: {}", e))),
                                (stream, decoder, pending),
                            ));
                        }
                        None => return None,
                    }
                }
            },
        );

        Ok(Box::pin(parsed_stream))
    }
}

#[async_trait::async_trait]
impl AiProvider for AiService {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        self.generate_chat(messages.to_vec())
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn generate_stream(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        use futures::StreamExt;

        let stream = self
            .chat_stream(messages.to_vec())
            .await
            .map_err(|e| anyhow::anyhow!(e))?;

        let mapped_stream = stream.map(|item| item.map_err(|e| anyhow::anyhow!(e)));

        Ok(Box::pin(mapped_stream))
    }
}
