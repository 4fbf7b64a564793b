// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! OpenAI client for embeddings and chat completions

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use crate::config::environment::{OpenAiConfig, ServiceConfig};
use crate::constants::endpoints::{OPENAI_CHAT_COMPLETIONS, OPENAI_EMBEDDINGS};
use crate::errors::{TrainerError, TrainerResult};
use crate::knowledge_base::EmbeddingProvider;
use crate::logging::AppLogger;
use crate::providers::{with_retry, CallFailure, RetryPolicy};
use crate::research::LanguageModel;

const SYSTEM_PROMPT: &str = "You are a concise, evidence-based strength and conditioning coach.";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiClient {
    client: Client,
    api_base: Url,
    api_key: String,
    embedding_model: String,
    embedding_dimension: usize,
    chat_model: String,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn new(
        config: &OpenAiConfig,
        api_key: impl Into<String>,
        request_timeout: Duration,
        retry: RetryPolicy,
    ) -> TrainerResult<Self> {
        let base = if config.api_base.ends_with('/') {
            config.api_base.clone()
        } else {
            format!("{}/", config.api_base)
        };
        let api_base = Url::parse(&base)
            .map_err(|e| {
                TrainerError::configuration(format!("invalid OpenAI API base {base}: {e}"))
            })?;
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TrainerError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base,
            api_key: api_key.into(),
            embedding_model: config.embedding_model.clone(),
            embedding_dimension: config.embedding_dimension,
            chat_model: config.chat_model.clone(),
            retry,
        })
    }

    /// `None` when no API key is configured
    pub fn from_config(config: &ServiceConfig) -> TrainerResult<Option<Self>> {
        match config.openai.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Self::new(
                &config.openai,
                key,
                config.request_timeout(),
                RetryPolicy::from(&config.retry),
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    async fn post_once<B, R>(
        &self,
        url: &Url,
        body: &B,
        wrap: fn(String) -> TrainerError,
    ) -> Result<R, CallFailure>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                CallFailure::from_reqwest(&e, wrap(format!("request to {url} failed: {e}")))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallFailure::from_status(
                status,
                wrap(format!("OpenAI returned {status}: {body}")),
            ));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| CallFailure::permanent(wrap(format!("malformed OpenAI response: {e}"))))
    }

    async fn post<B, R>(
        &self,
        endpoint: &str,
        body: &B,
        wrap: fn(String) -> TrainerError,
    ) -> TrainerResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self
            .api_base
            .join(endpoint)
            .map_err(|e| wrap(format!("invalid endpoint {endpoint}: {e}")))?;
        let started = Instant::now();
        let result =
            with_retry(self.retry, endpoint, || self.post_once::<B, R>(&url, body, wrap)).await;
        AppLogger::log_provider_call(
            "openai",
            endpoint,
            result.is_ok(),
            started.elapsed().as_millis() as u64,
        );
        result
    }
}

fn embedding_error(message: String) -> TrainerError {
    TrainerError::embedding(message)
}

fn provider_error(message: String) -> TrainerError {
    TrainerError::provider(message)
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> TrainerResult<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| TrainerError::embedding("OpenAI returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> TrainerResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let mut response: EmbeddingResponse = self
            .post(OPENAI_EMBEDDINGS, &request, embedding_error)
            .await?;

        if response.data.len() != texts.len() {
            return Err(TrainerError::embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }
        response.data.sort_by_key(|d| d.index);

        let vectors: Vec<Vec<f32>> = response.data.into_iter().map(|d| d.embedding).collect();
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.embedding_dimension) {
            return Err(TrainerError::embedding(format!(
                "expected dimension {}, got {}",
                self.embedding_dimension,
                bad.len()
            )));
        }
        debug!(count = vectors.len(), model = %self.embedding_model, "Embedded texts");
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.embedding_dimension
    }

    fn model_name(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, prompt: &str) -> TrainerResult<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };
        let response: ChatResponse = self
            .post(OPENAI_CHAT_COMPLETIONS, &request, provider_error)
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| TrainerError::provider("OpenAI returned an empty completion"))
    }

    fn model_name(&self) -> &str {
        &self.chat_model
    }
}
