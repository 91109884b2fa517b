//! Google generative language API provider.
//!
//! Speaks the `v1beta` REST dialect: `generateContent` for completions,
//! `streamGenerateContent?alt=sse` for streaming, `batchEmbedContents` for
//! embeddings.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::config::settings::{EmbeddingSettings, LlmSettings};
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(llm: &LlmSettings, embedding: &EmbeddingSettings) -> Result<Self, ApiError> {
        let api_key = llm
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ApiError::Config("llm.api_key is required for the gemini provider".to_string())
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(llm.request_timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model: llm.chat_model.clone(),
            embedding_model: embedding.model.clone(),
            client,
        })
    }

    fn model_url(&self, model: &str, action: &str, query: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}?key={}{}",
            self.base_url, model, action, self.api_key, query
        )
    }

    fn contents(request: &ChatRequest) -> Value {
        let turns: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();
        json!(turns)
    }
}

pub(crate) fn candidate_text(payload: &Value) -> Option<String> {
    let text = payload["candidates"][0]["content"]["parts"][0]["text"].as_str()?;
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/v1beta/models?key={}", self.base_url, self.api_key);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let url = self.model_url(&self.chat_model, "generateContent", "");
        let body = json!({ "contents": Self::contents(&request) });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::generation)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Generation(format!("chat request failed: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::generation)?;
        candidate_text(&payload)
            .ok_or_else(|| ApiError::Generation("empty completion returned".to_string()))
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
        let url = self.model_url(&self.chat_model, "streamGenerateContent", "&alt=sse");
        let body = json!({ "contents": Self::contents(&request) });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::generation)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Generation(format!(
                "stream request failed: {}",
                text
            )));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        let chunk_str = String::from_utf8_lossy(&bytes);
                        for line in chunk_str.lines() {
                            let Some(data) = line.trim().strip_prefix("data: ") else {
                                continue;
                            };
                            let Ok(payload) = serde_json::from_str::<Value>(data) else {
                                continue;
                            };
                            if let Some(text) = candidate_text(&payload) {
                                if tx.send(Ok(text)).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(ApiError::generation(e))).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = self.model_url(&self.embedding_model, "batchEmbedContents", "");
        let requests: Vec<Value> = inputs
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{}", self.embedding_model),
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect();
        let body = json!({ "requests": requests });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("embed request failed: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;

        let mut embeddings = Vec::new();
        if let Some(entries) = payload["embeddings"].as_array() {
            for entry in entries {
                if let Some(vals) = entry["values"].as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    embeddings.push(vec);
                }
            }
        }

        if embeddings.len() != inputs.len() {
            return Err(ApiError::Internal(format!(
                "embed returned {} vectors for {} inputs",
                embeddings.len(),
                inputs.len()
            )));
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_candidate_text() {
        let payload = json!({
            "candidates": [{ "content": { "parts": [{ "text": "grounded answer" }] } }]
        });
        assert_eq!(candidate_text(&payload), Some("grounded answer".to_string()));
    }

    #[test]
    fn empty_candidate_is_none() {
        let payload = json!({ "candidates": [{ "content": { "parts": [{ "text": "" }] } }] });
        assert_eq!(candidate_text(&payload), None);

        let payload = json!({ "candidates": [] });
        assert_eq!(candidate_text(&payload), None);
    }

    #[test]
    fn assistant_role_maps_to_model() {
        let request = ChatRequest::new(vec![
            super::super::types::ChatMessage::user("question"),
            super::super::types::ChatMessage {
                role: "assistant".to_string(),
                content: "prior".to_string(),
            },
        ]);
        let contents = GeminiProvider::contents(&request);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
    }
}
