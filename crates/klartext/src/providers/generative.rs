//! Generative vision adapter.
//!
//! Sends the image as a data URL to a chat-completions endpoint and asks
//! the model to emit word-level results as a JSON array. Model output is
//! untrusted; the parser tolerates code fences and discards entries that
//! do not carry text, confidence, and a four-number box.

use crate::error::{KlartextError, Result};
use crate::providers::{ProviderAdapter, ProviderId};
use crate::types::{BoundingBox, RecognizedWord};
use async_trait::async_trait;
use base64::Engine;
use serde_json::{Value, json};

const COMPLETIONS_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const EXTRACTION_PROMPT: &str = "Extract every word visible in this image. Respond with only a \
JSON array, one object per word, each with the keys \"text\" (string), \"confidence\" (number \
between 0 and 1), and \"bbox\" (array of four numbers: left, top, right, bottom in pixels). \
Preserve reading order. Do not include any prose outside the JSON array.";

pub struct GenerativeVision {
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl GenerativeVision {
    pub fn new(api_key: Option<String>, model: Option<String>) -> Self {
        Self {
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for GenerativeVision {
    fn id(&self) -> ProviderId {
        ProviderId::GenerativeVision
    }

    fn description(&self) -> &'static str {
        "Generative multimodal extraction engine"
    }

    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn recognize(
        &self,
        image_bytes: &[u8],
        language_hint: &str,
        _enable_table_detection: bool,
    ) -> Result<Vec<RecognizedWord>> {
        let api_key = self.api_key.as_deref().ok_or(KlartextError::ProviderNotConfigured {
            provider: ProviderId::GenerativeVision,
        })?;

        let mime = infer::get(image_bytes)
            .map(|k| k.mime_type())
            .unwrap_or("image/png");
        let data_url = format!(
            "data:{};base64,{}",
            mime,
            base64::engine::general_purpose::STANDARD.encode(image_bytes)
        );

        let mut prompt = EXTRACTION_PROMPT.to_string();
        if language_hint != "auto" && !language_hint.is_empty() {
            prompt.push_str(&format!(" The document language is \"{language_hint}\"."));
        }
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }],
            "max_tokens": 4096,
            "temperature": 0,
        });

        let response = self
            .client
            .post(COMPLETIONS_ENDPOINT)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                KlartextError::provider_runtime_with_source(
                    ProviderId::GenerativeVision,
                    "completions request failed",
                    e,
                )
            })?;

        let status = response.status();
        let payload: Value = response.json().await.map_err(|e| {
            KlartextError::provider_runtime_with_source(
                ProviderId::GenerativeVision,
                "invalid completions response body",
                e,
            )
        })?;
        if !status.is_success() {
            return Err(KlartextError::provider_runtime(
                ProviderId::GenerativeVision,
                format!("completions request returned {status}: {payload}"),
            ));
        }

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                KlartextError::provider_runtime(
                    ProviderId::GenerativeVision,
                    "completions response carried no message content",
                )
            })?;
        parse_word_array(content)
    }
}

/// Parse the model reply into words, stripping markdown fences first.
fn parse_word_array(content: &str) -> Result<Vec<RecognizedWord>> {
    let trimmed = strip_code_fence(content);
    let value: Value = serde_json::from_str(trimmed).map_err(|e| {
        KlartextError::provider_runtime_with_source(
            ProviderId::GenerativeVision,
            "model reply was not valid JSON",
            e,
        )
    })?;
    let entries = value.as_array().ok_or_else(|| {
        KlartextError::provider_runtime(
            ProviderId::GenerativeVision,
            "model reply was not a JSON array",
        )
    })?;

    let mut words = Vec::new();
    for entry in entries {
        let Some(text) = entry["text"].as_str().filter(|t| !t.is_empty()) else {
            continue;
        };
        let Some(confidence) = entry["confidence"].as_f64() else {
            continue;
        };
        let Some(coords) = entry["bbox"].as_array().filter(|c| c.len() == 4) else {
            continue;
        };
        let nums: Vec<f32> = coords.iter().filter_map(|c| c.as_f64()).map(|c| c as f32).collect();
        if nums.len() != 4 {
            continue;
        }
        words.push(RecognizedWord::new(
            text,
            confidence.clamp(0.0, 1.0),
            BoundingBox::new(nums[0], nums[1], nums[2], nums[3]),
        ));
    }
    Ok(words)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_adapter_skips_network() {
        let adapter = GenerativeVision::new(None, None);
        assert!(!adapter.available());
        let err = adapter.recognize(b"img", "auto", false).await.unwrap_err();
        assert!(matches!(err, KlartextError::ProviderNotConfigured { .. }));
    }

    #[test]
    fn test_parse_word_array() {
        let reply = r#"[
            {"text": "Invoice", "confidence": 0.98, "bbox": [10, 10, 80, 30]},
            {"text": "Total", "confidence": 0.95, "bbox": [10, 40, 60, 60]}
        ]"#;
        let words = parse_word_array(reply).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "Invoice");
        assert_eq!(words[1].bbox, BoundingBox::new(10.0, 40.0, 60.0, 60.0));
    }

    #[test]
    fn test_parse_word_array_strips_fences_and_bad_entries() {
        let reply = "```json\n[{\"text\": \"ok\", \"confidence\": 1.2, \"bbox\": [0, 0, 1, 1]},\n {\"text\": \"\", \"confidence\": 0.5, \"bbox\": [0, 0, 1, 1]},\n {\"text\": \"nobox\", \"confidence\": 0.5}]\n```";
        let words = parse_word_array(reply).unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "ok");
        assert_eq!(words[0].confidence, 1.0);
    }

    #[test]
    fn test_parse_word_array_rejects_prose() {
        let err = parse_word_array("Sure, here are the words!").unwrap_err();
        assert!(matches!(err, KlartextError::ProviderRuntime { .. }));
    }
}
