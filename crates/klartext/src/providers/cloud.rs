//! Cloud vision adapters.
//!
//! `cloud-vision-a` speaks an annotate-style document-text API (base64
//! image in a JSON envelope, word geometry as polygon vertices);
//! `cloud-vision-b` speaks a classic OCR endpoint (binary body,
//! region/line/word hierarchy with `x,y,w,h` boxes). Both report
//! availability purely from credential presence and never touch the
//! network when unconfigured.

use crate::error::{KlartextError, Result};
use crate::providers::{ProviderAdapter, ProviderId};
use crate::types::{BoundingBox, RecognizedWord};
use async_trait::async_trait;
use base64::Engine;
use serde_json::{Value, json};

const ANNOTATE_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// The region/line/word API reports no per-word confidence; integrations
/// conventionally assign a fixed high value.
const DEFAULT_WORD_CONFIDENCE: f64 = 0.95;

pub struct CloudVisionA {
    api_key: Option<String>,
    client: reqwest::Client,
}

impl CloudVisionA {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for CloudVisionA {
    fn id(&self) -> ProviderId {
        ProviderId::CloudVisionA
    }

    fn description(&self) -> &'static str {
        "Cloud document-text annotation engine"
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
            provider: ProviderId::CloudVisionA,
        })?;

        let mut image_context = json!({});
        if language_hint != "auto" && !language_hint.is_empty() {
            image_context = json!({ "languageHints": [language_hint] });
        }
        let body = json!({
            "requests": [{
                "image": {
                    "content": base64::engine::general_purpose::STANDARD.encode(image_bytes)
                },
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }],
                "imageContext": image_context,
            }]
        });

        let url = format!("{ANNOTATE_ENDPOINT}?key={api_key}");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                KlartextError::provider_runtime_with_source(
                    ProviderId::CloudVisionA,
                    "annotate request failed",
                    e,
                )
            })?;

        let status = response.status();
        let payload: Value = response.json().await.map_err(|e| {
            KlartextError::provider_runtime_with_source(
                ProviderId::CloudVisionA,
                "invalid annotate response body",
                e,
            )
        })?;
        if !status.is_success() {
            return Err(KlartextError::provider_runtime(
                ProviderId::CloudVisionA,
                format!("annotate request returned {status}: {payload}"),
            ));
        }

        parse_annotate_response(&payload)
    }
}

/// Walk `responses[0].fullTextAnnotation.pages/blocks/paragraphs/words`.
fn parse_annotate_response(payload: &Value) -> Result<Vec<RecognizedWord>> {
    let response = &payload["responses"][0];
    if let Some(error) = response.get("error") {
        return Err(KlartextError::provider_runtime(
            ProviderId::CloudVisionA,
            format!("annotate error: {error}"),
        ));
    }

    let mut words = Vec::new();
    let pages = response["fullTextAnnotation"]["pages"].as_array();
    for page in pages.into_iter().flatten() {
        for block in page["blocks"].as_array().into_iter().flatten() {
            for paragraph in block["paragraphs"].as_array().into_iter().flatten() {
                for word in paragraph["words"].as_array().into_iter().flatten() {
                    if let Some(parsed) = parse_annotate_word(word) {
                        words.push(parsed);
                    }
                }
            }
        }
    }
    Ok(words)
}

fn parse_annotate_word(word: &Value) -> Option<RecognizedWord> {
    let text: String = word["symbols"]
        .as_array()?
        .iter()
        .filter_map(|s| s["text"].as_str())
        .collect();
    if text.is_empty() {
        return None;
    }
    let confidence = word["confidence"].as_f64().unwrap_or(DEFAULT_WORD_CONFIDENCE);
    let vertices = word["boundingBox"]["vertices"].as_array()?;
    let xs: Vec<f32> = vertices.iter().map(|v| v["x"].as_f64().unwrap_or(0.0) as f32).collect();
    let ys: Vec<f32> = vertices.iter().map(|v| v["y"].as_f64().unwrap_or(0.0) as f32).collect();
    let bbox = BoundingBox::new(
        xs.iter().cloned().fold(f32::INFINITY, f32::min),
        ys.iter().cloned().fold(f32::INFINITY, f32::min),
        xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max),
        ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max),
    );
    Some(RecognizedWord::new(text, confidence, bbox))
}

pub struct CloudVisionB {
    endpoint: Option<String>,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl CloudVisionB {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for CloudVisionB {
    fn id(&self) -> ProviderId {
        ProviderId::CloudVisionB
    }

    fn description(&self) -> &'static str {
        "Cloud region-based OCR engine"
    }

    fn available(&self) -> bool {
        self.endpoint.is_some() && self.api_key.is_some()
    }

    async fn recognize(
        &self,
        image_bytes: &[u8],
        language_hint: &str,
        _enable_table_detection: bool,
    ) -> Result<Vec<RecognizedWord>> {
        let (endpoint, api_key) = match (self.endpoint.as_deref(), self.api_key.as_deref()) {
            (Some(e), Some(k)) => (e, k),
            _ => {
                return Err(KlartextError::ProviderNotConfigured {
                    provider: ProviderId::CloudVisionB,
                });
            }
        };

        let language = if language_hint == "auto" { "unk" } else { language_hint };
        let url = format!(
            "{}/vision/v3.2/ocr?language={}&detectOrientation=true",
            endpoint.trim_end_matches('/'),
            language
        );
        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", api_key)
            .header("Content-Type", "application/octet-stream")
            .body(image_bytes.to_vec())
            .send()
            .await
            .map_err(|e| {
                KlartextError::provider_runtime_with_source(
                    ProviderId::CloudVisionB,
                    "ocr request failed",
                    e,
                )
            })?;

        let status = response.status();
        let payload: Value = response.json().await.map_err(|e| {
            KlartextError::provider_runtime_with_source(
                ProviderId::CloudVisionB,
                "invalid ocr response body",
                e,
            )
        })?;
        if !status.is_success() {
            return Err(KlartextError::provider_runtime(
                ProviderId::CloudVisionB,
                format!("ocr request returned {status}: {payload}"),
            ));
        }

        Ok(parse_ocr_regions(&payload))
    }
}

/// Walk `regions/lines/words`; boxes arrive as `"x,y,w,h"` strings.
fn parse_ocr_regions(payload: &Value) -> Vec<RecognizedWord> {
    let mut words = Vec::new();
    for region in payload["regions"].as_array().into_iter().flatten() {
        for line in region["lines"].as_array().into_iter().flatten() {
            for word in line["words"].as_array().into_iter().flatten() {
                let text = word["text"].as_str().unwrap_or("");
                if text.is_empty() {
                    continue;
                }
                let Some(bbox) = word["boundingBox"].as_str().and_then(parse_xywh) else {
                    continue;
                };
                words.push(RecognizedWord::new(text, DEFAULT_WORD_CONFIDENCE, bbox));
            }
        }
    }
    words
}

fn parse_xywh(raw: &str) -> Option<BoundingBox> {
    let parts: Vec<f32> = raw.split(',').filter_map(|p| p.trim().parse().ok()).collect();
    if parts.len() != 4 {
        return None;
    }
    Some(BoundingBox::new(
        parts[0],
        parts[1],
        parts[0] + parts[2],
        parts[1] + parts[3],
    ))
}
