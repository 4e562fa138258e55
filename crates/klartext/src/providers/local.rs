//! The guaranteed-available local recognition engine.
//!
//! This adapter terminates every fallback chain: it runs offline, is
//! deterministic, and fails only when the input image itself cannot be
//! decoded. Without the `tesseract` feature it synthesizes a fixed,
//! layout-dependent word list from the decoded image; with the feature it
//! invokes the Tesseract LSTM engine (see `providers::tesseract`).

use crate::error::{KlartextError, Result};
use crate::providers::{ProviderAdapter, ProviderId};
use crate::types::{BoundingBox, RecognizedWord};
use async_trait::async_trait;

/// Margin around the synthesized text region, in pixels.
const PAGE_MARGIN: f32 = 50.0;
/// Confidence reported for synthesized words.
const SYNTHETIC_CONFIDENCE: f64 = 0.75;

pub struct LocalEngine;

impl LocalEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for LocalEngine {
    fn id(&self) -> ProviderId {
        ProviderId::LocalEngine
    }

    fn description(&self) -> &'static str {
        #[cfg(feature = "tesseract")]
        {
            "Offline Tesseract LSTM engine"
        }
        #[cfg(not(feature = "tesseract"))]
        {
            "Offline deterministic fallback engine"
        }
    }

    fn available(&self) -> bool {
        true
    }

    #[cfg(feature = "tesseract")]
    async fn recognize(
        &self,
        image_bytes: &[u8],
        language_hint: &str,
        enable_table_detection: bool,
    ) -> Result<Vec<RecognizedWord>> {
        let bytes = image_bytes.to_vec();
        let language = language_hint.to_string();
        tokio::task::spawn_blocking(move || {
            super::tesseract::recognize_blocking(&bytes, &language, enable_table_detection)
        })
        .await
        .map_err(|e| {
            KlartextError::provider_runtime(
                ProviderId::LocalEngine,
                format!("recognition task panicked: {e}"),
            )
        })?
    }

    #[cfg(not(feature = "tesseract"))]
    async fn recognize(
        &self,
        image_bytes: &[u8],
        _language_hint: &str,
        _enable_table_detection: bool,
    ) -> Result<Vec<RecognizedWord>> {
        let img = image::load_from_memory(image_bytes).map_err(|e| {
            KlartextError::provider_runtime_with_source(
                ProviderId::LocalEngine,
                "failed to decode image",
                e,
            )
        })?;
        Ok(synthesize_words(img.width(), img.height()))
    }
}

/// Deterministic word layout derived from the image dimensions only.
///
/// Landscape and portrait inputs yield different fixed sentences; each word
/// gets a horizontal slice of the text region proportional to its length.
#[cfg_attr(feature = "tesseract", allow(dead_code))]
fn synthesize_words(width: u32, height: u32) -> Vec<RecognizedWord> {
    let sentence = if width > height {
        "This is a sample document with horizontal text layout."
    } else {
        "Sample vertical text content extracted from image."
    };

    let w = width as f32;
    let h = height as f32;
    let margin_x = PAGE_MARGIN.min(w / 10.0);
    let margin_y = PAGE_MARGIN.min(h / 10.0);
    let region_w = w - 2.0 * margin_x;
    let line_h = ((h - 2.0 * margin_y) / 10.0).max(1.0);

    let words: Vec<&str> = sentence.split_whitespace().collect();
    let total_chars: usize = words.iter().map(|word| word.len() + 1).sum();

    let mut out = Vec::with_capacity(words.len());
    let mut cursor = margin_x;
    for word in words {
        let span = region_w * (word.len() + 1) as f32 / total_chars as f32;
        out.push(RecognizedWord::new(
            word,
            SYNTHETIC_CONFIDENCE,
            BoundingBox::new(cursor, margin_y, cursor + span, margin_y + line_h),
        ));
        cursor += span;
    }
    out
}
