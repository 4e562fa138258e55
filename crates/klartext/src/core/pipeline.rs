//! Single-image extraction pipeline.
//!
//! One call runs the full sequence: boundary checks, image preparation,
//! provider chain, confidence filtering, line and table reconstruction,
//! block classification, and result assembly.

use crate::classify;
use crate::core::config::PipelineConfig;
use crate::core::mime;
use crate::error::Result;
use crate::layout::{self, Line};
use crate::preprocess;
use crate::providers::ProviderRegistry;
use crate::providers::chain::FallbackChain;
use crate::types::{LayoutInfo, OcrResult, RecognizedWord, TextBlock};
use std::time::Instant;

/// Words below this provider-reported confidence are discarded before
/// layout reconstruction. The overall result confidence is computed
/// first, over everything the provider returned.
pub const MIN_WORD_CONFIDENCE: f64 = 0.30;

pub struct OcrPipeline<'a> {
    registry: &'a ProviderRegistry,
    config: PipelineConfig,
}

impl<'a> OcrPipeline<'a> {
    pub fn new(registry: &'a ProviderRegistry, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract text and structure from one image.
    pub async fn process(&self, bytes: &[u8], declared_mime: &str) -> Result<OcrResult> {
        let started = Instant::now();
        let mime = mime::validate_input(bytes, declared_mime)?;
        tracing::debug!(mime, size = bytes.len(), "processing input");

        let prepared = preprocess::prepare_or_passthrough(bytes);

        let chain = FallbackChain::new(
            self.registry,
            self.config.provider_timeout(),
            &self.config.provider_order,
        );
        let outcome = chain
            .recognize(
                &prepared,
                &self.config.language_hint,
                self.config.enable_table_detection,
                self.config.provider,
            )
            .await?;

        let confidence = mean_confidence(&outcome.words);
        let filtered: Vec<RecognizedWord> = outcome
            .words
            .into_iter()
            .filter(|w| w.confidence >= MIN_WORD_CONFIDENCE)
            .collect();

        let lines = layout::group_into_lines(&filtered, self.config.line_cluster_tolerance_px);
        let (tables, consumed) = if self.config.enable_table_detection {
            layout::detect_tables(&lines, self.config.table_column_variation)
        } else {
            (Vec::new(), vec![false; lines.len()])
        };

        let blocks = build_blocks(&lines, &consumed);
        let text = lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join("\n");
        let language = if self.config.language_hint == "auto" {
            classify::detect_language(&text).to_string()
        } else {
            self.config.language_hint.clone()
        };

        tracing::info!(
            provider = %outcome.provider,
            words = filtered.len(),
            blocks = blocks.len(),
            tables = tables.len(),
            "extraction complete"
        );

        Ok(OcrResult {
            text,
            confidence,
            language,
            blocks,
            tables,
            layout: LayoutInfo::default(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            provider: outcome.provider.to_string(),
        })
    }
}

fn mean_confidence(words: &[RecognizedWord]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    words.iter().map(|w| w.confidence).sum::<f64>() / words.len() as f64
}

/// Lines not consumed by a table become classified text blocks.
fn build_blocks(lines: &[Line], consumed: &[bool]) -> Vec<TextBlock> {
    lines
        .iter()
        .zip(consumed)
        .filter(|(_, &taken)| !taken)
        .map(|(line, _)| {
            let text = line.text();
            let block_type = classify::block_type(&text);
            TextBlock {
                confidence: line.confidence(),
                bbox: line.bbox(),
                block_type,
                text,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KlartextError;
    use crate::providers::{ProviderAdapter, ProviderId};
    use crate::types::{BlockType, BoundingBox};
    use async_trait::async_trait;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;
    use std::sync::Arc;

    struct FixedWords {
        words: Vec<RecognizedWord>,
    }

    #[async_trait]
    impl ProviderAdapter for FixedWords {
        fn id(&self) -> ProviderId {
            ProviderId::LocalEngine
        }
        fn description(&self) -> &'static str {
            "fixed stub"
        }
        fn available(&self) -> bool {
            true
        }
        async fn recognize(
            &self,
            _image_bytes: &[u8],
            _language_hint: &str,
            _enable_table_detection: bool,
        ) -> crate::error::Result<Vec<RecognizedWord>> {
            Ok(self.words.clone())
        }
    }

    fn png_fixture() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(64, 32, Rgb([220u8, 220, 220])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn word(text: &str, confidence: f64, x0: f32, y0: f32) -> RecognizedWord {
        RecognizedWord::new(
            text,
            confidence,
            BoundingBox::new(x0, y0, x0 + 30.0, y0 + 12.0),
        )
    }

    fn registry_with(words: Vec<RecognizedWord>) -> ProviderRegistry {
        ProviderRegistry::with_adapters(vec![Arc::new(FixedWords { words })])
    }

    #[tokio::test]
    async fn test_confidence_filter_and_overall_mean() {
        let registry = registry_with(vec![
            word("keep", 0.9, 0.0, 0.0),
            word("drop", 0.1, 40.0, 0.0),
        ]);
        let pipeline = OcrPipeline::new(&registry, PipelineConfig::default()).unwrap();
        let result = pipeline.process(&png_fixture(), "image/png").await.unwrap();

        // Mean is computed before the low word is dropped.
        assert!((result.confidence - 0.5).abs() < 1e-9);
        assert_eq!(result.text, "keep");
        assert_eq!(result.blocks.len(), 1);
    }

    #[tokio::test]
    async fn test_block_classification_flows_through() {
        let registry = registry_with(vec![
            word("INVOICE", 0.95, 0.0, 0.0),
            word("Figure", 0.9, 0.0, 100.0),
            word("one", 0.9, 40.0, 100.0),
        ]);
        let pipeline = OcrPipeline::new(&registry, PipelineConfig::default()).unwrap();
        let result = pipeline.process(&png_fixture(), "image/png").await.unwrap();

        assert_eq!(result.blocks[0].block_type, BlockType::Title);
        assert_eq!(result.blocks[1].block_type, BlockType::Caption);
    }

    #[tokio::test]
    async fn test_table_words_excluded_from_blocks() {
        let mut words = Vec::new();
        for r in 0..3 {
            for c in 0..3 {
                words.push(word(
                    &format!("r{r}c{c}"),
                    0.9,
                    c as f32 * 60.0,
                    r as f32 * 30.0,
                ));
            }
        }
        words.push(word("footer", 0.9, 0.0, 300.0));
        let registry = registry_with(words);
        let pipeline = OcrPipeline::new(&registry, PipelineConfig::default()).unwrap();
        let result = pipeline.process(&png_fixture(), "image/png").await.unwrap();

        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.tables[0].row_count(), 3);
        assert_eq!(result.blocks.len(), 1);
        assert_eq!(result.blocks[0].text, "footer");
        // Full text still carries the table lines.
        assert!(result.text.contains("r0c0 r0c1 r0c2"));
    }

    #[tokio::test]
    async fn test_table_detection_can_be_disabled() {
        let mut words = Vec::new();
        for r in 0..3 {
            for c in 0..3 {
                words.push(word(
                    &format!("r{r}c{c}"),
                    0.9,
                    c as f32 * 60.0,
                    r as f32 * 30.0,
                ));
            }
        }
        let registry = registry_with(words);
        let config = PipelineConfig {
            enable_table_detection: false,
            ..Default::default()
        };
        let pipeline = OcrPipeline::new(&registry, config).unwrap();
        let result = pipeline.process(&png_fixture(), "image/png").await.unwrap();

        assert!(result.tables.is_empty());
        assert_eq!(result.blocks.len(), 3);
    }

    #[tokio::test]
    async fn test_language_hint_wins_over_detection() {
        let registry = registry_with(vec![word("hello", 0.9, 0.0, 0.0)]);
        let config = PipelineConfig {
            language_hint: "de".to_string(),
            ..Default::default()
        };
        let pipeline = OcrPipeline::new(&registry, config).unwrap();
        let result = pipeline.process(&png_fixture(), "image/png").await.unwrap();
        assert_eq!(result.language, "de");
    }

    #[tokio::test]
    async fn test_provider_order_selects_first_configured_engine() {
        struct NamedWords {
            id: ProviderId,
        }

        #[async_trait]
        impl ProviderAdapter for NamedWords {
            fn id(&self) -> ProviderId {
                self.id
            }
            fn description(&self) -> &'static str {
                "named stub"
            }
            fn available(&self) -> bool {
                true
            }
            async fn recognize(
                &self,
                _image_bytes: &[u8],
                _language_hint: &str,
                _enable_table_detection: bool,
            ) -> crate::error::Result<Vec<RecognizedWord>> {
                Ok(vec![word("hello", 0.9, 0.0, 0.0)])
            }
        }

        let registry = ProviderRegistry::with_adapters(vec![
            Arc::new(NamedWords {
                id: ProviderId::CloudVisionA,
            }),
            Arc::new(NamedWords {
                id: ProviderId::CloudVisionB,
            }),
            Arc::new(NamedWords {
                id: ProviderId::LocalEngine,
            }),
        ]);
        let config = PipelineConfig {
            provider_order: vec![ProviderId::CloudVisionB, ProviderId::CloudVisionA],
            ..Default::default()
        };
        let pipeline = OcrPipeline::new(&registry, config).unwrap();
        let result = pipeline.process(&png_fixture(), "image/png").await.unwrap();
        assert_eq!(result.provider, "cloud-vision-b");
    }

    #[tokio::test]
    async fn test_unsupported_input_rejected_before_recognition() {
        let registry = registry_with(vec![]);
        let pipeline = OcrPipeline::new(&registry, PipelineConfig::default()).unwrap();
        let err = pipeline
            .process(b"%!PS-Adobe postscript", "application/postscript")
            .await
            .unwrap_err();
        assert!(matches!(err, KlartextError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_empty_recognition_yields_empty_result() {
        let registry = registry_with(vec![]);
        let pipeline = OcrPipeline::new(&registry, PipelineConfig::default()).unwrap();
        let result = pipeline.process(&png_fixture(), "image/png").await.unwrap();
        assert_eq!(result.confidence, 0.0);
        assert!(result.text.is_empty());
        assert!(result.blocks.is_empty());
        assert!(result.tables.is_empty());
    }
}
