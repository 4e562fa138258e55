//! Optical-character-extraction pipeline.
//!
//! Klartext turns document images into structured text. One pipeline run
//! prepares the image, obtains word-level recognition from a chain of
//! interchangeable OCR providers, filters low-confidence words, rebuilds
//! lines and tables from geometry, classifies text blocks, and assembles
//! an immutable [`OcrResult`] that exports to plain text, JSON, CSV, or
//! HTML. Batches run with bounded concurrency and per-item error
//! isolation.
//!
//! ```no_run
//! use klartext::{OcrPipeline, PipelineConfig, ProviderCredentials, ProviderRegistry};
//!
//! # async fn run() -> klartext::Result<()> {
//! let registry = ProviderRegistry::new(&ProviderCredentials::from_env());
//! let pipeline = OcrPipeline::new(&registry, PipelineConfig::default())?;
//! let bytes = tokio::fs::read("scan.png").await?;
//! let result = pipeline.process(&bytes, "image/png").await?;
//! println!("{}", result.text);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod classify;
pub mod core;
pub mod error;
pub mod export;
pub mod layout;
pub mod preprocess;
pub mod providers;
pub mod types;

pub use crate::core::batch::{BATCH_GROUP_SIZE, CancelFlag, run_batch};
pub use crate::core::config::{PipelineConfig, default_provider_order};
pub use crate::core::mime::{MAX_BATCH_FILES, MAX_FILE_SIZE_BYTES, SUPPORTED_MIME_TYPES};
pub use crate::core::pipeline::{MIN_WORD_CONFIDENCE, OcrPipeline};
pub use error::{KlartextError, Result};
pub use export::{DownloadPayload, ExportFormat, download, render};
pub use providers::{
    ProviderAdapter, ProviderCredentials, ProviderId, ProviderInfo, ProviderRegistry,
};
pub use types::{
    BatchError, BatchItem, BatchOutput, BlockType, BoundingBox, LanguageInfo, LayoutInfo,
    OcrResult, ReadingOrder, RecognizedWord, TableCell, TableRow, TableStructure, TextBlock,
    supported_languages,
};
