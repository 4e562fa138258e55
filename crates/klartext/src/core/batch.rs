//! Bounded-concurrency batch orchestration.
//!
//! Items run in fixed-size groups: every task in a group is spawned at
//! once and the whole group is awaited before the next one starts, so at
//! most [`BATCH_GROUP_SIZE`] extractions are ever in flight. A failing
//! item becomes a [`BatchError`] entry and never aborts its siblings.

use crate::core::config::PipelineConfig;
use crate::core::mime::MAX_BATCH_FILES;
use crate::core::pipeline::OcrPipeline;
use crate::error::{KlartextError, Result};
use crate::providers::ProviderRegistry;
use crate::types::{BatchError, BatchItem, BatchOutput, OcrResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;

/// Maximum extractions in flight at once.
pub const BATCH_GROUP_SIZE: usize = 3;

/// Cooperative cancellation handle, checked between groups. Tasks already
/// in flight run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Process a batch of files.
///
/// Successful results come back in submission order regardless of task
/// completion order. Per-item failures are collected, not propagated,
/// and a panicked extraction task is recorded as an error entry for its
/// file. Only a boundary violation of the batch itself (too many files)
/// fails the whole call.
pub async fn run_batch(
    registry: Arc<ProviderRegistry>,
    config: PipelineConfig,
    items: Vec<BatchItem>,
    cancel: CancelFlag,
) -> Result<BatchOutput> {
    if items.len() > MAX_BATCH_FILES {
        return Err(KlartextError::validation(format!(
            "batch of {} files exceeds the limit of {MAX_BATCH_FILES}",
            items.len()
        )));
    }
    config.validate()?;

    let total = items.len();
    let mut slots: Vec<Option<std::result::Result<OcrResult, BatchError>>> =
        (0..total).map(|_| None).collect();

    let mut offset = 0;
    for group in items.chunks(BATCH_GROUP_SIZE) {
        if cancel.is_cancelled() {
            tracing::info!(processed = offset, total, "batch cancelled between groups");
            break;
        }

        let mut handles: Vec<(usize, JoinHandle<std::result::Result<OcrResult, BatchError>>)> =
            Vec::with_capacity(group.len());
        for (i, item) in group.iter().cloned().enumerate() {
            let index = offset + i;
            let registry = registry.clone();
            let config = config.clone();
            handles.push((
                index,
                tokio::spawn(async move { process_item(&registry, config, &item).await }),
            ));
        }

        for (index, handle) in handles {
            match handle.await {
                Ok(outcome) => slots[index] = Some(outcome),
                Err(join_err) => {
                    // A panicking extraction still owes the caller an
                    // error entry for its file.
                    tracing::error!(
                        file = %items[index].file_name,
                        error = %join_err,
                        "batch task failed to complete"
                    );
                    slots[index] = Some(Err(BatchError {
                        file_name: items[index].file_name.clone(),
                        kind: "provider_runtime_error".to_string(),
                        message: format!("extraction task panicked: {join_err}"),
                    }));
                }
            }
        }
        offset += group.len();
    }

    let mut results = Vec::new();
    let mut errors = Vec::new();
    for slot in slots.into_iter().flatten() {
        match slot {
            Ok(result) => results.push(result),
            Err(error) => errors.push(error),
        }
    }

    let total_processed = results.len();
    let total_errors = errors.len();
    Ok(BatchOutput {
        results,
        errors,
        total_processed,
        total_errors,
    })
}

async fn process_item(
    registry: &ProviderRegistry,
    config: PipelineConfig,
    item: &BatchItem,
) -> std::result::Result<OcrResult, BatchError> {
    let run = async {
        let pipeline = OcrPipeline::new(registry, config)?;
        pipeline.process(&item.bytes, &item.mime_type).await
    };
    run.await.map_err(|err| {
        tracing::warn!(file = %item.file_name, error = %err, "batch item failed");
        BatchError {
            file_name: item.file_name.clone(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    })
}
