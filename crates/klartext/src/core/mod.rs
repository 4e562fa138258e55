//! Pipeline core: configuration, input boundaries, single-image
//! processing, and batch orchestration.

pub mod batch;
pub mod config;
pub mod mime;
pub mod pipeline;

pub use batch::{BATCH_GROUP_SIZE, CancelFlag, run_batch};
pub use config::PipelineConfig;
pub use pipeline::{MIN_WORD_CONFIDENCE, OcrPipeline};
