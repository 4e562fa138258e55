//! Error types for Klartext.
//!
//! All fallible operations in the library return [`Result`]. The taxonomy
//! mirrors the pipeline's failure boundaries:
//!
//! - Format/size violations (`UnsupportedFormat`, `FileTooLarge`) are
//!   rejected synchronously, before any provider is invoked.
//! - Per-adapter failures (`ProviderNotConfigured`, `ProviderTimeout`,
//!   `ProviderRuntime`) are caught by the fallback chain and only surface
//!   through `AllProvidersFailed` when every adapter, including the final
//!   local-engine retry, has failed.
//! - Batch runs never fail for content-level errors; per-item errors are
//!   collected as `(file_name, kind)` pairs via [`KlartextError::kind`].

use crate::providers::ProviderId;
use thiserror::Error;

/// Result type alias using `KlartextError`.
pub type Result<T> = std::result::Result<T, KlartextError>;

/// Main error type for all Klartext operations.
#[derive(Debug, Error)]
pub enum KlartextError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Provider {provider} is not configured")]
    ProviderNotConfigured { provider: ProviderId },

    #[error("Provider {provider} timed out after {elapsed_secs}s")]
    ProviderTimeout { provider: ProviderId, elapsed_secs: u64 },

    #[error("Provider {provider} failed: {message}")]
    ProviderRuntime {
        provider: ProviderId,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("All providers failed: {}", format_attempts(.attempts))]
    AllProvidersFailed { attempts: Vec<(ProviderId, String)> },

    #[error("Image processing error: {message}")]
    ImageProcessing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

fn format_attempts(attempts: &[(ProviderId, String)]) -> String {
    attempts
        .iter()
        .map(|(id, msg)| format!("{id}: {msg}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl KlartextError {
    /// Create an ImageProcessing error without a source.
    pub fn image_processing<S: Into<String>>(message: S) -> Self {
        Self::ImageProcessing {
            message: message.into(),
            source: None,
        }
    }

    /// Create an ImageProcessing error wrapping its cause.
    pub fn image_processing_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageProcessing {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a Validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a ProviderRuntime error without a source.
    pub fn provider_runtime<S: Into<String>>(provider: ProviderId, message: S) -> Self {
        Self::ProviderRuntime {
            provider,
            message: message.into(),
            source: None,
        }
    }

    /// Create a ProviderRuntime error wrapping its cause.
    pub fn provider_runtime_with_source<S, E>(provider: ProviderId, message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ProviderRuntime {
            provider,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Stable kind string, used as the `errorKind` of batch error entries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::ProviderNotConfigured { .. } => "provider_not_configured",
            Self::ProviderTimeout { .. } => "provider_timeout",
            Self::ProviderRuntime { .. } => "provider_runtime_error",
            Self::AllProvidersFailed { .. } => "all_providers_failed",
            Self::ImageProcessing { .. } => "image_processing",
            Self::Serialization { .. } => "serialization",
            Self::Validation { .. } => "validation",
        }
    }
}

impl From<serde_json::Error> for KlartextError {
    fn from(err: serde_json::Error) -> Self {
        KlartextError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
