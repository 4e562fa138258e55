//! OCR provider adapters.
//!
//! Every engine — the offline local engine, the two cloud vision services,
//! and the generative-vision model — sits behind the same [`ProviderAdapter`]
//! capability: image bytes in, word-level recognition data out. The
//! [`chain::FallbackChain`] orders adapters and tries them in sequence;
//! the [`ProviderRegistry`] is built once at startup from explicit
//! credentials and passed by reference into every pipeline call.

pub mod chain;
pub mod cloud;
pub mod generative;
pub mod local;
#[cfg(feature = "tesseract")]
pub mod tesseract;

use crate::error::Result;
use crate::types::RecognizedWord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Identifier of a recognition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    LocalEngine,
    CloudVisionA,
    CloudVisionB,
    GenerativeVision,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::LocalEngine => "local-engine",
            ProviderId::CloudVisionA => "cloud-vision-a",
            ProviderId::CloudVisionB => "cloud-vision-b",
            ProviderId::GenerativeVision => "generative-vision",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "local-engine" => Ok(ProviderId::LocalEngine),
            "cloud-vision-a" => Ok(ProviderId::CloudVisionA),
            "cloud-vision-b" => Ok(ProviderId::CloudVisionB),
            "generative-vision" => Ok(ProviderId::GenerativeVision),
            _ => Err(format!("Unknown provider: {s}")),
        }
    }
}

/// Capability entry advertised to capability-listing collaborators.
///
/// `available` reflects credential presence only; computing it never
/// touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub available: bool,
    pub description: &'static str,
}

/// Uniform recognition capability over OCR engines.
///
/// Adapters must be thread-safe; a pipeline run may hold them across await
/// points while other runs use the same registry.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    fn description(&self) -> &'static str;

    /// Whether required credentials/configuration are present. Must not
    /// perform any network call.
    fn available(&self) -> bool;

    /// Turn an image into word-level recognition data.
    ///
    /// Implementations return `ProviderNotConfigured` without a network
    /// attempt when `available()` is false, and `ProviderRuntime` for any
    /// transient failure. Confidence filtering is the pipeline's job; all
    /// recognized words are returned.
    async fn recognize(
        &self,
        image_bytes: &[u8],
        language_hint: &str,
        enable_table_detection: bool,
    ) -> Result<Vec<RecognizedWord>>;

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.id().as_str(),
            available: self.available(),
            description: self.description(),
        }
    }
}

/// Credentials for the remote engines.
///
/// An explicit value constructed once at process start; absence of a field
/// marks the corresponding adapter as not configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderCredentials {
    /// API key for cloud-vision-a (annotate-style API).
    pub cloud_vision_a_api_key: Option<String>,
    /// Endpoint base URL for cloud-vision-b.
    pub cloud_vision_b_endpoint: Option<String>,
    /// Subscription key for cloud-vision-b.
    pub cloud_vision_b_api_key: Option<String>,
    /// API key for the generative-vision engine.
    pub generative_api_key: Option<String>,
    /// Model name for the generative-vision engine.
    pub generative_model: Option<String>,
}

impl ProviderCredentials {
    /// Read credentials from the environment exactly once.
    ///
    /// `KLARTEXT_CLOUD_VISION_A_API_KEY`, `KLARTEXT_CLOUD_VISION_B_ENDPOINT`,
    /// `KLARTEXT_CLOUD_VISION_B_API_KEY`, `KLARTEXT_GENERATIVE_API_KEY`,
    /// `KLARTEXT_GENERATIVE_MODEL`.
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }
        Self {
            cloud_vision_a_api_key: var("KLARTEXT_CLOUD_VISION_A_API_KEY"),
            cloud_vision_b_endpoint: var("KLARTEXT_CLOUD_VISION_B_ENDPOINT"),
            cloud_vision_b_api_key: var("KLARTEXT_CLOUD_VISION_B_API_KEY"),
            generative_api_key: var("KLARTEXT_GENERATIVE_API_KEY"),
            generative_model: var("KLARTEXT_GENERATIVE_MODEL"),
        }
    }
}

/// The set of adapters available to a process.
///
/// The local engine is always present; remote adapters are present but may
/// report themselves unavailable when credentials are missing.
pub struct ProviderRegistry {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new(credentials: &ProviderCredentials) -> Self {
        let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
            Arc::new(generative::GenerativeVision::new(
                credentials.generative_api_key.clone(),
                credentials.generative_model.clone(),
            )),
            Arc::new(cloud::CloudVisionA::new(
                credentials.cloud_vision_a_api_key.clone(),
            )),
            Arc::new(cloud::CloudVisionB::new(
                credentials.cloud_vision_b_endpoint.clone(),
                credentials.cloud_vision_b_api_key.clone(),
            )),
            Arc::new(local::LocalEngine::new()),
        ];
        Self { adapters }
    }

    /// Registry with custom adapters. The caller is responsible for
    /// including a terminal always-available engine.
    pub fn with_adapters(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn adapters(&self) -> &[Arc<dyn ProviderAdapter>] {
        &self.adapters
    }

    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.iter().find(|a| a.id() == id).cloned()
    }

    /// Capability listing; no network access.
    pub fn capabilities(&self) -> Vec<ProviderInfo> {
        self.adapters.iter().map(|a| a.info()).collect()
    }
}
