//! Provider ordering and fallback.
//!
//! The chain guarantees that a pipeline run either produces recognition
//! data or a single error that names every attempt made along the way.
//! Order: an explicit override first, then the configured remote engines
//! in the caller-supplied provider order, with the local engine always
//! terminal. After the planned attempts are exhausted the local engine is
//! invoked once more before giving up.

use crate::error::{KlartextError, Result};
use crate::providers::{ProviderAdapter, ProviderId, ProviderRegistry};
use crate::types::RecognizedWord;
use std::sync::Arc;
use std::time::Duration;

/// Successful chain result: the words plus which engine produced them.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub words: Vec<RecognizedWord>,
    pub provider: ProviderId,
}

pub struct FallbackChain<'a> {
    registry: &'a ProviderRegistry,
    attempt_timeout: Duration,
    provider_order: &'a [ProviderId],
}

impl<'a> FallbackChain<'a> {
    pub fn new(
        registry: &'a ProviderRegistry,
        attempt_timeout: Duration,
        provider_order: &'a [ProviderId],
    ) -> Self {
        Self {
            registry,
            attempt_timeout,
            provider_order,
        }
    }

    /// Resolve the attempt order for one run.
    ///
    /// An override is attempted first even when unconfigured, so that the
    /// caller sees its failure recorded rather than silently skipped.
    /// The configured provider order follows; unconfigured remote engines
    /// are left out of it, and the local engine closes the list whether
    /// or not the order names it.
    pub fn plan(&self, requested: Option<ProviderId>) -> Vec<Arc<dyn ProviderAdapter>> {
        let mut order: Vec<Arc<dyn ProviderAdapter>> = Vec::new();
        let mut push = |adapter: Arc<dyn ProviderAdapter>, order: &mut Vec<Arc<dyn ProviderAdapter>>| {
            if !order.iter().any(|a| a.id() == adapter.id()) {
                order.push(adapter);
            }
        };

        if let Some(id) = requested {
            if let Some(adapter) = self.registry.get(id) {
                push(adapter, &mut order);
            }
        }
        for id in self.provider_order {
            if let Some(adapter) = self.registry.get(*id) {
                if adapter.id() == ProviderId::LocalEngine || adapter.available() {
                    push(adapter, &mut order);
                }
            }
        }
        if let Some(local) = self.registry.get(ProviderId::LocalEngine) {
            push(local, &mut order);
        }
        // The local engine stays terminal even when requested explicitly.
        if let Some(pos) = order.iter().position(|a| a.id() == ProviderId::LocalEngine) {
            let local = order.remove(pos);
            order.push(local);
        }
        order
    }

    /// Try engines in planned order until one returns words.
    pub async fn recognize(
        &self,
        image_bytes: &[u8],
        language_hint: &str,
        enable_table_detection: bool,
        requested: Option<ProviderId>,
    ) -> Result<ChainOutcome> {
        let mut attempts: Vec<(ProviderId, String)> = Vec::new();

        for adapter in self.plan(requested) {
            match self
                .attempt(&*adapter, image_bytes, language_hint, enable_table_detection)
                .await
            {
                Ok(words) => {
                    return Ok(ChainOutcome {
                        words,
                        provider: adapter.id(),
                    });
                }
                Err(err) => {
                    tracing::warn!(provider = %adapter.id(), error = %err, "provider attempt failed");
                    attempts.push((adapter.id(), err.to_string()));
                }
            }
        }

        // Terminal guarantee: one more local attempt regardless of what
        // already ran.
        if let Some(local) = self.registry.get(ProviderId::LocalEngine) {
            match self
                .attempt(&*local, image_bytes, language_hint, enable_table_detection)
                .await
            {
                Ok(words) => {
                    return Ok(ChainOutcome {
                        words,
                        provider: ProviderId::LocalEngine,
                    });
                }
                Err(err) => {
                    tracing::warn!(error = %err, "final local retry failed");
                    attempts.push((ProviderId::LocalEngine, err.to_string()));
                }
            }
        }

        Err(KlartextError::AllProvidersFailed { attempts })
    }

    async fn attempt(
        &self,
        adapter: &dyn ProviderAdapter,
        image_bytes: &[u8],
        language_hint: &str,
        enable_table_detection: bool,
    ) -> Result<Vec<RecognizedWord>> {
        match tokio::time::timeout(
            self.attempt_timeout,
            adapter.recognize(image_bytes, language_hint, enable_table_detection),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(KlartextError::ProviderTimeout {
                provider: adapter.id(),
                elapsed_secs: self.attempt_timeout.as_secs(),
            }),
        }
    }
}
