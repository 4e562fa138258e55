//! Pipeline configuration.
//!
//! One flat struct, deserializable from TOML, with serde defaults so a
//! partial file (or none at all) yields a working pipeline.

use crate::error::{KlartextError, Result};
use crate::providers::ProviderId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// ISO 639-1 hint passed to the engines, or `"auto"`.
    pub language_hint: String,
    /// When off, engines favor single-block segmentation and no table
    /// reconstruction runs.
    pub enable_table_detection: bool,
    /// Pin a specific engine as the first attempt. The fallback chain
    /// still runs if it fails.
    pub provider: Option<ProviderId>,
    /// Order in which configured providers are attempted. The local
    /// engine always runs last regardless of its position here.
    pub provider_order: Vec<ProviderId>,
    /// Vertical distance within which words join an existing line.
    pub line_cluster_tolerance_px: f32,
    /// Allowed fractional word-count deviation between table rows.
    pub table_column_variation: f32,
    /// Ceiling for a single provider attempt.
    pub provider_timeout_secs: u64,
}

/// Generative vision first, then the two cloud services, then the local
/// engine.
pub fn default_provider_order() -> Vec<ProviderId> {
    vec![
        ProviderId::GenerativeVision,
        ProviderId::CloudVisionA,
        ProviderId::CloudVisionB,
        ProviderId::LocalEngine,
    ]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language_hint: "auto".to_string(),
            enable_table_detection: true,
            provider: None,
            provider_order: default_provider_order(),
            line_cluster_tolerance_px: 10.0,
            table_column_variation: 0.30,
            provider_timeout_secs: 300,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&raw).map_err(|e| {
            KlartextError::validation(format!(
                "invalid config file {}: {e}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.language_hint.is_empty() {
            return Err(KlartextError::validation(
                "language_hint must be a language code or \"auto\"",
            ));
        }
        if !(self.line_cluster_tolerance_px > 0.0) {
            return Err(KlartextError::validation(
                "line_cluster_tolerance_px must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.table_column_variation) {
            return Err(KlartextError::validation(
                "table_column_variation must be within 0..=1",
            ));
        }
        if self.provider_timeout_secs == 0 {
            return Err(KlartextError::validation(
                "provider_timeout_secs must be positive",
            ));
        }
        if self.provider_order.is_empty() {
            return Err(KlartextError::validation(
                "provider_order must name at least one provider",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for id in &self.provider_order {
            if !seen.insert(id) {
                return Err(KlartextError::validation(format!(
                    "provider_order lists {id} more than once"
                )));
            }
        }
        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.language_hint, "auto");
        assert!(config.enable_table_detection);
        assert_eq!(config.provider, None);
        assert_eq!(
            config.provider_order,
            vec![
                ProviderId::GenerativeVision,
                ProviderId::CloudVisionA,
                ProviderId::CloudVisionB,
                ProviderId::LocalEngine,
            ]
        );
        assert_eq!(config.line_cluster_tolerance_px, 10.0);
        assert_eq!(config.table_column_variation, 0.30);
        assert_eq!(config.provider_timeout(), Duration::from_secs(300));
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            language_hint = "de"
            provider = "cloud-vision-a"
            "#,
        )
        .unwrap();
        assert_eq!(config.language_hint, "de");
        assert_eq!(config.provider, Some(ProviderId::CloudVisionA));
        assert!(config.enable_table_detection);
        assert_eq!(config.provider_timeout_secs, 300);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "enable_table_detection = false").unwrap();
        writeln!(file, "provider_timeout_secs = 30").unwrap();
        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert!(!config.enable_table_detection);
        assert_eq!(config.provider_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = PipelineConfig::default();
        config.table_column_variation = 1.5;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.line_cluster_tolerance_px = 0.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.provider_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_order_from_toml() {
        let config: PipelineConfig = toml::from_str(
            r#"
            provider_order = ["cloud-vision-b", "local-engine"]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.provider_order,
            vec![ProviderId::CloudVisionB, ProviderId::LocalEngine]
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_provider_order_rejects_duplicates_and_empty() {
        let mut config = PipelineConfig::default();
        config.provider_order = vec![ProviderId::LocalEngine, ProviderId::LocalEngine];
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.provider_order = Vec::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_provider_in_file_is_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "provider = \"engine-x\"").unwrap();
        let err = PipelineConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, KlartextError::Validation { .. }));
    }
}
