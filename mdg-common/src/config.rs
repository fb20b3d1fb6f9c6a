//! Configuration loading and validation
//!
//! All tuning parameters live in a single TOML file so that no retry
//! budget, placeholder value, or cluster count is hard-coded inside a
//! module. Every section has compiled defaults; a partial file overrides
//! only the keys it names.
//!
//! Malformed configuration is a construction-time fatal error: [`GatewayConfig::validate`]
//! runs before any record is processed, and nothing downstream re-checks
//! these invariants.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{Error, Result};

/// Transfer pipeline settings (retry budget and backoff shape)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Maximum delivery attempts per record (>= 1)
    pub max_attempts: u32,
    /// Initial backoff delay in seconds (> 0)
    pub base_delay_s: f64,
    /// Backoff delay cap in seconds (>= base_delay_s)
    pub max_delay_s: f64,
    /// Randomize each delay within [0.5, 1.5]x of the nominal value
    pub jitter: bool,
    /// Cap on records processed per batch invocation (None = unbounded)
    pub max_records_per_batch: Option<usize>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_s: 1.0,
            max_delay_s: 30.0,
            jitter: false,
            max_records_per_batch: None,
        }
    }
}

/// Sanitization settings (sensitive fields and placeholder values)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizationConfig {
    /// Edge device identifier stamped as provenance on every record
    pub station_name: String,
    /// Field names that must never leave the unit with their original value.
    /// Fields listed here without a placeholder are removed outright.
    pub sensitive_fields: Vec<String>,
    /// Sensitive fields replaced with a neutral value instead of removed
    pub placeholder_values: BTreeMap<String, String>,
    /// Tag that carries the provenance stamp
    pub provenance_field: String,
}

impl Default for SanitizationConfig {
    fn default() -> Self {
        Self {
            station_name: "REMOTE_MOBILE_01".to_string(),
            sensitive_fields: Vec::new(),
            placeholder_values: BTreeMap::new(),
            provenance_field: "StationName".to_string(),
        }
    }
}

/// Fleet QC settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    /// Number of K-Means clusters (>= 1; outlier labeling needs >= 2)
    pub n_clusters: usize,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self { n_clusters: 2 }
    }
}

/// Top-level gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub transfer: TransferConfig,
    pub sanitization: SanitizationConfig,
    pub qc: QcConfig,
}

impl GatewayConfig {
    /// Parse and validate a TOML configuration string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GatewayConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded gateway configuration");
        Ok(config)
    }

    /// Check every cross-field invariant.
    ///
    /// # Errors
    /// Returns `Error::Config` naming the offending key. Called by the
    /// loaders above; call it directly when building a config in code.
    pub fn validate(&self) -> Result<()> {
        if self.transfer.max_attempts < 1 {
            return Err(Error::Config(
                "transfer.max_attempts must be >= 1".to_string(),
            ));
        }
        if !(self.transfer.base_delay_s > 0.0) || !self.transfer.base_delay_s.is_finite() {
            return Err(Error::Config(
                "transfer.base_delay_s must be a positive number".to_string(),
            ));
        }
        if !self.transfer.max_delay_s.is_finite()
            || self.transfer.max_delay_s < self.transfer.base_delay_s
        {
            return Err(Error::Config(
                "transfer.max_delay_s must be >= transfer.base_delay_s".to_string(),
            ));
        }
        if self.transfer.max_records_per_batch == Some(0) {
            return Err(Error::Config(
                "transfer.max_records_per_batch must be >= 1 when set".to_string(),
            ));
        }
        if self.qc.n_clusters < 1 {
            return Err(Error::Config("qc.n_clusters must be >= 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.transfer.max_attempts, 5);
        assert_eq!(config.transfer.max_delay_s, 30.0);
        assert_eq!(config.qc.n_clusters, 2);
        assert_eq!(config.sanitization.provenance_field, "StationName");
    }

    #[test]
    fn test_partial_override() {
        let toml = r#"
            [transfer]
            max_attempts = 3
            jitter = true

            [sanitization]
            station_name = "REMOTE_MOBILE_07"
            sensitive_fields = ["PatientName", "PatientID"]

            [sanitization.placeholder_values]
            PatientName = "ANONYMOUS"
        "#;
        let config = GatewayConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.transfer.max_attempts, 3);
        assert!(config.transfer.jitter);
        // Untouched keys keep their defaults
        assert_eq!(config.transfer.base_delay_s, 1.0);
        assert_eq!(config.sanitization.station_name, "REMOTE_MOBILE_07");
        assert_eq!(
            config.sanitization.placeholder_values.get("PatientName"),
            Some(&"ANONYMOUS".to_string())
        );
    }

    #[test]
    fn test_rejects_inverted_delay_bounds() {
        let toml = r#"
            [transfer]
            base_delay_s = 10.0
            max_delay_s = 2.0
        "#;
        let result = GatewayConfig::from_toml_str(toml);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let toml = "[transfer]\nmax_attempts = 0\n";
        assert!(GatewayConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_rejects_zero_clusters() {
        let toml = "[qc]\nn_clusters = 0\n";
        assert!(GatewayConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_rejects_zero_record_cap() {
        let toml = "[transfer]\nmax_records_per_batch = 0\n";
        assert!(GatewayConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(&path, "[qc]\nn_clusters = 3\n").unwrap();

        let config = GatewayConfig::load(&path).unwrap();
        assert_eq!(config.qc.n_clusters, 3);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = GatewayConfig::load(Path::new("/nonexistent/gateway.toml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
