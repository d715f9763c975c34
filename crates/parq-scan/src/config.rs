//! # Scan Configuration
//!
//! Configuration for the scan engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. TOML Config File                                                   │
//! │     ~/.config/parq-scan/scan.toml (Linux)                              │
//! │     ~/Library/Application Support/com.parq.scan/scan.toml (macOS)      │
//! │                                                                         │
//! │  2. Default Values                                                     │
//! │     rear camera, 16 ms tick, 30 s settlement timeout                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scan.toml
//! [camera]
//! facing = "rear"  # rear | front | any
//!
//! [sampler]
//! tick_interval_ms = 16  # redraw cadence for the bundled scheduler
//!
//! [settlement]
//! request_timeout_secs = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::camera::FacingPreference;
use crate::error::{ScanError, ScanResult};

// =============================================================================
// Camera Configuration
// =============================================================================

/// Camera acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CameraConfig {
    /// Which physical camera to request.
    /// Default: rear, since codes are printed on physical tickets.
    #[serde(default)]
    pub facing: FacingPreference,
}

// =============================================================================
// Sampler Configuration
// =============================================================================

/// Frame sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Tick period for the bundled [`RedrawScheduler`], in milliseconds.
    ///
    /// Hosts with a real repaint loop supply their own scheduler and
    /// ignore this. Default: 16 (roughly one display refresh).
    ///
    /// [`RedrawScheduler`]: crate::sampler::RedrawScheduler
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_tick_interval_ms() -> u64 {
    16
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl SamplerConfig {
    /// Tick period as a [`Duration`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

// =============================================================================
// Settlement Configuration
// =============================================================================

/// Settlement request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Timeout for the one-shot settlement POST, in seconds.
    /// Default: 30
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for SettlementConfig {
    fn default() -> Self {
        SettlementConfig {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SettlementConfig {
    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Scan Configuration
// =============================================================================

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanConfig {
    /// Camera acquisition settings.
    #[serde(default)]
    pub camera: CameraConfig,

    /// Frame sampling settings.
    #[serde(default)]
    pub sampler: SamplerConfig,

    /// Settlement request settings.
    #[serde(default)]
    pub settlement: SettlementConfig,
}

impl ScanConfig {
    /// Loads configuration from the platform config directory, falling back
    /// to defaults when no file exists.
    pub fn load() -> ScanResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No platform config directory; using defaults");
                Ok(ScanConfig::default())
            }
        }
    }

    /// Loads configuration from a specific file, falling back to defaults
    /// when it does not exist.
    pub fn load_from(path: &Path) -> ScanResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file; using defaults");
            return Ok(ScanConfig::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScanError::ConfigLoadFailed(format!("{}: {}", path.display(), e)))?;
        let config = Self::parse(&raw)?;
        info!(path = %path.display(), "Loaded scan config");
        Ok(config)
    }

    /// Parses and validates a TOML document.
    pub fn parse(raw: &str) -> ScanResult<Self> {
        let config: ScanConfig =
            toml::from_str(raw).map_err(|e| ScanError::ConfigLoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for unusable values.
    pub fn validate(&self) -> ScanResult<()> {
        if self.sampler.tick_interval_ms == 0 {
            return Err(ScanError::InvalidConfig(
                "sampler.tick_interval_ms must be at least 1".into(),
            ));
        }
        if self.sampler.tick_interval_ms > 1000 {
            return Err(ScanError::InvalidConfig(
                "sampler.tick_interval_ms must be at most 1000".into(),
            ));
        }
        if self.settlement.request_timeout_secs == 0 {
            return Err(ScanError::InvalidConfig(
                "settlement.request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The platform-specific config file path.
    fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "parq", "parq-scan")
            .map(|dirs| dirs.config_dir().join("scan.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.camera.facing, FacingPreference::Rear);
        assert_eq!(config.sampler.tick_interval(), Duration::from_millis(16));
        assert_eq!(config.settlement.request_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_document() {
        let config = ScanConfig::parse(
            r#"
            [camera]
            facing = "front"

            [sampler]
            tick_interval_ms = 33

            [settlement]
            request_timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.facing, FacingPreference::Front);
        assert_eq!(config.sampler.tick_interval_ms, 33);
        assert_eq!(config.settlement.request_timeout_secs, 10);
    }

    #[test]
    fn test_parse_partial_document_fills_defaults() {
        let config = ScanConfig::parse("[camera]\nfacing = \"any\"\n").unwrap();
        assert_eq!(config.camera.facing, FacingPreference::Any);
        assert_eq!(config.sampler.tick_interval_ms, 16);
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let err = ScanConfig::parse("[sampler]\ntick_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ScanConfig::parse("[settlement]\nrequest_timeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_toml_reports_load_failure() {
        let err = ScanConfig::parse("not toml at all [").unwrap_err();
        assert!(matches!(err, ScanError::ConfigLoadFailed(_)));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ScanConfig::load_from(Path::new("/nonexistent/scan.toml")).unwrap();
        assert_eq!(config.sampler.tick_interval_ms, 16);
    }
}
