//! # Scan Error Types
//!
//! Error types for the scan engine.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │     Camera      │  │   Settlement    │  │     Configuration       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │ DeviceUnavail.  │  │ Transport       │  │  InvalidConfig          │ │
//! │  │                 │  │ Business        │  │  ConfigLoadFailed       │ │
//! │  │                 │  │ InvalidPayload  │  │                         │ │
//! │  │                 │  │ SettlementInFl. │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Note: absence of a code in a frame is NOT an error - the sampler       │
//! │  simply retries on the next tick. There is no DecodeTimeout.            │
//! │                                                                         │
//! │  No error here is fatal to the host: every failure resolves to a        │
//! │  terminal Failed session with a readable reason, recoverable via        │
//! │  restart.                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for scan engine operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Scan engine error type covering camera, settlement, and config failures.
///
/// ## Design Principles
/// - Each variant includes enough context for a user-facing message
/// - Retry is never automatic: a decoded payload is bound to a one-time
///   real-world booking event, so every variant ends in a terminal Failed
///   state with a restart affordance
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum ScanError {
    // =========================================================================
    // Camera Errors
    // =========================================================================
    /// No usable camera: missing device, permission denied, or hardware busy.
    #[error("Error accessing camera: {0}")]
    DeviceUnavailable(String),

    // =========================================================================
    // Settlement Errors
    // =========================================================================
    /// Network or JSON-protocol failure on the settlement call.
    #[error("Error processing the QR code: {0}")]
    Transport(String),

    /// The backend reported an unsuccessful settlement.
    #[error("{0}")]
    Business(String),

    /// The decoded payload is not a usable settlement locator.
    #[error("Scanned code is not a valid settlement target: {0}")]
    InvalidPayload(String),

    /// A settlement request is already outstanding for this session.
    ///
    /// Single-flight: the second `settle` call is rejected without issuing
    /// a network request.
    #[error("A settlement request is already in flight for this session")]
    SettlementInFlight,

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid scan configuration.
    #[error("Invalid scan configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// A domain rule violation bubbled up from parq-core.
    #[error(transparent)]
    Core(#[from] parq_core::CoreError),
}

impl ScanError {
    /// Returns true if this error came from the camera rather than the
    /// settlement exchange.
    pub fn is_device_unavailable(&self) -> bool {
        matches!(self, ScanError::DeviceUnavailable(_))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_error_message_matches_presentation() {
        let err = ScanError::DeviceUnavailable("Permission denied".into());
        assert_eq!(err.to_string(), "Error accessing camera: Permission denied");
        assert!(err.is_device_unavailable());
    }

    #[test]
    fn test_business_error_is_verbatim() {
        let err = ScanError::Business("slot already settled".into());
        assert_eq!(err.to_string(), "slot already settled");
        assert!(!err.is_device_unavailable());
    }

    #[test]
    fn test_core_error_converts() {
        let core = parq_core::CoreError::EmptyPayload;
        let err: ScanError = core.into();
        assert!(matches!(err, ScanError::Core(_)));
    }
}
