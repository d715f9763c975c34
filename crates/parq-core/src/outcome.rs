//! # Payload and Outcome Types
//!
//! The two values that cross the pipeline's seams: the decoded payload that
//! flows from the sampler into settlement, and the settlement outcome that
//! flows back out to the presentation layer.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  FrameSampler ──DecodedPayload──► SettlementCoordinator                 │
//! │                                          │                              │
//! │                                          ▼                              │
//! │  Presentation ◄──SettlementOutcome── ScanController                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// =============================================================================
// Decoded Payload
// =============================================================================

/// The opaque text extracted from an optical code.
///
/// ## Design Notes
/// - Immutable once produced; flows by value into settlement
/// - Used verbatim as the settlement target locator, so the engine treats
///   it as opaque here and validates it only at the settlement seam
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecodedPayload(String);

impl DecodedPayload {
    /// Wraps a decoded string, rejecting the empty string.
    pub fn new(payload: impl Into<String>) -> Result<Self, CoreError> {
        let payload = payload.into();
        if payload.is_empty() {
            return Err(CoreError::EmptyPayload);
        }
        Ok(DecodedPayload(payload))
    }

    /// The payload text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the payload, returning the text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for DecodedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Settlement Outcome
// =============================================================================

/// The result of the one-shot settlement exchange for a scan session.
///
/// Produced exactly once per session, consumed by the presentation layer.
///
/// ## Design Notes
/// The success variant carries exactly the two fields the scan page shows
/// (duration and amount). The backend envelope may include more; narrowing
/// to these two is deliberate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// The booking settled; display the parking duration and total amount.
    #[serde(rename_all = "camelCase")]
    Success {
        /// Parking duration in hours.
        duration_hours: f64,

        /// Total amount charged, in the backend's display currency.
        total_amount: f64,
    },

    /// The settlement did not go through; display the reason and offer
    /// restart.
    Failure {
        /// Human-readable reason, shown verbatim to the user.
        reason: String,
    },
}

impl SettlementOutcome {
    /// Convenience constructor for the failure variant.
    pub fn failure(reason: impl Into<String>) -> Self {
        SettlementOutcome::Failure {
            reason: reason.into(),
        }
    }

    /// Returns true for the success variant.
    pub fn is_success(&self) -> bool {
        matches!(self, SettlementOutcome::Success { .. })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
