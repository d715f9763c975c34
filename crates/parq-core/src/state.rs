//! # Scan State
//!
//! The scan-session state machine as pure data: which states exist, which
//! transitions are legal, and which states are terminal.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scan Session Lifecycle                             │
//! │                                                                         │
//! │            code decoded      settle issued       outcome                │
//! │  Scanning ─────────────► Detected ─────► Settling ─────► Succeeded     │
//! │      │                                       │                          │
//! │      │ camera acquisition failed             └─────────► Failed        │
//! │      └─────────────────────────────────────────────────► Failed        │
//! │                                                                         │
//! │  Succeeded / Failed are TERMINAL for the session.                       │
//! │  `restart` never rewinds a session - it replaces it with a fresh one    │
//! │  that begins in Scanning with a newly acquired camera.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine consults [`ScanState::can_transition_to`] before every state
//! write, so an out-of-order write (e.g. from a stale task) is rejected
//! rather than silently corrupting the session.

use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

// =============================================================================
// Scan State
// =============================================================================

/// The state of a single scan session.
///
/// Sessions move monotonically forward; see the module docs for the full
/// transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// Camera acquired, frame sampling in progress.
    #[default]
    Scanning,

    /// A payload was decoded; sampling has stopped, settlement not yet issued.
    Detected,

    /// Exactly one settlement request is outstanding.
    Settling,

    /// Settlement resolved with a duration/amount result. Terminal.
    Succeeded,

    /// Camera acquisition or settlement failed. Terminal.
    Failed,
}

impl ScanState {
    /// Returns true if this state ends the session (only `restart` follows).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Succeeded | ScanState::Failed)
    }

    /// Returns true if the state machine allows moving from `self` to `to`.
    ///
    /// ## Allowed Transitions
    /// - Scanning → Detected (decode success)
    /// - Scanning → Failed (camera acquisition failure, never via Detected)
    /// - Detected → Settling (settlement issued)
    /// - Settling → Succeeded | Failed (outcome)
    ///
    /// Everything else - including any transition out of a terminal state -
    /// is forbidden. A new Scanning state only ever comes from a new session.
    pub fn can_transition_to(&self, to: ScanState) -> bool {
        use ScanState::*;
        matches!(
            (self, to),
            (Scanning, Detected)
                | (Scanning, Failed)
                | (Detected, Settling)
                | (Settling, Succeeded)
                | (Settling, Failed)
        )
    }

    /// Validates a transition, returning a typed error when forbidden.
    pub fn transition_to(&self, to: ScanState) -> Result<ScanState, TransitionError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(TransitionError { from: *self, to })
        }
    }
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Scanning => write!(f, "scanning"),
            ScanState::Detected => write!(f, "detected"),
            ScanState::Settling => write!(f, "settling"),
            ScanState::Succeeded => write!(f, "succeeded"),
            ScanState::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ScanState::*;

    const ALL: [ScanState; 5] = [Scanning, Detected, Settling, Succeeded, Failed];

    #[test]
    fn test_happy_path_transitions() {
        assert!(Scanning.can_transition_to(Detected));
        assert!(Detected.can_transition_to(Settling));
        assert!(Settling.can_transition_to(Succeeded));
        assert!(Settling.can_transition_to(Failed));
    }

    #[test]
    fn test_acquisition_failure_short_circuits() {
        // Camera failure goes straight to Failed without entering Detected
        assert!(Scanning.can_transition_to(Failed));
        assert!(!Scanning.can_transition_to(Settling));
        assert!(!Scanning.can_transition_to(Succeeded));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for terminal in [Succeeded, Failed] {
            assert!(terminal.is_terminal());
            for to in ALL {
                assert!(
                    !terminal.can_transition_to(to),
                    "{terminal} must not transition to {to}"
                );
            }
        }
    }

    #[test]
    fn test_no_rewind_to_scanning() {
        // Restart replaces the session; no state may flow back to Scanning
        for from in ALL {
            assert!(!from.can_transition_to(Scanning));
        }
    }

    #[test]
    fn test_transition_to_reports_error_context() {
        let err = Detected.transition_to(Succeeded).unwrap_err();
        assert_eq!(err.from, Detected);
        assert_eq!(err.to, Succeeded);
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Scanning).unwrap();
        assert_eq!(json, "\"scanning\"");
        let back: ScanState = serde_json::from_str("\"succeeded\"").unwrap();
        assert_eq!(back, Succeeded);
    }
}
