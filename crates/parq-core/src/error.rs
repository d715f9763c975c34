//! # Error Types
//!
//! Domain-specific error types for parq-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  parq-core errors (this file)                                          │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── TransitionError  - Illegal scan-state transitions                 │
//! │                                                                         │
//! │  parq-scan errors (separate crate)                                     │
//! │  └── ScanError        - Camera / settlement / engine failures          │
//! │                                                                         │
//! │  Flow: TransitionError → CoreError → ScanError → Presentation          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (states, dimensions, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::state::ScanState;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
///
/// These errors represent violations of the scan-session domain rules.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A scan state transition that the state machine forbids.
    ///
    /// ## When This Occurs
    /// - A late settlement result tries to move a session that already
    ///   restarted (the engine discards these before they get here)
    /// - A caller drives the state machine out of order
    #[error("Invalid transition: {0}")]
    Transition(#[from] TransitionError),

    /// A frame buffer with dimensions that cannot hold a frame.
    ///
    /// ## When This Occurs
    /// - Width or height of zero reported by a camera source
    /// - Dimensions whose sample count would overflow
    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidFrameDimensions { width: u32, height: u32 },

    /// A decoded payload that is empty.
    ///
    /// A payload is used as a settlement locator, so an empty string can
    /// never be meaningful.
    #[error("Decoded payload is empty")]
    EmptyPayload,
}

// =============================================================================
// Transition Error
// =============================================================================

/// An attempted scan-state transition that the monotonic state machine
/// does not allow.
///
/// Sessions only move forward (Scanning → Detected → Settling → terminal);
/// the only way back to Scanning is a fresh session.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Cannot transition from {from} to {to}")]
pub struct TransitionError {
    /// The state the session was in.
    pub from: ScanState,

    /// The state the caller asked for.
    pub to: ScanState,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
