//! # parq-core: Pure Domain Logic for Parq Scan
//!
//! This crate is the **heart** of the scan pipeline. It contains the decode
//! contract and the scan-session domain model as pure types with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Parq Scan Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Presentation (scan page UI)                    │   │
//! │  │    viewfinder ──► spinner ──► outcome card ──► restart button   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  parq-scan (engine crate)                       │   │
//! │  │    CaptureSession, FrameSampler, SettlementCoordinator,         │   │
//! │  │    ScanController                                               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ parq-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   frame   │  │  decoder  │  │   state   │  │  outcome  │  │   │
//! │  │   │FrameBuffer│  │  Decoder  │  │ ScanState │  │Settlement │  │   │
//! │  │   │           │  │ FnDecoder │  │transitions│  │  Outcome  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CAMERA • NO NETWORK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`frame`] - Reusable pixel buffer snapshotted each sampling tick
//! - [`decoder`] - The opaque decode contract (pixel buffer -> payload)
//! - [`state`] - Scan session states and their monotonic transitions
//! - [`outcome`] - Decoded payload and settlement outcome types
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: decoding is deterministic - same buffer = same result
//! 2. **No I/O**: camera, network, file system access is FORBIDDEN here
//! 3. **Monotonic States**: a session only moves forward; restart means a
//!    fresh session, never an in-place rewind
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod decoder;
pub mod error;
pub mod frame;
pub mod outcome;
pub mod state;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use parq_core::FrameBuffer` instead of
// `use parq_core::frame::FrameBuffer`

pub use decoder::{Decoder, FnDecoder};
pub use error::{CoreError, CoreResult, TransitionError};
pub use frame::FrameBuffer;
pub use outcome::{DecodedPayload, SettlementOutcome};
pub use state::ScanState;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of samples per pixel in a [`FrameBuffer`] (RGBA).
///
/// ## Why a constant?
/// Camera snapshot sources deliver RGBA8 image data; decoders and the
/// sampler both need to agree on the stride when sizing and walking the
/// buffer.
pub const SAMPLES_PER_PIXEL: usize = 4;
