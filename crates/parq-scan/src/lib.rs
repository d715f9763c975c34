//! # parq-scan: Scan Engine for Parq Scan
//!
//! This crate provides the acquisition-and-decode pipeline: point a camera
//! at a printed optical code, decode it frame by frame in real time, and
//! trigger a one-shot settlement request whose duration/amount result is
//! handed to the presentation layer.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scan Engine Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 ScanController (state machine)                   │  │
//! │  │                                                                  │  │
//! │  │  Owns the live ScanSession; spawns one scan task per session     │  │
//! │  │  start / restart / shutdown / session()                          │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ CaptureSession │  │  FrameSampler  │  │ SettlementCoordinator  │    │
//! │  │                │  │                │  │                        │    │
//! │  │ Scoped owner of│  │ One snapshot + │  │ Single-flight POST of  │    │
//! │  │ the camera;    │  │ decode attempt │  │ the decoded payload;   │    │
//! │  │ release on all │  │ per redraw tick│  │ envelope -> outcome    │    │
//! │  │ exit paths     │  │                │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  CONCURRENCY MODEL:                                                    │
//! │  ──────────────────                                                    │
//! │  Single logical thread of control per session; suspension points are   │
//! │  the redraw tick and the settlement network call. Cancellation is      │
//! │  cooperative (stop flag + task cancellation), and camera release is    │
//! │  guaranteed by scoped ownership.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`controller`] - `ScanController` state machine and `ScanSession`
//! - [`camera`] - Camera capability traits and the scoped `CaptureSession`
//! - [`sampler`] - Cooperative frame-sampling loop and tick scheduling
//! - [`settlement`] - Settlement request, wire envelope, single-flight guard
//! - [`config`] - Engine configuration (TOML + defaults)
//! - [`error`] - Scan error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use parq_scan::{ScanConfig, ScanController};
//!
//! let mut controller = ScanController::builder(ScanConfig::load()?)
//!     .with_camera(host_camera)
//!     .with_decoder(optical_decoder)
//!     .with_credentials(token_provider)
//!     .build()?;
//!
//! controller.start().await;
//!
//! // Presentation layer polls or subscribes to the snapshot
//! let session = controller.session().await;
//! println!("state: {}", session.state);
//!
//! // Terminal state + user tapping "Scan Another Code"
//! controller.restart().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod sampler;
pub mod settlement;

// =============================================================================
// Re-exports
// =============================================================================

pub use camera::{CameraAccess, CameraHandle, CaptureSession, FacingPreference, FrameStatus};
pub use config::{CameraConfig, SamplerConfig, ScanConfig, SettlementConfig};
pub use controller::{ScanController, ScanControllerBuilder, ScanSession, SchedulerFactory};
pub use error::{ScanError, ScanResult};
pub use sampler::{FrameSampler, RedrawScheduler, SamplerState, SamplerStop, TickScheduler};
pub use settlement::{
    CredentialProvider, HttpSettlementClient, SettlementClient, SettlementCoordinator,
    SettlementEnvelope, StaticCredential,
};

// Re-export the core crate so hosts depend on one crate only
pub use parq_core;
