//! # Camera Access & Capture Session
//!
//! The camera capability traits and the scoped owner of an acquired device.
//!
//! ## Ownership Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Camera Resource Lifetime                            │
//! │                                                                         │
//! │  CameraAccess.acquire(facing) ──► CaptureSession (single owner)         │
//! │                                        │                                │
//! │            borrows transiently         │  owns exclusively              │
//! │  FrameSampler ◄────────────────────────┤                                │
//! │  (one snapshot per tick)               │                                │
//! │                                        ▼                                │
//! │                                   release()                             │
//! │                                                                         │
//! │  release() runs on EVERY exit path:                                     │
//! │  • decode success (camera off before settlement)                        │
//! │  • explicit stop / restart                                              │
//! │  • teardown (component unmount)                                         │
//! │  • error / task cancellation (via Drop)                                 │
//! │                                                                         │
//! │  Invariant: at most one CaptureSession is open at any time, and         │
//! │  release happens exactly once per acquire.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The camera was ambient component state in earlier iterations of the scan
//! page; here it is an explicitly owned resource object. The sampler only
//! ever borrows it for the duration of one snapshot.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use parq_core::FrameBuffer;

use crate::error::ScanResult;

// =============================================================================
// Facing Preference
// =============================================================================

/// Which physical camera to request from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingPreference {
    /// The rear (environment-facing) camera. Default: codes are printed on
    /// physical tickets, so the user points the back of the device at them.
    #[default]
    Rear,

    /// The front (user-facing) camera.
    Front,

    /// Whatever camera the host offers first.
    Any,
}

impl std::fmt::Display for FacingPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingPreference::Rear => write!(f, "rear"),
            FacingPreference::Front => write!(f, "front"),
            FacingPreference::Any => write!(f, "any"),
        }
    }
}

// =============================================================================
// Frame Status
// =============================================================================

/// Whether a snapshot produced a full frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The source has not delivered a complete frame yet; try next tick
    /// without a decode attempt.
    NotReady,

    /// A full frame was written into the buffer at native resolution.
    Captured,
}

// =============================================================================
// Capability Traits
// =============================================================================

/// Host capability for opening a camera device.
///
/// Implemented by the embedding host (and by mocks in tests). Acquisition
/// turns on the physical camera indicator, so callers must guarantee a
/// matching release.
pub trait CameraAccess: Send + Sync {
    /// Requests a camera matching the preference.
    ///
    /// Fails with [`crate::ScanError::DeviceUnavailable`] when there is no
    /// camera, permission is denied, or the hardware is busy.
    fn acquire(&self, facing: FacingPreference) -> BoxFuture<'_, ScanResult<Box<dyn CameraHandle>>>;
}

/// A live camera device handle.
pub trait CameraHandle: Send {
    /// Snapshots the current frame into the buffer at the source's native
    /// resolution, resizing the buffer if the dimensions changed.
    ///
    /// Returns [`FrameStatus::NotReady`] while the source has not yet
    /// produced a full frame.
    fn snapshot_into(&mut self, frame: &mut FrameBuffer) -> FrameStatus;

    /// Stops all underlying device tracks. Must tolerate repeated calls.
    fn release(&mut self);
}

// =============================================================================
// Capture Session
// =============================================================================

/// Scoped owner of an acquired camera for the lifetime of one scan attempt.
///
/// ## Release Guarantee
/// `release()` is idempotent and also runs from `Drop`, so the camera is
/// never left active no matter how control leaves the scan attempt -
/// normal completion, explicit stop, teardown, or cancellation mid-await.
pub struct CaptureSession {
    handle: Option<Box<dyn CameraHandle>>,
}

impl CaptureSession {
    /// Acquires a camera from the host capability.
    pub async fn acquire(camera: &dyn CameraAccess, facing: FacingPreference) -> ScanResult<Self> {
        debug!(%facing, "Requesting camera");
        let handle = camera.acquire(facing).await?;
        info!(%facing, "Camera acquired");
        Ok(CaptureSession {
            handle: Some(handle),
        })
    }

    /// Snapshots the current frame into the buffer.
    ///
    /// A released session reports [`FrameStatus::NotReady`].
    pub fn snapshot_into(&mut self, frame: &mut FrameBuffer) -> FrameStatus {
        match self.handle.as_mut() {
            Some(handle) => handle.snapshot_into(frame),
            None => FrameStatus::NotReady,
        }
    }

    /// Stops the underlying device tracks. Idempotent.
    pub fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
            info!("Camera released");
        }
    }

    /// Returns true once the camera has been released.
    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
