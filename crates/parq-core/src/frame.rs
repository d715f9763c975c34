//! # Frame Buffer
//!
//! The reusable pixel buffer that the sampler snapshots the camera into on
//! every tick.
//!
//! ## Reuse Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     FrameBuffer per Tick                                │
//! │                                                                         │
//! │  tick n:    camera frame (640x480) ──► ensure_size ──► overwrite       │
//! │  tick n+1:  camera frame (640x480) ──► (no realloc)  ──► overwrite     │
//! │  tick n+2:  camera frame (1280x720) ─► ensure_size ──► realloc+write   │
//! │                                                                         │
//! │  One buffer per sampler, overwritten every tick, never shared           │
//! │  outside the sampling loop.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dimensions follow the camera source's native resolution; the buffer
//! resizes itself only when those dimensions change, so the steady state
//! allocates nothing.

use crate::error::CoreError;
use crate::SAMPLES_PER_PIXEL;

// =============================================================================
// Frame Buffer
// =============================================================================

/// A mutable, reused RGBA pixel buffer plus its dimensions.
///
/// Owned by the frame sampler; overwritten every sampling tick. Decoders
/// receive it by shared reference and must not retain it.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl FrameBuffer {
    /// Creates an empty buffer. It takes its real size from the first frame.
    pub fn new() -> Self {
        FrameBuffer::default()
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns true if no frame has been written yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The raw RGBA samples, row-major, `SAMPLES_PER_PIXEL` bytes per pixel.
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Resizes the buffer for the given dimensions, keeping the existing
    /// allocation when they have not changed.
    ///
    /// Returns the mutable sample slice for the source to write into.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> Result<&mut [u8], CoreError> {
        let pixels = (width as usize)
            .checked_mul(height as usize)
            .filter(|_| width > 0 && height > 0)
            .ok_or(CoreError::InvalidFrameDimensions { width, height })?;
        let len = pixels
            .checked_mul(SAMPLES_PER_PIXEL)
            .ok_or(CoreError::InvalidFrameDimensions { width, height })?;

        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.samples.resize(len, 0);
        }
        Ok(&mut self.samples)
    }

    /// Copies a full frame into the buffer, resizing first if needed.
    pub fn write_frame(&mut self, width: u32, height: u32, data: &[u8]) -> Result<(), CoreError> {
        let dst = self.ensure_size(width, height)?;
        if data.len() != dst.len() {
            return Err(CoreError::InvalidFrameDimensions { width, height });
        }
        dst.copy_from_slice(data);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
