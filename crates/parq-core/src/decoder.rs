//! # Decoder Contract
//!
//! The opaque decode function at the bottom of the pipeline: pixel buffer in,
//! optional payload out.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Decoder Contract                                 │
//! │                                                                         │
//! │  decode(&FrameBuffer) ──► Some(DecodedPayload)   code found            │
//! │                      └──► None                   no code in frame      │
//! │                                                                         │
//! │  MUST be deterministic: same buffer, same result                        │
//! │  MUST be side-effect-free: no state, no I/O                             │
//! │  MUST NOT retry: absence of a code is not an error - the sampler        │
//! │  simply tries again with the next frame                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The symbology internals live behind this trait on purpose: the engine is
//! tested with synthetic decoders, and a production binary plugs in a real
//! optical-code library without the core ever depending on it.

use crate::frame::FrameBuffer;
use crate::outcome::DecodedPayload;

// =============================================================================
// Decoder Trait
// =============================================================================

/// Decodes an optical code out of a captured frame.
///
/// Implementations must be deterministic and side-effect-free so they are
/// independently testable with synthetic buffers.
pub trait Decoder: Send + Sync {
    /// Attempts to decode a payload from the frame.
    ///
    /// Returns `None` when no code is present; that is the normal case for
    /// most frames and is never an error.
    fn decode(&self, frame: &FrameBuffer) -> Option<DecodedPayload>;
}

// =============================================================================
// Closure Adapter
// =============================================================================

/// Adapts a plain function or closure into a [`Decoder`].
///
/// Mostly useful in tests and demos, where a decoder that recognizes a
/// synthetic marker is all that is needed.
pub struct FnDecoder<F>(F);

impl<F> FnDecoder<F>
where
    F: Fn(&FrameBuffer) -> Option<DecodedPayload> + Send + Sync,
{
    /// Wraps the given function.
    pub fn new(f: F) -> Self {
        FnDecoder(f)
    }
}

impl<F> Decoder for FnDecoder<F>
where
    F: Fn(&FrameBuffer) -> Option<DecodedPayload> + Send + Sync,
{
    fn decode(&self, frame: &FrameBuffer) -> Option<DecodedPayload> {
        (self.0)(frame)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
