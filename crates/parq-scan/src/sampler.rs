//! # Frame Sampler
//!
//! The cooperative loop that snapshots the camera once per host redraw tick
//! and hands each frame to the decoder, stopping itself the instant a
//! payload is found.
//!
//! ## Tick Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        One Sampling Tick                                │
//! │                                                                         │
//! │  await scheduler.next_tick()        (suspension point)                  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  stop flag set? ── yes ──► return None (Sampling → Idle)               │
//! │        │ no                                                             │
//! │        ▼                                                                │
//! │  snapshot frame ── NotReady ──► reschedule (no decode attempt)          │
//! │        │ Captured (buffer resized to native resolution if needed)       │
//! │        ▼                                                                │
//! │  decode(buffer) ── None ──► reschedule (Sampling → Sampling)            │
//! │        │ Some(payload)                                                  │
//! │        ▼                                                                │
//! │  return payload (Sampling → Idle, no further tick scheduled)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ticks are strictly serialized: tick n+1 is only awaited after tick n's
//! decode attempt completes, so the sampler never runs concurrently with
//! itself. Cancellation is cooperative - an in-flight tick runs to
//! completion, and the flag is checked before any further work is done.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tracing::{debug, info};

use parq_core::{DecodedPayload, Decoder, FrameBuffer};

use crate::camera::{CaptureSession, FrameStatus};

// =============================================================================
// Tick Scheduler
// =============================================================================

/// Host capability for the cooperative redraw cadence.
///
/// One tick per visual refresh, not a fixed-rate timer: an embedding host
/// keys this to its repaint loop so sampling never outpaces what the user
/// can see in the viewfinder.
pub trait TickScheduler: Send {
    /// Suspends until the host's next redraw tick.
    fn next_tick(&mut self) -> BoxFuture<'_, ()>;
}

/// Default scheduler approximating a display refresh with a tokio interval.
///
/// Missed ticks are delayed rather than burst, so a slow decode attempt
/// never causes ticks to bunch up behind it.
pub struct RedrawScheduler {
    interval: tokio::time::Interval,
}

impl RedrawScheduler {
    /// Creates a scheduler ticking at the given period.
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        RedrawScheduler { interval }
    }
}

impl TickScheduler for RedrawScheduler {
    fn next_tick(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.interval.tick().await;
        })
    }
}

// =============================================================================
// Sampler Stop Handle
// =============================================================================

/// Cloneable handle that cancels a running [`FrameSampler`].
///
/// `stop()` is idempotent and callable from any state; the sampler observes
/// the flag at the top of its next tick.
#[derive(Clone, Default)]
pub struct SamplerStop {
    stopped: Arc<AtomicBool>,
}

impl SamplerStop {
    /// Creates an un-tripped stop handle.
    pub fn new() -> Self {
        SamplerStop::default()
    }

    /// Requests cancellation. No further tick is scheduled after the
    /// sampler observes this.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Returns true once `stop()` has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Frame Sampler
// =============================================================================

/// Sampler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// Not sampling; no tick scheduled.
    Idle,

    /// Loop in progress, one tick at a time.
    Sampling,
}

/// The frame-by-frame scanning loop.
///
/// Owns the reused [`FrameBuffer`]; borrows the [`CaptureSession`]
/// transiently for one snapshot per tick. Never shared outside the loop.
pub struct FrameSampler {
    decoder: Arc<dyn Decoder>,
    scheduler: Box<dyn TickScheduler>,
    buffer: FrameBuffer,
    stop: SamplerStop,
    state: SamplerState,
}

impl FrameSampler {
    /// Creates an idle sampler.
    pub fn new(decoder: Arc<dyn Decoder>, scheduler: Box<dyn TickScheduler>) -> Self {
        Self::with_stop(decoder, scheduler, SamplerStop::new())
    }

    /// Creates an idle sampler controlled by an externally held stop handle.
    ///
    /// Used by the controller, which keeps the handle so it can cancel the
    /// sampler after it has moved into the scan task.
    pub fn with_stop(
        decoder: Arc<dyn Decoder>,
        scheduler: Box<dyn TickScheduler>,
        stop: SamplerStop,
    ) -> Self {
        FrameSampler {
            decoder,
            scheduler,
            buffer: FrameBuffer::new(),
            stop,
            state: SamplerState::Idle,
        }
    }

    /// Returns a handle that cancels this sampler from outside the loop.
    pub fn stop_handle(&self) -> SamplerStop {
        self.stop.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Runs the sampling loop (Idle → Sampling) until a payload is decoded
    /// or the stop handle is tripped (→ Idle either way).
    ///
    /// Returns `None` only on cancellation; absence of a code just means
    /// another tick. The loop exits before the payload is handed anywhere,
    /// so decode success is observed at most once per session.
    pub async fn run(&mut self, session: &mut CaptureSession) -> Option<DecodedPayload> {
        self.state = SamplerState::Sampling;
        debug!("Sampling started");
        let payload = self.sample_loop(session).await;
        self.state = SamplerState::Idle;
        payload
    }

    async fn sample_loop(&mut self, session: &mut CaptureSession) -> Option<DecodedPayload> {
        loop {
            self.scheduler.next_tick().await;

            if self.stop.is_stopped() {
                debug!("Sampling cancelled");
                return None;
            }

            // Snapshot at native resolution; skip the decode attempt until
            // the source has produced a full frame.
            match session.snapshot_into(&mut self.buffer) {
                FrameStatus::NotReady => continue,
                FrameStatus::Captured => {}
            }

            if let Some(payload) = self.decoder.decode(&self.buffer) {
                info!(
                    width = self.buffer.width(),
                    height = self.buffer.height(),
                    "Optical code detected"
                );
                return Some(payload);
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
