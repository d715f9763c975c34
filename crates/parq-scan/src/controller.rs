//! # Scan Controller
//!
//! The top-level state machine wiring camera, sampler, and settlement
//! together, exposed to the presentation layer as `start`, `restart`, and a
//! session snapshot.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     ScanController Orchestration                        │
//! │                                                                         │
//! │  start/restart ──► fresh ScanSession (new uuid) ──► spawn scan task     │
//! │                                                                         │
//! │  scan task:                                                             │
//! │    acquire camera ── fail ──► Failed (DeviceUnavailable,                │
//! │         │                     never enters Detected)                    │
//! │         ▼                                                               │
//! │    FrameSampler.run ── cancelled ──► exit (camera released via Drop)    │
//! │         │ payload                                                       │
//! │         ▼                                                               │
//! │    release camera ──► Detected ──► Settling ──► settle(payload)         │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                            Succeeded / Failed (terminal)                │
//! │                                                                         │
//! │  Every state write carries the uuid of the session it was spawned      │
//! │  for; a write whose uuid no longer matches the live session is a        │
//! │  logged no-op. That is how a settlement response arriving after         │
//! │  restart is discarded.                                                  │
//! │                                                                         │
//! │  Teardown (shutdown / Drop) cancels the task from any state; the        │
//! │  CaptureSession inside the task releases the camera on drop.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use parq_core::{Decoder, ScanState, SettlementOutcome};

use crate::camera::{CameraAccess, CaptureSession, FacingPreference};
use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};
use crate::sampler::{FrameSampler, RedrawScheduler, SamplerStop, TickScheduler};
use crate::settlement::{
    CredentialProvider, HttpSettlementClient, SettlementClient, SettlementCoordinator,
};

/// Produces a fresh scheduler for each scan session.
pub type SchedulerFactory = Arc<dyn Fn() -> Box<dyn TickScheduler> + Send + Sync>;

// =============================================================================
// Scan Session
// =============================================================================

/// Snapshot of the live scan session, consumed by the presentation layer.
///
/// Exactly one session is live at a time, owned by [`ScanController`].
/// Created on `start`, replaced (never rewound) on `restart`. Before the
/// first `start` the controller holds an inert placeholder in Scanning: no
/// task carries its id, so nothing ever writes to it, and `start` swaps in
/// a fresh session under a new id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSession {
    /// Session identity; state writes from replaced sessions are discarded
    /// by comparing against this.
    pub id: Uuid,

    /// Current state machine position.
    pub state: ScanState,

    /// The settlement outcome, present once the session is terminal via
    /// settlement.
    pub outcome: Option<SettlementOutcome>,

    /// Human-readable message for the Failed state.
    pub last_error: Option<String>,

    /// When this session entered Scanning.
    pub started_at: DateTime<Utc>,
}

impl ScanSession {
    fn new() -> Self {
        ScanSession {
            id: Uuid::new_v4(),
            state: ScanState::Scanning,
            outcome: None,
            last_error: None,
            started_at: Utc::now(),
        }
    }
}

// =============================================================================
// Scan Controller
// =============================================================================

/// Owns the live [`ScanSession`] and drives the scan-to-settlement pipeline.
pub struct ScanController {
    camera: Arc<dyn CameraAccess>,
    decoder: Arc<dyn Decoder>,
    client: Arc<dyn SettlementClient>,
    credentials: Arc<dyn CredentialProvider>,
    scheduler: SchedulerFactory,
    facing: FacingPreference,
    session: Arc<RwLock<ScanSession>>,
    task: Option<JoinHandle<()>>,
    stop: Option<SamplerStop>,
}

impl ScanController {
    /// Returns a builder; camera, decoder, and credentials are required.
    pub fn builder(config: ScanConfig) -> ScanControllerBuilder {
        ScanControllerBuilder::new(config)
    }

    /// Snapshot of the current session.
    ///
    /// Before the first `start` this is the inert placeholder described on
    /// [`ScanSession`]; no camera has been acquired for it.
    pub async fn session(&self) -> ScanSession {
        self.session.read().await.clone()
    }

    /// Begins the first scan session.
    ///
    /// Camera acquisition failure is reported through the session state
    /// (Scanning → Failed with a DeviceUnavailable message), not through a
    /// return value, so the presentation layer has a single place to look.
    pub async fn start(&mut self) {
        if self.task.is_some() {
            warn!("start called on a running controller; ignoring");
            return;
        }
        self.begin_session().await;
    }

    /// Discards the current session and re-enters Scanning with a freshly
    /// acquired camera. The only way out of a terminal state.
    ///
    /// Callable from any state: restarting mid-Settling detaches the
    /// outstanding request, whose late result is then discarded by session
    /// identity.
    pub async fn restart(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.stop();
        }
        if let Some(task) = self.task.take() {
            let settling = self.session.read().await.state == ScanState::Settling;
            if settling {
                // Let the outstanding settlement resolve in the background;
                // its result no longer matches the live session id.
                debug!("Detaching in-flight settlement from replaced session");
                drop(task);
            } else {
                // Cancel the task and wait for its capture session to drop,
                // so the old camera is released before a new acquire.
                task.abort();
                let _ = task.await;
            }
        }
        self.begin_session().await;
    }

    /// Teardown: cancels the scan task and releases the camera regardless
    /// of current state. The session snapshot stays readable afterwards.
    pub async fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.stop();
        }
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        info!("Scan controller shut down");
    }

    async fn begin_session(&mut self) {
        let fresh = ScanSession::new();
        let session_id = fresh.id;
        *self.session.write().await = fresh;

        let stop = SamplerStop::new();
        self.stop = Some(stop.clone());

        let scheduler = (self.scheduler)();
        self.task = Some(tokio::spawn(run_scan(ScanTask {
            camera: self.camera.clone(),
            decoder: self.decoder.clone(),
            client: self.client.clone(),
            credentials: self.credentials.clone(),
            facing: self.facing,
            scheduler,
            stop,
            shared: self.session.clone(),
            session_id,
        })));

        info!(%session_id, "Scan session started");
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        // Cannot await here; abort cancels the task at its next suspension
        // point and the CaptureSession inside it releases the camera on drop.
        if let Some(stop) = self.stop.take() {
            stop.stop();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// =============================================================================
// Scan Task
// =============================================================================

/// Everything one scan session's task needs, moved into the spawn.
struct ScanTask {
    camera: Arc<dyn CameraAccess>,
    decoder: Arc<dyn Decoder>,
    client: Arc<dyn SettlementClient>,
    credentials: Arc<dyn CredentialProvider>,
    facing: FacingPreference,
    scheduler: Box<dyn TickScheduler>,
    stop: SamplerStop,
    shared: Arc<RwLock<ScanSession>>,
    session_id: Uuid,
}

/// One full acquire → sample → settle pass for a single session.
async fn run_scan(task: ScanTask) {
    let ScanTask {
        camera,
        decoder,
        client,
        credentials,
        facing,
        scheduler,
        stop,
        shared,
        session_id,
    } = task;

    let mut capture = match CaptureSession::acquire(camera.as_ref(), facing).await {
        Ok(capture) => capture,
        Err(e) => {
            // Scanning → Failed without ever entering Detected
            warn!(%session_id, error = %e, "Camera acquisition failed");
            fail_session(&shared, session_id, e.to_string()).await;
            return;
        }
    };

    let mut sampler = FrameSampler::with_stop(decoder, scheduler, stop);
    let payload = sampler.run(&mut capture).await;

    // The camera goes dark the moment sampling ends; settlement does not
    // need it and restart must be able to acquire a fresh one.
    capture.release();
    drop(capture);

    let Some(payload) = payload else {
        debug!(%session_id, "Sampling cancelled before a code was found");
        return;
    };

    if !advance(&shared, session_id, ScanState::Detected).await {
        return;
    }

    let coordinator = SettlementCoordinator::new(client, credentials);
    if !advance(&shared, session_id, ScanState::Settling).await {
        return;
    }

    let outcome = match coordinator.settle(&payload).await {
        Ok(outcome) => outcome,
        // A fresh coordinator cannot be in flight; fold the rejection into
        // a failure outcome all the same.
        Err(e) => SettlementOutcome::failure(e.to_string()),
    };

    finish_session(&shared, session_id, outcome).await;
}

/// Applies a forward transition if the session is still the live one.
///
/// Returns false when the write was discarded (stale session) or the
/// transition was out of order.
async fn advance(shared: &Arc<RwLock<ScanSession>>, session_id: Uuid, to: ScanState) -> bool {
    let mut session = shared.write().await;
    if session.id != session_id {
        debug!(%session_id, %to, "Discarding state change from replaced session");
        return false;
    }
    match session.state.transition_to(to) {
        Ok(to) => {
            debug!(%session_id, state = %to, "Session state changed");
            session.state = to;
            true
        }
        Err(e) => {
            warn!(%session_id, error = %e, "Refused out-of-order state change");
            false
        }
    }
}

/// Terminal Failed write for pre-settlement failures (camera acquisition).
async fn fail_session(shared: &Arc<RwLock<ScanSession>>, session_id: Uuid, reason: String) {
    let mut session = shared.write().await;
    if session.id != session_id {
        debug!(%session_id, "Discarding failure from replaced session");
        return;
    }
    if let Err(e) = session.state.transition_to(ScanState::Failed) {
        warn!(%session_id, error = %e, "Refused out-of-order failure");
        return;
    }
    session.state = ScanState::Failed;
    session.last_error = Some(reason);
}

/// Terminal write for the settlement outcome, discarded when the session
/// has been replaced by a restart issued while it was Settling.
async fn finish_session(
    shared: &Arc<RwLock<ScanSession>>,
    session_id: Uuid,
    outcome: SettlementOutcome,
) {
    let mut session = shared.write().await;
    if session.id != session_id {
        info!(%session_id, "Discarding late settlement result for replaced session");
        return;
    }
    let to = if outcome.is_success() {
        ScanState::Succeeded
    } else {
        ScanState::Failed
    };
    if let Err(e) = session.state.transition_to(to) {
        warn!(%session_id, error = %e, "Refused out-of-order settlement result");
        return;
    }
    session.state = to;
    if let SettlementOutcome::Failure { reason } = &outcome {
        session.last_error = Some(reason.clone());
    }
    session.outcome = Some(outcome);
    info!(%session_id, state = %to, "Scan session finished");
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`ScanController`].
pub struct ScanControllerBuilder {
    config: ScanConfig,
    camera: Option<Arc<dyn CameraAccess>>,
    decoder: Option<Arc<dyn Decoder>>,
    client: Option<Arc<dyn SettlementClient>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    scheduler: Option<SchedulerFactory>,
}

impl ScanControllerBuilder {
    /// Creates a new builder with the given config.
    pub fn new(config: ScanConfig) -> Self {
        ScanControllerBuilder {
            config,
            camera: None,
            decoder: None,
            client: None,
            credentials: None,
            scheduler: None,
        }
    }

    /// Sets the host camera capability.
    pub fn with_camera(mut self, camera: Arc<dyn CameraAccess>) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Sets the optical-code decoder.
    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Overrides the settlement transport (default: HTTP with the
    /// configured timeout).
    pub fn with_client(mut self, client: Arc<dyn SettlementClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the credential provider for the settlement request.
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Overrides the tick scheduler (default: [`RedrawScheduler`] at the
    /// configured interval). Hosts with a real repaint loop hook it in here.
    pub fn with_scheduler(mut self, scheduler: SchedulerFactory) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Builds the controller.
    pub fn build(self) -> ScanResult<ScanController> {
        self.config.validate()?;

        let camera = self
            .camera
            .ok_or_else(|| ScanError::InvalidConfig("Camera capability required".into()))?;
        let decoder = self
            .decoder
            .ok_or_else(|| ScanError::InvalidConfig("Decoder required".into()))?;
        let credentials = self
            .credentials
            .ok_or_else(|| ScanError::InvalidConfig("Credential provider required".into()))?;

        let client: Arc<dyn SettlementClient> = match self.client {
            Some(client) => client,
            None => Arc::new(HttpSettlementClient::new(
                self.config.settlement.request_timeout(),
            )?),
        };

        let scheduler = self.scheduler.unwrap_or_else(|| {
            let tick = self.config.sampler.tick_interval();
            Arc::new(move || Box::new(RedrawScheduler::new(tick)) as Box<dyn TickScheduler>)
        });

        Ok(ScanController {
            camera,
            decoder,
            client,
            credentials,
            scheduler,
            facing: self.config.camera.facing,
            session: Arc::new(RwLock::new(ScanSession::new())),
            task: None,
            stop: None,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraHandle, FrameStatus};
    use crate::sampler::TickScheduler;
    use crate::settlement::{SettlementEnvelope, StaticCredential};
    use futures_util::future::BoxFuture;
    use parq_core::{DecodedPayload, FnDecoder, FrameBuffer, SAMPLES_PER_PIXEL};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::oneshot;
    use url::Url;

    const MARKER: u8 = 0xAB;
    const PAYLOAD: &str = "http://svc/booking/confirm/abc123";

    struct YieldScheduler;

    impl TickScheduler for YieldScheduler {
        fn next_tick(&mut self) -> BoxFuture<'_, ()> {
            Box::pin(tokio::task::yield_now())
        }
    }

    fn yield_scheduler() -> SchedulerFactory {
        Arc::new(|| Box::new(YieldScheduler) as Box<dyn TickScheduler>)
    }

    /// Frames a handle serves: `blanks` code-free frames, then the marker
    /// forever. `NEVER` means the marker never appears.
    const NEVER: usize = usize::MAX;

    /// Camera with one blanks-count script per acquire (the last script
    /// repeats), counting acquires and releases.
    struct TestCamera {
        scripts: Mutex<Vec<usize>>,
        fail_acquire: bool,
        acquired: Arc<AtomicUsize>,
        released: Arc<AtomicUsize>,
    }

    impl TestCamera {
        fn new(blanks: usize) -> Self {
            Self::with_scripts(vec![blanks])
        }

        fn with_scripts(scripts: Vec<usize>) -> Self {
            TestCamera {
                scripts: Mutex::new(scripts),
                fail_acquire: false,
                acquired: Arc::new(AtomicUsize::new(0)),
                released: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    struct TestHandle {
        remaining_blanks: usize,
        released: Arc<AtomicUsize>,
    }

    impl CameraHandle for TestHandle {
        fn snapshot_into(&mut self, frame: &mut FrameBuffer) -> FrameStatus {
            let mut data = vec![0u8; 2 * 2 * SAMPLES_PER_PIXEL];
            match self.remaining_blanks {
                NEVER => {}
                0 => data[0] = MARKER,
                _ => self.remaining_blanks -= 1,
            }
            frame.write_frame(2, 2, &data).unwrap();
            FrameStatus::Captured
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CameraAccess for TestCamera {
        fn acquire(
            &self,
            _facing: FacingPreference,
        ) -> BoxFuture<'_, crate::error::ScanResult<Box<dyn CameraHandle>>> {
            Box::pin(async move {
                if self.fail_acquire {
                    return Err(ScanError::DeviceUnavailable("Permission denied".into()));
                }
                self.acquired.fetch_add(1, Ordering::SeqCst);
                let blanks = {
                    let mut scripts = self.scripts.lock().unwrap();
                    if scripts.len() > 1 {
                        scripts.remove(0)
                    } else {
                        scripts[0]
                    }
                };
                Ok(Box::new(TestHandle {
                    remaining_blanks: blanks,
                    released: self.released.clone(),
                }) as Box<dyn CameraHandle>)
            })
        }
    }

    fn marker_decoder() -> Arc<dyn Decoder> {
        Arc::new(FnDecoder::new(|frame: &FrameBuffer| {
            if frame.samples().first() == Some(&MARKER) {
                Some(DecodedPayload::new(PAYLOAD).unwrap())
            } else {
                None
            }
        }))
    }

    /// Immediate-response settlement client.
    struct ScriptedClient {
        envelope_json: &'static str,
        calls: Arc<AtomicUsize>,
        seen_target: Mutex<Option<String>>,
    }

    impl ScriptedClient {
        fn success() -> Self {
            ScriptedClient {
                envelope_json:
                    r#"{ "success": true, "data": { "parkingDuration": 3, "totalAmount": 150 } }"#,
                calls: Arc::new(AtomicUsize::new(0)),
                seen_target: Mutex::new(None),
            }
        }

        fn business_failure() -> Self {
            ScriptedClient {
                envelope_json: r#"{ "success": false, "message": "slot already settled" }"#,
                calls: Arc::new(AtomicUsize::new(0)),
                seen_target: Mutex::new(None),
            }
        }
    }

    impl SettlementClient for ScriptedClient {
        fn post_settlement<'a>(
            &'a self,
            target: &'a Url,
            _token: &'a str,
        ) -> BoxFuture<'a, crate::error::ScanResult<SettlementEnvelope>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                *self.seen_target.lock().unwrap() = Some(target.to_string());
                Ok(serde_json::from_str(self.envelope_json).unwrap())
            })
        }
    }

    /// Settlement client that blocks until the test releases the gate.
    struct GatedClient {
        calls: Arc<AtomicUsize>,
        gate: Mutex<Option<oneshot::Receiver<SettlementEnvelope>>>,
    }

    impl SettlementClient for GatedClient {
        fn post_settlement<'a>(
            &'a self,
            _target: &'a Url,
            _token: &'a str,
        ) -> BoxFuture<'a, crate::error::ScanResult<SettlementEnvelope>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let rx = self.gate.lock().unwrap().take().expect("gate consumed");
                rx.await
                    .map_err(|_| ScanError::Transport("gate dropped".into()))
            })
        }
    }

    fn controller(
        camera: Arc<dyn CameraAccess>,
        client: Arc<dyn SettlementClient>,
    ) -> ScanController {
        ScanController::builder(ScanConfig::default())
            .with_camera(camera)
            .with_decoder(marker_decoder())
            .with_client(client)
            .with_credentials(Arc::new(StaticCredential::new("token-123")))
            .with_scheduler(yield_scheduler())
            .build()
            .unwrap()
    }

    /// Yields until the session reaches the wanted state, panicking if it
    /// never does.
    async fn wait_for_state(controller: &ScanController, wanted: ScanState) -> ScanSession {
        for _ in 0..10_000 {
            let session = controller.session().await;
            if session.state == wanted {
                return session;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "session never reached {wanted}, stuck at {}",
            controller.session().await.state
        );
    }

    #[tokio::test]
    async fn test_first_decode_triggers_exactly_one_settlement() {
        // Two code-free frames, then the marker appears
        let camera = Arc::new(TestCamera::new(2));
        let client = Arc::new(ScriptedClient::success());
        let mut controller = controller(camera.clone(), client.clone());

        controller.start().await;
        let session = wait_for_state(&controller, ScanState::Succeeded).await;

        assert_eq!(
            session.outcome,
            Some(SettlementOutcome::Success {
                duration_hours: 3.0,
                total_amount: 150.0,
            })
        );
        assert_eq!(session.last_error, None);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            client.seen_target.lock().unwrap().clone().unwrap(),
            PAYLOAD
        );
        // Camera acquired once and released once, before settlement resolved
        assert_eq!(camera.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(camera.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_business_failure_reaches_failed_with_server_message() {
        let camera = Arc::new(TestCamera::new(0));
        let client = Arc::new(ScriptedClient::business_failure());
        let mut controller = controller(camera, client);

        controller.start().await;
        let session = wait_for_state(&controller, ScanState::Failed).await;

        assert_eq!(
            session.outcome,
            Some(SettlementOutcome::failure("slot already settled"))
        );
        assert_eq!(session.last_error.as_deref(), Some("slot already settled"));
    }

    #[tokio::test]
    async fn test_acquisition_failure_short_circuits_to_failed() {
        // Permission denied: straight to Failed, no Detected, no settlement call
        let mut camera = TestCamera::new(0);
        camera.fail_acquire = true;
        let client = Arc::new(ScriptedClient::success());
        let mut controller = controller(Arc::new(camera), client.clone());

        controller.start().await;
        let session = wait_for_state(&controller, ScanState::Failed).await;

        assert!(session
            .last_error
            .as_deref()
            .unwrap()
            .contains("Error accessing camera"));
        assert_eq!(session.outcome, None);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_restart_from_terminal_yields_fresh_scanning_session() {
        let camera = Arc::new(TestCamera::new(0));
        let client = Arc::new(ScriptedClient::success());
        let mut controller = controller(camera.clone(), client.clone());

        controller.start().await;
        let first = wait_for_state(&controller, ScanState::Succeeded).await;

        controller.restart().await;
        let second = wait_for_state(&controller, ScanState::Succeeded).await;

        assert_ne!(first.id, second.id);
        // A newly acquired camera each time, each released exactly once
        assert_eq!(camera.acquired.load(Ordering::SeqCst), 2);
        assert_eq!(camera.released.load(Ordering::SeqCst), 2);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_late_settlement_result_discarded_after_restart() {
        // Restart while Settling: the stale response must not mutate the
        // new session. The second acquire serves code-free
        // frames forever, so the fresh session sits in Scanning.
        let camera = Arc::new(TestCamera::with_scripts(vec![0, NEVER]));
        let (gate_tx, gate_rx) = oneshot::channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let client = Arc::new(GatedClient {
            calls: calls.clone(),
            gate: Mutex::new(Some(gate_rx)),
        });
        let mut controller = controller(camera.clone(), client);

        controller.start().await;
        let stale = wait_for_state(&controller, ScanState::Settling).await;

        controller.restart().await;
        let fresh = controller.session().await;
        assert_ne!(stale.id, fresh.id);
        assert_eq!(fresh.state, ScanState::Scanning);

        // Now let the stale response arrive.
        gate_tx
            .send(
                serde_json::from_str(
                    r#"{ "success": true, "data": { "parkingDuration": 9, "totalAmount": 999 } }"#,
                )
                .unwrap(),
            )
            .unwrap();
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }

        let after = controller.session().await;
        assert_eq!(after.id, fresh.id);
        assert_eq!(after.state, ScanState::Scanning);
        assert_eq!(after.outcome, None);
        // The new session's task has run by now: a second camera was
        // acquired, and exactly one settlement request ever reached the
        // transport
        assert_eq!(camera.acquired.load(Ordering::SeqCst), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_releases_camera_from_scanning() {
        // The marker never appears, so the session stays in Scanning until
        // teardown.
        let camera = Arc::new(TestCamera::new(NEVER));
        let client = Arc::new(ScriptedClient::success());
        let mut controller = controller(camera.clone(), client.clone());

        controller.start().await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(controller.session().await.state, ScanState::Scanning);

        controller.shutdown().await;
        assert_eq!(camera.released.load(Ordering::SeqCst), 1);
        // Never decoded, never settled
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prestart_snapshot_is_inert_placeholder() {
        let camera = Arc::new(TestCamera::new(NEVER));
        let client = Arc::new(ScriptedClient::success());
        let mut controller = controller(camera.clone(), client);

        // Polling before start sees an empty Scanning session and no
        // camera activity.
        let placeholder = controller.session().await;
        assert_eq!(placeholder.state, ScanState::Scanning);
        assert_eq!(placeholder.outcome, None);
        assert_eq!(placeholder.last_error, None);
        assert_eq!(camera.acquired.load(Ordering::SeqCst), 0);

        // start replaces the placeholder with a live session
        controller.start().await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        let live = controller.session().await;
        assert_ne!(placeholder.id, live.id);
        assert_eq!(camera.acquired.load(Ordering::SeqCst), 1);

        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_builder_requires_capabilities() {
        let err = ScanController::builder(ScanConfig::default())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }
}
