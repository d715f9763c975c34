//! # Settlement Coordinator
//!
//! Turns the first decoded payload into exactly one settlement request and
//! resolves it to a typed outcome.
//!
//! ## Request Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Settlement Exchange                                 │
//! │                                                                         │
//! │  DecodedPayload ──validate──► POST <payload as URL>                     │
//! │                               Authorization: <ambient access token>     │
//! │                               Content-Type: application/json            │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │  Response envelope:                                                     │
//! │  { "success": true,  "data": { "parkingDuration": 3,                    │
//! │                                "totalAmount": 150, ... } }              │
//! │     └──► Success { durationHours, totalAmount }  (extra fields          │
//! │          ignored: the scan page shows exactly these two values)         │
//! │                                                                         │
//! │  { "success": false, "message": "slot already settled" }                │
//! │     └──► Failure { reason }  (generic fallback when message absent)     │
//! │                                                                         │
//! │  transport / JSON failure ──► Failure { reason }                        │
//! │                                                                         │
//! │  NO AUTOMATIC RETRY: a scanned code is bound to a single real-world     │
//! │  booking event; retry is always an explicit user restart.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-flight: while one request is outstanding, a second `settle` call
//! on the same coordinator is rejected without touching the network. The
//! controller creates one coordinator per scan session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use parq_core::{DecodedPayload, SettlementOutcome};

use crate::error::{ScanError, ScanResult};

/// Shown when the backend reports failure without a message of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to process booking";

// =============================================================================
// Wire Envelope
// =============================================================================

/// The settlement backend's JSON response envelope.
///
/// Unknown fields are ignored on purpose; the outcome narrows to the two
/// values the scan page displays.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementEnvelope {
    /// Whether the booking settled.
    pub success: bool,

    /// Backend-provided failure message.
    #[serde(default)]
    pub message: Option<String>,

    /// Present on success.
    #[serde(default)]
    pub data: Option<SettlementData>,
}

/// The success payload inside the envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementData {
    /// Parking duration in hours.
    pub parking_duration: f64,

    /// Total amount charged.
    pub total_amount: f64,
}

impl SettlementEnvelope {
    /// Maps the envelope to a presentation outcome.
    pub fn into_outcome(self) -> SettlementOutcome {
        if !self.success {
            let reason = self
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
            return SettlementOutcome::Failure { reason };
        }

        match self.data {
            Some(data) => SettlementOutcome::Success {
                duration_hours: data.parking_duration,
                total_amount: data.total_amount,
            },
            // A success envelope without booking data is malformed
            None => SettlementOutcome::failure(GENERIC_FAILURE_MESSAGE),
        }
    }
}

// =============================================================================
// Capability Traits
// =============================================================================

/// Source of the ambient access token attached to the settlement request.
///
/// Injected rather than read from ambient storage; token lifecycle and
/// refresh live with the host.
pub trait CredentialProvider: Send + Sync {
    /// The current access token, sent verbatim in the Authorization header.
    fn access_token(&self) -> ScanResult<String>;
}

/// A fixed token, for hosts that resolve credentials once per page.
pub struct StaticCredential(String);

impl StaticCredential {
    /// Wraps an already-resolved token.
    pub fn new(token: impl Into<String>) -> Self {
        StaticCredential(token.into())
    }
}

impl CredentialProvider for StaticCredential {
    fn access_token(&self) -> ScanResult<String> {
        Ok(self.0.clone())
    }
}

/// Transport seam for the one-shot settlement call.
///
/// The HTTP implementation lives in [`HttpSettlementClient`]; tests inject
/// scripted clients here.
pub trait SettlementClient: Send + Sync {
    /// Issues one POST to the target and parses the response envelope.
    fn post_settlement<'a>(
        &'a self,
        target: &'a Url,
        token: &'a str,
    ) -> BoxFuture<'a, ScanResult<SettlementEnvelope>>;
}

// =============================================================================
// HTTP Client
// =============================================================================

/// Settlement transport over HTTP with a JSON envelope.
pub struct HttpSettlementClient {
    http: reqwest::Client,
}

impl HttpSettlementClient {
    /// Builds a client with the given request timeout.
    pub fn new(request_timeout: Duration) -> ScanResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ScanError::Transport(e.to_string()))?;
        Ok(HttpSettlementClient { http })
    }
}

impl SettlementClient for HttpSettlementClient {
    fn post_settlement<'a>(
        &'a self,
        target: &'a Url,
        token: &'a str,
    ) -> BoxFuture<'a, ScanResult<SettlementEnvelope>> {
        Box::pin(async move {
            let response = self
                .http
                .post(target.clone())
                .header(reqwest::header::AUTHORIZATION, token)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .send()
                .await
                .map_err(|e| ScanError::Transport(e.to_string()))?;

            response
                .json::<SettlementEnvelope>()
                .await
                .map_err(|e| ScanError::Transport(e.to_string()))
        })
    }
}

// =============================================================================
// Settlement Coordinator
// =============================================================================

/// Issues at most one settlement request per scan session and resolves it
/// to a [`SettlementOutcome`].
///
/// Every failure mode - unusable payload, missing credential, transport or
/// protocol error, backend-reported failure - folds into the Failure
/// outcome with a readable reason. The only hard error from [`settle`] is
/// the single-flight rejection, which never reaches the network.
///
/// [`settle`]: SettlementCoordinator::settle
pub struct SettlementCoordinator {
    client: Arc<dyn SettlementClient>,
    credentials: Arc<dyn CredentialProvider>,
    in_flight: AtomicBool,
}

impl SettlementCoordinator {
    /// Creates a coordinator for one scan session.
    pub fn new(client: Arc<dyn SettlementClient>, credentials: Arc<dyn CredentialProvider>) -> Self {
        SettlementCoordinator {
            client,
            credentials,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Settles the decoded payload.
    ///
    /// Rejects with [`ScanError::SettlementInFlight`] if a request is
    /// already outstanding on this coordinator.
    pub async fn settle(&self, payload: &DecodedPayload) -> ScanResult<SettlementOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Rejected settle call while a request is outstanding");
            return Err(ScanError::SettlementInFlight);
        }

        let outcome = self.settle_inner(payload).await;
        self.in_flight.store(false, Ordering::SeqCst);
        Ok(outcome)
    }

    async fn settle_inner(&self, payload: &DecodedPayload) -> SettlementOutcome {
        let target = match parse_target(payload) {
            Ok(target) => target,
            Err(e) => {
                warn!(%payload, "Decoded payload rejected as settlement target");
                return SettlementOutcome::failure(e.to_string());
            }
        };

        let token = match self.credentials.access_token() {
            Ok(token) => token,
            Err(e) => return SettlementOutcome::failure(e.to_string()),
        };

        info!(host = %target.host_str().unwrap_or("-"), "Issuing settlement request");
        let outcome = match self.client.post_settlement(&target, &token).await {
            Ok(envelope) => envelope.into_outcome(),
            Err(e) => SettlementOutcome::failure(e.to_string()),
        };

        debug!(success = outcome.is_success(), "Settlement resolved");
        outcome
    }
}

/// Validates the payload as an http(s) URL before it becomes a request
/// target. A garbled decode should read as a clear failure, not as a
/// confusing transport error.
fn parse_target(payload: &DecodedPayload) -> ScanResult<Url> {
    let url = Url::parse(payload.as_str())
        .map_err(|e| ScanError::InvalidPayload(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ScanError::InvalidPayload(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    fn payload(text: &str) -> DecodedPayload {
        DecodedPayload::new(text).unwrap()
    }

    /// Responds immediately with a fixed envelope, recording what it saw.
    struct RecordingClient {
        envelope_json: &'static str,
        calls: AtomicUsize,
        seen: Mutex<Option<(String, String)>>,
    }

    impl RecordingClient {
        fn new(envelope_json: &'static str) -> Self {
            RecordingClient {
                envelope_json,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(None),
            }
        }
    }

    impl SettlementClient for RecordingClient {
        fn post_settlement<'a>(
            &'a self,
            target: &'a Url,
            token: &'a str,
        ) -> BoxFuture<'a, ScanResult<SettlementEnvelope>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                *self.seen.lock().unwrap() = Some((target.to_string(), token.to_string()));
                Ok(serde_json::from_str(self.envelope_json).unwrap())
            })
        }
    }

    /// Holds the request open until the test releases the gate.
    struct GatedClient {
        calls: AtomicUsize,
        gate: Mutex<Option<oneshot::Receiver<SettlementEnvelope>>>,
    }

    impl SettlementClient for GatedClient {
        fn post_settlement<'a>(
            &'a self,
            _target: &'a Url,
            _token: &'a str,
        ) -> BoxFuture<'a, ScanResult<SettlementEnvelope>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let rx = self.gate.lock().unwrap().take().expect("gate consumed");
                rx.await.map_err(|_| ScanError::Transport("gate dropped".into()))
            })
        }
    }

    fn coordinator(client: Arc<dyn SettlementClient>) -> SettlementCoordinator {
        SettlementCoordinator::new(client, Arc::new(StaticCredential::new("token-123")))
    }

    #[test]
    fn test_success_envelope_narrows_to_duration_and_amount() {
        // Extra fields are present and ignored
        let envelope: SettlementEnvelope = serde_json::from_str(
            r#"{
                "success": true,
                "data": {
                    "parkingDuration": 3,
                    "totalAmount": 150,
                    "slotId": "A-12",
                    "vehicleNumber": "KA-01-1234"
                },
                "requestId": "r-9"
            }"#,
        )
        .unwrap();

        assert_eq!(
            envelope.into_outcome(),
            SettlementOutcome::Success {
                duration_hours: 3.0,
                total_amount: 150.0,
            }
        );
    }

    #[test]
    fn test_failure_envelope_uses_server_message() {
        let envelope: SettlementEnvelope =
            serde_json::from_str(r#"{ "success": false, "message": "slot already settled" }"#)
                .unwrap();
        assert_eq!(
            envelope.into_outcome(),
            SettlementOutcome::failure("slot already settled")
        );
    }

    #[test]
    fn test_failure_envelope_falls_back_to_generic_message() {
        let envelope: SettlementEnvelope =
            serde_json::from_str(r#"{ "success": false }"#).unwrap();
        assert_eq!(
            envelope.into_outcome(),
            SettlementOutcome::failure(GENERIC_FAILURE_MESSAGE)
        );
    }

    #[test]
    fn test_success_without_data_is_a_failure() {
        let envelope: SettlementEnvelope =
            serde_json::from_str(r#"{ "success": true }"#).unwrap();
        assert_eq!(
            envelope.into_outcome(),
            SettlementOutcome::failure(GENERIC_FAILURE_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_settle_attaches_credential_and_target() {
        let client = Arc::new(RecordingClient::new(
            r#"{ "success": true, "data": { "parkingDuration": 3, "totalAmount": 150 } }"#,
        ));
        let coordinator = coordinator(client.clone());

        let outcome = coordinator
            .settle(&payload("http://svc/booking/confirm/abc123"))
            .await
            .unwrap();

        assert!(outcome.is_success());
        let seen = client.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.0, "http://svc/booking/confirm/abc123");
        assert_eq!(seen.1, "token-123");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_url_payload_fails_without_network_call() {
        let client = Arc::new(RecordingClient::new(r#"{ "success": true }"#));
        let coordinator = coordinator(client.clone());

        let outcome = coordinator
            .settle(&payload("not a locator"))
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_http_scheme_rejected() {
        let client = Arc::new(RecordingClient::new(r#"{ "success": true }"#));
        let coordinator = coordinator(client.clone());

        let outcome = coordinator
            .settle(&payload("file:///etc/passwd"))
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_error_resolves_to_failure_outcome() {
        struct FailingClient;

        impl SettlementClient for FailingClient {
            fn post_settlement<'a>(
                &'a self,
                _target: &'a Url,
                _token: &'a str,
            ) -> BoxFuture<'a, ScanResult<SettlementEnvelope>> {
                Box::pin(async { Err(ScanError::Transport("connection refused".into())) })
            }
        }

        let coordinator = coordinator(Arc::new(FailingClient));
        let outcome = coordinator
            .settle(&payload("http://svc/booking/confirm/abc123"))
            .await
            .unwrap();

        match outcome {
            SettlementOutcome::Failure { reason } => {
                assert!(reason.contains("connection refused"))
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_settle_rejected_while_first_outstanding() {
        let (gate_tx, gate_rx) = oneshot::channel();
        let client = Arc::new(GatedClient {
            calls: AtomicUsize::new(0),
            gate: Mutex::new(Some(gate_rx)),
        });
        let coordinator = Arc::new(coordinator(client.clone()));

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .settle(&payload("http://svc/booking/confirm/abc123"))
                    .await
            })
        };

        // Wait until the first request is actually outstanding
        while client.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let second = coordinator
            .settle(&payload("http://svc/booking/confirm/abc123"))
            .await;
        assert!(matches!(second, Err(ScanError::SettlementInFlight)));
        // The rejected call never reached the transport
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);

        gate_tx
            .send(
                serde_json::from_str(
                    r#"{ "success": true, "data": { "parkingDuration": 1, "totalAmount": 40 } }"#,
                )
                .unwrap(),
            )
            .unwrap();
        assert!(first.await.unwrap().unwrap().is_success());
    }
}
