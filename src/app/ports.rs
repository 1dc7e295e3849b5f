//! Port traits — the hexagonal boundary between the control plane and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SessionManager (domain)
//! ```
//!
//! Driven adapters (actuators, signaling transport, peer transport, event
//! sinks) implement these traits.  The [`SessionManager`](super::manager::SessionManager)
//! consumes them via generics, so the domain core never touches a socket
//! or a PWM register directly.
//!
//! ## Completion model
//!
//! Port calls are *requests*.  They return promptly with `Ok` if the
//! request was accepted.  Anything that completes later (a remote
//! description being applied, an answer being generated, a local ICE
//! candidate being gathered, the data channel opening, the signaling
//! link dropping) comes back as a [`ControlEvent`](super::commands::ControlEvent)
//! on the control queue, tagged with the session it belongs to.

use serde_json::Value;

use crate::error::{HardwareError, NegotiationError, SignalingError};
use crate::peer::SessionId;
use crate::signaling::messages::{IceCandidate, SessionDescription};

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the ESC and steering servo.
pub trait ActuatorPort {
    /// Set the ESC pulse width in microseconds.
    fn set_throttle_pulse(&mut self, micros: u16) -> Result<(), HardwareError>;

    /// Set the steering servo angle (0–180 degrees).
    fn set_steering_angle(&mut self, degrees: u8) -> Result<(), HardwareError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`VehicleEvent`](super::events::VehicleEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::VehicleEvent);
}

// ───────────────────────────────────────────────────────────────
// Signaling port (driven adapter: domain ↔ rendezvous server)
// ───────────────────────────────────────────────────────────────

/// Duplex named-event channel to the signaling server.
///
/// Inbound events and link loss are delivered as
/// [`SignalingEvent`](super::commands::SignalingEvent)s on the control queue.
pub trait SignalingPort {
    /// Establish the connection.  `Ok` means the link is up and events may
    /// be emitted.
    fn connect(&mut self) -> Result<(), SignalingError>;

    /// Emit a named event with a JSON payload.
    fn emit(&mut self, event: &str, payload: Value) -> Result<(), SignalingError>;

    /// Drop the connection (process shutdown).
    fn disconnect(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Peer transport ports (driven adapter: domain ↔ ICE/DTLS/SCTP stack)
// ───────────────────────────────────────────────────────────────

/// Factory for per-session peer connections.
pub trait PeerConnector {
    type Connection: PeerConnection;

    /// Create a fresh connection whose completions and data-channel traffic
    /// will be tagged with `session`.
    fn open(&mut self, session: SessionId) -> Result<Self::Connection, NegotiationError>;
}

/// One negotiated peer connection.
pub trait PeerConnection {
    /// Request that the remote offer be applied.
    /// Completes with `PeerEvent::RemoteDescriptionSet`.
    fn set_remote_description(&mut self, offer: &SessionDescription)
        -> Result<(), NegotiationError>;

    /// Request a local answer.  Completes with `PeerEvent::AnswerCreated`.
    fn create_answer(&mut self) -> Result<(), NegotiationError>;

    /// Request that the answer be applied locally.
    /// Completes with `PeerEvent::LocalDescriptionSet`.
    fn set_local_description(&mut self, answer: &SessionDescription)
        -> Result<(), NegotiationError>;

    /// Apply a remote ICE candidate.
    fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<(), NegotiationError>;

    /// Tear the connection down.  Any in-flight negotiation is abandoned.
    fn close(&mut self);
}
