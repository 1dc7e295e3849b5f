//! Outbound application events.
//!
//! The [`SessionManager`](super::manager::SessionManager) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to the console, forward to a
//! dashboard, assert on them in tests.

use core::time::Duration;

use crate::control::mapper::ActuatorCommand;
use crate::error::{DecodeError, HardwareError, NegotiationError};
use crate::peer::SessionId;

/// Why a peer session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// A newer offer replaced it.
    Replaced,
    /// The signaling link dropped.
    SignalingLost,
    /// The controller left the room.
    PeerLeft,
    /// The peer transport reported closure.
    TransportClosed,
    /// Negotiation failed.
    Negotiation(NegotiationError),
    /// Process shutdown.
    Shutdown,
}

/// Structured events emitted by the control plane.
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleEvent {
    /// Signaling link established and the room join sent.
    SignalingConnected,

    /// Signaling link lost or connect attempt failed.
    SignalingDisconnected { reason: String },

    /// Next connect attempt scheduled.
    ReconnectScheduled { attempt: u32, delay: Duration },

    /// The server confirmed room membership.
    JoinedRoom { room_id: String, members: usize },

    /// A remote offer created a new session.
    SessionOpened { session: SessionId, peer_id: String },

    /// The session's data channel is usable.
    SessionConnected { session: SessionId, peer_id: String },

    /// The session ended.
    SessionClosed {
        session: SessionId,
        peer_id: String,
        reason: CloseReason,
    },

    /// A control frame was applied to the actuators.
    Actuated { sequence: u32, command: ActuatorCommand },

    /// Actuators forced to neutral / centre.
    Stopped(ActuatorCommand),

    /// A data-channel payload did not decode.
    FrameRejected(DecodeError),

    /// An actuator write failed.
    HardwareFault(HardwareError),
}
