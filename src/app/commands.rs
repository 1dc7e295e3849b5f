//! Inbound messages to the control thread.
//!
//! Every callback the transports would otherwise fire (connect, disconnect,
//! named event, data-channel message, negotiation completion) is turned into
//! one of these values and queued.  The
//! [`SessionManager`](super::manager::SessionManager) consumes them one at a
//! time, so nothing else ever mutates session or safety state.

use serde_json::Value;

use crate::peer::{PeerEvent, SessionId};

/// Messages consumed by the control thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Something happened on the signaling link.
    Signaling(SignalingEvent),

    /// A peer transport completion or data-channel message, tagged with the
    /// session that produced it.
    Peer { session: SessionId, event: PeerEvent },

    /// Stop the vehicle, leave the room and end the control loop.
    Shutdown,
}

/// Signaling transport notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    /// A named event arrived from the server.
    Message { name: String, payload: Value },

    /// The link dropped.
    Disconnected { reason: String },
}

impl ControlEvent {
    pub fn message(name: &str, payload: Value) -> Self {
        Self::Signaling(SignalingEvent::Message {
            name: name.to_owned(),
            payload,
        })
    }

    pub fn disconnected(reason: &str) -> Self {
        Self::Signaling(SignalingEvent::Disconnected {
            reason: reason.to_owned(),
        })
    }

    pub fn peer(session: SessionId, event: PeerEvent) -> Self {
        Self::Peer { session, event }
    }
}
