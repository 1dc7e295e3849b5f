//! Peer transport sessions.
//!
//! One [`PeerSession`](session::PeerSession) per remote controller offer.
//! Sessions are identified by a monotonically increasing [`SessionId`] so
//! completions and data-channel traffic from a torn-down session can be
//! recognised and dropped.

pub mod session;

use core::fmt;

use crate::signaling::messages::{IceCandidate, SessionDescription};

/// Generation counter for peer sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Notifications from a peer connection adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// The remote offer has been applied.
    RemoteDescriptionSet,
    /// A local answer was generated.
    AnswerCreated(SessionDescription),
    /// The local answer has been applied and may be sent.
    LocalDescriptionSet(SessionDescription),
    /// A local ICE candidate was gathered.
    LocalCandidate(IceCandidate),
    /// The remote side opened the control data channel.
    DataChannelOpen { label: String },
    /// Binary data-channel message.
    Binary(Vec<u8>),
    /// Text data-channel message.
    Text(String),
    /// An asynchronous negotiation step failed.
    NegotiationFailed(String),
    /// The transport closed.
    Closed,
}
