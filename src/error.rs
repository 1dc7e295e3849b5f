//! Error types for the vehicle control plane.
//!
//! Each component boundary owns one small enum: the codec returns
//! [`DecodeError`], the signaling layer [`SignalingError`], a peer session
//! [`NegotiationError`], the actuator sink [`HardwareError`] and the
//! configuration loader [`ConfigError`].
//!
//! None of these are process-fatal.  The session manager isolates signaling
//! and negotiation failures; hardware failures are reported per frame.

use core::fmt;

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload was not exactly one control frame long.
    BadLength(usize),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength(n) => write!(f, "invalid control frame length: {n} bytes"),
        }
    }
}

impl std::error::Error for DecodeError {}

// ---------------------------------------------------------------------------
// Signaling errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// Connecting to the signaling server failed.
    ConnectFailed(String),
    /// Emit attempted while the transport is down.
    NotConnected,
    /// The transport refused an outbound event.
    EmitFailed(String),
    /// An inbound event carried a payload that does not match its schema.
    Malformed { event: String, reason: String },
    /// An inbound event name this vehicle does not handle.
    UnknownEvent(String),
}

impl fmt::Display for SignalingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed(msg) => write!(f, "connect failed: {msg}"),
            Self::NotConnected => write!(f, "not connected"),
            Self::EmitFailed(msg) => write!(f, "emit failed: {msg}"),
            Self::Malformed { event, reason } => write!(f, "malformed '{event}' event: {reason}"),
            Self::UnknownEvent(name) => write!(f, "unknown event '{name}'"),
        }
    }
}

impl std::error::Error for SignalingError {}

// ---------------------------------------------------------------------------
// Negotiation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// The remote description was not an offer (the vehicle only answers).
    NotAnOffer(String),
    /// The transport rejected the remote description.
    RemoteDescription(String),
    /// Answer generation failed.
    CreateAnswer(String),
    /// Applying the local description failed.
    LocalDescription(String),
    /// A remote ICE candidate was rejected.
    IceCandidate(String),
    /// Too many candidates arrived before the remote description.
    IceQueueFull,
    /// The transport reported an asynchronous negotiation failure.
    Transport(String),
    /// The session has already been closed.
    Closed,
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnOffer(kind) => write!(f, "expected an offer, got '{kind}'"),
            Self::RemoteDescription(msg) => write!(f, "remote description rejected: {msg}"),
            Self::CreateAnswer(msg) => write!(f, "answer creation failed: {msg}"),
            Self::LocalDescription(msg) => write!(f, "local description rejected: {msg}"),
            Self::IceCandidate(msg) => write!(f, "ICE candidate rejected: {msg}"),
            Self::IceQueueFull => write!(f, "pending ICE queue full"),
            Self::Transport(msg) => write!(f, "transport failure: {msg}"),
            Self::Closed => write!(f, "session closed"),
        }
    }
}

impl std::error::Error for NegotiationError {}

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

/// Actuator write failures.  `Copy` so the mapper can hand them to both
/// the caller and the event sink without cloning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// The ESC PWM channel rejected a pulse width.
    ThrottleWrite,
    /// The steering servo channel rejected an angle.
    SteeringWrite,
    /// Driver initialisation failed (the channel falls back to simulation).
    InitFailed(&'static str),
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThrottleWrite => write!(f, "ESC pulse write failed"),
            Self::SteeringWrite => write!(f, "steering servo write failed"),
            Self::InitFailed(what) => write!(f, "{what} initialisation failed"),
        }
    }
}

impl std::error::Error for HardwareError {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The document could not be parsed.
    Parse(String),
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
