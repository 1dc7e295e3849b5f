//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                 |
//! |------------|--------------|-----------------------------|
//! | `hardware` | ActuatorPort | ESC + steering servo PWM    |
//! | `log_sink` | EventSink    | `log` facade                |
//!
//! Signaling and peer transports are supplied by the embedding binary
//! through [`SignalingPort`](crate::app::ports::SignalingPort) and
//! [`PeerConnector`](crate::app::ports::PeerConnector).

pub mod hardware;
pub mod log_sink;
