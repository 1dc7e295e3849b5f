//! Signaling layer — room protocol payloads and reconnect policy.
//!
//! The transport itself (a Socket.IO style named-event channel) lives
//! behind [`SignalingPort`](crate::app::ports::SignalingPort); this module
//! only knows the event vocabulary and how long to wait between attempts.

pub mod backoff;
pub mod messages;
