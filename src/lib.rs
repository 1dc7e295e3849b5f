//! VehicleLink control plane library.
//!
//! Receives a remote controller's gamepad state over a peer-to-peer data
//! channel negotiated through a signaling server, and turns it into ESC
//! and steering servo commands behind a safety interlock.
//!
//! The signaling and peer transports are supplied by the embedding binary
//! through the port traits in [`app::ports`]; everything here is host
//! testable.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod peer;
pub mod runtime;
pub mod safety;
pub mod signaling;
