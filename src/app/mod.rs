//! Application core — pure domain logic, zero I/O.
//!
//! Session lifecycle, negotiation routing and actuation live here.  All
//! interaction with the signaling server, peer transport and actuators
//! happens through **port traits** defined in [`ports`], keeping this
//! layer fully testable without a network or PWM hardware.

pub mod commands;
pub mod events;
pub mod manager;
pub mod ports;
