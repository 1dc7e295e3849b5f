//! Control pipeline — frame codec and actuation mapping.
//!
//! ```text
//!  data channel bytes ──▶ frame::decode ──▶ mapper::ActuationMapper ──▶ ActuatorPort
//! ```

pub mod frame;
pub mod mapper;
