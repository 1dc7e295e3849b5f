//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no network or
//! PWM hardware required.

mod runtime_tests;
mod session_manager_tests;
mod vehicle_tests;
