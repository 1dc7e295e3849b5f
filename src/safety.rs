//! Safety interlock.
//!
//! The interlock runs **on every frame before throttle mapping** and derives
//! the next [`SafetyState`] from the frame's button bits.  It never writes
//! hardware itself; the mapper commits the new state only after the
//! actuator writes succeed.
//!
//! ## Button semantics
//!
//! | bit | meaning                                                        |
//! |-----|----------------------------------------------------------------|
//! | 0   | deadman: must be held continuously for motion                  |
//! | 1   | emergency brake: level-triggered, overrides everything         |
//! | 2   | power-limit hold: engages the limit; release keeps it engaged  |
//!
//! ## Evaluation order
//!
//! 1. Deadman.  A release forces neutral on the same frame.  A press only
//!    *arms* the interlock: motion needs the deadman to have been held on
//!    the previous frame as well, so a single glitched frame with bit 0 set
//!    can never move the vehicle.
//! 2. Emergency brake.  When active, neutral wins over every other rule.
//! 3. Power limit.

use log::{info, warn};

use crate::config::ThrottleConfig;
use crate::control::frame::ButtonSet;

pub const BUTTON_DEADMAN: u8 = 0;
pub const BUTTON_EMERGENCY_BRAKE: u8 = 1;
pub const BUTTON_POWER_LIMIT: u8 = 2;

/// Process-wide interlock state.  Survives peer session replacement; the
/// mapper's arming latch, cleared on every stop, is what makes a
/// reconnecting controller re-assert the deadman before anything moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyState {
    pub deadman_held: bool,
    pub emergency_brake_active: bool,
    pub power_limit_enabled: bool,
    /// Always within `(0, 100]`.
    pub power_limit_percent: f32,
}

impl SafetyState {
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            deadman_held: false,
            emergency_brake_active: false,
            power_limit_enabled: config.power_limit_engaged,
            power_limit_percent: config.power_limit_percent,
        }
    }

    /// The interlock invariant: motion only with the deadman held and the
    /// brake released.
    pub fn actuation_permitted(&self) -> bool {
        !self.emergency_brake_active && self.deadman_held
    }

    /// Scale factor applied to the throttle axis.
    pub fn power_scale(&self) -> f32 {
        if self.power_limit_enabled {
            self.power_limit_percent / 100.0
        } else {
            1.0
        }
    }
}

/// Outcome of evaluating one frame's buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interlock {
    /// Throttle may follow the stick.
    Authorized,
    /// Emergency brake held.
    EmergencyBrake,
    /// Deadman released on this frame.
    DeadmanReleased,
    /// Deadman pressed on this frame; motion allowed from the next one.
    DeadmanArming,
    /// Deadman not held.
    DeadmanOpen,
}

impl Interlock {
    pub fn permits_motion(self) -> bool {
        matches!(self, Self::Authorized)
    }
}

/// Derive the next safety state from `prev` and the pressed buttons.
pub fn evaluate(prev: &SafetyState, buttons: ButtonSet) -> (SafetyState, Interlock) {
    let mut next = *prev;

    // 1. Deadman
    next.deadman_held = buttons.contains(BUTTON_DEADMAN);
    let deadman = match (prev.deadman_held, next.deadman_held) {
        (true, true) => Interlock::Authorized,
        (false, true) => Interlock::DeadmanArming,
        (true, false) => Interlock::DeadmanReleased,
        (false, false) => Interlock::DeadmanOpen,
    };

    // 2. Emergency brake
    next.emergency_brake_active = buttons.contains(BUTTON_EMERGENCY_BRAKE);

    // 3. Power limit (held engages, release keeps previous state)
    if buttons.contains(BUTTON_POWER_LIMIT) {
        next.power_limit_enabled = true;
    }

    let verdict = if next.emergency_brake_active {
        Interlock::EmergencyBrake
    } else {
        deadman
    };
    (next, verdict)
}

/// Log every interlock edge between two committed states.
pub fn log_transitions(prev: &SafetyState, next: &SafetyState) {
    if prev.emergency_brake_active != next.emergency_brake_active {
        if next.emergency_brake_active {
            warn!("SAFETY: emergency brake ENGAGED");
        } else {
            info!("SAFETY: emergency brake released");
        }
    }
    if prev.deadman_held != next.deadman_held {
        if next.deadman_held {
            info!("SAFETY: deadman held, throttle armed");
        } else {
            warn!("SAFETY: deadman released, throttle forced neutral");
        }
    }
    if !prev.power_limit_enabled && next.power_limit_enabled {
        info!("SAFETY: power limit engaged at {:.0}%", next.power_limit_percent);
    }
}
