//! Actuation mapper — control frames in, bounded actuator commands out.
//!
//! ```text
//!  ControlFrame ──▶ safety::evaluate ──▶ throttle / steering maps ──▶ ActuatorPort
//!                        │                                               │
//!                        └──────── commit SafetyState on success ◀───────┘
//! ```
//!
//! The mapper owns the process-wide [`SafetyState`].  It is mutated only
//! here, and only after both actuator writes for a frame succeeded.
//!
//! Next to it sits the arming latch.  [`stop`](ActuationMapper::stop)
//! clears it, and motion is only authorized once a deadman-held frame has
//! been committed since.  `SafetyState::deadman_held` survives a session
//! handover; the latch does not, so a successor controller always spends
//! one frame arming.

use log::{debug, error, info};

use crate::app::ports::ActuatorPort;
use crate::config::{SteeringConfig, ThrottleConfig, VehicleConfig};
use crate::control::frame::ControlFrame;
use crate::error::HardwareError;
use crate::safety::{self, Interlock, SafetyState};

/// One hardware command.  Derived per frame, never stored beyond the
/// status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub throttle_pulse_us: u16,
    pub steering_angle_deg: u8,
}

/// Point-in-time view of the mapper for status reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapperStatus {
    pub safety: SafetyState,
    pub last_command: Option<ActuatorCommand>,
    pub last_sequence: Option<u32>,
    pub frames_applied: u64,
    pub hardware_faults: u64,
    pub armed: bool,
}

pub struct ActuationMapper {
    throttle: ThrottleConfig,
    steering: SteeringConfig,
    safety: SafetyState,
    /// A deadman-held frame was committed since the last stop.
    armed: bool,
    last_command: Option<ActuatorCommand>,
    last_sequence: Option<u32>,
    frames_applied: u64,
    hardware_faults: u64,
}

impl ActuationMapper {
    pub fn new(config: &VehicleConfig) -> Self {
        Self {
            throttle: config.throttle.clone(),
            steering: config.steering.clone(),
            safety: SafetyState::new(&config.throttle),
            armed: false,
            last_command: None,
            last_sequence: None,
            frames_applied: 0,
            hardware_faults: 0,
        }
    }

    pub fn safety(&self) -> &SafetyState {
        &self.safety
    }

    /// Neutral throttle, centred steering.
    pub fn neutral(&self) -> ActuatorCommand {
        ActuatorCommand {
            throttle_pulse_us: self.throttle.neutral_us,
            steering_angle_deg: self.steering.center_deg,
        }
    }

    // ── Pure mapping ──────────────────────────────────────────

    /// Map a normalised throttle value to an ESC pulse, assuming motion is
    /// authorized.  Negative values drive forward.
    pub fn map_throttle(&self, value: f32, power_scale: f32) -> u16 {
        let t = &self.throttle;
        if !value.is_finite() {
            return t.neutral_us;
        }
        let limited = value.clamp(-1.0, 1.0) * power_scale;
        if limited.abs() < t.deadzone {
            return t.neutral_us;
        }

        let pct = limited.abs().clamp(0.0, 1.0);
        if limited < 0.0 {
            let lo = f32::from(t.forward_start_us());
            let hi = f32::from(t.max_us);
            (lo + (hi - lo) * pct) as u16
        } else {
            let hi = f32::from(t.reverse_start_us());
            let lo = f32::from(t.min_us);
            (hi - (hi - lo) * pct) as u16
        }
    }

    /// Map a normalised steering value to a servo angle.  Not subject to
    /// the interlock.
    pub fn map_steering(&self, value: f32) -> u8 {
        let s = &self.steering;
        if !value.is_finite() || value.abs() < s.deadzone {
            return s.center_deg;
        }
        let v = value.clamp(-1.0, 1.0);
        let v = if s.reverse { -v } else { v };

        // -1 => 0 %, +1 => 100 % of the safe range.
        s.angle_for_travel((1.0 + v) * 50.0)
    }

    /// Compute the command and next safety state for `frame` without
    /// touching hardware or committing anything.
    pub fn plan(&self, frame: &ControlFrame) -> (SafetyState, Interlock, ActuatorCommand) {
        let (next, mut verdict) = safety::evaluate(&self.safety, frame.buttons());
        if verdict == Interlock::Authorized && !self.armed {
            verdict = Interlock::DeadmanArming;
        }
        let throttle_pulse_us = if verdict.permits_motion() {
            self.map_throttle(frame.throttle(), next.power_scale())
        } else {
            self.throttle.neutral_us
        };
        let cmd = ActuatorCommand {
            throttle_pulse_us,
            steering_angle_deg: self.map_steering(frame.steering()),
        };
        (next, verdict, cmd)
    }

    // ── Hardware application ──────────────────────────────────

    /// Apply one frame.  On a write failure the error is returned and the
    /// safety state is left exactly as it was.
    pub fn apply(
        &mut self,
        frame: &ControlFrame,
        hw: &mut impl ActuatorPort,
    ) -> Result<ActuatorCommand, HardwareError> {
        if let Some(last) = self.last_sequence {
            let expected = last.wrapping_add(1);
            if frame.sequence() != expected {
                debug!("Frame sequence gap: expected {}, got {}", expected, frame.sequence());
            }
        }
        self.last_sequence = Some(frame.sequence());

        let (next, verdict, cmd) = self.plan(frame);
        if let Err(e) = self.write(hw, cmd) {
            self.hardware_faults += 1;
            error!("Actuator write failed for seq {}: {}", frame.sequence(), e);
            return Err(e);
        }

        safety::log_transitions(&self.safety, &next);
        if next.deadman_held && !self.armed {
            info!("SAFETY: deadman armed at seq {}", frame.sequence());
        }
        self.safety = next;
        self.armed = next.deadman_held;
        self.last_command = Some(cmd);
        self.frames_applied += 1;

        if verdict.permits_motion() && cmd.throttle_pulse_us != self.throttle.neutral_us {
            info!(
                "Applied seq {} -> throttle {}us, steering {} deg",
                frame.sequence(),
                cmd.throttle_pulse_us,
                cmd.steering_angle_deg
            );
        } else {
            debug!(
                "Applied seq {} ({:?}) -> throttle {}us, steering {} deg | {}",
                frame.sequence(),
                verdict,
                cmd.throttle_pulse_us,
                cmd.steering_angle_deg,
                frame
            );
        }
        Ok(cmd)
    }

    /// Force neutral throttle and centre steering, and drop the arming
    /// latch.  The safety state itself is left alone.
    pub fn stop(&mut self, hw: &mut impl ActuatorPort) -> Result<ActuatorCommand, HardwareError> {
        self.armed = false;
        let cmd = self.neutral();
        match self.write(hw, cmd) {
            Ok(()) => {
                self.last_command = Some(cmd);
                info!("Vehicle stopped: throttle {}us, steering {} deg", cmd.throttle_pulse_us, cmd.steering_angle_deg);
                Ok(cmd)
            }
            Err(e) => {
                self.hardware_faults += 1;
                error!("Error stopping vehicle: {}", e);
                Err(e)
            }
        }
    }

    pub fn status(&self) -> MapperStatus {
        MapperStatus {
            safety: self.safety,
            last_command: self.last_command,
            last_sequence: self.last_sequence,
            frames_applied: self.frames_applied,
            hardware_faults: self.hardware_faults,
            armed: self.armed,
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// Write both channels.  Steering is attempted even when the throttle
    /// write fails; the first error wins.
    fn write(&self, hw: &mut impl ActuatorPort, cmd: ActuatorCommand) -> Result<(), HardwareError> {
        let throttle = hw.set_throttle_pulse(cmd.throttle_pulse_us);
        let steering = hw.set_steering_angle(cmd.steering_angle_deg);
        throttle.and(steering)
    }
}
