//! Hardware adapter — bridges the PWM drivers to [`ActuatorPort`].
//!
//! Owns the ESC and steering servo drivers.  Which channels are real is
//! decided once, at start-up, from an injected [`HardwareCapability`]; any
//! channel that is unavailable or fails to initialise runs simulated, so
//! the control plane keeps working on a bench machine with no hardware.

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, info, warn};

use crate::app::ports::ActuatorPort;
use crate::config::{SteeringConfig, VehicleConfig};
use crate::drivers::esc::EscDriver;
use crate::drivers::servo::{MAX_ANGLE_DEG, ServoDriver};
use crate::error::{ConfigError, HardwareError};

/// Hold time per step of the steering calibration sweep.
pub const SWEEP_DWELL_MS: u32 = 800;

/// Which actuator channels the host can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareCapability {
    pub esc: bool,
    pub servo: bool,
}

impl HardwareCapability {
    pub const NONE: Self = Self {
        esc: false,
        servo: false,
    };
    pub const ALL: Self = Self {
        esc: true,
        servo: true,
    };
}

/// One actuator channel: a real driver or an in-memory stand-in.
pub enum Channel<D> {
    Hardware(D),
    Simulated,
}

impl<D> Channel<D> {
    pub fn is_simulated(&self) -> bool {
        matches!(self, Self::Simulated)
    }
}

/// Point-in-time view of the actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorStatus {
    pub esc_simulated: bool,
    pub servo_simulated: bool,
    pub throttle_pulse_us: Option<u16>,
    pub steering_angle_deg: Option<u8>,
}

/// PWM channel type for hosts with no PWM hardware at all.
pub struct NoPwm;

impl embedded_hal::pwm::ErrorType for NoPwm {
    type Error = core::convert::Infallible;
}

impl SetDutyCycle for NoPwm {
    fn max_duty_cycle(&self) -> u16 {
        1
    }

    fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Fully simulated actuator set.
pub type SimulatedActuators = Actuators<NoPwm, NoPwm>;

/// Concrete adapter that puts the ESC and servo behind [`ActuatorPort`].
pub struct Actuators<P: SetDutyCycle, Q: SetDutyCycle> {
    esc: Channel<EscDriver<P>>,
    servo: Channel<ServoDriver<Q>>,
    throttle_pulse_us: Option<u16>,
    steering_angle_deg: Option<u8>,
}

impl SimulatedActuators {
    pub fn simulated() -> Self {
        info!("Actuators: simulation mode (no hardware)");
        Self {
            esc: Channel::Simulated,
            servo: Channel::Simulated,
            throttle_pulse_us: None,
            steering_angle_deg: None,
        }
    }
}

impl<P: SetDutyCycle, Q: SetDutyCycle> Actuators<P, Q> {
    /// Bring up each channel the capability allows.  The config is
    /// validated first and nothing is opened if it is rejected.
    /// `open_esc` / `open_servo` are only called for enabled channels; an
    /// error from either, or from the initial neutral / centre write, drops
    /// that channel to simulation.
    pub fn init(
        caps: HardwareCapability,
        config: &VehicleConfig,
        open_esc: impl FnOnce() -> Result<P, HardwareError>,
        open_servo: impl FnOnce() -> Result<Q, HardwareError>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let esc = if caps.esc {
            match open_esc().and_then(|pwm| {
                let mut drv = EscDriver::new(pwm, config.pwm.esc_period_us());
                drv.arm(config.throttle.neutral_us)?;
                Ok(drv)
            }) {
                Ok(drv) => Channel::Hardware(drv),
                Err(e) => {
                    warn!("ESC unavailable ({}), throttle simulated", e);
                    Channel::Simulated
                }
            }
        } else {
            info!("ESC not present, throttle simulated");
            Channel::Simulated
        };

        let servo = if caps.servo {
            match open_servo().and_then(|pwm| {
                let s = &config.steering;
                let mut drv = ServoDriver::new(
                    pwm,
                    config.pwm.servo_period_us(),
                    s.servo_min_pulse_us,
                    s.servo_max_pulse_us,
                );
                drv.set_angle(s.center_deg)
                    .map_err(|_| HardwareError::InitFailed("servo"))?;
                Ok(drv)
            }) {
                Ok(drv) => {
                    info!("Steering servo centred at {} deg", config.steering.center_deg);
                    Channel::Hardware(drv)
                }
                Err(e) => {
                    warn!("Servo unavailable ({}), steering simulated", e);
                    Channel::Simulated
                }
            }
        } else {
            info!("Servo not present, steering simulated");
            Channel::Simulated
        };

        let hw = Self {
            esc,
            servo,
            throttle_pulse_us: None,
            steering_angle_deg: None,
        };
        hw.log_configuration(config);
        Ok(hw)
    }

    /// Log the actuator calibration and which channels are real.
    pub fn log_configuration(&self, config: &VehicleConfig) {
        let mode = |simulated: bool| if simulated { "simulated" } else { "PWM" };
        let t = &config.throttle;
        let s = &config.steering;
        info!(
            "ESC | mode={} pulse={}..{}..{}us deadband={}..{}us",
            mode(self.esc.is_simulated()),
            t.min_us,
            t.neutral_us,
            t.max_us,
            t.deadband_low_us,
            t.deadband_high_us
        );
        info!(
            "SERVO | mode={} pulse={}..{}us safe={:.1}%..{:.1}% center={}deg reverse={}",
            mode(self.servo.is_simulated()),
            s.servo_min_pulse_us,
            s.servo_max_pulse_us,
            s.safe_min_percent,
            s.safe_max_percent,
            s.center_deg,
            s.reverse
        );
    }

    /// Calibration sweep: left, centre, right, centre through the safe
    /// range, holding each position for [`SWEEP_DWELL_MS`].  Skipped with a
    /// warning when steering is simulated.
    pub fn steering_sweep(
        &mut self,
        steering: &SteeringConfig,
        delay: &mut impl DelayNs,
    ) -> Result<(), HardwareError> {
        let Channel::Hardware(drv) = &mut self.servo else {
            warn!("Steering servo simulated, calibration sweep skipped");
            return Ok(());
        };
        let angles = steering.calibration_angles();
        let result = drv.sweep(&angles, SWEEP_DWELL_MS, delay);
        self.steering_angle_deg = drv.angle_deg();
        match &result {
            Ok(()) => info!("Steering calibration sweep completed"),
            Err(e) => warn!("Steering calibration sweep failed: {}", e),
        }
        result
    }

    pub fn status(&self) -> ActuatorStatus {
        ActuatorStatus {
            esc_simulated: self.esc.is_simulated(),
            servo_simulated: self.servo.is_simulated(),
            throttle_pulse_us: self.throttle_pulse_us,
            steering_angle_deg: self.steering_angle_deg,
        }
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<P: SetDutyCycle, Q: SetDutyCycle> ActuatorPort for Actuators<P, Q> {
    fn set_throttle_pulse(&mut self, micros: u16) -> Result<(), HardwareError> {
        match &mut self.esc {
            Channel::Hardware(drv) => drv.set_pulse(micros)?,
            Channel::Simulated => debug!("SIM | throttle={}us", micros),
        }
        self.throttle_pulse_us = Some(micros);
        Ok(())
    }

    fn set_steering_angle(&mut self, degrees: u8) -> Result<(), HardwareError> {
        let degrees = degrees.min(MAX_ANGLE_DEG);
        match &mut self.servo {
            Channel::Hardware(drv) => drv.set_angle(degrees)?,
            Channel::Simulated => debug!("SIM | steering={}deg", degrees),
        }
        self.steering_angle_deg = Some(degrees);
        Ok(())
    }
}
