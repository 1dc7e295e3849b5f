//! Steering servo driver.
//!
//! Angle 0–180° maps linearly onto the servo's calibrated pulse range
//! (1000–2000 µs by default) at 50 Hz.

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::{Error as _, SetDutyCycle};
use log::{info, warn};

use super::pulse_to_duty;
use crate::error::HardwareError;

pub const MAX_ANGLE_DEG: u8 = 180;

pub struct ServoDriver<P: SetDutyCycle> {
    pwm: P,
    period_us: u32,
    min_pulse_us: u16,
    max_pulse_us: u16,
    angle_deg: Option<u8>,
}

impl<P: SetDutyCycle> ServoDriver<P> {
    pub fn new(pwm: P, period_us: u32, min_pulse_us: u16, max_pulse_us: u16) -> Self {
        Self {
            pwm,
            period_us,
            min_pulse_us,
            max_pulse_us,
            angle_deg: None,
        }
    }

    /// Pulse width for `degrees`, clamped to the servo's travel.
    pub fn angle_to_pulse(&self, degrees: u8) -> u16 {
        let deg = u32::from(degrees.min(MAX_ANGLE_DEG));
        let span = u32::from(self.max_pulse_us.saturating_sub(self.min_pulse_us));
        self.min_pulse_us + (span * deg / u32::from(MAX_ANGLE_DEG)) as u16
    }

    pub fn set_angle(&mut self, degrees: u8) -> Result<(), HardwareError> {
        let pulse = self.angle_to_pulse(degrees);
        let duty = pulse_to_duty(pulse, self.period_us, self.pwm.max_duty_cycle());
        self.pwm.set_duty_cycle(duty).map_err(|e| {
            warn!("Servo PWM write failed: {:?}", e.kind());
            HardwareError::SteeringWrite
        })?;
        self.angle_deg = Some(degrees.min(MAX_ANGLE_DEG));
        Ok(())
    }

    /// Step through `angles`, holding each for `dwell_ms`.  Stops at the
    /// first failed write.
    pub fn sweep(
        &mut self,
        angles: &[u8],
        dwell_ms: u32,
        delay: &mut impl DelayNs,
    ) -> Result<(), HardwareError> {
        for &deg in angles {
            info!("Servo sweep -> {} deg ({}us)", deg, self.angle_to_pulse(deg));
            self.set_angle(deg)?;
            delay.delay_ms(dwell_ms);
        }
        Ok(())
    }

    /// Last angle successfully written.
    pub fn angle_deg(&self) -> Option<u8> {
        self.angle_deg
    }
}
