//! Brushed/brushless ESC driver.
//!
//! The ESC expects a standard RC pulse at 50 Hz: 1000 µs full reverse,
//! 1500 µs neutral, 2000 µs full forward.  The driver is a dumb actuator;
//! the interlock and pulse limits live in the actuation mapper.
//!
//! Generic over any [`SetDutyCycle`] channel so the same code drives a
//! hardware PWM peripheral on the Pi or a recording fake in tests.

use embedded_hal::pwm::{Error as _, SetDutyCycle};
use log::{info, warn};

use super::pulse_to_duty;
use crate::error::HardwareError;

pub struct EscDriver<P: SetDutyCycle> {
    pwm: P,
    period_us: u32,
    pulse_us: Option<u16>,
}

impl<P: SetDutyCycle> EscDriver<P> {
    pub fn new(pwm: P, period_us: u32) -> Self {
        Self {
            pwm,
            period_us,
            pulse_us: None,
        }
    }

    /// Hold neutral so the ESC completes its arming sequence.
    pub fn arm(&mut self, neutral_us: u16) -> Result<(), HardwareError> {
        self.set_pulse(neutral_us)
            .map_err(|_| HardwareError::InitFailed("esc"))?;
        info!("ESC armed at {}us", neutral_us);
        Ok(())
    }

    pub fn set_pulse(&mut self, micros: u16) -> Result<(), HardwareError> {
        let duty = pulse_to_duty(micros, self.period_us, self.pwm.max_duty_cycle());
        self.pwm.set_duty_cycle(duty).map_err(|e| {
            warn!("ESC PWM write failed: {:?}", e.kind());
            HardwareError::ThrottleWrite
        })?;
        self.pulse_us = Some(micros);
        Ok(())
    }

    /// Last pulse successfully written.
    pub fn pulse_us(&self) -> Option<u16> {
        self.pulse_us
    }
}
