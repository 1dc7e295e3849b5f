//! PWM actuator drivers.

pub mod esc;
pub mod servo;

/// Convert a pulse width to a duty-cycle value for a channel whose full
/// scale is `max_duty` over `period_us`.
pub(crate) fn pulse_to_duty(pulse_us: u16, period_us: u32, max_duty: u16) -> u16 {
    if period_us == 0 {
        return 0;
    }
    let pulse = u32::from(pulse_us).min(period_us);
    (pulse * u32::from(max_duty) / period_us) as u16
}
