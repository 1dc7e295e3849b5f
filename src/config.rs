//! Vehicle configuration parameters
//!
//! All tunable parameters for the control plane: signaling rendezvous,
//! ESC pulse calibration, steering servo calibration and PWM timing.
//! Documents are JSON; every section has `#[serde(default)]` so a file may
//! override only the fields it names.  Loaded values are always validated:
//! out-of-range calibration is rejected, never clamped.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum length of the room id and display name.
pub const IDENTITY_MAX_LEN: usize = 32;

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VehicleConfig {
    pub signaling: SignalingConfig,
    pub throttle: ThrottleConfig,
    pub steering: SteeringConfig,
    pub pwm: PwmConfig,
}

/// Signaling rendezvous and reconnect policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// Signaling server URL (handed to the transport adapter).
    pub server_url: String,
    /// Well-known control room.
    pub room_id: heapless::String<IDENTITY_MAX_LEN>,
    /// Name announced to the room.
    pub display_name: heapless::String<IDENTITY_MAX_LEN>,
    /// First reconnect delay (milliseconds).
    pub reconnect_initial_ms: u64,
    /// Reconnect delay cap (milliseconds).
    pub reconnect_max_ms: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".into(),
            room_id: fixed("GamepadChannel"),
            display_name: fixed("Pi"),
            reconnect_initial_ms: 1_000,
            reconnect_max_ms: 10_000,
        }
    }
}

impl SignalingConfig {
    pub fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    pub fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }
}

/// ESC pulse calibration (microseconds) and throttle shaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Full reverse.
    pub min_us: u16,
    /// Stop.
    pub neutral_us: u16,
    /// Full forward.
    pub max_us: u16,
    /// ESC deadband below neutral.
    pub deadband_low_us: u16,
    /// ESC deadband above neutral.
    pub deadband_high_us: u16,
    /// Normalised input magnitude treated as zero.
    pub deadzone: f32,
    /// Power limit applied while the limit is engaged (0, 100].
    pub power_limit_percent: f32,
    /// Whether the power limit is engaged before any button press.
    pub power_limit_engaged: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_us: 1000,
            neutral_us: 1500,
            max_us: 2000,
            deadband_low_us: 1485,
            deadband_high_us: 1515,
            deadzone: 0.05,
            power_limit_percent: 25.0,
            power_limit_engaged: false,
        }
    }
}

impl ThrottleConfig {
    /// Lower edge of the forward band (`deadband_high + 5`).
    pub fn forward_start_us(&self) -> u16 {
        self.deadband_high_us.saturating_add(5)
    }

    /// Upper edge of the reverse band (`deadband_low - 5`).
    pub fn reverse_start_us(&self) -> u16 {
        self.deadband_low_us.saturating_sub(5)
    }
}

/// Steering servo calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Minimum safe position, percent of full servo travel.
    pub safe_min_percent: f32,
    /// Maximum safe position, percent of full servo travel.
    pub safe_max_percent: f32,
    /// Normalised input magnitude treated as centre.
    pub deadzone: f32,
    /// Centre angle (degrees).
    pub center_deg: u8,
    /// Mirror the input for servos mounted the other way round.
    pub reverse: bool,
    /// Servo pulse at 0 degrees (microseconds).
    pub servo_min_pulse_us: u16,
    /// Servo pulse at 180 degrees (microseconds).
    pub servo_max_pulse_us: u16,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            safe_min_percent: 10.0,
            safe_max_percent: 90.0,
            deadzone: 0.05,
            center_deg: 90,
            reverse: false,
            servo_min_pulse_us: 1000,
            servo_max_pulse_us: 2000,
        }
    }
}

/// Travel points visited by the steering calibration sweep: left, centre,
/// right, centre (percent of the safe range).
pub const CALIBRATION_TRAVEL: [f32; 4] = [0.0, 50.0, 100.0, 50.0];

impl SteeringConfig {
    /// Servo angle for `travel_pct` percent of the safe range.
    pub fn angle_for_travel(&self, travel_pct: f32) -> u8 {
        let travel = travel_pct.clamp(0.0, 100.0);
        let safe_pct = self.safe_min_percent
            + (travel / 100.0) * (self.safe_max_percent - self.safe_min_percent);
        let angle = (safe_pct * 180.0 / 100.0) as i32;
        angle.clamp(0, 180) as u8
    }

    /// Angles for the calibration sweep, in order.
    pub fn calibration_angles(&self) -> [u8; 4] {
        CALIBRATION_TRAVEL.map(|pct| self.angle_for_travel(pct))
    }
}

/// PWM frame timing for the hardware channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PwmConfig {
    /// ESC frame rate (Hz); ESCs expect ~50 Hz.
    pub esc_frequency_hz: u32,
    /// Servo frame rate (Hz).
    pub servo_frequency_hz: u32,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            esc_frequency_hz: 50,
            servo_frequency_hz: 50,
        }
    }
}

impl PwmConfig {
    /// ESC frame period; zero when the frequency is zero.
    pub fn esc_period_us(&self) -> u32 {
        1_000_000u32.checked_div(self.esc_frequency_hz).unwrap_or(0)
    }

    /// Servo frame period; zero when the frequency is zero.
    pub fn servo_period_us(&self) -> u32 {
        1_000_000u32.checked_div(self.servo_frequency_hz).unwrap_or(0)
    }
}

impl VehicleConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject calibration that could command the vehicle outside its
    /// physical limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.signaling;
        if s.room_id.is_empty() {
            return Err(ConfigError::ValidationFailed("signaling.room_id is empty"));
        }
        if s.reconnect_initial_ms == 0 || s.reconnect_max_ms < s.reconnect_initial_ms {
            return Err(ConfigError::ValidationFailed(
                "signaling reconnect delays must satisfy 0 < initial <= max",
            ));
        }

        let t = &self.throttle;
        let ordered = t.min_us < t.reverse_start_us()
            && t.reverse_start_us() < t.neutral_us
            && t.deadband_low_us <= t.neutral_us
            && t.neutral_us <= t.deadband_high_us
            && t.neutral_us < t.forward_start_us()
            && t.forward_start_us() < t.max_us;
        if !ordered {
            return Err(ConfigError::ValidationFailed(
                "throttle pulses must satisfy min < deadband_low-5 < neutral < deadband_high+5 < max",
            ));
        }
        if !(0.0..1.0).contains(&t.deadzone) {
            return Err(ConfigError::ValidationFailed("throttle.deadzone must be in [0, 1)"));
        }
        if !(t.power_limit_percent > 0.0 && t.power_limit_percent <= 100.0) {
            return Err(ConfigError::ValidationFailed(
                "throttle.power_limit_percent must be in (0, 100]",
            ));
        }

        let st = &self.steering;
        if !(0.0 <= st.safe_min_percent
            && st.safe_min_percent < st.safe_max_percent
            && st.safe_max_percent <= 100.0)
        {
            return Err(ConfigError::ValidationFailed(
                "steering safe range must satisfy 0 <= min < max <= 100",
            ));
        }
        if !(0.0..1.0).contains(&st.deadzone) {
            return Err(ConfigError::ValidationFailed("steering.deadzone must be in [0, 1)"));
        }
        if st.center_deg > 180 {
            return Err(ConfigError::ValidationFailed("steering.center_deg exceeds 180"));
        }
        if st.servo_min_pulse_us >= st.servo_max_pulse_us {
            return Err(ConfigError::ValidationFailed(
                "steering servo pulse range must satisfy min < max",
            ));
        }

        let p = &self.pwm;
        if p.esc_frequency_hz == 0 || p.servo_frequency_hz == 0 {
            return Err(ConfigError::ValidationFailed("pwm frequencies must be non-zero"));
        }
        if u32::from(t.max_us) >= p.esc_period_us()
            || u32::from(st.servo_max_pulse_us) >= p.servo_period_us()
        {
            return Err(ConfigError::ValidationFailed("pulse widths exceed the PWM period"));
        }
        Ok(())
    }
}

fn fixed(s: &str) -> heapless::String<IDENTITY_MAX_LEN> {
    let mut out = heapless::String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
