//! Fixed-size control frame codec.
//!
//! Wire format (big-endian, 16 bytes):
//! ```text
//! ┌──────────┬──────────────┬──────────┬──────────┬─────────┬───────┬──────────┐
//! │ seq u32  │ ts_ms u32    │ thr i16  │ str i16  │ btn u16 │ flags │ reserved │
//! │ 0..4     │ 4..8         │ 8..10    │ 10..12   │ 12..14  │ 14    │ 15       │
//! └──────────┴──────────────┴──────────┴──────────┴─────────┴───────┴──────────┘
//! ```
//!
//! Axis values are normalised as `raw / 32767.0`, so `-32768` decodes to a
//! value slightly below `-1.0`.  Consumers must clamp.  Decoding is pure and
//! allocation-free.

use core::fmt;

use crate::error::DecodeError;

/// Exact wire size of one control frame.
pub const FRAME_LEN: usize = 16;

/// Axis scale: `raw / AXIS_SCALE` yields the normalised value.
pub const AXIS_SCALE: f32 = 32767.0;

// ---------------------------------------------------------------------------
// Button set
// ---------------------------------------------------------------------------

/// Set of pressed buttons, one bit per button index `0..16`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ButtonSet(u16);

impl ButtonSet {
    pub const EMPTY: Self = Self(0);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Build a set from button indices; indices `>= 16` are ignored.
    pub fn from_indices(indices: &[u8]) -> Self {
        let bits = indices
            .iter()
            .filter(|&&i| i < 16)
            .fold(0u16, |acc, &i| acc | (1 << i));
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, index: u8) -> bool {
        index < 16 && self.0 & (1 << index) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Pressed indices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0u8..16).filter(move |&i| self.contains(i))
    }
}

impl fmt::Display for ButtonSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "None");
        }
        write!(f, "[")?;
        for (n, i) in self.iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{i}")?;
        }
        write!(f, "]")
    }
}

// ---------------------------------------------------------------------------
// Control frame
// ---------------------------------------------------------------------------

/// One decoded controller sample.  Only [`decode`] creates these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFrame {
    sequence: u32,
    timestamp_ms: u32,
    throttle_raw: i16,
    steering_raw: i16,
    buttons: ButtonSet,
    flags: u8,
    reserved: u8,
}

impl ControlFrame {
    #[cfg(test)]
    pub(crate) const fn new(
        sequence: u32,
        timestamp_ms: u32,
        throttle_raw: i16,
        steering_raw: i16,
        buttons: ButtonSet,
        flags: u8,
    ) -> Self {
        Self {
            sequence,
            timestamp_ms,
            throttle_raw,
            steering_raw,
            buttons,
            flags,
            reserved: 0,
        }
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn timestamp_ms(&self) -> u32 {
        self.timestamp_ms
    }

    /// Normalised throttle; may fall marginally below `-1.0`.
    pub fn throttle(&self) -> f32 {
        f32::from(self.throttle_raw) / AXIS_SCALE
    }

    /// Normalised steering; may fall marginally below `-1.0`.
    pub fn steering(&self) -> f32 {
        f32::from(self.steering_raw) / AXIS_SCALE
    }

    pub fn throttle_raw(&self) -> i16 {
        self.throttle_raw
    }

    pub fn steering_raw(&self) -> i16 {
        self.steering_raw
    }

    pub fn buttons(&self) -> ButtonSet {
        self.buttons
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn reserved(&self) -> u8 {
        self.reserved
    }
}

impl fmt::Display for ControlFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seq={} ts={}ms throttle={:+.3} steering={:+.3} buttons={} flags={:02x}",
            self.sequence,
            self.timestamp_ms,
            self.throttle(),
            self.steering(),
            self.buttons,
            self.flags,
        )
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Decode exactly one control frame.
pub fn decode(bytes: &[u8]) -> Result<ControlFrame, DecodeError> {
    let b: &[u8; FRAME_LEN] = bytes
        .try_into()
        .map_err(|_| DecodeError::BadLength(bytes.len()))?;

    Ok(ControlFrame {
        sequence: u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        timestamp_ms: u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
        throttle_raw: i16::from_be_bytes([b[8], b[9]]),
        steering_raw: i16::from_be_bytes([b[10], b[11]]),
        buttons: ButtonSet(u16::from_be_bytes([b[12], b[13]])),
        flags: b[14],
        reserved: b[15],
    })
}

/// Encode a frame back to its wire form.
pub fn encode(frame: &ControlFrame) -> [u8; FRAME_LEN] {
    let mut out = [0u8; FRAME_LEN];
    out[0..4].copy_from_slice(&frame.sequence.to_be_bytes());
    out[4..8].copy_from_slice(&frame.timestamp_ms.to_be_bytes());
    out[8..10].copy_from_slice(&frame.throttle_raw.to_be_bytes());
    out[10..12].copy_from_slice(&frame.steering_raw.to_be_bytes());
    out[12..14].copy_from_slice(&frame.buttons.0.to_be_bytes());
    out[14] = frame.flags;
    out[15] = frame.reserved;
    out
}

/// Quantise a normalised axis value to its wire representation.
pub fn axis_to_raw(value: f32) -> i16 {
    (value * AXIS_SCALE).round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}
