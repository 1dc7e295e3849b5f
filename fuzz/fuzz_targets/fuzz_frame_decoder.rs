//! Fuzz target: `frame::decode` → `ActuationMapper::apply`
//!
//! Splits arbitrary input into data-channel messages and drives them
//! through the decoder and mapper.  Asserts that nothing panics, that only
//! 16-byte messages decode, and that every command stays inside the ESC
//! and servo limits.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use vehiclelink::app::ports::ActuatorPort;
use vehiclelink::config::VehicleConfig;
use vehiclelink::control::frame::{self, FRAME_LEN};
use vehiclelink::control::mapper::ActuationMapper;
use vehiclelink::error::HardwareError;

struct Sink;

impl ActuatorPort for Sink {
    fn set_throttle_pulse(&mut self, micros: u16) -> Result<(), HardwareError> {
        assert!((1000..=2000).contains(&micros), "throttle {micros}us out of range");
        Ok(())
    }

    fn set_steering_angle(&mut self, degrees: u8) -> Result<(), HardwareError> {
        assert!(degrees <= 180, "steering {degrees} out of range");
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let mut mapper = ActuationMapper::new(&VehicleConfig::default());
    let mut hw = Sink;

    // First byte picks the message length so short and long messages are
    // exercised too.
    let Some((&len, mut rest)) = data.split_first() else {
        return;
    };
    let len = (len as usize % (FRAME_LEN * 2)).max(1);

    while !rest.is_empty() {
        let take = len.min(rest.len());
        let (msg, tail) = rest.split_at(take);
        rest = tail;

        match frame::decode(msg) {
            Ok(f) => {
                assert_eq!(msg.len(), FRAME_LEN);
                let _ = mapper.apply(&f, &mut hw);
            }
            Err(_) => assert_ne!(msg.len(), FRAME_LEN),
        }
    }

    let cmd = mapper.stop(&mut hw).unwrap();
    assert_eq!(cmd, mapper.neutral());
});
