//! End-to-end driving scenarios: data-channel bytes in, actuator writes out.
//!
//! Each test connects a controller through the manager and feeds encoded
//! control frames, asserting on what the ESC and servo were told.

use serde_json::json;
use vehiclelink::adapters::hardware::SimulatedActuators;
use vehiclelink::adapters::log_sink::LogEventSink;
use vehiclelink::app::commands::ControlEvent;
use vehiclelink::app::events::VehicleEvent;
use vehiclelink::app::manager::SessionManager;
use vehiclelink::config::VehicleConfig;
use vehiclelink::error::{DecodeError, HardwareError};
use vehiclelink::peer::{PeerEvent, SessionId};
use vehiclelink::signaling::messages::SessionDescription;

use super::mock_hw::{MockConnector, MockSignaling, Rig, Trace, frame_bytes};

const DEADMAN: u8 = 0;
const BRAKE: u8 = 1;
const POWER_LIMIT: u8 = 2;

fn drive_ready(rig: &mut Rig) -> SessionId {
    rig.manager.handle(ControlEvent::message(
        "gamepad-offer",
        json!({ "fromUserId": "ctrl", "offer": { "type": "offer", "sdp": "v=0" } }),
    ));
    let id = rig.manager.live_session().unwrap();
    let answer = SessionDescription::answer("v=0");
    for ev in [
        PeerEvent::RemoteDescriptionSet,
        PeerEvent::AnswerCreated(answer.clone()),
        PeerEvent::LocalDescriptionSet(answer),
        PeerEvent::DataChannelOpen { label: "gamepad".into() },
    ] {
        rig.manager.handle(ControlEvent::peer(id, ev));
    }
    rig.trace.clear();
    id
}

fn send(rig: &mut Rig, id: SessionId, seq: u32, throttle: i16, steering: i16, buttons: &[u8]) {
    let bytes = frame_bytes(seq, 0, throttle, steering, buttons);
    rig.manager.handle(ControlEvent::peer(id, PeerEvent::Binary(bytes)));
}

#[test]
fn deadman_press_arms_then_drives_forward() {
    let mut rig = Rig::connected();
    let id = drive_ready(&mut rig);

    send(&mut rig, id, 1, -16000, 0, &[DEADMAN]);
    assert_eq!(rig.trace.last_throttle(), Some(1500));
    assert_eq!(rig.trace.last_steering(), Some(90));

    send(&mut rig, id, 2, -16000, 0, &[DEADMAN]);
    let pulse = rig.trace.last_throttle().unwrap();
    assert!(pulse > 1515 && pulse < 2000, "got {pulse}");

    // Release is immediate.
    send(&mut rig, id, 3, -16000, 0, &[]);
    assert_eq!(rig.trace.last_throttle(), Some(1500));
}

#[test]
fn full_reverse_and_forward_hit_the_limits() {
    let mut rig = Rig::connected();
    let id = drive_ready(&mut rig);
    send(&mut rig, id, 1, 0, 0, &[DEADMAN]);
    send(&mut rig, id, 2, -32767, 0, &[DEADMAN]);
    assert_eq!(rig.trace.last_throttle(), Some(2000));
    send(&mut rig, id, 3, 32767, 0, &[DEADMAN]);
    assert_eq!(rig.trace.last_throttle(), Some(1000));
    send(&mut rig, id, 4, i16::MIN, 0, &[DEADMAN]);
    assert_eq!(rig.trace.last_throttle(), Some(2000));
}

#[test]
fn brake_overrides_full_throttle() {
    let mut rig = Rig::connected();
    let id = drive_ready(&mut rig);
    send(&mut rig, id, 1, 0, 0, &[DEADMAN]);
    send(&mut rig, id, 2, 32767, 0, &[DEADMAN, BRAKE]);
    assert_eq!(rig.trace.last_throttle(), Some(1500));
    assert!(rig.manager.status().mapper.safety.emergency_brake_active);

    // Brake released with deadman still held: motion resumes.
    send(&mut rig, id, 3, 32767, 0, &[DEADMAN]);
    assert_eq!(rig.trace.last_throttle(), Some(1000));
}

#[test]
fn power_limit_latches() {
    let mut rig = Rig::connected();
    let id = drive_ready(&mut rig);
    send(&mut rig, id, 1, 0, 0, &[DEADMAN, POWER_LIMIT]);
    send(&mut rig, id, 2, -32767, 0, &[DEADMAN]);
    assert_eq!(rig.trace.last_throttle(), Some(1640));
    assert!(rig.manager.status().mapper.safety.power_limit_enabled);
}

#[test]
fn steering_follows_stick_without_deadman() {
    let mut rig = Rig::connected();
    let id = drive_ready(&mut rig);
    send(&mut rig, id, 1, 0, 1000, &[]);
    assert_eq!(rig.trace.last_steering(), Some(90));
    send(&mut rig, id, 2, 0, -32767, &[]);
    assert_eq!(rig.trace.last_steering(), Some(18));
    send(&mut rig, id, 3, 0, 32767, &[]);
    assert_eq!(rig.trace.last_steering(), Some(162));
    assert_eq!(rig.trace.last_throttle(), Some(1500));
}

#[test]
fn short_payload_is_rejected_and_state_kept() {
    let mut rig = Rig::connected();
    let id = drive_ready(&mut rig);
    send(&mut rig, id, 1, 0, 0, &[DEADMAN]);
    rig.trace.clear();

    rig.manager
        .handle(ControlEvent::peer(id, PeerEvent::Binary(vec![0; 15])));
    rig.manager
        .handle(ControlEvent::peer(id, PeerEvent::Text("{\"throttle\":1}".into())));

    assert!(rig.trace.calls().is_empty());
    assert!(rig.manager.status().mapper.safety.deadman_held);
    assert!(rig.events.contains(|e| *e == VehicleEvent::FrameRejected(DecodeError::BadLength(15))));
}

#[test]
fn hardware_fault_is_reported_and_processing_continues() {
    let mut rig = Rig::connected();
    let id = drive_ready(&mut rig);

    *rig.hw_fail.borrow_mut() = true;
    send(&mut rig, id, 1, 0, 0, &[DEADMAN]);
    assert!(rig.events.contains(|e| *e == VehicleEvent::HardwareFault(HardwareError::ThrottleWrite)));
    assert!(!rig.manager.status().mapper.safety.deadman_held);

    *rig.hw_fail.borrow_mut() = false;
    send(&mut rig, id, 2, 0, 0, &[DEADMAN]);
    assert!(rig.manager.status().mapper.safety.deadman_held);
    assert_eq!(rig.manager.live_session(), Some(id));
}

#[test]
fn safety_state_survives_session_replacement() {
    let mut rig = Rig::connected();
    let first = drive_ready(&mut rig);
    send(&mut rig, first, 1, 0, 0, &[DEADMAN, POWER_LIMIT]);
    send(&mut rig, first, 2, -32767, 0, &[DEADMAN]);
    assert_eq!(rig.trace.last_throttle(), Some(1640));

    let second = drive_ready(&mut rig);
    assert_ne!(first, second);
    let safety = rig.manager.status().mapper.safety;
    assert!(safety.deadman_held);
    assert!(safety.power_limit_enabled);

    // Deadman still reads as held, but the new controller has to arm it.
    send(&mut rig, second, 1, -32767, 0, &[DEADMAN]);
    assert_eq!(rig.trace.last_throttle(), Some(1500));
    send(&mut rig, second, 2, -32767, 0, &[DEADMAN]);
    assert_eq!(rig.trace.last_throttle(), Some(1640));
}

#[test]
fn reconnect_requires_rearming() {
    let mut rig = Rig::connected();
    let first = drive_ready(&mut rig);
    send(&mut rig, first, 1, 0, 0, &[DEADMAN]);
    send(&mut rig, first, 2, -32767, 0, &[DEADMAN]);
    assert_eq!(rig.trace.last_throttle(), Some(2000));

    rig.manager.handle(ControlEvent::disconnected("ping timeout"));
    assert!(rig.manager.take_reconnect_delay().is_some());
    rig.manager.connect();
    assert!(rig.manager.status().mapper.safety.deadman_held);
    assert!(!rig.manager.status().mapper.armed);

    let second = drive_ready(&mut rig);
    send(&mut rig, second, 1, -32767, 0, &[DEADMAN]);
    assert_eq!(rig.trace.last_throttle(), Some(1500));
    send(&mut rig, second, 2, -32767, 0, &[DEADMAN]);
    assert_eq!(rig.trace.last_throttle(), Some(2000));
}

#[test]
fn simulated_actuators_drive_end_to_end() {
    let trace = Trace::default();
    let mut manager = SessionManager::new(
        &VehicleConfig::default(),
        MockSignaling::new(&trace),
        MockConnector::new(&trace),
        SimulatedActuators::simulated(),
        LogEventSink::new(),
    );
    manager.start();
    manager.handle(ControlEvent::message(
        "gamepad-offer",
        json!({ "fromUserId": "ctrl", "offer": { "type": "offer", "sdp": "v=0" } }),
    ));
    let id = manager.live_session().unwrap();
    manager.handle(ControlEvent::peer(id, PeerEvent::DataChannelOpen { label: "gamepad".into() }));
    for seq in 1..=2 {
        let bytes = frame_bytes(seq, 0, -32767, 32767, &[DEADMAN]);
        manager.handle(ControlEvent::peer(id, PeerEvent::Binary(bytes)));
    }

    let st = manager.actuators().status();
    assert!(st.esc_simulated && st.servo_simulated);
    assert_eq!(st.throttle_pulse_us, Some(2000));
    assert_eq!(st.steering_angle_deg, Some(162));

    manager.shutdown();
    assert_eq!(manager.actuators().status().throttle_pulse_us, Some(1500));
    assert_eq!(manager.actuators().status().steering_angle_deg, Some(90));
}
