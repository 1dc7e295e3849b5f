//! Integration tests for the SessionManager → PeerSession → mapper pipeline.
//!
//! Drive the manager with the same `ControlEvent`s the transport adapters
//! would queue, and check the resulting signaling traffic, peer transport
//! requests and actuator writes on the shared trace.

use core::time::Duration;

use serde_json::json;
use vehiclelink::app::commands::ControlEvent;
use vehiclelink::app::events::{CloseReason, VehicleEvent};
use vehiclelink::app::manager::{Flow, LinkState};
use vehiclelink::config::VehicleConfig;
use vehiclelink::error::NegotiationError;
use vehiclelink::peer::session::{MAX_PENDING_ICE, TransportState};
use vehiclelink::peer::{PeerEvent, SessionId};
use vehiclelink::signaling::messages::{IceCandidate, SessionDescription};

use super::mock_hw::{Call, Rig, frame_bytes};

// ── Helpers ───────────────────────────────────────────────────

fn offer(rig: &mut Rig, from: &str) {
    rig.manager.handle(ControlEvent::message(
        "gamepad-offer",
        json!({ "fromUserId": from, "offer": { "type": "offer", "sdp": "v=0 offer" } }),
    ));
}

fn remote_ice(rig: &mut Rig, from: &str, candidate: &str) {
    rig.manager.handle(ControlEvent::message(
        "gamepad-ice-candidate",
        json!({
            "fromUserId": from,
            "candidate": { "candidate": candidate, "sdpMid": "0", "sdpMLineIndex": 0 }
        }),
    ));
}

fn peer(rig: &mut Rig, id: SessionId, event: PeerEvent) -> Flow {
    rig.manager.handle(ControlEvent::peer(id, event))
}

/// Offer from `from`, run the whole answer sequence and open the channel.
fn connect_controller(rig: &mut Rig, from: &str) -> SessionId {
    offer(rig, from);
    let id = rig.manager.live_session().expect("session opened");
    let answer = SessionDescription::answer("v=0 answer");
    peer(rig, id, PeerEvent::RemoteDescriptionSet);
    peer(rig, id, PeerEvent::AnswerCreated(answer.clone()));
    peer(rig, id, PeerEvent::LocalDescriptionSet(answer));
    peer(rig, id, PeerEvent::DataChannelOpen { label: "gamepad".into() });
    id
}

fn frame(seq: u32, throttle: i16, steering: i16, buttons: &[u8]) -> PeerEvent {
    PeerEvent::Binary(frame_bytes(seq, seq * 20, throttle, steering, buttons))
}

// ── Signaling link ────────────────────────────────────────────

#[test]
fn start_halts_connects_and_joins_room() {
    let mut rig = Rig::new();
    rig.manager.start();

    let calls = rig.trace.calls();
    assert_eq!(calls[0], Call::Throttle(1500));
    assert_eq!(calls[1], Call::Steering(90));
    assert_eq!(calls[2], Call::Connect);
    assert_eq!(
        calls[3],
        Call::Emit {
            event: "join-room".into(),
            payload: json!({ "roomId": "GamepadChannel", "userInfo": { "name": "Pi", "role": "Car" } }),
        }
    );
    assert_eq!(rig.manager.link(), LinkState::Connected);
    assert!(rig.events.contains(|e| *e == VehicleEvent::SignalingConnected));
    assert_eq!(rig.manager.take_reconnect_delay(), None);
}

#[test]
fn failed_connects_back_off_exponentially_then_reset() {
    let mut rig = Rig::with(VehicleConfig::default(), 5);
    rig.manager.start();

    let mut delays = Vec::new();
    while let Some(delay) = rig.manager.take_reconnect_delay() {
        delays.push(delay.as_secs());
        rig.manager.connect();
    }
    assert_eq!(delays, vec![1, 2, 4, 8, 10]);
    assert_eq!(rig.manager.link(), LinkState::Connected);
    assert_eq!(rig.manager.status().reconnect_attempts, 0);
    assert_eq!(rig.trace.count(|c| *c == Call::Connect), 6);

    // The schedule starts over after a successful connect.
    rig.manager.handle(ControlEvent::disconnected("ping timeout"));
    assert_eq!(rig.manager.take_reconnect_delay(), Some(Duration::from_secs(1)));
}

#[test]
fn backoff_saturates_at_cap() {
    let mut rig = Rig::with(VehicleConfig::default(), 8);
    rig.manager.start();
    let mut last = Duration::ZERO;
    while let Some(delay) = rig.manager.take_reconnect_delay() {
        last = delay;
        rig.manager.connect();
    }
    assert_eq!(last, Duration::from_secs(10));
    assert!(rig.events.contains(|e| matches!(
        e,
        VehicleEvent::ReconnectScheduled { attempt: 8, delay } if *delay == Duration::from_secs(10)
    )));
}

#[test]
fn disconnect_stops_vehicle_before_next_connect() {
    let mut rig = Rig::connected();
    let id = connect_controller(&mut rig, "ctrl");
    peer(&mut rig, id, frame(1, -16000, 0, &[0]));
    peer(&mut rig, id, frame(2, -16000, 0, &[0]));
    assert!(rig.trace.last_throttle().unwrap() > 1515);

    rig.trace.clear();
    rig.manager.handle(ControlEvent::disconnected("transport close"));
    assert_eq!(rig.manager.link(), LinkState::Disconnected);
    assert_eq!(rig.manager.live_session(), None);

    let delay = rig.manager.take_reconnect_delay();
    assert_eq!(delay, Some(Duration::from_secs(1)));
    rig.manager.connect();

    let stop = rig.trace.position(|c| *c == Call::Throttle(1500)).expect("stop issued");
    let close = rig.trace.position(|c| *c == Call::PeerClose(id)).expect("session closed");
    let connect = rig.trace.position(|c| *c == Call::Connect).expect("reconnected");
    assert!(stop < connect);
    assert!(close < connect);
    assert!(rig.trace.last_emit("join-room").is_some());
}

#[test]
fn duplicate_disconnect_schedules_once() {
    let mut rig = Rig::connected();
    rig.manager.handle(ControlEvent::disconnected("io error"));
    rig.manager.handle(ControlEvent::disconnected("io error"));
    assert_eq!(rig.manager.take_reconnect_delay(), Some(Duration::from_secs(1)));
    assert_eq!(rig.manager.status().reconnect_attempts, 1);
}

// ── Negotiation ───────────────────────────────────────────────

#[test]
fn ice_before_any_offer_is_dropped() {
    let mut rig = Rig::connected();
    remote_ice(&mut rig, "ctrl", "candidate:early");
    assert_eq!(rig.manager.live_session(), None);
    assert_eq!(rig.trace.count(|c| matches!(c, Call::AddIce(..) | Call::PeerOpen(_))), 0);

    // A later offer does not replay it.
    offer(&mut rig, "ctrl");
    let id = rig.manager.live_session().unwrap();
    peer(&mut rig, id, PeerEvent::RemoteDescriptionSet);
    assert_eq!(rig.trace.count(|c| matches!(c, Call::AddIce(..))), 0);
}

#[test]
fn offer_answer_sequence_with_queued_ice() {
    let mut rig = Rig::connected();
    offer(&mut rig, "ctrl");
    let id = SessionId(1);
    assert_eq!(rig.manager.live_session(), Some(id));
    assert_eq!(rig.trace.calls(), vec![Call::PeerOpen(id), Call::SetRemote(id)]);

    remote_ice(&mut rig, "ctrl", "candidate:a");
    remote_ice(&mut rig, "ctrl", "candidate:b");
    assert_eq!(rig.trace.count(|c| matches!(c, Call::AddIce(..))), 0);

    peer(&mut rig, id, PeerEvent::RemoteDescriptionSet);
    let calls = rig.trace.calls();
    assert_eq!(
        &calls[2..],
        &[
            Call::AddIce(id, "candidate:a".into()),
            Call::AddIce(id, "candidate:b".into()),
            Call::CreateAnswer(id),
        ]
    );

    let answer = SessionDescription::answer("v=0 answer");
    peer(&mut rig, id, PeerEvent::AnswerCreated(answer.clone()));
    assert_eq!(rig.trace.calls().last(), Some(&Call::SetLocal(id)));
    peer(&mut rig, id, PeerEvent::LocalDescriptionSet(answer));
    assert_eq!(
        rig.trace.last_emit("gamepad-answer"),
        Some(json!({ "targetUserId": "ctrl", "answer": { "type": "answer", "sdp": "v=0 answer" } }))
    );

    peer(
        &mut rig,
        id,
        PeerEvent::LocalCandidate(IceCandidate {
            candidate: "candidate:local".into(),
            sdp_mid: Some("0".into()),
            sdp_mline_index: Some(0),
        }),
    );
    assert_eq!(
        rig.trace.last_emit("gamepad-ice-candidate"),
        Some(json!({
            "targetUserId": "ctrl",
            "candidate": { "candidate": "candidate:local", "sdpMid": "0", "sdpMLineIndex": 0 }
        }))
    );

    // After the remote description, candidates apply immediately.
    remote_ice(&mut rig, "ctrl", "candidate:c");
    assert_eq!(rig.trace.calls().last(), Some(&Call::AddIce(id, "candidate:c".into())));

    peer(&mut rig, id, PeerEvent::DataChannelOpen { label: "gamepad".into() });
    let status = rig.manager.status().session.unwrap();
    assert_eq!(status.state, TransportState::Connected);
    assert_eq!(status.peer_id, "ctrl");
}

#[test]
fn plain_event_names_are_accepted() {
    let mut rig = Rig::connected();
    rig.manager.handle(ControlEvent::message(
        "offer",
        json!({ "fromUserId": "ctrl", "offer": { "type": "offer", "sdp": "v=0" } }),
    ));
    assert_eq!(rig.manager.live_session(), Some(SessionId(1)));
    rig.manager.handle(ControlEvent::message(
        "ice-candidate",
        json!({ "fromUserId": "ctrl", "candidate": { "candidate": "candidate:x" } }),
    ));
    assert_eq!(rig.manager.status().session.unwrap().state, TransportState::Negotiating);
}

#[test]
fn ice_from_another_peer_is_dropped() {
    let mut rig = Rig::connected();
    let id = connect_controller(&mut rig, "ctrl");
    remote_ice(&mut rig, "intruder", "candidate:x");
    assert_eq!(rig.trace.count(|c| matches!(c, Call::AddIce(..))), 0);
    assert_eq!(rig.manager.live_session(), Some(id));
}

#[test]
fn remote_answer_is_ignored() {
    let mut rig = Rig::connected();
    let id = connect_controller(&mut rig, "ctrl");
    let before = rig.trace.calls().len();
    rig.manager.handle(ControlEvent::message(
        "gamepad-answer",
        json!({ "fromUserId": "ctrl", "answer": { "type": "answer", "sdp": "v=0" } }),
    ));
    assert_eq!(rig.trace.calls().len(), before);
    assert_eq!(rig.manager.live_session(), Some(id));
}

#[test]
fn last_offer_wins() {
    let mut rig = Rig::connected();
    let first = connect_controller(&mut rig, "ctrl-a");
    rig.trace.clear();

    offer(&mut rig, "ctrl-b");
    let second = rig.manager.live_session().unwrap();
    assert_ne!(first, second);

    let close = rig.trace.position(|c| *c == Call::PeerClose(first)).unwrap();
    let stop = rig.trace.position(|c| *c == Call::Throttle(1500)).unwrap();
    let open = rig.trace.position(|c| *c == Call::PeerOpen(second)).unwrap();
    assert!(close < open && stop < open);
    assert!(rig.events.contains(|e| matches!(
        e,
        VehicleEvent::SessionClosed { session, reason: CloseReason::Replaced, .. } if *session == first
    )));
}

#[test]
fn stale_session_traffic_never_reaches_the_mapper() {
    let mut rig = Rig::connected();
    let first = connect_controller(&mut rig, "ctrl-a");
    offer(&mut rig, "ctrl-b");
    let applied = rig.manager.status().mapper.frames_applied;
    rig.trace.clear();

    peer(&mut rig, first, frame(10, -32767, 32767, &[0]));
    peer(&mut rig, first, frame(11, -32767, 32767, &[0]));
    peer(&mut rig, first, PeerEvent::LocalDescriptionSet(SessionDescription::answer("late")));

    assert!(rig.trace.calls().is_empty());
    assert_eq!(rig.manager.status().mapper.frames_applied, applied);
}

#[test]
fn malformed_offer_is_dropped() {
    let mut rig = Rig::connected();
    rig.manager.handle(ControlEvent::message("gamepad-offer", json!({ "fromUserId": "ctrl" })));
    rig.manager.handle(ControlEvent::message("video-offer", json!({})));
    assert_eq!(rig.manager.live_session(), None);
    assert!(rig.trace.calls().is_empty());
}

#[test]
fn answer_typed_offer_closes_the_new_session() {
    let mut rig = Rig::connected();
    rig.manager.handle(ControlEvent::message(
        "gamepad-offer",
        json!({ "fromUserId": "ctrl", "offer": { "type": "answer", "sdp": "v=0" } }),
    ));
    assert_eq!(rig.manager.live_session(), None);
    assert!(rig.trace.calls().contains(&Call::PeerClose(SessionId(1))));
    assert!(rig.events.contains(|e| matches!(
        e,
        VehicleEvent::SessionClosed { reason: CloseReason::Negotiation(NegotiationError::NotAnOffer(_)), .. }
    )));
}

#[test]
fn negotiation_failure_tears_down_only_that_session() {
    let mut rig = Rig::connected();
    let id = connect_controller(&mut rig, "ctrl");
    peer(&mut rig, id, PeerEvent::NegotiationFailed("dtls handshake".into()));

    assert_eq!(rig.manager.live_session(), None);
    assert_eq!(rig.manager.link(), LinkState::Connected);
    assert!(rig.trace.calls().contains(&Call::PeerClose(id)));
    assert_eq!(rig.trace.last_throttle(), Some(1500));

    // A fresh offer still works.
    offer(&mut rig, "ctrl");
    assert_eq!(rig.manager.live_session(), Some(id.next()));
}

#[test]
fn pending_ice_overflow_tears_session_down() {
    let mut rig = Rig::connected();
    offer(&mut rig, "ctrl");
    for i in 0..=MAX_PENDING_ICE {
        remote_ice(&mut rig, "ctrl", &format!("candidate:{i}"));
    }
    assert_eq!(rig.manager.live_session(), None);
    assert!(rig.events.contains(|e| matches!(
        e,
        VehicleEvent::SessionClosed { reason: CloseReason::Negotiation(NegotiationError::IceQueueFull), .. }
    )));
}

#[test]
fn transport_close_discards_session() {
    let mut rig = Rig::connected();
    let id = connect_controller(&mut rig, "ctrl");
    peer(&mut rig, id, PeerEvent::Closed);
    assert_eq!(rig.manager.live_session(), None);
    assert_eq!(rig.trace.count(|c| *c == Call::PeerClose(id)), 1);
}

// ── Room membership ───────────────────────────────────────────

#[test]
fn controller_leaving_stops_vehicle() {
    let mut rig = Rig::connected();
    let id = connect_controller(&mut rig, "ctrl");
    peer(&mut rig, id, frame(1, -16000, 0, &[0]));
    peer(&mut rig, id, frame(2, -16000, 0, &[0]));

    rig.manager.handle(ControlEvent::message("user-left", json!({ "userId": "someone-else" })));
    assert_eq!(rig.manager.live_session(), Some(id));

    rig.manager.handle(ControlEvent::message("user-left", json!({ "userId": "ctrl" })));
    assert_eq!(rig.manager.live_session(), None);
    assert_eq!(rig.trace.last_throttle(), Some(1500));
    assert!(rig.events.contains(|e| matches!(
        e,
        VehicleEvent::SessionClosed { reason: CloseReason::PeerLeft, .. }
    )));
}

#[test]
fn informational_events_change_nothing() {
    let mut rig = Rig::connected();
    rig.manager.handle(ControlEvent::message(
        "joined-room",
        json!({ "roomId": "GamepadChannel", "users": [{ "id": "a", "userInfo": { "name": "Pi", "role": "Car" } }] }),
    ));
    rig.manager.handle(ControlEvent::message(
        "user-joined",
        json!({ "userId": "b", "userInfo": { "name": "Pad", "role": "Controller" } }),
    ));
    rig.manager.handle(ControlEvent::message("message", json!({ "fromUserId": "b", "message": "hi" })));
    rig.manager.handle(ControlEvent::message("error", json!({ "message": "room full" })));

    assert!(rig.trace.calls().is_empty());
    assert!(rig.events.contains(|e| *e
        == VehicleEvent::JoinedRoom {
            room_id: "GamepadChannel".into(),
            members: 1,
        }));
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn shutdown_stops_and_leaves() {
    let mut rig = Rig::connected();
    let id = connect_controller(&mut rig, "ctrl");
    rig.trace.clear();

    assert_eq!(rig.manager.handle(ControlEvent::Shutdown), Flow::Exit);
    let calls = rig.trace.calls();
    assert!(calls.contains(&Call::PeerClose(id)));
    assert!(calls.contains(&Call::Throttle(1500)));
    assert!(calls.contains(&Call::Steering(90)));
    assert_eq!(calls.last(), Some(&Call::Disconnect));
    assert!(rig.manager.is_shut_down());

    // Nothing is processed afterwards, and no reconnect is scheduled.
    assert_eq!(rig.manager.handle(ControlEvent::disconnected("bye")), Flow::Exit);
    assert_eq!(rig.manager.take_reconnect_delay(), None);
}
