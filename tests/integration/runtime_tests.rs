//! Integration tests for the queue-driven control loop.
//!
//! These run the real `runtime::run_blocking` loop on the host with short
//! backoff delays and check that reconnects happen and that a `Shutdown`
//! is honoured even while a reconnect wait is pending.

use std::time::Instant;

use serde_json::Value;
use vehiclelink::app::commands::ControlEvent;
use vehiclelink::app::events::VehicleEvent;
use vehiclelink::app::manager::SessionManager;
use vehiclelink::app::ports::SignalingPort;
use vehiclelink::config::VehicleConfig;
use vehiclelink::error::SignalingError;
use vehiclelink::runtime::{self, ControlChannel};

use super::mock_hw::{Call, MockActuators, MockConnector, MockSignaling, RecordingSink, Trace};

/// Signaling mock that asks the loop to shut down once the room join is sent.
struct ShutdownAfterJoin<'a> {
    inner: MockSignaling,
    queue: &'a ControlChannel,
}

impl SignalingPort for ShutdownAfterJoin<'_> {
    fn connect(&mut self) -> Result<(), SignalingError> {
        self.inner.connect()
    }

    fn emit(&mut self, event: &str, payload: Value) -> Result<(), SignalingError> {
        self.inner.emit(event, payload)?;
        if event == "join-room" {
            runtime::push(self.queue, ControlEvent::Shutdown);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.inner.disconnect();
    }
}

fn fast_config() -> VehicleConfig {
    let mut config = VehicleConfig::default();
    config.signaling.reconnect_initial_ms = 1;
    config.signaling.reconnect_max_ms = 4;
    config
}

#[test]
fn loop_reconnects_until_connected() {
    let queue = ControlChannel::new();
    let trace = Trace::default();
    let events = RecordingSink::default();
    let mut manager = SessionManager::new(
        &fast_config(),
        ShutdownAfterJoin {
            inner: MockSignaling::failing(&trace, 3),
            queue: &queue,
        },
        MockConnector::new(&trace),
        MockActuators::new(&trace),
        events.clone(),
    );

    runtime::run_blocking(&mut manager, &queue);

    assert_eq!(trace.count(|c| *c == Call::Connect), 4);
    assert_eq!(trace.emitted(), vec!["join-room".to_owned()]);
    assert_eq!(trace.calls().last(), Some(&Call::Disconnect));
    let attempts: Vec<u32> = events
        .events()
        .iter()
        .filter_map(|e| match e {
            VehicleEvent::ReconnectScheduled { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2, 3]);
    assert!(manager.is_shut_down());
}

#[test]
fn shutdown_interrupts_backoff() {
    let mut config = VehicleConfig::default();
    config.signaling.reconnect_initial_ms = 60_000;
    config.signaling.reconnect_max_ms = 60_000;

    let queue = ControlChannel::new();
    let trace = Trace::default();
    let mut manager = SessionManager::new(
        &config,
        MockSignaling::failing(&trace, 100),
        MockConnector::new(&trace),
        MockActuators::new(&trace),
        RecordingSink::default(),
    );
    assert!(runtime::push(&queue, ControlEvent::disconnected("stale")));
    assert!(runtime::push(&queue, ControlEvent::Shutdown));

    let started = Instant::now();
    runtime::run_blocking(&mut manager, &queue);

    assert!(started.elapsed().as_secs() < 30);
    assert_eq!(trace.count(|c| *c == Call::Connect), 1);
    assert_eq!(trace.last_throttle(), Some(1500));
    assert!(manager.is_shut_down());
}
