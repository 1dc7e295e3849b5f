//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured vehicle events through
//! the `log` facade, one `TAG | key=value` record per event.  A dashboard
//! or telemetry adapter would implement the same trait.

use log::{error, info, warn};

use crate::app::events::VehicleEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`VehicleEvent`].
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &VehicleEvent) {
        match event {
            VehicleEvent::SignalingConnected => info!("LINK | connected"),
            VehicleEvent::SignalingDisconnected { reason } => {
                warn!("LINK | disconnected reason={}", reason);
            }
            VehicleEvent::ReconnectScheduled { attempt, delay } => {
                info!("LINK | reconnect attempt={} delay={}ms", attempt, delay.as_millis());
            }
            VehicleEvent::JoinedRoom { room_id, members } => {
                info!("ROOM | joined room={} members={}", room_id, members);
            }
            VehicleEvent::SessionOpened { session, peer_id } => {
                info!("PEER | opened session={} peer={}", session, peer_id);
            }
            VehicleEvent::SessionConnected { session, peer_id } => {
                info!("PEER | connected session={} peer={}", session, peer_id);
            }
            VehicleEvent::SessionClosed {
                session,
                peer_id,
                reason,
            } => {
                info!("PEER | closed session={} peer={} reason={:?}", session, peer_id, reason);
            }
            VehicleEvent::Actuated { sequence, command } => {
                log::debug!(
                    "DRIVE | seq={} throttle={}us steering={}deg",
                    sequence,
                    command.throttle_pulse_us,
                    command.steering_angle_deg
                );
            }
            VehicleEvent::Stopped(cmd) => {
                info!(
                    "DRIVE | stopped throttle={}us steering={}deg",
                    cmd.throttle_pulse_us, cmd.steering_angle_deg
                );
            }
            VehicleEvent::FrameRejected(e) => warn!("FRAME | rejected {}", e),
            VehicleEvent::HardwareFault(e) => error!("FAULT | {}", e),
        }
    }
}
