//! Signaling session manager — the hexagonal core.
//!
//! [`SessionManager`] owns the signaling link state, the single live
//! [`PeerSession`] and the [`ActuationMapper`].  It consumes
//! [`ControlEvent`]s one at a time; nothing else mutates session or safety
//! state.
//!
//! ```text
//!  SignalingPort ◀──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                     │      SessionManager       │
//!  PeerConnector ◀──▶ │ link · session · mapper   │ ──▶ ActuatorPort
//!                     └──────────────────────────┘
//! ```
//!
//! Link handling: a failed connect or a dropped link halts the vehicle,
//! destroys the live session and schedules a reconnect with exponential
//! backoff.  The runtime reads the delay with
//! [`take_reconnect_delay`](SessionManager::take_reconnect_delay), waits,
//! and calls [`connect`](SessionManager::connect) again.

use core::time::Duration;

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::config::VehicleConfig;
use crate::control::mapper::{ActuationMapper, MapperStatus};
use crate::error::NegotiationError;
use crate::peer::session::{PeerSession, SessionAction, TransportState};
use crate::peer::{PeerEvent, SessionId};
use crate::signaling::backoff::Backoff;
use crate::signaling::messages::{
    self, InboundSignal, RemoteOffer, SignalingIdentity, EVENT_GAMEPAD_ANSWER,
    EVENT_GAMEPAD_ICE_CANDIDATE, EVENT_JOIN_ROOM,
};

use super::commands::{ControlEvent, SignalingEvent};
use super::events::{CloseReason, VehicleEvent};
use super::ports::{ActuatorPort, EventSink, PeerConnector, SignalingPort};

/// Signaling link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// What the control loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub id: SessionId,
    pub peer_id: String,
    pub state: TransportState,
}

/// Point-in-time view of the whole control plane.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleStatus {
    pub link: LinkState,
    pub session: Option<SessionStatus>,
    pub mapper: MapperStatus,
    pub reconnect_attempts: u32,
}

// ───────────────────────────────────────────────────────────────
// SessionManager
// ───────────────────────────────────────────────────────────────

pub struct SessionManager<S, C, A, E>
where
    S: SignalingPort,
    C: PeerConnector,
    A: ActuatorPort,
    E: EventSink,
{
    signaling: S,
    connector: C,
    hw: A,
    sink: E,
    identity: SignalingIdentity,
    mapper: ActuationMapper,
    backoff: Backoff,
    link: LinkState,
    session: Option<PeerSession<C::Connection>>,
    next_session: SessionId,
    pending_reconnect: Option<Duration>,
    shutting_down: bool,
}

impl<S, C, A, E> SessionManager<S, C, A, E>
where
    S: SignalingPort,
    C: PeerConnector,
    A: ActuatorPort,
    E: EventSink,
{
    /// Construct the manager.  Does **not** connect; call [`start`](Self::start).
    pub fn new(config: &VehicleConfig, signaling: S, connector: C, hw: A, sink: E) -> Self {
        Self {
            signaling,
            connector,
            hw,
            sink,
            identity: SignalingIdentity::car(
                config.signaling.room_id.as_str(),
                config.signaling.display_name.as_str(),
            ),
            mapper: ActuationMapper::new(config),
            backoff: Backoff::new(
                config.signaling.reconnect_initial(),
                config.signaling.reconnect_max(),
            ),
            link: LinkState::Disconnected,
            session: None,
            next_session: SessionId(1),
            pending_reconnect: None,
            shutting_down: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Put the actuators in a known state and make the first connect attempt.
    pub fn start(&mut self) {
        info!(
            "SessionManager starting: room '{}' as '{}'",
            self.identity.room_id, self.identity.display_name
        );
        self.halt();
        self.connect();
    }

    /// One connect attempt.  Success joins the room; failure schedules the
    /// next attempt.
    pub fn connect(&mut self) {
        if self.shutting_down || self.link == LinkState::Connected {
            return;
        }
        self.pending_reconnect = None;

        match self.signaling.connect() {
            Ok(()) => {
                self.link = LinkState::Connected;
                self.backoff.reset();
                info!("Signaling connected");
                self.sink.emit(&VehicleEvent::SignalingConnected);

                let payload = messages::join_room_payload(&self.identity);
                if let Err(e) = self.signaling.emit(EVENT_JOIN_ROOM, payload) {
                    self.on_link_lost(&e.to_string());
                } else {
                    info!("Joining room '{}'", self.identity.room_id);
                }
            }
            Err(e) => {
                warn!("Signaling connect failed: {}", e);
                self.sink.emit(&VehicleEvent::SignalingDisconnected {
                    reason: e.to_string(),
                });
                self.schedule_reconnect();
            }
        }
    }

    /// Delay before the runtime should call [`connect`](Self::connect), if a
    /// reconnect is pending.  Consumed on read.
    pub fn take_reconnect_delay(&mut self) -> Option<Duration> {
        self.pending_reconnect.take()
    }

    /// Tear down the live session, return the actuators to neutral / centre
    /// and leave the signaling server.  No further reconnects are scheduled.
    pub fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        info!("SessionManager shutting down");
        self.shutting_down = true;
        self.pending_reconnect = None;
        self.stop_vehicle(CloseReason::Shutdown);
        if self.link == LinkState::Connected {
            self.signaling.disconnect();
            self.link = LinkState::Disconnected;
        }
    }

    // ── Event dispatch ────────────────────────────────────────

    pub fn handle(&mut self, event: ControlEvent) -> Flow {
        if self.shutting_down {
            debug!("Ignoring {:?} after shutdown", event);
            return Flow::Exit;
        }
        match event {
            ControlEvent::Shutdown => {
                self.shutdown();
                return Flow::Exit;
            }
            ControlEvent::Signaling(SignalingEvent::Message { name, payload }) => {
                self.on_signal(&name, payload);
            }
            ControlEvent::Signaling(SignalingEvent::Disconnected { reason }) => {
                self.on_link_lost(&reason);
            }
            ControlEvent::Peer { session, event } => self.on_peer_event(session, event),
        }
        Flow::Continue
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutting_down
    }

    pub fn live_session(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id())
    }

    pub fn status(&self) -> VehicleStatus {
        VehicleStatus {
            link: self.link,
            session: self.session.as_ref().map(|s| SessionStatus {
                id: s.id(),
                peer_id: s.peer_id().to_owned(),
                state: s.state(),
            }),
            mapper: self.mapper.status(),
            reconnect_attempts: self.backoff.attempts(),
        }
    }

    pub fn actuators(&self) -> &A {
        &self.hw
    }

    pub fn signaling(&self) -> &S {
        &self.signaling
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    // ── Signaling link ────────────────────────────────────────

    fn on_link_lost(&mut self, reason: &str) {
        if self.link == LinkState::Disconnected {
            debug!("Signaling already down ({}), ignoring", reason);
            return;
        }
        warn!("Signaling disconnected: {}", reason);
        self.link = LinkState::Disconnected;
        self.stop_vehicle(CloseReason::SignalingLost);
        self.sink.emit(&VehicleEvent::SignalingDisconnected {
            reason: reason.to_owned(),
        });
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        let delay = self.backoff.next_delay();
        let attempt = self.backoff.attempts();
        info!("Reconnect attempt {} in {} ms", attempt, delay.as_millis());
        self.pending_reconnect = Some(delay);
        self.sink.emit(&VehicleEvent::ReconnectScheduled { attempt, delay });
    }

    fn send(&mut self, event: &str, payload: Value) {
        if self.link != LinkState::Connected {
            warn!("Signaling down, dropping outbound '{}'", event);
            return;
        }
        if let Err(e) = self.signaling.emit(event, payload) {
            warn!("Failed to emit '{}': {}", event, e);
        }
    }

    // ── Inbound signaling ─────────────────────────────────────

    fn on_signal(&mut self, name: &str, payload: Value) {
        let signal = match InboundSignal::parse(name, payload) {
            Ok(s) => s,
            Err(e) => {
                warn!("Dropping signaling event: {}", e);
                return;
            }
        };

        match signal {
            InboundSignal::JoinedRoom(joined) => {
                info!("Joined room '{}' with {} member(s)", joined.room_id, joined.users.len());
                for member in &joined.users {
                    let (name, role) = member
                        .user_info
                        .as_ref()
                        .map(|u| (u.name.as_str(), u.role.as_deref().unwrap_or("unknown")))
                        .unwrap_or(("Anonymous", "unknown"));
                    info!("  member {} | name={} role={}", member.id, name, role);
                }
                self.sink.emit(&VehicleEvent::JoinedRoom {
                    room_id: joined.room_id,
                    members: joined.users.len(),
                });
            }
            InboundSignal::UserJoined(user) => {
                let (name, role) = user
                    .user_info
                    .as_ref()
                    .map(|u| (u.name.as_str(), u.role.as_deref().unwrap_or("unknown")))
                    .unwrap_or(("Anonymous", "unknown"));
                info!("User joined: {} ({}) id={}", name, role, user.user_id);
            }
            InboundSignal::UserLeft(user) => {
                if self.is_live_peer(&user.user_id) {
                    warn!("Controller {} left the room", user.user_id);
                    self.teardown(CloseReason::PeerLeft);
                } else {
                    info!("User left: {}", user.user_id);
                }
            }
            InboundSignal::Offer(offer) => self.on_offer(offer),
            InboundSignal::Answer(answer) => match self.session.as_mut() {
                Some(s) if s.peer_id() == answer.from_user_id => {
                    s.handle_remote_answer(&answer.answer);
                }
                _ => warn!("Answer from {} with no matching session, dropped", answer.from_user_id),
            },
            InboundSignal::IceCandidate(remote) => {
                let result = match self.session.as_mut() {
                    Some(s) if s.peer_id() == remote.from_user_id => {
                        s.add_remote_candidate(remote.candidate)
                    }
                    _ => {
                        warn!(
                            "ICE candidate from {} with no matching session, dropped",
                            remote.from_user_id
                        );
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    self.fail_session(e);
                }
            }
            InboundSignal::Message(msg) => {
                info!(
                    "Message from {}: {}",
                    msg.from_user_id.as_deref().unwrap_or("server"),
                    msg.message
                );
            }
            InboundSignal::Error(err) => error!("Signaling server error: {}", err.message),
        }
    }

    /// Last offer wins: the live session is torn down before the new one opens.
    fn on_offer(&mut self, offer: RemoteOffer) {
        info!("Offer from {}", offer.from_user_id);
        self.teardown(CloseReason::Replaced);

        let id = self.next_session;
        self.next_session = id.next();

        let conn = match self.connector.open(id) {
            Ok(c) => c,
            Err(e) => {
                error!("Session {}: could not create peer connection: {}", id, e);
                return;
            }
        };

        let mut session = PeerSession::new(id, &offer.from_user_id, conn);
        self.sink.emit(&VehicleEvent::SessionOpened {
            session: id,
            peer_id: offer.from_user_id.clone(),
        });

        match session.begin(&offer.offer) {
            Ok(()) => self.session = Some(session),
            Err(e) => {
                warn!("Session {}: negotiation failed: {}", id, e);
                session.close(
                    CloseReason::Negotiation(e),
                    &mut self.mapper,
                    &mut self.hw,
                    &mut self.sink,
                );
            }
        }
    }

    // ── Peer sessions ─────────────────────────────────────────

    fn on_peer_event(&mut self, id: SessionId, event: PeerEvent) {
        let session = match self.session.as_mut() {
            Some(s) if s.id() == id => s,
            _ => {
                debug!("Dropping {:?} from stale session {}", event, id);
                return;
            }
        };

        let result = session.handle_event(event, &mut self.mapper, &mut self.hw, &mut self.sink);
        let peer = session.peer_id().to_owned();

        match result {
            Ok(SessionAction::None) => {}
            Ok(SessionAction::SendAnswer(answer)) => {
                info!("Session {}: sending answer to {}", id, peer);
                self.send(EVENT_GAMEPAD_ANSWER, messages::answer_payload(&peer, &answer));
            }
            Ok(SessionAction::SendCandidate(candidate)) => {
                self.send(
                    EVENT_GAMEPAD_ICE_CANDIDATE,
                    messages::candidate_payload(&peer, &candidate),
                );
            }
            Ok(SessionAction::Closed) => self.session = None,
            Err(e) => self.fail_session(e),
        }
    }

    fn fail_session(&mut self, e: NegotiationError) {
        warn!("Peer negotiation failed: {}", e);
        self.teardown(CloseReason::Negotiation(e));
    }

    fn is_live_peer(&self, peer_id: &str) -> bool {
        self.session.as_ref().is_some_and(|s| s.peer_id() == peer_id)
    }

    /// Close and discard the live session, if any.  Closing stops the vehicle.
    fn teardown(&mut self, reason: CloseReason) {
        if let Some(mut session) = self.session.take() {
            session.close(reason, &mut self.mapper, &mut self.hw, &mut self.sink);
        }
    }

    /// Tear down the live session if there is one, otherwise stop directly.
    fn stop_vehicle(&mut self, reason: CloseReason) {
        if self.session.is_some() {
            self.teardown(reason);
        } else {
            self.halt();
        }
    }

    /// Neutral throttle, centred steering.
    fn halt(&mut self) {
        match self.mapper.stop(&mut self.hw) {
            Ok(cmd) => self.sink.emit(&VehicleEvent::Stopped(cmd)),
            Err(e) => self.sink.emit(&VehicleEvent::HardwareFault(e)),
        }
    }
}
