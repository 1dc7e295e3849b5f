//! Peer session state machine.
//!
//! ```text
//!   ┌─────────────┐  DataChannelOpen  ┌───────────┐
//!   │ Negotiating │──────────────────▶│ Connected │
//!   └─────────────┘                   └───────────┘
//!          │  close / Closed / error        │
//!          └──────────────┬─────────────────┘
//!                         ▼
//!                    ┌────────┐
//!                    │ Closed │  (terminal)
//!                    └────────┘
//! ```
//!
//! Negotiation is driven by completions from the transport adapter:
//!
//! 1. `begin(offer)` requests the remote description.
//! 2. `RemoteDescriptionSet` flushes queued remote ICE candidates in arrival
//!    order, then requests an answer.
//! 3. `AnswerCreated` requests the local description.
//! 4. `LocalDescriptionSet` hands the answer to the manager for sending.
//!
//! The vehicle always answers; it never creates an offer.

use heapless::Deque;
use log::{debug, info, warn};

use super::{PeerEvent, SessionId};
use crate::app::events::{CloseReason, VehicleEvent};
use crate::app::ports::{ActuatorPort, EventSink, PeerConnection};
use crate::control::frame;
use crate::control::mapper::ActuationMapper;
use crate::error::NegotiationError;
use crate::signaling::messages::{IceCandidate, SdpType, SessionDescription};

/// Remote candidates buffered while the remote description is pending.
pub const MAX_PENDING_ICE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Negotiating,
    Connected,
    Closed,
}

/// Follow-up the manager must perform on the signaling link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    None,
    /// Emit `gamepad-answer` to the peer.
    SendAnswer(SessionDescription),
    /// Emit `gamepad-ice-candidate` to the peer.
    SendCandidate(IceCandidate),
    /// The session reached `Closed` and must be discarded.
    Closed,
}

pub struct PeerSession<C: PeerConnection> {
    id: SessionId,
    peer_id: String,
    state: TransportState,
    conn: C,
    remote_description_set: bool,
    pending_ice: Deque<IceCandidate, MAX_PENDING_ICE>,
    answer_sent: bool,
    frames_received: u64,
}

impl<C: PeerConnection> PeerSession<C> {
    pub fn new(id: SessionId, peer_id: &str, conn: C) -> Self {
        Self {
            id,
            peer_id: peer_id.to_owned(),
            state: TransportState::Negotiating,
            conn,
            remote_description_set: false,
            pending_ice: Deque::new(),
            answer_sent: false,
            frames_received: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn pending_ice_len(&self) -> usize {
        self.pending_ice.len()
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    /// The underlying transport connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    // ── Negotiation ───────────────────────────────────────────

    /// Start answering `offer`.
    pub fn begin(&mut self, offer: &SessionDescription) -> Result<(), NegotiationError> {
        if offer.kind != SdpType::Offer {
            return Err(NegotiationError::NotAnOffer(format!("{:?}", offer.kind).to_lowercase()));
        }
        info!("Session {}: negotiating with {}", self.id, self.peer_id);
        self.conn.set_remote_description(offer)
    }

    /// Apply or queue a remote ICE candidate.
    pub fn add_remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        if self.state == TransportState::Closed {
            return Err(NegotiationError::Closed);
        }
        if self.remote_description_set {
            return self.conn.add_ice_candidate(&candidate);
        }
        self.pending_ice
            .push_back(candidate)
            .map_err(|_| NegotiationError::IceQueueFull)?;
        debug!(
            "Session {}: queued remote ICE candidate ({} pending)",
            self.id,
            self.pending_ice.len()
        );
        Ok(())
    }

    /// The vehicle never offers, so a remote answer has nothing to complete.
    pub fn handle_remote_answer(&mut self, answer: &SessionDescription) {
        warn!(
            "Session {}: ignoring {:?} from {} (vehicle is the answering side)",
            self.id, answer.kind, self.peer_id
        );
    }

    // ── Transport completions and data channel ────────────────

    pub fn handle_event(
        &mut self,
        event: PeerEvent,
        mapper: &mut ActuationMapper,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<SessionAction, NegotiationError> {
        if self.state == TransportState::Closed {
            debug!("Session {}: closed, dropping {:?}", self.id, event);
            return Ok(SessionAction::None);
        }

        match event {
            PeerEvent::RemoteDescriptionSet => {
                if self.remote_description_set {
                    warn!("Session {}: duplicate remote description completion", self.id);
                    return Ok(SessionAction::None);
                }
                self.remote_description_set = true;
                let flushed = self.pending_ice.len();
                while let Some(candidate) = self.pending_ice.pop_front() {
                    self.conn.add_ice_candidate(&candidate)?;
                }
                if flushed > 0 {
                    debug!("Session {}: applied {} queued ICE candidates", self.id, flushed);
                }
                self.conn.create_answer()?;
                Ok(SessionAction::None)
            }
            PeerEvent::AnswerCreated(answer) => {
                self.conn.set_local_description(&answer)?;
                Ok(SessionAction::None)
            }
            PeerEvent::LocalDescriptionSet(answer) => {
                if self.answer_sent {
                    return Ok(SessionAction::None);
                }
                self.answer_sent = true;
                Ok(SessionAction::SendAnswer(answer))
            }
            PeerEvent::LocalCandidate(candidate) => Ok(SessionAction::SendCandidate(candidate)),
            PeerEvent::DataChannelOpen { label } => {
                if self.state == TransportState::Negotiating {
                    self.state = TransportState::Connected;
                    info!("Session {}: data channel '{}' open, controller {} connected", self.id, label, self.peer_id);
                    sink.emit(&VehicleEvent::SessionConnected {
                        session: self.id,
                        peer_id: self.peer_id.clone(),
                    });
                } else {
                    debug!("Session {}: additional data channel '{}'", self.id, label);
                }
                Ok(SessionAction::None)
            }
            PeerEvent::Binary(bytes) => {
                if self.state != TransportState::Connected {
                    warn!("Session {}: binary message before data channel open, dropped", self.id);
                    return Ok(SessionAction::None);
                }
                self.frames_received += 1;
                self.apply_frame(&bytes, mapper, hw, sink);
                Ok(SessionAction::None)
            }
            PeerEvent::Text(text) => {
                info!("Session {}: received non-binary message, ignored: {}", self.id, text);
                Ok(SessionAction::None)
            }
            PeerEvent::NegotiationFailed(reason) => Err(NegotiationError::Transport(reason)),
            PeerEvent::Closed => {
                self.close(CloseReason::TransportClosed, mapper, hw, sink);
                Ok(SessionAction::Closed)
            }
        }
    }

    /// Close the transport and halt the vehicle.  Safe to call repeatedly;
    /// only the first call has any effect.
    pub fn close(
        &mut self,
        reason: CloseReason,
        mapper: &mut ActuationMapper,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        if self.state == TransportState::Closed {
            return;
        }
        self.state = TransportState::Closed;
        self.pending_ice.clear();
        self.conn.close();

        match mapper.stop(hw) {
            Ok(cmd) => sink.emit(&VehicleEvent::Stopped(cmd)),
            Err(e) => sink.emit(&VehicleEvent::HardwareFault(e)),
        }

        info!("Session {}: closed ({:?}) after {} frames", self.id, reason, self.frames_received);
        sink.emit(&VehicleEvent::SessionClosed {
            session: self.id,
            peer_id: self.peer_id.clone(),
            reason,
        });
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_frame(
        &mut self,
        bytes: &[u8],
        mapper: &mut ActuationMapper,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let frame = match frame::decode(bytes) {
            Ok(f) => f,
            Err(e) => {
                warn!("Session {}: control frame rejected: {}", self.id, e);
                sink.emit(&VehicleEvent::FrameRejected(e));
                return;
            }
        };
        match mapper.apply(&frame, hw) {
            Ok(command) => sink.emit(&VehicleEvent::Actuated {
                sequence: frame.sequence(),
                command,
            }),
            Err(e) => sink.emit(&VehicleEvent::HardwareFault(e)),
        }
    }
}
