//! Signaling room protocol payloads.
//!
//! Inbound events arrive as `(name, JSON payload)` pairs and are parsed
//! into [`InboundSignal`]; outbound events are built by the `*_payload`
//! helpers.  Both the plain and the `gamepad-` prefixed names are accepted
//! for offers, answers and ICE candidates.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SignalingError;

// ── Event names ───────────────────────────────────────────────

pub const EVENT_JOIN_ROOM: &str = "join-room";
pub const EVENT_JOINED_ROOM: &str = "joined-room";
pub const EVENT_USER_JOINED: &str = "user-joined";
pub const EVENT_USER_LEFT: &str = "user-left";
pub const EVENT_OFFER: &str = "offer";
pub const EVENT_GAMEPAD_OFFER: &str = "gamepad-offer";
pub const EVENT_ANSWER: &str = "answer";
pub const EVENT_GAMEPAD_ANSWER: &str = "gamepad-answer";
pub const EVENT_ICE_CANDIDATE: &str = "ice-candidate";
pub const EVENT_GAMEPAD_ICE_CANDIDATE: &str = "gamepad-ice-candidate";
pub const EVENT_MESSAGE: &str = "message";
pub const EVENT_ERROR: &str = "error";

// ── Shared descriptors ────────────────────────────────────────

/// Role announced when joining a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Car,
}

/// Who this vehicle is on the signaling server.  Re-sent on every
/// (re)connect because the server keeps no state across connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingIdentity {
    pub room_id: String,
    pub display_name: String,
    pub role: Role,
}

impl SignalingIdentity {
    pub fn car(room_id: &str, display_name: &str) -> Self {
        Self {
            room_id: room_id.to_owned(),
            display_name: display_name.to_owned(),
            role: Role::Car,
        }
    }
}

/// SDP kind.  The vehicle only ever receives offers and sends answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }
}

/// One ICE network path descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_mline_index: Option<u16>,
}

// ── Inbound payloads ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default = "anonymous")]
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

fn anonymous() -> String {
    "Anonymous".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    pub id: String,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedRoom {
    pub room_id: String,
    #[serde(default)]
    pub users: Vec<RoomMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJoined {
    pub user_id: String,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLeft {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOffer {
    pub from_user_id: String,
    pub offer: SessionDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAnswer {
    pub from_user_id: String,
    pub answer: SessionDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCandidate {
    pub from_user_id: String,
    pub candidate: IceCandidate,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub from_user_id: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerError {
    #[serde(default = "unknown_error")]
    pub message: String,
}

fn unknown_error() -> String {
    "Unknown error".into()
}

/// Every inbound event the vehicle understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundSignal {
    JoinedRoom(JoinedRoom),
    UserJoined(UserJoined),
    UserLeft(UserLeft),
    Offer(RemoteOffer),
    Answer(RemoteAnswer),
    IceCandidate(RemoteCandidate),
    Message(ChatMessage),
    Error(ServerError),
}

impl InboundSignal {
    /// Parse a named event.  Unknown names and schema mismatches are
    /// reported, never panicked on.
    pub fn parse(name: &str, payload: Value) -> Result<Self, SignalingError> {
        match name {
            EVENT_JOINED_ROOM => payload_as(name, payload).map(Self::JoinedRoom),
            EVENT_USER_JOINED => payload_as(name, payload).map(Self::UserJoined),
            EVENT_USER_LEFT => payload_as(name, payload).map(Self::UserLeft),
            EVENT_OFFER | EVENT_GAMEPAD_OFFER => payload_as(name, payload).map(Self::Offer),
            EVENT_ANSWER | EVENT_GAMEPAD_ANSWER => payload_as(name, payload).map(Self::Answer),
            EVENT_ICE_CANDIDATE | EVENT_GAMEPAD_ICE_CANDIDATE => {
                payload_as(name, payload).map(Self::IceCandidate)
            }
            EVENT_MESSAGE => payload_as(name, payload).map(Self::Message),
            EVENT_ERROR => payload_as(name, payload).map(Self::Error),
            other => Err(SignalingError::UnknownEvent(other.to_owned())),
        }
    }
}

fn payload_as<T: DeserializeOwned>(name: &str, payload: Value) -> Result<T, SignalingError> {
    serde_json::from_value(payload).map_err(|e| SignalingError::Malformed {
        event: name.to_owned(),
        reason: e.to_string(),
    })
}

// ── Outbound payloads ─────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinRoom<'a> {
    room_id: &'a str,
    user_info: OutboundUserInfo<'a>,
}

#[derive(Serialize)]
struct OutboundUserInfo<'a> {
    name: &'a str,
    role: Role,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerOut<'a> {
    target_user_id: &'a str,
    answer: &'a SessionDescription,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CandidateOut<'a> {
    target_user_id: &'a str,
    candidate: &'a IceCandidate,
}

/// `join-room {roomId, userInfo:{name, role}}`
pub fn join_room_payload(identity: &SignalingIdentity) -> Value {
    to_value(&JoinRoom {
        room_id: &identity.room_id,
        user_info: OutboundUserInfo {
            name: &identity.display_name,
            role: identity.role,
        },
    })
}

/// `gamepad-answer {targetUserId, answer:{type, sdp}}`
pub fn answer_payload(target: &str, answer: &SessionDescription) -> Value {
    to_value(&AnswerOut {
        target_user_id: target,
        answer,
    })
}

/// `gamepad-ice-candidate {targetUserId, candidate:{candidate, sdpMid, sdpMLineIndex}}`
pub fn candidate_payload(target: &str, candidate: &IceCandidate) -> Value {
    to_value(&CandidateOut {
        target_user_id: target,
        candidate,
    })
}

// Plain structs with string/integer fields always serialise.
fn to_value<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}
