//! String-keyed method calls and JSON event maps for hosts that talk to the
//! core over a method/event channel pair.

use roomsync_core::{JoinOptions, ParticipantInfo, RoomSyncEvent, Settings, TrackInfo, TrackKind};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::ChannelError;

const INVALID_ARGUMENTS: &str = "INVALID_ARGUMENTS";
const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    JoinRoom(JoinOptions),
    Disconnect,
    SetMuted(bool),
    SetVideoEnabled(bool),
    SwitchCamera,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct JoinRoomArgs {
    access_token: Option<String>,
    room_name: Option<String>,
    enable_audio: Option<bool>,
    enable_video: Option<bool>,
    enable_front_camera: Option<bool>,
}

#[derive(Deserialize, Default)]
struct ToggleArgs {
    muted: Option<bool>,
    enabled: Option<bool>,
}

/// Decode a method call. Omitted join flags fall back to `settings`.
pub fn parse_call(method: &str, args_json: &str, settings: &Settings) -> Result<ChannelCall, ChannelError> {
    match method {
        "joinRoom" => {
            let args: JoinRoomArgs = decode_args(args_json)?;
            let (Some(token), Some(room_name)) = (args.access_token, args.room_name) else {
                return Err(ChannelError::new(
                    INVALID_ARGUMENTS,
                    "Access token and room name are required",
                ));
            };
            Ok(ChannelCall::JoinRoom(JoinOptions {
                token,
                room_name,
                enable_audio: args.enable_audio.unwrap_or(settings.audio_enabled_on_join),
                enable_video: args.enable_video.unwrap_or(settings.video_enabled_on_join),
                prefer_front_camera: args
                    .enable_front_camera
                    .unwrap_or(settings.prefer_front_camera),
            }))
        }
        "disconnect" => Ok(ChannelCall::Disconnect),
        "setMuted" => {
            let args: ToggleArgs = decode_args(args_json)?;
            args.muted
                .map(ChannelCall::SetMuted)
                .ok_or_else(|| ChannelError::new(INVALID_ARGUMENTS, "Muted parameter is required"))
        }
        "setVideoEnabled" => {
            let args: ToggleArgs = decode_args(args_json)?;
            args.enabled
                .map(ChannelCall::SetVideoEnabled)
                .ok_or_else(|| ChannelError::new(INVALID_ARGUMENTS, "Enabled parameter is required"))
        }
        "switchCamera" => Ok(ChannelCall::SwitchCamera),
        other => {
            tracing::debug!(method = other, "unknown channel method");
            Err(ChannelError::new(NOT_IMPLEMENTED, format!("Method {other} is not implemented")))
        }
    }
}

fn decode_args<T: for<'de> Deserialize<'de> + Default>(args_json: &str) -> Result<T, ChannelError> {
    let trimmed = args_json.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(T::default());
    }
    serde_json::from_str(trimmed)
        .map_err(|e| ChannelError::new(INVALID_ARGUMENTS, format!("Malformed arguments: {e}")))
}

/// Encode an event as a channel map keyed by `"event"`.
pub fn event_to_json(event: &RoomSyncEvent) -> Value {
    match event {
        RoomSyncEvent::Connected { room_name } => {
            json!({ "event": "connected", "roomName": room_name })
        }
        RoomSyncEvent::Disconnected { room_name } => {
            json!({ "event": "disconnected", "roomName": room_name })
        }
        RoomSyncEvent::ConnectionFailed { message } => {
            json!({ "event": "connectionFailure", "error": message })
        }
        RoomSyncEvent::Reconnecting { attempt } => {
            json!({ "event": "reconnecting", "attempt": attempt })
        }
        RoomSyncEvent::Reconnected => json!({ "event": "reconnected" }),
        RoomSyncEvent::ParticipantJoined(p) => {
            json!({ "event": "participantConnected", "participant": participant_json(p) })
        }
        RoomSyncEvent::ParticipantLeft(p) => {
            json!({ "event": "participantDisconnected", "participant": participant_json(p) })
        }
        RoomSyncEvent::TrackReady(t) => track_event("trackReady", t),
        RoomSyncEvent::TrackRemoved(t) => track_event("trackRemoved", t),
        RoomSyncEvent::TrackEnabled(t) => track_event("trackEnabled", t),
        RoomSyncEvent::TrackDisabled(t) => track_event("trackDisabled", t),
        RoomSyncEvent::DominantSpeakerChanged { participant_sid } => {
            json!({ "event": "dominantSpeakerChanged", "participantSid": participant_sid })
        }
        RoomSyncEvent::CameraError { message } => json!({ "event": "error", "error": message }),
    }
}

fn participant_json(p: &ParticipantInfo) -> Value {
    json!({ "sid": p.sid, "identity": p.identity, "name": p.name })
}

fn track_event(name: &str, t: &TrackInfo) -> Value {
    let kind = match t.kind {
        TrackKind::Audio => "audio",
        TrackKind::Video => "video",
    };
    json!({
        "event": name,
        "track": {
            "trackSid": t.sid,
            "participantSid": t.participant_sid,
            "kind": kind,
            "isEnabled": t.enabled,
        },
    })
}
