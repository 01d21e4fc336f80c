//! FFI-safe mirrors of core types.

use roomsync_core::{
    devices::{
        CameraDevice as CoreCameraDevice, CameraFacing as CoreCameraFacing,
        LocalTrack as CoreLocalTrack, MediaPermission as CoreMediaPermission,
    },
    events::{
        ConnectionState as CoreConnectionState, ParticipantInfo as CoreParticipantInfo,
        RoomSyncEvent as CoreRoomSyncEvent, TrackInfo as CoreTrackInfo, TrackKind as CoreTrackKind,
    },
    settings::{RetrySettings as CoreRetrySettings, Settings as CoreSettings},
    transport::{
        ConnectRequest as CoreConnectRequest, ParticipantSnapshot as CoreParticipantSnapshot,
        PublicationSnapshot as CorePublicationSnapshot, TransportEvent as CoreTransportEvent,
    },
};

// ── Connection and participants ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
    Failed,
}

impl From<CoreConnectionState> for ConnectionState {
    fn from(s: CoreConnectionState) -> Self {
        match s {
            CoreConnectionState::Connecting => Self::Connecting,
            CoreConnectionState::Connected => Self::Connected,
            CoreConnectionState::Reconnecting => Self::Reconnecting,
            CoreConnectionState::Disconnected => Self::Disconnected,
            CoreConnectionState::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum TrackKind {
    Audio,
    Video,
}

impl From<CoreTrackKind> for TrackKind {
    fn from(k: CoreTrackKind) -> Self {
        match k {
            CoreTrackKind::Audio => Self::Audio,
            CoreTrackKind::Video => Self::Video,
        }
    }
}

impl From<TrackKind> for CoreTrackKind {
    fn from(k: TrackKind) -> Self {
        match k {
            TrackKind::Audio => Self::Audio,
            TrackKind::Video => Self::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ParticipantInfo {
    pub sid: String,
    pub identity: String,
    pub name: Option<String>,
}

impl From<CoreParticipantInfo> for ParticipantInfo {
    fn from(p: CoreParticipantInfo) -> Self {
        Self {
            sid: p.sid,
            identity: p.identity,
            name: p.name,
        }
    }
}

impl From<ParticipantInfo> for CoreParticipantInfo {
    fn from(p: ParticipantInfo) -> Self {
        Self {
            sid: p.sid,
            identity: p.identity,
            name: p.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct TrackInfo {
    pub sid: String,
    pub participant_sid: String,
    pub kind: TrackKind,
    pub enabled: bool,
}

impl From<CoreTrackInfo> for TrackInfo {
    fn from(t: CoreTrackInfo) -> Self {
        Self {
            sid: t.sid,
            participant_sid: t.participant_sid,
            kind: t.kind.into(),
            enabled: t.enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum RoomSyncEvent {
    Connected { room_name: String },
    Disconnected { room_name: String },
    ConnectionFailed { message: String },
    Reconnecting { attempt: u32 },
    Reconnected,
    ParticipantJoined { info: ParticipantInfo },
    ParticipantLeft { info: ParticipantInfo },
    TrackReady { info: TrackInfo },
    TrackRemoved { info: TrackInfo },
    TrackEnabled { info: TrackInfo },
    TrackDisabled { info: TrackInfo },
    DominantSpeakerChanged { participant_sid: Option<String> },
    CameraError { message: String },
}

impl From<CoreRoomSyncEvent> for RoomSyncEvent {
    fn from(e: CoreRoomSyncEvent) -> Self {
        match e {
            CoreRoomSyncEvent::Connected { room_name } => Self::Connected { room_name },
            CoreRoomSyncEvent::Disconnected { room_name } => Self::Disconnected { room_name },
            CoreRoomSyncEvent::ConnectionFailed { message } => Self::ConnectionFailed { message },
            CoreRoomSyncEvent::Reconnecting { attempt } => Self::Reconnecting { attempt },
            CoreRoomSyncEvent::Reconnected => Self::Reconnected,
            CoreRoomSyncEvent::ParticipantJoined(p) => Self::ParticipantJoined { info: p.into() },
            CoreRoomSyncEvent::ParticipantLeft(p) => Self::ParticipantLeft { info: p.into() },
            CoreRoomSyncEvent::TrackReady(t) => Self::TrackReady { info: t.into() },
            CoreRoomSyncEvent::TrackRemoved(t) => Self::TrackRemoved { info: t.into() },
            CoreRoomSyncEvent::TrackEnabled(t) => Self::TrackEnabled { info: t.into() },
            CoreRoomSyncEvent::TrackDisabled(t) => Self::TrackDisabled { info: t.into() },
            CoreRoomSyncEvent::DominantSpeakerChanged { participant_sid } => {
                Self::DominantSpeakerChanged { participant_sid }
            }
            CoreRoomSyncEvent::CameraError { message } => Self::CameraError { message },
        }
    }
}

// ── Transport snapshots and events (foreign → core) ───────────────────

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct PublicationSnapshot {
    pub track_sid: String,
    pub kind: TrackKind,
    pub subscribed: bool,
    pub enabled: bool,
}

impl From<PublicationSnapshot> for CorePublicationSnapshot {
    fn from(p: PublicationSnapshot) -> Self {
        Self {
            track_sid: p.track_sid,
            kind: p.kind.into(),
            subscribed: p.subscribed,
            enabled: p.enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ParticipantSnapshot {
    pub info: ParticipantInfo,
    pub publications: Vec<PublicationSnapshot>,
}

impl From<ParticipantSnapshot> for CoreParticipantSnapshot {
    fn from(p: ParticipantSnapshot) -> Self {
        Self {
            info: p.info.into(),
            publications: p.publications.into_iter().map(Into::into).collect(),
        }
    }
}

/// Callbacks of the native video SDK, pushed by the host through
/// `RoomSyncClient::on_transport_event`.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum TransportEvent {
    Connected { room_name: String, participants: Vec<ParticipantSnapshot> },
    ConnectFailure { message: String },
    Disconnected { error: Option<String> },
    Reconnecting { error: Option<String> },
    Reconnected,
    ParticipantConnected { participant: ParticipantSnapshot },
    ParticipantDisconnected { participant_sid: String },
    TrackPublished { participant_sid: String, publication: PublicationSnapshot },
    TrackUnpublished { participant_sid: String, track_sid: String },
    TrackSubscribed { participant_sid: String, track_sid: String, kind: TrackKind },
    TrackUnsubscribed { participant_sid: String, track_sid: String },
    TrackSubscriptionFailed { participant_sid: String, track_sid: String, message: String },
    TrackEnabled { participant_sid: String, publication: PublicationSnapshot },
    TrackDisabled { participant_sid: String, publication: PublicationSnapshot },
    DominantSpeakerChanged { participant_sid: Option<String> },
    CameraError { message: String },
}

impl From<TransportEvent> for CoreTransportEvent {
    fn from(e: TransportEvent) -> Self {
        match e {
            TransportEvent::Connected { room_name, participants } => Self::Connected {
                room_name,
                participants: participants.into_iter().map(Into::into).collect(),
            },
            TransportEvent::ConnectFailure { message } => Self::ConnectFailure { message },
            TransportEvent::Disconnected { error } => Self::Disconnected { error },
            TransportEvent::Reconnecting { error } => Self::Reconnecting { error },
            TransportEvent::Reconnected => Self::Reconnected,
            TransportEvent::ParticipantConnected { participant } => {
                Self::ParticipantConnected(participant.into())
            }
            TransportEvent::ParticipantDisconnected { participant_sid } => {
                Self::ParticipantDisconnected { participant_sid }
            }
            TransportEvent::TrackPublished { participant_sid, publication } => {
                Self::TrackPublished { participant_sid, publication: publication.into() }
            }
            TransportEvent::TrackUnpublished { participant_sid, track_sid } => {
                Self::TrackUnpublished { participant_sid, track_sid }
            }
            TransportEvent::TrackSubscribed { participant_sid, track_sid, kind } => {
                Self::TrackSubscribed { participant_sid, track_sid, kind: kind.into() }
            }
            TransportEvent::TrackUnsubscribed { participant_sid, track_sid } => {
                Self::TrackUnsubscribed { participant_sid, track_sid }
            }
            TransportEvent::TrackSubscriptionFailed { participant_sid, track_sid, message } => {
                Self::TrackSubscriptionFailed { participant_sid, track_sid, message }
            }
            TransportEvent::TrackEnabled { participant_sid, publication } => {
                Self::TrackEnabled { participant_sid, publication: publication.into() }
            }
            TransportEvent::TrackDisabled { participant_sid, publication } => {
                Self::TrackDisabled { participant_sid, publication: publication.into() }
            }
            TransportEvent::DominantSpeakerChanged { participant_sid } => {
                Self::DominantSpeakerChanged { participant_sid }
            }
            TransportEvent::CameraError { message } => Self::CameraError { message },
        }
    }
}

// ── Local media ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct LocalTrack {
    pub name: String,
    pub kind: TrackKind,
}

impl From<CoreLocalTrack> for LocalTrack {
    fn from(t: CoreLocalTrack) -> Self {
        Self {
            name: t.name,
            kind: t.kind.into(),
        }
    }
}

impl From<LocalTrack> for CoreLocalTrack {
    fn from(t: LocalTrack) -> Self {
        Self {
            name: t.name,
            kind: t.kind.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ConnectRequest {
    pub token: String,
    pub room_name: String,
    pub audio_track: Option<LocalTrack>,
    pub video_track: Option<LocalTrack>,
}

impl From<CoreConnectRequest> for ConnectRequest {
    fn from(r: CoreConnectRequest) -> Self {
        Self {
            token: r.token,
            room_name: r.room_name,
            audio_track: r.audio_track.map(Into::into),
            video_track: r.video_track.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum CameraFacing {
    Front,
    Back,
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct CameraDevice {
    pub name: String,
    pub facing: CameraFacing,
}

impl From<CoreCameraDevice> for CameraDevice {
    fn from(c: CoreCameraDevice) -> Self {
        Self {
            name: c.name,
            facing: match c.facing {
                CoreCameraFacing::Front => CameraFacing::Front,
                CoreCameraFacing::Back => CameraFacing::Back,
            },
        }
    }
}

impl From<CameraDevice> for CoreCameraDevice {
    fn from(c: CameraDevice) -> Self {
        Self {
            name: c.name,
            facing: match c.facing {
                CameraFacing::Front => CoreCameraFacing::Front,
                CameraFacing::Back => CoreCameraFacing::Back,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum MediaPermission {
    Camera,
    Microphone,
}

impl From<CoreMediaPermission> for MediaPermission {
    fn from(p: CoreMediaPermission) -> Self {
        match p {
            CoreMediaPermission::Camera => Self::Camera,
            CoreMediaPermission::Microphone => Self::Microphone,
        }
    }
}

// ── Settings ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct RetrySettings {
    pub enabled: bool,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: u32,
}

impl From<CoreRetrySettings> for RetrySettings {
    fn from(r: CoreRetrySettings) -> Self {
        Self {
            enabled: r.enabled,
            max_attempts: r.max_attempts,
            initial_delay_ms: r.initial_delay_ms,
            backoff_multiplier: r.backoff_multiplier,
        }
    }
}

impl From<RetrySettings> for CoreRetrySettings {
    fn from(r: RetrySettings) -> Self {
        Self {
            enabled: r.enabled,
            max_attempts: r.max_attempts,
            initial_delay_ms: r.initial_delay_ms,
            backoff_multiplier: r.backoff_multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct Settings {
    pub audio_enabled_on_join: bool,
    pub video_enabled_on_join: bool,
    pub prefer_front_camera: bool,
    pub retry: RetrySettings,
}

impl From<CoreSettings> for Settings {
    fn from(s: CoreSettings) -> Self {
        Self {
            audio_enabled_on_join: s.audio_enabled_on_join,
            video_enabled_on_join: s.video_enabled_on_join,
            prefer_front_camera: s.prefer_front_camera,
            retry: s.retry.into(),
        }
    }
}
