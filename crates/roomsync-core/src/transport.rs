//! Seam to the real-time video transport.
//!
//! The transport owns signalling, media and reconnection. It reports what it
//! knows through [`TransportEvent`]s on an unbounded channel handed back from
//! [`Transport::connect`], and answers point-in-time participant queries used
//! by the recheck fallback.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::devices::LocalTrack;
use crate::errors::RoomSyncError;
use crate::events::{ParticipantInfo, TrackKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<TransportError> for RoomSyncError {
    fn from(e: TransportError) -> Self {
        RoomSyncError::TransportFailure(e.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub token: String,
    pub room_name: String,
    pub audio_track: Option<LocalTrack>,
    pub video_track: Option<LocalTrack>,
}

/// What the transport currently knows about one publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationSnapshot {
    pub track_sid: String,
    pub kind: TrackKind,
    /// The track is deliverable (media can be attached right now).
    pub subscribed: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSnapshot {
    pub info: ParticipantInfo,
    pub publications: Vec<PublicationSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected {
        room_name: String,
        participants: Vec<ParticipantSnapshot>,
    },
    ConnectFailure {
        message: String,
    },
    Disconnected {
        error: Option<String>,
    },
    Reconnecting {
        error: Option<String>,
    },
    Reconnected,
    ParticipantConnected(ParticipantSnapshot),
    ParticipantDisconnected {
        participant_sid: String,
    },
    TrackPublished {
        participant_sid: String,
        publication: PublicationSnapshot,
    },
    TrackUnpublished {
        participant_sid: String,
        track_sid: String,
    },
    TrackSubscribed {
        participant_sid: String,
        track_sid: String,
        kind: TrackKind,
    },
    TrackUnsubscribed {
        participant_sid: String,
        track_sid: String,
    },
    TrackSubscriptionFailed {
        participant_sid: String,
        track_sid: String,
        message: String,
    },
    TrackEnabled {
        participant_sid: String,
        publication: PublicationSnapshot,
    },
    TrackDisabled {
        participant_sid: String,
        publication: PublicationSnapshot,
    },
    DominantSpeakerChanged {
        participant_sid: Option<String>,
    },
    CameraError {
        message: String,
    },
}

pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportCapabilities {
    /// Every subscription completes with a `TrackSubscribed` event, so the
    /// recheck fallback is never needed.
    pub reliable_subscription_signals: bool,
}

pub trait Transport: Send + Sync {
    /// Start connecting. Progress and failures after this call arrive as
    /// events on the returned receiver.
    fn connect(&self, request: ConnectRequest) -> Result<TransportEvents, TransportError>;

    fn disconnect(&self);

    /// Current view of a remote participant, or `None` if it is gone.
    fn remote_participant(&self, participant_sid: &str) -> Option<ParticipantSnapshot>;

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::default()
    }
}
