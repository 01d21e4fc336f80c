use thiserror::Error;

use crate::errors::RoomSyncError;
use crate::events::TrackKind;

pub const LOCAL_AUDIO_TRACK_NAME: &str = "local-audio-track";
pub const LOCAL_VIDEO_TRACK_NAME: &str = "local-video-track";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DeviceError(pub String);

impl From<DeviceError> for RoomSyncError {
    fn from(e: DeviceError) -> Self {
        RoomSyncError::TransportFailure(e.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPermission {
    Camera,
    Microphone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    Front,
    Back,
}

impl CameraFacing {
    pub fn from_prefer_front(prefer_front: bool) -> Self {
        if prefer_front { Self::Front } else { Self::Back }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    pub facing: CameraFacing,
}

/// Handle to a local capture track created by the device layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    pub name: String,
    pub kind: TrackKind,
}

/// Local capture devices and the tracks built on them.
pub trait MediaDevices: Send + Sync {
    fn has_permission(&self, permission: MediaPermission) -> bool;
    fn cameras(&self) -> Vec<CameraDevice>;
    fn create_audio_track(&self, enabled: bool) -> Result<LocalTrack, DeviceError>;
    fn create_video_track(&self, camera: &CameraDevice, enabled: bool) -> Result<LocalTrack, DeviceError>;
    fn set_track_enabled(&self, track: &LocalTrack, enabled: bool);
    fn switch_camera(&self, track: &LocalTrack, camera: &CameraDevice) -> Result<(), DeviceError>;
    fn release_track(&self, track: &LocalTrack);
}

/// Pick the first camera with the requested facing, falling back to the
/// first camera of any facing.
pub fn select_camera(cameras: &[CameraDevice], facing: CameraFacing) -> Option<CameraDevice> {
    let found = cameras
        .iter()
        .find(|c| c.facing == facing)
        .or_else(|| cameras.first())
        .cloned();
    match &found {
        Some(c) if c.facing != facing => {
            tracing::debug!(device = %c.name, "no {facing:?} camera, using fallback device");
        }
        Some(c) => tracing::debug!(device = %c.name, "selected {facing:?} camera"),
        None => tracing::debug!("no camera devices available"),
    }
    found
}

/// Camera to switch to from `current`: another device facing the other way
/// if there is one, otherwise any other device.
pub fn select_switch_target(cameras: &[CameraDevice], current: &CameraDevice) -> Option<CameraDevice> {
    let facing = current.facing.opposite();
    let found = cameras
        .iter()
        .find(|c| c.name != current.name && c.facing == facing)
        .or_else(|| cameras.iter().find(|c| c.name != current.name))
        .cloned();
    if let Some(c) = &found {
        tracing::debug!(from = %current.name, to = %c.name, "selected camera to switch to");
    }
    found
}
