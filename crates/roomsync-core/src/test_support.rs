//! Fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::devices::{CameraDevice, CameraFacing, DeviceError, LocalTrack, MediaDevices, MediaPermission};
use crate::events::{ParticipantInfo, RoomSyncEvent, RoomSyncEventListener, TrackKind};
use crate::render::{RenderHost, RenderTarget};
use crate::transport::{
    ConnectRequest, ParticipantSnapshot, PublicationSnapshot, Transport, TransportCapabilities,
    TransportError, TransportEvent, TransportEvents,
};

pub fn participant_snapshot(sid: &str, publications: Vec<PublicationSnapshot>) -> ParticipantSnapshot {
    ParticipantSnapshot {
        info: ParticipantInfo {
            sid: sid.to_string(),
            identity: format!("identity-{sid}"),
            name: None,
        },
        publications,
    }
}

pub fn video_publication(track_sid: &str, subscribed: bool) -> PublicationSnapshot {
    PublicationSnapshot {
        track_sid: track_sid.to_string(),
        kind: TrackKind::Video,
        subscribed,
        enabled: true,
    }
}

#[derive(Default)]
pub struct EventCapture {
    events: Mutex<Vec<RoomSyncEvent>>,
}

impl EventCapture {
    pub fn events(&self) -> Vec<RoomSyncEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl RoomSyncEventListener for EventCapture {
    fn on_event(&self, event: RoomSyncEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCall {
    Create(RenderTarget, String),
    Attach(RenderTarget, String),
    Detach(RenderTarget, String),
    Release(RenderTarget),
}

#[derive(Default)]
pub struct RecordingRenderHost {
    calls: Mutex<Vec<RenderCall>>,
}

impl RecordingRenderHost {
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl RenderHost for RecordingRenderHost {
    fn create(&self, target: RenderTarget, owner: &str, _kind: TrackKind) {
        self.calls.lock().unwrap().push(RenderCall::Create(target, owner.to_string()));
    }

    fn attach(&self, target: RenderTarget, track_sid: &str) {
        self.calls.lock().unwrap().push(RenderCall::Attach(target, track_sid.to_string()));
    }

    fn detach(&self, target: RenderTarget, track_sid: &str) {
        self.calls.lock().unwrap().push(RenderCall::Detach(target, track_sid.to_string()));
    }

    fn release(&self, target: RenderTarget) {
        self.calls.lock().unwrap().push(RenderCall::Release(target));
    }
}

#[derive(Default)]
pub struct FakeTransport {
    pub reliable_signals: bool,
    pub connect_error: Mutex<Option<String>>,
    pub connects: Mutex<Vec<ConnectRequest>>,
    pub disconnects: AtomicUsize,
    pub snapshot_queries: AtomicUsize,
    pub participants: Mutex<HashMap<String, ParticipantSnapshot>>,
    pub sender: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
}

impl FakeTransport {
    pub fn send(&self, event: TransportEvent) {
        if let Some(tx) = self.sender.lock().unwrap().as_ref() {
            let _ = tx.send(event);
        }
    }

    pub fn set_participant(&self, snapshot: ParticipantSnapshot) {
        self.participants
            .lock()
            .unwrap()
            .insert(snapshot.info.sid.clone(), snapshot);
    }

    pub fn queries(&self) -> usize {
        self.snapshot_queries.load(Ordering::SeqCst)
    }
}

impl Transport for FakeTransport {
    fn connect(&self, request: ConnectRequest) -> Result<TransportEvents, TransportError> {
        if let Some(message) = self.connect_error.lock().unwrap().clone() {
            return Err(TransportError(message));
        }
        self.connects.lock().unwrap().push(request);
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn remote_participant(&self, participant_sid: &str) -> Option<ParticipantSnapshot> {
        self.snapshot_queries.fetch_add(1, Ordering::SeqCst);
        self.participants.lock().unwrap().get(participant_sid).cloned()
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            reliable_subscription_signals: self.reliable_signals,
        }
    }
}

pub struct FakeDevices {
    pub camera_permission: bool,
    pub microphone_permission: bool,
    pub cameras: Vec<CameraDevice>,
    pub switch_error: Mutex<Option<String>>,
    pub enabled_calls: Mutex<Vec<(String, bool)>>,
    pub switched_to: Mutex<Vec<String>>,
    pub released: Mutex<Vec<String>>,
}

impl Default for FakeDevices {
    fn default() -> Self {
        Self {
            camera_permission: true,
            microphone_permission: true,
            cameras: vec![
                CameraDevice {
                    name: "front-0".into(),
                    facing: CameraFacing::Front,
                },
                CameraDevice {
                    name: "back-0".into(),
                    facing: CameraFacing::Back,
                },
            ],
            switch_error: Mutex::new(None),
            enabled_calls: Mutex::new(Vec::new()),
            switched_to: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
        }
    }
}

impl MediaDevices for FakeDevices {
    fn has_permission(&self, permission: MediaPermission) -> bool {
        match permission {
            MediaPermission::Camera => self.camera_permission,
            MediaPermission::Microphone => self.microphone_permission,
        }
    }

    fn cameras(&self) -> Vec<CameraDevice> {
        self.cameras.clone()
    }

    fn create_audio_track(&self, _enabled: bool) -> Result<LocalTrack, DeviceError> {
        Ok(LocalTrack {
            name: crate::devices::LOCAL_AUDIO_TRACK_NAME.into(),
            kind: TrackKind::Audio,
        })
    }

    fn create_video_track(&self, _camera: &CameraDevice, _enabled: bool) -> Result<LocalTrack, DeviceError> {
        Ok(LocalTrack {
            name: crate::devices::LOCAL_VIDEO_TRACK_NAME.into(),
            kind: TrackKind::Video,
        })
    }

    fn set_track_enabled(&self, track: &LocalTrack, enabled: bool) {
        self.enabled_calls
            .lock()
            .unwrap()
            .push((track.name.clone(), enabled));
    }

    fn switch_camera(&self, _track: &LocalTrack, camera: &CameraDevice) -> Result<(), DeviceError> {
        if let Some(message) = self.switch_error.lock().unwrap().clone() {
            return Err(DeviceError(message));
        }
        self.switched_to.lock().unwrap().push(camera.name.clone());
        Ok(())
    }

    fn release_track(&self, track: &LocalTrack) {
        self.released.lock().unwrap().push(track.name.clone());
    }
}
