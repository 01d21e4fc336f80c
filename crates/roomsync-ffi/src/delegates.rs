//! Host-implemented interfaces and their adapters onto the core traits.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use roomsync_core::{
    devices::{
        CameraDevice as CoreCameraDevice, DeviceError, LocalTrack as CoreLocalTrack, MediaDevices,
        MediaPermission as CoreMediaPermission,
    },
    events::{RoomSyncEvent as CoreRoomSyncEvent, TrackKind as CoreTrackKind},
    render::{RenderHost, RenderTarget, UiDispatcher},
    transport::{
        ConnectRequest as CoreConnectRequest, ParticipantSnapshot as CoreParticipantSnapshot,
        Transport, TransportCapabilities, TransportError, TransportEvent as CoreTransportEvent,
        TransportEvents,
    },
};
use tokio::sync::mpsc;

use crate::errors::RoomSyncError;
use crate::method_channel::event_to_json;
use crate::types::{
    CameraDevice, ConnectRequest, LocalTrack, MediaPermission, ParticipantSnapshot, RoomSyncEvent,
    TrackKind,
};

// ── Callback interfaces ───────────────────────────────────────────────

/// Native video SDK. Callbacks flow back through
/// `RoomSyncClient::on_transport_event`.
#[uniffi::export(with_foreign)]
pub trait TransportDelegate: Send + Sync {
    fn connect(&self, request: ConnectRequest) -> Result<(), RoomSyncError>;
    fn disconnect(&self);
    /// Current view of a remote participant, used by subscription rechecks.
    fn remote_participant(&self, participant_sid: String) -> Option<ParticipantSnapshot>;
    /// `true` when every subscription completion is reported as
    /// `TrackSubscribed`.
    fn reliable_subscription_signals(&self) -> bool;
}

#[uniffi::export(with_foreign)]
pub trait MediaDevicesDelegate: Send + Sync {
    fn has_permission(&self, permission: MediaPermission) -> bool;
    fn cameras(&self) -> Vec<CameraDevice>;
    fn create_audio_track(&self, enabled: bool) -> Result<LocalTrack, RoomSyncError>;
    fn create_video_track(&self, camera: CameraDevice, enabled: bool) -> Result<LocalTrack, RoomSyncError>;
    fn set_track_enabled(&self, track: LocalTrack, enabled: bool);
    fn switch_camera(&self, track: LocalTrack, camera: CameraDevice) -> Result<(), RoomSyncError>;
    fn release_track(&self, track: LocalTrack);
}

/// Video views owned by the host UI. Calls arrive in order on the client's
/// host thread, never on a runtime worker, so they may call back into
/// `RoomSyncClient`. The host hops to its main thread itself.
#[uniffi::export(with_foreign)]
pub trait RenderHostDelegate: Send + Sync {
    fn create(&self, target_id: u64, owner: String, kind: TrackKind);
    fn attach(&self, target_id: u64, track_sid: String);
    fn detach(&self, target_id: u64, track_sid: String);
    fn release(&self, target_id: u64);
}

/// Events arrive in emission order on the client's host thread and may call
/// back into `RoomSyncClient`.
#[uniffi::export(with_foreign)]
pub trait RoomSyncEventListener: Send + Sync {
    fn on_event(&self, event: RoomSyncEvent);
}

/// Receives events encoded as JSON maps for a host event channel.
#[uniffi::export(with_foreign)]
pub trait ChannelEventSink: Send + Sync {
    fn on_channel_event(&self, payload: String);
}

// ── Host thread ───────────────────────────────────────────────────────

type HostJob = Box<dyn FnOnce() + Send + 'static>;

/// Runs host callbacks one at a time on a dedicated thread, outside the
/// client runtime and after the session lock is released. The thread exits
/// once every handle is dropped.
pub(crate) struct HostThread {
    tx: mpsc::UnboundedSender<HostJob>,
}

impl HostThread {
    pub(crate) fn spawn() -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<HostJob>();
        std::thread::Builder::new()
            .name("roomsync-host".into())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    job();
                }
                tracing::debug!("host thread stopped");
            })?;
        Ok(Self { tx })
    }

    pub(crate) fn submit(&self, job: HostJob) {
        if self.tx.send(job).is_err() {
            tracing::warn!("host thread gone, callback dropped");
        }
    }
}

impl UiDispatcher for HostThread {
    fn run_on_ui(&self, job: HostJob) {
        self.submit(job);
    }
}

// ── Transport adapter ─────────────────────────────────────────────────

pub(crate) struct ForeignTransport {
    delegate: Arc<dyn TransportDelegate>,
    sender: StdMutex<Option<mpsc::UnboundedSender<CoreTransportEvent>>>,
}

impl ForeignTransport {
    pub(crate) fn new(delegate: Arc<dyn TransportDelegate>) -> Self {
        Self {
            delegate,
            sender: StdMutex::new(None),
        }
    }

    /// Forward a host callback into the active session. Returns `false`
    /// when no session is listening.
    pub(crate) fn push(&self, event: CoreTransportEvent) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => {
                tracing::debug!("transport event without an active session dropped");
                false
            }
        }
    }

    fn set_sender(&self, sender: Option<mpsc::UnboundedSender<CoreTransportEvent>>) {
        *self.sender.lock().unwrap_or_else(PoisonError::into_inner) = sender;
    }
}

impl Transport for ForeignTransport {
    fn connect(&self, request: CoreConnectRequest) -> Result<TransportEvents, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Installed before the call so callbacks fired during connect are kept.
        self.set_sender(Some(tx));
        if let Err(e) = self.delegate.connect(request.into()) {
            self.set_sender(None);
            return Err(TransportError(e.detail()));
        }
        Ok(rx)
    }

    fn disconnect(&self) {
        self.set_sender(None);
        self.delegate.disconnect();
    }

    fn remote_participant(&self, participant_sid: &str) -> Option<CoreParticipantSnapshot> {
        self.delegate
            .remote_participant(participant_sid.to_string())
            .map(Into::into)
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            reliable_subscription_signals: self.delegate.reliable_subscription_signals(),
        }
    }
}

// ── Device adapter ────────────────────────────────────────────────────

pub(crate) struct ForeignDevices(pub(crate) Arc<dyn MediaDevicesDelegate>);

impl MediaDevices for ForeignDevices {
    fn has_permission(&self, permission: CoreMediaPermission) -> bool {
        self.0.has_permission(permission.into())
    }

    fn cameras(&self) -> Vec<CoreCameraDevice> {
        self.0.cameras().into_iter().map(Into::into).collect()
    }

    fn create_audio_track(&self, enabled: bool) -> Result<CoreLocalTrack, DeviceError> {
        self.0
            .create_audio_track(enabled)
            .map(Into::into)
            .map_err(|e| DeviceError(e.detail()))
    }

    fn create_video_track(&self, camera: &CoreCameraDevice, enabled: bool) -> Result<CoreLocalTrack, DeviceError> {
        self.0
            .create_video_track(camera.clone().into(), enabled)
            .map(Into::into)
            .map_err(|e| DeviceError(e.detail()))
    }

    fn set_track_enabled(&self, track: &CoreLocalTrack, enabled: bool) {
        self.0.set_track_enabled(track.clone().into(), enabled);
    }

    fn switch_camera(&self, track: &CoreLocalTrack, camera: &CoreCameraDevice) -> Result<(), DeviceError> {
        self.0
            .switch_camera(track.clone().into(), camera.clone().into())
            .map_err(|e| DeviceError(e.detail()))
    }

    fn release_track(&self, track: &CoreLocalTrack) {
        self.0.release_track(track.clone().into());
    }
}

// ── Render adapter ────────────────────────────────────────────────────

pub(crate) struct ForeignRenderHost(pub(crate) Arc<dyn RenderHostDelegate>);

impl RenderHost for ForeignRenderHost {
    fn create(&self, target: RenderTarget, owner: &str, kind: CoreTrackKind) {
        self.0.create(target.id(), owner.to_string(), kind.into());
    }

    fn attach(&self, target: RenderTarget, track_sid: &str) {
        self.0.attach(target.id(), track_sid.to_string());
    }

    fn detach(&self, target: RenderTarget, track_sid: &str) {
        self.0.detach(target.id(), track_sid.to_string());
    }

    fn release(&self, target: RenderTarget) {
        self.0.release(target.id());
    }
}

// ── Bridge listeners: core events → host callbacks ────────────────────

pub(crate) struct BridgeListener {
    pub(crate) ffi_listener: Arc<dyn RoomSyncEventListener>,
    pub(crate) host: Arc<HostThread>,
}

impl roomsync_core::RoomSyncEventListener for BridgeListener {
    fn on_event(&self, event: CoreRoomSyncEvent) {
        let listener = self.ffi_listener.clone();
        self.host
            .submit(Box::new(move || listener.on_event(event.into())));
    }
}

pub(crate) struct ChannelBridge {
    pub(crate) sink: Arc<dyn ChannelEventSink>,
    pub(crate) host: Arc<HostThread>,
}

impl roomsync_core::RoomSyncEventListener for ChannelBridge {
    fn on_event(&self, event: CoreRoomSyncEvent) {
        let sink = self.sink.clone();
        let payload = event_to_json(&event).to_string();
        self.host
            .submit(Box::new(move || sink.on_channel_event(payload)));
    }
}
