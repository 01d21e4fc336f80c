use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use uuid::Uuid;

use crate::devices::{
    select_camera, select_switch_target, CameraDevice, CameraFacing, LocalTrack, MediaDevices, MediaPermission,
};
use crate::errors::RoomSyncError;
use crate::events::{
    ConnectionState, EventEmitter, ParticipantInfo, RoomSyncEvent, RoomSyncEventListener, TrackKind,
};
use crate::reconciler::{RetryPolicy, RetryRequest, TrackReconciler};
use crate::render::{RenderBindings, RenderHost, RenderTarget, UiDispatcher, LOCAL_PARTICIPANT_KEY};
use crate::transport::{ConnectRequest, Transport, TransportEvent, TransportEvents};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOptions {
    pub token: String,
    pub room_name: String,
    pub enable_audio: bool,
    pub enable_video: bool,
    pub prefer_front_camera: bool,
}

struct LocalMedia {
    audio_track: Option<LocalTrack>,
    video_track: Option<LocalTrack>,
    camera: Option<CameraDevice>,
}

struct ActiveSession {
    id: Uuid,
    room_name: String,
    reconnect_attempt: u32,
    audio_track: Option<LocalTrack>,
    video_track: Option<LocalTrack>,
    camera: Option<CameraDevice>,
    cancel_tx: watch::Sender<bool>,
}

struct SessionState {
    session: Option<ActiveSession>,
    connection_state: ConnectionState,
    /// Bumped on every join and teardown; inputs tagged with an older value
    /// belong to a session that no longer exists.
    generation: u64,
    reconciler: TrackReconciler,
}

struct Shared {
    transport: Arc<dyn Transport>,
    devices: Arc<dyn MediaDevices>,
    emitter: EventEmitter,
    state: Mutex<SessionState>,
}

/// Owns the single active session.
///
/// Every registry mutation and reconciliation decision runs under one
/// state lock, whether it comes from a host command, a transport callback
/// or a recheck timer. Events are emitted while that lock is held.
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(
        transport: Arc<dyn Transport>,
        devices: Arc<dyn MediaDevices>,
        render_host: Arc<dyn RenderHost>,
        ui: Arc<dyn UiDispatcher>,
        policy: RetryPolicy,
    ) -> Self {
        let emitter = EventEmitter::new();
        let reconciler = TrackReconciler::new(
            RenderBindings::new(render_host, ui),
            emitter.clone(),
            policy,
        );
        Self {
            shared: Arc::new(Shared {
                transport,
                devices,
                emitter,
                state: Mutex::new(SessionState {
                    session: None,
                    connection_state: ConnectionState::Disconnected,
                    generation: 0,
                    reconciler,
                }),
            }),
        }
    }

    /// Register a listener for session events.
    pub fn add_listener(&self, listener: Arc<dyn RoomSyncEventListener>) {
        self.shared.emitter.add_listener(listener);
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.shared.state.lock().await.connection_state
    }

    /// Snapshot of remote participants in join order.
    pub async fn participants(&self) -> Vec<ParticipantInfo> {
        self.shared.state.lock().await.reconciler.participants()
    }

    pub async fn room_name(&self) -> Option<String> {
        let state = self.shared.state.lock().await;
        state.session.as_ref().map(|s| s.room_name.clone())
    }

    /// Render target for `"0"` (local camera) or a remote participant SID.
    pub async fn render_target(&self, id: &str) -> Option<RenderTarget> {
        self.shared.state.lock().await.reconciler.render_target(id)
    }

    /// Create local tracks and start connecting to `room_name`.
    ///
    /// Returns once the transport accepted the request; the outcome arrives
    /// as a `Connected` or `ConnectionFailed` event. An existing session is
    /// left first.
    pub async fn join(&self, options: JoinOptions) -> Result<(), RoomSyncError> {
        if options.token.trim().is_empty() || options.room_name.trim().is_empty() {
            return Err(RoomSyncError::InvalidArguments(
                "access token and room name are required".into(),
            ));
        }

        let shared = &self.shared;
        let mut guard = shared.state.lock().await;
        let state = &mut *guard;

        if state.session.is_some() {
            tracing::warn!("join requested while in a session, leaving previous room");
            shared.transport.disconnect();
            if let Some(room_name) = shared.teardown(state, ConnectionState::Disconnected) {
                shared.emitter.emit(RoomSyncEvent::Disconnected { room_name });
            }
        }

        let media = shared.create_local_media(&options)?;
        let request = ConnectRequest {
            token: options.token.clone(),
            room_name: options.room_name.clone(),
            audio_track: media.audio_track.clone(),
            video_track: media.video_track.clone(),
        };
        let events = match shared.transport.connect(request) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!("connect failed: {e}");
                shared.release_tracks(media.audio_track.as_ref(), media.video_track.as_ref());
                return Err(e.into());
            }
        };

        let reliable = shared.transport.capabilities().reliable_subscription_signals;
        state.reconciler.set_polling(!reliable);
        if let Some(track) = &media.video_track {
            state
                .reconciler
                .bindings_mut()
                .bind(LOCAL_PARTICIPANT_KEY, TrackKind::Video, &track.name, true);
        }

        state.generation += 1;
        let generation = state.generation;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let id = Uuid::new_v4();
        tracing::info!(
            session_id = %id,
            room = %options.room_name,
            audio = options.enable_audio,
            video = options.enable_video,
            "joining room"
        );
        state.session = Some(ActiveSession {
            id,
            room_name: options.room_name,
            reconnect_attempt: 0,
            audio_track: media.audio_track,
            video_track: media.video_track,
            camera: media.camera,
            cancel_tx,
        });
        state.connection_state = ConnectionState::Connecting;
        drop(guard);

        tokio::spawn(event_loop(shared.clone(), generation, events, cancel_rx));
        Ok(())
    }

    /// Disconnect and drop all session state.
    pub async fn leave(&self) -> Result<(), RoomSyncError> {
        let shared = &self.shared;
        let mut guard = shared.state.lock().await;
        let state = &mut *guard;
        if state.session.is_none() {
            return Err(RoomSyncError::NotInitialized);
        }
        shared.transport.disconnect();
        if let Some(room_name) = shared.teardown(state, ConnectionState::Disconnected) {
            shared.emitter.emit(RoomSyncEvent::Disconnected { room_name });
        }
        Ok(())
    }

    pub async fn set_muted(&self, muted: bool) -> Result<(), RoomSyncError> {
        let state = self.shared.state.lock().await;
        let session = state.session.as_ref().ok_or(RoomSyncError::NotInitialized)?;
        if let Some(track) = &session.audio_track {
            self.shared.devices.set_track_enabled(track, !muted);
        }
        tracing::info!("microphone muted: {muted}");
        Ok(())
    }

    /// Toggle the local camera track. The local render target survives the
    /// toggle; only its sink is detached while disabled.
    pub async fn set_video_enabled(&self, enabled: bool) -> Result<(), RoomSyncError> {
        let mut guard = self.shared.state.lock().await;
        let state = &mut *guard;
        let session = state.session.as_ref().ok_or(RoomSyncError::NotInitialized)?;
        if let Some(track) = &session.video_track {
            self.shared.devices.set_track_enabled(track, enabled);
            let bindings = state.reconciler.bindings_mut();
            if enabled {
                bindings.reattach(LOCAL_PARTICIPANT_KEY, TrackKind::Video);
            } else {
                bindings.detach(LOCAL_PARTICIPANT_KEY, TrackKind::Video);
            }
        }
        tracing::info!("camera enabled: {enabled}");
        Ok(())
    }

    /// Switch the local capture to the camera facing the other way.
    pub async fn switch_camera(&self) -> Result<(), RoomSyncError> {
        let mut state = self.shared.state.lock().await;
        let session = state.session.as_mut().ok_or(RoomSyncError::NotInitialized)?;
        let (Some(track), Some(current)) = (session.video_track.as_ref(), session.camera.as_ref()) else {
            return Err(RoomSyncError::NotInitialized);
        };

        let next = select_switch_target(&self.shared.devices.cameras(), current)
            .ok_or_else(|| RoomSyncError::DeviceUnavailable("no camera available for switching".into()))?;

        self.shared.devices.switch_camera(track, &next).map_err(|e| {
            tracing::warn!("camera switch failed: {e}");
            RoomSyncError::from(e)
        })?;
        tracing::info!(device = %next.name, "switched camera");
        session.camera = Some(next);
        Ok(())
    }
}

impl Shared {
    fn create_local_media(&self, options: &JoinOptions) -> Result<LocalMedia, RoomSyncError> {
        let camera = if options.enable_video {
            if !self.devices.has_permission(MediaPermission::Camera) {
                return Err(RoomSyncError::PermissionDenied("camera permission not granted".into()));
            }
            let facing = CameraFacing::from_prefer_front(options.prefer_front_camera);
            let camera = select_camera(&self.devices.cameras(), facing)
                .ok_or_else(|| RoomSyncError::DeviceUnavailable("no camera device available".into()))?;
            Some(camera)
        } else {
            None
        };

        if options.enable_audio && !self.devices.has_permission(MediaPermission::Microphone) {
            return Err(RoomSyncError::PermissionDenied("microphone permission not granted".into()));
        }

        let video_track = match &camera {
            Some(camera) => Some(self.devices.create_video_track(camera, true)?),
            None => None,
        };
        let audio_track = if options.enable_audio {
            match self.devices.create_audio_track(true) {
                Ok(track) => Some(track),
                Err(e) => {
                    self.release_tracks(None, video_track.as_ref());
                    return Err(e.into());
                }
            }
        } else {
            None
        };

        Ok(LocalMedia {
            audio_track,
            video_track,
            camera,
        })
    }

    fn release_tracks(&self, audio: Option<&LocalTrack>, video: Option<&LocalTrack>) {
        for track in audio.into_iter().chain(video) {
            self.devices.release_track(track);
        }
    }

    /// End the active session. Stops timers and the event loop, releases
    /// local tracks and clears the registry and bindings.
    fn teardown(&self, state: &mut SessionState, final_state: ConnectionState) -> Option<String> {
        let session = state.session.take()?;
        let _ = session.cancel_tx.send(true);
        self.release_tracks(session.audio_track.as_ref(), session.video_track.as_ref());
        state.reconciler.clear();
        state.connection_state = final_state;
        state.generation += 1;
        tracing::info!(session_id = %session.id, room = %session.room_name, state = ?final_state, "session ended");
        Some(session.room_name)
    }

    /// Apply one transport event. Returns `false` when the loop should stop.
    async fn handle_transport_event(
        &self,
        generation: u64,
        event: TransportEvent,
        timers: &RetryTimers,
    ) -> bool {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if state.generation != generation {
            tracing::debug!("dropping transport event for ended session");
            return false;
        }
        let Some(session) = state.session.as_mut() else {
            return false;
        };
        let reconciler = &mut state.reconciler;

        match event {
            TransportEvent::Connected { room_name, participants } => {
                let room_name = if room_name.is_empty() {
                    session.room_name.clone()
                } else {
                    room_name
                };
                session.reconnect_attempt = 0;
                tracing::info!(session_id = %session.id, room = %room_name, remote = participants.len(), "connected");
                state.connection_state = ConnectionState::Connected;
                self.emitter.emit(RoomSyncEvent::Connected { room_name });
                for participant in participants {
                    timers.arm(reconciler.on_participant_observed(participant));
                }
            }

            TransportEvent::ConnectFailure { message } => {
                tracing::warn!("failed to connect: {message}");
                self.teardown(state, ConnectionState::Failed);
                self.emitter.emit(RoomSyncEvent::ConnectionFailed { message });
                return false;
            }

            TransportEvent::Disconnected { error } => {
                if let Some(error) = &error {
                    tracing::warn!("room disconnected with error: {error}");
                }
                if let Some(room_name) = self.teardown(state, ConnectionState::Disconnected) {
                    self.emitter.emit(RoomSyncEvent::Disconnected { room_name });
                }
                return false;
            }

            TransportEvent::Reconnecting { error } => {
                session.reconnect_attempt += 1;
                let attempt = session.reconnect_attempt;
                tracing::info!(attempt, "reconnecting: {}", error.as_deref().unwrap_or("unknown"));
                state.connection_state = ConnectionState::Reconnecting;
                self.emitter.emit(RoomSyncEvent::Reconnecting { attempt });
            }

            TransportEvent::Reconnected => {
                session.reconnect_attempt = 0;
                state.connection_state = ConnectionState::Connected;
                self.emitter.emit(RoomSyncEvent::Reconnected);
            }

            TransportEvent::ParticipantConnected(participant) => {
                timers.arm(reconciler.on_participant_observed(participant));
            }

            TransportEvent::ParticipantDisconnected { participant_sid } => {
                reconciler.on_participant_left(&participant_sid);
            }

            TransportEvent::TrackPublished { participant_sid, publication } => {
                timers.arm(reconciler.on_publication_announced(&participant_sid, &publication));
            }

            TransportEvent::TrackUnpublished { participant_sid, track_sid } => {
                reconciler.on_unpublished(&participant_sid, &track_sid);
            }

            TransportEvent::TrackSubscribed { participant_sid, track_sid, kind } => {
                reconciler.on_subscribed(&participant_sid, &track_sid, kind);
            }

            TransportEvent::TrackUnsubscribed { participant_sid, track_sid } => {
                reconciler.on_unsubscribed(&participant_sid, &track_sid);
            }

            TransportEvent::TrackSubscriptionFailed { participant_sid, track_sid, message } => {
                tracing::warn!(participant_sid = %participant_sid, track_sid = %track_sid, "subscription failed: {message}");
            }

            TransportEvent::TrackEnabled { participant_sid, publication } => {
                timers.arm(reconciler.on_enabled_changed(&participant_sid, &publication, true));
            }

            TransportEvent::TrackDisabled { participant_sid, publication } => {
                timers.arm(reconciler.on_enabled_changed(&participant_sid, &publication, false));
            }

            TransportEvent::DominantSpeakerChanged { participant_sid } => {
                reconciler.on_dominant_speaker_changed(participant_sid);
            }

            TransportEvent::CameraError { message } => {
                tracing::warn!("camera error: {message}");
                self.emitter.emit(RoomSyncEvent::CameraError { message });
            }
        }
        true
    }

    async fn handle_retry(&self, generation: u64, request: RetryRequest, timers: &RetryTimers) {
        let mut state = self.state.lock().await;
        if state.generation != generation || state.session.is_none() {
            return;
        }
        if !state.reconciler.wants_retry(&request) {
            tracing::debug!(participant_sid = %request.participant_sid, "recheck no longer needed");
            return;
        }
        let snapshot = self.transport.remote_participant(&request.participant_sid);
        timers.arm(state.reconciler.on_retry(&request, snapshot));
    }
}

/// Arms recheck timers that feed back into the session event loop.
struct RetryTimers {
    tx: mpsc::UnboundedSender<RetryRequest>,
    cancel: watch::Receiver<bool>,
}

impl RetryTimers {
    fn arm(&self, request: Option<RetryRequest>) {
        let Some(request) = request else {
            return;
        };
        tracing::debug!(
            participant_sid = %request.participant_sid,
            attempt = request.attempt,
            delay_ms = request.delay.as_millis() as u64,
            "recheck armed"
        );
        let tx = self.tx.clone();
        let mut cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(request.delay) => {
                    let _ = tx.send(request);
                }
                _ = cancel.changed() => {}
            }
        });
    }
}

async fn event_loop(
    shared: Arc<Shared>,
    generation: u64,
    mut events: TransportEvents,
    mut cancel: watch::Receiver<bool>,
) {
    let (retry_tx, mut retry_rx) = mpsc::unbounded_channel();
    let timers = RetryTimers {
        tx: retry_tx,
        cancel: cancel.clone(),
    };

    loop {
        tokio::select! {
            _ = cancel.changed() => break,
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::info!("transport event stream closed");
                    break;
                };
                if !shared.handle_transport_event(generation, event, &timers).await {
                    break;
                }
            }
            Some(request) = retry_rx.recv() => {
                shared.handle_retry(generation, request, &timers).await;
            }
        }
    }

    tracing::info!("session event loop ended");
}
