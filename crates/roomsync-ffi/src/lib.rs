//! UniFFI bindings for roomsync-core.
//!
//! Provides a RoomSyncClient object that wraps the SessionController and
//! SettingsStore behind a single FFI-safe interface. The native video SDK,
//! capture devices and video views are supplied by the host as callback
//! interfaces.

use std::sync::Arc;

use roomsync_core::{JoinOptions, NullRenderHost, RenderHost, SessionController, SettingsStore};

mod delegates;
mod errors;
mod method_channel;
mod types;

pub use delegates::{
    ChannelEventSink, MediaDevicesDelegate, RenderHostDelegate, RoomSyncEventListener,
    TransportDelegate,
};
pub use errors::{ChannelError, RoomSyncError};
pub use method_channel::{event_to_json, parse_call, ChannelCall};
pub use types::*;

use delegates::{
    BridgeListener, ChannelBridge, ForeignDevices, ForeignRenderHost, ForeignTransport, HostThread,
};

uniffi::setup_scaffolding!();

// ── Namespace functions ──────────────────────────────────────────────

/// Initialize tracing/logging. Call once from the host before using RoomSyncClient.
#[uniffi::export]
pub fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("roomsync_core=debug,roomsync_ffi=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .try_init();
    });
}

// ── RoomSyncClient: main FFI object ──────────────────────────────────

#[derive(uniffi::Object)]
pub struct RoomSyncClient {
    session: SessionController,
    transport: Arc<ForeignTransport>,
    host: Arc<HostThread>,
    settings: SettingsStore,
    rt: tokio::runtime::Runtime,
}

#[uniffi::export]
impl RoomSyncClient {
    /// `render_host` may be omitted for audio-only or headless hosts.
    #[uniffi::constructor]
    pub fn new(
        data_dir: String,
        transport: Arc<dyn TransportDelegate>,
        devices: Arc<dyn MediaDevicesDelegate>,
        render_host: Option<Arc<dyn RenderHostDelegate>>,
    ) -> Result<Arc<Self>, RoomSyncError> {
        tracing::info!("RoomSyncClient::new() called");
        let rt = tokio::runtime::Runtime::new().map_err(|e| RoomSyncError::Callback {
            msg: format!("failed to create tokio runtime: {e}"),
        })?;
        let host = Arc::new(HostThread::spawn().map_err(|e| RoomSyncError::Callback {
            msg: format!("failed to start host thread: {e}"),
        })?);
        let settings = SettingsStore::new(&data_dir);
        let policy = settings.get().retry.policy();

        let transport = Arc::new(ForeignTransport::new(transport));
        let render_host: Arc<dyn RenderHost> = match render_host {
            Some(host) => Arc::new(ForeignRenderHost(host)),
            None => Arc::new(NullRenderHost),
        };
        let session = SessionController::new(
            transport.clone(),
            Arc::new(ForeignDevices(devices)),
            render_host,
            host.clone(),
            policy,
        );

        Ok(Arc::new(Self {
            session,
            transport,
            host,
            settings,
            rt,
        }))
    }

    pub fn add_listener(&self, listener: Arc<dyn RoomSyncEventListener>) {
        self.session.add_listener(Arc::new(BridgeListener {
            ffi_listener: listener,
            host: self.host.clone(),
        }));
    }

    /// Subscribe a host event channel; events arrive as JSON maps.
    pub fn add_channel_sink(&self, sink: Arc<dyn ChannelEventSink>) {
        self.session.add_listener(Arc::new(ChannelBridge {
            sink,
            host: self.host.clone(),
        }));
    }

    /// Entry point for native SDK callbacks.
    pub fn on_transport_event(&self, event: TransportEvent) {
        self.transport.push(event.into());
    }

    pub fn join_room(
        &self,
        access_token: String,
        room_name: String,
        enable_audio: Option<bool>,
        enable_video: Option<bool>,
        prefer_front_camera: Option<bool>,
    ) -> Result<(), RoomSyncError> {
        let defaults = self.settings.get();
        let options = JoinOptions {
            token: access_token,
            room_name,
            enable_audio: enable_audio.unwrap_or(defaults.audio_enabled_on_join),
            enable_video: enable_video.unwrap_or(defaults.video_enabled_on_join),
            prefer_front_camera: prefer_front_camera.unwrap_or(defaults.prefer_front_camera),
        };
        self.rt
            .block_on(self.session.join(options))
            .map_err(RoomSyncError::from)
    }

    pub fn disconnect(&self) -> Result<(), RoomSyncError> {
        self.rt.block_on(self.session.leave()).map_err(RoomSyncError::from)
    }

    pub fn set_muted(&self, muted: bool) -> Result<(), RoomSyncError> {
        self.rt
            .block_on(self.session.set_muted(muted))
            .map_err(RoomSyncError::from)
    }

    pub fn set_video_enabled(&self, enabled: bool) -> Result<(), RoomSyncError> {
        self.rt
            .block_on(self.session.set_video_enabled(enabled))
            .map_err(RoomSyncError::from)
    }

    pub fn switch_camera(&self) -> Result<(), RoomSyncError> {
        self.rt
            .block_on(self.session.switch_camera())
            .map_err(RoomSyncError::from)
    }

    /// Dispatch a method-channel call by name with JSON arguments.
    pub fn invoke_method(&self, method: String, args_json: String) -> Result<(), ChannelError> {
        let call = parse_call(&method, &args_json, &self.settings.get())?;
        tracing::debug!(method = %method, "channel call");
        let result = self.rt.block_on(async {
            match call {
                ChannelCall::JoinRoom(options) => self.session.join(options).await,
                ChannelCall::Disconnect => self.session.leave().await,
                ChannelCall::SetMuted(muted) => self.session.set_muted(muted).await,
                ChannelCall::SetVideoEnabled(enabled) => self.session.set_video_enabled(enabled).await,
                ChannelCall::SwitchCamera => self.session.switch_camera().await,
            }
        });
        result.map_err(ChannelError::from)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.rt.block_on(self.session.connection_state()).into()
    }

    pub fn participants(&self) -> Vec<ParticipantInfo> {
        self.rt
            .block_on(self.session.participants())
            .into_iter()
            .map(Into::into)
            .collect()
    }

    pub fn room_name(&self) -> Option<String> {
        self.rt.block_on(self.session.room_name())
    }

    /// Render target id for `"0"` (local camera) or a remote participant SID.
    pub fn render_target(&self, id: String) -> Option<u64> {
        self.rt
            .block_on(self.session.render_target(&id))
            .map(|t| t.id())
    }

    pub fn get_settings(&self) -> Settings {
        self.settings.get().into()
    }

    pub fn set_audio_enabled_on_join(&self, enabled: bool) {
        self.settings.set_audio_enabled_on_join(enabled);
    }

    pub fn set_video_enabled_on_join(&self, enabled: bool) {
        self.settings.set_video_enabled_on_join(enabled);
    }

    pub fn set_prefer_front_camera(&self, prefer_front: bool) {
        self.settings.set_prefer_front_camera(prefer_front);
    }

    /// Takes effect for clients created afterwards.
    pub fn set_retry_settings(&self, retry: RetrySettings) {
        self.settings.set_retry(retry.into());
    }
}
