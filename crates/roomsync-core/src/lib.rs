//! RoomSync core session logic.
//!
//! Pure Rust crate with no platform dependencies. The video transport,
//! capture devices and render sinks are injected through traits; native
//! shells consume it via the UniFFI bindings in `roomsync-ffi`.

pub mod devices;
pub mod errors;
pub mod events;
pub mod participants;
pub mod reconciler;
pub mod render;
pub mod session;
pub mod settings;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use devices::{CameraDevice, CameraFacing, DeviceError, LocalTrack, MediaDevices, MediaPermission};
pub use errors::RoomSyncError;
pub use events::{
    ConnectionState, ParticipantInfo, RoomSyncEvent, RoomSyncEventListener, TrackInfo, TrackKind,
};
pub use reconciler::RetryPolicy;
pub use render::{InlineDispatcher, NullRenderHost, RenderHost, RenderTarget, UiDispatcher};
pub use session::{JoinOptions, SessionController};
pub use settings::{RetrySettings, Settings, SettingsStore};
pub use transport::{
    ConnectRequest, ParticipantSnapshot, PublicationSnapshot, Transport, TransportCapabilities,
    TransportError, TransportEvent, TransportEvents,
};
