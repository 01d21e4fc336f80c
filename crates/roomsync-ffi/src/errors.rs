use roomsync_core::RoomSyncError as CoreRoomSyncError;

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum RoomSyncError {
    #[error("Invalid arguments: {msg}")]
    InvalidArguments { msg: String },
    #[error("Permission denied: {msg}")]
    PermissionDenied { msg: String },
    #[error("Device unavailable: {msg}")]
    DeviceUnavailable { msg: String },
    #[error("Transport failure: {msg}")]
    TransportFailure { msg: String },
    #[error("No active session")]
    NotInitialized,
    /// A host callback failed in a way its signature does not describe.
    #[error("Callback error: {msg}")]
    Callback { msg: String },
}

impl RoomSyncError {
    /// Human-readable detail without the variant prefix.
    pub(crate) fn detail(&self) -> String {
        match self {
            Self::InvalidArguments { msg }
            | Self::PermissionDenied { msg }
            | Self::DeviceUnavailable { msg }
            | Self::TransportFailure { msg }
            | Self::Callback { msg } => msg.clone(),
            Self::NotInitialized => self.to_string(),
        }
    }
}

impl From<CoreRoomSyncError> for RoomSyncError {
    fn from(e: CoreRoomSyncError) -> Self {
        tracing::error!("RoomSyncError: {e}");
        match e {
            CoreRoomSyncError::InvalidArguments(msg) => Self::InvalidArguments { msg },
            CoreRoomSyncError::PermissionDenied(msg) => Self::PermissionDenied { msg },
            CoreRoomSyncError::DeviceUnavailable(msg) => Self::DeviceUnavailable { msg },
            CoreRoomSyncError::TransportFailure(msg) => Self::TransportFailure { msg },
            CoreRoomSyncError::NotInitialized => Self::NotInitialized,
        }
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for RoomSyncError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Callback { msg: e.reason }
    }
}

/// Error returned over the method channel: a stable code plus a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, uniffi::Error)]
pub enum ChannelError {
    #[error("{code}: {message}")]
    Failed { code: String, message: String },
}

impl ChannelError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self::Failed {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Failed { code, .. } => code,
        }
    }
}

impl From<CoreRoomSyncError> for ChannelError {
    fn from(e: CoreRoomSyncError) -> Self {
        tracing::warn!(code = e.code(), "method failed: {e}");
        let message = match &e {
            CoreRoomSyncError::InvalidArguments(msg)
            | CoreRoomSyncError::PermissionDenied(msg)
            | CoreRoomSyncError::DeviceUnavailable(msg)
            | CoreRoomSyncError::TransportFailure(msg) => msg.clone(),
            CoreRoomSyncError::NotInitialized => e.to_string(),
        };
        Self::new(e.code(), message)
    }
}
