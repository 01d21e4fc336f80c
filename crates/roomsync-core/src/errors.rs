use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomSyncError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("no active session")]
    NotInitialized,
}

impl RoomSyncError {
    /// Stable error code reported over the host method channel.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArguments(_) => "INVALID_ARGUMENTS",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::DeviceUnavailable(_) => "NO_CAMERA",
            Self::TransportFailure(_) => "TRANSPORT_ERROR",
            Self::NotInitialized => "NOT_INITIALIZED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(RoomSyncError::InvalidArguments("x".into()).code(), "INVALID_ARGUMENTS");
        assert_eq!(RoomSyncError::DeviceUnavailable("x".into()).code(), "NO_CAMERA");
        assert_eq!(RoomSyncError::NotInitialized.code(), "NOT_INITIALIZED");
    }

    #[test]
    fn display_includes_detail() {
        let e = RoomSyncError::PermissionDenied("camera".into());
        assert_eq!(e.to_string(), "permission denied: camera");
    }
}
