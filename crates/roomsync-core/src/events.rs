use std::sync::Arc;

/// Events emitted by the core to host listeners.
///
/// Each state transition maps to exactly one variant; enablement changes
/// have their own variants instead of reusing the readiness event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomSyncEvent {
    Connected { room_name: String },
    Disconnected { room_name: String },
    ConnectionFailed { message: String },
    Reconnecting { attempt: u32 },
    Reconnected,
    ParticipantJoined(ParticipantInfo),
    ParticipantLeft(ParticipantInfo),
    TrackReady(TrackInfo),
    TrackRemoved(TrackInfo),
    TrackEnabled(TrackInfo),
    TrackDisabled(TrackInfo),
    DominantSpeakerChanged { participant_sid: Option<String> },
    CameraError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub sid: String,
    pub identity: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub sid: String,
    pub participant_sid: String,
    pub kind: TrackKind,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Trait for receiving events from the core.
/// Implementations must be Send + Sync (called from tokio tasks).
pub trait RoomSyncEventListener: Send + Sync {
    fn on_event(&self, event: RoomSyncEvent);
}

/// Internal event emitter that dispatches to registered listeners.
///
/// Dispatch is synchronous: listeners observe events in the order `emit`
/// was called.
#[derive(Clone)]
pub struct EventEmitter {
    listeners: Arc<std::sync::RwLock<Vec<Arc<dyn RoomSyncEventListener>>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(std::sync::RwLock::new(Vec::new())),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn RoomSyncEventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(listener);
    }

    pub fn emit(&self, event: RoomSyncEvent) {
        tracing::debug!(?event, "emit");
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for listener in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        count: Arc<AtomicUsize>,
    }

    impl RoomSyncEventListener for CountingListener {
        fn on_event(&self, _event: RoomSyncEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn emitter_dispatches_to_multiple_listeners() {
        let emitter = EventEmitter::new();
        let count1 = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::new(AtomicUsize::new(0));

        emitter.add_listener(Arc::new(CountingListener { count: count1.clone() }));
        emitter.add_listener(Arc::new(CountingListener { count: count2.clone() }));

        emitter.emit(RoomSyncEvent::Reconnected);

        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
    }

    struct EventCapture {
        events: Arc<std::sync::Mutex<Vec<RoomSyncEvent>>>,
    }

    impl RoomSyncEventListener for EventCapture {
        fn on_event(&self, event: RoomSyncEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn emitter_preserves_emit_order() {
        let emitter = EventEmitter::new();
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        emitter.add_listener(Arc::new(EventCapture { events: events.clone() }));

        emitter.emit(RoomSyncEvent::Connected { room_name: "A".into() });
        emitter.emit(RoomSyncEvent::Reconnecting { attempt: 1 });
        emitter.emit(RoomSyncEvent::Reconnected);

        let captured = events.lock().unwrap();
        assert_eq!(
            *captured,
            vec![
                RoomSyncEvent::Connected { room_name: "A".into() },
                RoomSyncEvent::Reconnecting { attempt: 1 },
                RoomSyncEvent::Reconnected,
            ]
        );
    }
}
