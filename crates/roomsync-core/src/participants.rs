use crate::events::{ParticipantInfo, TrackInfo, TrackKind};

/// Subscription lifecycle of a single publication.
///
/// `Published` and `SubscriptionPending` mean the track exists but cannot be
/// delivered yet. Only `Subscribed` publications are ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Published,
    SubscriptionPending,
    Subscribed,
    Unsubscribed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub track_sid: String,
    pub kind: TrackKind,
    pub state: SubscriptionState,
    pub enabled: bool,
}

impl Publication {
    pub fn new(track_sid: String, kind: TrackKind, enabled: bool) -> Self {
        Self {
            track_sid,
            kind,
            state: SubscriptionState::Published,
            enabled,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == SubscriptionState::Subscribed
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            self.state,
            SubscriptionState::Published | SubscriptionState::SubscriptionPending
        )
    }

    pub fn track_info(&self, participant_sid: &str) -> TrackInfo {
        TrackInfo {
            sid: self.track_sid.clone(),
            participant_sid: participant_sid.to_string(),
            kind: self.kind,
            enabled: self.enabled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParticipantEntry {
    pub info: ParticipantInfo,
    pub publications: Vec<Publication>,
}

impl ParticipantEntry {
    pub fn publication(&self, track_sid: &str) -> Option<&Publication> {
        self.publications.iter().find(|p| p.track_sid == track_sid)
    }

    pub fn publication_mut(&mut self, track_sid: &str) -> Option<&mut Publication> {
        self.publications.iter_mut().find(|p| p.track_sid == track_sid)
    }

    pub fn has_pending(&self) -> bool {
        self.publications.iter().any(Publication::is_pending)
    }

    pub fn remove_publication(&mut self, track_sid: &str) -> Option<Publication> {
        let idx = self.publications.iter().position(|p| p.track_sid == track_sid)?;
        Some(self.publications.remove(idx))
    }
}

/// Registry of remote participants in the active session.
///
/// Mutated only from the serialized session context. Keeps join order so
/// snapshots are stable for the UI.
#[derive(Debug, Clone, Default)]
pub struct ParticipantRegistry {
    participants: Vec<ParticipantEntry>,
    dominant_speaker: Option<String>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a participant. Returns `true` when it was not known.
    ///
    /// Refreshing only updates metadata; publications are left untouched.
    pub fn upsert(&mut self, info: ParticipantInfo) -> bool {
        match self.get_mut(&info.sid) {
            Some(entry) => {
                entry.info = info;
                false
            }
            None => {
                self.participants.push(ParticipantEntry {
                    info,
                    publications: Vec::new(),
                });
                true
            }
        }
    }

    pub fn remove(&mut self, sid: &str) -> Option<ParticipantEntry> {
        let idx = self.participants.iter().position(|p| p.info.sid == sid)?;
        if self.dominant_speaker.as_deref() == Some(sid) {
            self.dominant_speaker = None;
        }
        Some(self.participants.remove(idx))
    }

    pub fn list(&self) -> Vec<ParticipantInfo> {
        self.participants.iter().map(|p| p.info.clone()).collect()
    }

    pub fn get(&self, sid: &str) -> Option<&ParticipantEntry> {
        self.participants.iter().find(|p| p.info.sid == sid)
    }

    pub fn get_mut(&mut self, sid: &str) -> Option<&mut ParticipantEntry> {
        self.participants.iter_mut().find(|p| p.info.sid == sid)
    }

    pub fn contains(&self, sid: &str) -> bool {
        self.get(sid).is_some()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn set_dominant_speaker(&mut self, sid: Option<String>) {
        self.dominant_speaker = sid;
    }

    pub fn dominant_speaker(&self) -> Option<&str> {
        self.dominant_speaker.as_deref()
    }

    pub fn clear(&mut self) {
        self.participants.clear();
        self.dominant_speaker = None;
    }
}
