//! Track subscription reconciliation.
//!
//! Turns asynchronous, possibly late or duplicated transport callbacks into
//! one `TrackReady` per deliverable publication and one `TrackRemoved` when it
//! stops being deliverable. The reconciler does no I/O: when it wants a
//! participant rechecked later it returns a [`RetryRequest`] and the session
//! driver arms the timer.

use std::collections::HashMap;
use std::time::Duration;

use crate::events::{EventEmitter, ParticipantInfo, RoomSyncEvent, TrackKind};
use crate::participants::{ParticipantRegistry, Publication, SubscriptionState};
use crate::render::{RenderBindings, RenderTarget};
use crate::transport::{ParticipantSnapshot, PublicationSnapshot};

/// Bounded exponential recheck schedule for publications that exist but are
/// not yet deliverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            backoff_multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Delay before `attempt` (1-based), measured from the previous
    /// evaluation. `None` once the schedule is exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if !self.enabled || attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = self.backoff_multiplier.max(1).saturating_pow(attempt - 1);
        Some(self.initial_delay.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryRequest {
    pub participant_sid: String,
    pub attempt: u32,
    pub delay: Duration,
}

pub struct TrackReconciler {
    registry: ParticipantRegistry,
    bindings: RenderBindings,
    emitter: EventEmitter,
    policy: RetryPolicy,
    polling: bool,
    /// participant SID -> attempt number of the armed recheck
    retries: HashMap<String, u32>,
}

impl TrackReconciler {
    pub fn new(bindings: RenderBindings, emitter: EventEmitter, policy: RetryPolicy) -> Self {
        Self {
            registry: ParticipantRegistry::new(),
            bindings,
            emitter,
            policy,
            polling: true,
            retries: HashMap::new(),
        }
    }

    /// Enable or disable the recheck fallback. Disabled when the transport
    /// reports every subscription completion.
    pub fn set_polling(&mut self, polling: bool) {
        self.polling = polling;
        if !polling {
            self.retries.clear();
        }
    }

    pub fn participants(&self) -> Vec<ParticipantInfo> {
        self.registry.list()
    }

    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    pub fn bindings_mut(&mut self) -> &mut RenderBindings {
        &mut self.bindings
    }

    /// Render target for `"0"` (local) or a remote participant SID.
    pub fn render_target(&self, owner: &str) -> Option<RenderTarget> {
        self.bindings.target(owner, TrackKind::Video)
    }

    /// First sighting of a participant, pre-existing or newly joined.
    pub fn on_participant_observed(&mut self, snapshot: ParticipantSnapshot) -> Option<RetryRequest> {
        let sid = snapshot.info.sid.clone();
        if self.registry.upsert(snapshot.info.clone()) {
            tracing::info!(participant_sid = %sid, "participant joined");
            self.emitter.emit(RoomSyncEvent::ParticipantJoined(snapshot.info));
        }
        for publication in &snapshot.publications {
            self.evaluate(&sid, publication);
        }
        self.schedule_first(&sid)
    }

    pub fn on_publication_announced(
        &mut self,
        participant_sid: &str,
        publication: &PublicationSnapshot,
    ) -> Option<RetryRequest> {
        if !self.registry.contains(participant_sid) {
            tracing::debug!(participant_sid, track_sid = %publication.track_sid, "publication for unknown participant ignored");
            return None;
        }
        self.evaluate(participant_sid, publication);
        self.schedule_first(participant_sid)
    }

    pub fn on_subscribed(&mut self, participant_sid: &str, track_sid: &str, kind: TrackKind) {
        let Some(entry) = self.registry.get_mut(participant_sid) else {
            tracing::debug!(participant_sid, track_sid, "subscription for unknown participant ignored");
            return;
        };
        if entry.publication(track_sid).is_none() {
            entry
                .publications
                .push(Publication::new(track_sid.to_string(), kind, true));
        }
        self.mark_ready(participant_sid, track_sid);
    }

    /// Terminal for the publication: it is dropped whether or not it was
    /// ever ready, and only a ready one is reported removed.
    pub fn on_unsubscribed(&mut self, participant_sid: &str, track_sid: &str) {
        let Some(entry) = self.registry.get_mut(participant_sid) else {
            tracing::debug!(participant_sid, track_sid, "unsubscription for unknown participant ignored");
            return;
        };
        let Some(mut publication) = entry.remove_publication(track_sid) else {
            tracing::debug!(participant_sid, track_sid, "unsubscription of unknown publication ignored");
            return;
        };
        let still_pending = entry.has_pending();
        let was_ready = publication.is_ready();
        publication.state = SubscriptionState::Unsubscribed;
        if was_ready {
            self.release(participant_sid, &publication);
        } else {
            tracing::debug!(participant_sid, track_sid, "unsubscribed before it was ever ready");
        }
        if !still_pending {
            self.retries.remove(participant_sid);
        }
    }

    pub fn on_unpublished(&mut self, participant_sid: &str, track_sid: &str) {
        let Some(entry) = self.registry.get_mut(participant_sid) else {
            return;
        };
        let Some(publication) = entry.remove_publication(track_sid) else {
            return;
        };
        let still_pending = entry.has_pending();
        if publication.is_ready() {
            self.release(participant_sid, &publication);
        }
        if !still_pending {
            self.retries.remove(participant_sid);
        }
    }

    /// Enablement toggle. Disabling detaches the publication's own sink but
    /// keeps the binding so re-enabling reattaches the same track. Tracks
    /// that are not ready yet only record the flag; it travels with their
    /// eventual `TrackReady`.
    pub fn on_enabled_changed(
        &mut self,
        participant_sid: &str,
        publication: &PublicationSnapshot,
        enabled: bool,
    ) -> Option<RetryRequest> {
        let track_sid = publication.track_sid.as_str();
        let Some(entry) = self.registry.get_mut(participant_sid) else {
            tracing::debug!(participant_sid, track_sid, "enablement change for unknown participant ignored");
            return None;
        };
        let Some(current) = entry.publication_mut(track_sid) else {
            tracing::debug!(participant_sid, track_sid, "enablement change for unknown publication ignored");
            return None;
        };
        if current.enabled == enabled {
            return None;
        }
        current.enabled = enabled;
        let ready = current.is_ready();
        let info = current.track_info(participant_sid);

        if !ready {
            if enabled && publication.subscribed {
                self.mark_ready(participant_sid, track_sid);
                return None;
            }
            if let Some(p) = self
                .registry
                .get_mut(participant_sid)
                .and_then(|e| e.publication_mut(track_sid))
            {
                p.state = SubscriptionState::SubscriptionPending;
            }
            return self.schedule_first(participant_sid);
        }

        let is_video = info.kind == TrackKind::Video;
        let (owns_sink, sink_free) = match self.bindings.bound_track(participant_sid, TrackKind::Video) {
            Some(bound) => (is_video && bound == track_sid, false),
            None => (false, true),
        };

        if !enabled {
            if owns_sink {
                self.bindings.detach(participant_sid, TrackKind::Video);
            }
            self.emitter.emit(RoomSyncEvent::TrackDisabled(info));
            return None;
        }

        if owns_sink {
            self.bindings.reattach(participant_sid, TrackKind::Video);
        } else if is_video && sink_free {
            self.bindings.bind(participant_sid, TrackKind::Video, track_sid, true);
        } else if is_video {
            tracing::debug!(participant_sid, track_sid, "render target held by another track, not rebinding");
        }
        self.emitter.emit(RoomSyncEvent::TrackEnabled(info));
        None
    }

    /// Registry removal cascade: every binding goes, every ready track is
    /// reported removed, then the participant is reported gone.
    pub fn on_participant_left(&mut self, participant_sid: &str) {
        self.retries.remove(participant_sid);
        let Some(entry) = self.registry.remove(participant_sid) else {
            tracing::debug!(participant_sid, "leave for unknown participant ignored");
            return;
        };
        self.bindings.unbind_owner(participant_sid);
        for publication in entry.publications.iter().filter(|p| p.is_ready()) {
            self.emitter
                .emit(RoomSyncEvent::TrackRemoved(publication.track_info(participant_sid)));
        }
        tracing::info!(participant_sid, "participant left");
        self.emitter.emit(RoomSyncEvent::ParticipantLeft(entry.info));
    }

    pub fn on_dominant_speaker_changed(&mut self, participant_sid: Option<String>) {
        if let Some(sid) = &participant_sid {
            if !self.registry.contains(sid) {
                tracing::debug!(participant_sid = %sid, "dominant speaker is not a known participant");
                return;
            }
        }
        if self.registry.dominant_speaker() == participant_sid.as_deref() {
            return;
        }
        self.registry.set_dominant_speaker(participant_sid.clone());
        self.emitter
            .emit(RoomSyncEvent::DominantSpeakerChanged { participant_sid });
    }

    /// Whether `request` is still the armed recheck for its participant.
    pub fn wants_retry(&self, request: &RetryRequest) -> bool {
        self.retries.get(&request.participant_sid) == Some(&request.attempt)
    }

    /// A recheck timer fired. `snapshot` is the transport's current view of
    /// the participant.
    pub fn on_retry(
        &mut self,
        request: &RetryRequest,
        snapshot: Option<ParticipantSnapshot>,
    ) -> Option<RetryRequest> {
        if !self.wants_retry(request) {
            tracing::debug!(participant_sid = %request.participant_sid, attempt = request.attempt, "stale recheck ignored");
            return None;
        }
        self.retries.remove(&request.participant_sid);
        let sid = request.participant_sid.as_str();
        let Some(snapshot) = snapshot else {
            tracing::debug!(participant_sid = sid, "participant vanished before recheck");
            return None;
        };
        if !self.registry.contains(sid) {
            return None;
        }

        tracing::debug!(participant_sid = sid, attempt = request.attempt, "rechecking pending publications");
        for publication in &snapshot.publications {
            self.evaluate(sid, publication);
        }
        self.schedule(sid, request.attempt + 1)
    }

    pub fn clear(&mut self) {
        self.registry.clear();
        self.bindings.clear();
        self.retries.clear();
    }

    fn evaluate(&mut self, participant_sid: &str, snapshot: &PublicationSnapshot) {
        let Some(entry) = self.registry.get_mut(participant_sid) else {
            return;
        };
        if entry.publication(&snapshot.track_sid).is_none() {
            entry.publications.push(Publication::new(
                snapshot.track_sid.clone(),
                snapshot.kind,
                snapshot.enabled,
            ));
        }
        let Some(publication) = entry.publication_mut(&snapshot.track_sid) else {
            return;
        };
        if publication.is_ready() {
            return;
        }
        publication.enabled = snapshot.enabled;
        if snapshot.subscribed {
            self.mark_ready(participant_sid, &snapshot.track_sid);
        } else {
            publication.state = SubscriptionState::SubscriptionPending;
            tracing::debug!(participant_sid, track_sid = %snapshot.track_sid, "publication not deliverable yet");
        }
    }

    fn mark_ready(&mut self, participant_sid: &str, track_sid: &str) {
        let Some(entry) = self.registry.get_mut(participant_sid) else {
            return;
        };
        let Some(publication) = entry.publication_mut(track_sid) else {
            return;
        };
        if publication.is_ready() {
            tracing::debug!(participant_sid, track_sid, "track already ready");
            return;
        }
        publication.state = SubscriptionState::Subscribed;
        let info = publication.track_info(participant_sid);
        let settled = !entry.has_pending();

        if info.kind == TrackKind::Video {
            self.bindings
                .bind(participant_sid, TrackKind::Video, track_sid, info.enabled);
        }
        if settled {
            self.retries.remove(participant_sid);
        }
        tracing::info!(participant_sid, track_sid, kind = ?info.kind, "track ready");
        self.emitter.emit(RoomSyncEvent::TrackReady(info));
    }

    fn release(&mut self, participant_sid: &str, publication: &Publication) {
        if publication.kind == TrackKind::Video
            && self.bindings.bound_track(participant_sid, TrackKind::Video)
                == Some(publication.track_sid.as_str())
        {
            self.bindings.unbind(participant_sid, TrackKind::Video);
        }
        tracing::info!(participant_sid, track_sid = %publication.track_sid, "track removed");
        self.emitter
            .emit(RoomSyncEvent::TrackRemoved(publication.track_info(participant_sid)));
    }

    fn schedule_first(&mut self, participant_sid: &str) -> Option<RetryRequest> {
        if self.retries.contains_key(participant_sid) {
            return None;
        }
        self.schedule(participant_sid, 1)
    }

    fn schedule(&mut self, participant_sid: &str, attempt: u32) -> Option<RetryRequest> {
        if !self.polling {
            return None;
        }
        if !self.registry.get(participant_sid)?.has_pending() {
            return None;
        }
        let Some(delay) = self.policy.delay_for(attempt) else {
            tracing::debug!(participant_sid, "recheck schedule exhausted, waiting for subscription signal");
            return None;
        };
        self.retries.insert(participant_sid.to_string(), attempt);
        Some(RetryRequest {
            participant_sid: participant_sid.to_string(),
            attempt,
            delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::InlineDispatcher;
    use crate::test_support::{
        participant_snapshot, video_publication, EventCapture, RecordingRenderHost, RenderCall,
    };
    use std::sync::Arc;

    fn reconciler(policy: RetryPolicy) -> (TrackReconciler, Arc<EventCapture>, Arc<RecordingRenderHost>) {
        let host = Arc::new(RecordingRenderHost::default());
        let capture = Arc::new(EventCapture::default());
        let emitter = EventEmitter::new();
        emitter.add_listener(capture.clone());
        let bindings = RenderBindings::new(host.clone(), Arc::new(InlineDispatcher));
        (TrackReconciler::new(bindings, emitter, policy), capture, host)
    }

    fn ready_count(events: &[RoomSyncEvent]) -> usize {
        events.iter().filter(|e| matches!(e, RoomSyncEvent::TrackReady(_))).count()
    }

    #[test]
    fn policy_delays_grow_and_stop() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_millis(1000)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(2000)));
        assert_eq!(policy.delay_for(4), None);
        assert_eq!(RetryPolicy::disabled().delay_for(1), None);
    }

    #[test]
    fn announce_subscribe_unsubscribe_emits_ready_then_removed_once() {
        let (mut r, capture, _) = reconciler(RetryPolicy::default());
        r.on_participant_observed(participant_snapshot("P1", vec![]));
        capture.clear();

        let pending = video_publication("TR1", false);
        let retry = r.on_publication_announced("P1", &pending);
        assert_eq!(retry.map(|r| r.attempt), Some(1));

        r.on_subscribed("P1", "TR1", TrackKind::Video);
        r.on_subscribed("P1", "TR1", TrackKind::Video);
        r.on_unsubscribed("P1", "TR1");
        r.on_unsubscribed("P1", "TR1");

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], RoomSyncEvent::TrackReady(t) if t.sid == "TR1"));
        assert!(matches!(&events[1], RoomSyncEvent::TrackRemoved(t) if t.sid == "TR1"));
        assert!(r.render_target("P1").is_none());
    }

    #[test]
    fn existing_subscribed_track_is_ready_without_retry() {
        let (mut r, capture, _) = reconciler(RetryPolicy::default());
        let retry = r.on_participant_observed(participant_snapshot(
            "P1",
            vec![video_publication("TR1", true)],
        ));

        assert!(retry.is_none());
        let events = capture.events();
        assert!(matches!(&events[0], RoomSyncEvent::ParticipantJoined(p) if p.sid == "P1"));
        assert!(matches!(&events[1], RoomSyncEvent::TrackReady(t) if t.participant_sid == "P1" && t.kind == TrackKind::Video));
        assert!(r.render_target("P1").is_some());
    }

    #[test]
    fn observing_twice_does_not_duplicate_join_or_ready() {
        let (mut r, capture, _) = reconciler(RetryPolicy::default());
        let snapshot = participant_snapshot("P1", vec![video_publication("TR1", true)]);
        r.on_participant_observed(snapshot.clone());
        r.on_participant_observed(snapshot);
        assert_eq!(capture.events().len(), 2);
    }

    #[test]
    fn disable_then_enable_reattaches_same_track() {
        let (mut r, capture, host) = reconciler(RetryPolicy::default());
        r.on_participant_observed(participant_snapshot("P1", vec![video_publication("TR1", true)]));
        let target = r.render_target("P1").unwrap();
        capture.clear();

        let mut publication = video_publication("TR1", true);
        publication.enabled = false;
        r.on_enabled_changed("P1", &publication, false);
        publication.enabled = true;
        r.on_enabled_changed("P1", &publication, true);

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], RoomSyncEvent::TrackDisabled(t) if !t.enabled));
        assert!(matches!(&events[1], RoomSyncEvent::TrackEnabled(t) if t.enabled));
        assert_eq!(r.render_target("P1"), Some(target));

        let calls = host.calls();
        let tail = &calls[calls.len() - 2..];
        assert_eq!(
            tail,
            &[
                RenderCall::Detach(target, "TR1".into()),
                RenderCall::Attach(target, "TR1".into()),
            ]
        );
    }

    #[test]
    fn repeated_enablement_is_a_noop() {
        let (mut r, capture, _) = reconciler(RetryPolicy::default());
        r.on_participant_observed(participant_snapshot("P1", vec![video_publication("TR1", true)]));
        capture.clear();
        r.on_enabled_changed("P1", &video_publication("TR1", true), true);
        assert!(capture.events().is_empty());
    }

    #[test]
    fn enabling_undelivered_publication_that_is_now_subscribed_becomes_ready() {
        let (mut r, capture, _) = reconciler(RetryPolicy::disabled());
        let mut disabled = video_publication("TR1", false);
        disabled.enabled = false;
        r.on_participant_observed(participant_snapshot("P1", vec![disabled]));
        capture.clear();

        r.on_enabled_changed("P1", &video_publication("TR1", true), true);

        let events = capture.events();
        assert_eq!(ready_count(&events), 1);
        assert!(r.render_target("P1").is_some());
    }

    #[test]
    fn toggling_one_publication_leaves_the_other_bound_track_alone() {
        let (mut r, capture, host) = reconciler(RetryPolicy::default());
        r.on_participant_observed(participant_snapshot(
            "P1",
            vec![video_publication("TR1", true), video_publication("TR2", false)],
        ));
        let target = r.render_target("P1").unwrap();
        capture.clear();
        let calls_before = host.calls().len();

        let mut tr2 = video_publication("TR2", false);
        tr2.enabled = false;
        r.on_enabled_changed("P1", &tr2, false);

        assert_eq!(r.bindings_mut().bound_track("P1", TrackKind::Video), Some("TR1"));
        assert!(r.bindings_mut().is_attached("P1", TrackKind::Video));
        assert_eq!(host.calls().len(), calls_before);
        assert!(capture.events().is_empty());
        assert_eq!(r.render_target("P1"), Some(target));
    }

    #[test]
    fn enabling_a_ready_track_does_not_take_another_tracks_target() {
        let (mut r, capture, _) = reconciler(RetryPolicy::default());
        r.on_participant_observed(participant_snapshot(
            "P1",
            vec![video_publication("TR1", true), video_publication("TR2", true)],
        ));
        assert_eq!(r.bindings_mut().bound_track("P1", TrackKind::Video), Some("TR2"));
        capture.clear();

        let mut tr1 = video_publication("TR1", true);
        tr1.enabled = false;
        r.on_enabled_changed("P1", &tr1, false);
        assert!(r.bindings_mut().is_attached("P1", TrackKind::Video));

        tr1.enabled = true;
        r.on_enabled_changed("P1", &tr1, true);
        assert_eq!(r.bindings_mut().bound_track("P1", TrackKind::Video), Some("TR2"));
        assert!(r.bindings_mut().is_attached("P1", TrackKind::Video));

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], RoomSyncEvent::TrackDisabled(t) if t.sid == "TR1"));
        assert!(matches!(&events[1], RoomSyncEvent::TrackEnabled(t) if t.sid == "TR1"));
    }

    #[test]
    fn unsubscribe_before_ready_is_terminal() {
        let (mut r, capture, _) = reconciler(RetryPolicy::default());
        let first = r
            .on_participant_observed(participant_snapshot("P1", vec![video_publication("TR1", false)]))
            .unwrap();
        capture.clear();

        r.on_unsubscribed("P1", "TR1");

        assert!(!r.wants_retry(&first));
        assert!(r.registry().get("P1").unwrap().publication("TR1").is_none());
        assert!(r
            .on_retry(&first, Some(participant_snapshot("P1", vec![video_publication("TR1", true)])))
            .is_none());
        assert!(capture.events().is_empty());
        assert!(r.render_target("P1").is_none());
    }

    #[test]
    fn unsubscribe_keeps_retry_while_other_tracks_pend() {
        let (mut r, _, _) = reconciler(RetryPolicy::default());
        let first = r
            .on_participant_observed(participant_snapshot(
                "P1",
                vec![video_publication("TR1", false), video_publication("TR2", false)],
            ))
            .unwrap();
        r.on_unsubscribed("P1", "TR1");
        assert!(r.wants_retry(&first));
    }

    #[test]
    fn enablement_of_undelivered_or_unknown_tracks_is_silent() {
        let (mut r, capture, _) = reconciler(RetryPolicy::default());
        r.on_participant_observed(participant_snapshot("P1", vec![video_publication("TR1", false)]));
        capture.clear();

        let mut tr1 = video_publication("TR1", false);
        tr1.enabled = false;
        r.on_enabled_changed("P1", &tr1, false);
        tr1.enabled = true;
        r.on_enabled_changed("P1", &tr1, true);
        r.on_enabled_changed("P1", &video_publication("TR9", false), false);

        assert!(capture.events().is_empty());
        assert!(r.registry().get("P1").unwrap().publication("TR9").is_none());

        r.on_subscribed("P1", "TR1", TrackKind::Video);
        let events = capture.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], RoomSyncEvent::TrackReady(t) if t.sid == "TR1" && t.enabled));
    }

    #[test]
    fn remove_cascades_and_silences_late_callbacks() {
        let (mut r, capture, host) = reconciler(RetryPolicy::default());
        r.on_participant_observed(participant_snapshot("P1", vec![video_publication("TR1", true)]));
        let target = r.render_target("P1").unwrap();
        capture.clear();

        r.on_participant_left("P1");
        let events = capture.events();
        assert!(matches!(&events[0], RoomSyncEvent::TrackRemoved(t) if t.sid == "TR1"));
        assert!(matches!(&events[1], RoomSyncEvent::ParticipantLeft(p) if p.sid == "P1"));
        assert!(host.calls().contains(&RenderCall::Release(target)));
        capture.clear();

        r.on_subscribed("P1", "TR2", TrackKind::Video);
        r.on_unsubscribed("P1", "TR1");
        r.on_enabled_changed("P1", &video_publication("TR1", true), false);
        r.on_publication_announced("P1", &video_publication("TR3", true));
        r.on_participant_left("P1");
        assert!(capture.events().is_empty());
        assert!(r.participants().is_empty());
    }

    #[test]
    fn retry_chain_stops_once_deliverable() {
        let (mut r, capture, _) = reconciler(RetryPolicy::default());
        let first = r
            .on_participant_observed(participant_snapshot("P1", vec![video_publication("TR1", false)]))
            .unwrap();
        assert_eq!(first.delay, Duration::from_millis(500));

        let second = r
            .on_retry(&first, Some(participant_snapshot("P1", vec![video_publication("TR1", false)])))
            .unwrap();
        assert_eq!(second.attempt, 2);
        assert_eq!(second.delay, Duration::from_millis(1000));

        let third = r.on_retry(
            &second,
            Some(participant_snapshot("P1", vec![video_publication("TR1", true)])),
        );
        assert!(third.is_none());
        assert_eq!(ready_count(&capture.events()), 1);
    }

    #[test]
    fn subscription_signal_cancels_armed_retry() {
        let (mut r, _, _) = reconciler(RetryPolicy::default());
        let first = r
            .on_participant_observed(participant_snapshot("P1", vec![video_publication("TR1", false)]))
            .unwrap();
        r.on_subscribed("P1", "TR1", TrackKind::Video);
        assert!(!r.wants_retry(&first));
        assert!(r.on_retry(&first, None).is_none());
    }

    #[test]
    fn retry_schedule_is_bounded() {
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        let (mut r, _, _) = reconciler(policy);
        let pending = || Some(participant_snapshot("P1", vec![video_publication("TR1", false)]));
        let first = r.on_participant_observed(pending().unwrap()).unwrap();
        let second = r.on_retry(&first, pending()).unwrap();
        assert!(r.on_retry(&second, pending()).is_none());
    }

    #[test]
    fn no_retries_when_polling_disabled() {
        let (mut r, _, _) = reconciler(RetryPolicy::default());
        r.set_polling(false);
        assert!(r
            .on_participant_observed(participant_snapshot("P1", vec![video_publication("TR1", false)]))
            .is_none());
    }

    #[test]
    fn unpublish_of_ready_track_reports_removal() {
        let (mut r, capture, _) = reconciler(RetryPolicy::default());
        r.on_participant_observed(participant_snapshot("P1", vec![video_publication("TR1", true)]));
        capture.clear();
        r.on_unpublished("P1", "TR1");
        r.on_unpublished("P1", "TR1");
        let events = capture.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], RoomSyncEvent::TrackRemoved(_)));
    }

    #[test]
    fn dominant_speaker_changes_are_deduplicated() {
        let (mut r, capture, _) = reconciler(RetryPolicy::default());
        r.on_participant_observed(participant_snapshot("P1", vec![]));
        capture.clear();
        r.on_dominant_speaker_changed(Some("P1".into()));
        r.on_dominant_speaker_changed(Some("P1".into()));
        r.on_dominant_speaker_changed(Some("ghost".into()));
        assert_eq!(
            capture.events(),
            vec![RoomSyncEvent::DominantSpeakerChanged {
                participant_sid: Some("P1".into())
            }]
        );
    }
}
