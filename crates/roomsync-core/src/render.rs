//! Render target bookkeeping.
//!
//! A render target is an opaque sink owned by the host UI (a video view on
//! mobile). The core only tracks which track is bound to which target and
//! whether frames are currently flowing into it. All calls into the host are
//! submitted through a [`UiDispatcher`] and never block the caller.

use std::collections::HashMap;
use std::sync::Arc;

use crate::events::TrackKind;

/// Render key of the local participant.
pub const LOCAL_PARTICIPANT_KEY: &str = "0";

/// Opaque handle to a host sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTarget {
    id: u64,
}

impl RenderTarget {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Host-side sink operations. Called on the UI context only.
pub trait RenderHost: Send + Sync {
    /// A new target was allocated for `owner` (participant SID or `"0"`).
    fn create(&self, target: RenderTarget, owner: &str, kind: TrackKind);
    fn attach(&self, target: RenderTarget, track_sid: &str);
    fn detach(&self, target: RenderTarget, track_sid: &str);
    fn release(&self, target: RenderTarget);
}

/// Runs a job on whatever context owns UI updates. Fire-and-forget.
pub trait UiDispatcher: Send + Sync {
    fn run_on_ui(&self, job: Box<dyn FnOnce() + Send + 'static>);
}

/// Runs jobs on the calling thread.
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn run_on_ui(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        job();
    }
}

/// Render host that ignores every call. Useful for headless sessions.
pub struct NullRenderHost;

impl RenderHost for NullRenderHost {
    fn create(&self, _target: RenderTarget, _owner: &str, _kind: TrackKind) {}
    fn attach(&self, _target: RenderTarget, _track_sid: &str) {}
    fn detach(&self, _target: RenderTarget, _track_sid: &str) {}
    fn release(&self, _target: RenderTarget) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// A fresh target was allocated.
    Created(RenderTarget),
    /// The existing target now shows a different track.
    Rebound(RenderTarget),
    /// The target already showed this track.
    Unchanged(RenderTarget),
}

impl BindOutcome {
    pub fn target(&self) -> RenderTarget {
        match self {
            Self::Created(t) | Self::Rebound(t) | Self::Unchanged(t) => *t,
        }
    }
}

#[derive(Debug, Clone)]
struct Binding {
    target: RenderTarget,
    track_sid: String,
    attached: bool,
}

/// At most one binding per (owner, kind).
pub struct RenderBindings {
    host: Arc<dyn RenderHost>,
    ui: Arc<dyn UiDispatcher>,
    bindings: HashMap<(String, TrackKind), Binding>,
    next_id: u64,
}

impl RenderBindings {
    pub fn new(host: Arc<dyn RenderHost>, ui: Arc<dyn UiDispatcher>) -> Self {
        Self {
            host,
            ui,
            bindings: HashMap::new(),
            next_id: 1,
        }
    }

    /// Bind `track_sid` to the (owner, kind) target, creating it if needed.
    ///
    /// A different track already bound there is detached first. When
    /// `attach` is false the binding is recorded without starting frames.
    pub fn bind(&mut self, owner: &str, kind: TrackKind, track_sid: &str, attach: bool) -> BindOutcome {
        let key = (owner.to_string(), kind);
        if let Some(binding) = self.bindings.get_mut(&key) {
            let target = binding.target;
            if binding.track_sid == track_sid {
                if attach && !binding.attached {
                    binding.attached = true;
                    submit_attach(&self.ui, &self.host, target, track_sid);
                }
                return BindOutcome::Unchanged(target);
            }

            if binding.attached {
                submit_detach(&self.ui, &self.host, target, &binding.track_sid);
            }
            tracing::debug!(owner, old = %binding.track_sid, new = track_sid, "rebinding render target");
            binding.track_sid = track_sid.to_string();
            binding.attached = attach;
            if attach {
                submit_attach(&self.ui, &self.host, target, track_sid);
            }
            return BindOutcome::Rebound(target);
        }

        let target = RenderTarget { id: self.next_id };
        self.next_id += 1;

        let host = self.host.clone();
        let owner_key = owner.to_string();
        self.ui.run_on_ui(Box::new(move || host.create(target, &owner_key, kind)));
        if attach {
            submit_attach(&self.ui, &self.host, target, track_sid);
        }

        self.bindings.insert(
            key,
            Binding {
                target,
                track_sid: track_sid.to_string(),
                attached: attach,
            },
        );
        BindOutcome::Created(target)
    }

    /// Stop frames into the target but keep the binding. Returns `true` if
    /// the sink was attached before the call.
    pub fn detach(&mut self, owner: &str, kind: TrackKind) -> bool {
        let Some(binding) = self.bindings.get_mut(&(owner.to_string(), kind)) else {
            return false;
        };
        if !binding.attached {
            return false;
        }
        binding.attached = false;
        submit_detach(&self.ui, &self.host, binding.target, &binding.track_sid);
        true
    }

    /// Resume frames into an existing binding. Returns the target when a
    /// binding exists, whether or not it was detached.
    pub fn reattach(&mut self, owner: &str, kind: TrackKind) -> Option<RenderTarget> {
        let binding = self.bindings.get_mut(&(owner.to_string(), kind))?;
        if !binding.attached {
            binding.attached = true;
            submit_attach(&self.ui, &self.host, binding.target, &binding.track_sid);
        }
        Some(binding.target)
    }

    /// Remove the binding, detaching and releasing the target. Idempotent.
    pub fn unbind(&mut self, owner: &str, kind: TrackKind) -> Option<RenderTarget> {
        let binding = self.bindings.remove(&(owner.to_string(), kind))?;
        self.release_binding(binding)
    }

    /// Remove every binding owned by `owner`.
    pub fn unbind_owner(&mut self, owner: &str) -> usize {
        let keys: Vec<_> = self
            .bindings
            .keys()
            .filter(|(o, _)| o == owner)
            .cloned()
            .collect();
        let count = keys.len();
        for key in keys {
            if let Some(binding) = self.bindings.remove(&key) {
                self.release_binding(binding);
            }
        }
        count
    }

    pub fn target(&self, owner: &str, kind: TrackKind) -> Option<RenderTarget> {
        self.bindings.get(&(owner.to_string(), kind)).map(|b| b.target)
    }

    pub fn bound_track(&self, owner: &str, kind: TrackKind) -> Option<&str> {
        self.bindings
            .get(&(owner.to_string(), kind))
            .map(|b| b.track_sid.as_str())
    }

    pub fn is_attached(&self, owner: &str, kind: TrackKind) -> bool {
        self.bindings
            .get(&(owner.to_string(), kind))
            .is_some_and(|b| b.attached)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&mut self) {
        let drained: Vec<Binding> = self.bindings.drain().map(|(_, b)| b).collect();
        for binding in drained {
            self.release_binding(binding);
        }
    }

    fn release_binding(&self, binding: Binding) -> Option<RenderTarget> {
        if binding.attached {
            submit_detach(&self.ui, &self.host, binding.target, &binding.track_sid);
        }
        let host = self.host.clone();
        let target = binding.target;
        self.ui.run_on_ui(Box::new(move || host.release(target)));
        Some(target)
    }
}

fn submit_attach(ui: &Arc<dyn UiDispatcher>, host: &Arc<dyn RenderHost>, target: RenderTarget, track_sid: &str) {
    let host = host.clone();
    let track_sid = track_sid.to_string();
    ui.run_on_ui(Box::new(move || host.attach(target, &track_sid)));
}

fn submit_detach(ui: &Arc<dyn UiDispatcher>, host: &Arc<dyn RenderHost>, target: RenderTarget, track_sid: &str) {
    let host = host.clone();
    let track_sid = track_sid.to_string();
    ui.run_on_ui(Box::new(move || host.detach(target, &track_sid)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingRenderHost, RenderCall};

    fn bindings() -> (RenderBindings, Arc<RecordingRenderHost>) {
        let host = Arc::new(RecordingRenderHost::default());
        (RenderBindings::new(host.clone(), Arc::new(InlineDispatcher)), host)
    }

    #[test]
    fn bind_creates_then_reuses_target() {
        let (mut b, host) = bindings();
        let first = b.bind("p1", TrackKind::Video, "TR1", true);
        let second = b.bind("p1", TrackKind::Video, "TR1", true);

        assert!(matches!(first, BindOutcome::Created(_)));
        assert_eq!(second, BindOutcome::Unchanged(first.target()));
        assert_eq!(
            host.calls(),
            vec![
                RenderCall::Create(first.target(), "p1".into()),
                RenderCall::Attach(first.target(), "TR1".into()),
            ]
        );
    }

    #[test]
    fn rebinding_detaches_previous_track_first() {
        let (mut b, host) = bindings();
        let target = b.bind("p1", TrackKind::Video, "TR1", true).target();
        let outcome = b.bind("p1", TrackKind::Video, "TR2", true);

        assert_eq!(outcome, BindOutcome::Rebound(target));
        assert_eq!(b.bound_track("p1", TrackKind::Video), Some("TR2"));
        let calls = host.calls();
        assert_eq!(
            &calls[2..],
            &[
                RenderCall::Detach(target, "TR1".into()),
                RenderCall::Attach(target, "TR2".into()),
            ]
        );
    }

    #[test]
    fn detach_keeps_binding_and_reattach_restores_it() {
        let (mut b, _host) = bindings();
        let target = b.bind("0", TrackKind::Video, "local", true).target();

        assert!(b.detach("0", TrackKind::Video));
        assert!(!b.detach("0", TrackKind::Video));
        assert_eq!(b.target("0", TrackKind::Video), Some(target));
        assert!(!b.is_attached("0", TrackKind::Video));

        assert_eq!(b.reattach("0", TrackKind::Video), Some(target));
        assert!(b.is_attached("0", TrackKind::Video));
    }

    #[test]
    fn unbind_is_idempotent() {
        let (mut b, host) = bindings();
        let target = b.bind("p1", TrackKind::Video, "TR1", true).target();

        assert_eq!(b.unbind("p1", TrackKind::Video), Some(target));
        assert_eq!(b.unbind("p1", TrackKind::Video), None);
        assert!(host.calls().contains(&RenderCall::Release(target)));
    }

    #[test]
    fn unbind_owner_only_touches_that_owner() {
        let (mut b, _host) = bindings();
        b.bind("p1", TrackKind::Video, "TR1", true);
        b.bind("p2", TrackKind::Video, "TR2", true);

        assert_eq!(b.unbind_owner("p1"), 1);
        assert!(b.target("p1", TrackKind::Video).is_none());
        assert!(b.target("p2", TrackKind::Video).is_some());
    }
}
