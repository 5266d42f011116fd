//! Animation engine
//!
//! Ticks every registered top-level timeline each frame and tells the host
//! render loop when continuous redraws are needed.

use crate::animation::AnimationOptions;
use crate::config::EngineConfig;
use crate::timeline::{StateListenerId, TimelineHandle, TimelineKey, TimelineOptions, TimelineStatus};
use cadence_core::{FrameTickId, RenderLoop};
use slotmap::{new_key_type, SlotMap};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

new_key_type! {
    struct RegistrationId;
}

struct Registration {
    timeline: TimelineHandle,
    /// `None` until the timeline can be borrowed to attach the listener
    listener: Option<StateListenerId>,
    /// Last reported "playing, not complete, not synced"
    active: bool,
}

struct HostBinding {
    host: Rc<dyn RenderLoop>,
    tick: FrameTickId,
}

struct EngineInner {
    config: EngineConfig,
    timelines: RefCell<SlotMap<RegistrationId, Registration>>,
    /// Listeners to remove from timelines that were busy at unregister time
    stale_listeners: RefCell<Vec<(TimelineHandle, StateListenerId)>>,
    /// Set while a listener attach or removal is outstanding
    unsettled: Cell<bool>,
    redraw: Cell<bool>,
    host: RefCell<Option<HostBinding>>,
}

impl EngineInner {
    fn find(&self, key: TimelineKey) -> Option<RegistrationId> {
        self.timelines
            .borrow()
            .iter()
            .find(|(_, registration)| registration.timeline.key() == key)
            .map(|(id, _)| id)
    }

    fn update(self: &Rc<Self>, delta_time: f64) {
        self.settle();

        // Timeline callbacks may register or unregister, so tick from a snapshot
        let timelines: Vec<(RegistrationId, TimelineHandle)> = self
            .timelines
            .borrow()
            .iter()
            .map(|(id, registration)| (id, registration.timeline.clone()))
            .collect();

        for (id, timeline) in timelines {
            if !self.timelines.borrow().contains_key(id) {
                continue;
            }

            {
                let mut timeline = timeline.borrow_mut();
                if timeline.is_synced() {
                    continue;
                }
                timeline.update(delta_time);
            }
            self.settle();
        }
    }

    /// Finish listener bookkeeping deferred while a timeline was mid-tick
    fn settle(self: &Rc<Self>) {
        if !self.unsettled.replace(false) {
            return;
        }

        self.stale_listeners.borrow_mut().retain(|(timeline, listener)| {
            let Some(mut timeline) = timeline.try_borrow_mut() else {
                return true;
            };
            timeline.remove_state_listener(*listener);
            false
        });

        let pending: Vec<(RegistrationId, TimelineHandle)> = self
            .timelines
            .borrow()
            .iter()
            .filter(|(_, registration)| registration.listener.is_none())
            .map(|(id, registration)| (id, registration.timeline.clone()))
            .collect();
        for (id, timeline) in pending {
            let (Some(listener), active) = self.listen(&timeline) else {
                continue;
            };
            let mut timelines = self.timelines.borrow_mut();
            match timelines.get_mut(id) {
                Some(registration) => {
                    registration.listener = Some(listener);
                    registration.active = active;
                }
                None => self.stale_listeners.borrow_mut().push((timeline, listener)),
            }
        }

        if !self.stale_listeners.borrow().is_empty() {
            self.unsettled.set(true);
        }
        self.refresh_redraw();
    }

    /// Attach the engine's state listener, or defer it if the timeline is busy
    fn listen(self: &Rc<Self>, timeline: &TimelineHandle) -> (Option<StateListenerId>, bool) {
        let Some(mut borrowed) = timeline.try_borrow_mut() else {
            tracing::debug!("Engine: timeline {} is ticking, deferring its listener", timeline.key());
            self.unsettled.set(true);
            return (None, false);
        };
        let engine = Rc::downgrade(self);
        let listener = borrowed.add_state_listener(move |key, status| notify(&engine, key, status));
        let active = borrowed.status().is_active();
        (Some(listener), active)
    }

    /// Detach the engine's listener from a removed registration
    fn forget(&self, registration: Registration) {
        let Some(listener) = registration.listener else {
            return;
        };
        if let Some(mut timeline) = registration.timeline.try_borrow_mut() {
            timeline.remove_state_listener(listener);
            return;
        }
        tracing::debug!(
            "Engine: timeline {} is ticking, deferring listener removal",
            registration.timeline.key()
        );
        self.stale_listeners
            .borrow_mut()
            .push((registration.timeline, listener));
        self.unsettled.set(true);
    }

    fn on_state_change(&self, key: TimelineKey, status: TimelineStatus) {
        {
            let mut timelines = self.timelines.borrow_mut();
            let Some(registration) = timelines
                .values_mut()
                .find(|registration| registration.timeline.key() == key)
            else {
                return;
            };
            registration.active = status.is_active();
        }
        self.refresh_redraw();
    }

    /// Forward redraw demand to the host, only when it changes
    fn refresh_redraw(&self) {
        let wanted = self
            .timelines
            .borrow()
            .values()
            .any(|registration| registration.active);
        if wanted == self.redraw.get() {
            return;
        }
        self.redraw.set(wanted);

        let host = self.host.borrow().as_ref().map(|binding| binding.host.clone());
        tracing::debug!(
            "Engine: continuous redraw {}",
            if wanted { "requested" } else { "released" }
        );
        if let Some(host) = host {
            if wanted {
                host.request_continuous_redraw();
            } else {
                host.release_continuous_redraw();
            }
        }
    }
}

/// Scheduler for top-level timelines
///
/// Create one per render loop and [`attach`](Engine::attach) it. Timelines
/// synced into another timeline stay registered but are only ever ticked by
/// their parent. Dropping the engine detaches it from its host.
///
/// Timeline callbacks may register or unregister any timeline, including the
/// one running them. Listener changes on a timeline that is mid-tick are
/// applied once its tick returns.
pub struct Engine {
    inner: Rc<EngineInner>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                config,
                timelines: RefCell::new(SlotMap::with_key()),
                stale_listeners: RefCell::new(Vec::new()),
                unsettled: Cell::new(false),
                redraw: Cell::new(false),
                host: RefCell::new(None),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Timeline options seeded from the engine configuration
    pub fn timeline_options(&self) -> TimelineOptions {
        self.inner.config.timeline_options()
    }

    /// Animation options seeded from the engine configuration
    pub fn animation_options(&self) -> AnimationOptions {
        self.inner.config.animation_options()
    }

    /// Create a timeline and register it, playing it first if `autoplay` is set
    pub fn create_timeline(&self, options: TimelineOptions) -> TimelineHandle {
        let autoplay = options.is_autoplay();
        let timeline = TimelineHandle::from_options(options);
        if autoplay {
            timeline.play();
        }
        self.register(&timeline);
        timeline
    }

    /// Add a timeline to the set ticked by [`update`](Engine::update)
    ///
    /// Registering the same timeline twice has no effect.
    pub fn register(&self, timeline: &TimelineHandle) {
        if self.is_registered(timeline) {
            return;
        }

        let (listener, active) = self.inner.listen(timeline);
        self.inner.timelines.borrow_mut().insert(Registration {
            timeline: timeline.clone(),
            listener,
            active,
        });
        tracing::debug!("Engine: registered timeline {}", timeline.key());
        self.inner.refresh_redraw();
    }

    /// Stop scheduling a timeline. Returns whether it was registered.
    pub fn unregister(&self, timeline: &TimelineHandle) -> bool {
        let Some(id) = self.inner.find(timeline.key()) else {
            return false;
        };
        let removed = self.inner.timelines.borrow_mut().remove(id);
        if let Some(registration) = removed {
            self.inner.forget(registration);
        }

        tracing::debug!("Engine: unregistered timeline {}", timeline.key());
        self.inner.refresh_redraw();
        true
    }

    /// Unregister every timeline
    pub fn clear(&self) {
        let removed: Vec<Registration> = self
            .inner
            .timelines
            .borrow_mut()
            .drain()
            .map(|(_, registration)| registration)
            .collect();
        for registration in removed {
            self.inner.forget(registration);
        }
        self.inner.refresh_redraw();
    }

    pub fn is_registered(&self, timeline: &TimelineHandle) -> bool {
        self.inner.find(timeline.key()).is_some()
    }

    pub fn timeline_count(&self) -> usize {
        self.inner.timelines.borrow().len()
    }

    /// Advance every registered, unsynced timeline
    pub fn update(&self, delta_time: f64) {
        tracing::trace!("Engine: update {}ms", delta_time);
        self.inner.update(delta_time);
    }

    /// Whether some registered, unsynced timeline is playing and not complete
    pub fn is_continuous_redraw(&self) -> bool {
        self.inner.redraw.get()
    }

    /// Drive this engine from a host render loop
    ///
    /// Replaces any previous binding. Outstanding redraw demand is moved to
    /// the new host.
    pub fn attach(&self, host: Rc<dyn RenderLoop>) {
        self.detach();

        let engine = Rc::downgrade(&self.inner);
        let tick = host.register_frame_tick(Rc::new(move |delta_time: f64| {
            if let Some(inner) = engine.upgrade() {
                inner.update(delta_time);
            }
        }));
        if self.inner.redraw.get() {
            host.request_continuous_redraw();
        }

        tracing::debug!("Engine: attached to render loop");
        *self.inner.host.borrow_mut() = Some(HostBinding { host, tick });
    }

    /// Remove the engine from its host render loop, releasing redraw demand
    pub fn detach(&self) {
        let Some(binding) = self.inner.host.borrow_mut().take() else {
            return;
        };
        if self.inner.redraw.get() {
            binding.host.release_continuous_redraw();
        }
        binding.host.unregister_frame_tick(binding.tick);
        tracing::debug!("Engine: detached from render loop");
    }

    pub fn is_attached(&self) -> bool {
        self.inner.host.borrow().is_some()
    }
}

fn notify(engine: &Weak<EngineInner>, key: TimelineKey, status: TimelineStatus) {
    if let Some(inner) = engine.upgrade() {
        inner.on_state_change(key, status);
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("timelines", &self.timeline_count())
            .field("continuous_redraw", &self.is_continuous_redraw())
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::PropertyBag;
    use cadence_core::HeadlessLoop;

    fn attached() -> (Engine, Rc<HeadlessLoop>) {
        let engine = Engine::new();
        let host = Rc::new(HeadlessLoop::new());
        engine.attach(host.clone());
        (engine, host)
    }

    #[test]
    fn test_create_timeline_autoplay() {
        let engine = Engine::new();
        let playing = engine.create_timeline(TimelineOptions::new());
        let idle = engine.create_timeline(TimelineOptions::new().autoplay(false));

        assert!(playing.is_playing());
        assert!(!idle.is_playing());
        assert!(engine.is_registered(&playing));
        assert!(engine.is_registered(&idle));
        assert_eq!(engine.timeline_count(), 2);
        assert!(engine.is_continuous_redraw());
    }

    #[test]
    fn test_redraw_toggles_on_edges_only() {
        let (engine, host) = attached();
        let first = engine.create_timeline(TimelineOptions::new().duration(100.0));
        let _second = engine.create_timeline(TimelineOptions::new().duration(300.0));
        assert_eq!(host.redraw_requests(), 1);

        for _ in 0..2 {
            host.frame(50.0);
        }
        assert!(first.is_complete());
        assert!(host.is_continuous_redraw());
        assert_eq!(host.redraw_releases(), 0);

        let frames = host.run_while_continuous(50.0, 100);
        assert_eq!(frames, 4);
        assert_eq!(host.redraw_requests(), 1);
        assert_eq!(host.redraw_releases(), 1);
        assert!(!engine.is_continuous_redraw());
    }

    #[test]
    fn test_pause_and_play_move_demand() {
        let (engine, host) = attached();
        let timeline = engine.create_timeline(TimelineOptions::new());

        timeline.pause();
        assert!(!host.is_continuous_redraw());
        timeline.play();
        assert!(host.is_continuous_redraw());
        assert_eq!(host.redraw_requests(), 2);
        assert_eq!(host.redraw_releases(), 1);
    }

    #[test]
    fn test_synced_timelines_are_ticked_by_parent_only() {
        let (engine, host) = attached();
        let parent = engine.create_timeline(TimelineOptions::new().duration(2000.0));
        let child = engine.create_timeline(TimelineOptions::new().autoplay(false));
        parent.sync(&child, 0.0).unwrap();

        host.frame(100.0);
        assert_eq!(parent.current_time(), 100.0);
        assert_eq!(child.current_time(), 100.0);

        host.frame(100.0);
        assert_eq!(child.current_time(), 200.0);
    }

    #[test]
    fn test_synced_timeline_does_not_demand_redraw() {
        let engine = Engine::new();
        let parent = engine.create_timeline(TimelineOptions::new().autoplay(false));
        let child = engine.create_timeline(TimelineOptions::new());
        assert!(engine.is_continuous_redraw());

        parent.sync(&child, 0.0).unwrap();
        assert!(!engine.is_continuous_redraw());
    }

    #[test]
    fn test_unregister_stops_ticking() {
        let engine = Engine::new();
        let timeline = engine.create_timeline(TimelineOptions::new());

        engine.update(100.0);
        assert!(engine.unregister(&timeline));
        assert!(!engine.unregister(&timeline));
        engine.update(100.0);

        assert_eq!(timeline.current_time(), 100.0);
        assert!(!engine.is_continuous_redraw());

        // Listener is gone: state changes no longer reach the engine
        timeline.restart();
        assert!(!engine.is_continuous_redraw());
    }

    #[test]
    fn test_timeline_unregistered_mid_frame_is_skipped() {
        let engine = Rc::new(Engine::new());
        let first = engine.create_timeline(TimelineOptions::new());
        let second = engine.create_timeline(TimelineOptions::new());
        let third = engine.create_timeline(TimelineOptions::new());

        let weak = Rc::downgrade(&engine);
        let victim = third.clone();
        first.call(
            move || {
                if let Some(engine) = weak.upgrade() {
                    engine.unregister(&victim);
                }
            },
            0.0,
        );

        engine.update(50.0);
        assert_eq!(first.current_time(), 50.0);
        assert_eq!(second.current_time(), 50.0);
        assert_eq!(third.current_time(), 0.0);
        assert_eq!(engine.timeline_count(), 2);
    }

    #[test]
    fn test_timeline_unregisters_itself_mid_tick() {
        let (engine, host) = attached();
        let engine = Rc::new(engine);
        let timeline = engine.create_timeline(TimelineOptions::new().duration(1000.0));

        let weak = Rc::downgrade(&engine);
        let slot = Rc::new(RefCell::new(Some(timeline.clone())));
        let own = slot.clone();
        timeline.call(
            move || {
                if let (Some(engine), Some(timeline)) = (weak.upgrade(), own.borrow_mut().take()) {
                    assert!(engine.unregister(&timeline));
                }
            },
            100.0,
        );

        host.frame(150.0);
        assert!(!engine.is_registered(&timeline));
        assert!(!host.is_continuous_redraw());
        assert_eq!(timeline.current_time(), 150.0);
        assert!(engine.inner.stale_listeners.borrow().is_empty());

        // Not ticked any more, and its state changes are no longer observed
        host.frame(100.0);
        assert_eq!(timeline.current_time(), 150.0);
        timeline.restart();
        assert!(!engine.is_continuous_redraw());
    }

    #[test]
    fn test_timeline_registers_itself_mid_tick() {
        let engine = Rc::new(Engine::new());
        let timeline = TimelineHandle::from_options(TimelineOptions::new().duration(1000.0));

        let weak = Rc::downgrade(&engine);
        let slot = Rc::new(RefCell::new(Some(timeline.clone())));
        let own = slot.clone();
        timeline.call(
            move || {
                if let (Some(engine), Some(timeline)) = (weak.upgrade(), own.borrow_mut().take()) {
                    engine.register(&timeline);
                }
            },
            0.0,
        );

        timeline.play();
        timeline.update(10.0);
        assert!(engine.is_registered(&timeline));
        assert!(!engine.is_continuous_redraw());

        // The deferred listener is attached on the next engine update
        engine.update(10.0);
        assert!(engine.is_continuous_redraw());
        assert_eq!(timeline.current_time(), 20.0);

        timeline.pause();
        assert!(!engine.is_continuous_redraw());
    }

    #[test]
    fn test_clear() {
        let (engine, host) = attached();
        engine.create_timeline(TimelineOptions::new());
        engine.create_timeline(TimelineOptions::new());

        engine.clear();
        assert_eq!(engine.timeline_count(), 0);
        assert!(!host.is_continuous_redraw());
    }

    #[test]
    fn test_attach_replaces_previous_host() {
        let (engine, first) = attached();
        engine.create_timeline(TimelineOptions::new());
        assert!(first.is_continuous_redraw());

        let second = Rc::new(HeadlessLoop::new());
        engine.attach(second.clone());

        assert_eq!(first.tick_count(), 0);
        assert!(!first.is_continuous_redraw());
        assert_eq!(second.tick_count(), 1);
        assert!(second.is_continuous_redraw());
    }

    #[test]
    fn test_drop_detaches() {
        let host = Rc::new(HeadlessLoop::new());
        let target = PropertyBag::new().with("x", 0.0).shared();
        {
            let engine = Engine::new();
            engine.attach(host.clone());
            let timeline = engine.create_timeline(TimelineOptions::new());
            timeline.add(&target, AnimationOptions::new().to("x", 100.0), 0.0);
            host.frame(500.0);
        }

        assert_eq!(host.tick_count(), 0);
        assert!(!host.is_continuous_redraw());
        host.frame(500.0);
        assert_eq!(target.borrow().get("x"), Some(50.0));
    }

    #[test]
    fn test_timeline_options_follow_config() {
        let config = EngineConfig::from_toml_str("[timeline]\nduration = 250.0\nautoplay = false\n").unwrap();
        let engine = Engine::with_config(config);

        let timeline = engine.create_timeline(engine.timeline_options());
        assert!(!timeline.is_playing());
        assert_eq!(timeline.borrow().duration(), 250.0);
    }
}
