//! Timeline orchestration for multiple animations
//!
//! A [`Timeline`] owns a virtual clock and an ordered list of animation and
//! callback items evaluated against it. Timelines nest: a child synced at an
//! offset starts when the parent's clock reaches that offset, and from then on
//! is driven by the parent's ticks.
//!
//! # Tick order
//!
//! Within one [`Timeline::update`]:
//!
//! 1. sync bindings are evaluated against the time the parent is about to reach
//! 2. if the timeline is playing, its clock advances and every item is evaluated
//! 3. completed `once` items are pruned
//! 4. the clock wraps (looping) or the timeline completes
//!
//! A wrap carries the time that ran past the end into the next cycle, so one
//! large tick and several small ticks covering the same span end in the same
//! state.

use crate::animation::{AnimationItem, AnimationOptions};
use crate::callback::{CallbackItem, TimelineCallback};
use crate::error::{AnimationError, Result};
use crate::target::IntoTargets;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

new_key_type! {
    /// Handle to a timeline state listener
    pub struct StateListenerId;
}

static NEXT_TIMELINE_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a timeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimelineKey(u64);

impl TimelineKey {
    fn next() -> Self {
        Self(NEXT_TIMELINE_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TimelineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where on a timeline an item starts
#[derive(Clone, Debug, PartialEq)]
pub enum StartAt {
    /// Milliseconds from the start of the timeline
    Time(f64),
    /// A position registered with [`Timeline::add_label`]
    Label(String),
}

impl Default for StartAt {
    fn default() -> Self {
        StartAt::Time(0.0)
    }
}

impl From<f64> for StartAt {
    fn from(time: f64) -> Self {
        StartAt::Time(time)
    }
}

impl From<&str> for StartAt {
    fn from(label: &str) -> Self {
        StartAt::Label(label.to_string())
    }
}

impl From<String> for StartAt {
    fn from(label: String) -> Self {
        StartAt::Label(label)
    }
}

/// Snapshot of a timeline's playback state, delivered to state listeners
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimelineStatus {
    pub playing: bool,
    pub complete: bool,
    pub synced: bool,
}

impl TimelineStatus {
    /// Whether the timeline advances on its own and still has time to play
    pub fn is_active(&self) -> bool {
        self.playing && !self.complete && !self.synced
    }
}

/// Listener notified whenever a timeline changes playback state
pub type StateListener = Box<dyn FnMut(TimelineKey, TimelineStatus)>;

/// Configuration for a new timeline
pub struct TimelineOptions {
    duration: f64,
    looping: bool,
    autoplay: bool,
    on_complete: Option<TimelineCallback>,
    on_pause: Option<TimelineCallback>,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineOptions {
    pub fn new() -> Self {
        Self {
            duration: 1000.0,
            looping: false,
            autoplay: true,
            on_complete: None,
            on_pause: None,
        }
    }

    /// Timeline length in milliseconds
    pub fn duration(mut self, duration_ms: f64) -> Self {
        self.duration = duration_ms.max(0.0);
        self
    }

    /// Wrap back to the start when the end is reached
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Start playing (and register with the engine) on creation
    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn on_complete<F: FnMut() + 'static>(mut self, callback: F) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn on_pause<F: FnMut() + 'static>(mut self, callback: F) -> Self {
        self.on_pause = Some(Box::new(callback));
        self
    }

    pub fn is_autoplay(&self) -> bool {
        self.autoplay
    }
}

/// An entry on a timeline
#[derive(Debug)]
pub enum TimelineItem {
    Animation(AnimationItem),
    Callback(CallbackItem),
}

impl TimelineItem {
    fn evaluate(&mut self, time: f64, delta_time: f64) {
        match self {
            TimelineItem::Animation(animation) => animation.evaluate(time, delta_time),
            TimelineItem::Callback(callback) => {
                callback.evaluate(time);
            }
        }
    }

    fn reset(&mut self) {
        match self {
            TimelineItem::Animation(animation) => animation.reset(),
            TimelineItem::Callback(callback) => callback.reset(),
        }
    }

    /// A completed `once` animation, due for removal
    fn is_spent(&self) -> bool {
        match self {
            TimelineItem::Animation(animation) => animation.is_once() && animation.is_completed(),
            TimelineItem::Callback(_) => false,
        }
    }

    pub fn start_time(&self) -> f64 {
        match self {
            TimelineItem::Animation(animation) => animation.start_time(),
            TimelineItem::Callback(callback) => callback.start_time(),
        }
    }

    pub fn as_animation(&self) -> Option<&AnimationItem> {
        match self {
            TimelineItem::Animation(animation) => Some(animation),
            TimelineItem::Callback(_) => None,
        }
    }

    pub fn as_callback(&self) -> Option<&CallbackItem> {
        match self {
            TimelineItem::Animation(_) => None,
            TimelineItem::Callback(callback) => Some(callback),
        }
    }
}

/// A child timeline driven by its parent from `start_time` on
struct SyncBinding {
    start_time: f64,
    timeline: TimelineHandle,
    started: bool,
}

impl SyncBinding {
    /// `time` is the parent time about to be reached by the current tick
    fn evaluate(&mut self, time: f64, delta_time: f64) {
        if self.started {
            self.timeline.borrow_mut().update(delta_time);
        } else if time >= self.start_time {
            self.started = true;
            let overshoot = time - self.start_time;
            tracing::debug!(
                "Timeline {}: sync point {}ms reached, overshoot {}ms",
                self.timeline.key(),
                self.start_time,
                overshoot
            );

            let mut child = self.timeline.borrow_mut();
            child.play();
            child.update(overshoot);
        }
    }

    /// Back to the dormant state before the sync point
    fn reset(&mut self) {
        self.started = false;
        let mut child = self.timeline.borrow_mut();
        child.restart();
        child.pause();
    }
}

/// A sequence of animations and callbacks on a shared clock
pub struct Timeline {
    key: TimelineKey,
    items: Vec<TimelineItem>,
    sub_timelines: Vec<SyncBinding>,
    labels: FxHashMap<String, f64>,
    current_time: f64,
    duration: f64,
    looping: bool,
    playing: bool,
    complete: bool,
    synced: bool,
    on_complete: Option<TimelineCallback>,
    on_pause: Option<TimelineCallback>,
    listeners: SlotMap<StateListenerId, StateListener>,
}

impl Timeline {
    /// Create a timeline. `autoplay` is applied by the engine, not here.
    pub fn new(options: TimelineOptions) -> Self {
        Self {
            key: TimelineKey::next(),
            items: Vec::new(),
            sub_timelines: Vec::new(),
            labels: FxHashMap::default(),
            current_time: 0.0,
            duration: options.duration,
            looping: options.looping,
            playing: false,
            complete: false,
            synced: false,
            on_complete: options.on_complete,
            on_pause: options.on_pause,
            listeners: SlotMap::with_key(),
        }
    }

    /// Schedule an animation of `targets`
    pub fn add(
        &mut self,
        targets: impl IntoTargets,
        options: AnimationOptions,
        start: impl Into<StartAt>,
    ) -> &mut Self {
        let start_time = self.resolve_start(start.into());
        let item = AnimationItem::new(targets.into_targets(), options, start_time);
        self.items.push(TimelineItem::Animation(item));
        self
    }

    /// Schedule an animation starting now that removes itself once complete
    pub fn once(&mut self, targets: impl IntoTargets, options: AnimationOptions) -> &mut Self {
        let start_time = self.current_time;
        self.add(targets, options.once(true), start_time)
    }

    /// Schedule a one-shot callback
    pub fn call<F: FnMut() + 'static>(&mut self, callback: F, start: impl Into<StartAt>) -> &mut Self {
        let start_time = self.resolve_start(start.into());
        self.items
            .push(TimelineItem::Callback(CallbackItem::new(Box::new(callback), start_time)));
        self
    }

    /// Name a position on the timeline for use as a [`StartAt::Label`]
    pub fn add_label(&mut self, name: impl Into<String>, time: f64) -> &mut Self {
        self.labels.insert(name.into(), time);
        self
    }

    pub fn label(&self, name: &str) -> Option<f64> {
        self.labels.get(name).copied()
    }

    /// Drive `child` from this timeline, starting at `start`
    ///
    /// Fails if `child` is already synced anywhere, or if it is this timeline
    /// or contains it.
    pub fn sync(&mut self, child: &TimelineHandle, start: impl Into<StartAt>) -> Result<&mut Self> {
        let cycle = AnimationError::SyncCycle {
            parent: self.key,
            child: child.key(),
        };

        // Only a timeline already borrowed up the stack can fail here: this one
        let Ok(mut timeline) = child.inner.try_borrow_mut() else {
            return Err(cycle);
        };
        if timeline.synced {
            return Err(AnimationError::AlreadySynced(timeline.key));
        }
        if timeline.contains(self.key) {
            return Err(cycle);
        }

        timeline.synced = true;
        timeline.notify_state_change();
        drop(timeline);

        let start_time = self.resolve_start(start.into());
        tracing::debug!(
            "Timeline {}: synced {} at {}ms",
            self.key,
            child.key(),
            start_time
        );
        self.sub_timelines.push(SyncBinding {
            start_time,
            timeline: child.clone(),
            started: false,
        });
        Ok(self)
    }

    /// Whether `key` is this timeline or one of its synced descendants
    fn contains(&self, key: TimelineKey) -> bool {
        self.key == key
            || self.sub_timelines.iter().any(|binding| {
                binding
                    .timeline
                    .inner
                    .try_borrow()
                    .map_or(true, |child| child.contains(key))
            })
    }

    /// Start or resume playback
    ///
    /// A completed timeline restarts from the beginning. Children that have
    /// not reached their sync point stay dormant.
    pub fn play(&mut self) {
        if self.complete {
            self.restart();
            return;
        }

        for binding in &self.sub_timelines {
            if binding.started {
                binding.timeline.borrow_mut().play();
            }
        }

        self.playing = true;
        tracing::debug!("Timeline {}: play at {}ms", self.key, self.current_time);
        self.notify_state_change();
    }

    /// Pause playback and every child
    ///
    /// The pause callback runs on every call, even when already paused.
    pub fn pause(&mut self) {
        for binding in &self.sub_timelines {
            binding.timeline.borrow_mut().pause();
        }

        if let Some(on_pause) = self.on_pause.as_mut() {
            on_pause();
        }

        self.playing = false;
        tracing::debug!("Timeline {}: pause at {}ms", self.key, self.current_time);
        self.notify_state_change();
    }

    /// Rewind to the start, re-arm every item and play
    pub fn restart(&mut self) {
        self.complete = false;
        self.current_time = 0.0;
        self.reset_items();
        self.reset_sub_timelines();

        self.playing = true;
        tracing::debug!("Timeline {}: restart", self.key);
        self.notify_state_change();
    }

    /// Advance the timeline by `delta_time` milliseconds
    ///
    /// Negative or NaN deltas are ignored.
    pub fn update(&mut self, delta_time: f64) {
        if delta_time.is_nan() || delta_time < 0.0 {
            tracing::trace!("Timeline {}: ignoring delta {}", self.key, delta_time);
            return;
        }

        let target_time = self.current_time + delta_time;
        for binding in &mut self.sub_timelines {
            binding.evaluate(target_time, delta_time);
        }

        if !self.playing {
            return;
        }

        self.current_time = target_time;
        for item in &mut self.items {
            item.evaluate(target_time, delta_time);
        }
        self.items.retain(|item| !item.is_spent());

        if self.current_time < self.duration {
            return;
        }

        if self.looping {
            let overshoot = if self.duration > 0.0 {
                self.current_time % self.duration
            } else {
                0.0
            };
            tracing::trace!("Timeline {}: wrap, overshoot {}ms", self.key, overshoot);

            self.reset_items();
            self.reset_sub_timelines();
            self.current_time = 0.0;

            if overshoot > 0.0 {
                self.update(overshoot);
            }
        } else {
            self.current_time = self.duration;
            self.playing = false;
            self.complete = true;
            tracing::debug!("Timeline {}: complete", self.key);

            if let Some(on_complete) = self.on_complete.as_mut() {
                on_complete();
            }
            self.notify_state_change();
        }
    }

    fn reset_items(&mut self) {
        for item in &mut self.items {
            item.reset();
        }
    }

    fn reset_sub_timelines(&mut self) {
        for binding in &mut self.sub_timelines {
            binding.reset();
        }
    }

    fn resolve_start(&self, start: StartAt) -> f64 {
        match start {
            StartAt::Time(time) => time,
            StartAt::Label(name) => self.label(&name).unwrap_or_else(|| {
                tracing::warn!("Timeline {}: unknown label {:?}, starting at 0", self.key, name);
                0.0
            }),
        }
    }

    /// Register a listener for playback state changes
    pub fn add_state_listener<F>(&mut self, listener: F) -> StateListenerId
    where
        F: FnMut(TimelineKey, TimelineStatus) + 'static,
    {
        self.listeners.insert(Box::new(listener))
    }

    pub fn remove_state_listener(&mut self, id: StateListenerId) -> bool {
        self.listeners.remove(id).is_some()
    }

    fn notify_state_change(&mut self) {
        let key = self.key;
        let status = self.status();
        for listener in self.listeners.values_mut() {
            listener(key, status);
        }
    }

    pub fn key(&self) -> TimelineKey {
        self.key
    }

    pub fn status(&self) -> TimelineStatus {
        TimelineStatus {
            playing: self.playing,
            complete: self.complete,
            synced: self.synced,
        }
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether this timeline is driven by a parent
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Live items, after `once` pruning
    pub fn items(&self) -> &[TimelineItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn sub_timeline_count(&self) -> usize {
        self.sub_timelines.len()
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("key", &self.key)
            .field("current_time", &self.current_time)
            .field("duration", &self.duration)
            .field("looping", &self.looping)
            .field("playing", &self.playing)
            .field("complete", &self.complete)
            .field("synced", &self.synced)
            .field("items", &self.items.len())
            .field("sub_timelines", &self.sub_timelines.len())
            .finish()
    }
}

/// Shared handle to a timeline
///
/// Sync bindings and the engine refer to timelines through handles. Methods
/// borrow the timeline for the duration of the call, so a callback running
/// inside a tick panics if it plays, pauses or edits the timeline being
/// ticked. [`Engine`](crate::Engine) registration is the exception.
#[derive(Clone)]
pub struct TimelineHandle {
    key: TimelineKey,
    inner: Rc<RefCell<Timeline>>,
}

impl TimelineHandle {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            key: timeline.key,
            inner: Rc::new(RefCell::new(timeline)),
        }
    }

    /// Create a timeline and wrap it. `autoplay` is not applied.
    pub fn from_options(options: TimelineOptions) -> Self {
        Self::new(Timeline::new(options))
    }

    pub fn key(&self) -> TimelineKey {
        self.key
    }

    pub fn borrow(&self) -> Ref<'_, Timeline> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Timeline> {
        self.inner.borrow_mut()
    }

    /// Borrow mutably unless the timeline is already borrowed, e.g. mid-tick
    pub fn try_borrow_mut(&self) -> Option<RefMut<'_, Timeline>> {
        self.inner.try_borrow_mut().ok()
    }

    /// Whether both handles refer to the same timeline
    pub fn ptr_eq(&self, other: &TimelineHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn add(
        &self,
        targets: impl IntoTargets,
        options: AnimationOptions,
        start: impl Into<StartAt>,
    ) -> &Self {
        self.inner.borrow_mut().add(targets, options, start);
        self
    }

    pub fn once(&self, targets: impl IntoTargets, options: AnimationOptions) -> &Self {
        self.inner.borrow_mut().once(targets, options);
        self
    }

    pub fn call<F: FnMut() + 'static>(&self, callback: F, start: impl Into<StartAt>) -> &Self {
        self.inner.borrow_mut().call(callback, start);
        self
    }

    pub fn add_label(&self, name: impl Into<String>, time: f64) -> &Self {
        self.inner.borrow_mut().add_label(name, time);
        self
    }

    pub fn sync(&self, child: &TimelineHandle, start: impl Into<StartAt>) -> Result<&Self> {
        if self.ptr_eq(child) {
            return Err(AnimationError::SyncCycle {
                parent: self.key,
                child: child.key,
            });
        }
        self.inner.borrow_mut().sync(child, start)?;
        Ok(self)
    }

    pub fn play(&self) {
        self.inner.borrow_mut().play();
    }

    pub fn pause(&self) {
        self.inner.borrow_mut().pause();
    }

    pub fn restart(&self) {
        self.inner.borrow_mut().restart();
    }

    pub fn update(&self, delta_time: f64) {
        self.inner.borrow_mut().update(delta_time);
    }

    pub fn status(&self) -> TimelineStatus {
        self.inner.borrow().status()
    }

    pub fn current_time(&self) -> f64 {
        self.inner.borrow().current_time()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.borrow().is_playing()
    }

    pub fn is_complete(&self) -> bool {
        self.inner.borrow().is_complete()
    }

    pub fn is_synced(&self) -> bool {
        self.inner.borrow().is_synced()
    }

    pub fn item_count(&self) -> usize {
        self.inner.borrow().item_count()
    }
}

impl fmt::Debug for TimelineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(timeline) => fmt::Debug::fmt(&*timeline, f),
            Err(_) => f
                .debug_struct("TimelineHandle")
                .field("key", &self.key)
                .finish_non_exhaustive(),
        }
    }
}
