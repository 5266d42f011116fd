//! Property tweens
//!
//! An [`AnimationItem`] moves named numeric fields of one or more targets from
//! the values they hold when the item starts toward fixed end values. Items are
//! evaluated against the absolute time of the timeline that owns them, so the
//! same item produces the same state no matter how that time was chunked into
//! frames.

use crate::easing::Easing;
use crate::target::TargetRef;
use smallvec::SmallVec;

/// Names consumed as animation configuration rather than animated fields
pub const RESERVED_KEYS: &[&str] = &[
    "duration",
    "ease",
    "onUpdate",
    "onComplete",
    "onStart",
    "onLoop",
    "loop",
    "loopDelay",
    "alternate",
    "once",
];

/// Default animation duration in milliseconds
pub const DEFAULT_DURATION_MS: f64 = 1000.0;

/// How many times an animation plays
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopMode {
    /// A single pass
    #[default]
    Once,
    /// An exact number of passes. `Count(0)` and `Count(1)` are a single pass.
    Count(u32),
    /// Loop until the owning timeline resets the item
    Infinite,
}

impl LoopMode {
    /// Number of cycles this mode allows, `None` when unbounded
    pub fn max_cycles(self) -> Option<u64> {
        match self {
            LoopMode::Once => Some(1),
            LoopMode::Count(n) => Some(u64::from(n.max(1))),
            LoopMode::Infinite => None,
        }
    }
}

impl From<bool> for LoopMode {
    fn from(looping: bool) -> Self {
        if looping {
            LoopMode::Infinite
        } else {
            LoopMode::Once
        }
    }
}

impl From<u32> for LoopMode {
    fn from(count: u32) -> Self {
        LoopMode::Count(count)
    }
}

/// State handed to animation callbacks
#[derive(Debug)]
pub struct AnimationFrame<'a> {
    /// The animated targets
    pub targets: &'a [TargetRef],
    /// Eased progress of the current cycle, before alternate reversal
    pub progress: f64,
    /// Absolute time of the owning timeline
    pub current_time: f64,
    /// Delta of the tick that triggered the callback
    pub delta_time: f64,
}

/// Callback invoked on animation lifecycle events
pub type AnimationCallback = Box<dyn FnMut(&AnimationFrame<'_>)>;

/// Configuration of a single property tween
///
/// ```rust
/// use cadence_animation::{AnimationOptions, Easing, LoopMode};
///
/// let options = AnimationOptions::new()
///     .to("x", 100.0)
///     .to("opacity", 0.0)
///     .duration(500.0)
///     .ease(Easing::EaseOutQuad)
///     .loop_mode(LoopMode::Count(3))
///     .alternate(true);
/// assert_eq!(options.properties().len(), 2);
/// ```
pub struct AnimationOptions {
    properties: SmallVec<[(String, f64); 4]>,
    duration: f64,
    ease: Easing,
    loop_mode: LoopMode,
    loop_delay: f64,
    alternate: bool,
    once: bool,
    on_start: Option<AnimationCallback>,
    on_update: Option<AnimationCallback>,
    on_loop: Option<AnimationCallback>,
    on_complete: Option<AnimationCallback>,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationOptions {
    pub fn new() -> Self {
        Self {
            properties: SmallVec::new(),
            duration: DEFAULT_DURATION_MS,
            ease: Easing::Linear,
            loop_mode: LoopMode::Once,
            loop_delay: 0.0,
            alternate: false,
            once: false,
            on_start: None,
            on_update: None,
            on_loop: None,
            on_complete: None,
        }
    }

    /// Animate a field toward `end`
    ///
    /// Reserved configuration names are never animated and are dropped here.
    pub fn to(mut self, name: impl Into<String>, end: f64) -> Self {
        let name = name.into();
        if RESERVED_KEYS.contains(&name.as_str()) {
            tracing::warn!("`{}` is a reserved animation option, not an animated field", name);
            return self;
        }

        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = end,
            None => self.properties.push((name, end)),
        }
        self
    }

    /// Duration of one pass in milliseconds
    pub fn duration(mut self, duration_ms: f64) -> Self {
        self.duration = duration_ms.max(0.0);
        self
    }

    pub fn ease(mut self, ease: impl Into<Easing>) -> Self {
        self.ease = ease.into();
        self
    }

    pub fn loop_mode(mut self, mode: impl Into<LoopMode>) -> Self {
        self.loop_mode = mode.into();
        self
    }

    /// Pause between passes in milliseconds
    pub fn loop_delay(mut self, delay_ms: f64) -> Self {
        self.loop_delay = delay_ms.max(0.0);
        self
    }

    /// Reverse direction on every odd pass
    pub fn alternate(mut self, alternate: bool) -> Self {
        self.alternate = alternate;
        self
    }

    /// Remove the item from its timeline as soon as it completes
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn on_start<F: FnMut(&AnimationFrame<'_>) + 'static>(mut self, callback: F) -> Self {
        self.on_start = Some(Box::new(callback));
        self
    }

    pub fn on_update<F: FnMut(&AnimationFrame<'_>) + 'static>(mut self, callback: F) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    pub fn on_loop<F: FnMut(&AnimationFrame<'_>) + 'static>(mut self, callback: F) -> Self {
        self.on_loop = Some(Box::new(callback));
        self
    }

    pub fn on_complete<F: FnMut(&AnimationFrame<'_>) + 'static>(mut self, callback: F) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Animated fields and their end values, in insertion order
    pub fn properties(&self) -> &[(String, f64)] {
        &self.properties
    }
}

/// One property tween bound to its targets
pub struct AnimationItem {
    targets: SmallVec<[TargetRef; 2]>,
    properties: SmallVec<[(String, f64); 4]>,
    /// Per target, per property value captured when the item started.
    /// `None` marks a field the target does not expose.
    initial_values: Vec<SmallVec<[Option<f64>; 4]>>,
    start_time: f64,
    duration: f64,
    ease: Easing,
    loop_mode: LoopMode,
    loop_delay: f64,
    alternate: bool,
    once: bool,
    started: bool,
    completed: bool,
    current_loop: u64,
    last_update_time: Option<f64>,
    on_start: Option<AnimationCallback>,
    on_update: Option<AnimationCallback>,
    on_loop: Option<AnimationCallback>,
    on_complete: Option<AnimationCallback>,
}

impl AnimationItem {
    pub fn new(targets: Vec<TargetRef>, options: AnimationOptions, start_time: f64) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            properties: options.properties,
            initial_values: Vec::new(),
            start_time,
            duration: options.duration,
            ease: options.ease,
            loop_mode: options.loop_mode,
            loop_delay: options.loop_delay,
            alternate: options.alternate,
            once: options.once,
            started: false,
            completed: false,
            current_loop: 0,
            last_update_time: None,
            on_start: options.on_start,
            on_update: options.on_update,
            on_loop: options.on_loop,
            on_complete: options.on_complete,
        }
    }

    /// Evaluate the item at an absolute timeline time
    pub fn evaluate(&mut self, time: f64, delta_time: f64) {
        if time < self.start_time {
            return;
        }

        if !self.started {
            self.started = true;
            self.capture_initial_values();
            fire(&mut self.on_start, &self.targets, 0.0, time, delta_time);
        }

        if self.completed {
            return;
        }

        if self.duration <= 0.0 {
            self.finish(1.0, time, delta_time);
            return;
        }

        let max_cycles = self.loop_mode.max_cycles();
        let cycle_time = self.duration + self.loop_delay;
        let animation_time = time - self.start_time;
        let mut cycle = (animation_time / cycle_time).floor() as u64;
        let mut time_in_cycle = animation_time % cycle_time;

        // Large deltas that skip several seams still fire the loop callback once
        let left_final_cycle = max_cycles.is_some_and(|max| self.current_loop + 1 >= max);
        if cycle > self.current_loop && !left_final_cycle {
            fire(&mut self.on_loop, &self.targets, 1.0, time, delta_time);
        }
        self.current_loop = cycle;

        if let Some(max) = max_cycles {
            let last_cycle = max - 1;
            if cycle >= max || (cycle == last_cycle && time_in_cycle >= self.duration) {
                let reversed = self.alternate && last_cycle % 2 == 1;
                self.finish(if reversed { 0.0 } else { 1.0 }, time, delta_time);
                return;
            }
        }

        // A tick landing exactly on a seam shows the end of the previous cycle
        if time_in_cycle == 0.0 && animation_time > 0.0 {
            cycle = cycle.saturating_sub(1);
            time_in_cycle = cycle_time;
        }

        let progress = (time_in_cycle / self.duration).clamp(0.0, 1.0);
        let eased = self.ease.apply(progress);
        let factor = if self.alternate && cycle % 2 == 1 {
            1.0 - eased
        } else {
            eased
        };
        self.write_values(factor);

        if self.last_update_time != Some(time) {
            self.last_update_time = Some(time);
            fire(&mut self.on_update, &self.targets, eased, time, delta_time);
        }
    }

    /// Disarm the item so the next evaluation past its start time replays it
    ///
    /// Initial values are captured again when the item restarts.
    pub fn reset(&mut self) {
        self.started = false;
        self.completed = false;
        self.current_loop = 0;
        self.last_update_time = None;
    }

    /// Apply the final values and fire completion. Runs once per arming.
    ///
    /// The update callback sees the progress that was applied, so a reversed
    /// final cycle reports 0.
    fn finish(&mut self, factor: f64, time: f64, delta_time: f64) {
        self.write_values(factor);
        self.completed = true;
        self.last_update_time = Some(time);
        tracing::trace!("animation completed at {}ms", time);
        fire(&mut self.on_update, &self.targets, factor, time, delta_time);
        fire(&mut self.on_complete, &self.targets, 1.0, time, delta_time);
    }

    fn capture_initial_values(&mut self) {
        self.initial_values = self
            .targets
            .iter()
            .map(|target| {
                self.properties
                    .iter()
                    .map(|(name, _)| target.get(name))
                    .collect()
            })
            .collect();
    }

    /// Write `start + (end - start) * factor` onto every target
    fn write_values(&self, factor: f64) {
        for (target, initial) in self.targets.iter().zip(&self.initial_values) {
            for ((name, end), start) in self.properties.iter().zip(initial) {
                let Some(start) = *start else {
                    continue;
                };
                let value = if factor == 1.0 {
                    *end
                } else if factor == 0.0 {
                    start
                } else {
                    start + (end - start) * factor
                };
                target.set(name, value);
            }
        }
    }

    pub fn targets(&self) -> &[TargetRef] {
        &self.targets
    }

    pub fn properties(&self) -> &[(String, f64)] {
        &self.properties
    }

    /// Value of `name` captured on `target_index` when the item started
    pub fn initial_value(&self, target_index: usize, name: &str) -> Option<f64> {
        let slot = self.properties.iter().position(|(n, _)| n == name)?;
        self.initial_values.get(target_index)?.get(slot).copied().flatten()
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn is_once(&self) -> bool {
        self.once
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Index of the loop cycle last evaluated
    pub fn current_loop(&self) -> u64 {
        self.current_loop
    }
}

impl std::fmt::Debug for AnimationItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationItem")
            .field("properties", &self.properties)
            .field("targets", &self.targets.len())
            .field("start_time", &self.start_time)
            .field("duration", &self.duration)
            .field("loop_mode", &self.loop_mode)
            .field("started", &self.started)
            .field("completed", &self.completed)
            .field("current_loop", &self.current_loop)
            .finish()
    }
}

fn fire(
    callback: &mut Option<AnimationCallback>,
    targets: &[TargetRef],
    progress: f64,
    current_time: f64,
    delta_time: f64,
) {
    if let Some(callback) = callback.as_mut() {
        callback(&AnimationFrame {
            targets,
            progress,
            current_time,
            delta_time,
        });
    }
}
