//! Host render loop contract
//!
//! The animation engine never owns a render loop. It registers a per-frame
//! tick callback with the loop the host already runs, and asks that loop to
//! keep producing frames while something is animating.

use slotmap::{new_key_type, SlotMap};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

new_key_type! {
    /// Handle to a registered frame tick callback
    pub struct FrameTickId;
}

/// Per-frame callback, invoked with the time since the previous frame in milliseconds
pub type FrameCallback = Rc<dyn Fn(f64)>;

/// A render loop that can drive per-frame work
///
/// Everything here happens on the thread that owns the loop. Implementations
/// must not hold internal borrows while invoking tick callbacks: a callback is
/// allowed to call back into the loop (for example to release redraw demand).
pub trait RenderLoop {
    /// Register a callback to be invoked once per frame
    fn register_frame_tick(&self, callback: FrameCallback) -> FrameTickId;

    /// Remove a previously registered callback. Unknown ids are ignored.
    fn unregister_frame_tick(&self, id: FrameTickId);

    /// Keep producing frames even when nothing else asks for a redraw
    fn request_continuous_redraw(&self);

    /// Return to on-demand redraws
    fn release_continuous_redraw(&self);
}

/// A render loop without a window
///
/// Frames are produced explicitly with [`HeadlessLoop::frame`]. The loop keeps
/// track of how often continuous redraw was requested and released so callers
/// can observe the demand signal.
#[derive(Default)]
pub struct HeadlessLoop {
    ticks: RefCell<SlotMap<FrameTickId, FrameCallback>>,
    continuous: Cell<bool>,
    requests: Cell<u32>,
    releases: Cell<u32>,
    frames: Cell<u64>,
}

impl HeadlessLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce one frame, invoking every registered tick callback with `dt_ms`
    pub fn frame(&self, dt_ms: f64) {
        // Callbacks may register or unregister ticks, so dispatch from a snapshot
        let callbacks: Vec<FrameCallback> = self.ticks.borrow().values().cloned().collect();
        self.frames.set(self.frames.get() + 1);

        for callback in callbacks {
            callback(dt_ms);
        }
    }

    /// Produce fixed-interval frames for as long as continuous redraw is requested
    ///
    /// Stops after `max_frames` frames. Returns the number of frames produced.
    pub fn run_while_continuous(&self, dt_ms: f64, max_frames: u32) -> u32 {
        let mut produced = 0;
        while self.continuous.get() && produced < max_frames {
            self.frame(dt_ms);
            produced += 1;
        }
        produced
    }

    /// Whether continuous redraw is currently requested
    pub fn is_continuous_redraw(&self) -> bool {
        self.continuous.get()
    }

    /// Number of times continuous redraw was requested
    pub fn redraw_requests(&self) -> u32 {
        self.requests.get()
    }

    /// Number of times continuous redraw was released
    pub fn redraw_releases(&self) -> u32 {
        self.releases.get()
    }

    /// Number of registered tick callbacks
    pub fn tick_count(&self) -> usize {
        self.ticks.borrow().len()
    }

    /// Number of frames produced so far
    pub fn frame_count(&self) -> u64 {
        self.frames.get()
    }
}

impl RenderLoop for HeadlessLoop {
    fn register_frame_tick(&self, callback: FrameCallback) -> FrameTickId {
        self.ticks.borrow_mut().insert(callback)
    }

    fn unregister_frame_tick(&self, id: FrameTickId) {
        self.ticks.borrow_mut().remove(id);
    }

    fn request_continuous_redraw(&self) {
        tracing::debug!("HeadlessLoop: request_continuous_redraw");
        self.requests.set(self.requests.get() + 1);
        self.continuous.set(true);
    }

    fn release_continuous_redraw(&self) {
        tracing::debug!("HeadlessLoop: release_continuous_redraw");
        self.releases.set(self.releases.get() + 1);
        self.continuous.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_dispatches_to_every_tick() {
        let host = HeadlessLoop::new();
        let total = Rc::new(Cell::new(0.0));

        for _ in 0..3 {
            let total = total.clone();
            host.register_frame_tick(Rc::new(move |dt: f64| total.set(total.get() + dt)));
        }

        host.frame(10.0);
        assert_eq!(total.get(), 30.0);
        assert_eq!(host.frame_count(), 1);
        assert_eq!(host.tick_count(), 3);
    }

    #[test]
    fn test_unregister_stops_dispatch() {
        let host = HeadlessLoop::new();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();

        let id = host.register_frame_tick(Rc::new(move |_: f64| counter.set(counter.get() + 1)));
        host.frame(16.0);
        host.unregister_frame_tick(id);
        host.frame(16.0);

        assert_eq!(calls.get(), 1);
        assert_eq!(host.tick_count(), 0);

        // Unknown ids are ignored
        host.unregister_frame_tick(id);
    }

    #[test]
    fn test_callback_can_unregister_itself() {
        let host = Rc::new(HeadlessLoop::new());
        let slot: Rc<Cell<Option<FrameTickId>>> = Rc::new(Cell::new(None));

        let weak_host = Rc::downgrade(&host);
        let own_id = slot.clone();
        let id = host.register_frame_tick(Rc::new(move |_: f64| {
            if let (Some(host), Some(id)) = (weak_host.upgrade(), own_id.get()) {
                host.unregister_frame_tick(id);
            }
        }));
        slot.set(Some(id));

        host.frame(16.0);
        assert_eq!(host.tick_count(), 0);
    }

    #[test]
    fn test_continuous_redraw_flag() {
        let host = HeadlessLoop::new();
        assert!(!host.is_continuous_redraw());

        host.request_continuous_redraw();
        assert!(host.is_continuous_redraw());

        host.release_continuous_redraw();
        assert!(!host.is_continuous_redraw());
        assert_eq!(host.redraw_requests(), 1);
        assert_eq!(host.redraw_releases(), 1);
    }

    #[test]
    fn test_run_while_continuous_is_bounded() {
        let host = HeadlessLoop::new();
        host.request_continuous_redraw();

        assert_eq!(host.run_while_continuous(16.0, 5), 5);
        assert_eq!(host.frame_count(), 5);

        host.release_continuous_redraw();
        assert_eq!(host.run_while_continuous(16.0, 5), 0);
    }
}
