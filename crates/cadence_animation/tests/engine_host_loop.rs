//! Integration tests for the engine + host render loop
//!
//! These tests verify that:
//! - A host loop drives registered timelines through the engine
//! - Continuous redraw is requested and released exactly on demand edges
//! - Synced timelines only advance through their parent
//! - Engine configuration seeds new timelines

use cadence_animation::{
    AnimationOptions, Engine, EngineConfig, HeadlessLoop, PropertyBag, RenderLoop, TimelineOptions,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn setup() -> (Engine, Rc<HeadlessLoop>) {
    let engine = Engine::new();
    let host = Rc::new(HeadlessLoop::new());
    engine.attach(host.clone());
    (engine, host)
}

#[test]
fn test_host_loop_runs_sequence_to_completion() {
    let (engine, host) = setup();
    let target = PropertyBag::new().with("x", 0.0).with("y", 0.0).shared();
    let events = Rc::new(RefCell::new(Vec::new()));

    let done = events.clone();
    let timeline = engine.create_timeline(
        TimelineOptions::new()
            .duration(1000.0)
            .on_complete(move || done.borrow_mut().push("complete")),
    );
    let midpoint = events.clone();
    timeline
        .add(&target, AnimationOptions::new().to("x", 100.0).duration(500.0), 0.0)
        .call(move || midpoint.borrow_mut().push("midpoint"), 500.0)
        .add(&target, AnimationOptions::new().to("y", 50.0).duration(500.0), 500.0);

    let frames = host.run_while_continuous(16.0, 1000);

    // 1000ms at 16ms per frame
    assert_eq!(frames, 63);
    assert!(timeline.is_complete());
    assert_eq!(target.borrow().get("x"), Some(100.0));
    assert_eq!(target.borrow().get("y"), Some(50.0));
    assert_eq!(*events.borrow(), vec!["midpoint", "complete"]);
    assert_eq!(host.redraw_requests(), 1);
    assert_eq!(host.redraw_releases(), 1);
}

#[test]
fn test_redraw_demand_follows_any_active_timeline() {
    let (engine, host) = setup();
    let short = engine.create_timeline(TimelineOptions::new().duration(100.0));
    let long = engine.create_timeline(TimelineOptions::new().duration(1000.0));

    host.frame(200.0);
    assert!(short.is_complete());
    assert!(host.is_continuous_redraw());

    long.pause();
    assert!(!host.is_continuous_redraw());

    // Replaying a completed timeline raises demand again
    short.play();
    assert!(host.is_continuous_redraw());
    assert_eq!(host.redraw_requests(), 2);
    assert_eq!(host.redraw_releases(), 1);
}

#[test]
fn test_looping_timeline_keeps_demand() {
    let (engine, host) = setup();
    engine.create_timeline(TimelineOptions::new().duration(100.0).looping(true));

    let frames = host.run_while_continuous(16.0, 500);
    assert_eq!(frames, 500);
    assert_eq!(host.redraw_releases(), 0);
}

#[test]
fn test_synced_child_is_driven_by_parent() {
    let (engine, host) = setup();
    let parent = engine.create_timeline(TimelineOptions::new().duration(2000.0));
    let child = engine.create_timeline(TimelineOptions::new().duration(500.0).autoplay(false));
    let target = PropertyBag::new().with("x", 0.0).shared();
    child.add(&target, AnimationOptions::new().to("x", 10.0).duration(500.0), 0.0);
    parent.sync(&child, 1000.0).unwrap();

    for _ in 0..5 {
        host.frame(250.0);
    }

    assert_eq!(parent.current_time(), 1250.0);
    assert_eq!(child.current_time(), 250.0);
    assert_eq!(target.borrow().get("x"), Some(5.0));

    // The child never counts toward demand
    parent.pause();
    assert!(!host.is_continuous_redraw());
}

#[test]
fn test_callbacks_may_unregister_other_timelines() {
    let engine = Rc::new(Engine::new());
    let victim = engine.create_timeline(TimelineOptions::new());

    let handle = victim.clone();
    let weak_engine = Rc::downgrade(&engine);
    let killer = engine.create_timeline(TimelineOptions::new());
    killer.call(
        move || {
            if let Some(engine) = weak_engine.upgrade() {
                engine.unregister(&handle);
            }
        },
        100.0,
    );

    engine.update(100.0);
    engine.update(100.0);
    assert!(!engine.is_registered(&victim));
    assert!(victim.current_time() <= 100.0);
    assert_eq!(killer.current_time(), 200.0);
}

#[test]
fn test_detach_and_reattach() {
    let (engine, host) = setup();
    let timeline = engine.create_timeline(TimelineOptions::new());

    engine.detach();
    assert!(!engine.is_attached());
    assert!(!host.is_continuous_redraw());
    host.frame(100.0);
    assert_eq!(timeline.current_time(), 0.0);

    engine.attach(host.clone());
    engine.attach(host.clone());
    assert_eq!(host.tick_count(), 1);
    assert!(host.is_continuous_redraw());
    host.frame(100.0);
    assert_eq!(timeline.current_time(), 100.0);
}

#[test]
fn test_custom_render_loop() {
    #[derive(Default)]
    struct CountingLoop {
        ticks: Cell<u32>,
        requests: Cell<u32>,
    }

    impl RenderLoop for CountingLoop {
        fn register_frame_tick(&self, _callback: cadence_animation::FrameCallback) -> cadence_animation::FrameTickId {
            self.ticks.set(self.ticks.get() + 1);
            Default::default()
        }

        fn unregister_frame_tick(&self, _id: cadence_animation::FrameTickId) {
            self.ticks.set(self.ticks.get() - 1);
        }

        fn request_continuous_redraw(&self) {
            self.requests.set(self.requests.get() + 1);
        }

        fn release_continuous_redraw(&self) {}
    }

    let host = Rc::new(CountingLoop::default());
    let engine = Engine::new();
    engine.create_timeline(TimelineOptions::new());
    engine.attach(host.clone());

    assert_eq!(host.ticks.get(), 1);
    assert_eq!(host.requests.get(), 1);
    drop(engine);
    assert_eq!(host.ticks.get(), 0);
}

#[test]
fn test_config_file_seeds_options() {
    let path = std::env::temp_dir().join(format!("cadence-engine-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "[timeline]\nduration = 400.0\nloop = true\n\n[animation]\nduration = 200.0\nease = \"inQuad\"\n",
    )
    .unwrap();
    let config = EngineConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let engine = Engine::with_config(config);
    let target = PropertyBag::new().with("x", 0.0).shared();
    let timeline = engine.create_timeline(engine.timeline_options());
    timeline.add(&target, engine.animation_options().to("x", 100.0), 0.0);

    engine.update(100.0);
    assert_eq!(target.borrow().get("x"), Some(25.0));

    engine.update(400.0);
    assert!(timeline.is_playing());
    assert_eq!(timeline.current_time(), 100.0);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let result = EngineConfig::load("/nonexistent/cadence.toml");
    assert!(matches!(result, Err(cadence_animation::AnimationError::Io(_))));
}
