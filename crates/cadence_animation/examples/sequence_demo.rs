//! Sequence Demo
//!
//! Drives a small animation sequence from a headless render loop:
//! - A card slides in, then fades while a badge pulses three times
//! - A synced sub-timeline starts at the "settle" label
//! - The loop stops producing frames once nothing is animating
//!
//! Run with: RUST_LOG=cadence_animation=debug cargo run -p cadence_animation --example sequence_demo

use anyhow::Result;
use cadence_animation::{
    AnimationOptions, Easing, Engine, EngineConfig, HeadlessLoop, LoopMode, PropertyBag,
    TimelineOptions,
};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

const FRAME_MS: f64 = 1000.0 / 60.0;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let engine = Engine::with_config(config);
    let host = Rc::new(HeadlessLoop::new());
    engine.attach(host.clone());

    let card = PropertyBag::new().with("x", -200.0).with("opacity", 1.0).shared();
    let badge = PropertyBag::new().with("scale", 1.0).shared();
    let shadow = PropertyBag::new().with("blur", 0.0).shared();

    let sequence = engine.create_timeline(
        engine
            .timeline_options()
            .duration(1500.0)
            .on_complete(|| tracing::info!("sequence complete")),
    );
    sequence.add_label("settle", 900.0)
        .add(
            &card,
            AnimationOptions::new()
                .to("x", 0.0)
                .duration(600.0)
                .ease(Easing::EaseOutBack),
            0.0,
        )
        .add(
            &badge,
            AnimationOptions::new()
                .to("scale", 1.2)
                .duration(150.0)
                .ease("inOutSine")
                .loop_mode(LoopMode::Count(3))
                .alternate(true)
                .on_loop(|frame| tracing::info!("badge pulse at {:.0}ms", frame.current_time)),
            300.0,
        )
        .call(|| tracing::info!("card in place"), 600.0)
        .add(
            &card,
            AnimationOptions::new().to("opacity", 0.6).duration(400.0),
            "settle",
        );

    let sub = engine.create_timeline(TimelineOptions::new().duration(500.0).autoplay(false));
    sub.add(
        &shadow,
        AnimationOptions::new().to("blur", 12.0).duration(500.0).ease(Easing::EaseOutQuad),
        0.0,
    );
    sequence.sync(&sub, "settle")?;

    let mut frames = 0;
    while host.is_continuous_redraw() && frames < 600 {
        host.frame(FRAME_MS);
        frames += 1;

        if frames % 10 == 0 {
            tracing::info!(
                "t={:>6.1}ms card.x={:>7.2} card.opacity={:.2} badge.scale={:.3} shadow.blur={:.2}",
                sequence.current_time(),
                card.borrow().get("x").unwrap_or_default(),
                card.borrow().get("opacity").unwrap_or_default(),
                badge.borrow().get("scale").unwrap_or_default(),
                shadow.borrow().get("blur").unwrap_or_default(),
            );
        }
    }

    tracing::info!(
        "{} frames, {} redraw requests, {} releases",
        host.frame_count(),
        host.redraw_requests(),
        host.redraw_releases()
    );
    Ok(())
}
