//! Cadence Animation System
//!
//! Eased property tweens, nested timelines, and frame scheduling.
//!
//! # Features
//!
//! - **Easing**: Named curves (quad, cubic, expo, back, bounce, elastic, ...) and cubic beziers
//! - **Animation Items**: Move numeric fields of any [`Animatable`] target toward end values
//! - **Timelines**: Sequence animations and callbacks on a virtual clock, loop, and nest
//! - **Frame-rate independent**: One large tick and many small ones reach the same state
//! - **Engine**: Ticks top-level timelines and drives host redraw demand
//!
//! # Example
//!
//! ```rust
//! use cadence_animation::{AnimationOptions, Easing, Engine, PropertyBag};
//!
//! let engine = Engine::new();
//! let sprite = PropertyBag::new().with("x", 0.0).shared();
//!
//! let timeline = engine.create_timeline(engine.timeline_options().duration(1000.0));
//! timeline.add(
//!     &sprite,
//!     AnimationOptions::new().to("x", 100.0).duration(1000.0).ease(Easing::Linear),
//!     0.0,
//! );
//!
//! engine.update(500.0);
//! assert_eq!(sprite.borrow().get("x"), Some(50.0));
//! ```

pub mod animation;
pub mod callback;
pub mod config;
pub mod easing;
pub mod engine;
pub mod error;
pub mod target;
pub mod timeline;

pub use animation::{
    AnimationCallback, AnimationFrame, AnimationItem, AnimationOptions, LoopMode,
    DEFAULT_DURATION_MS, RESERVED_KEYS,
};
pub use callback::{CallbackItem, TimelineCallback};
pub use config::{AnimationDefaults, EngineConfig, TimelineDefaults};
pub use easing::Easing;
pub use engine::Engine;
pub use error::{AnimationError, Result};
pub use target::{Animatable, IntoTargets, PropertyBag, SharedTarget, TargetRef};
pub use timeline::{
    StartAt, StateListener, StateListenerId, Timeline, TimelineHandle, TimelineItem, TimelineKey,
    TimelineOptions, TimelineStatus,
};

// Host render-loop contract, re-exported for convenience
pub use cadence_core::{FrameCallback, FrameTickId, HeadlessLoop, RenderLoop};
