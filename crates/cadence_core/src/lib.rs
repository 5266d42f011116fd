//! Cadence Core Runtime
//!
//! This crate defines the boundary between the Cadence animation engine and
//! whatever render loop hosts it:
//!
//! - **Frame Ticks**: hosts call registered callbacks once per frame with the
//!   elapsed time in milliseconds
//! - **Redraw Demand**: the engine asks the host to keep producing frames while
//!   something is animating, and releases that request when it goes idle
//! - **Headless Loop**: an in-process frame pump for tests, demos and tools
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{HeadlessLoop, RenderLoop};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let host = HeadlessLoop::new();
//! let elapsed = Rc::new(Cell::new(0.0));
//! let sink = elapsed.clone();
//!
//! let id = host.register_frame_tick(Rc::new(move |dt: f64| sink.set(sink.get() + dt)));
//! host.frame(16.0);
//! host.frame(16.0);
//! assert_eq!(elapsed.get(), 32.0);
//!
//! host.unregister_frame_tick(id);
//! host.frame(16.0);
//! assert_eq!(elapsed.get(), 32.0);
//! ```

pub mod frame;

pub use frame::{FrameCallback, FrameTickId, HeadlessLoop, RenderLoop};
