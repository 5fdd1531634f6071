//! Time subsystem.
//!
//! One `FrameClock` per window; `tick()` once per presented frame yields the
//! `FrameTime` that drives the simulation step.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
