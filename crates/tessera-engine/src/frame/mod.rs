//! Per-tick frame execution.
//!
//! [`FrameExecutor`] owns the ordering rules (acquire → record → submit →
//! present → tick, or skip); [`FrameBackend`] is the seam to the driver, with
//! [`SurfaceFrameBackend`] as the wgpu implementation.

mod backend;
mod executor;

pub use backend::SurfaceFrameBackend;
pub use executor::{FrameBackend, FrameExecutor, FrameOutcome, FramePhase, FrameStats, PassPlan};
