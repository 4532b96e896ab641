//! Tessera engine crate.
//!
//! A minimal wgpu harness: negotiates one adapter/device, manages a window
//! surface, builds write-once GPU resources from declarative descriptors and
//! submits one render pass per frame.

pub mod device;
pub mod frame;
pub mod logging;
pub mod render;
pub mod window;

pub use device::{Gpu, GpuInit, RequiredLimits};
pub use frame::{FrameExecutor, FrameOutcome, FrameStats, PassPlan};
pub use logging::{init_logging, LoggingConfig};
pub use render::{Geometry, Indices, PipelineConfig, SceneDesc, Topology, VertexLayout};
pub use window::{Runtime, RuntimeConfig};
