//! Resource building: vertex layouts, pipelines, write-once buffers, meshes.
//!
//! Every descriptor is validated here before anything reaches the driver;
//! mismatches come back as [`BuildError`].

mod buffer;
mod error;
mod layout;
mod mesh;
mod pipeline;
mod scene;

pub use buffer::{aligned_size, create_buffer, read_back, BufferKind, GpuBuffer, READBACK_TIMEOUT};
pub use error::BuildError;
pub use layout::{VertexAttr, VertexLayout, VERTEX_ALIGNMENT};
pub use mesh::{DrawCall, Geometry, Indices, Mesh};
pub use pipeline::{alpha_blend, create_pipeline, Pipeline, PipelineConfig, Topology};
pub use scene::{GpuScene, SceneDesc};
