//! GPU device + surface management.
//!
//! This module is responsible for:
//! - negotiating the wgpu Adapter/Device/Queue behind a blocking façade
//! - observing spontaneous device events (lost device, uncaptured errors)
//! - creating & configuring the Surface and handing out one view per frame

mod error;
mod events;
mod gpu;
mod init;
pub mod negotiate;
mod surface;

pub use error::{FrameError, SurfaceErrorAction};
pub use events::{DeviceEvents, DeviceLost};
pub use gpu::Gpu;
pub use init::{GpuInit, LimitShortfall, RequiredLimits};
pub use negotiate::{DeviceRequests, GpuDevice, InstanceRequests};
pub use surface::{
    ConfigureOutcome, SurfaceKey, SurfaceManager, SurfaceState, SurfaceTracker, SurfaceView,
    ViewSlot,
};
