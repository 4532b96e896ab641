use std::fmt;

use crate::render::DrawCall;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

impl SurfaceErrorAction {
    /// Classifies a `wgpu::SurfaceError`.
    pub fn classify(err: &wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => Self::Reconfigured,
            wgpu::SurfaceError::OutOfMemory => Self::Fatal,
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => Self::SkipFrame,
        }
    }
}

/// Frame-level failure that must end the run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FrameError {
    /// The surface could not provide a texture and cannot recover.
    SurfaceFatal(String),
    /// The pass plan asks for a different draw than the bound mesh provides.
    PlanMismatch { planned: DrawCall, mesh: DrawCall },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::SurfaceFatal(msg) => write!(f, "fatal surface error: {msg}"),
            FrameError::PlanMismatch { planned, mesh } => {
                write!(f, "pass plan draws {planned:?} but the mesh provides {mesh:?}")
            }
        }
    }
}

impl std::error::Error for FrameError {}
