use std::fmt;

/// Initialization parameters for the GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Backends the instance may pick adapters from.
    pub backends: wgpu::Backends,

    /// Adapter selection hint.
    pub power_preference: wgpu::PowerPreference,

    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    ///
    /// FIFO is the only mode every surface is required to support; other modes
    /// fall back to it.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Capability floors the device must satisfy.
    pub required_limits: RequiredLimits,

    /// Desired maximum frame latency for the surface (a hint).
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: RequiredLimits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

/// Exact capability floors declared in the device descriptor.
///
/// The device is created with precisely these values, so anything that needs
/// more (a second vertex buffer, a wider stride) is rejected by validation
/// instead of silently working on generous hardware.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RequiredLimits {
    pub max_vertex_attributes: u32,
    pub max_vertex_buffers: u32,
    pub max_buffer_size: u64,
    pub max_vertex_buffer_array_stride: u32,
}

impl Default for RequiredLimits {
    fn default() -> Self {
        Self {
            max_vertex_attributes: 2,
            max_vertex_buffers: 1,
            max_buffer_size: 64 * 1024,
            max_vertex_buffer_array_stride: 64,
        }
    }
}

/// One limit the adapter cannot provide.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LimitShortfall {
    pub name: &'static str,
    pub required: u64,
    pub supported: u64,
}

impl fmt::Display for LimitShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: required {}, adapter supports {}",
            self.name, self.required, self.supported
        )
    }
}

impl RequiredLimits {
    /// Builds the `wgpu::Limits` sent with the device request.
    ///
    /// Everything not named here uses the downlevel defaults, which any adapter
    /// wgpu exposes can satisfy.
    pub fn to_wgpu(&self) -> wgpu::Limits {
        wgpu::Limits {
            max_vertex_attributes: self.max_vertex_attributes,
            max_vertex_buffers: self.max_vertex_buffers,
            max_buffer_size: self.max_buffer_size,
            max_vertex_buffer_array_stride: self.max_vertex_buffer_array_stride,
            ..wgpu::Limits::downlevel_defaults()
        }
    }

    /// Lists every floor that `supported` falls short of. Empty means satisfiable.
    pub fn unmet_by(&self, supported: &wgpu::Limits) -> Vec<LimitShortfall> {
        let checks = [
            (
                "max_vertex_attributes",
                u64::from(self.max_vertex_attributes),
                u64::from(supported.max_vertex_attributes),
            ),
            (
                "max_vertex_buffers",
                u64::from(self.max_vertex_buffers),
                u64::from(supported.max_vertex_buffers),
            ),
            ("max_buffer_size", self.max_buffer_size, supported.max_buffer_size),
            (
                "max_vertex_buffer_array_stride",
                u64::from(self.max_vertex_buffer_array_stride),
                u64::from(supported.max_vertex_buffer_array_stride),
            ),
        ];

        checks
            .into_iter()
            .filter(|&(_, required, supported)| required > supported)
            .map(|(name, required, supported)| LimitShortfall {
                name,
                required,
                supported,
            })
            .collect()
    }
}
