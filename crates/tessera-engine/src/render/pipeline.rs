//! Declarative render pipeline description and its single build function.

use super::{BuildError, VertexLayout};

/// Primitive assembly mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Topology {
    TriangleList,
    LineList,
}

impl Topology {
    fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            Topology::LineList => wgpu::PrimitiveTopology::LineList,
        }
    }
}

/// Everything that varies between pipelines.
///
/// Fixed for every pipeline: alpha blending (see [`alpha_blend`]), one color
/// target, no depth/stencil, one sample, counter-clockwise front faces, no culling.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub label: String,
    pub vertex_entry: String,
    pub fragment_entry: String,
    /// One layout per vertex buffer slot, in slot order.
    pub vertex_layouts: Vec<VertexLayout>,
    pub topology: Topology,
    /// `Some` when draws go through an index buffer of this format.
    pub index_format: Option<wgpu::IndexFormat>,
}

impl PipelineConfig {
    /// Single-buffer pipeline with the conventional `vs_main`/`fs_main` entry points.
    pub fn new(label: impl Into<String>, layout: VertexLayout, topology: Topology) -> Self {
        Self {
            label: label.into(),
            vertex_entry: "vs_main".to_string(),
            fragment_entry: "fs_main".to_string(),
            vertex_layouts: vec![layout],
            topology,
            index_format: None,
        }
    }

    pub fn indexed(mut self, format: wgpu::IndexFormat) -> Self {
        self.index_format = Some(format);
        self
    }

    pub fn entry_points(mut self, vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        self.vertex_entry = vertex.into();
        self.fragment_entry = fragment.into();
        self
    }

    /// Checks every layout and the totals against `limits`.
    pub fn validate(&self, limits: &wgpu::Limits) -> Result<(), BuildError> {
        if self.vertex_layouts.len() > limits.max_vertex_buffers as usize {
            return Err(BuildError::TooManyVertexBuffers {
                requested: self.vertex_layouts.len(),
                limit: limits.max_vertex_buffers,
            });
        }

        let attribute_count: usize = self.vertex_layouts.iter().map(|l| l.attributes.len()).sum();
        if attribute_count > limits.max_vertex_attributes as usize {
            return Err(BuildError::TooManyAttributes {
                requested: attribute_count,
                limit: limits.max_vertex_attributes,
            });
        }

        for layout in &self.vertex_layouts {
            layout.validate()?;
            if layout.stride > u64::from(limits.max_vertex_buffer_array_stride) {
                return Err(BuildError::StrideExceedsLimit {
                    stride: layout.stride,
                    limit: limits.max_vertex_buffer_array_stride,
                });
            }
        }

        Ok(())
    }
}

/// Straight (non-premultiplied) alpha over for color; destination alpha kept.
pub fn alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::Zero,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// Compiled pipeline plus the parts of its config later stages check against.
pub struct Pipeline {
    raw: wgpu::RenderPipeline,
    vertex_layouts: Vec<VertexLayout>,
    index_format: Option<wgpu::IndexFormat>,
    topology: Topology,
}

impl Pipeline {
    pub fn raw(&self) -> &wgpu::RenderPipeline {
        &self.raw
    }

    pub fn vertex_layouts(&self) -> &[VertexLayout] {
        &self.vertex_layouts
    }

    pub fn index_format(&self) -> Option<wgpu::IndexFormat> {
        self.index_format
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }
}

/// Compiles `shader_source` (WGSL, passed through untouched) into a pipeline
/// rendering to `target_format`.
///
/// The config is validated against the device's actual limits first; nothing
/// is created when validation fails. Shader or pipeline errors reported by the
/// driver come back as [`BuildError::DriverRejected`].
pub fn create_pipeline(
    device: &wgpu::Device,
    shader_source: &str,
    config: &PipelineConfig,
    target_format: wgpu::TextureFormat,
) -> Result<Pipeline, BuildError> {
    config.validate(&device.limits())?;

    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(config.label.as_str()),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    });

    let attributes: Vec<Vec<wgpu::VertexAttribute>> = config
        .vertex_layouts
        .iter()
        .map(VertexLayout::wgpu_attributes)
        .collect();

    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = config
        .vertex_layouts
        .iter()
        .zip(&attributes)
        .map(|(layout, attrs)| wgpu::VertexBufferLayout {
            array_stride: layout.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: attrs,
        })
        .collect();

    let raw = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(config.label.as_str()),
        // No bind groups; let wgpu derive the (empty) layout.
        layout: None,

        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some(config.vertex_entry.as_str()),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(config.fragment_entry.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend: Some(alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: config.topology.to_wgpu(),
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },

        multiview_mask: None,
        cache: None,
    });

    if let Some(err) = pollster::block_on(scope.pop()) {
        log::error!("pipeline `{}` rejected by the driver: {err}", config.label);
        return Err(BuildError::DriverRejected {
            label: config.label.clone(),
            message: err.to_string(),
        });
    }

    log::debug!(
        "pipeline `{}` built: {:?}, {} vertex buffer(s), index {:?}",
        config.label,
        config.topology,
        config.vertex_layouts.len(),
        config.index_format
    );

    Ok(Pipeline {
        raw,
        vertex_layouts: config.vertex_layouts.clone(),
        index_format: config.index_format,
        topology: config.topology,
    })
}
