use bytemuck::Pod;

use super::buffer::{create_buffer, BufferKind, GpuBuffer};
use super::{BuildError, Pipeline};

/// Index data in one of the two formats the GPU accepts.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Indices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Indices {
    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            Indices::U16(_) => wgpu::IndexFormat::Uint16,
            Indices::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Indices::U16(v) => v.len(),
            Indices::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Indices::U16(v) => bytemuck::cast_slice(v),
            Indices::U32(v) => bytemuck::cast_slice(v),
        }
    }

    fn max(&self) -> Option<u32> {
        match self {
            Indices::U16(v) => v.iter().copied().max().map(u32::from),
            Indices::U32(v) => v.iter().copied().max(),
        }
    }
}

/// The single draw call a frame issues.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawCall {
    Draw { vertex_count: u32, instance_count: u32 },
    DrawIndexed { index_count: u32, instance_count: u32 },
}

/// CPU-side geometry: raw vertex bytes with their stride, plus optional indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    vertices: Vec<u8>,
    stride: u64,
    indices: Option<Indices>,
}

impl Geometry {
    /// Geometry from typed vertices; the stride is `size_of::<V>()`.
    pub fn new<V: Pod>(vertices: &[V]) -> Self {
        Self {
            vertices: bytemuck::cast_slice(vertices).to_vec(),
            stride: std::mem::size_of::<V>() as u64,
            indices: None,
        }
    }

    /// Geometry from pre-encoded vertex bytes.
    pub fn from_bytes(vertices: Vec<u8>, stride: u64) -> Self {
        Self {
            vertices,
            stride,
            indices: None,
        }
    }

    pub fn with_indices(mut self, indices: Indices) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        &self.vertices
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn indices(&self) -> Option<&Indices> {
        self.indices.as_ref()
    }

    pub fn index_format(&self) -> Option<wgpu::IndexFormat> {
        self.indices.as_ref().map(Indices::format)
    }

    /// Number of whole vertices in the payload.
    pub fn vertex_count(&self) -> Result<u32, BuildError> {
        let len = self.vertices.len() as u64;
        if len == 0 {
            return Err(BuildError::EmptyPayload);
        }
        if self.stride == 0 || len % self.stride != 0 {
            return Err(BuildError::PartialVertex {
                len,
                stride: self.stride,
            });
        }
        to_u32(len / self.stride)
    }

    /// Derives the draw call: `Draw` over every vertex, or `DrawIndexed` over
    /// every index. Always one instance.
    pub fn draw_call(&self) -> Result<DrawCall, BuildError> {
        let vertex_count = self.vertex_count()?;

        let Some(indices) = &self.indices else {
            return Ok(DrawCall::Draw {
                vertex_count,
                instance_count: 1,
            });
        };

        if indices.is_empty() {
            return Err(BuildError::EmptyPayload);
        }
        if let Some(index) = indices.max().filter(|&i| i >= vertex_count) {
            return Err(BuildError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        Ok(DrawCall::DrawIndexed {
            index_count: to_u32(indices.len() as u64)?,
            instance_count: 1,
        })
    }

    /// Checks that this geometry can be drawn with `pipeline`.
    pub fn check_compatible(&self, pipeline: &Pipeline) -> Result<(), BuildError> {
        let layout = pipeline
            .vertex_layouts()
            .first()
            .ok_or(BuildError::MissingVertexLayout)?;

        if layout.stride != self.stride {
            return Err(BuildError::StrideMismatch {
                pipeline: layout.stride,
                geometry: self.stride,
            });
        }

        if pipeline.index_format() != self.index_format() {
            return Err(BuildError::IndexFormatMismatch {
                pipeline: pipeline.index_format(),
                geometry: self.index_format(),
            });
        }

        Ok(())
    }
}

fn to_u32(count: u64) -> Result<u32, BuildError> {
    u32::try_from(count).map_err(|_| BuildError::CountOverflow { count })
}

/// Uploaded geometry, ready to bind.
pub struct Mesh {
    vertices: GpuBuffer,
    indices: Option<(GpuBuffer, wgpu::IndexFormat)>,
    draw: DrawCall,
}

impl Mesh {
    /// Validates `geometry` against `pipeline`, then uploads its buffers.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        geometry: &Geometry,
        pipeline: &Pipeline,
    ) -> Result<Self, BuildError> {
        geometry.check_compatible(pipeline)?;
        let draw = geometry.draw_call()?;

        let vertices = create_buffer(
            device,
            queue,
            "tessera vertices",
            geometry.vertex_bytes(),
            BufferKind::Vertex,
        )?;

        let indices = match geometry.indices() {
            Some(indices) => Some((
                create_buffer(
                    device,
                    queue,
                    "tessera indices",
                    indices.as_bytes(),
                    BufferKind::Index,
                )?,
                indices.format(),
            )),
            None => None,
        };

        Ok(Self {
            vertices,
            indices,
            draw,
        })
    }

    pub fn vertex_buffer(&self) -> &GpuBuffer {
        &self.vertices
    }

    pub fn index_buffer(&self) -> Option<(&GpuBuffer, wgpu::IndexFormat)> {
        self.indices.as_ref().map(|(buffer, format)| (buffer, *format))
    }

    pub fn draw_call(&self) -> DrawCall {
        self.draw
    }
}
