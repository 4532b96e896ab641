use std::fmt;

/// Descriptor mismatch caught before any creation call reaches the driver, or a
/// creation call the driver rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// A vertex layout declares no attributes.
    NoAttributes,
    /// Vertex stride is not a multiple of the 4-byte vertex alignment.
    UnalignedStride { stride: u64 },
    /// An attribute reads past the end of its vertex.
    AttributeOutOfBounds { location: u32, end: u64, stride: u64 },
    /// An attribute offset is not aligned to `min(4, format size)`.
    UnalignedAttribute { location: u32, offset: u64 },
    /// Two attributes share a shader location.
    DuplicateLocation { location: u32 },
    /// More vertex buffer layouts than the device allows.
    TooManyVertexBuffers { requested: usize, limit: u32 },
    /// More vertex attributes (all layouts together) than the device allows.
    TooManyAttributes { requested: usize, limit: u32 },
    /// A layout stride wider than the device allows.
    StrideExceedsLimit { stride: u64, limit: u32 },
    /// Geometry needs a vertex buffer but the pipeline declares none.
    MissingVertexLayout,
    /// Geometry stride differs from the stride the pipeline was built with.
    StrideMismatch { pipeline: u64, geometry: u64 },
    /// Indexed geometry on a non-indexed pipeline or the reverse, or differing formats.
    IndexFormatMismatch {
        pipeline: Option<wgpu::IndexFormat>,
        geometry: Option<wgpu::IndexFormat>,
    },
    /// Buffer payload is empty.
    EmptyPayload,
    /// Vertex payload length is not a whole number of vertices.
    PartialVertex { len: u64, stride: u64 },
    /// An index refers past the last vertex.
    IndexOutOfRange { index: u32, vertex_count: u32 },
    /// Allocation larger than the device's `max_buffer_size`.
    BufferTooLarge { size: u64, limit: u64 },
    /// Element count does not fit a draw call argument.
    CountOverflow { count: u64 },
    /// The driver's validation rejected a shader module or pipeline.
    DriverRejected { label: String, message: String },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::NoAttributes => f.write_str("vertex layout has no attributes"),
            BuildError::UnalignedStride { stride } => {
                write!(f, "vertex stride {stride} is not a multiple of 4")
            }
            BuildError::AttributeOutOfBounds { location, end, stride } => write!(
                f,
                "attribute @location({location}) ends at byte {end}, past stride {stride}"
            ),
            BuildError::UnalignedAttribute { location, offset } => {
                write!(f, "attribute @location({location}) offset {offset} is not a multiple of 4")
            }
            BuildError::DuplicateLocation { location } => {
                write!(f, "shader location {location} used by more than one attribute")
            }
            BuildError::TooManyVertexBuffers { requested, limit } => write!(
                f,
                "pipeline uses {requested} vertex buffers, device allows {limit}"
            ),
            BuildError::TooManyAttributes { requested, limit } => write!(
                f,
                "pipeline uses {requested} vertex attributes, device allows {limit}"
            ),
            BuildError::StrideExceedsLimit { stride, limit } => {
                write!(f, "vertex stride {stride} exceeds device limit {limit}")
            }
            BuildError::MissingVertexLayout => {
                f.write_str("pipeline declares no vertex buffer layout")
            }
            BuildError::StrideMismatch { pipeline, geometry } => write!(
                f,
                "geometry stride {geometry} does not match pipeline stride {pipeline}"
            ),
            BuildError::IndexFormatMismatch { pipeline, geometry } => write!(
                f,
                "index format mismatch: pipeline {pipeline:?}, geometry {geometry:?}"
            ),
            BuildError::EmptyPayload => f.write_str("buffer payload is empty"),
            BuildError::PartialVertex { len, stride } => write!(
                f,
                "vertex payload of {len} bytes is not a multiple of stride {stride}"
            ),
            BuildError::IndexOutOfRange { index, vertex_count } => write!(
                f,
                "index {index} out of range for {vertex_count} vertices"
            ),
            BuildError::BufferTooLarge { size, limit } => {
                write!(f, "buffer of {size} bytes exceeds device limit {limit}")
            }
            BuildError::CountOverflow { count } => {
                write!(f, "element count {count} does not fit in u32")
            }
            BuildError::DriverRejected { label, message } => {
                write!(f, "driver rejected `{label}`: {message}")
            }
        }
    }
}

impl std::error::Error for BuildError {}
