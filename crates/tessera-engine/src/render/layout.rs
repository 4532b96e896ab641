//! Vertex buffer layout descriptors.

use std::collections::HashSet;

use super::BuildError;

/// Required alignment of vertex strides; attribute offsets need
/// `min(VERTEX_ALIGNMENT, format size)`.
pub const VERTEX_ALIGNMENT: u64 = 4;

/// One attribute: where the shader reads it, how it's encoded, where it sits in the vertex.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttr {
    pub location: u32,
    pub format: wgpu::VertexFormat,
    pub offset: u64,
}

/// Layout of one per-vertex buffer: ordered attributes plus the stride between vertices.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<VertexAttr>,
}

impl VertexLayout {
    /// Tightly packs `attrs` in order and derives offsets and stride.
    ///
    /// ```
    /// use tessera_engine::render::VertexLayout;
    ///
    /// let layout = VertexLayout::packed(&[
    ///     (0, wgpu::VertexFormat::Float32x2),
    ///     (1, wgpu::VertexFormat::Float32x3),
    /// ]);
    /// assert_eq!(layout.stride, 20);
    /// assert_eq!(layout.attributes[1].offset, 8);
    /// ```
    pub fn packed(attrs: &[(u32, wgpu::VertexFormat)]) -> Self {
        let mut offset = 0;
        let attributes = attrs
            .iter()
            .map(|&(location, format)| {
                let attr = VertexAttr {
                    location,
                    format,
                    offset,
                };
                offset += format.size();
                attr
            })
            .collect();

        Self {
            stride: offset,
            attributes,
        }
    }

    /// Checks internal consistency: stride/offset alignment, bounds, unique locations.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.attributes.is_empty() {
            return Err(BuildError::NoAttributes);
        }
        if self.stride % VERTEX_ALIGNMENT != 0 {
            return Err(BuildError::UnalignedStride {
                stride: self.stride,
            });
        }

        let mut seen = HashSet::new();
        for attr in &self.attributes {
            if !seen.insert(attr.location) {
                return Err(BuildError::DuplicateLocation {
                    location: attr.location,
                });
            }
            let size = attr.format.size();
            if attr.offset % VERTEX_ALIGNMENT.min(size) != 0 {
                return Err(BuildError::UnalignedAttribute {
                    location: attr.location,
                    offset: attr.offset,
                });
            }
            let end = attr.offset.checked_add(size).unwrap_or(u64::MAX);
            if end > self.stride {
                return Err(BuildError::AttributeOutOfBounds {
                    location: attr.location,
                    end,
                    stride: self.stride,
                });
            }
        }

        Ok(())
    }

    pub(crate) fn wgpu_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        self.attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: a.format,
                offset: a.offset,
                shader_location: a.location,
            })
            .collect()
    }
}
