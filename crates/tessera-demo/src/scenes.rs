//! Built-in demo scenes.

use anyhow::{bail, Result};
use bytemuck::{Pod, Zeroable};
use tessera_engine::{Geometry, Indices, PipelineConfig, SceneDesc, Topology, VertexLayout};

const SHADER: &str = include_str!("../shaders/colored.wgsl");

const CLEAR: wgpu::Color = wgpu::Color {
    r: 0.9,
    g: 0.1,
    b: 0.2,
    a: 1.0,
};

/// Position + color, matching `colored.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 2],
    pub color: [f32; 3],
}

const fn vertex(x: f32, y: f32, color: [f32; 3]) -> Vertex {
    Vertex { pos: [x, y], color }
}

fn layout() -> VertexLayout {
    VertexLayout::packed(&[
        (0, wgpu::VertexFormat::Float32x2),
        (1, wgpu::VertexFormat::Float32x3),
    ])
}

/// Names accepted on the command line.
pub const NAMES: &[&str] = &["triangles", "quad", "lines"];

pub fn by_name(name: &str) -> Result<SceneDesc> {
    match name {
        "triangles" => Ok(triangles()),
        "quad" => Ok(quad()),
        "lines" => Ok(lines()),
        other => bail!("unknown scene `{other}` (expected one of: {})", NAMES.join(", ")),
    }
}

/// Two separate triangles, no index buffer.
fn triangles() -> SceneDesc {
    const ORANGE: [f32; 3] = [1.0, 0.5, 0.0];
    const TEAL: [f32; 3] = [0.0, 0.7, 0.7];

    let vertices = [
        vertex(-0.5, -0.3, ORANGE),
        vertex(0.5, -0.3, ORANGE),
        vertex(0.0, 0.7, ORANGE),
        vertex(-0.55, -0.25, TEAL),
        vertex(-0.05, 0.75, TEAL),
        vertex(-0.95, 0.75, TEAL),
    ];

    SceneDesc {
        shader: SHADER.into(),
        pipeline: PipelineConfig::new("triangles", layout(), Topology::TriangleList),
        geometry: Geometry::new(&vertices),
        clear_color: CLEAR,
    }
}

/// Four corners shared by two triangles through a 16-bit index buffer.
fn quad() -> SceneDesc {
    let vertices = [
        vertex(-0.5, -0.5, [1.0, 0.0, 0.0]),
        vertex(0.5, -0.5, [0.0, 1.0, 0.0]),
        vertex(0.5, 0.5, [0.0, 0.0, 1.0]),
        vertex(-0.5, 0.5, [1.0, 1.0, 0.0]),
    ];
    let indices = Indices::U16(vec![0, 1, 2, 0, 2, 3]);

    SceneDesc {
        shader: SHADER.into(),
        pipeline: PipelineConfig::new("quad", layout(), Topology::TriangleList)
            .indexed(wgpu::IndexFormat::Uint16),
        geometry: Geometry::new(&vertices).with_indices(indices),
        clear_color: CLEAR,
    }
}

/// Outline of a square as a line list.
fn lines() -> SceneDesc {
    const WHITE: [f32; 3] = [1.0, 1.0, 1.0];
    let corners = [(-0.6, -0.6), (0.6, -0.6), (0.6, 0.6), (-0.6, 0.6)];

    let vertices: Vec<Vertex> = (0..corners.len())
        .flat_map(|i| {
            let (ax, ay) = corners[i];
            let (bx, by) = corners[(i + 1) % corners.len()];
            [vertex(ax, ay, WHITE), vertex(bx, by, WHITE)]
        })
        .collect();

    SceneDesc {
        shader: SHADER.into(),
        pipeline: PipelineConfig::new("lines", layout(), Topology::LineList),
        geometry: Geometry::new(&vertices),
        clear_color: CLEAR,
    }
}
