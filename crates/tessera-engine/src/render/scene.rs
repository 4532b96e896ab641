use std::borrow::Cow;

use anyhow::{Context, Result};

use crate::frame::PassPlan;

use super::{create_pipeline, Geometry, Mesh, Pipeline, PipelineConfig};

/// Static description of what a run draws.
#[derive(Debug, Clone)]
pub struct SceneDesc {
    /// WGSL source containing both entry points named in `pipeline`.
    pub shader: Cow<'static, str>,
    pub pipeline: PipelineConfig,
    pub geometry: Geometry,
    pub clear_color: wgpu::Color,
}

/// GPU resources for a scene, built once and shared read-only by every frame.
pub struct GpuScene {
    pipeline: Pipeline,
    mesh: Mesh,
    plan: PassPlan,
}

impl GpuScene {
    /// Compiles the pipeline for `target_format` and uploads the geometry.
    pub fn build(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target_format: wgpu::TextureFormat,
        desc: &SceneDesc,
    ) -> Result<Self> {
        let pipeline = create_pipeline(device, &desc.shader, &desc.pipeline, target_format)
            .with_context(|| format!("failed to build pipeline `{}`", desc.pipeline.label))?;

        let mesh = Mesh::upload(device, queue, &desc.geometry, &pipeline)
            .context("failed to upload scene geometry")?;

        let plan = PassPlan {
            clear: desc.clear_color,
            draw: mesh.draw_call(),
        };
        log::info!("scene `{}` ready: {:?}", desc.pipeline.label, plan.draw);

        Ok(Self {
            pipeline,
            mesh,
            plan,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn plan(&self) -> &PassPlan {
        &self.plan
    }
}
