use crate::device::{FrameError, Gpu, SurfaceView};
use crate::render::{DrawCall, GpuScene};

use super::executor::{FrameBackend, PassPlan};

/// Frame backend that draws a [`GpuScene`] to the window surface.
pub struct SurfaceFrameBackend<'a, 'w> {
    gpu: &'a mut Gpu<'w>,
    scene: &'a GpuScene,
}

impl<'a, 'w> SurfaceFrameBackend<'a, 'w> {
    pub fn new(gpu: &'a mut Gpu<'w>, scene: &'a GpuScene) -> Self {
        Self { gpu, scene }
    }
}

impl FrameBackend for SurfaceFrameBackend<'_, '_> {
    type View = SurfaceView;
    type Commands = wgpu::CommandBuffer;

    fn acquire_view(&mut self) -> Result<Option<SurfaceView>, FrameError> {
        self.gpu.acquire_next_view()
    }

    fn record(
        &mut self,
        view: &SurfaceView,
        plan: &PassPlan,
    ) -> Result<wgpu::CommandBuffer, FrameError> {
        let mesh = self.scene.mesh();
        if plan.draw != mesh.draw_call() {
            return Err(FrameError::PlanMismatch {
                planned: plan.draw,
                mesh: mesh.draw_call(),
            });
        }

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tessera frame encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tessera main pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(plan.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(self.scene.pipeline().raw());
            pass.set_vertex_buffer(0, mesh.vertex_buffer().raw().slice(..));

            match plan.draw {
                DrawCall::Draw {
                    vertex_count,
                    instance_count,
                } => pass.draw(0..vertex_count, 0..instance_count),
                DrawCall::DrawIndexed {
                    index_count,
                    instance_count,
                } => {
                    // An indexed draw call only comes from a mesh with indices.
                    if let Some((buffer, format)) = mesh.index_buffer() {
                        pass.set_index_buffer(buffer.raw().slice(..), format);
                    }
                    pass.draw_indexed(0..index_count, 0, 0..instance_count);
                }
            }
        }

        Ok(encoder.finish())
    }

    fn submit(&mut self, commands: wgpu::CommandBuffer) {
        self.gpu.queue().submit(std::iter::once(commands));
    }

    fn present(&mut self, view: SurfaceView) {
        self.gpu.present(view);
    }

    fn tick(&mut self) {
        self.gpu.tick();
    }
}
