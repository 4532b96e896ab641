use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::negotiate::{self, GpuDevice};
use super::{ConfigureOutcome, DeviceLost, FrameError, GpuInit, SurfaceManager, SurfaceView};

/// Owns the wgpu objects for one window.
///
/// This type is the low-level rendering context:
/// - creates the Instance and the window Surface
/// - negotiates Adapter/Device/Queue (exactly once)
/// - configures the surface and acquires/presents one view per frame
pub struct Gpu<'w> {
    /// Kept alive for the lifetime of everything created from it.
    _instance: wgpu::Instance,

    /// Negotiated adapter, device, queue and event observers.
    negotiated: GpuDevice,

    /// Surface bound to the window.
    surface: SurfaceManager<'w>,

    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,
}

impl<'w> Gpu<'w> {
    /// Creates a GPU context bound to a window.
    ///
    /// Blocks while the adapter and device requests complete.
    pub fn new(window: &'w Window, init: &GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        // Surface lifetime is tied to `window` via `'w`.
        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let negotiated = negotiate::negotiate(&instance, init, Some(&surface))?;

        let surface = SurfaceManager::new(
            surface,
            &negotiated.adapter,
            &negotiated.device,
            init,
            size,
        )
        .context("failed to configure surface")?;

        log::info!(
            "surface ready: {}x{} {:?}",
            size.width,
            size.height,
            surface.format()
        );

        Ok(Self {
            _instance: instance,
            negotiated,
            surface,
            size,
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface.format()
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.negotiated.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.negotiated.queue
    }

    pub fn surface(&self) -> &SurfaceManager<'w> {
        &self.surface
    }

    /// Reconfigures the surface after a resize.
    ///
    /// A 0x0 size (minimized window) defers configuration; frames are skipped
    /// until a real size arrives.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) -> ConfigureOutcome {
        self.size = new_size;
        self.surface.configure(&self.negotiated.device, new_size)
    }

    /// Acquires this frame's drawable, or `None` to skip the frame.
    pub fn acquire_next_view(&mut self) -> std::result::Result<Option<SurfaceView>, FrameError> {
        self.surface.acquire_next_view(&self.negotiated.device)
    }

    pub fn present(&mut self, view: SurfaceView) {
        self.surface.present(view);
    }

    /// Lets the driver make progress and fire pending callbacks. Never blocks.
    pub fn tick(&self) {
        if let Err(err) = self.negotiated.device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll failed: {err}");
        }
    }

    /// Reports a lost device once the driver has signalled it.
    pub fn device_lost(&mut self) -> Option<&DeviceLost> {
        self.negotiated.events.poll_lost()
    }

    pub fn uncaptured_errors(&self) -> u64 {
        self.negotiated.events.uncaptured_errors()
    }

    /// Releases the surface configuration at shutdown.
    pub fn terminate(&mut self) {
        self.surface.terminate();
    }
}
