use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::device::{ConfigureOutcome, Gpu, GpuInit};
use crate::frame::{FrameExecutor, FrameOutcome, FrameStats, SurfaceFrameBackend};
use crate::render::{GpuScene, SceneDesc};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub resizable: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "tessera".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
            resizable: true,
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window, builds `scene` on its device and renders it every
    /// redraw until the window closes.
    ///
    /// Returns the first setup failure, fatal surface error or device loss.
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit, scene: SceneDesc) -> Result<FrameStats> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, scene);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(state.stats),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

/// Everything that exists only while the window is open.
struct Session {
    id: WindowId,
    entry: WindowEntry,
    scene: GpuScene,
    executor: FrameExecutor,
}

struct AppState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    scene: SceneDesc,

    session: Option<Session>,
    failure: Option<anyhow::Error>,
    stats: FrameStats,
    started: bool,
}

impl AppState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, scene: SceneDesc) -> Self {
        Self {
            config,
            gpu_init,
            scene,
            session: None,
            failure: None,
            stats: FrameStats::default(),
            started: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        if self.failure.is_none() {
            self.failure = Some(err);
        }
        event_loop.exit();
    }

    fn create_session(&self, event_loop: &ActiveEventLoop) -> Result<Session> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_resizable(self.config.resizable);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        let id = window.id();

        let gpu_init = &self.gpu_init;
        let entry = WindowEntryTryBuilder {
            window,
            gpu_builder: |w| Gpu::new(w, gpu_init),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        let scene = entry
            .with_gpu(|gpu| GpuScene::build(gpu.device(), gpu.queue(), gpu.surface_format(), &self.scene))?;

        Ok(Session {
            id,
            entry,
            scene,
            executor: FrameExecutor::new(),
        })
    }

    fn resize(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let size = session.entry.with_window(|w| w.inner_size());
        let outcome = session.entry.with_gpu_mut(|gpu| gpu.resize(size));
        if outcome == ConfigureOutcome::Deferred {
            log::debug!("window has zero extent; rendering paused");
        }
        session.entry.with_window(|w| w.request_redraw());
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(Session {
            entry,
            scene,
            executor,
            ..
        }) = self.session.as_mut()
        else {
            return;
        };

        let frame = entry.with_gpu_mut(|gpu| {
            let mut backend = SurfaceFrameBackend::new(gpu, scene);
            executor.run_frame(&mut backend, scene.plan())
        });

        let lost = entry.with_gpu_mut(|gpu| gpu.device_lost().cloned());

        let err = match (frame, lost) {
            (_, Some(lost)) => anyhow!("GPU device lost ({}): {}", lost.reason, lost.message),
            (Err(err), None) => anyhow::Error::new(err),
            (Ok(FrameOutcome::Presented | FrameOutcome::Skipped), None) => return,
        };
        self.fail(event_loop, err);
    }

    fn shutdown(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        self.stats = session.executor.stats();
        let uncaptured = session.entry.with_gpu(|gpu| gpu.uncaptured_errors());
        session.entry.with_gpu_mut(|gpu| gpu.terminate());

        log::info!(
            "frames: {} presented, {} skipped; uncaptured GPU errors: {}",
            self.stats.presented,
            self.stats.skipped,
            uncaptured
        );
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Single window; a second `resumed` (mobile/web) keeps the existing one.
        if self.started {
            return;
        }
        self.started = true;

        match self.create_session(event_loop) {
            Ok(session) => {
                session.entry.with_window(|w| w.request_redraw());
                self.session = Some(session);
            }
            Err(err) => self.fail(event_loop, err.context("startup failed")),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        if let Some(session) = &self.session {
            session.entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.session.as_ref().map(|s| s.id) != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("window close requested");
                event_loop.exit();
            }

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => self.resize(),

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}
