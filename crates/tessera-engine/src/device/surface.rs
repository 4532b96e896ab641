use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use super::{FrameError, GpuInit, SurfaceErrorAction};

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if caps.formats.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(caps.formats[0])
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

pub(crate) fn choose_present_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: wgpu::PresentMode,
) -> wgpu::PresentMode {
    if caps.present_modes.contains(&requested) {
        requested
    } else {
        log::warn!("present mode {requested:?} unsupported; falling back to Fifo");
        wgpu::PresentMode::Fifo
    }
}

/// Lifecycle of a surface's configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceState {
    Unconfigured,
    Configured,
    /// Released on shutdown; never configured again.
    Terminated,
}

/// What a configure request turned into.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConfigureOutcome {
    /// The driver was (re)configured.
    Applied,
    /// Same format/size/present mode as the active configuration; nothing issued.
    Unchanged,
    /// Zero-sized extent (e.g. minimized window); frames are skipped until a
    /// non-zero size arrives.
    Deferred,
}

/// Identity of a surface configuration. Configuring twice with the same key is a no-op.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceKey {
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
    pub present_mode: wgpu::PresentMode,
}

/// Claim on the single view a surface hands out. Dropping it frees the slot,
/// whether or not the view was presented.
#[derive(Debug)]
pub struct ViewSlot(Arc<AtomicBool>);

impl Drop for ViewSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Driver-free bookkeeping for [`SurfaceManager`].
///
/// Owns the state machine, configure idempotency and the one-live-view rule so
/// they can be checked without a GPU.
#[derive(Debug)]
pub struct SurfaceTracker {
    state: SurfaceState,
    active: Option<SurfaceKey>,
    deferred: bool,
    view_live: Arc<AtomicBool>,
}

impl Default for SurfaceTracker {
    fn default() -> Self {
        Self {
            state: SurfaceState::Unconfigured,
            active: None,
            deferred: false,
            view_live: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SurfaceTracker {
    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Decides whether `key` must be sent to the driver and records the result.
    pub fn configure(&mut self, key: SurfaceKey) -> ConfigureOutcome {
        if self.state == SurfaceState::Terminated {
            return ConfigureOutcome::Unchanged;
        }
        if key.width == 0 || key.height == 0 {
            self.deferred = true;
            return ConfigureOutcome::Deferred;
        }

        self.deferred = false;
        if self.state == SurfaceState::Configured && self.active == Some(key) {
            return ConfigureOutcome::Unchanged;
        }

        self.active = Some(key);
        self.state = SurfaceState::Configured;
        ConfigureOutcome::Applied
    }

    /// Forgets the active key so the next configure reaches the driver again.
    pub fn invalidate(&mut self) {
        if self.state == SurfaceState::Configured {
            self.active = None;
            self.state = SurfaceState::Unconfigured;
        }
    }

    /// Claims the single view slot, or `None` when acquisition must not happen.
    pub fn begin_acquire(&mut self) -> Option<ViewSlot> {
        if self.state != SurfaceState::Configured || self.deferred {
            return None;
        }
        if self.view_live.swap(true, Ordering::AcqRel) {
            log::error!("surface view requested while the previous one is still live");
            return None;
        }
        Some(ViewSlot(self.view_live.clone()))
    }

    pub fn view_live(&self) -> bool {
        self.view_live.load(Ordering::Acquire)
    }

    pub fn terminate(&mut self) {
        self.state = SurfaceState::Terminated;
        self.active = None;
    }
}

/// Drawable for exactly one frame: the surface texture plus a render view of it.
///
/// Consumed by [`SurfaceManager::present`]. Dropping it unpresented discards
/// the frame and frees the slot for the next acquisition.
pub struct SurfaceView {
    pub(crate) texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    _slot: ViewSlot,
}

/// Owns the presentable surface and its configuration.
pub struct SurfaceManager<'w> {
    /// Surface lifetime is tied to the window via `'w`.
    surface: wgpu::Surface<'w>,
    config: wgpu::SurfaceConfiguration,
    tracker: SurfaceTracker,
}

impl<'w> SurfaceManager<'w> {
    /// Picks format, alpha and present modes supported by `adapter` and performs
    /// the initial configuration.
    pub fn new(
        surface: wgpu::Surface<'w>,
        adapter: &wgpu::Adapter,
        device: &wgpu::Device,
        init: &GpuInit,
        size: PhysicalSize<u32>,
    ) -> Result<Self> {
        let caps = surface.get_capabilities(adapter);
        let format = choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: choose_present_mode(&caps, init.present_mode),
            alpha_mode: choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };

        let mut manager = Self {
            surface,
            config,
            tracker: SurfaceTracker::default(),
        };

        match manager.configure(device, size) {
            ConfigureOutcome::Applied => Ok(manager),
            other => anyhow::bail!("initial surface configuration was {other:?} for size {size:?}"),
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn state(&self) -> SurfaceState {
        self.tracker.state()
    }

    fn key(&self) -> SurfaceKey {
        SurfaceKey {
            format: self.config.format,
            width: self.config.width,
            height: self.config.height,
            present_mode: self.config.present_mode,
        }
    }

    /// Configures the surface for `size`. Must precede the first frame and
    /// follow every size change; repeated calls with the same size are no-ops.
    pub fn configure(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) -> ConfigureOutcome {
        let max = device.limits().max_texture_dimension_2d;
        let size = PhysicalSize::new(size.width.min(max), size.height.min(max));

        let key = SurfaceKey {
            width: size.width,
            height: size.height,
            ..self.key()
        };

        let outcome = self.tracker.configure(key);
        if outcome == ConfigureOutcome::Applied {
            self.config.width = size.width;
            self.config.height = size.height;
            self.surface.configure(device, &self.config);
            log::debug!(
                "surface configured: {}x{} {:?} {:?}",
                self.config.width,
                self.config.height,
                self.config.format,
                self.config.present_mode
            );
        }
        outcome
    }

    /// Acquires the drawable for this frame.
    ///
    /// `Ok(None)` means "skip this frame": the surface is unconfigured, deferred,
    /// or temporarily unavailable (lost/outdated surfaces are reconfigured for the
    /// next attempt). Only unrecoverable errors are returned as `Err`.
    pub fn acquire_next_view(
        &mut self,
        device: &wgpu::Device,
    ) -> std::result::Result<Option<SurfaceView>, FrameError> {
        let Some(slot) = self.tracker.begin_acquire() else {
            return Ok(None);
        };

        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err) => {
                drop(slot);
                return self.handle_surface_error(device, err).map(|_| None);
            }
        };

        let view = texture.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("tessera surface view"),
            ..Default::default()
        });

        Ok(Some(SurfaceView {
            texture,
            view,
            _slot: slot,
        }))
    }

    /// Presents a view obtained from [`acquire_next_view`](Self::acquire_next_view).
    pub fn present(&mut self, view: SurfaceView) {
        let SurfaceView {
            texture,
            view,
            _slot: slot,
        } = view;
        drop(view);
        texture.present();
        drop(slot);
    }

    /// Moves the surface to its terminal state. Later acquisitions yield `None`.
    pub fn terminate(&mut self) {
        self.tracker.terminate();
    }

    fn handle_surface_error(
        &mut self,
        device: &wgpu::Device,
        err: wgpu::SurfaceError,
    ) -> std::result::Result<SurfaceErrorAction, FrameError> {
        let action = SurfaceErrorAction::classify(&err);
        match action {
            SurfaceErrorAction::Reconfigured => {
                log::debug!("surface {err}; reconfiguring");
                self.tracker.invalidate();
                let size = PhysicalSize::new(self.config.width, self.config.height);
                self.configure(device, size);
                Ok(action)
            }
            SurfaceErrorAction::SkipFrame => {
                log::debug!("surface texture unavailable ({err}); skipping frame");
                Ok(action)
            }
            SurfaceErrorAction::Fatal => {
                log::error!("surface texture acquisition failed: {err}");
                Err(FrameError::SurfaceFatal(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(width: u32, height: u32) -> SurfaceKey {
        SurfaceKey {
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
        }
    }

    fn caps(formats: Vec<wgpu::TextureFormat>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            present_modes: vec![wgpu::PresentMode::Fifo],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            ..Default::default()
        }
    }

    // ── tracker ───────────────────────────────────────────────────────────

    #[test]
    fn configure_is_idempotent_per_key() {
        let mut t = SurfaceTracker::default();
        assert_eq!(t.state(), SurfaceState::Unconfigured);
        assert_eq!(t.configure(key(640, 480)), ConfigureOutcome::Applied);
        assert_eq!(t.configure(key(640, 480)), ConfigureOutcome::Unchanged);
        assert_eq!(t.configure(key(800, 600)), ConfigureOutcome::Applied);
        assert_eq!(t.state(), SurfaceState::Configured);
    }

    #[test]
    fn zero_extent_defers_and_blocks_acquisition() {
        let mut t = SurfaceTracker::default();
        t.configure(key(640, 480));
        assert_eq!(t.configure(key(0, 480)), ConfigureOutcome::Deferred);
        assert!(t.begin_acquire().is_none());

        // Restoring the previous size resumes without a driver call.
        assert_eq!(t.configure(key(640, 480)), ConfigureOutcome::Unchanged);
        assert!(t.begin_acquire().is_some());
    }

    #[test]
    fn unconfigured_surface_never_acquires() {
        let mut t = SurfaceTracker::default();
        assert!(t.begin_acquire().is_none());
    }

    #[test]
    fn at_most_one_live_view() {
        let mut t = SurfaceTracker::default();
        t.configure(key(640, 480));
        let slot = t.begin_acquire().expect("first view");
        assert!(t.view_live());
        assert!(t.begin_acquire().is_none());
        drop(slot);
        assert!(t.begin_acquire().is_some());
    }

    #[test]
    fn unpresented_view_does_not_stall_later_frames() {
        let mut t = SurfaceTracker::default();
        t.configure(key(640, 480));
        for _ in 0..3 {
            // Each slot is discarded without a present.
            let slot = t.begin_acquire();
            assert!(slot.is_some());
        }
        assert!(!t.view_live());
    }

    #[test]
    fn invalidate_forces_reconfigure() {
        let mut t = SurfaceTracker::default();
        t.configure(key(640, 480));
        t.invalidate();
        assert_eq!(t.state(), SurfaceState::Unconfigured);
        assert_eq!(t.configure(key(640, 480)), ConfigureOutcome::Applied);
    }

    #[test]
    fn terminated_is_final() {
        let mut t = SurfaceTracker::default();
        t.configure(key(640, 480));
        t.terminate();
        assert_eq!(t.state(), SurfaceState::Terminated);
        assert_eq!(t.configure(key(800, 600)), ConfigureOutcome::Unchanged);
        assert!(t.begin_acquire().is_none());
    }

    // ── capability selection ──────────────────────────────────────────────

    #[test]
    fn srgb_format_preferred_when_available() {
        let c = caps(vec![
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ]);
        assert_eq!(
            choose_surface_format(&c, true),
            Some(wgpu::TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(
            choose_surface_format(&c, false),
            Some(wgpu::TextureFormat::Bgra8Unorm)
        );
    }

    #[test]
    fn no_formats_means_no_surface() {
        assert_eq!(choose_surface_format(&caps(vec![]), true), None);
    }

    #[test]
    fn unsupported_modes_fall_back() {
        let c = caps(vec![wgpu::TextureFormat::Bgra8Unorm]);
        assert_eq!(
            choose_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
        assert_eq!(
            choose_present_mode(&c, wgpu::PresentMode::Mailbox),
            wgpu::PresentMode::Fifo
        );
    }

    #[test]
    fn surface_errors_classified() {
        use wgpu::SurfaceError;
        assert_eq!(
            SurfaceErrorAction::classify(&SurfaceError::Outdated),
            SurfaceErrorAction::Reconfigured
        );
        assert_eq!(
            SurfaceErrorAction::classify(&SurfaceError::Timeout),
            SurfaceErrorAction::SkipFrame
        );
        assert_eq!(
            SurfaceErrorAction::classify(&SurfaceError::OutOfMemory),
            SurfaceErrorAction::Fatal
        );
    }
}
