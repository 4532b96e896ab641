//! Adapter/device negotiation behind a blocking façade.
//!
//! wgpu completes adapter and device requests asynchronously. Each function
//! here issues exactly one request and blocks the calling thread on that one
//! future with `pollster`; no executor or event loop is involved.

use anyhow::{bail, Context, Result};

use super::events::DeviceEvents;
use super::init::{GpuInit, RequiredLimits};

/// Adapter, device and queue produced by a successful negotiation.
pub struct GpuDevice {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub events: DeviceEvents,
}

/// Requests an adapter and blocks until the driver answers.
pub fn acquire_adapter(
    instance: &wgpu::Instance,
    options: &wgpu::RequestAdapterOptions<'_, '_>,
) -> Result<wgpu::Adapter> {
    let adapter = match pollster::block_on(instance.request_adapter(options)) {
        Ok(adapter) => adapter,
        Err(err) => {
            log::error!("could not get a GPU adapter: {err}");
            return Err(err).context("failed to find a suitable GPU adapter");
        }
    };

    let info = adapter.get_info();
    log::info!(
        "adapter: {} ({:?}, {:?}, driver: {} {})",
        info.name,
        info.backend,
        info.device_type,
        info.driver,
        info.driver_info
    );

    Ok(adapter)
}

/// Requests a device from `adapter` and blocks until the driver answers.
///
/// `required` is checked against the adapter before the request is issued so
/// an unsatisfiable descriptor is reported per limit instead of as an opaque
/// driver failure.
pub fn acquire_device(
    adapter: &wgpu::Adapter,
    descriptor: &wgpu::DeviceDescriptor<'_>,
    required: &RequiredLimits,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    let unmet = required.unmet_by(&adapter.limits());
    if !unmet.is_empty() {
        for shortfall in &unmet {
            log::error!("adapter limit too low: {shortfall}");
        }
        bail!(
            "adapter cannot satisfy {} required limit(s): {}",
            unmet.len(),
            unmet
                .iter()
                .map(|s| s.name)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    match pollster::block_on(adapter.request_device(descriptor)) {
        Ok(pair) => Ok(pair),
        Err(err) => {
            log::error!("could not get a GPU device: {err}");
            Err(err).context("failed to create wgpu device/queue")
        }
    }
}

/// The two driver requests negotiation issues.
///
/// [`InstanceRequests`] is the real implementation; wrappers can observe or
/// count the calls.
pub trait DeviceRequests {
    fn request_adapter(
        &mut self,
        options: &wgpu::RequestAdapterOptions<'_, '_>,
    ) -> Result<wgpu::Adapter>;

    fn request_device(
        &mut self,
        adapter: &wgpu::Adapter,
        descriptor: &wgpu::DeviceDescriptor<'_>,
        required: &RequiredLimits,
    ) -> Result<(wgpu::Device, wgpu::Queue)>;
}

/// Requests served by a `wgpu::Instance` through [`acquire_adapter`] and
/// [`acquire_device`].
pub struct InstanceRequests<'a>(pub &'a wgpu::Instance);

impl DeviceRequests for InstanceRequests<'_> {
    fn request_adapter(
        &mut self,
        options: &wgpu::RequestAdapterOptions<'_, '_>,
    ) -> Result<wgpu::Adapter> {
        acquire_adapter(self.0, options)
    }

    fn request_device(
        &mut self,
        adapter: &wgpu::Adapter,
        descriptor: &wgpu::DeviceDescriptor<'_>,
        required: &RequiredLimits,
    ) -> Result<(wgpu::Device, wgpu::Queue)> {
        acquire_device(adapter, descriptor, required)
    }
}

/// Runs the full negotiation: one adapter request, then one device request.
///
/// `compatible_surface` restricts adapter selection to ones able to present to
/// it; headless callers pass `None`.
pub fn negotiate(
    instance: &wgpu::Instance,
    init: &GpuInit,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> Result<GpuDevice> {
    negotiate_with(&mut InstanceRequests(instance), init, compatible_surface)
}

/// [`negotiate`] over any [`DeviceRequests`] implementation.
pub fn negotiate_with<R: DeviceRequests>(
    requests: &mut R,
    init: &GpuInit,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> Result<GpuDevice> {
    let adapter = requests.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: init.power_preference,
        compatible_surface,
        force_fallback_adapter: false,
    })?;
    log::debug!("adapter features: {:?}", adapter.features());

    let descriptor = wgpu::DeviceDescriptor {
        label: Some("tessera device"),
        required_features: init.required_features,
        // Surfaces may be as large as the adapter allows.
        required_limits: wgpu::Limits {
            max_texture_dimension_2d: adapter.limits().max_texture_dimension_2d,
            ..init.required_limits.to_wgpu()
        },
        experimental_features: wgpu::ExperimentalFeatures::disabled(),
        memory_hints: wgpu::MemoryHints::Performance,
        trace: wgpu::Trace::Off,
    };

    let (device, queue) = requests.request_device(&adapter, &descriptor, &init.required_limits)?;
    log::debug!("device features: {:?}", device.features());
    log::debug!("device limits: {:#?}", device.limits());

    let events = DeviceEvents::install(&device);

    Ok(GpuDevice {
        adapter,
        device,
        queue,
        events,
    })
}
