use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Record of a spontaneous device-lost notification.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceLost {
    pub reason: String,
    pub message: String,
}

/// Observes spontaneous driver events for one device.
///
/// Nothing here recovers from them; the runtime decides what to do once
/// [`poll_lost`](Self::poll_lost) reports a loss.
pub struct DeviceEvents {
    lost_rx: flume::Receiver<DeviceLost>,
    lost: Option<DeviceLost>,
    uncaptured: Arc<AtomicU64>,
}

impl DeviceEvents {
    /// Registers the lost callback and the uncaptured-error handler on `device`.
    pub fn install(device: &wgpu::Device) -> Self {
        // One slot: the driver reports a loss at most once per device.
        let (lost_tx, lost_rx) = flume::bounded(1);

        device.set_device_lost_callback(move |reason, message| {
            // Destruction is what a normal shutdown looks like.
            if matches!(reason, wgpu::DeviceLostReason::Destroyed) {
                log::info!("device destroyed: {message}");
            } else {
                log::error!("device lost ({reason:?}): {message}");
            }

            let _ = lost_tx.try_send(DeviceLost {
                reason: format!("{reason:?}"),
                message,
            });
        });

        let uncaptured = Arc::new(AtomicU64::new(0));
        let counter = uncaptured.clone();
        device.on_uncaptured_error(Arc::new(move |error: wgpu::Error| {
            counter.fetch_add(1, Ordering::Relaxed);
            log::error!("uncaptured wgpu error: {error}");
        }));

        Self {
            lost_rx,
            lost: None,
            uncaptured,
        }
    }

    /// Returns the lost record once the driver has reported it.
    ///
    /// The lost state is terminal: after the first report every call returns it.
    pub fn poll_lost(&mut self) -> Option<&DeviceLost> {
        if self.lost.is_none() {
            self.lost = self.lost_rx.try_recv().ok();
        }
        self.lost.as_ref()
    }

    /// Number of validation/out-of-memory errors no error scope captured.
    pub fn uncaptured_errors(&self) -> u64 {
        self.uncaptured.load(Ordering::Relaxed)
    }
}
