//! Write-once GPU buffers.

use std::time::Duration;

use anyhow::{Context, Result};

use super::BuildError;

/// Upper bound on how long [`read_back`] waits for the map callback.
pub const READBACK_TIMEOUT: Duration = Duration::from_secs(5);

/// What a buffer is bound as.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferKind {
    Vertex,
    Index,
}

impl BufferKind {
    fn usages(self) -> wgpu::BufferUsages {
        let bind = match self {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };
        // COPY_SRC keeps the contents readable for verification.
        bind | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC
    }
}

/// Allocation size for a payload of `len` bytes: the next multiple of the
/// driver's copy alignment (4 bytes).
pub fn aligned_size(len: u64) -> u64 {
    wgpu::util::align_to(len, wgpu::COPY_BUFFER_ALIGNMENT)
}

/// GPU-resident buffer written exactly once at creation.
///
/// There is deliberately no write method; frames only reference it.
pub struct GpuBuffer {
    raw: wgpu::Buffer,
    len: u64,
    kind: BufferKind,
}

impl GpuBuffer {
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.raw
    }

    /// Payload length in bytes (before alignment padding).
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated size in bytes.
    pub fn size(&self) -> u64 {
        self.raw.size()
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }
}

/// Allocates a buffer sized for `payload` and uploads it with one queue write.
///
/// The allocation is rounded up to 4 bytes; the padding is written as zeros.
pub fn create_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    payload: &[u8],
    kind: BufferKind,
) -> Result<GpuBuffer, BuildError> {
    if payload.is_empty() {
        return Err(BuildError::EmptyPayload);
    }

    let len = payload.len() as u64;
    let size = aligned_size(len);
    let limit = device.limits().max_buffer_size;
    if size > limit {
        return Err(BuildError::BufferTooLarge { size, limit });
    }

    let raw = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: kind.usages(),
        mapped_at_creation: false,
    });

    if size == len {
        queue.write_buffer(&raw, 0, payload);
    } else {
        let mut padded = Vec::with_capacity(size as usize);
        padded.extend_from_slice(payload);
        padded.resize(size as usize, 0);
        queue.write_buffer(&raw, 0, &padded);
    }

    log::debug!("{kind:?} buffer `{label}`: {len} bytes ({size} allocated)");

    Ok(GpuBuffer { raw, len, kind })
}

/// Copies `buffer` into a mappable staging buffer and returns its payload bytes.
///
/// Blocks until the map completes or [`READBACK_TIMEOUT`] elapses.
pub fn read_back(device: &wgpu::Device, queue: &wgpu::Queue, buffer: &GpuBuffer) -> Result<Vec<u8>> {
    let size = buffer.size();
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("tessera readback staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("tessera readback encoder"),
    });
    encoder.copy_buffer_to_buffer(buffer.raw(), 0, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, mapped) = flume::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    device
        .poll(wgpu::PollType::wait_indefinitely())
        .context("device poll failed during readback")?;

    mapped
        .recv_timeout(READBACK_TIMEOUT)
        .context("buffer map callback did not complete")?
        .context("buffer map failed")?;

    let bytes = {
        let view = slice.get_mapped_range();
        view[..buffer.len() as usize].to_vec()
    };
    staging.unmap();

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_round_up_to_four() {
        assert_eq!(aligned_size(1), 4);
        assert_eq!(aligned_size(4), 4);
        assert_eq!(aligned_size(6), 8);
        assert_eq!(aligned_size(12), 12);
        assert_eq!(aligned_size(13), 16);
    }

    #[test]
    fn usages_allow_upload_and_readback() {
        let v = BufferKind::Vertex.usages();
        assert!(v.contains(wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST));
        assert!(v.contains(wgpu::BufferUsages::COPY_SRC));
        assert!(!v.contains(wgpu::BufferUsages::INDEX));
        assert!(BufferKind::Index.usages().contains(wgpu::BufferUsages::INDEX));
    }
}
