//! Tests that need a real adapter. Each one returns early when the machine
//! has none (CI without a GPU or software rasterizer).

use anyhow::Result;
use tessera_engine::device::negotiate::{negotiate, negotiate_with, GpuDevice};
use tessera_engine::device::{DeviceRequests, InstanceRequests};
use tessera_engine::render::{
    create_buffer, create_pipeline, read_back, BufferKind, BuildError, DrawCall, GpuScene,
};
use tessera_engine::{
    init_logging, Geometry, GpuInit, Indices, LoggingConfig, PipelineConfig, RequiredLimits,
    SceneDesc, Topology, VertexLayout,
};

const SHADER: &str = r#"
struct Out {
    @builtin(position) position: vec4f,
    @location(0) color: vec3f,
};

@vertex
fn vs_main(@location(0) pos: vec2f, @location(1) color: vec3f) -> Out {
    var out: Out;
    out.position = vec4f(pos, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: Out) -> @location(0) vec4f {
    return vec4f(in.color, 1.0);
}
"#;

fn instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

fn has_adapter(instance: &wgpu::Instance) -> bool {
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())).is_ok()
}

fn headless(init: &GpuInit) -> Option<GpuDevice> {
    init_logging(LoggingConfig::default());
    let instance = instance();
    if !has_adapter(&instance) {
        eprintln!("no GPU adapter available; skipping");
        return None;
    }
    Some(negotiate(&instance, init, None).expect("negotiation with default limits"))
}

fn position_color() -> VertexLayout {
    VertexLayout::packed(&[
        (0, wgpu::VertexFormat::Float32x2),
        (1, wgpu::VertexFormat::Float32x3),
    ])
}

#[test]
fn device_carries_exactly_the_requested_limits() {
    let init = GpuInit::default();
    let Some(gpu) = headless(&init) else { return };

    let limits = gpu.device.limits();
    assert_eq!(limits.max_vertex_buffers, init.required_limits.max_vertex_buffers);
    assert_eq!(limits.max_vertex_attributes, init.required_limits.max_vertex_attributes);
    assert!(gpu.events.uncaptured_errors() == 0);
}

#[test]
fn vertex_buffer_round_trips() {
    let Some(gpu) = headless(&GpuInit::default()) else { return };

    let payload: Vec<u8> = (0u8..40).collect();
    let buffer = create_buffer(&gpu.device, &gpu.queue, "round trip", &payload, BufferKind::Vertex)
        .expect("buffer");

    assert_eq!(buffer.size(), 40);
    let bytes = read_back(&gpu.device, &gpu.queue, &buffer).expect("read back");
    assert_eq!(bytes, payload);
}

#[test]
fn odd_index_payload_is_padded_to_word_size() {
    let Some(gpu) = headless(&GpuInit::default()) else { return };

    let indices = Indices::U16(vec![0, 1, 2]);
    let buffer = create_buffer(
        &gpu.device,
        &gpu.queue,
        "odd indices",
        indices.as_bytes(),
        BufferKind::Index,
    )
    .expect("buffer");

    assert_eq!(buffer.len(), 6);
    assert_eq!(buffer.size(), 8);
    assert_eq!(
        read_back(&gpu.device, &gpu.queue, &buffer).expect("read back"),
        indices.as_bytes()
    );
}

#[test]
fn oversized_and_empty_payloads_are_rejected() {
    let init = GpuInit::default();
    let Some(gpu) = headless(&init) else { return };

    let too_big = vec![0u8; init.required_limits.max_buffer_size as usize + 4];
    assert!(matches!(
        create_buffer(&gpu.device, &gpu.queue, "big", &too_big, BufferKind::Vertex),
        Err(BuildError::BufferTooLarge { .. })
    ));
    assert!(matches!(
        create_buffer(&gpu.device, &gpu.queue, "empty", &[], BufferKind::Vertex),
        Err(BuildError::EmptyPayload)
    ));
}

#[test]
fn second_vertex_buffer_fails_on_single_buffer_device() {
    let Some(gpu) = headless(&GpuInit::default()) else { return };

    let mut config = PipelineConfig::new(
        "two buffers",
        VertexLayout::packed(&[(0, wgpu::VertexFormat::Float32x2)]),
        Topology::TriangleList,
    );
    config
        .vertex_layouts
        .push(VertexLayout::packed(&[(1, wgpu::VertexFormat::Float32x3)]));

    let result = create_pipeline(
        &gpu.device,
        SHADER,
        &config,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    );
    assert!(matches!(
        result,
        Err(BuildError::TooManyVertexBuffers { requested: 2, limit: 1 })
    ));
}

#[test]
fn unsatisfiable_limits_fail_negotiation() {
    init_logging(LoggingConfig::default());
    let instance = instance();
    if !has_adapter(&instance) {
        eprintln!("no GPU adapter available; skipping");
        return;
    }

    let init = GpuInit {
        required_limits: RequiredLimits {
            max_vertex_buffers: u32::MAX,
            ..RequiredLimits::default()
        },
        ..GpuInit::default()
    };

    let err = negotiate(&instance, &init, None)
        .err()
        .expect("negotiation must fail");
    assert!(format!("{err:#}").contains("max_vertex_buffers"));
}

#[test]
fn indexed_scene_builds_with_indexed_plan() {
    let Some(gpu) = headless(&GpuInit::default()) else { return };

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct V {
        pos: [f32; 2],
        color: [f32; 3],
    }
    let corner = |x, y| V { pos: [x, y], color: [1.0, 1.0, 1.0] };
    let corners = [corner(-0.5, -0.5), corner(0.5, -0.5), corner(0.5, 0.5), corner(-0.5, 0.5)];

    let desc = SceneDesc {
        shader: SHADER.into(),
        pipeline: PipelineConfig::new("quad", position_color(), Topology::TriangleList)
            .indexed(wgpu::IndexFormat::Uint16),
        geometry: Geometry::new(&corners).with_indices(Indices::U16(vec![0, 1, 2, 0, 2, 3])),
        clear_color: wgpu::Color::BLACK,
    };

    let scene = GpuScene::build(
        &gpu.device,
        &gpu.queue,
        wgpu::TextureFormat::Rgba8UnormSrgb,
        &desc,
    )
    .expect("scene");

    assert_eq!(
        scene.plan().draw,
        DrawCall::DrawIndexed { index_count: 6, instance_count: 1 }
    );
    let (indices, format) = scene.mesh().index_buffer().expect("index buffer");
    assert_eq!(format, wgpu::IndexFormat::Uint16);
    assert_eq!(indices.len(), 12);
}

#[test]
fn mismatched_index_format_is_rejected_before_upload() {
    let Some(gpu) = headless(&GpuInit::default()) else { return };

    let pipeline = create_pipeline(
        &gpu.device,
        SHADER,
        &PipelineConfig::new("unindexed", position_color(), Topology::TriangleList),
        wgpu::TextureFormat::Rgba8UnormSrgb,
    )
    .expect("pipeline");

    let geometry = Geometry::from_bytes(vec![0; 60], 20).with_indices(Indices::U32(vec![0, 1, 2]));
    assert_eq!(
        geometry.check_compatible(&pipeline),
        Err(BuildError::IndexFormatMismatch {
            pipeline: None,
            geometry: Some(wgpu::IndexFormat::Uint32),
        })
    );
}

#[test]
fn shader_the_driver_rejects_fails_the_build() {
    let Some(gpu) = headless(&GpuInit::default()) else { return };

    let config = PipelineConfig::new("broken", position_color(), Topology::TriangleList);
    let result = create_pipeline(
        &gpu.device,
        "this is not wgsl",
        &config,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    );
    assert!(matches!(
        result,
        Err(BuildError::DriverRejected { ref label, .. }) if label == "broken"
    ));

    let desc = SceneDesc {
        shader: "fn vs_main() {}".into(),
        pipeline: config,
        geometry: Geometry::from_bytes(vec![0; 60], 20),
        clear_color: wgpu::Color::BLACK,
    };
    assert!(GpuScene::build(&gpu.device, &gpu.queue, wgpu::TextureFormat::Rgba8UnormSrgb, &desc).is_err());

    // Captured by the scope, so nothing reaches the uncaptured handler.
    assert_eq!(gpu.events.uncaptured_errors(), 0);
}

#[test]
fn destroyed_device_is_reported_as_lost_and_stays_lost() {
    let Some(mut gpu) = headless(&GpuInit::default()) else { return };
    assert_eq!(gpu.events.poll_lost(), None);

    gpu.device.destroy();
    let _ = gpu.device.poll(wgpu::PollType::wait_indefinitely());

    let first = gpu.events.poll_lost().cloned().expect("lost after destroy");
    assert_eq!(first.reason, "Destroyed");
    assert_eq!(gpu.events.poll_lost(), Some(&first));
}

/// Counts the requests negotiation issues.
struct CountingRequests<'a> {
    inner: InstanceRequests<'a>,
    adapters: u32,
    devices: u32,
}

impl DeviceRequests for CountingRequests<'_> {
    fn request_adapter(
        &mut self,
        options: &wgpu::RequestAdapterOptions<'_, '_>,
    ) -> Result<wgpu::Adapter> {
        self.adapters += 1;
        self.inner.request_adapter(options)
    }

    fn request_device(
        &mut self,
        adapter: &wgpu::Adapter,
        descriptor: &wgpu::DeviceDescriptor<'_>,
        required: &RequiredLimits,
    ) -> Result<(wgpu::Device, wgpu::Queue)> {
        self.devices += 1;
        self.inner.request_device(adapter, descriptor, required)
    }
}

#[test]
fn negotiation_requests_adapter_and_device_once_each() {
    init_logging(LoggingConfig::default());
    let instance = instance();
    if !has_adapter(&instance) {
        eprintln!("no GPU adapter available; skipping");
        return;
    }

    let mut requests = CountingRequests {
        inner: InstanceRequests(&instance),
        adapters: 0,
        devices: 0,
    };
    let gpu = negotiate_with(&mut requests, &GpuInit::default(), None).expect("negotiation");

    assert_eq!((requests.adapters, requests.devices), (1, 1));
    assert_eq!(gpu.device.limits().max_vertex_buffers, 1);
}
