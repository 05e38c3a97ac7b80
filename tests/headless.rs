//! End-to-end frames on a headless adapter.
//!
//! Every test returns early when the machine has no usable GPU adapter.

use glam::{Mat4, Vec3, Vec4};
use rimrender::mesh::generate;
use rimrender::scene::label::{label_instances, Highlight};
use rimrender::{
    FrameParams, HitTestResult, MeshId, MeshInstance, RenderContext,
    RenderError, SceneRenderer,
};

const SIZE: (u32, u32) = (64, 64);
const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn context() -> Option<RenderContext> {
    match pollster::block_on(RenderContext::headless()) {
        Ok(context) => Some(context),
        Err(e) => {
            eprintln!("skipping: no headless adapter ({e})");
            None
        }
    }
}

fn sample_count(context: &RenderContext) -> u32 {
    if context.supports_sample_count(4) {
        4
    } else {
        1
    }
}

fn destination(context: &RenderContext, size: (u32, u32)) -> wgpu::Texture {
    context.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Destination"),
        size: wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn setup() -> Option<(RenderContext, SceneRenderer, MeshId)> {
    let context = context()?;
    let samples = sample_count(&context);
    setup_with(context, samples)
}

fn setup_single_sample() -> Option<(RenderContext, SceneRenderer, MeshId)> {
    setup_with(context()?, 1)
}

fn setup_with(
    context: RenderContext,
    samples: u32,
) -> Option<(RenderContext, SceneRenderer, MeshId)> {
    let mut renderer =
        SceneRenderer::new(&context, FORMAT, SIZE, samples).unwrap();
    let quad = renderer
        .allocate_mesh(&context, &generate::unit_quad())
        .unwrap();
    Some((context, renderer, quad))
}

/// A quad filling clip space at depth `z` under identity matrices.
fn screen_quad(mesh: MeshId, z: f32) -> MeshInstance {
    MeshInstance::new(mesh, Mat4::from_translation(Vec3::new(0.0, 0.0, z)), Vec4::ONE)
}

/// The unit quad scaled by `scale` and moved to `(x, y)` at depth `z`.
fn placed_quad(mesh: MeshId, scale: Vec3, x: f32, y: f32, z: f32) -> MeshInstance {
    let transform = Mat4::from_translation(Vec3::new(x, y, z)) * Mat4::from_scale(scale);
    MeshInstance::new(mesh, transform, Vec4::ONE)
}

/// Copy `texture` into a mappable buffer and return its rows of RGBA texels.
fn read_pixels(context: &RenderContext, texture: &wgpu::Texture) -> Vec<Vec<[u8; 4]>> {
    let (width, height) = (texture.width(), texture.height());
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let row_bytes = (width * 4).div_ceil(align) * align;
    let buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Test Readback"),
        size: u64::from(row_bytes * height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = context.create_encoder();
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(row_bytes),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    let _ = context.submit(encoder);

    let slice = buffer.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    let _ = context.device.poll(wgpu::PollType::Wait).unwrap();
    receiver.recv().unwrap().unwrap();

    let data = slice.get_mapped_range();
    let rows = data
        .chunks(row_bytes as usize)
        .map(|row| {
            row[..(width * 4) as usize]
                .chunks(4)
                .map(|texel| [texel[0], texel[1], texel[2], texel[3]])
                .collect()
        })
        .collect();
    drop(data);
    buffer.unmap();
    rows
}

fn params(optimized: bool, pointer: Option<(u32, u32)>) -> FrameParams {
    let mut params = FrameParams::default().with_pointer(pointer);
    params.flags.optimized_hit_test = optimized;
    params
}

fn labelled(mut instances: Vec<MeshInstance>) -> Vec<MeshInstance> {
    label_instances(&mut instances, |_| Highlight::None).unwrap();
    instances
}

#[test]
fn optimized_hit_test_reports_one_frame_late() {
    let Some((context, mut renderer, quad)) = setup() else {
        return;
    };
    let target = destination(&context, SIZE);
    let params = params(true, Some((32, 32)));

    let mut instances = labelled(vec![screen_quad(quad, 0.5)]);
    let first = renderer
        .draw(&context, &mut instances, &params, &target)
        .unwrap();
    assert!(first.hit_test_requested);
    assert_eq!(renderer.hit_test_result(), HitTestResult::NONE);

    let _ = renderer
        .draw(&context, &mut instances, &params, &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result().logical_id(), 1);

    // Stable once the pipeline is primed.
    let _ = renderer
        .draw(&context, &mut instances, &params, &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result().instance_index(), Some(0));
}

#[test]
fn synchronous_hit_test_reports_current_frame() {
    let Some((context, mut renderer, quad)) = setup() else {
        return;
    };
    let target = destination(&context, SIZE);
    let mut instances = labelled(vec![screen_quad(quad, 0.5)]);

    let _ = renderer
        .draw(&context, &mut instances, &params(false, Some((10, 50))), &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result().logical_id(), 1);
}

#[test]
fn nearest_instance_wins_the_pixel() {
    let Some((context, mut renderer, quad)) = setup() else {
        return;
    };
    let target = destination(&context, SIZE);
    let mut instances =
        labelled(vec![screen_quad(quad, 0.5), screen_quad(quad, 0.25)]);

    let _ = renderer
        .draw(&context, &mut instances, &params(false, Some((5, 5))), &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result().logical_id(), 2);
}

#[test]
fn empty_scene_reports_no_hit() {
    let Some((context, mut renderer, _)) = setup() else {
        return;
    };
    let target = destination(&context, SIZE);
    let params = params(true, Some((32, 32)));
    for _ in 0..3 {
        let stats = renderer.draw(&context, &mut [], &params, &target).unwrap();
        assert_eq!(stats.batches, 0);
        assert_eq!(renderer.hit_test_result(), HitTestResult::NONE);
    }
}

#[test]
fn pointer_outside_target_reports_no_hit() {
    let Some((context, mut renderer, quad)) = setup() else {
        return;
    };
    let target = destination(&context, SIZE);
    let mut instances = labelled(vec![screen_quad(quad, 0.5)]);

    for pointer in [None, Some((64, 10)), Some((3, 1000))] {
        let stats = renderer
            .draw(&context, &mut instances, &params(false, pointer), &target)
            .unwrap();
        assert!(!stats.hit_test_requested);
        assert_eq!(renderer.hit_test_result(), HitTestResult::NONE);
    }
}

#[test]
fn instances_are_drawn_in_one_call_per_mesh_run() {
    let Some((context, mut renderer, quad)) = setup() else {
        return;
    };
    let target = destination(&context, SIZE);
    let cube = renderer
        .allocate_mesh(&context, &generate::unit_cube())
        .unwrap();
    assert!(cube > quad);

    let a = MeshInstance::new(quad, Mat4::IDENTITY, Vec4::ONE);
    let b = MeshInstance::new(cube, Mat4::IDENTITY, Vec4::new(1.0, 1.0, 1.0, 0.5));
    let c = MeshInstance::new(quad, Mat4::IDENTITY, Vec4::ONE);
    let mut instances = vec![a, b, c];

    let stats = renderer
        .draw(&context, &mut instances, &params(true, None), &target)
        .unwrap();
    assert_eq!(stats.instances, 3);
    assert_eq!(stats.batches, 2);
    assert_eq!(instances[2].mesh_id, cube);
}

#[test]
fn unknown_mesh_is_rejected_before_submission() {
    let Some((context, mut renderer, _)) = setup() else {
        return;
    };
    let target = destination(&context, SIZE);
    let mut instances = vec![screen_quad(MeshId(99), 0.5)];
    let err = renderer
        .draw(&context, &mut instances, &params(true, None), &target)
        .unwrap_err();
    assert!(matches!(err, RenderError::UnknownMesh(MeshId(99))));
}

#[test]
fn reallocation_changes_the_required_destination() {
    let Some((context, mut renderer, quad)) = setup() else {
        return;
    };
    let small = destination(&context, (32, 16));
    let mut instances = labelled(vec![screen_quad(quad, 0.5)]);
    let params = params(false, Some((4, 4)));

    let err = renderer
        .draw(&context, &mut instances, &params, &small)
        .unwrap_err();
    assert!(matches!(err, RenderError::DestinationMismatch { .. }));

    renderer
        .reallocate_buffers(&context, 32, 16, renderer.sample_count())
        .unwrap();
    assert_eq!(renderer.size(), (32, 16));
    let _ = renderer
        .draw(&context, &mut instances, &params, &small)
        .unwrap();
    assert_eq!(renderer.hit_test_result().logical_id(), 1);
}

#[test]
fn single_sample_targets_still_hit_test() {
    let Some((context, mut renderer, quad)) = setup() else {
        return;
    };
    renderer.reallocate_buffers(&context, 64, 64, 1).unwrap();
    let target = destination(&context, SIZE);
    let mut instances = labelled(vec![screen_quad(quad, 0.5)]);
    let _ = renderer
        .draw(&context, &mut instances, &params(false, Some((0, 63))), &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result().logical_id(), 1);
}

#[test]
fn invalid_reallocation_keeps_old_targets() {
    let Some((context, mut renderer, _)) = setup() else {
        return;
    };
    let err = renderer.reallocate_buffers(&context, 0, 10, 1).unwrap_err();
    assert!(matches!(err, RenderError::InvalidTargetSize { .. }));
    let err = renderer.reallocate_buffers(&context, 10, 10, 3).unwrap_err();
    assert!(matches!(err, RenderError::UnsupportedSampleCount(3)));
    assert_eq!(renderer.size(), SIZE);
}

#[test]
fn optimized_hit_test_clears_one_frame_after_leaving_an_instance() {
    let Some((context, mut renderer, quad)) = setup_single_sample() else {
        return;
    };
    let target = destination(&context, SIZE);
    let mut instances =
        labelled(vec![placed_quad(quad, Vec3::splat(0.5), 0.0, 0.0, 0.5)]);
    let on_quad = params(true, Some((32, 32)));
    let on_background = params(true, Some((2, 2)));

    for _ in 0..2 {
        let _ = renderer
            .draw(&context, &mut instances, &on_quad, &target)
            .unwrap();
    }
    assert_eq!(renderer.hit_test_result().logical_id(), 1);

    // The first frame over background still reports the previous pixel.
    let _ = renderer
        .draw(&context, &mut instances, &on_background, &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result().logical_id(), 1);

    let _ = renderer
        .draw(&context, &mut instances, &on_background, &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result().logical_id(), 0);
    assert!(!renderer.hit_test_result().is_hit());
}

#[test]
fn switching_readback_mode_discards_stale_pixels() {
    let Some((context, mut renderer, quad)) = setup_single_sample() else {
        return;
    };
    let target = destination(&context, SIZE);
    let half = Vec3::new(0.5, 1.0, 1.0);
    let mut instances = labelled(vec![
        placed_quad(quad, half, -0.5, 0.0, 0.5),
        placed_quad(quad, half, 0.5, 0.0, 0.5),
    ]);
    let left = Some((16, 32));
    let right = Some((48, 32));

    // Leaves the left instance's pixel in flight.
    let _ = renderer
        .draw(&context, &mut instances, &params(true, left), &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result(), HitTestResult::NONE);

    let _ = renderer
        .draw(&context, &mut instances, &params(false, right), &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result().logical_id(), 2);

    // Back to delayed: nothing from the synchronous frame survives.
    let _ = renderer
        .draw(&context, &mut instances, &params(true, left), &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result(), HitTestResult::NONE);

    let _ = renderer
        .draw(&context, &mut instances, &params(true, left), &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result().logical_id(), 1);

    let _ = renderer
        .draw(&context, &mut instances, &params(false, left), &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result().logical_id(), 1);
    let _ = renderer
        .draw(&context, &mut instances, &params(false, right), &target)
        .unwrap();
    assert_eq!(renderer.hit_test_result().logical_id(), 2);
}

#[test]
fn selected_instance_gets_a_rim_on_its_edge_only() {
    let Some((context, mut renderer, quad)) = setup_single_sample() else {
        return;
    };
    let target = destination(&context, SIZE);
    let blue = Vec4::new(0.0, 0.0, 1.0, 1.0);
    let mut instances =
        vec![placed_quad(quad, Vec3::splat(0.5), 0.0, 0.0, 0.5)];
    instances[0].rgba = blue;
    label_instances(&mut instances, |_| Highlight::Selected).unwrap();

    let mut params = params(true, None);
    params.rim_thickness = 2.0 / 64.0;
    let background = (params.background * 255.0).round();
    let background = [background.x as u8, background.y as u8, background.z as u8, 255];

    let _ = renderer
        .draw(&context, &mut instances, &params, &target)
        .unwrap();
    let pixels = read_pixels(&context, &target);

    // The quad covers pixels 16..48 on both axes.
    let far = pixels[30][2];
    let edge = pixels[32][15];
    let interior = pixels[32][32];
    assert_eq!(far, background);
    assert!(edge[0] > 200 && edge[0] > edge[2], "edge {edge:?}");
    assert!(interior[2] > 0, "interior {interior:?}");
    assert!(interior[0] < 64 && interior[1] < 64, "interior {interior:?}");

    params.flags.draw_rims = false;
    let _ = renderer
        .draw(&context, &mut instances, &params, &target)
        .unwrap();
    let plain = read_pixels(&context, &target);
    assert_eq!(plain[32][15], background);
    assert_eq!(plain[32][32], interior);
}

#[test]
fn overlays_and_diagnostics_render_without_errors() {
    let Some((context, mut renderer, quad)) = setup_single_sample() else {
        return;
    };
    let target = destination(&context, SIZE);
    let mut instances =
        vec![placed_quad(quad, Vec3::splat(0.5), 0.0, 0.0, 0.5)];
    label_instances(&mut instances, |_| Highlight::Selected).unwrap();

    let mut params = params(true, Some((32, 32)));
    params.flags.show_floor = true;
    params.flags.show_normals = true;
    params.flags.diagnostics = true;

    context.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let stats = renderer
        .draw(&context, &mut instances, &params, &target)
        .unwrap();
    let error = pollster::block_on(context.device.pop_error_scope());
    assert!(error.is_none(), "{error:?}");
    assert_eq!(stats.batches, 1);

    // Rgb quad over rows 0..12, rim quad over rows 12..25, both at x >= 51.
    // Ids this small read as black; the selected rim reads as white.
    let pixels = read_pixels(&context, &target);
    let rgb = pixels[3][60];
    assert!(rgb[0] <= 1 && rgb[1] == 0 && rgb[2] == 0, "rgb {rgb:?}");
    assert_eq!(pixels[19][57], [255, 255, 255, 255]);

    if context.supports_wireframe() {
        params.flags.wireframe = true;
        context.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let _ = renderer
            .draw(&context, &mut instances, &params, &target)
            .unwrap();
        let error = pollster::block_on(context.device.pop_error_scope());
        assert!(error.is_none(), "{error:?}");
    }
}
