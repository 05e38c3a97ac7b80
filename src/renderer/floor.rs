//! Chequered ground plane drawn into the color target only.

use wgpu::util::DeviceExt;

use super::scene_pass::{multisample_state, scene_color_targets, scene_depth_state};
use crate::error::RenderError;
use crate::gpu::pipeline_helpers::{
    filtering_sampler, repeat_sampler, sampler_entry, texture_2d, view_entry,
};
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::{Shader, ShaderComposer};

const CHEQUER_SIZE: u32 = 64;
const CHEQUER_CELL: u32 = 32;
const CHEQUER_LIGHT: u8 = 0xe5;
const CHEQUER_DARK: u8 = 0xde;
/// Texture repeats across the plane.
const UV_REPEAT: f32 = 25.0;
/// Half the plane's edge length in world units.
const HALF_EXTENT: f32 = 100.0;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct FloorVertex {
    position: [f32; 3],
    uv: [f32; 2],
}

impl FloorVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Two triangles covering the y = 0 plane.
fn floor_vertices() -> [FloorVertex; 6] {
    let corner = |u: f32, v: f32| FloorVertex {
        position: [
            (2.0 * u - 1.0) * HALF_EXTENT,
            0.0,
            (1.0 - 2.0 * v) * HALF_EXTENT,
        ],
        uv: [u * UV_REPEAT, v * UV_REPEAT],
    };
    [
        corner(0.0, 0.0),
        corner(1.0, 0.0),
        corner(1.0, 1.0),
        corner(0.0, 0.0),
        corner(1.0, 1.0),
        corner(0.0, 1.0),
    ]
}

/// RGBA8 pixels of the base chequer level.
fn chequer_pixels() -> Vec<u8> {
    let mut pixels = Vec::with_capacity((CHEQUER_SIZE * CHEQUER_SIZE * 4) as usize);
    for y in 0..CHEQUER_SIZE {
        for x in 0..CHEQUER_SIZE {
            let light = (x / CHEQUER_CELL + y / CHEQUER_CELL) % 2 == 0;
            let gray = if light { CHEQUER_LIGHT } else { CHEQUER_DARK };
            pixels.extend_from_slice(&[gray, gray, gray, 0xff]);
        }
    }
    pixels
}

/// Box-filter `pixels` (a `size`x`size` RGBA8 image) down to half size.
fn downsample(pixels: &[u8], size: u32) -> Vec<u8> {
    let half = size / 2;
    let texel = |x: u32, y: u32, c: u32| pixels[((y * size + x) * 4 + c) as usize] as u32;
    let mut out = Vec::with_capacity((half * half * 4) as usize);
    for y in 0..half {
        for x in 0..half {
            for c in 0..4 {
                let sum = texel(2 * x, 2 * y, c)
                    + texel(2 * x + 1, 2 * y, c)
                    + texel(2 * x, 2 * y + 1, c)
                    + texel(2 * x + 1, 2 * y + 1, c);
                out.push(((sum + 2) / 4) as u8);
            }
        }
    }
    out
}

/// Every mip level of the chequer, largest first.
fn chequer_mips() -> Vec<(u32, Vec<u8>)> {
    let mut levels = vec![(CHEQUER_SIZE, chequer_pixels())];
    while let Some((size, pixels)) = levels.last() {
        if *size == 1 {
            break;
        }
        let next = (size / 2, downsample(pixels, *size));
        levels.push(next);
    }
    levels
}

/// The textured ground plane.
pub struct GroundPlane {
    module: wgpu::ShaderModule,
    texture_layout: wgpu::BindGroupLayout,
    texture_bind_group: wgpu::BindGroup,
    vertices: wgpu::Buffer,
    pipeline: wgpu::RenderPipeline,
}

impl GroundPlane {
    /// Upload the plane and its chequer texture.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ShaderBuild`] if the floor shader fails to
    /// compose.
    pub fn new(
        context: &RenderContext,
        composer: &mut ShaderComposer,
        frame_layout: &wgpu::BindGroupLayout,
        sample_count: u32,
    ) -> Result<Self, RenderError> {
        let device = &context.device;
        let module = composer.compose(device, Shader::Floor, &[])?;

        let texture_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Floor Texture Layout"),
                entries: &[texture_2d(0), filtering_sampler(1)],
            });
        let view = Self::upload_chequer(context);
        let sampler = repeat_sampler(device, "Floor Sampler");
        let texture_bind_group =
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Floor Texture Bind Group"),
                layout: &texture_layout,
                entries: &[view_entry(0, &view), sampler_entry(1, &sampler)],
            });

        let vertices =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Floor Vertices"),
                contents: bytemuck::cast_slice(&floor_vertices()),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let pipeline = Self::create_pipeline(
            device,
            &module,
            frame_layout,
            &texture_layout,
            sample_count,
        );

        Ok(Self {
            module,
            texture_layout,
            texture_bind_group,
            vertices,
            pipeline,
        })
    }

    fn upload_chequer(context: &RenderContext) -> wgpu::TextureView {
        let mips = chequer_mips();
        let texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Floor Chequer"),
            size: wgpu::Extent3d {
                width: CHEQUER_SIZE,
                height: CHEQUER_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: mips.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (level, (size, pixels)) in mips.iter().enumerate() {
            context.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(size * 4),
                    rows_per_image: Some(*size),
                },
                wgpu::Extent3d {
                    width: *size,
                    height: *size,
                    depth_or_array_layers: 1,
                },
            );
        }
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_pipeline(
        device: &wgpu::Device,
        module: &wgpu::ShaderModule,
        frame_layout: &wgpu::BindGroupLayout,
        texture_layout: &wgpu::BindGroupLayout,
        sample_count: u32,
    ) -> wgpu::RenderPipeline {
        let layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Floor Pipeline Layout"),
                bind_group_layouts: &[frame_layout, texture_layout],
                push_constant_ranges: &[],
            });
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Floor Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: &[FloorVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                targets: &scene_color_targets(false),
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(scene_depth_state()),
            multisample: multisample_state(sample_count),
            multiview: None,
            cache: None,
        })
    }

    /// Rebuild the pipeline for a new sample count.
    pub fn rebuild_pipeline(
        &mut self,
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        sample_count: u32,
    ) {
        self.pipeline = Self::create_pipeline(
            device,
            &self.module,
            frame_layout,
            &self.texture_layout,
            sample_count,
        );
    }

    /// Draw the plane. The frame bind group must already be at group 0.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(1, &self.texture_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.draw(0..6, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chequer_alternates_every_cell() {
        let pixels = chequer_pixels();
        let gray = |x: u32, y: u32| pixels[((y * CHEQUER_SIZE + x) * 4) as usize];
        assert_eq!(gray(0, 0), CHEQUER_LIGHT);
        assert_eq!(gray(CHEQUER_CELL - 1, 0), CHEQUER_LIGHT);
        assert_eq!(gray(CHEQUER_CELL, 0), CHEQUER_DARK);
        assert_eq!(gray(CHEQUER_CELL, CHEQUER_CELL), CHEQUER_LIGHT);
    }

    #[test]
    fn mip_chain_ends_at_average_gray() {
        let mips = chequer_mips();
        assert_eq!(mips.len(), 7);
        let (size, last) = mips.last().unwrap();
        assert_eq!(*size, 1);
        assert!(last[0] > CHEQUER_DARK && last[0] < CHEQUER_LIGHT);
        assert_eq!(last[3], 0xff);
    }

    #[test]
    fn plane_spans_both_horizontal_axes() {
        let vertices = floor_vertices();
        assert!(vertices.iter().all(|v| v.position[1] == 0.0));
        let max_uv = vertices.iter().map(|v| v.uv[0]).fold(0.0, f32::max);
        assert_eq!(max_uv, UV_REPEAT);
        let max_x = vertices.iter().map(|v| v.position[0]).fold(0.0, f32::max);
        assert_eq!(max_x, HALF_EXTENT);
    }
}
