//! Rim overlay: an edge detector over the passthrough rim byte, blended
//! onto the destination.
//!
//! Instances labelled with a non-zero rim intensity stand out against
//! their surroundings in the passthrough alpha channel. A Sobel filter over
//! that channel yields an outline whose strength follows the intensity
//! difference, so hovered instances get a faint rim and selected ones a
//! full one.

use glam::Vec2;

use super::screen_pass::{begin_output_pass, ScreenPass};
use crate::error::RenderError;
use crate::gpu::pipeline_helpers::{
    buffer_entry, create_screen_space_pipeline, filtering_sampler,
    linear_sampler, sampler_entry, texture_2d, uniform_buffer, view_entry,
};
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::renderer::frame::FrameParams;
use crate::renderer::targets::RenderTargets;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct RimUniform {
    color: [f32; 4],
    offset: [f32; 2],
    _pad: [f32; 2],
}

/// Sobel tap spacing in uv units. `thickness` is a fraction of the width;
/// the vertical spacing is scaled so the rim is equally thick in pixels.
pub(crate) fn rim_offset(thickness: f32, size: (u32, u32)) -> Vec2 {
    let (width, height) = size;
    if height == 0 {
        return Vec2::new(thickness, thickness);
    }
    Vec2::new(thickness, thickness * width as f32 / height as f32)
}

/// Edge-detected rim overlay.
pub struct RimPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    params_buffer: wgpu::Buffer,
}

impl RimPass {
    /// Build the pass for an `output_format` destination.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ShaderBuild`] if the shader fails to compose.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        output_format: wgpu::TextureFormat,
        targets: &RenderTargets,
    ) -> Result<Self, RenderError> {
        let module = composer.compose(device, Shader::Rim, &[])?;
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Rim Bind Group Layout"),
                entries: &[
                    texture_2d(0),
                    filtering_sampler(1),
                    uniform_buffer(2, wgpu::ShaderStages::FRAGMENT),
                ],
            });
        let pipeline = create_screen_space_pipeline(
            device,
            "Rim",
            &module,
            "fs_main",
            output_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            &[&layout],
        );
        let sampler = linear_sampler(device, "Rim Sampler");
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Rim Params Buffer"),
            size: size_of::<RimUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = Self::create_bind_group(
            device,
            &layout,
            targets,
            &sampler,
            &params_buffer,
        );
        Ok(Self {
            pipeline,
            layout,
            bind_group,
            sampler,
            params_buffer,
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        targets: &RenderTargets,
        sampler: &wgpu::Sampler,
        params_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Rim Bind Group"),
            layout,
            entries: &[
                view_entry(0, &targets.passthrough.resolved().view),
                sampler_entry(1, sampler),
                buffer_entry(2, params_buffer),
            ],
        })
    }

    /// Upload this frame's rim color and thickness.
    pub fn prepare(
        &self,
        queue: &wgpu::Queue,
        params: &FrameParams,
        size: (u32, u32),
    ) {
        let uniform = RimUniform {
            color: params.rim_color.to_array(),
            offset: rim_offset(params.rim_thickness, size).to_array(),
            _pad: [0.0; 2],
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&uniform));
    }
}

impl ScreenPass for RimPass {
    fn render(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        let mut pass =
            begin_output_pass(encoder, "Rim Pass", output, wgpu::LoadOp::Load);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn rebind(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.bind_group = Self::create_bind_group(
            device,
            &self.layout,
            targets,
            &self.sampler,
            &self.params_buffer,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_target_uses_equal_spacing() {
        assert_eq!(rim_offset(0.01, (400, 400)), Vec2::new(0.01, 0.01));
    }

    #[test]
    fn wide_target_scales_vertical_spacing() {
        let offset = rim_offset(0.0025, (800, 400));
        assert_eq!(offset.x, 0.0025);
        assert!((offset.y - 0.005).abs() < 1e-7);
        // Equal thickness in pixels along both axes.
        assert!((offset.x * 800.0 - offset.y * 400.0).abs() < 1e-4);
    }

    #[test]
    fn uniform_is_32_bytes() {
        assert_eq!(size_of::<RimUniform>(), 32);
    }
}
