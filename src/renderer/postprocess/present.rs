//! Copies the resolved scene color into the destination.

use super::screen_pass::{begin_output_pass, ScreenPass};
use crate::error::RenderError;
use crate::gpu::pipeline_helpers::{
    create_screen_space_pipeline, texture_2d_loaded, view_entry,
};
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::renderer::targets::RenderTargets;

/// Opaque copy of the scene color image.
pub struct PresentPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl PresentPass {
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
        let module = composer.compose(device, Shader::Present, &[])?;
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Present Bind Group Layout"),
                entries: &[texture_2d_loaded(0, false)],
            });
        let pipeline = create_screen_space_pipeline(
            device,
            "Present",
            &module,
            "fs_main",
            output_format,
            None,
            &[&layout],
        );
        let bind_group = Self::create_bind_group(device, &layout, targets);
        Ok(Self {
            pipeline,
            layout,
            bind_group,
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        targets: &RenderTargets,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Present Bind Group"),
            layout,
            entries: &[view_entry(0, &targets.color.resolved().view)],
        })
    }
}

impl ScreenPass for PresentPass {
    fn render(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        let mut pass = begin_output_pass(
            encoder,
            "Present Pass",
            output,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
        );
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn rebind(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.bind_group = Self::create_bind_group(device, &self.layout, targets);
    }
}
