//! Debug view: the passthrough ids and rim channel as two small quads in
//! the top-right corner of the destination.

use super::screen_pass::{begin_output_pass, ScreenPass};
use crate::error::RenderError;
use crate::gpu::pipeline_helpers::{
    create_screen_space_pipeline, filtering_sampler, linear_sampler,
    sampler_entry, texture_2d, view_entry,
};
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::renderer::targets::RenderTargets;

/// Fraction of the destination each quad covers along both axes.
const QUAD_FRACTION: f32 = 0.2;

/// Viewport rectangle `(x, y, width, height)` in pixels, origin top-left.
pub(crate) type Rect = (f32, f32, f32, f32);

/// Rectangles of the rgb quad and the rim quad for a `width` x `height`
/// destination: stacked down the right edge, rgb on top.
pub(crate) fn diagnostic_rects(width: u32, height: u32) -> [Rect; 2] {
    let w = width as f32 * QUAD_FRACTION;
    let h = height as f32 * QUAD_FRACTION;
    let x = width as f32 - w;
    [(x, 0.0, w, h), (x, h, w, h)]
}

/// Draws the two diagnostic quads.
pub struct DiagnosticsPass {
    rgb: wgpu::RenderPipeline,
    alpha: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    size: (u32, u32),
}

impl DiagnosticsPass {
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
        let module = composer.compose(device, Shader::Diagnostics, &[])?;
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Diagnostics Bind Group Layout"),
                entries: &[texture_2d(0), filtering_sampler(1)],
            });
        let pipeline = |entry: &str, label: &str| {
            create_screen_space_pipeline(
                device,
                label,
                &module,
                entry,
                output_format,
                None,
                &[&layout],
            )
        };
        let rgb = pipeline("fs_rgb", "Diagnostics Rgb");
        let alpha = pipeline("fs_alpha", "Diagnostics Alpha");
        let sampler = linear_sampler(device, "Diagnostics Sampler");
        let bind_group =
            Self::create_bind_group(device, &layout, targets, &sampler);
        Ok(Self {
            rgb,
            alpha,
            layout,
            bind_group,
            sampler,
            size: targets.size(),
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        targets: &RenderTargets,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Diagnostics Bind Group"),
            layout,
            entries: &[
                view_entry(0, &targets.passthrough.resolved().view),
                sampler_entry(1, sampler),
            ],
        })
    }
}

impl ScreenPass for DiagnosticsPass {
    fn render(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        let mut pass = begin_output_pass(
            encoder,
            "Diagnostics Pass",
            output,
            wgpu::LoadOp::Load,
        );
        pass.set_bind_group(0, &self.bind_group, &[]);
        let [rgb_rect, alpha_rect] = diagnostic_rects(self.size.0, self.size.1);
        for (pipeline, (x, y, w, h)) in
            [(&self.rgb, rgb_rect), (&self.alpha, alpha_rect)]
        {
            pass.set_viewport(x, y, w, h, 0.0, 1.0);
            pass.set_pipeline(pipeline);
            pass.draw(0..3, 0..1);
        }
    }

    fn rebind(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.bind_group = Self::create_bind_group(
            device,
            &self.layout,
            targets,
            &self.sampler,
        );
        self.size = targets.size();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quads_stack_in_top_right_corner() {
        let [rgb, alpha] = diagnostic_rects(1000, 500);
        assert_eq!(rgb, (800.0, 0.0, 200.0, 100.0));
        assert_eq!(alpha, (800.0, 100.0, 200.0, 100.0));
    }

    #[test]
    fn quads_stay_inside_destination() {
        for (w, h) in [(1, 1), (641, 479), (3840, 2160)] {
            for (x, y, qw, qh) in diagnostic_rects(w, h) {
                assert!(x + qw <= w as f32 + 1e-3);
                assert!(y + qh <= h as f32 + 1e-3);
            }
        }
    }
}
