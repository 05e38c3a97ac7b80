//! Copies the 3x3 passthrough neighbourhood of the pointer into the small
//! hit-region target, reading one sample per pixel.

use super::region::HitRegion;
use crate::error::RenderError;
use crate::gpu::pipeline_helpers::{
    buffer_entry, create_screen_space_pipeline, texture_2d_loaded,
    uniform_buffer, view_entry,
};
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::renderer::targets::{RenderTargets, PASSTHROUGH_FORMAT};

/// Uniform telling the shader where the region starts.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct RegionUniform {
    origin: [i32; 2],
    _pad: [i32; 2],
}

impl RegionUniform {
    fn new(region: HitRegion) -> Self {
        Self {
            origin: [region.origin.0 as i32, region.origin.1 as i32],
            _pad: [0; 2],
        }
    }
}

/// Sample-selection pass for either a single-sampled or a multisampled
/// passthrough source.
pub struct SampleSelectPass {
    single: wgpu::ShaderModule,
    multi: wgpu::ShaderModule,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    region_buffer: wgpu::Buffer,
    multisampled: bool,
}

impl SampleSelectPass {
    /// Compose both shader variants and bind to `targets`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ShaderBuild`] if either variant fails to
    /// compose.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        targets: &RenderTargets,
    ) -> Result<Self, RenderError> {
        let single = composer.compose(device, Shader::SampleSelect, &[])?;
        let multi =
            composer.compose(device, Shader::SampleSelect, &["MULTISAMPLED"])?;
        let region_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Hit Region Uniform"),
            size: size_of::<RegionUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let multisampled = targets.is_multisampled();
        let layout = Self::create_layout(device, multisampled);
        let pipeline = Self::create_pipeline(
            device,
            if multisampled { &multi } else { &single },
            &layout,
        );
        let bind_group =
            Self::create_bind_group(device, &layout, targets, &region_buffer);

        Ok(Self {
            single,
            multi,
            layout,
            pipeline,
            bind_group,
            region_buffer,
            multisampled,
        })
    }

    fn create_layout(
        device: &wgpu::Device,
        multisampled: bool,
    ) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sample Select Bind Group Layout"),
            entries: &[
                texture_2d_loaded(0, multisampled),
                uniform_buffer(1, wgpu::ShaderStages::FRAGMENT),
            ],
        })
    }

    fn create_pipeline(
        device: &wgpu::Device,
        module: &wgpu::ShaderModule,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        create_screen_space_pipeline(
            device,
            "Sample Select",
            module,
            "fs_main",
            PASSTHROUGH_FORMAT,
            None,
            &[layout],
        )
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        targets: &RenderTargets,
        region_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sample Select Bind Group"),
            layout,
            entries: &[
                view_entry(0, targets.passthrough.samples_view()),
                buffer_entry(1, region_buffer),
            ],
        })
    }

    /// Point at freshly allocated targets, switching shader variant when
    /// the passthrough source changed between single- and multisampled.
    pub fn rebind(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        let multisampled = targets.is_multisampled();
        if multisampled != self.multisampled {
            self.multisampled = multisampled;
            self.layout = Self::create_layout(device, multisampled);
            let module = if multisampled { &self.multi } else { &self.single };
            self.pipeline = Self::create_pipeline(device, module, &self.layout);
        }
        self.bind_group = Self::create_bind_group(
            device,
            &self.layout,
            targets,
            &self.region_buffer,
        );
    }

    /// Fill the hit-region target with the passthrough texels of `region`.
    pub fn encode(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        region: HitRegion,
    ) {
        queue.write_buffer(
            &self.region_buffer,
            0,
            bytemuck::bytes_of(&RegionUniform::new(region)),
        );
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Sample Select Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.hit_region.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_uniform_matches_shader_layout() {
        assert_eq!(size_of::<RegionUniform>(), 16);
        let uniform = RegionUniform::new(HitRegion {
            origin: (7, 9),
            pointer: (1, 1),
        });
        assert_eq!(uniform.origin, [7, 9]);
    }
}
