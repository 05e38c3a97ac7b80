//! Vertex-normal line overlay.
//!
//! Each mesh vertex becomes a line from the vertex to a point along its
//! transformed normal. Vertices and instances are fetched from storage
//! buffers by index, so the overlay reuses the scene's uploads as-is.

use super::scene_pass::{multisample_state, scene_color_targets, scene_depth_state, MeshDraw};
use crate::error::RenderError;
use crate::gpu::pipeline_helpers::{buffer_entry, vertex_storage_buffer};
use crate::gpu::shader_composer::{Shader, ShaderComposer};

/// Line overlay pipeline and its instance-storage binding.
pub struct NormalsOverlay {
    module: wgpu::ShaderModule,
    instance_layout: wgpu::BindGroupLayout,
    instance_bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl NormalsOverlay {
    /// Build the overlay reading instances from `instances`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ShaderBuild`] if the normals shader fails to
    /// compose.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        frame_layout: &wgpu::BindGroupLayout,
        mesh_layout: &wgpu::BindGroupLayout,
        instances: &wgpu::Buffer,
        sample_count: u32,
    ) -> Result<Self, RenderError> {
        let module = composer.compose(device, Shader::Normals, &[])?;
        let instance_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Normals Instance Layout"),
                entries: &[vertex_storage_buffer(0)],
            });
        let instance_bind_group =
            Self::create_instance_bind_group(device, &instance_layout, instances);
        let pipeline = Self::create_pipeline(
            device,
            &module,
            &[frame_layout, &instance_layout, mesh_layout],
            sample_count,
        );
        Ok(Self {
            module,
            instance_layout,
            instance_bind_group,
            pipeline,
        })
    }

    fn create_instance_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        instances: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Normals Instance Bind Group"),
            layout,
            entries: &[buffer_entry(0, instances)],
        })
    }

    fn create_pipeline(
        device: &wgpu::Device,
        module: &wgpu::ShaderModule,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
        sample_count: u32,
    ) -> wgpu::RenderPipeline {
        let layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Normals Pipeline Layout"),
                bind_group_layouts,
                push_constant_ranges: &[],
            });
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Normals Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                targets: &scene_color_targets(false),
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
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
        mesh_layout: &wgpu::BindGroupLayout,
        sample_count: u32,
    ) {
        self.pipeline = Self::create_pipeline(
            device,
            &self.module,
            &[frame_layout, &self.instance_layout, mesh_layout],
            sample_count,
        );
    }

    /// Point the overlay at a reallocated instance buffer.
    pub fn bind_instances(
        &mut self,
        device: &wgpu::Device,
        instances: &wgpu::Buffer,
    ) {
        self.instance_bind_group = Self::create_instance_bind_group(
            device,
            &self.instance_layout,
            instances,
        );
    }

    /// Draw normal lines for every batch. The frame bind group must already
    /// be at group 0.
    pub(crate) fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        draws: &[MeshDraw<'_>],
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(1, &self.instance_bind_group, &[]);
        for draw in draws {
            if draw.mesh.vertex_count() == 0 {
                continue;
            }
            pass.set_bind_group(2, draw.mesh.storage_bind_group(), &[]);
            pass.draw(0..draw.mesh.vertex_count() * 2, draw.instances.clone());
        }
    }
}
