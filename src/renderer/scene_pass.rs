//! Scene pass: instanced meshes into the color and passthrough targets.
//!
//! One render pass with two color attachments. The color attachment is
//! alpha-blended; the passthrough attachment is written without blending so
//! its bytes stay exact. The floor and the normals overlay share the pass
//! but mask the passthrough attachment off.

use std::ops::Range;

use wgpu::util::DeviceExt;

use super::floor::GroundPlane;
use super::frame::{FrameParams, FrameUniform};
use super::normals::NormalsOverlay;
use super::targets::{RenderTargets, COLOR_FORMAT, DEPTH_FORMAT, PASSTHROUGH_FORMAT};
use crate::error::RenderError;
use crate::gpu::dynamic_buffer::TypedBuffer;
use crate::gpu::pipeline_helpers::{buffer_entry, uniform_buffer};
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::mesh::{GpuMesh, MeshRegistry, MeshVertex};
use crate::scene::{InstanceRaw, MeshInstance};

/// Instances the stream holds before its first growth.
const INITIAL_INSTANCE_CAPACITY: usize = 1024;

/// One instanced draw: a mesh and the instance range that uses it.
pub(crate) struct MeshDraw<'a> {
    pub(crate) mesh: &'a GpuMesh,
    pub(crate) instances: Range<u32>,
}

/// Color targets of every pipeline in the scene pass. The passthrough slot
/// is written only when `passthrough` is set.
pub(crate) fn scene_color_targets(
    passthrough: bool,
) -> [Option<wgpu::ColorTargetState>; 2] {
    [
        Some(wgpu::ColorTargetState {
            format: COLOR_FORMAT,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        }),
        Some(wgpu::ColorTargetState {
            format: PASSTHROUGH_FORMAT,
            blend: None,
            write_mask: if passthrough {
                wgpu::ColorWrites::ALL
            } else {
                wgpu::ColorWrites::empty()
            },
        }),
    ]
}

/// Depth state shared by the scene pass pipelines.
pub(crate) fn scene_depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Multisample state for `sample_count` samples.
pub(crate) fn multisample_state(sample_count: u32) -> wgpu::MultisampleState {
    wgpu::MultisampleState {
        count: sample_count,
        mask: !0,
        alpha_to_coverage_enabled: false,
    }
}

/// Owns the frame uniform, the instance stream, and the mesh pipelines.
pub struct ScenePass {
    frame_buffer: wgpu::Buffer,
    frame_layout: wgpu::BindGroupLayout,
    frame_bind_group: wgpu::BindGroup,
    module: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    shaded: wgpu::RenderPipeline,
    wireframe: Option<wgpu::RenderPipeline>,
    instances: TypedBuffer<InstanceRaw>,
    floor: GroundPlane,
    normals: NormalsOverlay,
    wireframe_warned: bool,
}

impl ScenePass {
    /// Build the pass for `sample_count` samples.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ShaderBuild`] if a scene shader fails to
    /// compose.
    pub fn new(
        context: &RenderContext,
        composer: &mut ShaderComposer,
        meshes: &MeshRegistry,
        sample_count: u32,
    ) -> Result<Self, RenderError> {
        let device = &context.device;
        let frame_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Frame Uniform Buffer"),
                contents: bytemuck::cast_slice(&[FrameUniform::new(
                    &FrameParams::default(),
                )]),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });
        let frame_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame Bind Group Layout"),
                entries: &[uniform_buffer(
                    0,
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                )],
            });
        let frame_bind_group =
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Frame Bind Group"),
                layout: &frame_layout,
                entries: &[buffer_entry(0, &frame_buffer)],
            });

        let module = composer.compose(device, Shader::Scene, &[])?;
        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Scene Pipeline Layout"),
                bind_group_layouts: &[&frame_layout],
                push_constant_ranges: &[],
            });
        let shaded = Self::create_pipeline(
            device,
            &module,
            &pipeline_layout,
            wgpu::PolygonMode::Fill,
            sample_count,
        );
        let wireframe = context.supports_wireframe().then(|| {
            Self::create_pipeline(
                device,
                &module,
                &pipeline_layout,
                wgpu::PolygonMode::Line,
                sample_count,
            )
        });

        let instances = TypedBuffer::with_capacity(
            device,
            "Instance Buffer",
            INITIAL_INSTANCE_CAPACITY,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE,
        );
        let floor =
            GroundPlane::new(context, composer, &frame_layout, sample_count)?;
        let normals = NormalsOverlay::new(
            device,
            composer,
            &frame_layout,
            meshes.storage_layout(),
            instances.buffer(),
            sample_count,
        )?;

        Ok(Self {
            frame_buffer,
            frame_layout,
            frame_bind_group,
            module,
            pipeline_layout,
            shaded,
            wireframe,
            instances,
            floor,
            normals,
            wireframe_warned: false,
        })
    }

    fn create_pipeline(
        device: &wgpu::Device,
        module: &wgpu::ShaderModule,
        layout: &wgpu::PipelineLayout,
        polygon_mode: wgpu::PolygonMode,
        sample_count: u32,
    ) -> wgpu::RenderPipeline {
        let label = match polygon_mode {
            wgpu::PolygonMode::Fill => "Scene Pipeline",
            _ => "Scene Wireframe Pipeline",
        };
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::layout(), InstanceRaw::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                targets: &scene_color_targets(true),
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                polygon_mode,
                ..Default::default()
            },
            depth_stencil: Some(scene_depth_state()),
            multisample: multisample_state(sample_count),
            multiview: None,
            cache: None,
        })
    }

    /// Rebuild every pipeline for a new sample count.
    pub fn rebuild_pipelines(
        &mut self,
        context: &RenderContext,
        meshes: &MeshRegistry,
        sample_count: u32,
    ) {
        let device = &context.device;
        log::debug!("rebuilding scene pipelines for {sample_count}x MSAA");
        self.shaded = Self::create_pipeline(
            device,
            &self.module,
            &self.pipeline_layout,
            wgpu::PolygonMode::Fill,
            sample_count,
        );
        if self.wireframe.is_some() {
            self.wireframe = Some(Self::create_pipeline(
                device,
                &self.module,
                &self.pipeline_layout,
                wgpu::PolygonMode::Line,
                sample_count,
            ));
        }
        self.floor
            .rebuild_pipeline(device, &self.frame_layout, sample_count);
        self.normals.rebuild_pipeline(
            device,
            &self.frame_layout,
            meshes.storage_layout(),
            sample_count,
        );
    }

    /// Upload the frame uniform and the sorted instance list.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Allocation`] if growing the instance stream
    /// runs the device out of memory.
    pub fn upload(
        &mut self,
        context: &RenderContext,
        instances: &[MeshInstance],
        params: &FrameParams,
    ) -> Result<(), RenderError> {
        context.queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::cast_slice(&[FrameUniform::new(params)]),
        );

        let raw: Vec<InstanceRaw> =
            instances.iter().map(MeshInstance::to_raw).collect();
        let reallocated = if self.instances.needs_growth(raw.len()) {
            context.allocation_scope(|| {
                Ok(self.instances.write(&context.device, &context.queue, &raw))
            })?
        } else {
            self.instances.write(&context.device, &context.queue, &raw)
        };
        if reallocated {
            self.normals
                .bind_instances(&context.device, self.instances.buffer());
        }
        Ok(())
    }

    /// Record the scene pass. `draws` must come from the list last passed to
    /// [`upload`](Self::upload).
    pub fn encode(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        draws: &[MeshDraw<'_>],
        params: &FrameParams,
    ) {
        if params.flags.wireframe
            && self.wireframe.is_none()
            && !self.wireframe_warned
        {
            log::warn!(
                "wireframe requested but POLYGON_MODE_LINE is unavailable"
            );
            self.wireframe_warned = true;
        }
        self.record(encoder, targets, draws, params);
    }

    fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        draws: &[MeshDraw<'_>],
        params: &FrameParams,
    ) {
        let pipeline = match &self.wireframe {
            Some(wireframe) if params.flags.wireframe => wireframe,
            _ => &self.shaded,
        };
        let (color_view, color_resolve) = targets.color.attachment();
        let (passthrough_view, passthrough_resolve) =
            targets.passthrough.attachment();
        let bg = params.background.as_dvec4();

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    depth_slice: None,
                    resolve_target: color_resolve,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: bg.x,
                            g: bg.y,
                            b: bg.z,
                            a: bg.w,
                        }),
                        store: if color_resolve.is_some() {
                            wgpu::StoreOp::Discard
                        } else {
                            wgpu::StoreOp::Store
                        },
                    },
                }),
                // Kept after the resolve: hit testing reads single samples.
                Some(wgpu::RenderPassColorAttachment {
                    view: passthrough_view,
                    depth_slice: None,
                    resolve_target: passthrough_resolve,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                }),
            ],
            depth_stencil_attachment: Some(
                wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                },
            ),
            ..Default::default()
        });

        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        if params.flags.show_floor {
            self.floor.draw(&mut pass);
        }

        if !draws.is_empty() {
            pass.set_pipeline(pipeline);
            pass.set_vertex_buffer(
                1,
                self.instances.slice(0..self.instances.count()),
            );
            for draw in draws {
                let vertex_count = draw.mesh.vertex_count();
                if vertex_count == 0 {
                    continue;
                }
                pass.set_vertex_buffer(0, draw.mesh.vertex_buffer().slice(..));
                pass.draw(0..vertex_count, draw.instances.clone());
            }
            if params.flags.show_normals {
                self.normals.draw(&mut pass, draws);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_slot_is_unblended() {
        let [color, passthrough] = scene_color_targets(true);
        let color = color.unwrap();
        let passthrough = passthrough.unwrap();
        assert_eq!(color.blend, Some(wgpu::BlendState::ALPHA_BLENDING));
        assert_eq!(passthrough.blend, None);
        assert_eq!(passthrough.write_mask, wgpu::ColorWrites::ALL);
    }

    #[test]
    fn overlays_leave_passthrough_untouched() {
        let [_, passthrough] = scene_color_targets(false);
        assert!(passthrough.unwrap().write_mask.is_empty());
    }
}
