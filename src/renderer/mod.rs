//! The frame pipeline and its owning context.
//!
//! [`SceneRenderer`] runs, in order: the scene pass into the multisampled
//! targets (with resolve), the hit-test sample selection and pixel copy,
//! the present pass into the caller's destination, and the optional rim
//! and diagnostic overlays. Everything is recorded into one command buffer
//! and submitted once per [`draw`](SceneRenderer::draw).

pub(crate) mod floor;
pub mod frame;
pub mod hit_test;
pub(crate) mod normals;
pub mod postprocess;
pub(crate) mod scene_pass;
pub mod targets;

use web_time::Instant;

pub use self::frame::{FrameParams, FrameStats};
pub use self::hit_test::HitTestResult;

use self::hit_test::HitTester;
use self::postprocess::diagnostics::DiagnosticsPass;
use self::postprocess::present::PresentPass;
use self::postprocess::rim::RimPass;
use self::postprocess::ScreenPass;
use self::scene_pass::{MeshDraw, ScenePass};
use self::targets::RenderTargets;
use crate::error::RenderError;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::mesh::{MeshId, MeshRegistry, MeshVertex};
use crate::scene::batch::{batches, sort_for_drawing};
use crate::scene::MeshInstance;

/// Owns the mesh registry, the render targets, and every pass.
///
/// One renderer serves one rendering thread and one device. Meshes
/// allocated through it live as long as it does.
pub struct SceneRenderer {
    meshes: MeshRegistry,
    targets: RenderTargets,
    scene: ScenePass,
    hit_test: HitTester,
    present: PresentPass,
    rim: RimPass,
    diagnostics: DiagnosticsPass,
    output_format: wgpu::TextureFormat,
}

impl SceneRenderer {
    /// Compile every shader and allocate `size` targets with
    /// `sample_count` samples. Destinations passed to
    /// [`draw`](Self::draw) must have `output_format`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ShaderBuild`] if a shader fails to compose,
    /// [`RenderError::InvalidTargetSize`] or
    /// [`RenderError::UnsupportedSampleCount`] for bad target parameters,
    /// and [`RenderError::Allocation`] if the device runs out of memory.
    pub fn new(
        context: &RenderContext,
        output_format: wgpu::TextureFormat,
        size: (u32, u32),
        sample_count: u32,
    ) -> Result<Self, RenderError> {
        let (width, height) = size;
        RenderTargets::validate(
            width,
            height,
            sample_count,
            context.sample_counts(),
        )?;

        let device = &context.device;
        let mut composer = ShaderComposer::new()?;
        let meshes = MeshRegistry::new(device);
        let targets = context.allocation_scope(|| {
            Ok(RenderTargets::new(device, width, height, sample_count))
        })?;
        let scene =
            ScenePass::new(context, &mut composer, &meshes, sample_count)?;
        let hit_test = HitTester::new(device, &mut composer, &targets)?;
        let present =
            PresentPass::new(device, &mut composer, output_format, &targets)?;
        let rim = RimPass::new(device, &mut composer, output_format, &targets)?;
        let diagnostics = DiagnosticsPass::new(
            device,
            &mut composer,
            output_format,
            &targets,
        )?;

        log::info!(
            "scene renderer ready: {width}x{height}, {sample_count}x MSAA, \
             output {output_format:?}"
        );
        Ok(Self {
            meshes,
            targets,
            scene,
            hit_test,
            present,
            rim,
            diagnostics,
            output_format,
        })
    }

    /// Upload a triangle list and return its id. Ids strictly increase.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Allocation`] if the device runs out of
    /// memory.
    pub fn allocate_mesh(
        &mut self,
        context: &RenderContext,
        vertices: &[MeshVertex],
    ) -> Result<MeshId, RenderError> {
        let meshes = &mut self.meshes;
        context.allocation_scope(|| Ok(meshes.allocate(&context.device, vertices)))
    }

    /// Return the mesh cached under `key`, building it with `build` and
    /// uploading it only the first time the key is seen.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Allocation`] if the device runs out of
    /// memory.
    pub fn allocate_mesh_keyed(
        &mut self,
        context: &RenderContext,
        key: &str,
        build: impl FnOnce() -> Vec<MeshVertex>,
    ) -> Result<MeshId, RenderError> {
        let meshes = &mut self.meshes;
        context.allocation_scope(|| {
            Ok(meshes.allocate_keyed(&context.device, key, build))
        })
    }

    /// Replace every render target for a new size or sample count. Does
    /// nothing when neither changed. In-flight hit-test transfers and the
    /// current hit-test result are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidTargetSize`] or
    /// [`RenderError::UnsupportedSampleCount`] for bad parameters (the old
    /// targets stay in place), and [`RenderError::Allocation`] if the
    /// device runs out of memory.
    pub fn reallocate_buffers(
        &mut self,
        context: &RenderContext,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> Result<(), RenderError> {
        RenderTargets::validate(
            width,
            height,
            sample_count,
            context.sample_counts(),
        )?;
        if self.targets.size() == (width, height)
            && self.targets.sample_count() == sample_count
        {
            return Ok(());
        }

        let device = &context.device;
        let targets = context.allocation_scope(|| {
            Ok(RenderTargets::new(device, width, height, sample_count))
        })?;
        let previous_samples = self.targets.sample_count();
        self.targets = targets;

        if sample_count != previous_samples {
            self.scene
                .rebuild_pipelines(context, &self.meshes, sample_count);
        }
        self.hit_test.rebind(device, &self.targets);
        self.present.rebind(device, &self.targets);
        self.rim.rebind(device, &self.targets);
        self.diagnostics.rebind(device, &self.targets);
        Ok(())
    }

    /// Draw one frame into `destination`.
    ///
    /// `instances` is reordered in place into submission order (opaque
    /// first, then by mesh). Passthrough payloads travel with their
    /// instances, so ids assigned before the call still identify them.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DestinationMismatch`] if `destination` does
    /// not match the targets' size and the output format,
    /// [`RenderError::UnknownMesh`] for an instance whose mesh was never
    /// allocated, [`RenderError::TooManyInstances`] if the list does not
    /// fit an instanced draw, and [`RenderError::Allocation`] if growing
    /// the instance stream runs out of memory. Nothing is submitted when an
    /// error is returned.
    pub fn draw(
        &mut self,
        context: &RenderContext,
        instances: &mut [MeshInstance],
        params: &FrameParams,
        destination: &wgpu::Texture,
    ) -> Result<FrameStats, RenderError> {
        let started = Instant::now();
        self.check_destination(destination)?;
        if u32::try_from(instances.len()).is_err() {
            return Err(RenderError::TooManyInstances(instances.len()));
        }

        sort_for_drawing(instances);
        let draws = resolve_draws(&self.meshes, instances)?;
        self.scene.upload(context, instances, params)?;

        let mut encoder = context.create_encoder();
        self.scene
            .encode(&mut encoder, &self.targets, &draws, params);
        let hit_test_requested = self.hit_test.encode(
            &context.device,
            &context.queue,
            &mut encoder,
            &self.targets,
            params,
        );

        let output =
            destination.create_view(&wgpu::TextureViewDescriptor::default());
        self.present.render(&mut encoder, &output);
        if params.flags.draw_rims {
            self.rim
                .prepare(&context.queue, params, self.targets.size());
            self.rim.render(&mut encoder, &output);
        }
        if params.flags.diagnostics {
            self.diagnostics.render(&mut encoder, &output);
        }

        let submission = context.submit(encoder);
        self.hit_test.after_submit(&context.device, submission);

        let stats = FrameStats {
            instances: instances.len(),
            batches: draws.len(),
            hit_test_requested,
            encode_time: started.elapsed(),
        };
        log::trace!("frame: {stats:?}");
        Ok(stats)
    }

    fn check_destination(
        &self,
        destination: &wgpu::Texture,
    ) -> Result<(), RenderError> {
        let (width, height) = self.targets.size();
        let found = (destination.width(), destination.height(), destination.format());
        let expected = (width, height, self.output_format);
        if found == expected {
            Ok(())
        } else {
            Err(RenderError::DestinationMismatch { expected, found })
        }
    }

    /// The latest hit-test result: one frame old on the optimized path,
    /// from the current frame on the synchronous path.
    #[must_use]
    pub fn hit_test_result(&self) -> HitTestResult {
        self.hit_test.result()
    }

    /// Current target size in pixels.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.targets.size()
    }

    /// Current samples per pixel.
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.targets.sample_count()
    }

    /// Format destinations must have.
    #[must_use]
    pub fn output_format(&self) -> wgpu::TextureFormat {
        self.output_format
    }

    /// The mesh registry.
    #[must_use]
    pub fn meshes(&self) -> &MeshRegistry {
        &self.meshes
    }
}

/// One draw per run of equal mesh ids in the sorted list.
fn resolve_draws<'a>(
    meshes: &'a MeshRegistry,
    instances: &[MeshInstance],
) -> Result<Vec<MeshDraw<'a>>, RenderError> {
    batches(instances)
        .map(|batch| {
            Ok(MeshDraw {
                mesh: meshes.get(batch.mesh_id)?,
                instances: batch.range.start as u32..batch.range.end as u32,
            })
        })
        .collect()
}
