//! Per-frame draw arguments and results.

use glam::{Mat4, Vec3, Vec4};
use web_time::Duration;

use crate::options::{DrawFlags, RenderOptions};

/// Everything one `draw` call needs besides the instance list.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameParams {
    /// World-to-view transform.
    pub view_matrix: Mat4,
    /// View-to-clip transform (wgpu depth range 0..1).
    pub projection_matrix: Mat4,
    /// World-space eye position, for specular highlights.
    pub view_position: Vec3,
    /// World-space point light position.
    pub light_position: Vec3,
    /// Linear RGB light color.
    pub light_color: Vec3,
    /// Ambient fraction of the light color.
    pub ambient_strength: f32,
    /// Specular highlight weight.
    pub specular_strength: f32,
    /// Specular exponent.
    pub shininess: f32,
    /// Clear color of the color target.
    pub background: Vec4,
    /// Rim overlay color; alpha scales opacity.
    pub rim_color: Vec4,
    /// Rim width as a fraction of the output width.
    pub rim_thickness: f32,
    /// Normal overlay line length in world units.
    pub normal_length: f32,
    /// Feature toggles.
    pub flags: DrawFlags,
    /// Pointer in output pixels, origin top-left; `None` when the pointer
    /// is not over the output.
    pub pointer: Option<(u32, u32)>,
}

impl FrameParams {
    /// Frame parameters from `options` and the caller's camera.
    #[must_use]
    pub fn from_options(
        options: &RenderOptions,
        view_matrix: Mat4,
        projection_matrix: Mat4,
        view_position: Vec3,
    ) -> Self {
        let lighting = &options.lighting;
        let colors = &options.colors;
        Self {
            view_matrix,
            projection_matrix,
            view_position,
            light_position: Vec3::from(lighting.light_position),
            light_color: Vec3::from(lighting.light_color),
            ambient_strength: lighting.ambient_strength,
            specular_strength: lighting.specular_strength,
            shininess: lighting.shininess,
            background: Vec4::from(colors.background),
            rim_color: Vec4::from(colors.rim_color),
            rim_thickness: colors.rim_thickness,
            normal_length: colors.normal_length,
            flags: options.flags,
            pointer: None,
        }
    }

    /// Same parameters with the pointer at `pointer`.
    #[must_use]
    pub fn with_pointer(mut self, pointer: Option<(u32, u32)>) -> Self {
        self.pointer = pointer;
        self
    }
}

impl Default for FrameParams {
    fn default() -> Self {
        Self::from_options(
            &RenderOptions::default(),
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            Vec3::Z,
        )
    }
}

/// What a `draw` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Instances drawn.
    pub instances: usize,
    /// Instanced draw calls issued for the scene meshes.
    pub batches: usize,
    /// Whether a hit-test pixel was requested this frame.
    pub hit_test_requested: bool,
    /// CPU time spent sorting, uploading, encoding, and submitting.
    pub encode_time: Duration,
}

/// GPU copy of the per-frame camera and lighting; mirrors `FrameUniform`
/// in `modules/frame.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct FrameUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    light_position: [f32; 4],
    light_color: [f32; 4],
    view_position: [f32; 4],
    overlay: [f32; 4],
}

impl FrameUniform {
    pub(crate) fn new(params: &FrameParams) -> Self {
        Self {
            view: params.view_matrix.to_cols_array_2d(),
            projection: params.projection_matrix.to_cols_array_2d(),
            light_position: params
                .light_position
                .extend(params.ambient_strength)
                .to_array(),
            light_color: params
                .light_color
                .extend(params.specular_strength)
                .to_array(),
            view_position: params.view_position.extend(params.shininess).to_array(),
            overlay: [params.normal_length, 0.0, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_uniform_packs_scalars_into_w() {
        let params = FrameParams::default();
        let uniform = FrameUniform::new(&params);
        assert_eq!(uniform.light_position[3], params.ambient_strength);
        assert_eq!(uniform.light_color[3], params.specular_strength);
        assert_eq!(uniform.view_position[3], params.shininess);
        assert_eq!(size_of::<FrameUniform>(), 192);
    }

    #[test]
    fn options_flow_into_params() {
        let mut options = RenderOptions::default();
        options.flags.show_floor = true;
        options.colors.rim_thickness = 0.02;
        let params = FrameParams::from_options(
            &options,
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            Vec3::ZERO,
        )
        .with_pointer(Some((4, 5)));
        assert!(params.flags.show_floor);
        assert_eq!(params.rim_thickness, 0.02);
        assert_eq!(params.pointer, Some((4, 5)));
        assert_eq!(params.background, Vec4::new(0.89, 0.89, 0.89, 1.0));
    }
}
