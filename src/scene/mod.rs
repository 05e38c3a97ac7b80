//! Per-frame scene description: mesh instances and their passthrough
//! labels.

pub mod batch;
pub mod label;

use glam::{Mat3, Mat4, Vec4};

use crate::mesh::MeshId;

/// Bytes written to the passthrough target for every pixel an instance
/// covers.
///
/// `b0`/`b1` are an opaque 16-bit logical id (low byte first, 0 = nothing)
/// and `rim` is the rim highlight intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Passthrough {
    /// Low byte of the logical id.
    pub b0: u8,
    /// High byte of the logical id.
    pub b1: u8,
    /// Rim intensity, 0 (none) to 255 (full).
    pub rim: u8,
}

impl Passthrough {
    /// Passthrough carrying `id` with no rim.
    #[must_use]
    pub fn from_id(id: u16) -> Self {
        let [b0, b1] = id.to_le_bytes();
        Self { b0, b1, rim: 0 }
    }

    /// The logical id carried in `b0`/`b1`.
    #[must_use]
    pub fn logical_id(self) -> u16 {
        u16::from_le_bytes([self.b0, self.b1])
    }

    /// Same id with rim intensity `rim`.
    #[must_use]
    pub fn with_rim(self, rim: u8) -> Self {
        Self { rim, ..self }
    }

    /// Packed RGBA8 word as read by the shaders: (b0, b1, unused, rim).
    fn packed(self) -> u32 {
        u32::from_le_bytes([self.b0, self.b1, 0, self.rim])
    }
}

/// One placed, colored copy of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshInstance {
    /// Object-to-world transform.
    pub transform: Mat4,
    /// Inverse-transpose of the upper 3x3 of `transform`.
    pub normal_matrix: Mat3,
    /// Base color; alpha below 1 draws translucently.
    pub rgba: Vec4,
    /// Bytes routed to the passthrough target.
    pub passthrough: Passthrough,
    /// Mesh to draw.
    pub mesh_id: MeshId,
}

impl MeshInstance {
    /// Instance of `mesh_id` at `transform`, with the normal matrix derived
    /// from the transform and no passthrough label.
    #[must_use]
    pub fn new(mesh_id: MeshId, transform: Mat4, rgba: Vec4) -> Self {
        Self {
            transform,
            normal_matrix: normal_matrix(transform),
            rgba,
            passthrough: Passthrough::default(),
            mesh_id,
        }
    }

    /// Replace the passthrough bytes.
    #[must_use]
    pub fn with_passthrough(mut self, passthrough: Passthrough) -> Self {
        self.passthrough = passthrough;
        self
    }

    /// GPU record for the instance stream.
    pub(crate) fn to_raw(&self) -> InstanceRaw {
        let n = Mat4::from_mat3(self.normal_matrix);
        InstanceRaw {
            transform: self.transform.to_cols_array_2d(),
            normal_matrix: n.to_cols_array_2d(),
            rgba: self.rgba.to_array(),
            passthrough: self.passthrough.packed(),
            _pad: [0; 3],
        }
    }
}

/// Inverse-transpose of the upper 3x3 of `transform`.
#[must_use]
pub fn normal_matrix(transform: Mat4) -> Mat3 {
    Mat3::from_mat4(transform).inverse().transpose()
}

/// Instance record as stored in the per-frame instance buffer. Read as
/// vertex attributes by the scene pass and as a storage array by the normals
/// overlay, so it must keep a 16-byte aligned, 160-byte layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct InstanceRaw {
    transform: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    rgba: [f32; 4],
    passthrough: u32,
    _pad: [u32; 3],
}

impl InstanceRaw {
    const ATTRIBUTES: [wgpu::VertexAttribute; 9] = [
        attribute(2, 0, wgpu::VertexFormat::Float32x4),
        attribute(3, 16, wgpu::VertexFormat::Float32x4),
        attribute(4, 32, wgpu::VertexFormat::Float32x4),
        attribute(5, 48, wgpu::VertexFormat::Float32x4),
        attribute(6, 64, wgpu::VertexFormat::Float32x4),
        attribute(7, 80, wgpu::VertexFormat::Float32x4),
        attribute(8, 96, wgpu::VertexFormat::Float32x4),
        attribute(9, 128, wgpu::VertexFormat::Float32x4),
        attribute(10, 144, wgpu::VertexFormat::Unorm8x4),
    ];

    /// Per-instance buffer layout (shader locations 2 through 10). The
    /// fourth normal-matrix column is padding and is skipped.
    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

const fn attribute(
    shader_location: u32,
    offset: wgpu::BufferAddress,
    format: wgpu::VertexFormat,
) -> wgpu::VertexAttribute {
    wgpu::VertexAttribute {
        format,
        offset,
        shader_location,
    }
}
