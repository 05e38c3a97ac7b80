//! Mesh storage: vertex format, GPU-resident meshes, and the id registry.
//!
//! A mesh is an unindexed triangle list of position + normal vertices. Once
//! uploaded it is immutable and addressed by a [`MeshId`]; ids are issued in
//! strictly increasing order and never reused for the life of the registry.

pub mod generate;

use bytemuck::Zeroable;
use glam::Vec3;
use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use crate::error::RenderError;
use crate::gpu::pipeline_helpers::{buffer_entry, vertex_storage_buffer};

/// Handle to a mesh uploaded to a [`MeshRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshId(pub u32);

/// One mesh vertex as laid out in GPU memory.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Object-space normal.
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    /// Vertex from glam vectors.
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    /// Per-vertex buffer layout (shader locations 0 and 1).
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// A mesh resident on the GPU.
pub struct GpuMesh {
    vertices: wgpu::Buffer,
    vertex_count: u32,
    storage_bind_group: wgpu::BindGroup,
}

impl GpuMesh {
    /// Vertex buffer for the scene pass.
    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertices
    }

    /// Number of vertices (three per triangle).
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// The vertex buffer bound as storage, for passes that fetch vertices
    /// by index.
    pub fn storage_bind_group(&self) -> &wgpu::BindGroup {
        &self.storage_bind_group
    }
}

/// Append-only store of GPU meshes.
pub struct MeshRegistry {
    meshes: Vec<GpuMesh>,
    keyed: FxHashMap<String, MeshId>,
    storage_layout: wgpu::BindGroupLayout,
}

impl MeshRegistry {
    /// Empty registry.
    pub fn new(device: &wgpu::Device) -> Self {
        let storage_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Mesh Storage Layout"),
                entries: &[vertex_storage_buffer(0)],
            });
        Self {
            meshes: Vec::new(),
            keyed: FxHashMap::default(),
            storage_layout,
        }
    }

    /// Layout of every mesh's storage bind group.
    pub fn storage_layout(&self) -> &wgpu::BindGroupLayout {
        &self.storage_layout
    }

    /// Upload `vertices` and return the new mesh's id.
    pub fn allocate(
        &mut self,
        device: &wgpu::Device,
        vertices: &[MeshVertex],
    ) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);

        // Storage bindings cannot be empty.
        let placeholder = [MeshVertex::zeroed()];
        let contents = if vertices.is_empty() {
            &placeholder[..]
        } else {
            vertices
        };
        let buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Mesh {} Vertices", id.0)),
                contents: bytemuck::cast_slice(contents),
                usage: wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::STORAGE,
            });
        let storage_bind_group =
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Mesh {} Storage", id.0)),
                layout: &self.storage_layout,
                entries: &[buffer_entry(0, &buffer)],
            });

        log::debug!("allocated mesh {} ({} vertices)", id.0, vertices.len());
        self.meshes.push(GpuMesh {
            vertices: buffer,
            vertex_count: vertices.len() as u32,
            storage_bind_group,
        });
        id
    }

    /// Return the mesh registered under `key`, building and uploading it
    /// with `build` only on first use.
    pub fn allocate_keyed(
        &mut self,
        device: &wgpu::Device,
        key: &str,
        build: impl FnOnce() -> Vec<MeshVertex>,
    ) -> MeshId {
        if let Some(&id) = self.keyed.get(key) {
            return id;
        }
        let id = self.allocate(device, &build());
        let _ = self.keyed.insert(key.to_owned(), id);
        id
    }

    /// Look up a mesh by id.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownMesh`] if `id` was never allocated.
    pub fn get(&self, id: MeshId) -> Result<&GpuMesh, RenderError> {
        self.meshes
            .get(id.0 as usize)
            .ok_or(RenderError::UnknownMesh(id))
    }

    /// Whether `id` names an allocated mesh.
    pub fn contains(&self, id: MeshId) -> bool {
        (id.0 as usize) < self.meshes.len()
    }

    /// Number of meshes allocated so far.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether no mesh has been allocated.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_tightly_packed() {
        let layout = MeshVertex::layout();
        assert_eq!(layout.array_stride, 24);
        assert_eq!(layout.attributes[1].offset, 12);
    }

    #[test]
    fn mesh_ids_order_by_allocation() {
        assert!(MeshId(0) < MeshId(1));
        assert_eq!(MeshId(7), MeshId(7));
    }
}
