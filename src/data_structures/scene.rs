//! The loaded scene.
//!
//! A [`Scene`] owns every GPU resource created by a load: the two vertex streams,
//! the index buffer and the material textures. It is immutable once built; the
//! renderer borrows buffers and reads meshlets, nodes and materials by index.

use std::sync::Arc;

use crate::{
    context::GpuDevice,
    data_structures::meshlet::{Mesh, Meshlet, VertexA, VertexB},
};

/// Material feature bits, used to pick a shader variant.
pub mod features {
    /// A normal map texture is bound.
    pub const NORMAL_MAP: u32 = 1 << 0;
}

/// A mesh-bearing node with its world transform resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub local_to_world: cgmath::Matrix4<f32>,
    pub mesh: Option<u32>,
}

/// Textures and feature bits of one material.
///
/// Textures are reference counted because materials referencing the same image
/// may share a single upload.
#[derive(Debug)]
pub struct SurfaceMaterial<T> {
    pub albedo: Option<Arc<T>>,
    pub normal: Option<Arc<T>>,
    pub feature_mask: u32,
}

impl<T> SurfaceMaterial<T> {
    pub fn has_feature(&self, feature: u32) -> bool {
        self.feature_mask & feature == feature
    }
}

impl<T> Default for SurfaceMaterial<T> {
    fn default() -> Self {
        Self {
            albedo: None,
            normal: None,
            feature_mask: 0,
        }
    }
}

impl<T> Clone for SurfaceMaterial<T> {
    fn clone(&self) -> Self {
        Self {
            albedo: self.albedo.clone(),
            normal: self.normal.clone(),
            feature_mask: self.feature_mask,
        }
    }
}

pub struct Scene<D: GpuDevice> {
    pub(crate) vertex_buffer_a: D::Buffer,
    pub(crate) vertex_buffer_b: D::Buffer,
    pub(crate) index_buffer: D::Buffer,
    pub(crate) meshes: Vec<Mesh>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) materials: Vec<SurfaceMaterial<D::Texture>>,
    pub(crate) vertex_count: u32,
    pub(crate) index_byte_len: u32,
}

impl<D: GpuDevice> Scene<D> {
    /// Positions of every mesh, `vertex_count` records of [`VertexA`].
    pub fn vertex_buffer_a(&self) -> &D::Buffer {
        &self.vertex_buffer_a
    }

    /// Normals, tangents and uvs of every mesh, `vertex_count` records of [`VertexB`].
    pub fn vertex_buffer_b(&self) -> &D::Buffer {
        &self.vertex_buffer_b
    }

    pub fn index_buffer(&self) -> &D::Buffer {
        &self.index_buffer
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn materials(&self) -> &[SurfaceMaterial<D::Texture>] {
        &self.materials
    }

    pub fn material(&self, meshlet: &Meshlet) -> Option<&SurfaceMaterial<D::Texture>> {
        self.materials.get(meshlet.material_index as usize)
    }

    /// Meshlets of every mesh in allocation order.
    pub fn meshlets(&self) -> impl Iterator<Item = &Meshlet> {
        self.meshes.iter().flat_map(|mesh| mesh.meshlets.iter())
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn vertex_a_byte_len(&self) -> u64 {
        u64::from(self.vertex_count) * std::mem::size_of::<VertexA>() as u64
    }

    pub fn vertex_b_byte_len(&self) -> u64 {
        u64::from(self.vertex_count) * std::mem::size_of::<VertexB>() as u64
    }

    pub fn index_byte_len(&self) -> u32 {
        self.index_byte_len
    }
}

impl<D: GpuDevice> std::fmt::Debug for Scene<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("meshes", &self.meshes)
            .field("nodes", &self.nodes)
            .field("materials", &self.materials.len())
            .field("vertex_count", &self.vertex_count)
            .field("index_byte_len", &self.index_byte_len)
            .finish()
    }
}
