//! Meshlet drawing.
//!
//! Scene buffers are shared by all meshes, so drawing a meshlet means binding
//! sub-ranges of them. [`DrawMeshlet`] does that for a `wgpu::RenderPass`:
//! stream A goes to vertex slot 0, stream B to slot 1, and the index range is
//! bound with the meshlet's own index format.
//!
//! Bind groups (camera, per-node transform, material textures) are left to the
//! caller's pipeline.

use std::ops::Range;

use crate::{
    context::GpuDevice,
    data_structures::{meshlet::Meshlet, scene::Scene},
};

pub trait DrawMeshlet {
    fn draw_meshlet<D>(&mut self, scene: &Scene<D>, meshlet: &Meshlet, instances: Range<u32>)
    where
        D: GpuDevice<Buffer = wgpu::Buffer>;

    /// Draws every meshlet of the scene's mesh `mesh`.
    fn draw_mesh<D>(&mut self, scene: &Scene<D>, mesh: u32, instances: Range<u32>)
    where
        D: GpuDevice<Buffer = wgpu::Buffer>;
}

impl DrawMeshlet for wgpu::RenderPass<'_> {
    fn draw_meshlet<D>(&mut self, scene: &Scene<D>, meshlet: &Meshlet, instances: Range<u32>)
    where
        D: GpuDevice<Buffer = wgpu::Buffer>,
    {
        if meshlet.index_count == 0 {
            return;
        }
        self.set_vertex_buffer(0, scene.vertex_buffer_a().slice(meshlet.vertex_a_byte_range()));
        self.set_vertex_buffer(1, scene.vertex_buffer_b().slice(meshlet.vertex_b_byte_range()));
        self.set_index_buffer(
            scene.index_buffer().slice(meshlet.index_byte_range()),
            meshlet.index_format(),
        );
        self.draw_indexed(0..meshlet.index_count, 0, instances);
    }

    fn draw_mesh<D>(&mut self, scene: &Scene<D>, mesh: u32, instances: Range<u32>)
    where
        D: GpuDevice<Buffer = wgpu::Buffer>,
    {
        let Some(mesh) = scene.meshes().get(mesh as usize) else {
            log::warn!("Mesh {mesh} does not exist in this scene.");
            return;
        };
        for meshlet in &mesh.meshlets {
            self.draw_meshlet(scene, meshlet, instances.clone());
        }
    }
}
