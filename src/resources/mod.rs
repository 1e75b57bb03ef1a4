use std::path::Path;

use crate::{
    config::LoadConfig,
    context::GpuDevice,
    data_structures::{
        document::Document,
        scene::{Scene, SurfaceMaterial},
    },
    error::{Result, SceneError},
};

/**
 * This module contains all logic for turning asset files into a [`Scene`]:
 * parsing, node flattening, geometry packing and material resolution.
 */
pub mod flatten;
pub mod gltf_loader;
pub mod material;
pub mod packer;

/// Reads a whole file, reporting any I/O failure as [`SceneError::FileNotFound`].
pub fn load_binary(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| SceneError::FileNotFound {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads `file_name` (relative to the configured asset root) into a [`Scene`].
///
/// Side files (`.bin` buffers, images) are resolved relative to the asset's own
/// directory. Either every resource is created and owned by the returned scene,
/// or the load fails and nothing created by it stays alive.
pub fn load_scene<D: GpuDevice>(
    file_name: &str,
    config: &LoadConfig,
    device: &D,
) -> Result<Scene<D>> {
    let path = config.asset_root.join(file_name);
    let bytes = load_binary(&path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let doc = gltf_loader::parse_document(&bytes, base_dir, file_name)?;
    let label = config.label.as_deref().unwrap_or(file_name);
    build_scene(&doc, config, device, label)
}

/// Builds a [`Scene`] from an already parsed document.
pub fn build_scene<D: GpuDevice>(
    doc: &Document,
    config: &LoadConfig,
    device: &D,
    label: &str,
) -> Result<Scene<D>> {
    let mut materials = material::resolve_materials(doc, device, config.dedup_textures)?;
    let nodes = flatten::flatten_nodes(doc, &doc.roots, config.max_node_depth)?;

    let feature_masks: Vec<u32> = materials.iter().map(|m| m.feature_mask).collect();
    let packed = packer::pack_geometry(doc, &feature_masks)?;
    let (vertex_buffer_a, vertex_buffer_b, index_buffer) = packed.upload(device, label)?;

    if packed.uses_default_material {
        materials.push(SurfaceMaterial::default());
    }

    log::info!(
        "Loaded '{label}': {} nodes, {} meshes, {} meshlets, {} vertices, {} index bytes, {} materials",
        nodes.len(),
        packed.meshes.len(),
        packed.meshes.iter().map(|m| m.meshlets.len()).sum::<usize>(),
        packed.vertex_count(),
        packed.indices.len(),
        materials.len()
    );

    Ok(Scene {
        vertex_buffer_a,
        vertex_buffer_b,
        index_buffer,
        vertex_count: packed.vertex_count(),
        index_byte_len: packed.indices.len() as u32,
        meshes: packed.meshes,
        nodes,
        materials,
    })
}
