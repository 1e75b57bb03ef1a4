//! Loads a glTF asset and prints its packed layout.
//!
//! Usage: `scene-inspect <path/to/asset.gltf> [--gpu]`
//!
//! Without `--gpu` the scene is packed on the host device, so no adapter is needed.

use std::path::Path;

use anyhow::{Context as _, bail};
use scene_pack::{Context, GpuDevice, HostDevice, LoadConfig, Scene, load_scene};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let use_gpu = args.iter().any(|a| a == "--gpu");
    let Some(asset) = args.iter().find(|a| !a.starts_with("--")) else {
        bail!("usage: scene-inspect <path/to/asset.gltf> [--gpu]");
    };

    let asset = Path::new(asset);
    let file_name = asset
        .file_name()
        .and_then(|name| name.to_str())
        .context("asset path has no file name")?;
    let config = match asset.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => LoadConfig::new(dir),
        _ => LoadConfig::from_env(),
    };

    if use_gpu {
        let ctx = futures::executor::block_on(Context::new_headless())?;
        let scene = load_scene(file_name, &config, &ctx)
            .with_context(|| format!("failed to load '{}'", asset.display()))?;
        print_scene(&scene);
    } else {
        let device = HostDevice::new();
        let scene = load_scene(file_name, &config, &device)
            .with_context(|| format!("failed to load '{}'", asset.display()))?;
        print_scene(&scene);
        println!("host allocations: {}", device.live_allocations());
    }
    Ok(())
}

fn print_scene<D: GpuDevice>(scene: &Scene<D>) {
    println!(
        "vertices: {} (stream A {} bytes, stream B {} bytes)",
        scene.vertex_count(),
        scene.vertex_a_byte_len(),
        scene.vertex_b_byte_len()
    );
    println!("index buffer: {} bytes", scene.index_byte_len());
    for (idx, mesh) in scene.meshes().iter().enumerate() {
        println!("mesh {idx} {}", mesh.name.as_deref().unwrap_or("<unnamed>"));
        for meshlet in &mesh.meshlets {
            println!(
                "  vertices {}+{} indices @{} x{} ({}) material {}",
                meshlet.vertex_offset,
                meshlet.vertex_count,
                meshlet.index_byte_offset,
                meshlet.index_count,
                if meshlet.index_is_narrow { "u16" } else { "u32" },
                meshlet.material_index
            );
        }
    }
    for (idx, node) in scene.nodes().iter().enumerate() {
        let t = node.local_to_world.w;
        println!(
            "node {idx}: mesh {:?} at ({:.3}, {:.3}, {:.3})",
            node.mesh, t.x, t.y, t.z
        );
    }
    for (idx, material) in scene.materials().iter().enumerate() {
        println!(
            "material {idx}: albedo {} normal {} features {:#b}",
            material.albedo.is_some(),
            material.normal.is_some(),
            material.feature_mask
        );
    }
}
