//! scene-pack
//!
//! Imports glTF 2.0 scenes into a render-ready form: one flattened list of
//! world-space mesh nodes, two vertex streams and one index buffer shared by
//! every mesh, and one meshlet descriptor per source primitive addressing its
//! window of those buffers. Materials are resolved into uploaded textures and a
//! feature mask for shader selection.
//!
//! High-level modules
//! - `config`: load settings (asset root, limits, texture sharing)
//! - `context`: the GPU device seam and its wgpu implementation
//! - `data_structures`: document, accessors, meshlets, textures and the scene
//! - `error`: the load error taxonomy
//! - `host`: a host-memory device for tooling and tests
//! - `render`: binding meshlet ranges on a wgpu render pass
//! - `resources`: parsing, flattening, packing and material resolution
//!

pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod host;
pub mod render;
pub mod resources;

pub use config::LoadConfig;
pub use context::{Context, GpuDevice, PixelFormat};
pub use data_structures::meshlet::{Mesh, Meshlet, Vertex, VertexA, VertexB};
pub use data_structures::scene::{Node, Scene, SurfaceMaterial, features};
pub use error::{Result, SceneError};
pub use host::HostDevice;
pub use resources::{build_scene, load_scene};
