//! Scene data structures: the parsed document, accessor views, packed vertex
//! records, meshlets, textures and the loaded scene.
//!
//! - `document` is the in-memory asset graph handed over by the parser
//! - `accessor` provides bounds-checked reads through document accessors
//! - `meshlet` holds the packed vertex records and per-primitive descriptors
//! - `texture` wraps wgpu textures used by materials
//! - `scene` is the immutable result of a load

pub mod accessor;
pub mod document;
pub mod meshlet;
pub mod scene;
pub mod texture;
