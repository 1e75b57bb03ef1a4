//! glTF parsing.
//!
//! Wraps the `gltf` crate: parses `.gltf`/`.glb` bytes, loads external buffers
//! and images relative to the asset's directory, and converts everything into a
//! [`Document`]. Features the packer cannot represent (skins, animations,
//! multiple scenes) are rejected here.

use std::path::Path;

use crate::{
    data_structures::document::{
        Accessor, BufferView, ComponentType, Dimensions, DocImage, DocMaterial, DocMesh, DocNode,
        DocPrimitive, DocTexture, Document, LocalTransform, PrimitiveMode, Semantic,
    },
    error::{Result, SceneError},
    resources::load_binary,
};

/// Parses `bytes` and resolves side files against `base_dir`.
///
/// `name` is used for labels of embedded images.
pub fn parse_document(bytes: &[u8], base_dir: &Path, name: &str) -> Result<Document> {
    let gltf = gltf::Gltf::from_slice(bytes)
        .map_err(|e| SceneError::malformed(format!("failed to parse '{name}': {e}")))?;

    if gltf.skins().next().is_some() {
        return Err(SceneError::UnsupportedFeature("skins".to_string()));
    }
    if gltf.animations().next().is_some() {
        return Err(SceneError::UnsupportedFeature("animations".to_string()));
    }
    if gltf.scenes().count() > 1 {
        return Err(SceneError::UnsupportedFeature(format!(
            "{} scenes (only one is supported)",
            gltf.scenes().count()
        )));
    }

    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf
                .blob
                .clone()
                .ok_or_else(|| SceneError::malformed("GLB binary chunk is missing"))?,
            gltf::buffer::Source::Uri(uri) => load_side_file(base_dir, uri)?,
        };
        if data.len() < buffer.length() {
            return Err(SceneError::malformed(format!(
                "buffer {} holds {} bytes but declares {}",
                buffer.index(),
                data.len(),
                buffer.length()
            )));
        }
        buffers.push(data);
    }

    let buffer_views = gltf
        .views()
        .map(|view| BufferView {
            buffer: view.buffer().index(),
            byte_offset: view.offset(),
            byte_length: view.length(),
            byte_stride: view.stride(),
        })
        .collect();

    let accessors = gltf
        .accessors()
        .map(|accessor| Accessor {
            buffer_view: accessor.view().map(|view| view.index()),
            byte_offset: accessor.offset(),
            count: accessor.count(),
            component_type: component_type(accessor.data_type()),
            dimensions: dimensions(accessor.dimensions()),
            normalized: accessor.normalized(),
            sparse: accessor.sparse().is_some(),
        })
        .collect();

    let nodes = gltf
        .nodes()
        .map(|node| DocNode {
            name: node.name().map(str::to_string),
            transform: match node.transform() {
                gltf::scene::Transform::Matrix { matrix } => LocalTransform::Matrix(matrix),
                gltf::scene::Transform::Decomposed {
                    translation,
                    rotation,
                    scale,
                } => LocalTransform::Decomposed {
                    translation,
                    rotation,
                    scale,
                },
            },
            mesh: node.mesh().map(|mesh| mesh.index()),
            children: node.children().map(|child| child.index()).collect(),
        })
        .collect();

    let meshes = gltf
        .meshes()
        .map(|mesh| DocMesh {
            name: mesh.name().map(str::to_string),
            primitives: mesh
                .primitives()
                .map(|primitive| DocPrimitive {
                    mode: primitive_mode(primitive.mode()),
                    indices: primitive.indices().map(|accessor| accessor.index()),
                    attributes: primitive
                        .attributes()
                        .map(|(semantic, accessor)| (semantic_of(semantic), accessor.index()))
                        .collect(),
                    material: primitive.material().index(),
                    morph_targets: primitive.morph_targets().count(),
                })
                .collect(),
        })
        .collect();

    let materials = gltf
        .materials()
        .map(|material| DocMaterial {
            name: material.name().map(str::to_string),
            base_color_texture: material
                .pbr_metallic_roughness()
                .base_color_texture()
                .map(|info| info.texture().index()),
            normal_texture: material.normal_texture().map(|info| info.texture().index()),
        })
        .collect();

    let textures = gltf
        .textures()
        .map(|texture| DocTexture {
            source: texture.source().index(),
        })
        .collect();

    let mut images = Vec::new();
    for image in gltf.images() {
        let image = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let buffer = buffers.get(view.buffer().index()).ok_or_else(|| {
                    SceneError::malformed(format!("image {} has no buffer", image.index()))
                })?;
                let data = view
                    .offset()
                    .checked_add(view.length())
                    .and_then(|end| buffer.get(view.offset()..end))
                    .ok_or_else(|| {
                        SceneError::malformed(format!(
                            "image {} exceeds its buffer view",
                            image.index()
                        ))
                    })?
                    .to_vec();
                DocImage {
                    label: format!("{name} image #{}", image.index()),
                    mime_type: Some(mime_type.to_string()),
                    data,
                }
            }
            gltf::image::Source::Uri { uri, mime_type } => DocImage {
                label: base_dir.join(uri).display().to_string(),
                mime_type: mime_type.map(str::to_string),
                data: load_side_file(base_dir, uri)?,
            },
        };
        images.push(image);
    }

    let roots = match gltf.default_scene().or_else(|| gltf.scenes().next()) {
        Some(scene) => scene.nodes().map(|node| node.index()).collect(),
        None => Vec::new(),
    };

    let mut doc = Document {
        nodes,
        roots,
        meshes,
        accessors,
        buffer_views,
        buffers,
        materials,
        textures,
        images,
    };
    if gltf.scenes().next().is_none() {
        doc.roots = doc.parentless_nodes();
        if let Some(node) = first_unreachable(&doc) {
            return Err(SceneError::malformed(format!(
                "node {node} is not reachable from any root node (the hierarchy has a cycle)"
            )));
        }
    }
    log::debug!(
        "Parsed '{name}': {} nodes, {} meshes, {} materials, {} images",
        doc.nodes.len(),
        doc.meshes.len(),
        doc.materials.len(),
        doc.images.len()
    );
    Ok(doc)
}

/// First node that no walk from `doc.roots` reaches. In a document without
/// scenes every node hangs below some parentless node unless a cycle sits above it.
fn first_unreachable(doc: &Document) -> Option<usize> {
    let mut reached = vec![false; doc.nodes.len()];
    let mut stack = doc.roots.clone();
    while let Some(index) = stack.pop() {
        match reached.get_mut(index) {
            Some(flag) if !*flag => *flag = true,
            _ => continue,
        }
        stack.extend(doc.nodes[index].children.iter().copied());
    }
    reached.iter().position(|flag| !flag)
}

fn load_side_file(base_dir: &Path, uri: &str) -> Result<Vec<u8>> {
    if uri.starts_with("data:") {
        return Err(SceneError::UnsupportedFeature(
            "embedded data URIs".to_string(),
        ));
    }
    load_binary(&base_dir.join(uri))
}

fn component_type(data_type: gltf::accessor::DataType) -> ComponentType {
    use gltf::accessor::DataType;
    match data_type {
        DataType::I8 => ComponentType::I8,
        DataType::U8 => ComponentType::U8,
        DataType::I16 => ComponentType::I16,
        DataType::U16 => ComponentType::U16,
        DataType::U32 => ComponentType::U32,
        DataType::F32 => ComponentType::F32,
    }
}

fn dimensions(dimensions: gltf::accessor::Dimensions) -> Dimensions {
    use gltf::accessor::Dimensions as Gltf;
    match dimensions {
        Gltf::Scalar => Dimensions::Scalar,
        Gltf::Vec2 => Dimensions::Vec2,
        Gltf::Vec3 => Dimensions::Vec3,
        Gltf::Vec4 => Dimensions::Vec4,
        Gltf::Mat2 => Dimensions::Mat2,
        Gltf::Mat3 => Dimensions::Mat3,
        Gltf::Mat4 => Dimensions::Mat4,
    }
}

fn primitive_mode(mode: gltf::mesh::Mode) -> PrimitiveMode {
    use gltf::mesh::Mode;
    match mode {
        Mode::Points => PrimitiveMode::Points,
        Mode::Lines => PrimitiveMode::Lines,
        Mode::LineLoop => PrimitiveMode::LineLoop,
        Mode::LineStrip => PrimitiveMode::LineStrip,
        Mode::Triangles => PrimitiveMode::Triangles,
        Mode::TriangleStrip => PrimitiveMode::TriangleStrip,
        Mode::TriangleFan => PrimitiveMode::TriangleFan,
    }
}

fn semantic_of(semantic: gltf::Semantic) -> Semantic {
    match semantic {
        gltf::Semantic::Positions => Semantic::Position,
        gltf::Semantic::Normals => Semantic::Normal,
        gltf::Semantic::Tangents => Semantic::Tangent,
        gltf::Semantic::TexCoords(set) => Semantic::TexCoord(set),
        gltf::Semantic::Colors(set) => Semantic::Color(set),
        gltf::Semantic::Joints(set) => Semantic::Joints(set),
        gltf::Semantic::Weights(set) => Semantic::Weights(set),
        #[allow(unreachable_patterns)]
        other => Semantic::Other(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "mesh": 0, "translation": [1.0, 2.0, 3.0], "children": [1] },
            { "matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 4,5,6,1] }
        ],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
        "buffers": [{ "byteLength": 42, "uri": "triangle.bin" }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0,0,0], "max": [1,1,0] },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    }"#;

    #[test]
    fn parses_external_buffer_document() {
        let dir = std::env::temp_dir().join("scene-pack-gltf-parse");
        write_triangle_bin(&dir);

        let doc = parse_document(TRIANGLE_GLTF.as_bytes(), &dir, "triangle.gltf").unwrap();
        assert_eq!(doc.roots, vec![0]);
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.nodes[0].mesh, Some(0));
        assert_eq!(doc.nodes[0].children, vec![1]);
        assert!(matches!(doc.nodes[1].transform, LocalTransform::Matrix(_)));
        assert_eq!(doc.accessors[1].component_type, ComponentType::U16);
        assert_eq!(doc.meshes[0].primitives[0].attribute(&Semantic::Position), Some(0));
        assert_eq!(doc.buffers[0].len(), 42);
    }

    #[test]
    fn missing_buffer_file_is_reported() {
        let dir = std::env::temp_dir().join("scene-pack-gltf-missing");
        std::fs::create_dir_all(&dir).unwrap();
        let _ = std::fs::remove_file(dir.join("triangle.bin"));
        let err = parse_document(TRIANGLE_GLTF.as_bytes(), &dir, "triangle.gltf").unwrap_err();
        assert!(matches!(err, SceneError::FileNotFound { .. }));
    }

    /// Writes the triangle's vertex and index data next to a document.
    fn write_triangle_bin(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        let mut bin: Vec<u8> = bytemuck::cast_slice(&[0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).to_vec();
        bin.extend_from_slice(bytemuck::cast_slice(&[0u16, 1, 2]));
        std::fs::write(dir.join("triangle.bin"), &bin).unwrap();
    }

    /// Scene-less triangle document with the given `nodes` array.
    fn sceneless(nodes: &str) -> String {
        format!(
            r#"{{
            "asset": {{ "version": "2.0" }},
            "nodes": {nodes},
            "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }}] }}],
            "buffers": [{{ "byteLength": 42, "uri": "triangle.bin" }}],
            "bufferViews": [
                {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
                {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }}
            ],
            "accessors": [
                {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0,0,0], "max": [1,1,0] }},
                {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
            ]
        }}"#
        )
    }

    #[test]
    fn sceneless_document_roots_are_parentless_nodes() {
        let dir = std::env::temp_dir().join("scene-pack-gltf-sceneless");
        write_triangle_bin(&dir);
        let json = sceneless(r#"[{ "children": [1] }, { "mesh": 0 }, { "mesh": 0 }]"#);
        let doc = parse_document(json.as_bytes(), &dir, "sceneless.gltf").unwrap();
        assert_eq!(doc.roots, vec![0, 2]);
    }

    #[test]
    fn sceneless_node_cycle_is_malformed() {
        let dir = std::env::temp_dir().join("scene-pack-gltf-cycle");
        write_triangle_bin(&dir);
        let json = sceneless(r#"[{ "children": [1] }, { "children": [0], "mesh": 0 }]"#);
        let err = parse_document(json.as_bytes(), &dir, "cycle.gltf").unwrap_err();
        assert!(matches!(err, SceneError::DocumentMalformed(_)));
    }

    #[test]
    fn image_view_offset_overflow_is_malformed() {
        let dir = std::env::temp_dir().join("scene-pack-gltf-image-view");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("pixels.bin"), [0u8; 4]).unwrap();
        let json = r#"{
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": 4, "uri": "pixels.bin" }],
            "bufferViews": [{ "buffer": 0, "byteOffset": 18446744073709551615, "byteLength": 4 }],
            "images": [{ "bufferView": 0, "mimeType": "image/png" }]
        }"#;
        let err = parse_document(json.as_bytes(), &dir, "image.gltf").unwrap_err();
        assert!(matches!(err, SceneError::DocumentMalformed(_)));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = parse_document(b"not a gltf", Path::new("."), "junk").unwrap_err();
        assert!(matches!(err, SceneError::DocumentMalformed(_)));
    }
}
