#![allow(dead_code)]

use std::io::Cursor;

use scene_pack::data_structures::document::{
    Accessor, BufferView, ComponentType, Dimensions, DocImage, DocMaterial, DocMesh, DocNode,
    DocPrimitive, DocTexture, Document, LocalTransform, Semantic,
};

/// Builds synthetic documents one table entry at a time.
#[derive(Default)]
pub(crate) struct DocBuilder {
    pub(crate) doc: Document,
}

impl DocBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn view(&mut self, bytes: Vec<u8>, stride: Option<usize>) -> usize {
        let byte_length = bytes.len();
        self.doc.buffers.push(bytes);
        self.doc.buffer_views.push(BufferView {
            buffer: self.doc.buffers.len() - 1,
            byte_offset: 0,
            byte_length,
            byte_stride: stride,
        });
        self.doc.buffer_views.len() - 1
    }

    pub(crate) fn accessor(
        &mut self,
        view: usize,
        count: usize,
        component_type: ComponentType,
        dimensions: Dimensions,
    ) -> usize {
        self.doc.accessors.push(Accessor {
            buffer_view: Some(view),
            byte_offset: 0,
            count,
            component_type,
            dimensions,
            normalized: false,
            sparse: false,
        });
        self.doc.accessors.len() - 1
    }

    /// `count` positions whose components count up from `start`.
    pub(crate) fn positions(&mut self, count: usize, start: f32) -> usize {
        let data: Vec<f32> = (0..count * 3).map(|v| start + v as f32).collect();
        let view = self.view(bytemuck::cast_slice(&data).to_vec(), None);
        self.accessor(view, count, ComponentType::F32, Dimensions::Vec3)
    }

    pub(crate) fn vec3s(&mut self, values: &[[f32; 3]]) -> usize {
        let view = self.view(bytemuck::cast_slice(values).to_vec(), None);
        self.accessor(view, values.len(), ComponentType::F32, Dimensions::Vec3)
    }

    pub(crate) fn vec4s(&mut self, values: &[[f32; 4]]) -> usize {
        let view = self.view(bytemuck::cast_slice(values).to_vec(), None);
        self.accessor(view, values.len(), ComponentType::F32, Dimensions::Vec4)
    }

    pub(crate) fn vec2s(&mut self, values: &[[f32; 2]]) -> usize {
        let view = self.view(bytemuck::cast_slice(values).to_vec(), None);
        self.accessor(view, values.len(), ComponentType::F32, Dimensions::Vec2)
    }

    pub(crate) fn indices_u8(&mut self, values: &[u8]) -> usize {
        let view = self.view(values.to_vec(), None);
        self.accessor(view, values.len(), ComponentType::U8, Dimensions::Scalar)
    }

    pub(crate) fn indices_u16(&mut self, values: &[u16]) -> usize {
        let view = self.view(bytemuck::cast_slice(values).to_vec(), None);
        self.accessor(view, values.len(), ComponentType::U16, Dimensions::Scalar)
    }

    pub(crate) fn indices_u32(&mut self, values: &[u32]) -> usize {
        let view = self.view(bytemuck::cast_slice(values).to_vec(), None);
        self.accessor(view, values.len(), ComponentType::U32, Dimensions::Scalar)
    }

    pub(crate) fn mesh(&mut self, primitives: Vec<DocPrimitive>) -> usize {
        self.doc.meshes.push(DocMesh {
            name: None,
            primitives,
        });
        self.doc.meshes.len() - 1
    }

    pub(crate) fn node(
        &mut self,
        mesh: Option<usize>,
        children: Vec<usize>,
        transform: LocalTransform,
    ) -> usize {
        self.doc.nodes.push(DocNode {
            name: None,
            transform,
            mesh,
            children,
        });
        self.doc.nodes.len() - 1
    }

    /// Adds an image plus a texture sampling it, returning the texture index.
    pub(crate) fn texture(&mut self, data: Vec<u8>, mime_type: Option<&str>) -> usize {
        self.doc.images.push(DocImage {
            label: format!("image #{}", self.doc.images.len()),
            mime_type: mime_type.map(str::to_string),
            data,
        });
        self.texture_for_image(self.doc.images.len() - 1)
    }

    pub(crate) fn texture_for_image(&mut self, image: usize) -> usize {
        self.doc.textures.push(DocTexture { source: image });
        self.doc.textures.len() - 1
    }

    pub(crate) fn material(&mut self, base_color: Option<usize>, normal: Option<usize>) -> usize {
        self.doc.materials.push(DocMaterial {
            name: None,
            base_color_texture: base_color,
            normal_texture: normal,
        });
        self.doc.materials.len() - 1
    }

    pub(crate) fn roots(mut self, roots: Vec<usize>) -> Self {
        self.doc.roots = roots;
        self
    }

    pub(crate) fn build(self) -> Document {
        self.doc
    }
}

pub(crate) fn primitive(indices: usize, position: usize, material: Option<usize>) -> DocPrimitive {
    DocPrimitive {
        indices: Some(indices),
        attributes: vec![(Semantic::Position, position)],
        material,
        ..Default::default()
    }
}

pub(crate) fn translation(x: f32, y: f32, z: f32) -> LocalTransform {
    LocalTransform::Decomposed {
        translation: [x, y, z],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0; 3],
    }
}

/// A solid-colored PNG, encoded with the `image` crate.
pub(crate) fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("failed to encode PNG fixture");
    out.into_inner()
}

pub(crate) fn round_up_to_4(value: u32) -> u32 {
    (value + 3) & !3
}

/// Reads little-endian `f32`s without assuming the byte slice is aligned.
pub(crate) fn f32s(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

pub(crate) fn u16s(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect()
}
