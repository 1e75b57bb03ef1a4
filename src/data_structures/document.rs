//! In-memory asset document.
//!
//! This is the shape the loader consumes: a flat set of index tables mirroring
//! glTF (nodes, meshes, accessors, buffer views, buffers, materials, textures and
//! images). Indices between tables are not trusted; every consumer validates them
//! on use. A [`Document`] only lives for the duration of a single load.

/// Numeric type of a single accessor component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
}

impl ComponentType {
    pub fn size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::I32 | ComponentType::U32 | ComponentType::F32 => 4,
        }
    }
}

/// Number of components per accessor element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dimensions {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl Dimensions {
    pub fn multiplicity(self) -> usize {
        match self {
            Dimensions::Scalar => 1,
            Dimensions::Vec2 => 2,
            Dimensions::Vec3 => 3,
            Dimensions::Vec4 | Dimensions::Mat2 => 4,
            Dimensions::Mat3 => 9,
            Dimensions::Mat4 => 16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Vertex attribute semantic of a primitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    TexCoord(u32),
    Color(u32),
    Joints(u32),
    Weights(u32),
    Other(String),
}

impl std::fmt::Display for Semantic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Semantic::Position => write!(f, "POSITION"),
            Semantic::Normal => write!(f, "NORMAL"),
            Semantic::Tangent => write!(f, "TANGENT"),
            Semantic::TexCoord(set) => write!(f, "TEXCOORD_{set}"),
            Semantic::Color(set) => write!(f, "COLOR_{set}"),
            Semantic::Joints(set) => write!(f, "JOINTS_{set}"),
            Semantic::Weights(set) => write!(f, "WEIGHTS_{set}"),
            Semantic::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A node's transform relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LocalTransform {
    /// Column-major 4x4 matrix.
    Matrix([[f32; 4]; 4]),
    /// Translation, rotation quaternion (x, y, z, w) and scale.
    Decomposed {
        translation: [f32; 3],
        rotation: [f32; 4],
        scale: [f32; 3],
    },
}

impl LocalTransform {
    pub fn identity() -> Self {
        LocalTransform::Decomposed {
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }

    /// Matrix form. The decomposed form composes as `T * R * S`.
    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        match *self {
            LocalTransform::Matrix(columns) => cgmath::Matrix4::from(columns),
            LocalTransform::Decomposed {
                translation,
                rotation,
                scale,
            } => {
                let [x, y, z, w] = rotation;
                cgmath::Matrix4::from_translation(translation.into())
                    * cgmath::Matrix4::from(cgmath::Quaternion::new(w, x, y, z))
                    * cgmath::Matrix4::from_nonuniform_scale(scale[0], scale[1], scale[2])
            }
        }
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[derive(Clone, Debug, Default)]
pub struct DocNode {
    pub name: Option<String>,
    pub transform: LocalTransform,
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct DocPrimitive {
    pub mode: PrimitiveMode,
    pub indices: Option<usize>,
    pub attributes: Vec<(Semantic, usize)>,
    pub material: Option<usize>,
    pub morph_targets: usize,
}

impl DocPrimitive {
    /// Accessor index bound to `semantic`, if any.
    pub fn attribute(&self, semantic: &Semantic) -> Option<usize> {
        self.attributes
            .iter()
            .find(|(s, _)| s == semantic)
            .map(|(_, accessor)| *accessor)
    }
}

impl Default for DocPrimitive {
    fn default() -> Self {
        Self {
            mode: PrimitiveMode::Triangles,
            indices: None,
            attributes: Vec::new(),
            material: None,
            morph_targets: 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DocMesh {
    pub name: Option<String>,
    pub primitives: Vec<DocPrimitive>,
}

#[derive(Clone, Debug)]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    /// Offset relative to the start of the buffer view.
    pub byte_offset: usize,
    pub count: usize,
    pub component_type: ComponentType,
    pub dimensions: Dimensions,
    pub normalized: bool,
    pub sparse: bool,
}

impl Accessor {
    /// Size in bytes of one tightly packed element.
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.dimensions.multiplicity()
    }
}

#[derive(Clone, Debug)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    /// `None` means elements are tightly packed.
    pub byte_stride: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct DocMaterial {
    pub name: Option<String>,
    /// Index into [`Document::textures`].
    pub base_color_texture: Option<usize>,
    /// Index into [`Document::textures`].
    pub normal_texture: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct DocTexture {
    /// Index into [`Document::images`].
    pub source: usize,
}

/// Encoded image bytes, decoded lazily by the material resolver.
#[derive(Clone, Debug)]
pub struct DocImage {
    pub label: String,
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct Document {
    pub nodes: Vec<DocNode>,
    /// Root nodes of the scene that gets flattened.
    pub roots: Vec<usize>,
    pub meshes: Vec<DocMesh>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    pub buffers: Vec<Vec<u8>>,
    pub materials: Vec<DocMaterial>,
    pub textures: Vec<DocTexture>,
    pub images: Vec<DocImage>,
}

impl Document {
    /// Nodes that are not referenced as anybody's child.
    pub fn parentless_nodes(&self) -> Vec<usize> {
        let mut has_parent = vec![false; self.nodes.len()];
        for child in self.nodes.iter().flat_map(|n| n.children.iter()) {
            if let Some(flag) = has_parent.get_mut(*child) {
                *flag = true;
            }
        }
        has_parent
            .into_iter()
            .enumerate()
            .filter_map(|(idx, flag)| (!flag).then_some(idx))
            .collect()
    }
}
