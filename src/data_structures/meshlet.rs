//! Packed vertex records and meshlet descriptors.
//!
//! All meshes of a scene share two vertex streams and one index buffer. A
//! [`Meshlet`] is one source primitive's window into them; vertex indices are
//! local to the meshlet and get rebased by `vertex_offset` at bind time.

use std::ops::Range;

/// Layout description of a vertex record, used when building render pipelines.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// Stream A record: position only, so depth-only passes can bind it alone.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexA {
    pub position: [f32; 3],
}

/// Stream B record: shading attributes.
///
/// `tangent.w` holds the bitangent sign. It is `1.0` for three-component source
/// tangents and the whole tangent is zero when the source has none.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexB {
    pub normal: [f32; 3],
    pub tangent: [f32; 4],
    pub uv: [f32; 2],
}

impl Default for VertexB {
    fn default() -> Self {
        Self {
            normal: [0.0, 0.0, 1.0],
            tangent: [0.0; 4],
            uv: [0.0; 2],
        }
    }
}

impl Vertex for VertexA {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<VertexA>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            }],
        }
    }
}

impl Vertex for VertexB {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<VertexB>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 7]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Drawable sub-range of a mesh: one source primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Meshlet {
    /// First vertex of this meshlet, in records (not bytes), in both streams.
    pub vertex_offset: u32,
    pub vertex_count: u32,
    /// Start of this meshlet's indices in the index buffer, always 4-byte aligned.
    pub index_byte_offset: u32,
    pub index_count: u32,
    pub material_index: u32,
    /// 16-bit indices when set, 32-bit otherwise.
    pub index_is_narrow: bool,
}

impl Meshlet {
    pub fn bytes_per_index(&self) -> u32 {
        if self.index_is_narrow { 2 } else { 4 }
    }

    pub fn index_byte_len(&self) -> u32 {
        self.bytes_per_index() * self.index_count
    }

    pub fn index_byte_range(&self) -> Range<u64> {
        let start = u64::from(self.index_byte_offset);
        start..start + u64::from(self.index_byte_len())
    }

    pub fn vertex_a_byte_range(&self) -> Range<u64> {
        Self::record_range::<VertexA>(self.vertex_offset, self.vertex_count)
    }

    pub fn vertex_b_byte_range(&self) -> Range<u64> {
        Self::record_range::<VertexB>(self.vertex_offset, self.vertex_count)
    }

    pub fn index_format(&self) -> wgpu::IndexFormat {
        if self.index_is_narrow {
            wgpu::IndexFormat::Uint16
        } else {
            wgpu::IndexFormat::Uint32
        }
    }

    fn record_range<T>(offset: u32, count: u32) -> Range<u64> {
        let size = std::mem::size_of::<T>() as u64;
        let start = u64::from(offset) * size;
        start..start + u64::from(count) * size
    }
}

/// All meshlets of one source mesh, in primitive order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mesh {
    pub name: Option<String>,
    pub meshlets: Vec<Meshlet>,
}
