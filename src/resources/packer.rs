//! Geometry packing.
//!
//! Every primitive of every mesh ends up in the same three buffers: stream A
//! (positions), stream B (normal, tangent, uv) and one index buffer. Packing runs
//! in two passes:
//!
//! 1. [`plan_layout`] validates each primitive and reserves its vertex range and
//!    its 4-byte aligned index range, producing a [`LayoutPlan`].
//! 2. [`fill`] reads the plan (never changing it) and converts the source
//!    accessors into the packed layout.
//!
//! Index data keeps its width: 16 and 32-bit sources are copied verbatim, 8-bit
//! sources are zero-extended to 16 bits because the index buffer never holds
//! bytes.

use crate::{
    context::GpuDevice,
    data_structures::{
        accessor::AccessorView,
        document::{ComponentType, Dimensions, DocPrimitive, Document, PrimitiveMode, Semantic},
        meshlet::{Mesh, Meshlet, VertexA, VertexB},
        scene::features,
    },
    error::{Result, SceneError},
};

const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];
const DEFAULT_UV: [f32; 2] = [0.0, 0.0];
const DEFAULT_TANGENT: [f32; 4] = [0.0; 4];

pub(crate) fn align_to_4(value: u32) -> Option<u32> {
    value.checked_add(3).map(|v| v & !3)
}

/// Accessors a primitive's meshlet is filled from.
#[derive(Clone, Debug)]
pub struct Sources {
    pub indices: usize,
    pub position: usize,
    pub normal: Option<usize>,
    /// Accessor plus whether it carries a fourth (handedness) component.
    pub tangent: Option<(usize, bool)>,
    pub uv: Option<usize>,
}

/// One primitive's reserved place in the packed buffers.
#[derive(Clone, Debug)]
pub struct Reservation {
    pub meshlet: Meshlet,
    pub sources: Sources,
}

#[derive(Clone, Debug, Default)]
pub struct MeshPlan {
    pub name: Option<String>,
    pub reservations: Vec<Reservation>,
}

/// Result of the sizing pass.
#[derive(Clone, Debug, Default)]
pub struct LayoutPlan {
    pub meshes: Vec<MeshPlan>,
    pub vertex_count: u32,
    /// Padded size of the index buffer in bytes.
    pub index_byte_len: u32,
    /// Some primitive has no material and uses the slot after the document's materials.
    pub uses_default_material: bool,
}

impl LayoutPlan {
    pub fn meshes(&self) -> Vec<Mesh> {
        self.meshes
            .iter()
            .map(|plan| Mesh {
                name: plan.name.clone(),
                meshlets: plan.reservations.iter().map(|r| r.meshlet).collect(),
            })
            .collect()
    }

    fn reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.meshes.iter().flat_map(|m| m.reservations.iter())
    }
}

/// Host-side copy of the packed buffers, before upload.
#[derive(Clone, Debug, Default)]
pub struct PackedGeometry {
    pub meshes: Vec<Mesh>,
    pub stream_a: Vec<VertexA>,
    pub stream_b: Vec<VertexB>,
    pub indices: Vec<u8>,
    pub uses_default_material: bool,
}

impl PackedGeometry {
    pub fn vertex_count(&self) -> u32 {
        self.stream_a.len() as u32
    }

    /// Index values of `meshlet`, widened to `u32`.
    pub fn index_values(&self, meshlet: &Meshlet) -> Vec<u32> {
        let range = meshlet.index_byte_range();
        let bytes = &self.indices[range.start as usize..range.end as usize];
        if meshlet.index_is_narrow {
            bytes
                .chunks_exact(2)
                .map(|c| u32::from(u16::from_le_bytes([c[0], c[1]])))
                .collect()
        } else {
            bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        }
    }

    /// Creates stream A, stream B and the index buffer, in that order.
    ///
    /// Buffers created before a failing call are dropped on return.
    pub fn upload<D: GpuDevice>(
        &self,
        device: &D,
        label: &str,
    ) -> Result<(D::Buffer, D::Buffer, D::Buffer)> {
        let stream_a = device.create_vertex_buffer(
            &format!("{label} vertex stream A"),
            bytemuck::cast_slice(&self.stream_a),
        )?;
        let stream_b = device.create_vertex_buffer(
            &format!("{label} vertex stream B"),
            bytemuck::cast_slice(&self.stream_b),
        )?;
        let index = device.create_index_buffer(&format!("{label} index buffer"), &self.indices)?;
        Ok((stream_a, stream_b, index))
    }
}

/// Runs both packing passes.
///
/// `feature_masks` are the resolved materials' feature bits, indexed by material.
pub fn pack_geometry(doc: &Document, feature_masks: &[u32]) -> Result<PackedGeometry> {
    let plan = plan_layout(doc)?;
    fill(doc, &plan, feature_masks)
}

/// Sizing pass: validates primitives and reserves their buffer ranges.
pub fn plan_layout(doc: &Document) -> Result<LayoutPlan> {
    let mut plan = LayoutPlan::default();
    let overflow = || SceneError::malformed("packed geometry exceeds 32-bit addressing");

    for (mesh_idx, mesh) in doc.meshes.iter().enumerate() {
        let mut mesh_plan = MeshPlan {
            name: mesh.name.clone(),
            reservations: Vec::with_capacity(mesh.primitives.len()),
        };
        for (prim_idx, prim) in mesh.primitives.iter().enumerate() {
            if prim.mode != PrimitiveMode::Triangles {
                return Err(SceneError::UnsupportedTopology {
                    mesh: mesh_idx,
                    primitive: prim_idx,
                    mode: prim.mode,
                });
            }
            if prim.morph_targets > 0 {
                return Err(SceneError::UnsupportedFeature(format!(
                    "morph targets on mesh {mesh_idx}, primitive {prim_idx}"
                )));
            }
            if let Some((semantic, _)) = prim
                .attributes
                .iter()
                .find(|(s, _)| matches!(s, Semantic::Joints(_) | Semantic::Weights(_)))
            {
                return Err(SceneError::UnsupportedFeature(format!(
                    "skinning attribute {semantic} on mesh {mesh_idx}, primitive {prim_idx}"
                )));
            }

            let index_accessor = prim.indices.ok_or_else(|| {
                SceneError::malformed(format!(
                    "mesh {mesh_idx}, primitive {prim_idx} has no index accessor"
                ))
            })?;
            let index_view = AccessorView::new(doc, index_accessor)?;
            let index_is_narrow = check_index_format(doc, index_accessor)?;

            let position = prim.attribute(&Semantic::Position).ok_or_else(|| {
                SceneError::malformed(format!(
                    "mesh {mesh_idx}, primitive {prim_idx} has no POSITION attribute"
                ))
            })?;
            check_format(doc, position, &Semantic::Position, |ty, dims, _| {
                ty == ComponentType::F32 && dims == Dimensions::Vec3
            })?;
            let vertex_count = AccessorView::new(doc, position)?.count();

            let sources = Sources {
                indices: index_accessor,
                position,
                normal: optional_attribute(doc, prim, Semantic::Normal, vertex_count, |ty, dims, _| {
                    ty == ComponentType::F32 && dims == Dimensions::Vec3
                })?,
                tangent: optional_attribute(doc, prim, Semantic::Tangent, vertex_count, |ty, dims, _| {
                    ty == ComponentType::F32 && matches!(dims, Dimensions::Vec3 | Dimensions::Vec4)
                })?
                .map(|accessor| (accessor, doc.accessors[accessor].dimensions == Dimensions::Vec4)),
                uv: optional_attribute(doc, prim, Semantic::TexCoord(0), vertex_count, |ty, dims, normalized| {
                    dims == Dimensions::Vec2
                        && (ty == ComponentType::F32
                            || (normalized && matches!(ty, ComponentType::U8 | ComponentType::U16)))
                })?,
            };

            let material_index = match prim.material {
                Some(material) if material < doc.materials.len() => material as u32,
                Some(material) => {
                    return Err(SceneError::malformed(format!(
                        "mesh {mesh_idx}, primitive {prim_idx} references missing material {material}"
                    )));
                }
                None => {
                    plan.uses_default_material = true;
                    doc.materials.len() as u32
                }
            };

            let vertex_count = u32::try_from(vertex_count).map_err(|_| overflow())?;
            let index_count = u32::try_from(index_view.count()).map_err(|_| overflow())?;
            let meshlet = Meshlet {
                vertex_offset: plan.vertex_count,
                vertex_count,
                index_byte_offset: plan.index_byte_len,
                index_count,
                material_index,
                index_is_narrow,
            };
            plan.vertex_count = plan
                .vertex_count
                .checked_add(vertex_count)
                .ok_or_else(overflow)?;
            plan.index_byte_len =
                reserve_index_bytes(plan.index_byte_len, meshlet.bytes_per_index(), index_count)
                    .ok_or_else(overflow)?;

            log::debug!(
                "Reserved mesh {mesh_idx}, primitive {prim_idx}: vertices {}..{}, index bytes at {} ({} x {})",
                meshlet.vertex_offset,
                meshlet.vertex_offset + vertex_count,
                meshlet.index_byte_offset,
                index_count,
                if index_is_narrow { "u16" } else { "u32" },
            );
            mesh_plan.reservations.push(Reservation { meshlet, sources });
        }
        plan.meshes.push(mesh_plan);
    }
    Ok(plan)
}

/// Copy pass: fills the buffers reserved by `plan`.
pub fn fill(doc: &Document, plan: &LayoutPlan, feature_masks: &[u32]) -> Result<PackedGeometry> {
    let vertex_count = plan.vertex_count as usize;
    let mut stream_a = vec![VertexA::default(); vertex_count];
    let mut stream_b = vec![VertexB::default(); vertex_count];
    let mut indices = vec![0u8; plan.index_byte_len as usize];

    for Reservation { meshlet, sources } in plan.reservations() {
        let vertices = meshlet.vertex_offset as usize..(meshlet.vertex_offset + meshlet.vertex_count) as usize;

        let index_view = AccessorView::new(doc, sources.indices)?;
        if let Some(bad) = (0..index_view.count())
            .map(|i| index_view.read_index(i))
            .find(|value| *value >= meshlet.vertex_count)
        {
            return Err(SceneError::malformed(format!(
                "index {bad} in accessor {} is out of range for {} vertices",
                sources.indices, meshlet.vertex_count
            )));
        }
        let index_range = meshlet.index_byte_range();
        let dst = &mut indices[index_range.start as usize..index_range.end as usize];
        match index_view.component_type() {
            ComponentType::U8 | ComponentType::I8 => index_view.widen_u8_into(dst),
            _ => index_view.copy_into(dst),
        }

        let positions = AccessorView::new(doc, sources.position)?;
        positions.copy_into(bytemuck::cast_slice_mut(&mut stream_a[vertices.clone()]));

        let normals = sources
            .normal
            .map(|accessor| AccessorView::new(doc, accessor))
            .transpose()?;
        let tangents = sources
            .tangent
            .map(|(accessor, has_w)| AccessorView::new(doc, accessor).map(|view| (view, has_w)))
            .transpose()?;
        let uvs = sources
            .uv
            .map(|accessor| AccessorView::new(doc, accessor))
            .transpose()?;

        if tangents.is_none()
            && feature_masks
                .get(meshlet.material_index as usize)
                .is_some_and(|mask| mask & features::NORMAL_MAP != 0)
        {
            log::warn!(
                "Material {} has a normal map but the geometry at vertex offset {} lacks tangents.",
                meshlet.material_index,
                meshlet.vertex_offset
            );
        }

        for (i, record) in stream_b[vertices].iter_mut().enumerate() {
            record.normal = normals.map_or(DEFAULT_NORMAL, |view| view.read_f32::<3>(i));
            record.uv = uvs.map_or(DEFAULT_UV, |view| view.read_f32::<2>(i));
            record.tangent = match tangents {
                Some((view, true)) => view.read_f32::<4>(i),
                Some((view, false)) => {
                    let [x, y, z] = view.read_f32::<3>(i);
                    [x, y, z, 1.0]
                }
                None => DEFAULT_TANGENT,
            };
        }
    }

    Ok(PackedGeometry {
        meshes: plan.meshes(),
        stream_a,
        stream_b,
        indices,
        uses_default_material: plan.uses_default_material,
    })
}

/// Index byte total after appending `count` indices, padded to 4 bytes.
fn reserve_index_bytes(running: u32, bytes_per_index: u32, count: u32) -> Option<u32> {
    bytes_per_index
        .checked_mul(count)
        .and_then(|len| running.checked_add(len))
        .and_then(align_to_4)
}

/// Returns whether the index accessor packs into 16-bit indices.
fn check_index_format(doc: &Document, accessor: usize) -> Result<bool> {
    let format = check_format(doc, accessor, &Semantic::Other("INDICES".to_string()), |ty, dims, _| {
        dims == Dimensions::Scalar && ty != ComponentType::F32
    })?;
    Ok(matches!(
        format.0,
        ComponentType::I8 | ComponentType::U8 | ComponentType::I16 | ComponentType::U16
    ))
}

fn check_format(
    doc: &Document,
    accessor: usize,
    semantic: &Semantic,
    supported: impl Fn(ComponentType, Dimensions, bool) -> bool,
) -> Result<(ComponentType, Dimensions)> {
    let desc = doc.accessors.get(accessor).ok_or_else(|| {
        SceneError::malformed(format!("{semantic} references missing accessor {accessor}"))
    })?;
    if !supported(desc.component_type, desc.dimensions, desc.normalized) {
        return Err(SceneError::UnsupportedAccessorFormat {
            accessor,
            semantic: semantic.to_string(),
            component_type: desc.component_type,
            dimensions: desc.dimensions,
        });
    }
    Ok((desc.component_type, desc.dimensions))
}

fn optional_attribute(
    doc: &Document,
    prim: &DocPrimitive,
    semantic: Semantic,
    vertex_count: usize,
    supported: impl Fn(ComponentType, Dimensions, bool) -> bool,
) -> Result<Option<usize>> {
    let Some(accessor) = prim.attribute(&semantic) else {
        return Ok(None);
    };
    check_format(doc, accessor, &semantic, supported)?;
    let count = AccessorView::new(doc, accessor)?.count();
    if count != vertex_count {
        return Err(SceneError::malformed(format!(
            "{semantic} accessor {accessor} has {count} elements, POSITION has {vertex_count}"
        )));
    }
    Ok(Some(accessor))
}
