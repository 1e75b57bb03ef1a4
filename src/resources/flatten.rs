//! Node hierarchy flattening.
//!
//! Walks the node tree depth-first (pre-order) with an explicit stack, composing
//! each node's local transform with its parent's world transform. Only nodes
//! that reference a mesh produce a [`Node`], but every node passes its transform
//! on to its children.

use cgmath::SquareMatrix;

use crate::{
    data_structures::{document::Document, scene::Node},
    error::{Result, SceneError},
};

/// Flattens the subtrees under `roots` into world-space mesh nodes.
///
/// Fails with [`SceneError::DocumentMalformed`] on out-of-range node or mesh
/// indices, on nodes reachable twice (cycles or shared children) and on nesting
/// deeper than `max_depth`.
pub fn flatten_nodes(doc: &Document, roots: &[usize], max_depth: usize) -> Result<Vec<Node>> {
    let mut visited = vec![false; doc.nodes.len()];
    let mut nodes = Vec::new();
    let mut stack: Vec<(usize, cgmath::Matrix4<f32>, usize)> = roots
        .iter()
        .rev()
        .map(|&root| (root, cgmath::Matrix4::identity(), 0))
        .collect();

    while let Some((index, parent, depth)) = stack.pop() {
        let node = doc
            .nodes
            .get(index)
            .ok_or_else(|| SceneError::malformed(format!("node {index} does not exist")))?;
        if std::mem::replace(&mut visited[index], true) {
            return Err(SceneError::malformed(format!(
                "node {index} is reachable more than once"
            )));
        }
        if depth > max_depth {
            return Err(SceneError::malformed(format!(
                "node {index} is nested deeper than {max_depth} levels"
            )));
        }

        let local_to_world = parent * node.transform.to_matrix();
        if let Some(mesh) = node.mesh {
            if mesh >= doc.meshes.len() {
                return Err(SceneError::malformed(format!(
                    "node {index} references missing mesh {mesh}"
                )));
            }
            nodes.push(Node {
                local_to_world,
                mesh: Some(mesh as u32),
            });
        }

        // Reversed so the first child is popped first.
        for &child in node.children.iter().rev() {
            if child >= doc.nodes.len() {
                return Err(SceneError::malformed(format!(
                    "node {index} references missing child {child}"
                )));
            }
            stack.push((child, local_to_world, depth + 1));
        }
    }

    log::debug!(
        "Flattened {} of {} nodes into mesh nodes",
        nodes.len(),
        doc.nodes.len()
    );
    Ok(nodes)
}
