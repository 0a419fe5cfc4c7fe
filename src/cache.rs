//! Per-vertex geometry precomputed once per bake
//!
//! Holds local and world frames for every vertex plus `min_dot`, the lowest
//! cosine between the local normal and any edge leaving the vertex. Samples
//! whose up-dot falls below `min_dot` point under the vertex's own
//! neighbourhood and are counted as occluded without casting.

use glam::Vec3;
use rayon::prelude::*;

use crate::mesh::Mesh;

/// Geometry of one vertex in both spaces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexRecord {
    /// Position in object space
    pub local_position: Vec3,
    /// Normal in object space (normalized, or zero if degenerate)
    pub local_normal: Vec3,
    /// Position in world space
    pub world_position: Vec3,
    /// Normal in world space (normalized, or zero if degenerate)
    pub world_normal: Vec3,
    /// Self-occlusion horizon; 0.0 when no edge is available
    pub min_dot: f32,
}

/// Read-only table of [`VertexRecord`]s, indexed by vertex id
#[derive(Debug, Clone)]
pub struct VertexGeometryCache {
    records: Vec<VertexRecord>,
}

impl VertexGeometryCache {
    /// Build one record per vertex of `mesh`
    pub fn build(mesh: &Mesh) -> Self {
        let adjacency = mesh.vertex_adjacency();
        let transform = mesh.transform;

        let records = mesh
            .vertices
            .par_iter()
            .zip(adjacency.par_iter())
            .map(|(vertex, neighbours)| {
                let local_normal = vertex.normal.normalize_or_zero();
                let world_position = transform.transform_point3(vertex.position);
                // Offset point keeps the normal consistent under non-uniform scale
                let world_normal = (transform.transform_point3(vertex.position + vertex.normal)
                    - world_position)
                    .normalize_or_zero();

                let min_dot = neighbours
                    .iter()
                    .filter_map(|&n| {
                        let edge = mesh.vertices[n as usize].position - vertex.position;
                        edge.try_normalize().map(|dir| local_normal.dot(dir))
                    })
                    .reduce(f32::min)
                    .unwrap_or(0.0);

                VertexRecord {
                    local_position: vertex.position,
                    local_normal,
                    world_position,
                    world_normal,
                    min_dot,
                }
            })
            .collect();

        VertexGeometryCache { records }
    }

    /// All records in vertex order
    #[inline]
    pub fn records(&self) -> &[VertexRecord] {
        &self.records
    }

    /// Record for one vertex
    #[inline]
    pub fn get(&self, index: usize) -> Option<&VertexRecord> {
        self.records.get(index)
    }

    /// Number of records
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the mesh had no vertices
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
