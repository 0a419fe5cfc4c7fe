//! Mesh data model consumed by the baker
//!
//! A [`Mesh`] is a read-only snapshot of a host object: vertices with local
//! positions and normals, polygonal faces with their face-corner (loop)
//! indices, and the object's world transform.
//!
//! # Face corners
//!
//! Every face lists its vertex indices together with the matching corner
//! indices. Corner-domain attributes (such as the baked color buffer) are
//! addressed by corner index, so a vertex shared by four faces owns four
//! distinct corners.

pub mod bvh;
pub mod primitives;

pub use bvh::{Aabb, BvhHit, BvhNode, MeshBvh, Triangle};

use glam::{Mat4, Vec3};

use crate::error::{BakeError, BakeResult};

/// Vertex with position and normal in object-local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Local position
    pub position: Vec3,
    /// Local surface normal
    pub normal: Vec3,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Vertex { position, normal }
    }
}

/// Polygonal face: vertex indices paired with face-corner indices
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Vertex index per corner, in winding order
    pub vertices: Vec<u32>,
    /// Face-corner index per corner, parallel to `vertices`
    pub corners: Vec<u32>,
}

impl Face {
    /// Create a face from parallel vertex and corner index lists
    pub fn new(vertices: Vec<u32>, corners: Vec<u32>) -> Self {
        Face { vertices, corners }
    }

    /// Number of corners in this face
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True if the face has no corners
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterate over `(vertex, corner)` pairs
    pub fn loops(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.vertices.iter().copied().zip(self.corners.iter().copied())
    }

    /// Iterate over the face's edges as vertex index pairs (cyclic)
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

/// Host mesh snapshot
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertices in local space
    pub vertices: Vec<Vertex>,
    /// Polygonal faces
    pub faces: Vec<Face>,
    /// Object-to-world transform (affine)
    pub transform: Mat4,
}

impl Mesh {
    /// Create a mesh with an identity transform
    pub fn new(vertices: Vec<Vertex>, faces: Vec<Face>) -> Self {
        Mesh {
            vertices,
            faces,
            transform: Mat4::IDENTITY,
        }
    }

    /// Build a mesh from polygons, assigning corner indices in face order
    ///
    /// Normals are left as supplied by `vertices`; call
    /// [`Mesh::recompute_normals`] if they are unknown.
    pub fn from_polygons(vertices: Vec<Vertex>, polygons: &[Vec<u32>]) -> Self {
        let mut next_corner = 0u32;
        let faces = polygons
            .iter()
            .map(|poly| {
                let corners = (next_corner..next_corner + poly.len() as u32).collect();
                next_corner += poly.len() as u32;
                Face::new(poly.clone(), corners)
            })
            .collect();
        Mesh::new(vertices, faces)
    }

    /// Replace the world transform
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of face corners (loops)
    pub fn corner_count(&self) -> usize {
        self.faces.iter().map(Face::len).sum()
    }

    /// Check that the mesh is usable for baking
    ///
    /// Rejects empty vertex sets, faces with fewer than three corners,
    /// mismatched vertex/corner lists, out-of-range vertex indices and
    /// non-finite positions.
    pub fn validate(&self) -> BakeResult<()> {
        if self.vertices.is_empty() {
            return Err(BakeError::invalid("mesh has no vertices"));
        }
        let vertex_count = self.vertices.len() as u32;
        for (face_index, face) in self.faces.iter().enumerate() {
            if face.vertices.len() != face.corners.len() {
                return Err(BakeError::invalid(format!(
                    "face {face_index} lists {} vertices but {} corners",
                    face.vertices.len(),
                    face.corners.len()
                )));
            }
            if face.len() < 3 {
                return Err(BakeError::invalid(format!(
                    "face {face_index} has {} corners, need at least 3",
                    face.len()
                )));
            }
            if let Some(&v) = face.vertices.iter().find(|&&v| v >= vertex_count) {
                return Err(BakeError::invalid(format!(
                    "face {face_index} references vertex {v}, mesh has {vertex_count}"
                )));
            }
        }
        if self.vertices.iter().any(|v| !v.position.is_finite()) {
            return Err(BakeError::invalid("mesh has non-finite vertex positions"));
        }
        Ok(())
    }

    /// Deduplicated vertex adjacency derived from face edges
    pub fn vertex_adjacency(&self) -> Vec<Vec<u32>> {
        let n = self.vertices.len();
        let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); n];
        for face in &self.faces {
            for (a, b) in face.edges() {
                if a == b || a as usize >= n || b as usize >= n {
                    continue;
                }
                if !adjacency[a as usize].contains(&b) {
                    adjacency[a as usize].push(b);
                }
                if !adjacency[b as usize].contains(&a) {
                    adjacency[b as usize].push(a);
                }
            }
        }
        adjacency
    }

    /// Fan-triangulate all faces
    ///
    /// Returns flat triangle indices and, per triangle, the index of the
    /// face it came from. Faces are assumed convex.
    pub fn triangulate(&self) -> (Vec<u32>, Vec<u32>) {
        let mut indices = Vec::with_capacity(self.corner_count() * 3);
        let mut face_ids = Vec::with_capacity(self.corner_count());
        for (face_index, face) in self.faces.iter().enumerate() {
            for i in 1..face.len().saturating_sub(1) {
                indices.extend_from_slice(&[face.vertices[0], face.vertices[i], face.vertices[i + 1]]);
                face_ids.push(face_index as u32);
            }
        }
        (indices, face_ids)
    }

    /// Local positions
    pub fn positions(&self) -> Vec<Vec3> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    /// Positions transformed to world space
    pub fn world_positions(&self) -> Vec<Vec3> {
        self.vertices
            .iter()
            .map(|v| self.transform.transform_point3(v.position))
            .collect()
    }

    /// World-space axis-aligned bounding box, `None` for an empty mesh
    pub fn world_bounds(&self) -> Option<Aabb> {
        if self.vertices.is_empty() {
            return None;
        }
        let mut aabb = Aabb::empty();
        for p in self.world_positions() {
            aabb.expand_point(p);
        }
        Some(aabb)
    }

    /// Recompute vertex normals as area-weighted face normal sums
    ///
    /// Vertices not referenced by any face keep a zero normal.
    pub fn recompute_normals(&mut self) {
        let n = self.vertices.len();
        let mut accum = vec![Vec3::ZERO; n];
        let (indices, _) = self.triangulate();
        for tri in indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if a >= n || b >= n || c >= n {
                continue;
            }
            let (pa, pb, pc) = (
                self.vertices[a].position,
                self.vertices[b].position,
                self.vertices[c].position,
            );
            // Unnormalized cross product weights by twice the triangle area
            let n = (pb - pa).cross(pc - pa);
            accum[a] += n;
            accum[b] += n;
            accum[c] += n;
        }
        for (vertex, n) in self.vertices.iter_mut().zip(accum) {
            vertex.normal = n.normalize_or_zero();
        }
    }
}
