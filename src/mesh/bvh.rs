//! BVH (Bounding Volume Hierarchy) for ray queries against triangle meshes
//!
//! Provides O(log n) closest-hit and any-hit ray casts. Intersections are
//! two-sided: back faces occlude exactly like front faces.

use glam::Vec3;

/// Hits closer than this along the ray are ignored
const RAY_EPSILON: f32 = 1e-6;

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create an empty (inverted) AABB
    #[inline]
    pub fn empty() -> Self {
        Aabb {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Create AABB from min/max
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb { min, max }
    }

    /// Expand AABB to include a point
    #[inline]
    pub fn expand_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Expand AABB to include another AABB
    #[inline]
    pub fn expand_aabb(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Get center of AABB
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get extent along each axis
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get longest axis (0=X, 1=Y, 2=Z)
    #[inline]
    pub fn longest_axis(&self) -> usize {
        let d = self.max - self.min;
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    /// Slab test against a ray given by origin and reciprocal direction
    ///
    /// Returns the entry distance if the ray overlaps the box within
    /// `[0, max_t]`.
    #[inline]
    pub fn ray_entry(&self, origin: Vec3, inv_dir: Vec3, max_t: f32) -> Option<f32> {
        let t1 = (self.min - origin) * inv_dir;
        let t2 = (self.max - origin) * inv_dir;

        let t_min = t1.min(t2);
        let t_max = t1.max(t2);

        let t_enter = t_min.x.max(t_min.y).max(t_min.z).max(0.0);
        let t_exit = t_max.x.min(t_max.y).min(t_max.z).min(max_t);

        if t_enter <= t_exit {
            Some(t_enter)
        } else {
            None
        }
    }
}

/// Triangle with precomputed data for ray queries
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
    /// Geometric normal (winding order)
    pub normal: Vec3,
    /// Bounds of the three vertices
    pub aabb: Aabb,
    /// Index of the polygon this triangle was cut from
    pub face: u32,
}

impl Triangle {
    /// Create triangle from vertices
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, face: u32) -> Self {
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let normal = e1.cross(e2).normalize_or_zero();

        let mut aabb = Aabb::empty();
        aabb.expand_point(v0);
        aabb.expand_point(v1);
        aabb.expand_point(v2);

        Triangle { v0, v1, v2, normal, aabb, face }
    }

    /// Möller–Trumbore intersection, returning the ray parameter `t`
    ///
    /// `direction` must be normalized for `t` to be a distance.
    #[inline]
    pub fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = direction.cross(edge2);
        let a = edge1.dot(h);
        if a.abs() < 1e-10 {
            // Parallel or degenerate
            return None;
        }

        let f = 1.0 / a;
        let s = origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        (t > RAY_EPSILON).then_some(t)
    }
}

/// Closest intersection found by [`MeshBvh::raycast`]
#[derive(Debug, Clone, Copy)]
pub struct BvhHit {
    /// Distance along the ray
    pub distance: f32,
    /// Hit point
    pub point: Vec3,
    /// Geometric normal of the hit triangle
    pub normal: Vec3,
    /// Polygon index of the hit triangle
    pub face: u32,
}

/// BVH Node
#[derive(Debug)]
pub enum BvhNode {
    /// Leaf node containing triangle indices
    Leaf {
        /// Bounds of all triangles in the leaf
        aabb: Aabb,
        /// Indices into [`MeshBvh::triangles`]
        triangles: Vec<usize>,
    },
    /// Internal node with two children
    Internal {
        /// Bounds of both children
        aabb: Aabb,
        /// Lower half along the split axis
        left: Box<BvhNode>,
        /// Upper half along the split axis
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    /// Get AABB of this node
    #[inline]
    pub fn aabb(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { aabb, .. } => aabb,
            BvhNode::Internal { aabb, .. } => aabb,
        }
    }
}

/// BVH for triangle mesh
#[derive(Debug)]
pub struct MeshBvh {
    /// Triangles referenced by the leaves
    pub triangles: Vec<Triangle>,
    /// Root node, `None` for a mesh without triangles
    pub root: Option<BvhNode>,
    /// Leaf size limit used while building
    pub max_triangles_per_leaf: usize,
}

impl MeshBvh {
    /// Default leaf size
    pub const DEFAULT_LEAF_SIZE: usize = 4;

    /// Build BVH from triangle data
    ///
    /// `face_ids` maps each triangle (`indices` chunk of three) to its
    /// source polygon; a missing entry maps to the triangle index itself.
    pub fn build(
        vertices: &[Vec3],
        indices: &[u32],
        face_ids: &[u32],
        max_triangles_per_leaf: usize,
    ) -> Self {
        let max_triangles_per_leaf = max_triangles_per_leaf.max(1);
        let triangles: Vec<Triangle> = indices
            .chunks_exact(3)
            .enumerate()
            .filter_map(|(i, chunk)| {
                let v0 = *vertices.get(chunk[0] as usize)?;
                let v1 = *vertices.get(chunk[1] as usize)?;
                let v2 = *vertices.get(chunk[2] as usize)?;
                let face = face_ids.get(i).copied().unwrap_or(i as u32);
                Some(Triangle::new(v0, v1, v2, face))
            })
            .collect();

        if triangles.is_empty() {
            return MeshBvh {
                triangles,
                root: None,
                max_triangles_per_leaf,
            };
        }

        let indices: Vec<usize> = (0..triangles.len()).collect();
        let root = Self::build_node(&triangles, indices, max_triangles_per_leaf);

        MeshBvh {
            triangles,
            root: Some(root),
            max_triangles_per_leaf,
        }
    }

    /// Recursively build BVH nodes
    fn build_node(triangles: &[Triangle], indices: Vec<usize>, max_per_leaf: usize) -> BvhNode {
        let mut aabb = Aabb::empty();
        for &idx in &indices {
            aabb.expand_aabb(&triangles[idx].aabb);
        }

        if indices.len() <= max_per_leaf {
            return BvhNode::Leaf {
                aabb,
                triangles: indices,
            };
        }

        // Split along longest axis using median
        let axis = aabb.longest_axis();
        let mut sorted_indices = indices;
        sorted_indices.sort_by(|&a, &b| {
            let va = triangles[a].aabb.center()[axis];
            let vb = triangles[b].aabb.center()[axis];
            va.total_cmp(&vb)
        });

        let mid = sorted_indices.len() / 2;
        let (left_indices, right_indices) = sorted_indices.split_at(mid);

        let left = Self::build_node(triangles, left_indices.to_vec(), max_per_leaf);
        let right = Self::build_node(triangles, right_indices.to_vec(), max_per_leaf);

        BvhNode::Internal {
            aabb,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Closest hit along a normalized ray within `max_distance`
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<BvhHit> {
        let root = self.root.as_ref()?;
        let inv_dir = inverse_direction(direction);
        let mut best: Option<(f32, usize)> = None;
        self.closest_recursive(root, origin, direction, inv_dir, max_distance, &mut best);

        best.map(|(distance, idx)| {
            let tri = &self.triangles[idx];
            BvhHit {
                distance,
                point: origin + direction * distance,
                normal: tri.normal,
                face: tri.face,
            }
        })
    }

    fn closest_recursive(
        &self,
        node: &BvhNode,
        origin: Vec3,
        direction: Vec3,
        inv_dir: Vec3,
        max_distance: f32,
        best: &mut Option<(f32, usize)>,
    ) {
        let limit = best.map_or(max_distance, |(t, _)| t);
        match node {
            BvhNode::Leaf { triangles, .. } => {
                for &idx in triangles {
                    if let Some(t) = self.triangles[idx].intersect(origin, direction) {
                        let limit = best.map_or(max_distance, |(t, _)| t);
                        if t <= limit {
                            *best = Some((t, idx));
                        }
                    }
                }
            }
            BvhNode::Internal { left, right, .. } => {
                let left_t = left.aabb().ray_entry(origin, inv_dir, limit);
                let right_t = right.aabb().ray_entry(origin, inv_dir, limit);

                // Query children, nearest first
                let (first, first_t, second, second_t) = match (left_t, right_t) {
                    (Some(l), Some(r)) if r < l => (right, Some(r), left, Some(l)),
                    _ => (left, left_t, right, right_t),
                };
                if first_t.is_some() {
                    self.closest_recursive(first, origin, direction, inv_dir, max_distance, best);
                }
                if let Some(t) = second_t {
                    let limit = best.map_or(max_distance, |(t, _)| t);
                    if t <= limit {
                        self.closest_recursive(second, origin, direction, inv_dir, max_distance, best);
                    }
                }
            }
        }
    }

    /// True if anything is hit within `max_distance` (any-hit, early exit)
    pub fn occluded(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> bool {
        let Some(root) = self.root.as_ref() else {
            return false;
        };
        let inv_dir = inverse_direction(direction);
        let mut stack: Vec<&BvhNode> = vec![root];
        while let Some(node) = stack.pop() {
            if node.aabb().ray_entry(origin, inv_dir, max_distance).is_none() {
                continue;
            }
            match node {
                BvhNode::Leaf { triangles, .. } => {
                    let hit = triangles.iter().any(|&idx| {
                        self.triangles[idx]
                            .intersect(origin, direction)
                            .is_some_and(|t| t <= max_distance)
                    });
                    if hit {
                        return true;
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        false
    }

    /// Get total triangle count
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Get mesh bounds
    pub fn bounds(&self) -> Option<Aabb> {
        self.root.as_ref().map(|r| *r.aabb())
    }
}

/// Reciprocal direction for slab tests, keeping the sign of zero components
#[inline]
fn inverse_direction(dir: Vec3) -> Vec3 {
    let inv = |d: f32| {
        if d.abs() > 1e-10 {
            1.0 / d
        } else {
            f32::MAX * if d.is_sign_negative() { -1.0 } else { 1.0 }
        }
    };
    Vec3::new(inv(dir.x), inv(dir.y), inv(dir.z))
}
