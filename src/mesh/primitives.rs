//! Primitive mesh builders
//!
//! Welded (shared-vertex) meshes with smooth normals, Z-up, centered on the
//! origin. Used for the temporary ground plane and as bake fixtures.

use glam::Vec3;
use std::f32::consts::{PI, TAU};

use super::{Mesh, Vertex};

impl Mesh {
    /// Square grid in the XY plane facing +Z
    ///
    /// `subdivisions` is the number of quads along each side (minimum 1).
    pub fn grid_plane(size: f32, subdivisions: u32) -> Mesh {
        let n = subdivisions.max(1);
        let half = size * 0.5;
        let step = size / n as f32;

        let mut vertices = Vec::with_capacity(((n + 1) * (n + 1)) as usize);
        for j in 0..=n {
            for i in 0..=n {
                let position = Vec3::new(-half + i as f32 * step, -half + j as f32 * step, 0.0);
                vertices.push(Vertex::new(position, Vec3::Z));
            }
        }

        let row = n + 1;
        let mut polygons = Vec::with_capacity((n * n) as usize);
        for j in 0..n {
            for i in 0..n {
                let a = j * row + i;
                polygons.push(vec![a, a + 1, a + row + 1, a + row]);
            }
        }

        Mesh::from_polygons(vertices, &polygons)
    }

    /// UV sphere with single pole vertices and no seam duplicates
    ///
    /// `segments` around the Z axis (minimum 3), `rings` from pole to pole
    /// (minimum 2).
    pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Mesh {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut vertices = Vec::with_capacity((segments * (rings - 1) + 2) as usize);
        vertices.push(Vertex::new(Vec3::Z * radius, Vec3::Z));
        for ring in 1..rings {
            let phi = ring as f32 / rings as f32 * PI;
            for seg in 0..segments {
                let theta = seg as f32 / segments as f32 * TAU;
                let dir = Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());
                vertices.push(Vertex::new(dir * radius, dir));
            }
        }
        let south = vertices.len() as u32;
        vertices.push(Vertex::new(-Vec3::Z * radius, -Vec3::Z));

        let ring_start = |ring: u32| 1 + (ring - 1) * segments;
        let mut polygons = Vec::new();

        // North cap
        for seg in 0..segments {
            let next = (seg + 1) % segments;
            polygons.push(vec![0, ring_start(1) + seg, ring_start(1) + next]);
        }
        // Body quads, CCW seen from outside
        for ring in 1..rings - 1 {
            let upper = ring_start(ring);
            let lower = ring_start(ring + 1);
            for seg in 0..segments {
                let next = (seg + 1) % segments;
                polygons.push(vec![upper + seg, lower + seg, lower + next, upper + next]);
            }
        }
        // South cap
        let last = ring_start(rings - 1);
        for seg in 0..segments {
            let next = (seg + 1) % segments;
            polygons.push(vec![south, last + next, last + seg]);
        }

        Mesh::from_polygons(vertices, &polygons)
    }

    /// Axis-aligned cube with shared corners and diagonal smooth normals
    pub fn cube(size: f32) -> Mesh {
        let h = size * 0.5;
        let vertices = (0..8)
            .map(|i| {
                let corner = Vec3::new(
                    if i & 1 == 0 { -1.0 } else { 1.0 },
                    if i & 2 == 0 { -1.0 } else { 1.0 },
                    if i & 4 == 0 { -1.0 } else { 1.0 },
                );
                Vertex::new(corner * h, corner.normalize())
            })
            .collect();

        let polygons = [
            vec![0, 2, 3, 1], // -Z
            vec![4, 5, 7, 6], // +Z
            vec![0, 1, 5, 4], // -Y
            vec![2, 6, 7, 3], // +Y
            vec![0, 4, 6, 2], // -X
            vec![1, 3, 7, 5], // +X
        ];

        Mesh::from_polygons(vertices, &polygons)
    }
}
