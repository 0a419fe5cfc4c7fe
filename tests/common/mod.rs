//! Common test helpers for vertex-ao integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use vertex_ao::prelude::*;

// ============================================================================
// Logging
// ============================================================================

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Standard test meshes
// ============================================================================

/// 1x1 plane at z = 0 with a 4x4 grid of quads
pub fn test_floor() -> Mesh {
    Mesh::grid_plane(1.0, 4)
}

/// Large downward-facing plane `height` above the origin
pub fn test_roof(height: f32) -> Mesh {
    let mut roof = Mesh::grid_plane(100.0, 1);
    for face in &mut roof.faces {
        face.vertices.reverse();
    }
    roof.recompute_normals();
    roof.with_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, height)))
}

/// Welded sphere of radius 1
pub fn test_sphere() -> Mesh {
    Mesh::uv_sphere(1.0, 24, 12)
}

/// Single triangle with three distinct vertices
pub fn test_triangle() -> Mesh {
    let vertices = vec![
        Vertex::new(Vec3::ZERO, Vec3::Z),
        Vertex::new(Vec3::X, Vec3::Z),
        Vertex::new(Vec3::Y, Vec3::Z),
    ];
    Mesh::from_polygons(vertices, &[vec![0, 1, 2]])
}

// ============================================================================
// Hosts with injected faults
// ============================================================================

/// Wraps a [`Scene`] and fails selected operations
pub struct FaultyHost {
    /// Scene doing the real work
    pub scene: Scene,
    /// Fail every color commit
    pub fail_commit: bool,
    /// Fail every scene ray query
    pub fail_queries: bool,
    /// Panic inside every scene ray query
    pub panic_queries: bool,
    /// Fail occluder removal
    pub fail_remove: bool,
    /// Occluders created so far
    pub occluders_added: AtomicUsize,
}

impl FaultyHost {
    /// Host with no faults enabled
    pub fn new(scene: Scene) -> Self {
        FaultyHost {
            scene,
            fail_commit: false,
            fail_queries: false,
            panic_queries: false,
            fail_remove: false,
            occluders_added: AtomicUsize::new(0),
        }
    }

    /// Number of occluders created
    pub fn occluders_added(&self) -> usize {
        self.occluders_added.load(Ordering::SeqCst)
    }
}

impl RayCaster for FaultyHost {
    fn ray_cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> BakeResult<Option<RayHit>> {
        if self.panic_queries {
            panic!("scene backend crashed");
        }
        if self.fail_queries {
            return Err(BakeError::QueryFailure("scene backend offline".into()));
        }
        self.scene.ray_cast(origin, direction, max_distance)
    }
}

impl OccluderHost for FaultyHost {
    type Handle = ObjectId;

    fn add_occluder(&self, name: &str, mesh: Mesh) -> BakeResult<ObjectId> {
        self.occluders_added.fetch_add(1, Ordering::SeqCst);
        self.scene.add_occluder(name, mesh)
    }

    fn remove_occluder(&self, handle: ObjectId) -> BakeResult<()> {
        if self.fail_remove {
            return Err(BakeError::Host("occluder is locked".into()));
        }
        self.scene.remove_occluder(handle)
    }
}

impl BakeHost for FaultyHost {
    type ObjectId = ObjectId;
    type LocalCaster = std::sync::Arc<MeshObject>;

    fn object_mesh(&self, id: ObjectId) -> BakeResult<std::sync::Arc<Mesh>> {
        self.scene.object_mesh(id)
    }

    fn local_caster(&self, id: ObjectId) -> BakeResult<Self::LocalCaster> {
        self.scene.local_caster(id)
    }

    fn object_name(&self, id: ObjectId) -> String {
        self.scene.object_name(id)
    }

    fn commit_colors(&self, id: ObjectId, target: ColorTarget, colors: &ColorBuffer) -> BakeResult<()> {
        if self.fail_commit {
            return Err(BakeError::Host("attribute is read-only".into()));
        }
        self.scene.commit_colors(id, target, colors)
    }
}
