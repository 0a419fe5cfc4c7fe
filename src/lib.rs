//! # vertex-ao
//!
//! **Per-vertex ambient occlusion baking into face-corner colors**
//!
//! Estimates how exposed each vertex of a polygon mesh is to its
//! surroundings by casting hemisphere rays, then writes the result as RGBA
//! into a corner color attribute.
//!
//! ## Features
//!
//! - **Sampling**: deterministic, sorted cosine-weighted hemisphere
//! - **Estimators**: hemisphere with local/scene blending, or jittered normal
//! - **Culling**: samples below a vertex's own horizon are skipped
//! - **Ground plane**: temporary occluder under the object, always removed
//! - **Output**: graded corner colors written in one bulk call
//! - **Hosts**: trait seams for ray queries, occluders and attributes, plus
//!   an in-memory [`scene::Scene`] with BVH-accelerated queries
//!
//! ## Example
//!
//! ```rust
//! use vertex_ao::prelude::*;
//!
//! let scene = Scene::new();
//! let sphere = scene.add_object("sphere", Mesh::uv_sphere(1.0, 16, 8));
//!
//! let config = BakeConfig::new(32, 1.0);
//! let report = bake_object(&scene, sphere, &config).unwrap();
//! assert_eq!(report.vertices, 16 * 7 + 2);
//!
//! let colors = scene.attribute(sphere, ColorTarget::TintColor.attribute_name()).unwrap();
//! assert_eq!(colors.data().len(), report.corners * 4);
//! ```

#![warn(missing_docs)]

pub mod bake;
pub mod cache;
pub mod color;
pub mod config;
pub mod error;
pub mod estimator;
pub mod ground_plane;
pub mod host;
pub mod mesh;
pub mod sampler;
pub mod scene;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::bake::{bake_mesh, bake_object, bake_objects, fill_object, BakeReport, BakeSummary};
    pub use crate::cache::{VertexGeometryCache, VertexRecord};
    pub use crate::color::{write_corner_colors, AoGrading, ColorAttribute, ColorBuffer, ColorTarget};
    pub use crate::config::{AoStrategy, BakeConfig};
    pub use crate::error::{BakeError, BakeResult};
    pub use crate::estimator::{estimate, OcclusionEstimator, OcclusionResult, RayStats};
    pub use crate::host::{BakeHost, ColorSink, EmptyScene, OccluderHost, RayCaster, RayHit};
    pub use crate::mesh::{Face, Mesh, Vertex};
    pub use crate::sampler::{hemisphere_samples, HemisphereSample, SAMPLE_SEED};
    pub use crate::scene::{MeshObject, ObjectId, Scene};
    pub use glam::{Mat4, Vec3};
}

// Re-exports for convenience
pub use bake::{bake_object, bake_objects};
pub use config::BakeConfig;
pub use error::{BakeError, BakeResult};
