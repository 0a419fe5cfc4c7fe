//! Collaborator interfaces supplied by the host application
//!
//! The baker never reaches for global state: every ray query, occluder
//! change and color write goes through one of these traits, passed in
//! explicitly by the caller.

use glam::Vec3;
use std::sync::Arc;

use crate::color::{ColorBuffer, ColorTarget};
use crate::error::BakeResult;
use crate::mesh::Mesh;

/// Result of a successful ray query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin
    pub distance: f32,
    /// Hit position, in the space of the query
    pub position: Vec3,
    /// Geometric normal at the hit
    pub normal: Vec3,
    /// Index of the hit face within its object
    pub face: u32,
}

/// Ray-intersection query against some geometry
///
/// Implementations are shared across worker threads during a bake.
pub trait RayCaster: Sync {
    /// Closest hit along a normalized `direction` within `max_distance`
    fn ray_cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> BakeResult<Option<RayHit>>;

    /// True if anything is hit within `max_distance`
    ///
    /// Override when an any-hit query is cheaper than a closest-hit one.
    fn occludes(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> BakeResult<bool> {
        Ok(self.ray_cast(origin, direction, max_distance)?.is_some())
    }
}

impl<T: RayCaster + ?Sized> RayCaster for &T {
    fn ray_cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> BakeResult<Option<RayHit>> {
        (**self).ray_cast(origin, direction, max_distance)
    }

    fn occludes(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> BakeResult<bool> {
        (**self).occludes(origin, direction, max_distance)
    }
}

impl<T: RayCaster + Send + ?Sized> RayCaster for Arc<T> {
    fn ray_cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> BakeResult<Option<RayHit>> {
        (**self).ray_cast(origin, direction, max_distance)
    }

    fn occludes(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> BakeResult<bool> {
        (**self).occludes(origin, direction, max_distance)
    }
}

/// Geometry that never occludes, for bakes without surroundings
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScene;

impl RayCaster for EmptyScene {
    fn ray_cast(&self, _origin: Vec3, _direction: Vec3, _max_distance: f32) -> BakeResult<Option<RayHit>> {
        Ok(None)
    }
}

/// Mutable corner-domain color attribute
pub trait ColorSink {
    /// Number of face corners the attribute stores
    fn corner_count(&self) -> usize;

    /// Replace every value with `rgba` (4 floats per corner) in one call
    fn set_all(&mut self, rgba: &[f32]) -> BakeResult<()>;
}

/// Temporary occluder geometry management
pub trait OccluderHost {
    /// Handle identifying a created occluder
    type Handle: Copy + std::fmt::Debug;

    /// Insert `mesh` (with its world transform) into the scene
    fn add_occluder(&self, name: &str, mesh: Mesh) -> BakeResult<Self::Handle>;

    /// Remove a previously created occluder
    fn remove_occluder(&self, handle: Self::Handle) -> BakeResult<()>;
}

/// Everything a multi-object bake needs from the host
///
/// The host itself answers scene-wide ray queries.
pub trait BakeHost: RayCaster + OccluderHost {
    /// Object identifier
    type ObjectId: Copy + std::fmt::Debug;
    /// Ray caster scoped to one object's local space
    type LocalCaster: RayCaster;

    /// Snapshot of an object's mesh
    fn object_mesh(&self, id: Self::ObjectId) -> BakeResult<Arc<Mesh>>;

    /// Local-space ray queries against one object
    fn local_caster(&self, id: Self::ObjectId) -> BakeResult<Self::LocalCaster>;

    /// Display name used in logs and summaries
    fn object_name(&self, id: Self::ObjectId) -> String {
        format!("{id:?}")
    }

    /// Write a finished buffer into the object's target attribute,
    /// creating the attribute if it does not exist yet
    fn commit_colors(&self, id: Self::ObjectId, target: ColorTarget, colors: &ColorBuffer) -> BakeResult<()>;
}
