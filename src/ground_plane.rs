//! Temporary ground occluder
//!
//! An upward-facing quad placed just below an object so that downward rays
//! are blocked during the scene pass. The quad only exists while a
//! [`GroundPlaneGuard`] is alive; dropping the guard removes it on every
//! exit path, including errors and panics unwinding through the bake.

use glam::{Mat4, Vec3};

use crate::error::{BakeError, BakeResult};
use crate::estimator::DEFAULT_BIAS;
use crate::host::OccluderHost;
use crate::mesh::{Aabb, Mesh};

/// Name given to the temporary occluder
pub const GROUND_PLANE_NAME: &str = "AoTempGroundPlane";

/// Gap between the object's lowest point and the plane
///
/// Must exceed the largest ray-origin bias (the default bias plus a
/// self-hit extension) so rays from the lowest vertex start above the plane.
pub const GROUND_OFFSET: f32 = 10.0 * DEFAULT_BIAS;

/// Plane side length relative to the object's larger horizontal extent
pub const GROUND_SCALE: f32 = 3.0;

/// Side length used when the object has no horizontal extent
const MIN_GROUND_SIZE: f32 = 1.0;

/// Geometry of the ground plane for an object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPlane {
    /// World-space center of the quad
    pub center: Vec3,
    /// Side length of the square quad
    pub size: f32,
}

impl GroundPlane {
    /// Plane under world-space `bounds`
    pub fn for_bounds(bounds: &Aabb) -> Self {
        let extent = bounds.size();
        let mut size = extent.x.max(extent.y) * GROUND_SCALE;
        if !size.is_finite() || size <= 0.0 {
            size = MIN_GROUND_SIZE;
        }
        let center = bounds.center();
        GroundPlane {
            center: Vec3::new(center.x, center.y, bounds.min.z - GROUND_OFFSET),
            size,
        }
    }

    /// Single +Z quad with its world transform applied
    pub fn to_mesh(&self) -> Mesh {
        Mesh::grid_plane(self.size, 1).with_transform(Mat4::from_translation(self.center))
    }
}

/// Occluder that is removed from its host when dropped
pub struct GroundPlaneGuard<'a, H: OccluderHost + ?Sized> {
    host: &'a H,
    handle: Option<H::Handle>,
}

impl<'a, H: OccluderHost + ?Sized> GroundPlaneGuard<'a, H> {
    /// Add a ground plane under `mesh` to `host`
    pub fn create(host: &'a H, mesh: &Mesh) -> BakeResult<Self> {
        let bounds = mesh
            .world_bounds()
            .ok_or_else(|| BakeError::invalid("cannot place a ground plane under an empty mesh"))?;
        let plane = GroundPlane::for_bounds(&bounds);
        let handle = host.add_occluder(GROUND_PLANE_NAME, plane.to_mesh())?;
        log::debug!(
            "added ground plane {:?}: size {} at {:?}",
            handle,
            plane.size,
            plane.center
        );
        Ok(GroundPlaneGuard {
            host,
            handle: Some(handle),
        })
    }

    /// Handle of the live occluder
    pub fn handle(&self) -> Option<H::Handle> {
        self.handle
    }

    /// Remove the occluder now and report the outcome
    pub fn remove(mut self) -> BakeResult<()> {
        match self.handle.take() {
            Some(handle) => self.host.remove_occluder(handle),
            None => Ok(()),
        }
    }
}

impl<H: OccluderHost + ?Sized> Drop for GroundPlaneGuard<'_, H> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.host.remove_occluder(handle) {
                log::warn!("failed to remove ground plane {handle:?}: {e}");
            }
        }
    }
}
