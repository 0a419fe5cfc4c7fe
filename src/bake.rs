//! Bake orchestration
//!
//! Ties the pieces together for one mesh ([`bake_mesh`]), one host object
//! ([`bake_object`]) or a selection of objects ([`bake_objects`]).
//!
//! # Object bake sequence
//!
//! 1. Validate the config and the object's mesh
//! 2. Add the ground plane (hemisphere strategy with `ground_plane` set)
//! 3. Estimate per-vertex occlusion
//! 4. Remove the ground plane
//! 5. Expand to corner colors and commit them in one write
//!
//! The ground plane is owned by a guard, so step 4 also happens when any
//! earlier step fails.

use std::time::{Duration, Instant};

use crate::color::{write_corner_colors, ColorBuffer, ColorTarget};
use crate::config::{AoStrategy, BakeConfig};
use crate::error::{BakeError, BakeResult};
use crate::estimator::{estimate, OcclusionResult, RayStats};
use crate::ground_plane::GroundPlaneGuard;
use crate::host::{BakeHost, RayCaster};
use crate::mesh::Mesh;

/// Number of failure reasons quoted in [`BakeSummary::message`]
pub const MAX_REPORTED_FAILURES: usize = 3;

/// Colors and intermediate data for one mesh
#[derive(Debug, Clone)]
pub struct MeshBake {
    /// Per-vertex occlusion
    pub occlusion: OcclusionResult,
    /// Per-corner RGBA
    pub colors: ColorBuffer,
    /// Ray query statistics
    pub stats: RayStats,
}

/// Bake `mesh` against explicit casters without touching any host
pub fn bake_mesh<L, S>(mesh: &Mesh, local: &L, scene: &S, config: &BakeConfig) -> BakeResult<MeshBake>
where
    L: RayCaster + ?Sized,
    S: RayCaster + ?Sized,
{
    let estimate = estimate(mesh, local, scene, config)?;
    let colors = write_corner_colors(mesh, &estimate.occlusion, &config.grading)?;
    Ok(MeshBake {
        occlusion: estimate.occlusion,
        colors,
        stats: estimate.stats,
    })
}

/// Outcome of a successful object bake
#[derive(Debug, Clone, PartialEq)]
pub struct BakeReport {
    /// Object display name
    pub object: String,
    /// Attribute written
    pub target: ColorTarget,
    /// Vertices estimated
    pub vertices: usize,
    /// Corners written
    pub corners: usize,
    /// Ray queries issued
    pub rays_cast: u64,
    /// Ray queries that failed and counted as misses
    pub query_failures: u64,
    /// Mean per-vertex occlusion
    pub mean_occlusion: f32,
    /// Whether a temporary ground plane was in the scene
    pub ground_plane: bool,
    /// Wall time
    pub elapsed: Duration,
}

/// Bake one object of `host` and write its target attribute
pub fn bake_object<H>(host: &H, id: H::ObjectId, config: &BakeConfig) -> BakeResult<BakeReport>
where
    H: BakeHost + ?Sized,
{
    let start = Instant::now();
    config.validate()?;

    let name = host.object_name(id);
    let mesh = host.object_mesh(id)?;
    mesh.validate()?;
    let local = host.local_caster(id)?;

    let use_ground = config.ground_plane && config.strategy == AoStrategy::Hemisphere;
    let ground = if use_ground {
        Some(GroundPlaneGuard::create(host, &mesh)?)
    } else {
        None
    };

    let estimate = estimate(&mesh, &local, host, config)?;

    if let Some(guard) = ground {
        if let Err(e) = guard.remove() {
            log::warn!("'{name}': ground plane removal failed: {e}");
        }
    }

    let colors = write_corner_colors(&mesh, &estimate.occlusion, &config.grading)?;
    host.commit_colors(id, config.target, &colors)?;

    let report = BakeReport {
        object: name,
        target: config.target,
        vertices: mesh.vertex_count(),
        corners: colors.corner_count(),
        rays_cast: estimate.stats.rays_cast,
        query_failures: estimate.stats.query_failures,
        mean_occlusion: estimate.occlusion.mean(),
        ground_plane: use_ground,
        elapsed: start.elapsed(),
    };
    log::info!(
        "baked AO for '{}' into '{}': {} vertices, {} rays, mean {:.3} in {:.2?}",
        report.object,
        report.target.attribute_name(),
        report.vertices,
        report.rays_cast,
        report.mean_occlusion,
        report.elapsed
    );
    Ok(report)
}

/// Fill an object's target attribute with a solid color
///
/// `faces = None` fills every corner. With a face list, the existing
/// attribute is kept for the other faces (white if it did not exist).
pub fn fill_object<H>(
    host: &H,
    id: H::ObjectId,
    target: ColorTarget,
    rgb: [f32; 3],
    faces: Option<&[usize]>,
    base: Option<&ColorBuffer>,
) -> BakeResult<()>
where
    H: BakeHost + ?Sized,
{
    let mesh = host.object_mesh(id)?;
    mesh.validate()?;
    let corner_count = mesh.corner_count();
    let colors = match faces {
        None => ColorBuffer::filled(corner_count, rgb),
        Some(faces) => {
            let mut colors = match base {
                Some(base) if base.len() == corner_count * 4 => base.clone(),
                Some(base) => {
                    return Err(BakeError::TopologyMismatch {
                        expected: corner_count * 4,
                        actual: base.len(),
                    })
                }
                None => ColorBuffer::filled(corner_count, [1.0; 3]),
            };
            colors.fill_faces(&mesh, faces, rgb)?;
            colors
        }
    };
    host.commit_colors(id, target, &colors)
}

/// One object that could not be baked
#[derive(Debug, Clone, PartialEq)]
pub struct BakeFailure {
    /// Object display name
    pub object: String,
    /// What went wrong
    pub error: BakeError,
}

/// Aggregate outcome of a multi-object bake
#[derive(Debug, Clone, Default)]
pub struct BakeSummary {
    /// Reports of objects that were baked
    pub reports: Vec<BakeReport>,
    /// Objects that failed, in request order
    pub failures: Vec<BakeFailure>,
}

impl BakeSummary {
    /// Objects baked
    #[inline]
    pub fn succeeded(&self) -> usize {
        self.reports.len()
    }

    /// Objects that failed
    #[inline]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True if nothing failed
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary with the first few failure reasons
    pub fn message(&self) -> String {
        let total = self.succeeded() + self.failed();
        if self.is_complete() {
            return format!("Baked AO on {total} object(s)");
        }
        let reasons: Vec<String> = self
            .failures
            .iter()
            .take(MAX_REPORTED_FAILURES)
            .map(|f| format!("{}: {}", f.object, f.error))
            .collect();
        let mut message = format!(
            "Baked AO on {} of {} object(s); {} failed: {}",
            self.succeeded(),
            total,
            self.failed(),
            reasons.join("; ")
        );
        if self.failed() > MAX_REPORTED_FAILURES {
            message.push_str(&format!(" (+{} more)", self.failed() - MAX_REPORTED_FAILURES));
        }
        message
    }
}

/// Bake each object in turn, collecting failures without stopping
pub fn bake_objects<H>(host: &H, ids: &[H::ObjectId], config: &BakeConfig) -> BakeSummary
where
    H: BakeHost + ?Sized,
{
    let mut summary = BakeSummary::default();
    for &id in ids {
        match bake_object(host, id, config) {
            Ok(report) => summary.reports.push(report),
            Err(error) => {
                let object = host.object_name(id);
                log::warn!("AO bake failed for '{object}': {error}");
                summary.failures.push(BakeFailure { object, error });
            }
        }
    }
    log::info!("{}", summary.message());
    summary
}
