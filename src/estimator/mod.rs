//! Per-vertex occlusion estimation
//!
//! Two algorithms are available, selected by [`AoStrategy`]:
//!
//! - **Hemisphere** ([`hemisphere`]): a shared, sorted cosine-weighted sample
//!   set is rotated into every vertex's normal frame and cast against the
//!   local mesh and the scene; the two results are blended.
//! - **Jittered normal** ([`jitter`]): each ray is the vertex normal plus a
//!   random offset, cast against the local mesh only. Cheaper and noisier.
//!
//! # Parallelism
//!
//! The sample set and the [`VertexGeometryCache`] are built up front and
//! shared read-only. Vertices are then processed with `rayon`; each one
//! produces exactly one slot of the index-addressed [`OcclusionResult`].
//!
//! # Failed queries
//!
//! A ray query that returns an error counts as a miss. Failures are tallied
//! and reported, never retried.

pub mod hemisphere;
pub mod jitter;

pub use hemisphere::{DEFAULT_BIAS, SELF_HIT_RANGE};
pub use jitter::{GROUND_HEIGHT, JITTER_SPREAD};

use glam::Vec3;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cache::VertexGeometryCache;
use crate::config::{AoStrategy, BakeConfig};
use crate::error::BakeResult;
use crate::host::{RayCaster, RayHit};
use crate::mesh::Mesh;
use crate::sampler::{hemisphere_samples, HemisphereSample};

/// Occlusion per vertex, indexed by vertex id; 1.0 = fully exposed
#[derive(Debug, Clone, PartialEq)]
pub struct OcclusionResult {
    values: Vec<f32>,
}

impl OcclusionResult {
    /// Wrap per-vertex values
    pub fn new(values: Vec<f32>) -> Self {
        OcclusionResult { values }
    }

    /// Value for one vertex
    #[inline]
    pub fn get(&self, vertex: usize) -> Option<f32> {
        self.values.get(vertex).copied()
    }

    /// All values in vertex order
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of vertices
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if there are no vertices
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean occlusion over all vertices (1.0 for an empty result)
    pub fn mean(&self) -> f32 {
        if self.values.is_empty() {
            return 1.0;
        }
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }

    /// Take the underlying values
    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

/// Ray counts gathered during one estimation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RayStats {
    /// Queries issued to any caster
    pub rays_cast: u64,
    /// Queries that returned an error and were treated as misses
    pub query_failures: u64,
}

/// Estimator output
#[derive(Debug, Clone)]
pub struct Estimate {
    /// Per-vertex occlusion
    pub occlusion: OcclusionResult,
    /// Query statistics
    pub stats: RayStats,
}

/// Shared counters wrapping every ray query
#[derive(Debug, Default)]
pub(crate) struct RayCounter {
    rays: AtomicU64,
    failures: AtomicU64,
}

impl RayCounter {
    /// Any-hit query; errors count as a miss
    pub(crate) fn occludes<C: RayCaster + ?Sized>(
        &self,
        caster: &C,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> bool {
        self.rays.fetch_add(1, Ordering::Relaxed);
        match caster.occludes(origin, direction, max_distance) {
            Ok(hit) => hit,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                log::trace!("ray query failed, counted as miss: {e}");
                false
            }
        }
    }

    /// Closest-hit query; errors count as a miss
    pub(crate) fn probe<C: RayCaster + ?Sized>(
        &self,
        caster: &C,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<RayHit> {
        self.rays.fetch_add(1, Ordering::Relaxed);
        match caster.ray_cast(origin, direction, max_distance) {
            Ok(hit) => hit,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                log::trace!("probe query failed, counted as miss: {e}");
                None
            }
        }
    }

    fn stats(&self) -> RayStats {
        RayStats {
            rays_cast: self.rays.load(Ordering::Relaxed),
            query_failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Prepared estimator for one mesh and config
///
/// Construction validates inputs and builds the shared read-only state;
/// [`OcclusionEstimator::run`] can then be called any number of times with
/// identical results for an unchanged scene.
#[derive(Debug)]
pub struct OcclusionEstimator<'a> {
    config: &'a BakeConfig,
    cache: VertexGeometryCache,
    samples: Vec<HemisphereSample>,
}

impl<'a> OcclusionEstimator<'a> {
    /// Validate `mesh` and `config`, then build the vertex cache and samples
    pub fn new(mesh: &Mesh, config: &'a BakeConfig) -> BakeResult<Self> {
        config.validate()?;
        mesh.validate()?;

        let cache = VertexGeometryCache::build(mesh);
        let samples = match config.strategy {
            AoStrategy::Hemisphere => hemisphere_samples(config.ray_count, config.seed)?,
            AoStrategy::JitteredNormal => Vec::new(),
        };

        log::debug!(
            "prepared {:?} estimator: {} vertices, {} rays, blend {}",
            config.strategy,
            cache.len(),
            config.ray_count,
            config.blend_factor
        );

        Ok(OcclusionEstimator { config, cache, samples })
    }

    /// Vertex cache shared by all workers
    pub fn cache(&self) -> &VertexGeometryCache {
        &self.cache
    }

    /// Sorted hemisphere samples (empty for the jittered strategy)
    pub fn samples(&self) -> &[HemisphereSample] {
        &self.samples
    }

    /// Estimate every vertex
    ///
    /// `local` answers queries in the mesh's object space; `scene` answers
    /// world-space queries against everything visible, including the mesh
    /// itself. The jittered strategy never queries `scene`.
    pub fn run<L, S>(&self, local: &L, scene: &S) -> Estimate
    where
        L: RayCaster + ?Sized,
        S: RayCaster + ?Sized,
    {
        let counter = RayCounter::default();
        let values = match self.config.strategy {
            AoStrategy::Hemisphere => {
                hemisphere::estimate(&self.cache, &self.samples, local, scene, self.config, &counter)
            }
            AoStrategy::JitteredNormal => jitter::estimate(&self.cache, local, self.config, &counter),
        };

        let stats = counter.stats();
        if stats.query_failures > 0 {
            log::warn!(
                "{} of {} ray queries failed and were treated as misses",
                stats.query_failures,
                stats.rays_cast
            );
        }

        Estimate {
            occlusion: OcclusionResult::new(values),
            stats,
        }
    }
}

/// One-shot estimation: prepare and run
pub fn estimate<L, S>(mesh: &Mesh, local: &L, scene: &S, config: &BakeConfig) -> BakeResult<Estimate>
where
    L: RayCaster + ?Sized,
    S: RayCaster + ?Sized,
{
    Ok(OcclusionEstimator::new(mesh, config)?.run(local, scene))
}
