//! Jittered-normal estimator
//!
//! Rays are the vertex normal perturbed per component, cast against the
//! object's own mesh in local space. No horizon culling, no scene pass.
//! With the ground plane enabled, vertices near world z = 0 are darkened
//! by proximity instead of by a real occluder.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::{RayCounter, DEFAULT_BIAS};
use crate::cache::{VertexGeometryCache, VertexRecord};
use crate::config::BakeConfig;
use crate::host::RayCaster;

/// Width of the uniform per-component jitter added to the normal
pub const JITTER_SPREAD: f32 = 0.8;

/// Vertices below this world height are darkened by the ground plane
pub const GROUND_HEIGHT: f32 = 0.1;

/// Darkening at z = 0
const GROUND_STRENGTH: f32 = 0.5;

/// Golden-ratio increment decorrelating per-vertex streams
const VERTEX_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

pub(crate) fn estimate<L: RayCaster + ?Sized>(
    cache: &VertexGeometryCache,
    local: &L,
    config: &BakeConfig,
    counter: &RayCounter,
) -> Vec<f32> {
    cache
        .records()
        .par_iter()
        .enumerate()
        .map(|(index, record)| vertex_occlusion(index, record, local, config, counter))
        .collect()
}

#[inline]
fn vertex_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add((index as u64).wrapping_mul(VERTEX_SEED_STRIDE))
}

fn vertex_occlusion<L: RayCaster + ?Sized>(
    index: usize,
    record: &VertexRecord,
    local: &L,
    config: &BakeConfig,
    counter: &RayCounter,
) -> f32 {
    let mut rng = StdRng::seed_from_u64(vertex_seed(config.seed, index));
    let contribution = 1.0 / config.ray_count as f32;
    let normal = record.local_normal;
    let origin = record.local_position + normal * DEFAULT_BIAS;

    let mut occlusion = 1.0;
    for _ in 0..config.ray_count {
        let jitter = Vec3::new(
            rng.gen::<f32>() - 0.5,
            rng.gen::<f32>() - 0.5,
            rng.gen::<f32>() - 0.5,
        ) * JITTER_SPREAD;
        let Some(direction) = (normal + jitter).try_normalize() else {
            continue;
        };
        if direction.dot(normal) > 0.0
            && counter.occludes(local, origin, direction, config.max_ray_distance)
        {
            occlusion -= contribution;
        }
    }

    if config.ground_plane {
        occlusion *= ground_darkening(record.world_position.z);
    }
    occlusion.clamp(0.0, 1.0)
}

/// Multiplier for a vertex at world height `z`
#[inline]
fn ground_darkening(z: f32) -> f32 {
    if z >= GROUND_HEIGHT {
        return 1.0;
    }
    let proximity = 1.0 - (z / GROUND_HEIGHT).min(1.0);
    1.0 - proximity * GROUND_STRENGTH
}
