//! Sorted-hemisphere estimator with local/scene blending

use glam::{Quat, Vec3};
use rayon::prelude::*;

use super::RayCounter;
use crate::cache::{VertexGeometryCache, VertexRecord};
use crate::config::BakeConfig;
use crate::host::RayCaster;
use crate::sampler::{first_culled_index, HemisphereSample};

/// Ray origin offset along the normal
pub const DEFAULT_BIAS: f32 = 0.001;

/// Back-face hits of the bias probe closer than this extend the bias
pub const SELF_HIT_RANGE: f32 = 0.005;

pub(crate) fn estimate<L, S>(
    cache: &VertexGeometryCache,
    samples: &[HemisphereSample],
    local: &L,
    scene: &S,
    config: &BakeConfig,
    counter: &RayCounter,
) -> Vec<f32>
where
    L: RayCaster + ?Sized,
    S: RayCaster + ?Sized,
{
    cache
        .records()
        .par_iter()
        .map(|record| vertex_occlusion(record, samples, local, scene, config, counter))
        .collect()
}

fn vertex_occlusion<L, S>(
    record: &VertexRecord,
    samples: &[HemisphereSample],
    local: &L,
    scene: &S,
    config: &BakeConfig,
    counter: &RayCounter,
) -> f32
where
    L: RayCaster + ?Sized,
    S: RayCaster + ?Sized,
{
    let ray_count = samples.len();
    if ray_count == 0 {
        return 1.0;
    }
    let contribution = 1.0 / ray_count as f32;
    let blend = config.blend_factor;
    let max_distance = config.max_ray_distance;

    let bias = probe_bias(record, local, max_distance, counter);

    // Samples past the cut point under the vertex's own horizon
    let cut = first_culled_index(samples, record.min_dot);
    let open = &samples[..cut];
    let mut local_occlusion = 1.0 - contribution * (ray_count - cut) as f32;
    let mut local_hits = vec![false; open.len()];

    if blend < 1.0 {
        let rotation = normal_frame(record.local_normal);
        let origin = record.local_position + record.local_normal * bias;
        for (sample, hit) in open.iter().zip(local_hits.iter_mut()) {
            if counter.occludes(local, origin, rotation * sample.direction, max_distance) {
                local_occlusion -= contribution;
                *hit = true;
            }
        }
    }

    let mut scene_occlusion = local_occlusion;
    if blend > 0.0 {
        let rotation = normal_frame(record.world_normal);
        let origin = record.world_position + record.world_normal * bias;
        for (sample, _) in open.iter().zip(&local_hits).filter(|(_, &hit)| !hit) {
            if counter.occludes(scene, origin, rotation * sample.direction, max_distance) {
                scene_occlusion -= contribution;
            }
        }
    }

    (local_occlusion * (1.0 - blend) + scene_occlusion * blend).clamp(0.0, 1.0)
}

/// Bias for one vertex
///
/// A single ray along the local normal. A back face just above the vertex
/// (coincident or doubled geometry) pushes the origin past it; anything
/// else leaves the default.
fn probe_bias<L: RayCaster + ?Sized>(
    record: &VertexRecord,
    local: &L,
    max_distance: f32,
    counter: &RayCounter,
) -> f32 {
    let normal = record.local_normal;
    if normal == Vec3::ZERO {
        return DEFAULT_BIAS;
    }

    let origin = record.local_position + normal * DEFAULT_BIAS;
    match counter.probe(local, origin, normal, max_distance) {
        Some(hit) if hit.distance <= SELF_HIT_RANGE && hit.normal.dot(normal) > 0.0 => {
            log::trace!("bias extended by {} at {:?}", hit.distance, record.local_position);
            DEFAULT_BIAS + hit.distance + DEFAULT_BIAS
        }
        _ => DEFAULT_BIAS,
    }
}

/// Rotation taking +Z onto `normal`; identity for a degenerate normal
#[inline]
pub(crate) fn normal_frame(normal: Vec3) -> Quat {
    if normal.length_squared() < 1e-12 {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(Vec3::Z, normal)
    }
}
